use ignore::WalkBuilder;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

use crate::constants::walk::{EXCLUDED_SEGMENTS, TAGS_OVERRIDE};
use crate::types::{Diagnostic, DiagnosticKind, FileKind, JspError, Result};

/// Recursive template file discovery under a project root.
///
/// Inclusion and exclusion rules are fixed: only `.jsp`, `.jspf`, `.tag`
/// and `.tagx` files, skipping any `build`, `target` or `dist` segment
/// unless the path runs through `WEB-INF/tags`. Symlinks are followed.
pub struct FileScanner {
    root: PathBuf,
}

impl FileScanner {
    /// Create a scanner. The root must exist and be a directory.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(JspError::RootNotFound {
                path: root.to_path_buf(),
            });
        }
        if !root.is_dir() {
            return Err(JspError::NotADirectory {
                path: root.to_path_buf(),
            });
        }

        Ok(Self {
            root: root.canonicalize()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the tree. Unreadable entries and symlink loops become
    /// diagnostics; the walk itself never fails past construction.
    pub fn scan(&self) -> ScanResult {
        let mut result = ScanResult::default();

        let walker = WalkBuilder::new(&self.root)
            .standard_filters(false)
            .follow_links(true)
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Walk error: {}", e);
                    result.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::WalkIoError,
                        None,
                        e.to_string(),
                    ));
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let path = entry.path();
            let Some(kind) = FileKind::from_path(path) else {
                continue;
            };
            let Some(relative_path) = relative_key(&self.root, path) else {
                continue;
            };
            if is_excluded(&relative_path) {
                debug!("Excluded by path rule: {}", relative_path);
                continue;
            }

            match entry.metadata() {
                Ok(metadata) => result.files.push(ScannedFile {
                    path: path.to_path_buf(),
                    relative_path,
                    kind,
                    size: metadata.len(),
                }),
                Err(e) => {
                    warn!("Cannot stat {}: {}", relative_path, e);
                    result.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::WalkIoError,
                        Some(relative_path),
                        e.to_string(),
                    ));
                }
            }
        }

        result
            .files
            .sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        result.files.dedup_by(|a, b| a.relative_path == b.relative_path);

        debug!(
            "Scanned {}: {} files, {} diagnostics",
            self.root.display(),
            result.files.len(),
            result.diagnostics.len()
        );
        result
    }

    /// Relative paths of all discovered files
    pub fn paths(&self) -> Vec<String> {
        self.scan()
            .files
            .into_iter()
            .map(|f| f.relative_path)
            .collect()
    }
}

/// Forward-slash key of `path` relative to `root`
pub fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<_> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect();
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

/// Exclusion check on a root-relative key; the tags override wins
pub fn is_excluded(relative_path: &str) -> bool {
    if relative_path.contains(TAGS_OVERRIDE) {
        return false;
    }
    relative_path
        .split('/')
        .any(|segment| EXCLUDED_SEGMENTS.contains(&segment))
}

#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub relative_path: String,
    pub kind: FileKind,
    pub size: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub files: Vec<ScannedFile>,
    pub diagnostics: Vec<Diagnostic>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "<html/>").unwrap();
    }

    #[test]
    fn test_exclusion_rules() {
        assert!(is_excluded("target/generated/x.jsp"));
        assert!(is_excluded("web/dist/a.jspf"));
        assert!(!is_excluded("WEB-INF/tags/build/x.tag"));
        assert!(!is_excluded("web/builder/a.jsp"));
        assert!(!is_excluded("web/index.jsp"));
    }

    #[test]
    fn test_scan_filters_and_sorts() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, "web/index.jsp");
        touch(root, "web/inc/header.jspf");
        touch(root, "WEB-INF/tags/build/x.tag");
        touch(root, "WEB-INF/tags/box.TAGX");
        touch(root, "target/generated/x.jsp");
        touch(root, "src/Main.java");
        touch(root, ".hidden/page.jsp");

        let scanner = FileScanner::new(root).unwrap();
        let paths = scanner.paths();
        assert_eq!(
            paths,
            vec![
                ".hidden/page.jsp",
                "WEB-INF/tags/box.TAGX",
                "WEB-INF/tags/build/x.tag",
                "web/inc/header.jspf",
                "web/index.jsp",
            ]
        );
    }

    #[test]
    fn test_root_under_excluded_name_is_not_excluded() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("build");
        touch(&root, "a.jsp");

        let scanner = FileScanner::new(&root).unwrap();
        assert_eq!(scanner.paths(), vec!["a.jsp"]);
    }

    #[test]
    fn test_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let err = FileScanner::new(temp_dir.path().join("nope")).err().unwrap();
        assert!(matches!(err, JspError::RootNotFound { .. }));
    }

    #[test]
    fn test_file_root() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "a.jsp");
        let err = FileScanner::new(temp_dir.path().join("a.jsp")).err().unwrap();
        assert!(matches!(err, JspError::NotADirectory { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loop_is_diagnostic() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, "web/a.jsp");
        std::os::unix::fs::symlink(root.join("web"), root.join("web/loop")).unwrap();

        let result = FileScanner::new(root).unwrap().scan();
        assert_eq!(result.files.len(), 1);
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.kind == DiagnosticKind::WalkIoError)
        );
    }
}
