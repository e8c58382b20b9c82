use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of templating source file, from its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Jsp,
    Jspf,
    Tag,
    Tagx,
}

impl FileKind {
    /// Detect the kind from a path's extension (case-insensitive)
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jsp" => Some(Self::Jsp),
            "jspf" => Some(Self::Jspf),
            "tag" => Some(Self::Tag),
            "tagx" => Some(Self::Tagx),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jsp => "jsp",
            Self::Jspf => "jspf",
            Self::Tag => "tag",
            Self::Tagx => "tagx",
        }
    }

    /// Tag files (`.tag`/`.tagx`) are invoked as custom tags rather than pages
    pub fn is_tag_file(&self) -> bool {
        matches!(self, Self::Tag | Self::Tagx)
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoding a file was decoded with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceEncoding {
    Utf8,
    ShiftJis,
    EucJp,
    Iso2022Jp,
    Latin1,
}

impl SourceEncoding {
    /// Fixed fallback order used by the loader
    pub const FALLBACK_ORDER: [SourceEncoding; 5] = [
        Self::Utf8,
        Self::ShiftJis,
        Self::EucJp,
        Self::Iso2022Jp,
        Self::Latin1,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::ShiftJis => "shift-jis",
            Self::EucJp => "euc-jp",
            Self::Iso2022Jp => "iso-2022-jp",
            Self::Latin1 => "latin-1",
        }
    }
}

impl fmt::Display for SourceEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A discovered and decoded template file.
///
/// Identity is the normalized absolute `path`; `relative_path` (forward
/// slashes, relative to the project root) is the key used in reports and
/// in the dependency graph.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub relative_path: String,
    pub kind: FileKind,
    pub text: String,
    pub encoding: SourceEncoding,
    pub line_count: usize,
    pub size_bytes: u64,
}

impl SourceFile {
    pub fn new(
        path: PathBuf,
        relative_path: String,
        kind: FileKind,
        text: String,
        encoding: SourceEncoding,
        size_bytes: u64,
    ) -> Self {
        let line_count = text.lines().count();
        Self {
            path,
            relative_path,
            kind,
            text,
            encoding,
            line_count,
            size_bytes,
        }
    }
}
