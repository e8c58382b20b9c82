//! Per-file findings
//!
//! Security checks run over the raw text. Size and scriptlet checks use
//! the configured thresholds. Cycle findings are added after the graph
//! is built.

use tracing::warn;

use super::extractor::LineIndex;
use super::extractor::patterns::{pattern, regex_fn};
use crate::config::AnalysisConfig;
use crate::types::{ConstructKind, ConstructSet, Diagnostic, Finding, FindingKind, SourceFile};

regex_fn!(regex_sql_concat, r"(?:\.execute|executeQuery|executeUpdate)\s*\([^)]*\+");
regex_fn!(
    regex_unescaped_parameter,
    r"<%=\s*request\.getParameter\(|out\.print(?:ln)?\(\s*request\.getParameter"
);

pub struct FindingsDetector {
    large_file_bytes: u64,
    excessive_scriptlets: usize,
}

impl FindingsDetector {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            large_file_bytes: config.large_file_bytes,
            excessive_scriptlets: config.excessive_scriptlets,
        }
    }

    /// Findings for one file, ordered by kind then line. A failed check is
    /// reported as a diagnostic and the remaining checks still run.
    pub fn detect(&self, file: &SourceFile, constructs: &ConstructSet) -> (Vec<Finding>, Vec<Diagnostic>) {
        let mut findings = Vec::new();
        let mut diagnostics = Vec::new();
        let lines = LineIndex::new(&file.text);

        let checks = [
            (
                pattern(ConstructKind::Scriptlet, regex_sql_concat),
                FindingKind::SqlInjection,
                ConstructKind::Scriptlet,
            ),
            (
                pattern(ConstructKind::Expression, regex_unescaped_parameter),
                FindingKind::Xss,
                ConstructKind::Expression,
            ),
        ];
        for (re, kind, construct) in checks {
            match re {
                Ok(re) => findings.extend(re.find_iter(&file.text).map(|m| {
                    Finding::new(kind, security_message(kind)).at(lines.line_of(m.start()), m.as_str().trim())
                })),
                Err(e) => {
                    warn!("{}: {} check skipped: {}", file.relative_path, kind, e);
                    diagnostics.push(Diagnostic::degraded(construct, e.to_string()).with_path(&file.relative_path));
                }
            }
        }

        let scriptlets = constructs.count(ConstructKind::Scriptlet);
        if scriptlets > self.excessive_scriptlets {
            findings.push(Finding::new(
                FindingKind::ExcessiveScriptlets,
                format!(
                    "{} scriptlets (limit {}); consider moving logic to JSTL, tags or a controller",
                    scriptlets, self.excessive_scriptlets
                ),
            ));
        }

        if file.size_bytes > self.large_file_bytes {
            findings.push(Finding::new(
                FindingKind::LargeFile,
                format!(
                    "{} bytes (limit {}); consider splitting into fragments",
                    file.size_bytes, self.large_file_bytes
                ),
            ));
        }

        findings.sort();
        (findings, diagnostics)
    }
}

fn security_message(kind: FindingKind) -> &'static str {
    match kind {
        FindingKind::SqlInjection => "SQL built by string concatenation",
        FindingKind::Xss => "Request parameter written to the page without escaping",
        _ => "",
    }
}

/// Finding for a file that sits on an include cycle
pub fn cycle_finding(cycle: &[String]) -> Finding {
    Finding::new(
        FindingKind::CyclicDependency,
        format!("Include cycle: {}", cycle.join(" -> ")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FileKind, SourceEncoding};
    use std::path::PathBuf;

    fn file(text: &str, size: u64) -> SourceFile {
        SourceFile::new(
            PathBuf::from("/p/a.jsp"),
            "a.jsp".to_string(),
            FileKind::Jsp,
            text.to_string(),
            SourceEncoding::Utf8,
            size,
        )
    }

    fn detector() -> FindingsDetector {
        FindingsDetector::new(&AnalysisConfig {
            large_file_bytes: 100,
            excessive_scriptlets: 1,
            ..AnalysisConfig::default()
        })
    }

    #[test]
    fn test_security_findings() {
        let text = "<html>\n<% rs = stmt.executeQuery(\"select * from t where id=\" + id); %>\n<%= request.getParameter(\"q\") %>";
        let (findings, diagnostics) = detector().detect(&file(text, 10), &ConstructSet::new());
        assert!(diagnostics.is_empty());
        let kinds: Vec<_> = findings.iter().map(|f| (f.kind, f.line)).collect();
        assert_eq!(
            kinds,
            vec![
                (FindingKind::SqlInjection, Some(2)),
                (FindingKind::Xss, Some(3)),
            ]
        );
        assert!(findings.iter().all(|f| f.kind.is_security()));
    }

    #[test]
    fn test_prepared_statement_is_clean() {
        let text = "<% ps = conn.prepareStatement(\"select * from t where id=?\"); ps.executeQuery(); %>";
        let (findings, _) = detector().detect(&file(text, 10), &ConstructSet::new());
        assert!(findings.is_empty());
    }

    #[test]
    fn test_threshold_findings() {
        let text = "<% a(); %><% b(); %>";
        let constructs = crate::analyzer::Extractor::default().extract(text, FileKind::Jsp);
        let (findings, _) = detector().detect(&file(text, 500), &constructs);
        let kinds: Vec<_> = findings.iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![FindingKind::ExcessiveScriptlets, FindingKind::LargeFile]
        );
    }

    #[test]
    fn test_cycle_finding_message() {
        let finding = cycle_finding(&["a.jsp".to_string(), "b.jspf".to_string(), "a.jsp".to_string()]);
        assert_eq!(finding.kind, FindingKind::CyclicDependency);
        assert_eq!(finding.message, "Include cycle: a.jsp -> b.jspf -> a.jsp");
    }
}
