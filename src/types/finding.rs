use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    SqlInjection,
    Xss,
    ExcessiveScriptlets,
    LargeFile,
    CyclicDependency,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SqlInjection => "sql_injection",
            Self::Xss => "xss",
            Self::ExcessiveScriptlets => "excessive_scriptlets",
            Self::LargeFile => "large_file",
            Self::CyclicDependency => "cyclic_dependency",
        }
    }

    pub fn is_security(&self) -> bool {
        matches!(self, Self::SqlInjection | Self::Xss)
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maintainability or security issue detected in one file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub line: Option<usize>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

impl Finding {
    pub fn new(kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            line: None,
            message: message.into(),
            evidence: None,
        }
    }

    pub fn at(mut self, line: usize, evidence: impl Into<String>) -> Self {
        self.line = Some(line);
        self.evidence = Some(evidence.into());
        self
    }
}
