use serde::{Deserialize, Serialize};
use std::fmt;

use super::construct::ConstructKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// File skipped: no candidate encoding decoded it
    DecodeError,
    /// One construct kind came back empty for this file
    ExtractionDegraded,
    /// Unreadable file or directory, or a symlink loop
    WalkIoError,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DecodeError => write!(f, "DECODE_ERROR"),
            Self::ExtractionDegraded => write!(f, "EXTRACTION_DEGRADED"),
            Self::WalkIoError => write!(f, "WALK_IO_ERROR"),
        }
    }
}

/// Non-fatal problem recorded during a run
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Diagnostic {
    pub path: Option<String>,
    pub kind: DiagnosticKind,
    /// Construct kind affected, for degraded extraction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub construct: Option<ConstructKind>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, path: Option<String>, message: impl Into<String>) -> Self {
        Self {
            path,
            kind,
            construct: None,
            message: message.into(),
        }
    }

    pub fn degraded(construct: ConstructKind, message: impl Into<String>) -> Self {
        Self {
            path: None,
            kind: DiagnosticKind::ExtractionDegraded,
            construct: Some(construct),
            message: message.into(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "[{}] {}: {}", self.kind, path, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}
