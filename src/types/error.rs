//! Unified Error Type System
//!
//! Centralized error types for the analyzer.
//!
//! ## Propagation
//!
//! - Run-aborting: root missing or not a directory, invalid configuration,
//!   cancellation
//! - Per-file: everything else is turned into a [`Diagnostic`] and the run
//!   continues over the remaining files
//!
//! [`Diagnostic`]: super::Diagnostic

use std::path::PathBuf;
use thiserror::Error;

use super::construct::ConstructKind;

#[derive(Debug, Error)]
pub enum JspError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Run-aborting Errors
    // -------------------------------------------------------------------------
    #[error("Project root does not exist: {}", path.display())]
    RootNotFound { path: PathBuf },

    #[error("Project root is not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Analysis cancelled")]
    Cancelled,

    // -------------------------------------------------------------------------
    // Per-file Errors
    // -------------------------------------------------------------------------
    /// Every candidate encoding failed
    #[error("Could not decode {} with any candidate encoding", path.display())]
    Decode { path: PathBuf },

    /// A construct pattern could not be built
    #[error("Pattern for {kind} failed: {message}")]
    Pattern { kind: ConstructKind, message: String },

    #[error("Markup parse error: {0}")]
    Markup(String),

    #[error("Script parse error: {0}")]
    Script(String),
}

pub type Result<T> = std::result::Result<T, JspError>;

impl JspError {
    /// Whether this error ends the whole run rather than one file
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::RootNotFound { .. } | Self::NotADirectory { .. } | Self::Config(_) | Self::Cancelled
        )
    }
}
