//! jsplens - Static Analyzer for JSP Codebases
//!
//! Recovers structure from a tree of JSP, fragment and tag files: which
//! files include which others, what dynamic constructs each file contains,
//! and how complex each file is.
//!
//! ## Core Features
//!
//! - **Encoding fallback**: UTF-8, Shift_JIS, EUC-JP, ISO-2022-JP, Latin-1
//! - **Construct extraction**: directives, three include syntaxes, scripting
//!   elements, EL, JSTL, custom tags, forms, implicit object access
//! - **Optional parsers**: `quick-xml` for markup structure, tree-sitter
//!   Java for scriptlet complexity, both behind Cargo features
//! - **Include graph**: path-based resolution with unresolved and dynamic
//!   placeholders, coupling metrics and cycle detection
//!
//! ## Quick Start
//!
//! ```ignore
//! use jsplens::{Analyzer, ConfigLoader};
//!
//! let config = ConfigLoader::load(&project_root)?;
//! let outcome = Analyzer::new(config).analyze(&project_root)?;
//! for (path, metrics) in &outcome.report.files {
//!     println!("{} {:.2} {}", path, metrics.score, metrics.band);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`analyzer`]: walk, load, extract, score, graph
//! - [`config`]: layered configuration
//! - [`report`]: JSON, Markdown and DOT writers
//! - [`types`]: data model and errors

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod constants;
pub mod report;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader};
pub use types::error::{JspError, Result};

pub use analyzer::{
    Analyzer, Capabilities, Extractor, FileScanner, GraphBuilder, Loader, MetricsEngine,
};
pub use types::{AnalysisOutcome, AnalysisReport, DependencyGraph, FileMetrics};
