//! JSP Analyzer Module
//!
//! The extraction-and-graph engine:
//! - Project walk with fixed inclusion/exclusion rules
//! - Encoding-resilient loading
//! - Construct extraction with optional structure and Java parsers
//! - Per-file findings and complexity metrics
//! - Include graph, coupling and cycles

pub mod extractor;
pub mod findings;
pub mod graph;
pub mod loader;
pub mod metrics;
pub mod pipeline;
pub mod scanner;

pub use extractor::{Capabilities, Extractor};
pub use findings::FindingsDetector;
pub use graph::{GraphBuilder, Resolver};
pub use loader::Loader;
pub use metrics::MetricsEngine;
pub use pipeline::Analyzer;
pub use scanner::{FileScanner, ScanResult, ScannedFile};
