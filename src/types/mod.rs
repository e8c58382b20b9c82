pub mod construct;
pub mod diagnostic;
pub mod error;
pub mod finding;
pub mod graph;
pub mod metrics;
pub mod report;
pub mod source;

pub use construct::*;
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use error::{JspError, Result};
pub use finding::{Finding, FindingKind};
pub use graph::{DependencyEdge, DependencyGraph, GraphNode, NodeKind, TagReference};
pub use metrics::*;
pub use report::*;
pub use source::{FileKind, SourceEncoding, SourceFile};
