use serde::{Deserialize, Serialize};
use std::fmt;

use super::construct::FrontendInventory;
use super::source::{FileKind, SourceEncoding};

/// Strategy that produced a scriptlet's sub-scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptAnalysis {
    Ast,
    Pattern,
}

/// Branch/loop sub-scores of a single scriptlet body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptletComplexity {
    pub decisions: u32,
    pub logical_ops: u32,
    pub ternaries: u32,
    pub max_nesting: u32,
    pub analysis: ScriptAnalysis,
}

impl ScriptletComplexity {
    pub fn empty(analysis: ScriptAnalysis) -> Self {
        Self {
            decisions: 0,
            logical_ops: 0,
            ternaries: 0,
            max_nesting: 0,
            analysis,
        }
    }

    /// Combined score, never below 1
    pub fn score(&self) -> u32 {
        let raw = self.decisions + self.logical_ops + self.ternaries + self.max_nesting / 2;
        raw.max(1)
    }
}

/// Complexity band over the composite score.
///
/// Intervals are closed-open: a score equal to a threshold belongs to the
/// higher band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityBand {
    Low,
    Medium,
    High,
}

impl ComplexityBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for ComplexityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-kind construct counts of one file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructCounts {
    pub directives: usize,
    pub page_directives: usize,
    pub taglib_directives: usize,
    pub includes: usize,
    pub dynamic_includes: usize,
    pub scriptlets: usize,
    pub declarations: usize,
    pub expressions: usize,
    pub el_expressions: usize,
    pub deferred_el_expressions: usize,
    pub jstl_tags: usize,
    pub custom_tags: usize,
    pub actions: usize,
    pub forms: usize,
    pub form_fields: usize,
    pub session_accesses: usize,
    pub request_accesses: usize,
    pub response_accesses: usize,
    pub db_operations: usize,
    pub db_queries: usize,
    pub db_updates: usize,
    pub html_elements: usize,
    pub script_blocks: usize,
    pub style_blocks: usize,
    pub html_comments: usize,
    pub jsp_comments: usize,
    pub css_classes: usize,
    pub js_functions: usize,
}

/// Include-graph position of a discovered file
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CouplingMetrics {
    /// Distinct files including this one
    pub fan_in: usize,
    /// Distinct targets this file includes (resolved or not)
    pub fan_out: usize,
    /// fan_out / (fan_in + fan_out), 0 when isolated
    pub instability: f64,
    pub in_cycle: bool,
}

/// Derived metrics of one file, embedded in the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetrics {
    pub path: String,
    pub kind: FileKind,
    pub encoding: SourceEncoding,
    pub size_bytes: u64,
    pub line_count: usize,
    pub counts: ConstructCounts,
    pub scriptlet_lines: usize,
    /// Sum of per-scriptlet complexity scores
    pub scriptlet_complexity: u32,
    pub ast_scored_scriptlets: usize,
    pub cyclomatic: u32,
    pub security_issues: usize,
    pub score: f64,
    pub band: ComplexityBand,
    pub coupling: CouplingMetrics,
    #[serde(default, skip_serializing_if = "FrontendInventory::is_empty")]
    pub frontend: FrontendInventory,
}
