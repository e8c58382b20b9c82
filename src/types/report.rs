use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::diagnostic::Diagnostic;
use super::finding::Finding;
use super::graph::DependencyGraph;
use super::metrics::{ComplexityBand, FileMetrics};

/// File with its score, for rankings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedFile {
    pub path: String,
    pub score: f64,
    pub band: ComplexityBand,
    pub cyclomatic: u32,
}

/// File with the number of distinct files including it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludedFile {
    pub path: String,
    pub dependents: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandDistribution {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl BandDistribution {
    pub fn record(&mut self, band: ComplexityBand) {
        match band {
            ComplexityBand::Low => self.low += 1,
            ComplexityBand::Medium => self.medium += 1,
            ComplexityBand::High => self.high += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_files: usize,
    pub total_lines: usize,
    pub total_scriptlets: usize,
    pub total_el_expressions: usize,
    pub total_jstl_tags: usize,
    pub total_custom_tags: usize,
    pub total_includes: usize,
    pub total_db_operations: usize,
    pub total_edges: usize,
    pub unresolved_targets: usize,
    pub dynamic_targets: usize,
    /// Distinct (file, custom tag) pairs
    pub tag_references: usize,
    /// Tag references with no discovered tag file
    pub unresolved_tag_references: usize,
    pub total_findings: usize,
    pub average_score: f64,
    pub average_lines: f64,
    pub bands: BandDistribution,
    pub most_complex: Vec<RankedFile>,
    pub most_included: Vec<IncludedFile>,
}

/// Final aggregate of a run. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub project_root: String,
    pub files: BTreeMap<String, FileMetrics>,
    pub findings: BTreeMap<String, Vec<Finding>>,
    pub graph: DependencyGraph,
    pub summary: SummaryStats,
}

/// Report plus everything that went wrong along the way
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub report: AnalysisReport,
    pub diagnostics: Vec<Diagnostic>,
}
