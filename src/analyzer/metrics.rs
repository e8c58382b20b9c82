//! Complexity Metrics Engine
//!
//! Folds a file's constructs into counts, a cyclomatic estimate and a
//! weighted composite score. Every weight is non-negative, so adding a
//! construct never lowers the score.

use crate::constants::extraction::JSTL_BRANCH_TAGS;
use crate::constants::scoring::LINES_NORMALIZER;
use crate::config::ScoringConfig;
use crate::types::{
    ComplexityBand, ConstructCounts, ConstructPayload, ConstructSet, CouplingMetrics,
    DbOperationKind, DirectiveKind, FileMetrics, JstlLibrary, ScriptAnalysis, SourceFile,
};

#[derive(Debug, Clone)]
pub struct MetricsEngine {
    scoring: ScoringConfig,
}

impl Default for MetricsEngine {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

/// Inputs of the composite score
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreInputs {
    pub counts: ConstructCounts,
    pub scriptlet_complexity: u32,
    pub cyclomatic: u32,
    pub security_issues: usize,
    pub line_count: usize,
}

impl MetricsEngine {
    pub fn new(scoring: ScoringConfig) -> Self {
        Self { scoring }
    }

    /// Per-kind counts of an extraction result, plus its markup profile
    pub fn counts(constructs: &ConstructSet) -> ConstructCounts {
        let profile = &constructs.profile;
        let mut counts = ConstructCounts {
            html_elements: profile.html_elements,
            script_blocks: profile.script_blocks,
            style_blocks: profile.style_blocks,
            html_comments: profile.html_comments,
            jsp_comments: profile.jsp_comments,
            css_classes: profile.frontend.css_classes.len(),
            js_functions: profile.frontend.js_functions.len(),
            ..ConstructCounts::default()
        };

        for construct in &constructs.constructs {
            match &construct.payload {
                ConstructPayload::Directive { directive, .. } => {
                    counts.directives += 1;
                    match directive {
                        DirectiveKind::Page => counts.page_directives += 1,
                        DirectiveKind::Taglib => counts.taglib_directives += 1,
                        _ => {}
                    }
                }
                ConstructPayload::Include(include) => {
                    counts.includes += 1;
                    if include.dynamic {
                        counts.dynamic_includes += 1;
                    }
                }
                ConstructPayload::Scriptlet(_) => counts.scriptlets += 1,
                ConstructPayload::Declaration { .. } => counts.declarations += 1,
                ConstructPayload::Expression { .. } => counts.expressions += 1,
                ConstructPayload::ElExpression { deferred, .. } => {
                    counts.el_expressions += 1;
                    if *deferred {
                        counts.deferred_el_expressions += 1;
                    }
                }
                ConstructPayload::JstlTag { .. } => counts.jstl_tags += 1,
                ConstructPayload::CustomTag { .. } => counts.custom_tags += 1,
                ConstructPayload::Action { .. } => counts.actions += 1,
                ConstructPayload::Form(_) => counts.forms += 1,
                ConstructPayload::FormField(_) => counts.form_fields += 1,
                ConstructPayload::SessionAccess { .. } => counts.session_accesses += 1,
                ConstructPayload::RequestAccess { .. } => counts.request_accesses += 1,
                ConstructPayload::ResponseAccess { .. } => counts.response_accesses += 1,
                ConstructPayload::DbOperation { operation, .. } => {
                    counts.db_operations += 1;
                    match operation {
                        DbOperationKind::Query => counts.db_queries += 1,
                        DbOperationKind::Update => counts.db_updates += 1,
                        _ => {}
                    }
                }
            }
        }

        counts
    }

    /// 1 + summed scriptlet scores + JSTL branching tags
    pub fn cyclomatic(constructs: &ConstructSet) -> u32 {
        let scriptlets: u32 = constructs.scriptlets().map(|s| s.complexity.score()).sum();
        let branches = constructs
            .constructs
            .iter()
            .filter(|c| {
                matches!(
                    &c.payload,
                    ConstructPayload::JstlTag { library: JstlLibrary::Core, tag }
                        if JSTL_BRANCH_TAGS.contains(&tag.as_str())
                )
            })
            .count() as u32;
        1 + scriptlets + branches
    }

    pub fn composite(&self, inputs: &ScoreInputs) -> f64 {
        let w = &self.scoring.weights;
        let c = &inputs.counts;

        let raw = w.scriptlet * c.scriptlets as f64
            + w.scriptlet_complexity * inputs.scriptlet_complexity as f64
            + w.declaration * c.declarations as f64
            + w.expression * c.expressions as f64
            + w.el * c.el_expressions as f64
            + w.jstl_tag * c.jstl_tags as f64
            + w.custom_tag * c.custom_tags as f64
            + w.form_field * c.form_fields as f64
            + w.session_access * c.session_accesses as f64
            + w.db_operation * c.db_operations as f64
            + w.html_element * c.html_elements as f64
            + w.script_block * c.script_blocks as f64
            + w.cyclomatic * inputs.cyclomatic as f64
            + w.security_issue * inputs.security_issues as f64
            + w.lines * (inputs.line_count as f64 / LINES_NORMALIZER);

        // two decimals keeps reports stable across platforms
        (raw * 100.0).round() / 100.0
    }

    /// Closed-open bands: a score equal to a threshold takes the higher band
    pub fn band(&self, score: f64) -> ComplexityBand {
        if score >= self.scoring.high_threshold {
            ComplexityBand::High
        } else if score >= self.scoring.medium_threshold {
            ComplexityBand::Medium
        } else {
            ComplexityBand::Low
        }
    }

    /// Metrics of one file. Coupling is filled in once the graph exists.
    pub fn score(&self, file: &SourceFile, constructs: &ConstructSet, security_issues: usize) -> FileMetrics {
        let counts = Self::counts(constructs);
        let scriptlet_complexity = constructs.scriptlets().map(|s| s.complexity.score()).sum();
        let cyclomatic = Self::cyclomatic(constructs);

        let score = self.composite(&ScoreInputs {
            counts,
            scriptlet_complexity,
            cyclomatic,
            security_issues,
            line_count: file.line_count,
        });

        FileMetrics {
            path: file.relative_path.clone(),
            kind: file.kind,
            encoding: file.encoding,
            size_bytes: file.size_bytes,
            line_count: file.line_count,
            counts,
            scriptlet_lines: constructs.scriptlets().map(|s| s.lines).sum(),
            scriptlet_complexity,
            ast_scored_scriptlets: constructs
                .scriptlets()
                .filter(|s| s.complexity.analysis == ScriptAnalysis::Ast)
                .count(),
            cyclomatic,
            security_issues,
            score,
            band: self.band(score),
            coupling: CouplingMetrics::default(),
            frontend: constructs.profile.frontend.clone(),
        }
    }
}
