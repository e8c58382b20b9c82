//! Configuration Types
//!
//! All configuration structures with defaults taken from `constants`.
//! Walk inclusion/exclusion rules are fixed and have no config surface.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants;
use crate::types::{JspError, Result};

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Extraction and per-file settings
    pub analysis: AnalysisConfig,

    /// Composite score weights and bands
    pub scoring: ScoringConfig,

    /// Include target resolution
    pub resolution: ResolutionConfig,

    /// Report output settings
    pub report: ReportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            analysis: AnalysisConfig::default(),
            scoring: ScoringConfig::default(),
            resolution: ResolutionConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `JspError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        for (name, weight) in self.scoring.weights.entries() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(JspError::Config(format!(
                    "Score weight '{}' must be a non-negative number, got {}",
                    name, weight
                )));
            }
        }

        let ScoringConfig {
            medium_threshold,
            high_threshold,
            ..
        } = self.scoring;
        if !(medium_threshold.is_finite() && high_threshold.is_finite())
            || medium_threshold <= 0.0
            || medium_threshold >= high_threshold
        {
            return Err(JspError::Config(format!(
                "Band thresholds must satisfy 0 < medium < high, got medium={} high={}",
                medium_threshold, high_threshold
            )));
        }

        if self.report.prefix.trim().is_empty() {
            return Err(JspError::Config(
                "Report prefix must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Analysis Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Run the per-file stage on the rayon thread pool
    pub parallel: bool,

    /// Allow structure-assisted form/custom tag extraction when compiled in
    pub use_markup_parser: bool,

    /// Allow AST-based scriptlet scoring when compiled in
    pub use_script_parser: bool,

    /// Files above this size get a `large_file` finding
    pub large_file_bytes: u64,

    /// Files with more scriptlets than this get an `excessive_scriptlets` finding
    pub excessive_scriptlets: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            use_markup_parser: true,
            use_script_parser: true,
            large_file_bytes: constants::findings::DEFAULT_LARGE_FILE_BYTES,
            excessive_scriptlets: constants::findings::DEFAULT_EXCESSIVE_SCRIPTLETS,
        }
    }
}

// =============================================================================
// Scoring Configuration
// =============================================================================

/// Weights of the composite complexity score. All must be non-negative,
/// which keeps the score monotonic in every count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub scriptlet: f64,
    /// Applied to the summed per-scriptlet branch/loop scores
    pub scriptlet_complexity: f64,
    pub declaration: f64,
    pub expression: f64,
    pub el: f64,
    pub jstl_tag: f64,
    pub custom_tag: f64,
    pub form_field: f64,
    pub session_access: f64,
    /// JDBC connections, queries and updates
    pub db_operation: f64,
    /// Opening markup tags; small, since pages carry hundreds
    pub html_element: f64,
    /// `<script>` blocks
    pub script_block: f64,
    pub cyclomatic: f64,
    pub security_issue: f64,
    /// Applied per hundred lines
    pub lines: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            scriptlet: 0.15,
            scriptlet_complexity: 0.3,
            declaration: 0.1,
            expression: 0.05,
            el: 0.05,
            jstl_tag: 0.05,
            custom_tag: 0.05,
            form_field: 0.02,
            session_access: 0.05,
            db_operation: 0.1,
            html_element: 0.001,
            script_block: 0.1,
            cyclomatic: 0.15,
            security_issue: 0.15,
            lines: 0.1,
        }
    }
}

impl ScoreWeights {
    pub fn entries(&self) -> [(&'static str, f64); 15] {
        [
            ("scriptlet", self.scriptlet),
            ("scriptlet_complexity", self.scriptlet_complexity),
            ("declaration", self.declaration),
            ("expression", self.expression),
            ("el", self.el),
            ("jstl_tag", self.jstl_tag),
            ("custom_tag", self.custom_tag),
            ("form_field", self.form_field),
            ("session_access", self.session_access),
            ("db_operation", self.db_operation),
            ("html_element", self.html_element),
            ("script_block", self.script_block),
            ("cyclomatic", self.cyclomatic),
            ("security_issue", self.security_issue),
            ("lines", self.lines),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoreWeights,
    /// Lowest score in the medium band
    pub medium_threshold: f64,
    /// Lowest score in the high band
    pub high_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            medium_threshold: constants::scoring::DEFAULT_MEDIUM_THRESHOLD,
            high_threshold: constants::scoring::DEFAULT_HIGH_THRESHOLD,
        }
    }
}

// =============================================================================
// Resolution Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Directories (relative to each webapp root) searched after the
    /// including file's own directory, in priority order
    pub roots: Vec<String>,

    /// Resolve otherwise unresolved targets by file name alone
    pub basename_fallback: bool,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            roots: vec![String::new(), constants::resolution::WEB_INF.to_string()],
            basename_fallback: false,
        }
    }
}

// =============================================================================
// Report Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Json,
    Markdown,
    Dot,
}

impl ReportFormat {
    pub const ALL: [ReportFormat; 3] = [Self::Json, Self::Markdown, Self::Dot];

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
            Self::Dot => "dot",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            "dot" | "graphviz" => Ok(Self::Dot),
            _ => Err(format!(
                "Invalid format '{}'. Valid values: json, markdown, dot",
                s
            )),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Markdown => write!(f, "markdown"),
            Self::Dot => write!(f, "dot"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Size of the most-complex ranking
    pub top_n: usize,

    /// Size of the most-included ranking
    pub most_included_n: usize,

    /// Output file name prefix
    pub prefix: String,

    /// Formats written by `analyze`
    pub formats: Vec<ReportFormat>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_n: constants::report::DEFAULT_TOP_N,
            most_included_n: constants::report::DEFAULT_MOST_INCLUDED_N,
            prefix: constants::report::DEFAULT_PREFIX.to_string(),
            formats: vec![ReportFormat::Json, ReportFormat::Markdown],
        }
    }
}
