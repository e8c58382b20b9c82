//! Analyze Command
//!
//! Runs the analyzer over a project tree and writes the requested reports.
//!
//! Usage:
//!   jsplens analyze [PATH] [-o DIR] [-p PREFIX] [-f json,markdown,dot|all]
//!                   [--sequential] [--no-markup-parser] [--no-script-parser]

use std::path::PathBuf;

use crate::analyzer::Analyzer;
use crate::cli::ui::Output;
use crate::config::{Config, ConfigLoader, ReportFormat};
use crate::constants::report::DEFAULT_OUTPUT_DIR;
use crate::report;
use crate::types::{AnalysisOutcome, JspError, Result};

#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    pub path: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub prefix: Option<String>,
    /// Raw `--format` values; empty means the configured formats
    pub formats: Vec<String>,
    pub sequential: bool,
    pub no_markup_parser: bool,
    pub no_script_parser: bool,
    pub quiet: bool,
}

/// Expand `--format` values. `all` selects every format.
pub fn resolve_formats(values: &[String], configured: &[ReportFormat]) -> Result<Vec<ReportFormat>> {
    if values.is_empty() {
        return Ok(configured.to_vec());
    }

    let mut formats = Vec::new();
    for value in values {
        let selected = if value.eq_ignore_ascii_case("all") {
            ReportFormat::ALL.to_vec()
        } else {
            vec![value.parse::<ReportFormat>().map_err(JspError::Config)?]
        };
        for format in selected {
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
    }
    Ok(formats)
}

/// Command-line switches layered over the loaded configuration
pub fn apply_overrides(mut config: Config, options: &AnalyzeOptions) -> Result<Config> {
    if options.sequential {
        config.analysis.parallel = false;
    }
    if options.no_markup_parser {
        config.analysis.use_markup_parser = false;
    }
    if options.no_script_parser {
        config.analysis.use_script_parser = false;
    }
    if let Some(prefix) = &options.prefix {
        config.report.prefix = prefix.clone();
    }
    config.report.formats = resolve_formats(&options.formats, &config.report.formats)?;
    config.validate()?;
    Ok(config)
}

pub fn run(options: AnalyzeOptions) -> Result<()> {
    let out = Output::quiet(options.quiet);
    let root = options.path.clone().unwrap_or_else(|| PathBuf::from("."));

    let config = apply_overrides(ConfigLoader::load(&root)?, &options)?;
    let output_dir = options
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

    out.info(&format!("Analyzing {}", root.display()));
    let outcome = Analyzer::new(config.clone()).analyze(&root)?;
    print_summary(&out, &outcome);

    let written = report::write_reports(&outcome, &output_dir, &config.report.prefix, &config.report.formats)?;

    out.section("Reports");
    for (format, path) in &written.written {
        out.success(&format!("{}: {}", format, path.display()));
    }
    for (format, message) in &written.failed {
        out.warning(&format!("{} report not written: {}", format, message));
    }

    Ok(())
}

fn print_summary(out: &Output, outcome: &AnalysisOutcome) {
    let summary = &outcome.report.summary;

    out.header("JSP Analysis");
    out.stat("Files", summary.total_files);
    out.stat("Lines", summary.total_lines);
    out.stat("Scriptlets", summary.total_scriptlets);
    out.stat("Include edges", summary.total_edges);
    out.stat("Unresolved targets", summary.unresolved_targets);
    out.stat("Dynamic targets", summary.dynamic_targets);
    out.stat("Unresolved tags", summary.unresolved_tag_references);
    out.stat("DB operations", summary.total_db_operations);
    out.stat("Findings", summary.total_findings);
    out.stat("Average score", format!("{:.2}", summary.average_score));
    out.stat(
        "Bands",
        format!(
            "{} low / {} medium / {} high",
            summary.bands.low, summary.bands.medium, summary.bands.high
        ),
    );

    if !summary.most_complex.is_empty() {
        out.section("Most complex");
        for file in &summary.most_complex {
            out.stat(&file.path, format!("{:.2} {}", file.score, Output::band(file.band)));
        }
    }

    if !outcome.diagnostics.is_empty() {
        out.warning(&format!("{} diagnostics recorded", outcome.diagnostics.len()));
        for diagnostic in outcome.diagnostics.iter().take(10) {
            out.warning(&diagnostic.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_formats() {
        let configured = [ReportFormat::Json];
        assert_eq!(resolve_formats(&[], &configured).unwrap(), vec![ReportFormat::Json]);
        assert_eq!(
            resolve_formats(&["all".to_string()], &configured).unwrap(),
            ReportFormat::ALL.to_vec()
        );
        assert_eq!(
            resolve_formats(&["dot".to_string(), "md".to_string(), "dot".to_string()], &configured)
                .unwrap(),
            vec![ReportFormat::Dot, ReportFormat::Markdown]
        );
        assert!(resolve_formats(&["csv".to_string()], &configured).is_err());
    }

    #[test]
    fn test_overrides() {
        let options = AnalyzeOptions {
            prefix: Some("legacy".to_string()),
            sequential: true,
            no_script_parser: true,
            ..AnalyzeOptions::default()
        };
        let config = apply_overrides(Config::default(), &options).unwrap();
        assert!(!config.analysis.parallel);
        assert!(config.analysis.use_markup_parser);
        assert!(!config.analysis.use_script_parser);
        assert_eq!(config.report.prefix, "legacy");

        let empty_prefix = AnalyzeOptions {
            prefix: Some(" ".to_string()),
            ..AnalyzeOptions::default()
        };
        assert!(apply_overrides(Config::default(), &empty_prefix).is_err());
    }
}
