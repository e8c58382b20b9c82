//! Report Writers
//!
//! Pure consumers of an [`AnalysisOutcome`]: every file in the metrics map
//! and every graph edge is rendered, nothing is mutated. One format failing
//! to render or write is logged and the remaining formats still go out.

pub mod dot;
pub mod json;
pub mod markdown;

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::ReportFormat;
use crate::types::{AnalysisOutcome, JspError, Result};

/// Files written by [`write_reports`] and formats that failed
#[derive(Debug, Default)]
pub struct WrittenReports {
    pub written: Vec<(ReportFormat, PathBuf)>,
    pub failed: Vec<(ReportFormat, String)>,
}

/// Output path of one format: `<out_dir>/<prefix>.<ext>`
pub fn report_path(out_dir: &Path, prefix: &str, format: ReportFormat) -> PathBuf {
    out_dir.join(format!("{}.{}", prefix, format.extension()))
}

pub fn render(outcome: &AnalysisOutcome, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => json::render(outcome),
        ReportFormat::Markdown => Ok(markdown::render(outcome)),
        ReportFormat::Dot => Ok(dot::render(&outcome.report.graph)),
    }
}

/// Write each requested format. Only an unusable output directory is an
/// error.
pub fn write_reports(
    outcome: &AnalysisOutcome,
    out_dir: &Path,
    prefix: &str,
    formats: &[ReportFormat],
) -> Result<WrittenReports> {
    fs::create_dir_all(out_dir)?;

    let mut result = WrittenReports::default();
    for &format in formats {
        let path = report_path(out_dir, prefix, format);
        let written = render(outcome, format)
            .and_then(|body| fs::write(&path, body).map_err(JspError::from));

        match written {
            Ok(()) => {
                info!("Wrote {} report: {}", format, path.display());
                result.written.push((format, path));
            }
            Err(e) => {
                warn!("Failed to write {} report: {}", format, e);
                result.failed.push((format, e.to_string()));
            }
        }
    }

    Ok(result)
}
