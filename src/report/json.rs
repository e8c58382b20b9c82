use serde::Serialize;

use crate::types::{AnalysisOutcome, AnalysisReport, Diagnostic, Result};

#[derive(Serialize)]
struct JsonReport<'a> {
    tool: &'static str,
    version: &'static str,
    #[serde(flatten)]
    report: &'a AnalysisReport,
    diagnostics: &'a [Diagnostic],
}

/// Pretty JSON of the whole report plus its diagnostics
pub fn render(outcome: &AnalysisOutcome) -> Result<String> {
    let body = JsonReport {
        tool: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        report: &outcome.report,
        diagnostics: &outcome.diagnostics,
    };
    Ok(serde_json::to_string_pretty(&body)?)
}
