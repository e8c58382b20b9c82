//! Analysis Pipeline
//!
//! Scan → per file (load, extract, findings, score) → barrier → graph →
//! coupling and cycles → summary.
//!
//! The per-file stage shares nothing between files and runs on the rayon
//! pool when `analysis.parallel` is set. Results are collected in scan
//! order, so parallel and sequential runs produce the same report.

use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use super::extractor::{Capabilities, Extractor};
use super::findings::{FindingsDetector, cycle_finding};
use super::graph::{self, GraphBuilder};
use super::loader::Loader;
use super::metrics::MetricsEngine;
use super::scanner::{FileScanner, ScannedFile};
use crate::config::Config;
use crate::types::{
    AnalysisOutcome, AnalysisReport, ConstructSet, DependencyGraph, Diagnostic, DiagnosticKind,
    FileMetrics, Finding, IncludedFile, JspError, NodeKind, RankedFile, Result, SummaryStats,
};

/// Everything one file contributes before the barrier
struct FileResult {
    path: String,
    constructs: ConstructSet,
    findings: Vec<Finding>,
    metrics: FileMetrics,
    diagnostics: Vec<Diagnostic>,
}

enum FileOutcome {
    Analyzed(Box<FileResult>),
    Skipped(Diagnostic),
}

/// Shared, read-only per-file machinery
struct Stage {
    loader: Loader,
    extractor: Extractor,
    detector: FindingsDetector,
    metrics: MetricsEngine,
}

pub struct Analyzer {
    config: Config,
    capabilities: Capabilities,
    loader: Loader,
    cancel: Option<Arc<AtomicBool>>,
}

impl Analyzer {
    pub fn new(config: Config) -> Self {
        let capabilities = Capabilities::requested(&config.analysis);
        Self {
            config,
            capabilities,
            loader: Loader::default(),
            cancel: None,
        }
    }

    /// Override which optional parsers are requested
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Replace the encoding candidates used to decode every file
    pub fn with_loader(mut self, loader: Loader) -> Self {
        self.loader = loader;
        self
    }

    /// Abort the run once `flag` is set. In-flight files are abandoned and
    /// no report is produced.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(JspError::Cancelled),
            _ => Ok(()),
        }
    }

    pub fn analyze(&self, root: &Path) -> Result<AnalysisOutcome> {
        self.check_cancelled()?;

        // ===== Discovery =====
        let scanner = FileScanner::new(root)?;
        info!("Scanning {}", scanner.root().display());
        let scan = scanner.scan();
        info!("Found {} template files", scan.files.len());
        let mut diagnostics = scan.diagnostics;

        // ===== Per-file Analysis =====
        let stage = Stage {
            loader: self.loader.clone(),
            extractor: Extractor::new(self.capabilities),
            detector: FindingsDetector::new(&self.config.analysis),
            metrics: MetricsEngine::new(self.config.scoring),
        };
        let encodings: Vec<_> = stage.loader.encodings().iter().map(|e| e.label()).collect();
        info!(
            "Strategies: markup={}, script={}; encodings: {}",
            stage.extractor.markup_strategy(),
            stage.extractor.script_strategy(),
            encodings.join(", ")
        );

        let outcomes: Vec<FileOutcome> = if self.config.analysis.parallel {
            scan.files
                .par_iter()
                .map(|file| self.process(&stage, file))
                .collect::<Result<_>>()?
        } else {
            scan.files
                .iter()
                .map(|file| self.process(&stage, file))
                .collect::<Result<_>>()?
        };

        let mut results = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                FileOutcome::Analyzed(result) => {
                    diagnostics.extend(result.diagnostics.iter().cloned());
                    results.push(*result);
                }
                FileOutcome::Skipped(diagnostic) => diagnostics.push(diagnostic),
            }
        }
        self.check_cancelled()?;

        // ===== Graph =====
        info!("Building include graph for {} files", results.len());
        let inputs: Vec<(&str, &ConstructSet)> = results
            .iter()
            .map(|r| (r.path.as_str(), &r.constructs))
            .collect();
        let graph = GraphBuilder::new(self.config.resolution.clone()).build(&inputs);
        let cycles = graph::cycles(&graph);
        let coupling = graph::coupling(&graph, &cycles);
        if !cycles.is_empty() {
            warn!("{} files sit on include cycles", cycles.len());
        }

        // ===== Report =====
        let mut files = BTreeMap::new();
        let mut findings = BTreeMap::new();
        for result in results {
            let mut metrics = result.metrics;
            if let Some(c) = coupling.get(&result.path) {
                metrics.coupling = *c;
            }

            let mut file_findings = result.findings;
            if let Some(cycle) = cycles.get(&result.path) {
                file_findings.push(cycle_finding(cycle));
                file_findings.sort();
            }
            if !file_findings.is_empty() {
                findings.insert(result.path.clone(), file_findings);
            }
            files.insert(result.path, metrics);
        }

        let summary = summarize(&self.config, &files, &findings, &graph);
        diagnostics.sort();

        info!(
            "Analysis complete: {} files, {} edges, {} diagnostics",
            summary.total_files,
            summary.total_edges,
            diagnostics.len()
        );

        Ok(AnalysisOutcome {
            report: AnalysisReport {
                project_root: scanner.root().display().to_string(),
                files,
                findings,
                graph,
                summary,
            },
            diagnostics,
        })
    }

    /// Load → extract → findings → score for one file. Only cancellation
    /// is an error; everything else is a diagnostic.
    fn process(&self, stage: &Stage, file: &ScannedFile) -> Result<FileOutcome> {
        self.check_cancelled()?;

        let source = match stage.loader.load_source(file) {
            Ok(source) => source,
            Err(e) => {
                warn!("Skipping {}: {}", file.relative_path, e);
                let kind = match e {
                    JspError::Decode { .. } => DiagnosticKind::DecodeError,
                    _ => DiagnosticKind::WalkIoError,
                };
                return Ok(FileOutcome::Skipped(Diagnostic::new(
                    kind,
                    Some(file.relative_path.clone()),
                    e.to_string(),
                )));
            }
        };

        let constructs = stage.extractor.extract(&source.text, source.kind);
        let (findings, finding_diagnostics) = stage.detector.detect(&source, &constructs);
        let security_issues = findings.iter().filter(|f| f.kind.is_security()).count();
        let metrics = stage.metrics.score(&source, &constructs, security_issues);

        let diagnostics = constructs
            .diagnostics
            .iter()
            .cloned()
            .chain(finding_diagnostics)
            .map(|d| d.with_path(&source.relative_path))
            .collect();

        debug!(
            "{}: {} constructs, score {:.2} ({})",
            source.relative_path,
            constructs.constructs.len(),
            metrics.score,
            metrics.band
        );

        Ok(FileOutcome::Analyzed(Box::new(FileResult {
            path: source.relative_path,
            constructs,
            findings,
            metrics,
            diagnostics,
        })))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn summarize(
    config: &Config,
    files: &BTreeMap<String, FileMetrics>,
    findings: &BTreeMap<String, Vec<Finding>>,
    graph: &DependencyGraph,
) -> SummaryStats {
    let mut summary = SummaryStats {
        total_files: files.len(),
        total_edges: graph.edge_count(),
        unresolved_targets: graph.nodes_of_kind(NodeKind::Unresolved).count(),
        dynamic_targets: graph.nodes_of_kind(NodeKind::Dynamic).count(),
        tag_references: graph.tag_references().len(),
        unresolved_tag_references: graph
            .tag_references()
            .iter()
            .filter(|r| r.target.is_none())
            .count(),
        total_findings: findings.values().map(Vec::len).sum(),
        ..SummaryStats::default()
    };

    for metrics in files.values() {
        summary.total_lines += metrics.line_count;
        summary.total_scriptlets += metrics.counts.scriptlets;
        summary.total_el_expressions += metrics.counts.el_expressions;
        summary.total_jstl_tags += metrics.counts.jstl_tags;
        summary.total_custom_tags += metrics.counts.custom_tags;
        summary.total_includes += metrics.counts.includes;
        summary.total_db_operations += metrics.counts.db_operations;
        summary.bands.record(metrics.band);
    }

    if !files.is_empty() {
        let n = files.len() as f64;
        summary.average_score = round2(files.values().map(|m| m.score).sum::<f64>() / n);
        summary.average_lines = round2(summary.total_lines as f64 / n);
    }

    let mut ranked: Vec<&FileMetrics> = files.values().collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.path.cmp(&b.path)));
    summary.most_complex = ranked
        .into_iter()
        .take(config.report.top_n)
        .map(|m| RankedFile {
            path: m.path.clone(),
            score: m.score,
            band: m.band,
            cyclomatic: m.cyclomatic,
        })
        .collect();

    let mut included: Vec<IncludedFile> = graph
        .nodes_of_kind(NodeKind::Source)
        .map(|node| IncludedFile {
            path: node.id.clone(),
            dependents: graph.dependents(&node.id).len(),
        })
        .filter(|f| f.dependents > 0)
        .collect();
    included.sort_by(|a, b| b.dependents.cmp(&a.dependents).then_with(|| a.path.cmp(&b.path)));
    included.truncate(config.report.most_included_n);
    summary.most_included = included;

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FindingKind, IncludeMechanism};
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &[u8]) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn sequential() -> Config {
        let mut config = Config::default();
        config.analysis.parallel = false;
        config
    }

    #[test]
    fn test_index_includes_header() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "index.jsp", br#"<%@ include file="header.jspf" %>
<p>${user.name}</p>"#);
        write(dir.path(), "header.jspf", b"<h1>Title</h1>\n");

        let outcome = Analyzer::new(Config::default()).analyze(dir.path()).unwrap();
        let report = &outcome.report;

        assert_eq!(report.files.len(), 2);
        let edges = report.graph.edges();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source, "index.jsp");
        assert_eq!(edges[0].target, "header.jspf");
        assert_eq!(edges[0].mechanism, IncludeMechanism::Directive);

        let header = &report.files["header.jspf"];
        assert_eq!(header.counts.includes, 0);
        assert_eq!(header.coupling.fan_in, 1);
        assert_eq!(report.files["index.jsp"].coupling.fan_out, 1);

        assert_eq!(report.summary.total_files, 2);
        assert_eq!(report.summary.total_edges, 1);
        assert_eq!(report.summary.most_included[0].path, "header.jspf");
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_all_mechanisms_and_unresolved() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "web/a.jsp", br#"<%@ include file="b.jspf" %>
<jsp:include page="b.jspf"/>
<c:import url="/missing.jsp"/>
<jsp:include page="<%= next %>"/>"#);
        write(dir.path(), "web/b.jspf", b"");

        let report = Analyzer::new(sequential()).analyze(dir.path()).unwrap().report;
        let mechanisms: Vec<_> = report.graph.edges_from("web/a.jsp").map(|e| e.mechanism).collect();
        assert_eq!(mechanisms.len(), 4);
        assert!(report.graph.node("unresolved:/missing.jsp").is_some());
        assert!(!report.files.contains_key("missing.jsp"));
        assert_eq!(report.summary.unresolved_targets, 1);
        assert_eq!(report.summary.dynamic_targets, 1);
    }

    #[test]
    fn test_walk_rules_applied() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "WEB-INF/tags/build/x.tag", b"<%@ tag body-content=\"empty\" %>");
        write(dir.path(), "target/generated/x.jsp", b"");
        write(dir.path(), "notes.txt", b"");

        let report = Analyzer::new(sequential()).analyze(dir.path()).unwrap().report;
        let paths: Vec<_> = report.files.keys().cloned().collect();
        assert_eq!(paths, vec!["WEB-INF/tags/build/x.tag"]);
    }

    #[test]
    fn test_idempotent_and_order_independent() {
        let dir = TempDir::new().unwrap();
        for i in 0..12 {
            write(
                dir.path(),
                &format!("p/page{:02}.jsp", i),
                format!(
                    "<%@ include file=\"../inc/common.jspf\" %>\n<% if (x > {}) {{ y(); }} %>\n",
                    i
                )
                .as_bytes(),
            );
        }
        write(dir.path(), "inc/common.jspf", b"<c:if test=\"${a}\">b</c:if>");

        let parallel = Analyzer::new(Config::default()).analyze(dir.path()).unwrap();
        let again = Analyzer::new(Config::default()).analyze(dir.path()).unwrap();
        let serial = Analyzer::new(sequential()).analyze(dir.path()).unwrap();

        let a = serde_json::to_string(&parallel.report).unwrap();
        assert_eq!(a, serde_json::to_string(&again.report).unwrap());
        assert_eq!(a, serde_json::to_string(&serial.report).unwrap());
        assert_eq!(parallel.report.summary.most_included[0].dependents, 12);
    }

    #[test]
    fn test_cycle_findings() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.jsp", br#"<%@ include file="b.jsp" %>"#);
        write(dir.path(), "b.jsp", br#"<%@ include file="a.jsp" %>"#);

        let report = Analyzer::new(sequential()).analyze(dir.path()).unwrap().report;
        let a = &report.findings["a.jsp"];
        assert_eq!(a[0].kind, FindingKind::CyclicDependency);
        assert_eq!(a[0].message, "Include cycle: a.jsp -> b.jsp -> a.jsp");
        assert!(report.files["b.jsp"].coupling.in_cycle);
    }

    #[test]
    fn test_shift_jis_file_is_decoded() {
        let dir = TempDir::new().unwrap();
        // "日本" in Shift_JIS
        write(dir.path(), "sjis.jsp", &[b'<', b'p', b'>', 0x93, 0xFA, 0x96, 0x7B, b'<', b'/', b'p', b'>']);

        let report = Analyzer::new(sequential()).analyze(dir.path()).unwrap().report;
        assert_eq!(
            report.files["sjis.jsp"].encoding,
            crate::types::SourceEncoding::ShiftJis
        );
    }

    #[test]
    fn test_tag_files_and_db_operations_summarized() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "web/list.jsp", br#"<%@ taglib prefix="ui" tagdir="/WEB-INF/tags" %>
<ui:row/><ui:missing/>
<% rs = stmt.executeQuery("select * from items"); %>"#);
        write(dir.path(), "web/WEB-INF/tags/row.tag", b"<%@ tag body-content=\"empty\" %><tr/>");

        let report = Analyzer::new(sequential()).analyze(dir.path()).unwrap().report;
        assert_eq!(report.summary.tag_references, 2);
        assert_eq!(report.summary.unresolved_tag_references, 1);
        assert_eq!(report.summary.total_db_operations, 1);
        assert_eq!(report.files["web/list.jsp"].counts.db_queries, 1);

        let row = report.graph.tag_references().iter().find(|r| r.tag == "row").unwrap();
        assert_eq!(row.target.as_deref(), Some("web/WEB-INF/tags/row.tag"));
        // the tag file is a node but not an include target
        assert_eq!(report.summary.total_edges, 0);
        assert_eq!(report.files["web/WEB-INF/tags/row.tag"].coupling.fan_in, 0);
    }

    #[test]
    fn test_undecodable_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "good.jsp", br#"<%@ include file="bad.jsp" %>"#);
        write(dir.path(), "bad.jsp", &[b'<', b'p', b'>', 0xFF, 0xFE]);

        let outcome = Analyzer::new(sequential())
            .with_loader(Loader::with_encodings(vec![crate::types::SourceEncoding::Utf8]))
            .analyze(dir.path())
            .unwrap();
        let report = &outcome.report;

        let paths: Vec<_> = report.files.keys().cloned().collect();
        assert_eq!(paths, vec!["good.jsp"]);
        assert_eq!(report.summary.total_files, 1);

        assert_eq!(outcome.diagnostics.len(), 1);
        let diagnostic = &outcome.diagnostics[0];
        assert_eq!(diagnostic.kind, DiagnosticKind::DecodeError);
        assert_eq!(diagnostic.path.as_deref(), Some("bad.jsp"));

        // a skipped file is not a source node, so the include is unresolved
        assert!(report.graph.node("unresolved:bad.jsp").is_some());
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let err = Analyzer::new(Config::default())
            .analyze(Path::new("/definitely/not/here"))
            .unwrap_err();
        assert!(matches!(err, JspError::RootNotFound { .. }));
    }

    #[test]
    fn test_cancelled_run_has_no_report() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.jsp", b"");
        let flag = Arc::new(AtomicBool::new(true));

        let err = Analyzer::new(Config::default())
            .with_cancel_flag(flag)
            .analyze(dir.path())
            .unwrap_err();
        assert!(matches!(err, JspError::Cancelled));
    }

    #[test]
    fn test_empty_project() {
        let dir = TempDir::new().unwrap();
        let report = Analyzer::new(Config::default()).analyze(dir.path()).unwrap().report;
        assert!(report.files.is_empty());
        assert_eq!(report.summary.average_score, 0.0);
        assert!(report.summary.most_complex.is_empty());
    }
}
