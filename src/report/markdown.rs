//! Markdown report
//!
//! Summary, band distribution, rankings, per-file table, include table,
//! unresolved targets, tag files, front-end names, findings and
//! diagnostics.

use std::collections::BTreeSet;

use crate::types::{AnalysisOutcome, NodeKind};

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn names(set: &BTreeSet<String>) -> String {
    set.iter().map(|n| format!("`{}`", n)).collect::<Vec<_>>().join(", ")
}

pub fn render(outcome: &AnalysisOutcome) -> String {
    let report = &outcome.report;
    let summary = &report.summary;
    let mut output = String::new();

    output.push_str("# JSP Analysis Report\n\n");
    output.push_str(&format!("Project root: `{}`\n\n", report.project_root));

    // Summary
    output.push_str("## Summary\n\n");
    output.push_str("| Metric | Value |\n|---|---|\n");
    let rows = [
        ("Files", summary.total_files.to_string()),
        ("Lines", summary.total_lines.to_string()),
        ("Scriptlets", summary.total_scriptlets.to_string()),
        ("EL expressions", summary.total_el_expressions.to_string()),
        ("JSTL tags", summary.total_jstl_tags.to_string()),
        ("Custom tags", summary.total_custom_tags.to_string()),
        ("Includes", summary.total_includes.to_string()),
        ("DB operations", summary.total_db_operations.to_string()),
        ("Graph edges", summary.total_edges.to_string()),
        ("Unresolved targets", summary.unresolved_targets.to_string()),
        ("Dynamic targets", summary.dynamic_targets.to_string()),
        ("Tag references", summary.tag_references.to_string()),
        ("Unresolved tags", summary.unresolved_tag_references.to_string()),
        ("Findings", summary.total_findings.to_string()),
        ("Average score", format!("{:.2}", summary.average_score)),
        ("Average lines", format!("{:.2}", summary.average_lines)),
    ];
    for (name, value) in rows {
        output.push_str(&format!("| {} | {} |\n", name, value));
    }
    output.push('\n');

    output.push_str("### Complexity bands\n\n");
    output.push_str(&format!(
        "- low: {}\n- medium: {}\n- high: {}\n\n",
        summary.bands.low, summary.bands.medium, summary.bands.high
    ));

    if !summary.most_complex.is_empty() {
        output.push_str("### Most complex files\n\n");
        output.push_str("| # | File | Score | Band | Cyclomatic |\n|---|---|---|---|---|\n");
        for (i, file) in summary.most_complex.iter().enumerate() {
            output.push_str(&format!(
                "| {} | `{}` | {:.2} | {} | {} |\n",
                i + 1,
                cell(&file.path),
                file.score,
                file.band,
                file.cyclomatic
            ));
        }
        output.push('\n');
    }

    if !summary.most_included.is_empty() {
        output.push_str("### Most included files\n\n");
        for file in &summary.most_included {
            output.push_str(&format!("- `{}`: {} dependents\n", file.path, file.dependents));
        }
        output.push('\n');
    }

    // Files
    output.push_str("## Files\n\n");
    output.push_str(
        "| File | Kind | Encoding | Lines | Scriptlets | EL | JSTL | Custom | Includes | DB | HTML | Cyclomatic | Score | Band | Fan-in | Fan-out |\n",
    );
    output.push_str("|---|---|---|---|---|---|---|---|---|---|---|---|---|---|---|---|\n");
    for m in report.files.values() {
        output.push_str(&format!(
            "| `{}` | {} | {} | {} | {} | {} | {} | {} | {} | {} | {} | {} | {:.2} | {} | {} | {} |\n",
            cell(&m.path),
            m.kind,
            m.encoding,
            m.line_count,
            m.counts.scriptlets,
            m.counts.el_expressions,
            m.counts.jstl_tags,
            m.counts.custom_tags,
            m.counts.includes,
            m.counts.db_operations,
            m.counts.html_elements,
            m.cyclomatic,
            m.score,
            m.band,
            m.coupling.fan_in,
            m.coupling.fan_out
        ));
    }
    output.push('\n');

    // Includes
    output.push_str("## Includes\n\n");
    if report.graph.edges().is_empty() {
        output.push_str("No includes found.\n\n");
    } else {
        output.push_str("| Source | Target | Mechanism | Occurrences |\n|---|---|---|---|\n");
        for edge in report.graph.edges() {
            output.push_str(&format!(
                "| `{}` | `{}` | {} | {} |\n",
                cell(&edge.source),
                cell(&edge.target),
                edge.mechanism,
                edge.occurrences
            ));
        }
        output.push('\n');
    }

    let unresolved: Vec<_> = report
        .graph
        .nodes()
        .filter(|n| !n.is_source())
        .collect();
    if !unresolved.is_empty() {
        output.push_str("### Unresolved targets\n\n");
        for node in unresolved {
            let kind = match node.kind {
                NodeKind::Dynamic => "dynamic",
                _ => "not found",
            };
            let dependents: Vec<_> = report.graph.dependents(&node.id).into_iter().collect();
            output.push_str(&format!(
                "- `{}` ({}), from {}\n",
                node.label,
                kind,
                dependents.join(", ")
            ));
        }
        output.push('\n');
    }

    // Tag files
    let tags = report.graph.tag_references();
    if !tags.is_empty() {
        output.push_str("## Tag files\n\n");
        output.push_str("| Source | Tag | Tag file | Occurrences |\n|---|---|---|---|\n");
        for reference in tags {
            let target = match &reference.target {
                Some(path) => format!("`{}`", cell(path)),
                None => "(no tag file)".to_string(),
            };
            output.push_str(&format!(
                "| `{}` | `{}:{}` | {} | {} |\n",
                cell(&reference.source),
                reference.prefix,
                reference.tag,
                target,
                reference.occurrences
            ));
        }
        output.push('\n');
    }

    // Front-end
    let frontend: Vec<_> = report
        .files
        .values()
        .filter(|m| !m.frontend.is_empty())
        .collect();
    if !frontend.is_empty() {
        output.push_str("## Front-end\n\n");
        for m in frontend {
            output.push_str(&format!("### `{}`\n\n", m.path));
            let inventory = &m.frontend;
            for (label, set) in [
                ("CSS classes", &inventory.css_classes),
                ("JS functions", &inventory.js_functions),
                ("JS calls", &inventory.js_calls),
            ] {
                if !set.is_empty() {
                    output.push_str(&format!("- {}: {}\n", label, names(set)));
                }
            }
            output.push('\n');
        }
    }

    // Findings
    output.push_str("## Findings\n\n");
    if report.findings.is_empty() {
        output.push_str("No findings.\n\n");
    } else {
        for (path, findings) in &report.findings {
            output.push_str(&format!("### `{}`\n\n", path));
            for finding in findings {
                match finding.line {
                    Some(line) => output.push_str(&format!(
                        "- **{}** (line {}): {}\n",
                        finding.kind, line, finding.message
                    )),
                    None => output.push_str(&format!("- **{}**: {}\n", finding.kind, finding.message)),
                }
            }
            output.push('\n');
        }
    }

    if !outcome.diagnostics.is_empty() {
        output.push_str("## Diagnostics\n\n");
        for diagnostic in &outcome.diagnostics {
            output.push_str(&format!("- {}\n", diagnostic));
        }
        output.push('\n');
    }

    output.push_str("---\n");
    output.push_str(&format!("Generated by jsplens v{}\n", env!("CARGO_PKG_VERSION")));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures;

    #[test]
    fn test_markdown_sections() {
        let md = render(&fixtures::outcome());
        assert!(md.starts_with("# JSP Analysis Report"));
        assert!(md.contains("| Files | 2 |"));
        assert!(md.contains("| 1 | `index.jsp` | 7.25 | medium | 4 |"));
        assert!(md.contains("| `index.jsp` | `inc/header.jspf` | directive | 1 |"));
        assert!(md.contains("- `menu.jsp` (not found), from index.jsp"));
        assert!(md.contains("- `${page}` (dynamic), from index.jsp"));
        assert!(md.contains("- **xss** (line 3):"));
        assert!(md.contains("[DECODE_ERROR] broken.jsp: no encoding"));
        assert!(md.contains("| DB operations | 0 |"));
        assert!(md.contains("| `index.jsp` | `ui:card` | `WEB-INF/tags/ui/card.tag` | 2 |"));
        assert!(md.contains("| `index.jsp` | `ui:gone` | (no tag file) | 1 |"));
        assert!(md.contains("- CSS classes: `nav`, `row`"));
        assert!(md.contains("- JS functions: `toggle`"));
    }

    #[test]
    fn test_every_file_rendered() {
        let outcome = fixtures::outcome();
        let md = render(&outcome);
        for path in outcome.report.files.keys() {
            assert!(md.contains(&format!("| `{}` |", path)), "{}", path);
        }
    }

    #[test]
    fn test_cell_escaping() {
        assert_eq!(cell("a|b\nc"), "a\\|b c");
    }
}
