//! Graphviz DOT rendering of the include graph
//!
//! Source files are boxes, unresolved targets dashed and dynamic targets
//! dotted. Edge labels carry the mechanism and, when repeated, the count.

use crate::types::{DependencyGraph, IncludeMechanism, NodeKind};

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

fn node_style(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Source => "shape=box",
        NodeKind::Unresolved => "shape=box, style=dashed, color=red",
        NodeKind::Dynamic => "shape=ellipse, style=dotted, color=gray40",
    }
}

fn edge_color(mechanism: IncludeMechanism) -> &'static str {
    match mechanism {
        IncludeMechanism::Directive => "black",
        IncludeMechanism::Action => "blue",
        IncludeMechanism::Import => "darkgreen",
    }
}

pub fn render(graph: &DependencyGraph) -> String {
    let mut output = String::from("digraph includes {\n");
    output.push_str("    rankdir=LR;\n");
    output.push_str("    node [fontname=\"Helvetica\", fontsize=10];\n\n");

    for node in graph.nodes() {
        output.push_str(&format!(
            "    {} [label={}, {}];\n",
            quote(&node.id),
            quote(&node.label),
            node_style(node.kind)
        ));
    }
    output.push('\n');

    for edge in graph.edges() {
        let label = if edge.occurrences > 1 {
            format!("{} x{}", edge.mechanism, edge.occurrences)
        } else {
            edge.mechanism.to_string()
        };
        output.push_str(&format!(
            "    {} -> {} [label={}, color={}];\n",
            quote(&edge.source),
            quote(&edge.target),
            quote(&label),
            edge_color(edge.mechanism)
        ));
    }

    output.push_str("}\n");
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures;

    #[test]
    fn test_dot_renders_nodes_and_edges() {
        let outcome = fixtures::outcome();
        let dot = render(&outcome.report.graph);

        assert!(dot.starts_with("digraph includes {"));
        assert!(dot.trim_end().ends_with('}'));
        assert!(dot.contains(r#""index.jsp" -> "inc/header.jspf" [label="directive", color=black];"#));
        assert!(dot.contains(r#""unresolved:menu.jsp" [label="menu.jsp", shape=box, style=dashed, color=red];"#));
        assert_eq!(dot.matches(" -> ").count(), outcome.report.graph.edge_count());
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote(r#"a"b\c"#), r#""a\"b\\c""#);
    }
}
