use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::construct::IncludeMechanism;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A discovered source file
    Source,
    /// A literal include target that matched no discovered file
    Unresolved,
    /// An expression-valued include target
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    /// Relative path for source nodes, literal target text otherwise
    pub label: String,
}

impl GraphNode {
    pub fn source(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            id: path.clone(),
            kind: NodeKind::Source,
            label: path,
        }
    }

    pub fn is_source(&self) -> bool {
        self.kind == NodeKind::Source
    }
}

/// A custom tag used by a file and the tag file that implements it, if
/// one was discovered. Tag references never add include edges.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TagReference {
    pub source: String,
    pub prefix: String,
    pub tag: String,
    /// Discovered `.tag`/`.tagx` file, `None` for TLD-backed or missing tags
    pub target: Option<String>,
    pub occurrences: usize,
}

/// Directed "includes" edge. Distinct mechanisms between the same pair are
/// distinct edges; repeats of the same triple are folded into `occurrences`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub source: String,
    pub target: String,
    pub mechanism: IncludeMechanism,
    pub occurrences: usize,
}

impl DependencyEdge {
    pub fn key(&self) -> (&str, &str, IncludeMechanism) {
        (&self.source, &self.target, self.mechanism)
    }
}

/// Include graph of one run. Built once from the complete per-file results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyGraph {
    nodes: BTreeMap<String, GraphNode>,
    edges: Vec<DependencyEdge>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tag_references: Vec<TagReference>,
}

impl DependencyGraph {
    /// Assemble a graph; edges are put in canonical order.
    ///
    /// Every edge endpoint must already be a node.
    pub fn new(nodes: BTreeMap<String, GraphNode>, mut edges: Vec<DependencyEdge>) -> Self {
        debug_assert!(
            edges
                .iter()
                .all(|e| nodes.contains_key(&e.source) && nodes.contains_key(&e.target)),
            "edge endpoint missing from node set"
        );
        edges.sort();
        debug_assert!(
            edges.windows(2).all(|pair| pair[0].key() != pair[1].key()),
            "repeated edge triple was not folded"
        );
        Self {
            nodes,
            edges,
            tag_references: Vec::new(),
        }
    }

    /// Attach custom tag references, in canonical order
    pub fn with_tag_references(mut self, mut references: Vec<TagReference>) -> Self {
        references.sort();
        self.tag_references = references;
        self
    }

    pub fn tag_references(&self) -> &[TagReference] {
        &self.tag_references
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values().filter(move |n| n.kind == kind)
    }

    pub fn edges_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a DependencyEdge> {
        self.edges.iter().filter(move |e| e.source == id)
    }

    pub fn edges_to<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a DependencyEdge> {
        self.edges.iter().filter(move |e| e.target == id)
    }

    /// Distinct files that include `id`
    pub fn dependents<'a>(&'a self, id: &'a str) -> BTreeSet<&'a str> {
        self.edges_to(id).map(|e| e.source.as_str()).collect()
    }

    /// Distinct targets `id` includes
    pub fn dependencies<'a>(&'a self, id: &'a str) -> BTreeSet<&'a str> {
        self.edges_from(id).map(|e| e.target.as_str()).collect()
    }
}
