//! Dependency Graph Builder
//!
//! Resolves include targets against the discovered file set and assembles
//! the include graph in one pass. Resolution never touches the filesystem:
//! a target either names a discovered file or becomes a placeholder node.
//!
//! ## Resolution order
//!
//! For a literal target (query string and fragment removed):
//!
//! 1. Relative targets: the including file's directory
//! 2. For each webapp root (the parent of any `WEB-INF` segment, sorted,
//!    then the project root), each configured root below it, in order
//! 3. Optional basename fallback
//!
//! The first candidate that is a discovered file wins. Candidates that
//! climb above the project root with `..` are discarded.
//!
//! ## Tag files
//!
//! Custom tags are matched to discovered `.tag`/`.tagx` files and kept as
//! tag references beside the graph. A taglib with `tagdir` is searched in
//! that directory only; any other prefix matches tag files by name, those
//! under `WEB-INF/tags` first.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use tracing::{debug, trace};

use crate::config::ResolutionConfig;
use crate::constants::resolution::{
    DYNAMIC_PREFIX, TAG_EXTENSIONS, TAGS_DIR, UNRESOLVED_PREFIX, WEB_INF,
};
use crate::types::{
    ConstructSet, CouplingMetrics, DependencyEdge, DependencyGraph, FileKind, GraphNode,
    IncludeMechanism, NodeKind, TagReference,
};

// =============================================================================
// Path Helpers
// =============================================================================

/// Drop `?query` and `#fragment` from an include target
pub fn strip_target(target: &str) -> &str {
    let end = target.find(['?', '#']).unwrap_or(target.len());
    target[..end].trim()
}

/// Collapse `.` and `..` segments. `None` when the path climbs above its base.
pub fn normalize(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            s => segments.push(s),
        }
    }
    Some(segments.join("/"))
}

fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, name)| name).unwrap_or(path)
}

/// Files under the tags directory sort first, then by path
fn tags_dir_first<'p>(path: &&'p str) -> (bool, &'p str) {
    (!path.contains(TAGS_DIR), *path)
}

fn join(base: &str, rel: &str) -> String {
    match (base.is_empty(), rel.is_empty()) {
        (true, _) => rel.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{}/{}", base, rel),
    }
}

/// Directories directly above a `WEB-INF` segment, sorted, followed by the
/// project root itself
pub fn webapp_roots<'a>(paths: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut roots = BTreeSet::new();
    for path in paths {
        let segments: Vec<&str> = path.split('/').collect();
        if let Some(pos) = segments.iter().position(|s| *s == WEB_INF)
            && pos > 0
        {
            roots.insert(segments[..pos].join("/"));
        }
    }
    roots.into_iter().chain(std::iter::once(String::new())).collect()
}

// =============================================================================
// Resolver
// =============================================================================

/// Target resolution against a fixed set of discovered relative paths
pub struct Resolver<'a> {
    discovered: &'a BTreeSet<&'a str>,
    webapp_roots: Vec<String>,
    roots: &'a [String],
    by_name: Option<BTreeMap<&'a str, Vec<&'a str>>>,
    /// Tag files by tag name
    tags: BTreeMap<&'a str, Vec<&'a str>>,
}

impl<'a> Resolver<'a> {
    pub fn new(discovered: &'a BTreeSet<&'a str>, config: &'a ResolutionConfig) -> Self {
        let by_name = config.basename_fallback.then(|| {
            let mut by_name: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
            for &path in discovered.iter() {
                by_name.entry(file_name(path)).or_default().push(path);
            }
            for candidates in by_name.values_mut() {
                candidates.sort_by_key(tags_dir_first);
            }
            by_name
        });

        let mut tags: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for &path in discovered.iter() {
            if !FileKind::from_path(path).is_some_and(|kind| kind.is_tag_file()) {
                continue;
            }
            if let Some((stem, _)) = file_name(path).rsplit_once('.') {
                tags.entry(stem).or_default().push(path);
            }
        }
        for candidates in tags.values_mut() {
            candidates.sort_by_key(tags_dir_first);
        }

        Self {
            discovered,
            webapp_roots: webapp_roots(discovered.iter().copied()),
            roots: &config.roots,
            by_name,
            tags,
        }
    }

    pub fn webapp_roots(&self) -> &[String] {
        &self.webapp_roots
    }

    /// Search order for `target` included from `from`
    pub fn candidates(&self, from: &str, target: &str) -> Vec<String> {
        let target = strip_target(target);
        if target.is_empty() {
            return Vec::new();
        }

        let mut candidates = Vec::new();
        let rel = match target.strip_prefix('/') {
            Some(context_relative) => context_relative,
            None => {
                candidates.push(join(parent_dir(from), target));
                target
            }
        };

        for webapp in &self.webapp_roots {
            for root in self.roots {
                candidates.push(join(&join(webapp, root), rel));
            }
        }

        let mut seen = BTreeSet::new();
        candidates
            .into_iter()
            .filter_map(|c| normalize(&c))
            .filter(|c| seen.insert(c.clone()))
            .collect()
    }

    /// Discovered file `target` names, if any
    pub fn resolve(&self, from: &str, target: &str) -> Option<&'a str> {
        for candidate in self.candidates(from, target) {
            if let Some(found) = self.discovered.get(candidate.as_str()) {
                return Some(*found);
            }
        }

        let by_name = self.by_name.as_ref()?;
        let name = file_name(strip_target(target));
        let found = by_name.get(name)?.first().copied();
        if let Some(path) = found {
            trace!("{} -> {} resolved by file name to {}", from, target, path);
        }
        found
    }

    /// Tag file implementing `tag`. With a `tagdir` only that directory of
    /// each webapp root is searched.
    pub fn resolve_tag(&self, tagdir: Option<&str>, tag: &str) -> Option<&'a str> {
        let Some(dir) = tagdir else {
            return self.tags.get(tag)?.first().copied();
        };

        let dir = dir.trim().trim_start_matches('/');
        for webapp in &self.webapp_roots {
            for ext in TAG_EXTENSIONS {
                let candidate = join(&join(webapp, dir), &format!("{}.{}", tag, ext));
                let Some(candidate) = normalize(&candidate) else {
                    continue;
                };
                if let Some(found) = self.discovered.get(candidate.as_str()) {
                    return Some(*found);
                }
            }
        }
        None
    }
}

// =============================================================================
// Builder
// =============================================================================

pub struct GraphBuilder {
    resolution: ResolutionConfig,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(ResolutionConfig::default())
    }
}

impl GraphBuilder {
    pub fn new(resolution: ResolutionConfig) -> Self {
        Self { resolution }
    }

    /// Build the include graph from every file's extraction result.
    ///
    /// Every discovered file becomes a node even without includes. Edges
    /// with the same source, target and mechanism are folded together.
    pub fn build(&self, files: &[(&str, &ConstructSet)]) -> DependencyGraph {
        let discovered: BTreeSet<&str> = files.iter().map(|(path, _)| *path).collect();
        let resolver = Resolver::new(&discovered, &self.resolution);

        let mut nodes: BTreeMap<String, GraphNode> = discovered
            .iter()
            .map(|path| (path.to_string(), GraphNode::source(*path)))
            .collect();
        let mut edges: BTreeMap<(String, String, IncludeMechanism), usize> = BTreeMap::new();

        for (path, constructs) in files {
            for (_, include) in constructs.includes() {
                let target = if include.dynamic {
                    placeholder(&mut nodes, NodeKind::Dynamic, &include.target)
                } else {
                    match resolver.resolve(path, &include.target) {
                        Some(found) => found.to_string(),
                        None => {
                            debug!("{}: include target '{}' not found", path, include.target);
                            placeholder(&mut nodes, NodeKind::Unresolved, &include.target)
                        }
                    }
                };

                *edges
                    .entry((path.to_string(), target, include.mechanism))
                    .or_default() += 1;
            }
        }

        let edges = edges
            .into_iter()
            .map(|((source, target, mechanism), occurrences)| DependencyEdge {
                source,
                target,
                mechanism,
                occurrences,
            })
            .collect();

        DependencyGraph::new(nodes, edges).with_tag_references(tag_references(&resolver, files))
    }
}

/// One reference per (file, prefix, tag), resolved once
fn tag_references(resolver: &Resolver<'_>, files: &[(&str, &ConstructSet)]) -> Vec<TagReference> {
    let mut references: BTreeMap<(&str, &str, &str), TagReference> = BTreeMap::new();

    for &(path, constructs) in files {
        let tagdirs: BTreeMap<&str, &str> = constructs
            .taglibs()
            .filter_map(|attributes| {
                Some((attributes.get("prefix")?.as_str(), attributes.get("tagdir")?.as_str()))
            })
            .collect();

        for (prefix, tag) in constructs.custom_tags() {
            let reference = references.entry((path, prefix, tag)).or_insert_with(|| {
                let target = resolver.resolve_tag(tagdirs.get(prefix).copied(), tag);
                if target.is_none() {
                    trace!("{}: no tag file for <{}:{}>", path, prefix, tag);
                }
                TagReference {
                    source: path.to_string(),
                    prefix: prefix.to_string(),
                    tag: tag.to_string(),
                    target: target.map(str::to_string),
                    occurrences: 0,
                }
            });
            reference.occurrences += 1;
        }
    }

    references.into_values().collect()
}

/// Create or reuse the node of a target that is not a discovered file
fn placeholder(nodes: &mut BTreeMap<String, GraphNode>, kind: NodeKind, target: &str) -> String {
    let label = target.trim();
    let prefix = match kind {
        NodeKind::Dynamic => DYNAMIC_PREFIX,
        _ => UNRESOLVED_PREFIX,
    };
    let id = format!("{}{}", prefix, label);

    nodes.entry(id.clone()).or_insert_with(|| GraphNode {
        id: id.clone(),
        kind,
        label: label.to_string(),
    });
    id
}

// =============================================================================
// Graph Metrics
// =============================================================================

/// Include cycles between discovered files.
///
/// Maps every file that sits on a cycle to the shortest cycle through it,
/// written as a closed path (`[a, b, a]`). A file including itself is a
/// cycle of one.
pub fn cycles(graph: &DependencyGraph) -> BTreeMap<String, Vec<String>> {
    let mut petgraph: DiGraph<&str, ()> = DiGraph::new();
    let mut index: HashMap<&str, NodeIndex> = HashMap::new();
    for node in graph.nodes_of_kind(NodeKind::Source) {
        index.insert(&node.id, petgraph.add_node(&node.id));
    }

    let mut successors: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for edge in graph.edges() {
        if let (Some(&from), Some(&to)) = (index.get(edge.source.as_str()), index.get(edge.target.as_str())) {
            petgraph.update_edge(from, to, ());
            successors
                .entry(edge.source.as_str())
                .or_default()
                .insert(edge.target.as_str());
        }
    }

    let mut cycles = BTreeMap::new();
    for component in tarjan_scc(&petgraph) {
        let members: BTreeSet<&str> = component.iter().map(|&i| petgraph[i]).collect();
        let cyclic = members.len() > 1
            || component
                .first()
                .is_some_and(|&i| petgraph.find_edge(i, i).is_some());
        if !cyclic {
            continue;
        }

        for member in &members {
            if let Some(path) = shortest_cycle(member, &members, &successors) {
                cycles.insert(member.to_string(), path);
            }
        }
    }

    cycles
}

/// Breadth-first search from `start` back to itself inside one component
fn shortest_cycle(
    start: &str,
    members: &BTreeSet<&str>,
    successors: &BTreeMap<&str, BTreeSet<&str>>,
) -> Option<Vec<String>> {
    let mut parent: BTreeMap<&str, &str> = BTreeMap::new();
    let mut queue = VecDeque::from([start]);

    while let Some(node) = queue.pop_front() {
        for &next in successors.get(node).into_iter().flatten() {
            if next == start {
                let mut path = vec![start.to_string()];
                let mut cursor = node;
                let mut back = Vec::new();
                while cursor != start {
                    back.push(cursor.to_string());
                    cursor = *parent.get(cursor)?;
                }
                path.extend(back.into_iter().rev());
                path.push(start.to_string());
                return Some(path);
            }
            if members.contains(next) && !parent.contains_key(next) {
                parent.insert(next, node);
                queue.push_back(next);
            }
        }
    }

    None
}

/// Fan-in, fan-out and instability of every discovered file
pub fn coupling(
    graph: &DependencyGraph,
    cycles: &BTreeMap<String, Vec<String>>,
) -> BTreeMap<String, CouplingMetrics> {
    graph
        .nodes_of_kind(NodeKind::Source)
        .map(|node| {
            let fan_in = graph.dependents(&node.id).len();
            let fan_out = graph.dependencies(&node.id).len();
            let instability = if fan_in + fan_out == 0 {
                0.0
            } else {
                fan_out as f64 / (fan_in + fan_out) as f64
            };
            (
                node.id.clone(),
                CouplingMetrics {
                    fan_in,
                    fan_out,
                    instability,
                    in_cycle: cycles.contains_key(&node.id),
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::extractor::{Capabilities, Extractor};
    use crate::types::FileKind;

    fn extract(text: &str) -> ConstructSet {
        Extractor::new(Capabilities::pattern_only()).extract(text, FileKind::Jsp)
    }

    fn build(files: &[(&str, &str)]) -> DependencyGraph {
        build_with(files, ResolutionConfig::default())
    }

    fn build_with(files: &[(&str, &str)], config: ResolutionConfig) -> DependencyGraph {
        let sets: Vec<(&str, ConstructSet)> = files.iter().map(|(p, t)| (*p, extract(t))).collect();
        let refs: Vec<(&str, &ConstructSet)> = sets.iter().map(|(p, s)| (*p, s)).collect();
        GraphBuilder::new(config).build(&refs)
    }

    fn edge_list(graph: &DependencyGraph) -> Vec<(String, String, IncludeMechanism, usize)> {
        graph
            .edges()
            .iter()
            .map(|e| (e.source.clone(), e.target.clone(), e.mechanism, e.occurrences))
            .collect()
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(strip_target(" a.jsp?x=1#top "), "a.jsp");
        assert_eq!(normalize("web/./inc/../a.jsp").as_deref(), Some("web/a.jsp"));
        assert_eq!(normalize("../a.jsp"), None);
        assert_eq!(
            webapp_roots(["app/web/WEB-INF/x.jsp", "WEB-INF/y.jsp", "a.jsp", "b/WEB-INF/c.jsp"]),
            vec!["app/web".to_string(), "b".to_string(), String::new()]
        );
    }

    #[test]
    fn test_same_directory_edge() {
        let graph = build(&[
            ("web/index.jsp", r#"<%@ include file="header.jspf" %>"#),
            ("web/header.jspf", "<h1/>"),
        ]);
        assert_eq!(
            edge_list(&graph),
            vec![(
                "web/index.jsp".to_string(),
                "web/header.jspf".to_string(),
                IncludeMechanism::Directive,
                1
            )]
        );
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_unresolved_target_is_not_fabricated() {
        let graph = build(&[("index.jsp", r#"<jsp:include page="missing.jspf"/>"#)]);
        let node = graph.node("unresolved:missing.jspf").unwrap();
        assert_eq!(node.kind, NodeKind::Unresolved);
        assert_eq!(node.label, "missing.jspf");
        assert!(graph.node("missing.jspf").is_none());
        assert_eq!(graph.nodes_of_kind(NodeKind::Source).count(), 1);
    }

    #[test]
    fn test_mechanisms_distinct_and_repeats_folded() {
        let graph = build(&[
            (
                "a.jsp",
                r#"<%@ include file="b.jspf" %>
<%@ include file="b.jspf" %>
<jsp:include page="b.jspf"/>
<c:import url="b.jspf"/>"#,
            ),
            ("b.jspf", ""),
        ]);
        let edges = edge_list(&graph);
        assert_eq!(edges.len(), 3);
        assert_eq!(edges[0].2, IncludeMechanism::Directive);
        assert_eq!(edges[0].3, 2);
        assert_eq!(graph.dependents("b.jspf").len(), 1);
    }

    #[test]
    fn test_dynamic_target() {
        let graph = build(&[("a.jsp", r#"<jsp:include page="${next}"/>"#)]);
        let edge = &graph.edges()[0];
        assert_eq!(edge.target, "dynamic:${next}");
        assert_eq!(graph.node(&edge.target).unwrap().kind, NodeKind::Dynamic);
    }

    #[test]
    fn test_context_relative_and_conventional_roots() {
        let graph = build(&[
            ("app/web/pages/list.jsp", r#"<%@ include file="/WEB-INF/jspf/head.jspf" %>
<jsp:include page="/common/nav.jsp?tab=1"/>
<%@ include file="jspf/foot.jspf" %>"#),
            ("app/web/WEB-INF/jspf/head.jspf", ""),
            ("app/web/WEB-INF/jspf/foot.jspf", ""),
            ("app/web/common/nav.jsp", ""),
        ]);
        let targets: BTreeSet<_> = graph.edges().iter().map(|e| e.target.as_str()).collect();
        assert_eq!(
            targets,
            BTreeSet::from([
                "app/web/WEB-INF/jspf/foot.jspf",
                "app/web/WEB-INF/jspf/head.jspf",
                "app/web/common/nav.jsp",
            ])
        );
    }

    #[test]
    fn test_own_directory_wins() {
        let graph = build(&[
            ("web/a.jsp", r#"<%@ include file="x.jspf" %>"#),
            ("web/x.jspf", ""),
            ("x.jspf", ""),
        ]);
        assert_eq!(graph.edges()[0].target, "web/x.jspf");
    }

    #[test]
    fn test_escaping_root_is_unresolved() {
        let graph = build(&[("a.jsp", r#"<%@ include file="../../etc/x.jspf" %>"#)]);
        assert_eq!(graph.edges()[0].target, "unresolved:../../etc/x.jspf");
    }

    #[test]
    fn test_basename_fallback() {
        let files = [
            ("a.jsp", r#"<jsp:include page="lib/box.tag"/>"#),
            ("web/WEB-INF/tags/box.tag", ""),
            ("other/box.tag", ""),
        ];
        assert!(build(&files).edges()[0].target.starts_with(UNRESOLVED_PREFIX));

        let config = ResolutionConfig {
            basename_fallback: true,
            ..ResolutionConfig::default()
        };
        assert_eq!(build_with(&files, config).edges()[0].target, "web/WEB-INF/tags/box.tag");
    }

    fn tag_targets(graph: &DependencyGraph) -> Vec<(String, String, Option<String>, usize)> {
        graph
            .tag_references()
            .iter()
            .map(|r| (r.source.clone(), format!("{}:{}", r.prefix, r.tag), r.target.clone(), r.occurrences))
            .collect()
    }

    #[test]
    fn test_tag_references_resolve_through_tagdir() {
        let graph = build(&[
            (
                "web/index.jsp",
                r#"<%@ taglib prefix="ui" tagdir="/WEB-INF/tags/ui" %>
<ui:card/><ui:card title="b"/><ui:panel/>"#,
            ),
            ("web/WEB-INF/tags/ui/card.tag", ""),
            ("web/WEB-INF/tags/ui/panel.tagx", ""),
            // same name outside the tagdir never wins
            ("web/other/card.tag", ""),
        ]);
        assert_eq!(
            tag_targets(&graph),
            vec![
                (
                    "web/index.jsp".to_string(),
                    "ui:card".to_string(),
                    Some("web/WEB-INF/tags/ui/card.tag".to_string()),
                    2
                ),
                (
                    "web/index.jsp".to_string(),
                    "ui:panel".to_string(),
                    Some("web/WEB-INF/tags/ui/panel.tagx".to_string()),
                    1
                ),
            ]
        );
        // tag references add no include edges
        assert!(graph.edges().is_empty());
    }

    #[test]
    fn test_tag_references_by_name_prefer_tags_dir() {
        let graph = build(&[
            (
                "a.jsp",
                r#"<%@ taglib prefix="my" uri="http://example.com/my" %>
<my:grid/><my:chart/>"#,
            ),
            ("lib/grid.tag", ""),
            ("web/WEB-INF/tags/grid.tag", ""),
            // a page with the tag's name is not a tag file
            ("chart.jsp", ""),
        ]);
        let targets: Vec<_> = tag_targets(&graph).into_iter().map(|(_, tag, target, _)| (tag, target)).collect();
        assert_eq!(
            targets,
            vec![
                ("my:chart".to_string(), None),
                ("my:grid".to_string(), Some("web/WEB-INF/tags/grid.tag".to_string())),
            ]
        );
    }

    #[test]
    fn test_missing_tagdir_file_is_unresolved() {
        let graph = build(&[
            ("a.jsp", r#"<%@ taglib prefix="t" tagdir="/WEB-INF/tags" %><t:gone/>"#),
        ]);
        assert_eq!(graph.tag_references()[0].target, None);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_cycles_and_coupling() {
        let graph = build(&[
            ("a.jsp", r#"<%@ include file="b.jspf" %>"#),
            ("b.jspf", r#"<%@ include file="c.jspf" %>"#),
            ("c.jspf", r#"<%@ include file="a.jsp" %><jsp:include page="gone.jsp"/>"#),
            ("d.jsp", r#"<%@ include file="d.jsp" %><%@ include file="b.jspf" %>"#),
            ("e.jsp", ""),
        ]);

        let cycles = cycles(&graph);
        assert_eq!(
            cycles.get("a.jsp").unwrap(),
            &vec!["a.jsp", "b.jspf", "c.jspf", "a.jsp"]
        );
        assert_eq!(cycles.get("d.jsp").unwrap(), &vec!["d.jsp", "d.jsp"]);
        assert!(!cycles.contains_key("e.jsp"));

        let coupling = coupling(&graph, &cycles);
        let b = coupling["b.jspf"];
        assert_eq!((b.fan_in, b.fan_out), (2, 1));
        assert!(b.in_cycle);
        let c = coupling["c.jspf"];
        assert_eq!(c.fan_out, 2);
        assert_eq!(c.instability, 2.0 / 3.0);
        let e = coupling["e.jsp"];
        assert_eq!(e.instability, 0.0);
        assert!(!e.in_cycle);
        assert!(!coupling.contains_key("unresolved:gone.jsp"));
    }
}
