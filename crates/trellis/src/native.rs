//! In-memory graph object for native, in-process layout engines.
//!
//! [`NativeGraph`] is derived from the same canonical [`GraphDescription`]
//! the textual serializer consumes, so the two backends always describe the
//! same graph. [`NativeLayout`] is the typed result a native engine hands
//! back; the mapper reads it through accessors instead of text search.

use indexmap::IndexMap;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use serde::Deserialize;

use crate::description::{GraphDescription, RankKind, Statement};

/// A flattened node carried by the native graph.
#[derive(Debug, Clone)]
pub struct NativeNode {
    id: String,
    attrs: Vec<(String, String)>,
}

impl NativeNode {
    /// Returns the node identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the accumulated attributes.
    pub fn attrs(&self) -> &[(String, String)] {
        &self.attrs
    }
}

/// A flattened edge carried by the native graph.
#[derive(Debug, Clone)]
pub struct NativeEdge {
    attrs: Vec<(String, String)>,
}

impl NativeEdge {
    /// Returns the edge attributes.
    pub fn attrs(&self) -> &[(String, String)] {
        &self.attrs
    }
}

/// A block of the description, flattened with a parent back-reference.
#[derive(Debug, Clone)]
pub struct NativeCluster {
    id: String,
    parent: Option<usize>,
    attrs: Vec<(String, String)>,
    nodes: Vec<String>,
}

impl NativeCluster {
    /// Returns the block identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the enclosing cluster's index, if any.
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// Returns the block-scoped attributes.
    pub fn attrs(&self) -> &[(String, String)] {
        &self.attrs
    }

    /// Returns the member node identifiers declared in this block.
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }
}

/// A rank-pinning constraint.
#[derive(Debug, Clone)]
pub struct NativeRankGroup {
    kind: RankKind,
    ids: Vec<String>,
}

impl NativeRankGroup {
    /// Returns the rank kind.
    pub fn kind(&self) -> RankKind {
        self.kind
    }

    /// Returns the pinned node identifiers.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

/// The structured graph handed to native engines.
#[derive(Debug, Default)]
pub struct NativeGraph {
    graph: StableDiGraph<NativeNode, NativeEdge>,
    indices: IndexMap<String, NodeIndex>,
    clusters: Vec<NativeCluster>,
    ranks: Vec<NativeRankGroup>,
    attrs: Vec<(String, String)>,
}

impl NativeGraph {
    /// Flattens a canonical description into the native graph form.
    pub fn from_description(description: &GraphDescription) -> Self {
        let mut native = NativeGraph::default();
        native.walk(description.statements(), None);
        native
    }

    fn walk(&mut self, statements: &[Statement], cluster: Option<usize>) {
        for statement in statements {
            match statement {
                Statement::Attribute(attr) => {
                    let pair = (attr.key().to_owned(), attr.value().to_string());
                    match cluster {
                        Some(index) => self.clusters[index].attrs.push(pair),
                        None => self.attrs.push(pair),
                    }
                }
                Statement::Node { id, attrs } => {
                    let index = self.ensure_node(id);
                    let node = &mut self.graph[index];
                    node.attrs.extend(
                        attrs
                            .iter()
                            .map(|a| (a.key().to_owned(), a.value().to_string())),
                    );
                    if let Some(cluster) = cluster {
                        self.clusters[cluster].nodes.push(id.clone());
                    }
                }
                Statement::Edge { tail, head, attrs } => {
                    let tail = self.ensure_node(tail);
                    let head = self.ensure_node(head);
                    let edge = NativeEdge {
                        attrs: attrs
                            .iter()
                            .map(|a| (a.key().to_owned(), a.value().to_string()))
                            .collect(),
                    };
                    self.graph.add_edge(tail, head, edge);
                }
                Statement::Rank { kind, body } => {
                    let mut ids = Vec::new();
                    for inner in body {
                        if let Statement::Node { id, .. } = inner {
                            ids.push(id.clone());
                        }
                    }
                    self.ranks.push(NativeRankGroup { kind: *kind, ids });
                    // Edges and declarations inside the rank group still
                    // belong to the enclosing scope. A bare reference only
                    // pins a rank; it must not re-register membership for a
                    // node already declared in the cluster.
                    for inner in body {
                        match inner {
                            Statement::Node { id, attrs } if attrs.is_empty() => {
                                self.ensure_node(id);
                            }
                            other => self.walk(std::slice::from_ref(other), cluster),
                        }
                    }
                }
                Statement::Block { id, body } => {
                    let index = self.clusters.len();
                    self.clusters.push(NativeCluster {
                        id: id.clone(),
                        parent: cluster,
                        attrs: Vec::new(),
                        nodes: Vec::new(),
                    });
                    self.walk(body, Some(index));
                }
            }
        }
    }

    fn ensure_node(&mut self, id: &str) -> NodeIndex {
        if let Some(index) = self.indices.get(id) {
            return *index;
        }
        let index = self.graph.add_node(NativeNode {
            id: id.to_owned(),
            attrs: Vec::new(),
        });
        self.indices.insert(id.to_owned(), index);
        index
    }

    /// Returns the underlying graph.
    pub fn graph(&self) -> &StableDiGraph<NativeNode, NativeEdge> {
        &self.graph
    }

    /// Returns the number of distinct nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns the flattened cluster blocks, outermost first.
    pub fn clusters(&self) -> &[NativeCluster] {
        &self.clusters
    }

    /// Returns the collected rank constraints.
    pub fn ranks(&self) -> &[NativeRankGroup] {
        &self.ranks
    }

    /// Returns the top-level attributes.
    pub fn attrs(&self) -> &[(String, String)] {
        &self.attrs
    }
}

/// Bounding box of one laid-out cluster, in the engine's raw coordinates.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct NativeClusterGeometry {
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
    #[serde(default)]
    label_center: Option<(f32, f32)>,
}

impl NativeClusterGeometry {
    /// Creates cluster geometry from raw borders.
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
            label_center: None,
        }
    }

    /// Attaches the raw label center.
    pub fn with_label_center(mut self, x: f32, y: f32) -> Self {
        self.label_center = Some((x, y));
        self
    }

    /// Returns the raw left border.
    pub fn left(&self) -> f32 {
        self.left
    }

    /// Returns the raw top border.
    pub fn top(&self) -> f32 {
        self.top
    }

    /// Returns the raw right border.
    pub fn right(&self) -> f32 {
        self.right
    }

    /// Returns the raw bottom border.
    pub fn bottom(&self) -> f32 {
        self.bottom
    }

    /// Returns the raw label center, if the engine placed one.
    pub fn label_center(&self) -> Option<(f32, f32)> {
        self.label_center
    }
}

/// The typed result of a native layout invocation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NativeLayout {
    width: f32,
    height: f32,
    #[serde(default)]
    min_x: f32,
    #[serde(default)]
    min_y: f32,
    #[serde(default)]
    nodes: IndexMap<String, (f32, f32)>,
    #[serde(default)]
    clusters: IndexMap<String, NativeClusterGeometry>,
    #[serde(default)]
    lines: IndexMap<String, Vec<(f32, f32)>>,
}

impl NativeLayout {
    /// Creates a result with the given canvas size.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Records the canvas-relative origin shift of the raw coordinates.
    pub fn with_origin(mut self, min_x: f32, min_y: f32) -> Self {
        self.min_x = min_x;
        self.min_y = min_y;
        self
    }

    /// Records a node's raw top-left border.
    pub fn insert_node(&mut self, id: impl Into<String>, left: f32, top: f32) {
        self.nodes.insert(id.into(), (left, top));
    }

    /// Records a cluster's raw geometry, keyed by block id.
    pub fn insert_cluster(&mut self, id: impl Into<String>, geometry: NativeClusterGeometry) {
        self.clusters.insert(id.into(), geometry);
    }

    /// Records a connector's raw routed points, keyed by color string.
    pub fn insert_line(&mut self, color: impl Into<String>, points: Vec<(f32, f32)>) {
        self.lines.insert(color.into(), points);
    }

    /// Returns the canvas width.
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Returns the canvas height.
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Returns the canvas-relative origin shift.
    pub fn origin(&self) -> (f32, f32) {
        (self.min_x, self.min_y)
    }

    /// Whether the result carries no geometry at all.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.clusters.is_empty() && self.lines.is_empty()
    }

    /// Looks up a node's raw top-left border.
    pub fn node(&self, id: &str) -> Option<(f32, f32)> {
        self.nodes.get(id).copied()
    }

    /// Looks up a cluster's raw geometry by block id.
    pub fn cluster(&self, id: &str) -> Option<&NativeClusterGeometry> {
        self.clusters.get(id)
    }

    /// Looks up a connector's raw routed points by color string.
    pub fn line(&self, color: &str) -> Option<&[(f32, f32)]> {
        self.lines.get(color).map(Vec::as_slice)
    }
}
