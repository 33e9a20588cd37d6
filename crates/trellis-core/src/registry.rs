//! Registry owning and indexing all entities of one diagram render.
//!
//! [`Bibliotekon`] is the flat index over every cluster, node, and connector
//! created for a single render. It also owns the render's [`ColorSequence`]
//! and the open/close cursor used while the model is being populated from
//! nested group scopes. One registry per render; nothing is shared across
//! renders.

use indexmap::IndexMap;
use log::debug;
use thiserror::Error;

use crate::{
    entity::{Cluster, EntityPosition, Line, LineEnd, Node, ShapeKind, SymbolKind},
    geometry::Size,
    identifier::{ColorSequence, Id},
};

/// Stable handle to a cluster inside one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClusterHandle(usize);

impl ClusterHandle {
    /// The root cluster of any registry.
    pub const ROOT: ClusterHandle = ClusterHandle(0);
}

/// Errors raised while populating the entity model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// `close_cluster` was called with the cursor already at the root.
    #[error("cannot close the root cluster")]
    CloseAtRoot,

    /// A node identifier was registered twice within one render.
    #[error("duplicate node identifier `{0}`")]
    DuplicateNode(Id),
}

/// Flat index over all entities of one render.
pub struct Bibliotekon {
    clusters: Vec<Cluster>,
    nodes: IndexMap<Id, Node>,
    lines: Vec<Line>,
    colors: ColorSequence,
    current: ClusterHandle,
}

impl Bibliotekon {
    /// Creates a registry holding only the root cluster.
    pub fn new() -> Self {
        let mut colors = ColorSequence::new();
        let color = colors.next_color();
        let title_color = colors.next_color();
        let root = Cluster::new(color, title_color, None, None, SymbolKind::default(), false);
        Self {
            clusters: vec![root],
            nodes: IndexMap::new(),
            lines: Vec::new(),
            colors,
            current: ClusterHandle::ROOT,
        }
    }

    /// Returns the root cluster handle.
    pub fn root(&self) -> ClusterHandle {
        ClusterHandle::ROOT
    }

    /// Returns the cluster the cursor currently points at.
    pub fn current(&self) -> ClusterHandle {
        self.current
    }

    /// Opens a nested group scope under the current cluster.
    ///
    /// The new cluster becomes the cursor position; nodes added afterwards
    /// become its members until the matching [`close_cluster`] call.
    ///
    /// [`close_cluster`]: Bibliotekon::close_cluster
    pub fn open_cluster(
        &mut self,
        label: Option<Size>,
        symbol: SymbolKind,
        packed: bool,
    ) -> ClusterHandle {
        let color = self.colors.next_color();
        let title_color = self.colors.next_color();
        let handle = ClusterHandle(self.clusters.len());
        self.clusters.push(Cluster::new(
            color,
            title_color,
            Some(self.current),
            label,
            symbol,
            packed,
        ));
        self.clusters[self.current.0].push_child(handle);
        debug!(cluster = color.hex(); "Opened cluster scope");
        self.current = handle;
        handle
    }

    /// Closes the current group scope, restoring the cursor to its parent.
    pub fn close_cluster(&mut self) -> Result<(), ModelError> {
        match self.clusters[self.current.0].parent() {
            Some(parent) => {
                self.current = parent;
                Ok(())
            }
            None => Err(ModelError::CloseAtRoot),
        }
    }

    /// Registers a node as a member of the current cluster.
    pub fn add_node(
        &mut self,
        uid: &str,
        shape: ShapeKind,
        position: EntityPosition,
        size: Size,
    ) -> Result<Id, ModelError> {
        let uid = Id::new(uid);
        if self.nodes.contains_key(&uid) {
            return Err(ModelError::DuplicateNode(uid));
        }
        self.nodes.insert(uid, Node::new(uid, shape, position, size));
        self.clusters[self.current.0].push_node(uid);
        Ok(uid)
    }

    /// Registers a connector, assigning it a fresh color identity.
    ///
    /// Returns the connector's index in emission order.
    pub fn add_line(
        &mut self,
        source: LineEnd,
        target: LineEnd,
        label: Option<Size>,
    ) -> usize {
        let color = self.colors.next_color();
        self.lines.push(Line::new(color, source, target, label));
        self.lines.len() - 1
    }

    /// Looks up a cluster by handle.
    pub fn cluster(&self, handle: ClusterHandle) -> &Cluster {
        &self.clusters[handle.0]
    }

    /// Looks up a cluster by handle, mutably.
    pub fn cluster_mut(&mut self, handle: ClusterHandle) -> &mut Cluster {
        &mut self.clusters[handle.0]
    }

    /// Iterates every cluster except the root, in creation order.
    pub fn clusters(&self) -> impl Iterator<Item = (ClusterHandle, &Cluster)> {
        self.clusters
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, c)| (ClusterHandle(i), c))
    }

    /// Looks up a node by identifier.
    pub fn node(&self, uid: Id) -> Option<&Node> {
        self.nodes.get(&uid)
    }

    /// Looks up a node by identifier, mutably.
    pub fn node_mut(&mut self, uid: Id) -> Option<&mut Node> {
        self.nodes.get_mut(&uid)
    }

    /// Iterates every node in registration order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Iterates every connector in registration order.
    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter()
    }

    /// Looks up a connector by emission index.
    pub fn line(&self, index: usize) -> Option<&Line> {
        self.lines.get(index)
    }

    /// Looks up a connector by emission index, mutably.
    pub fn line_mut(&mut self, index: usize) -> Option<&mut Line> {
        self.lines.get_mut(index)
    }

    /// Ordinary connectors, emitted in the first phase.
    pub fn lines0(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter().filter(|l| !l.crosses_boundary())
    }

    /// Boundary-touching connectors requiring special routing, emitted second.
    pub fn lines1(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter().filter(|l| l.crosses_boundary())
    }

    /// Whether any connector touches the given cluster's boundary.
    pub fn has_line_touching(&self, cluster: ClusterHandle) -> bool {
        self.lines.iter().any(|l| l.touches(cluster))
    }

    /// Shifts every stored geometry by `(dx, dy)`.
    ///
    /// Only meaningful after a successful render; entities without geometry
    /// are left untouched.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        for node in self.nodes.values_mut() {
            node.translate(dx, dy);
        }
        for line in &mut self.lines {
            line.translate(dx, dy);
        }
        for cluster in &mut self.clusters {
            cluster.translate(dx, dy);
        }
    }
}

impl Default for Bibliotekon {
    fn default() -> Self {
        Self::new()
    }
}
