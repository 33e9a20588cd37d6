//! Entity model for one diagram render.
//!
//! A render works over three entity kinds: [`Cluster`] (a recursively nested
//! group), [`Node`] (a leaf shape), and [`Line`] (a connector). Classification
//! fields are fixed at creation; geometry fields start unset and are written
//! exactly once, by the result mapper, after a render has fully succeeded.

use serde::Deserialize;

use crate::{
    geometry::{Point, Size},
    identifier::{ColorId, Id},
    registry::ClusterHandle,
};

/// The diagram family being rendered.
///
/// Only two things depend on it here: the spacing floors used by the
/// description builder, and whether swimlane alignment applies at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramKind {
    Activity,
    State,
    #[default]
    Class,
    Component,
    Deployment,
}

/// Symbol decoration of a cluster.
///
/// The serializer only cares whether the symbol is node-shaped, which forces
/// an extra isolation wrapper around the cluster body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymbolKind {
    #[default]
    Package,
    Frame,
    Node,
    Cloud,
    Database,
}

impl SymbolKind {
    /// Node-shaped symbols always get the inner isolation wrapper.
    pub fn is_node_shaped(self) -> bool {
        matches!(self, SymbolKind::Node)
    }
}

/// Position classification of a node within its cluster.
///
/// Anything other than `Normal` is a boundary role: the node is pinned to the
/// cluster's source or sink rank instead of flowing with the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntityPosition {
    #[default]
    Normal,
    Input,
    Output,
    PortIn,
    PortOut,
}

impl EntityPosition {
    /// Whether this is any boundary role.
    pub fn is_boundary(self) -> bool {
        self != EntityPosition::Normal
    }

    /// Whether this role pins to the source rank.
    pub fn is_input(self) -> bool {
        matches!(self, EntityPosition::Input | EntityPosition::PortIn)
    }

    /// Whether this role pins to the sink rank.
    pub fn is_output(self) -> bool {
        matches!(self, EntityPosition::Output | EntityPosition::PortOut)
    }

    /// Whether this is a true port on the cluster border.
    pub fn is_port(self) -> bool {
        matches!(self, EntityPosition::PortIn | EntityPosition::PortOut)
    }
}

/// How a shape's geometry is located in a textual result document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionRule {
    /// Polygon corner list near the title marker; bounding min corner.
    PolygonMin,
    /// Path-data block on newer engines, merged polygon runs on older ones.
    RoundedDual,
    /// Polygon corner list; min corner plus the full point list is retained.
    PolygonOutline,
    /// Center and radii attributes; min corner is center minus radii.
    Ellipse,
}

/// Shape kind of a leaf node.
///
/// Every kind carries its own extraction strategy; adding a kind without
/// deciding its extraction is a compile error, not a runtime fall-through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Rectangle,
    RoundedRectangle,
    Diamond,
    Folder,
    Octagon,
    Hexagon,
    Circle,
    Oval,
    PortRectangle,
}

impl ShapeKind {
    /// Returns the extraction strategy for this shape in a textual result.
    pub fn extraction(self) -> ExtractionRule {
        match self {
            ShapeKind::Rectangle
            | ShapeKind::Diamond
            | ShapeKind::Folder
            | ShapeKind::PortRectangle => ExtractionRule::PolygonMin,
            ShapeKind::RoundedRectangle => ExtractionRule::RoundedDual,
            ShapeKind::Octagon | ShapeKind::Hexagon => ExtractionRule::PolygonOutline,
            ShapeKind::Circle | ShapeKind::Oval => ExtractionRule::Ellipse,
        }
    }

    /// Returns the shape name emitted in the description.
    pub fn dot_shape(self) -> &'static str {
        match self {
            ShapeKind::Rectangle | ShapeKind::RoundedRectangle | ShapeKind::PortRectangle => "rect",
            ShapeKind::Diamond => "diamond",
            ShapeKind::Folder => "folder",
            ShapeKind::Octagon => "octagon",
            ShapeKind::Hexagon => "hexagon",
            ShapeKind::Circle => "circle",
            ShapeKind::Oval => "ellipse",
        }
    }
}

/// Post-layout placement of a node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodePlacement {
    min: Point,
    polygon: Option<Vec<Point>>,
}

impl NodePlacement {
    /// Creates a placement with only a min corner.
    pub fn at(min: Point) -> Self {
        Self { min, polygon: None }
    }

    /// Creates a placement that retains the full outline point list.
    pub fn with_polygon(min: Point, polygon: Vec<Point>) -> Self {
        Self {
            min,
            polygon: Some(polygon),
        }
    }

    /// Returns the placed min corner.
    pub fn min(&self) -> Point {
        self.min
    }

    /// Returns the retained outline, if the shape keeps one.
    pub fn polygon(&self) -> Option<&[Point]> {
        self.polygon.as_deref()
    }

    pub(crate) fn translate(&mut self, dx: f32, dy: f32) {
        self.min = self.min.translate(dx, dy);
        if let Some(polygon) = &mut self.polygon {
            for p in polygon.iter_mut() {
                *p = p.translate(dx, dy);
            }
        }
    }
}

/// A leaf shape of the diagram.
#[derive(Debug, Clone)]
pub struct Node {
    uid: Id,
    shape: ShapeKind,
    position: EntityPosition,
    size: Size,
    placement: Option<NodePlacement>,
}

impl Node {
    pub(crate) fn new(uid: Id, shape: ShapeKind, position: EntityPosition, size: Size) -> Self {
        Self {
            uid,
            shape,
            position,
            size,
            placement: None,
        }
    }

    /// Returns the node's identifier.
    pub fn uid(&self) -> Id {
        self.uid
    }

    /// Returns the shape kind.
    pub fn shape(&self) -> ShapeKind {
        self.shape
    }

    /// Returns the position classification.
    pub fn position(&self) -> EntityPosition {
        self.position
    }

    /// Returns the measured size driving the emitted width/height.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Returns the placement written by the result mapper, if any.
    pub fn placement(&self) -> Option<&NodePlacement> {
        self.placement.as_ref()
    }

    /// Stores the corrected placement for this node.
    pub fn set_placement(&mut self, placement: NodePlacement) {
        self.placement = Some(placement);
    }

    pub(crate) fn translate(&mut self, dx: f32, dy: f32) {
        if let Some(placement) = &mut self.placement {
            placement.translate(dx, dy);
        }
    }
}

/// One endpoint of a connector: a leaf node or a group boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnd {
    Node(Id),
    Group(ClusterHandle),
}

/// A connector between two endpoints.
#[derive(Debug, Clone)]
pub struct Line {
    color: ColorId,
    source: LineEnd,
    target: LineEnd,
    label: Option<Size>,
    cross_boundary: bool,
    path: Option<Vec<Point>>,
}

impl Line {
    pub(crate) fn new(
        color: ColorId,
        source: LineEnd,
        target: LineEnd,
        label: Option<Size>,
    ) -> Self {
        let cross_boundary =
            matches!(source, LineEnd::Group(_)) || matches!(target, LineEnd::Group(_));
        Self {
            color,
            source,
            target,
            label,
            cross_boundary,
            path: None,
        }
    }

    /// Returns the color identity used to locate this connector's geometry.
    pub fn color(&self) -> ColorId {
        self.color
    }

    /// Returns the source endpoint.
    pub fn source(&self) -> LineEnd {
        self.source
    }

    /// Returns the target endpoint.
    pub fn target(&self) -> LineEnd {
        self.target
    }

    /// Returns the measured label size, if the connector carries a label.
    pub fn label(&self) -> Option<Size> {
        self.label
    }

    /// Whether either endpoint is a group boundary.
    pub fn crosses_boundary(&self) -> bool {
        self.cross_boundary
    }

    /// Whether this connector touches the given cluster's boundary.
    pub fn touches(&self, cluster: ClusterHandle) -> bool {
        self.source == LineEnd::Group(cluster) || self.target == LineEnd::Group(cluster)
    }

    /// Per-connector horizontal sizing metric feeding the spacing heuristic.
    pub fn horizontal_dzeta(&self) -> f32 {
        self.label.map_or(0.0, Size::width)
    }

    /// Per-connector vertical sizing metric feeding the spacing heuristic.
    pub fn vertical_dzeta(&self) -> f32 {
        self.label.map_or(0.0, Size::height)
    }

    /// Returns the routed geometry written by the result mapper, if any.
    pub fn path(&self) -> Option<&[Point]> {
        self.path.as_deref()
    }

    /// Stores the corrected routed geometry for this connector.
    pub fn set_path(&mut self, path: Vec<Point>) {
        self.path = Some(path);
    }

    pub(crate) fn translate(&mut self, dx: f32, dy: f32) {
        if let Some(path) = &mut self.path {
            for p in path.iter_mut() {
                *p = p.translate(dx, dy);
            }
        }
    }
}

/// Post-layout bounding geometry of a cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterGeometry {
    min: Point,
    max: Point,
}

impl ClusterGeometry {
    /// Creates cluster geometry from corrected min/max corners.
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Returns the bounding min corner.
    pub fn min(&self) -> Point {
        self.min
    }

    /// Returns the bounding max corner.
    pub fn max(&self) -> Point {
        self.max
    }
}

/// A recursively nested group of nodes and sub-clusters.
///
/// A cluster never owns its parent; the back-reference is a plain handle into
/// the registry. The parent/child graph is a tree by construction: children
/// are only ever created through the registry's open/close cursor.
#[derive(Debug)]
pub struct Cluster {
    color: ColorId,
    title_color: ColorId,
    parent: Option<ClusterHandle>,
    children: Vec<ClusterHandle>,
    nodes: Vec<Id>,
    label: Option<Size>,
    packed: bool,
    symbol: SymbolKind,
    geometry: Option<ClusterGeometry>,
    title_anchor: Option<Point>,
}

impl Cluster {
    pub(crate) fn new(
        color: ColorId,
        title_color: ColorId,
        parent: Option<ClusterHandle>,
        label: Option<Size>,
        symbol: SymbolKind,
        packed: bool,
    ) -> Self {
        Self {
            color,
            title_color,
            parent,
            children: Vec::new(),
            nodes: Vec::new(),
            label,
            packed,
            symbol,
            geometry: None,
            title_anchor: None,
        }
    }

    /// Returns the color identity of the cluster body.
    pub fn color(&self) -> ColorId {
        self.color
    }

    /// Returns the second color identity, keying the title geometry.
    pub fn title_color(&self) -> ColorId {
        self.title_color
    }

    /// Returns the parent handle; `None` for the root.
    pub fn parent(&self) -> Option<ClusterHandle> {
        self.parent
    }

    /// Returns the ordered child clusters.
    pub fn children(&self) -> &[ClusterHandle] {
        &self.children
    }

    pub(crate) fn push_child(&mut self, child: ClusterHandle) {
        self.children.push(child);
    }

    /// Returns the ordered member nodes.
    pub fn nodes(&self) -> &[Id] {
        &self.nodes
    }

    pub(crate) fn push_node(&mut self, node: Id) {
        self.nodes.push(node);
    }

    /// Returns the measured title size, if the cluster carries a label.
    pub fn label(&self) -> Option<Size> {
        self.label
    }

    /// Whether nested serialization is bypassed entirely for this cluster.
    pub fn is_packed(&self) -> bool {
        self.packed
    }

    /// Returns the symbol decoration.
    pub fn symbol(&self) -> SymbolKind {
        self.symbol
    }

    /// Returns the block identifier used in the emitted description.
    pub fn block_id(&self) -> String {
        format!("cluster{}", self.color.value())
    }

    /// Identifier of the zero-size point anchoring cross-boundary connectors.
    pub fn special_point_id(&self) -> String {
        format!("sp{}", self.color.value())
    }

    /// Identifier of the swimlane source-rank anchor.
    pub fn source_in_id(&self) -> String {
        format!("sourceIn{}", self.color.value())
    }

    /// Identifier of the swimlane sink-rank anchor.
    pub fn sink_in_id(&self) -> String {
        format!("sinkIn{}", self.color.value())
    }

    /// Identifier of the node pinned to the shared min rank.
    pub fn min_point_id(&self) -> String {
        format!("minPoint{}", self.color.value())
    }

    /// Identifier of the node pinned to the shared max rank.
    pub fn max_point_id(&self) -> String {
        format!("maxPoint{}", self.color.value())
    }

    /// Returns the bounding geometry written by the result mapper, if any.
    pub fn geometry(&self) -> Option<ClusterGeometry> {
        self.geometry
    }

    /// Stores the corrected bounding geometry.
    pub fn set_geometry(&mut self, geometry: ClusterGeometry) {
        self.geometry = Some(geometry);
    }

    /// Returns the title anchor written by the result mapper, if any.
    pub fn title_anchor(&self) -> Option<Point> {
        self.title_anchor
    }

    /// Stores the corrected title anchor.
    pub fn set_title_anchor(&mut self, anchor: Point) {
        self.title_anchor = Some(anchor);
    }

    pub(crate) fn translate(&mut self, dx: f32, dy: f32) {
        if let Some(geometry) = self.geometry {
            self.geometry = Some(ClusterGeometry::new(
                geometry.min.translate(dx, dy),
                geometry.max.translate(dx, dy),
            ));
        }
        if let Some(anchor) = self.title_anchor {
            self.title_anchor = Some(anchor.translate(dx, dy));
        }
    }
}
