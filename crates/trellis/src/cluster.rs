//! Recursive serialization of one cluster into nested wrapper blocks.
//!
//! Layout engines only honor cluster boundaries under specific structural
//! conditions, so every cluster is wrapped in a stack of synthetic blocks
//! chosen per cluster, outside-in:
//!
//! 1. outer link-protection (`a`), when a connector touches this cluster's
//!    boundary and the engine needs protection,
//! 2. `p0`, unless swimlane mode is active,
//! 3. the core block carrying the cluster's color identity, style, and title,
//! 4. the boundary-role wrapper (`ee`), when members carry input/output/port
//!    roles,
//! 5. inner link-protection (`i`), mirroring the outer one,
//! 6. `p1`, for node-shaped symbols, or unless swimlane mode is active.
//!
//! Wrapper balance is structural: blocks own their bodies, so a wrapper that
//! is opened is closed by construction, in exact reverse order.
//!
//! Packed clusters bypass the whole stack and inline their content into the
//! parent scope.

use trellis_core::{
    entity::{Cluster, EntityPosition, Node, ShapeKind},
    geometry::Size,
    identifier::ColorId,
    registry::{Bibliotekon, ClusterHandle},
};

use crate::{
    builder::pixel_to_inches,
    description::{Attr, RankKind, Statement},
    engine::EngineCapabilities,
};

/// Emits the nested block structure for clusters of one registry.
pub(crate) struct ClusterSerializer<'a> {
    bib: &'a Bibliotekon,
    caps: EngineCapabilities,
    swimlanes: bool,
}

impl<'a> ClusterSerializer<'a> {
    pub(crate) fn new(bib: &'a Bibliotekon, caps: EngineCapabilities, swimlanes: bool) -> Self {
        Self {
            bib,
            caps,
            swimlanes,
        }
    }

    /// Emits the root scope: leaf declarations first, then every top-level
    /// cluster. The root itself never gets wrappers.
    pub(crate) fn emit_root(&self) -> Vec<Statement> {
        let root = self.bib.cluster(self.bib.root());
        let mut out = self.declarations(root, None);
        out.extend(self.children(root));
        out
    }

    /// Emits one cluster as statements for the enclosing scope.
    fn emit_cluster(&self, handle: ClusterHandle) -> Vec<Statement> {
        let cluster = self.bib.cluster(handle);

        if cluster.is_packed() {
            let mut out = self.declarations(cluster, None);
            out.extend(self.children(cluster));
            return out;
        }

        let crossing_raw = self.bib.has_line_touching(handle);
        let crossing = crossing_raw && self.caps.cluster_link_protection();

        let boundary = self.members(cluster, EntityPosition::is_boundary);
        let has_port = boundary.iter().any(|n| n.position().is_port());

        let mut protection0 = !self.swimlanes;
        let mut protection1 = cluster.symbol().is_node_shaped() || !self.swimlanes;
        if !boundary.is_empty() || !self.caps.cluster_link_protection() {
            protection0 = false;
            protection1 = false;
        }

        // Innermost content, assembled inside-out.
        let mut body = Vec::new();
        if self.swimlanes {
            body.extend(self.swimlane_statements(cluster));
        }
        body.extend(self.declarations(cluster, Some(EntityPosition::Normal)));
        body.extend(self.children(cluster));
        if !boundary.is_empty() {
            if has_port {
                body.push(Statement::Node {
                    id: cluster.special_point_id(),
                    attrs: vec![
                        Attr::plain("shape", "rect"),
                        Attr::plain("width", ".01"),
                        Attr::plain("height", ".01"),
                        self.title_attr(cluster),
                    ],
                });
            } else if !crossing_raw {
                // With a boundary-touching connector the anchor was already
                // declared in the boundary-role wrapper.
                body.push(Statement::zero_point(cluster.special_point_id()));
            }
        }

        if protection1 {
            body = vec![wrapper(cluster, "p1", body)];
        }
        if crossing {
            body = vec![wrapper(cluster, "i", body)];
        }

        if !boundary.is_empty() {
            let label = if has_port {
                Statement::Attribute(Attr::quoted("label", ""))
            } else {
                Statement::Attribute(self.title_attr(cluster))
            };
            let mut ee = vec![label];
            if crossing_raw {
                ee.push(Statement::zero_point(cluster.special_point_id()));
            }
            ee.extend(body);
            body = vec![Statement::Block {
                id: format!("{}ee", cluster.block_id()),
                body: ee,
            }];
        }

        // Core block: color identity, solid border, and either the title or
        // the rank-pinning machinery for boundary-role members.
        let mut core = vec![
            Statement::Attribute(Attr::plain("style", "solid")),
            Statement::Attribute(Attr::quoted("color", cluster.color().hex())),
        ];
        if boundary.is_empty() {
            core.push(Statement::Attribute(self.title_attr(cluster)));
            if crossing_raw {
                core.push(Statement::zero_point(cluster.special_point_id()));
            }
        } else {
            core.extend(self.rank_statements(
                RankKind::Source,
                &self.members(cluster, EntityPosition::is_input),
                cluster,
                has_port,
            ));
            core.extend(self.rank_statements(
                RankKind::Sink,
                &self.members(cluster, EntityPosition::is_output),
                cluster,
                has_port,
            ));
        }
        core.extend(body);
        body = vec![Statement::Block {
            id: cluster.block_id(),
            body: core,
        }];

        if protection0 {
            body = vec![wrapper(cluster, "p0", body)];
        }
        if crossing {
            body = vec![wrapper(cluster, "a", body)];
        }
        body
    }

    /// First pass: declares leaf member nodes matching the position filter.
    fn declarations(&self, cluster: &Cluster, position: Option<EntityPosition>) -> Vec<Statement> {
        cluster
            .nodes()
            .iter()
            .filter_map(|uid| self.bib.node(*uid))
            .filter(|node| position.is_none_or(|p| node.position() == p))
            .map(node_declaration)
            .collect()
    }

    /// Second pass: nested structure of every child cluster.
    fn children(&self, cluster: &Cluster) -> Vec<Statement> {
        cluster
            .children()
            .iter()
            .flat_map(|child| self.emit_cluster(*child))
            .collect()
    }

    fn members(&self, cluster: &Cluster, filter: fn(EntityPosition) -> bool) -> Vec<&Node> {
        cluster
            .nodes()
            .iter()
            .filter_map(|uid| self.bib.node(*uid))
            .filter(|node| filter(node.position()))
            .collect()
    }

    /// Rank-pins one boundary-role member group and ties it to the shared
    /// anchor: port members are chained head-to-tail into the anchor, plain
    /// input/output members each connect to it directly.
    fn rank_statements(
        &self,
        kind: RankKind,
        members: &[&Node],
        cluster: &Cluster,
        has_port: bool,
    ) -> Vec<Statement> {
        if members.is_empty() {
            return Vec::new();
        }
        let anchor = cluster.special_point_id();
        let mut out: Vec<Statement> = members.iter().copied().map(node_declaration).collect();
        out.push(Statement::Rank {
            kind,
            body: members
                .iter()
                .map(|n| Statement::node_ref(n.uid().to_string()))
                .collect(),
        });
        let forced = || vec![Attr::plain("weight", "999"), Attr::plain("arrowhead", "none")];
        if has_port {
            for pair in members.windows(2) {
                out.push(Statement::Edge {
                    tail: pair[0].uid().to_string(),
                    head: pair[1].uid().to_string(),
                    attrs: forced(),
                });
            }
            // Last member of the chain feeds the anchor so the whole chain
            // stays attached to the cluster body.
            if let Some(last) = members.last() {
                out.push(Statement::Edge {
                    tail: last.uid().to_string(),
                    head: anchor,
                    attrs: forced(),
                });
            }
        } else {
            for member in members {
                let (tail, head) = match kind {
                    RankKind::Sink => (anchor.clone(), member.uid().to_string()),
                    _ => (member.uid().to_string(), anchor.clone()),
                };
                out.push(Statement::Edge {
                    tail,
                    head,
                    attrs: vec![Attr::plain("arrowhead", "none")],
                });
            }
        }
        out
    }

    /// Swimlane alignment: one anchor pinned to this cluster's source rank
    /// and one to its sink rank, each tied to the shared min/max points with
    /// maximum edge weight.
    fn swimlane_statements(&self, cluster: &Cluster) -> Vec<Statement> {
        vec![
            Statement::Rank {
                kind: RankKind::Source,
                body: vec![
                    Statement::zero_point(cluster.source_in_id()),
                    Statement::Edge {
                        tail: cluster.min_point_id(),
                        head: cluster.source_in_id(),
                        attrs: vec![Attr::plain("weight", "999")],
                    },
                ],
            },
            Statement::Rank {
                kind: RankKind::Sink,
                body: vec![Statement::zero_point(cluster.sink_in_id())],
            },
            Statement::Edge {
                tail: cluster.sink_in_id(),
                head: cluster.max_point_id(),
                attrs: vec![Attr::plain("weight", "999")],
            },
        ]
    }

    fn title_attr(&self, cluster: &Cluster) -> Attr {
        match cluster.label() {
            Some(size) => Attr::html("label", title_label(size, cluster.title_color())),
            None => Attr::quoted("label", ""),
        }
    }
}

/// A no-label wrapper block around `body`.
fn wrapper(cluster: &Cluster, suffix: &str, body: Vec<Statement>) -> Statement {
    let mut wrapped = vec![Statement::Attribute(Attr::quoted("label", ""))];
    wrapped.extend(body);
    Statement::Block {
        id: format!("{}{suffix}", cluster.block_id()),
        body: wrapped,
    }
}

/// Declares one leaf shape with its measured size, in engine length units.
fn node_declaration(node: &Node) -> Statement {
    let mut attrs = vec![Attr::plain("shape", node.shape().dot_shape())];
    if node.shape() == ShapeKind::RoundedRectangle {
        attrs.push(Attr::plain("style", "rounded"));
    }
    attrs.push(Attr::plain("fixedsize", "true"));
    attrs.push(Attr::plain("width", pixel_to_inches(node.size().width())));
    attrs.push(Attr::plain("height", pixel_to_inches(node.size().height())));
    attrs.push(Attr::quoted("label", ""));
    Statement::Node {
        id: node.uid().to_string(),
        attrs,
    }
}

/// The single-cell sizing table used as a cluster title placeholder.
///
/// The table's background color is the entity's second color identity; the
/// result mapper finds the rendered title by that color.
pub(crate) fn title_label(size: Size, color: ColorId) -> String {
    format!(
        "<table title=\"bound\" bgcolor=\"{}\" fixedsize=\"true\" width=\"{}\" height=\"{}\"><tr><td></td></tr></table>",
        color.hex(),
        size.width() as i32,
        size.height() as i32 - 5,
    )
}

#[cfg(test)]
mod tests {
    use trellis_core::entity::SymbolKind;

    use super::*;

    fn sized(w: f32, h: f32) -> Size {
        Size::new(w, h)
    }

    fn serializer(bib: &Bibliotekon, swimlanes: bool) -> ClusterSerializer<'_> {
        ClusterSerializer::new(bib, EngineCapabilities::default(), swimlanes)
    }

    fn block_ids(statement: &Statement) -> Vec<String> {
        // Depth-first spine of nested block ids, following the first block
        // at each level.
        let mut ids = Vec::new();
        let mut current = statement;
        loop {
            match current {
                Statement::Block { id, body } => {
                    ids.push(id.clone());
                    match body.iter().find(|s| matches!(s, Statement::Block { .. })) {
                        Some(inner) => current = inner,
                        None => break,
                    }
                }
                _ => break,
            }
        }
        ids
    }

    #[test]
    fn test_plain_cluster_wrapper_sequence() {
        let mut bib = Bibliotekon::new();
        let group = bib.open_cluster(None, SymbolKind::Package, false);
        bib.add_node("n1", ShapeKind::Rectangle, EntityPosition::Normal, sized(40.0, 20.0))
            .unwrap();
        bib.close_cluster().unwrap();

        let out = serializer(&bib, false).emit_cluster(group);
        assert_eq!(out.len(), 1);
        let id = bib.cluster(group).block_id();
        assert_eq!(
            block_ids(&out[0]),
            vec![format!("{id}p0"), id.clone(), format!("{id}p1")]
        );
    }

    #[test]
    fn test_crossing_cluster_wrapper_sequence() {
        use trellis_core::entity::LineEnd;

        let mut bib = Bibliotekon::new();
        let group = bib.open_cluster(None, SymbolKind::Package, false);
        bib.add_node("in", ShapeKind::Rectangle, EntityPosition::Normal, sized(1.0, 1.0))
            .unwrap();
        bib.close_cluster().unwrap();
        let outside = bib
            .add_node("out", ShapeKind::Rectangle, EntityPosition::Normal, sized(1.0, 1.0))
            .unwrap();
        bib.add_line(LineEnd::Node(outside), LineEnd::Group(group), None);

        let out = serializer(&bib, false).emit_cluster(group);
        let id = bib.cluster(group).block_id();
        assert_eq!(
            block_ids(&out[0]),
            vec![
                format!("{id}a"),
                format!("{id}p0"),
                id.clone(),
                format!("{id}i"),
                format!("{id}p1"),
            ]
        );
    }

    #[test]
    fn test_protection_suppressed_without_capability() {
        use trellis_core::entity::LineEnd;

        let mut bib = Bibliotekon::new();
        let group = bib.open_cluster(None, SymbolKind::Package, false);
        bib.close_cluster().unwrap();
        let outside = bib
            .add_node("out", ShapeKind::Rectangle, EntityPosition::Normal, sized(1.0, 1.0))
            .unwrap();
        bib.add_line(LineEnd::Node(outside), LineEnd::Group(group), None);

        let serializer =
            ClusterSerializer::new(&bib, EngineCapabilities::new(false), false);
        let out = serializer.emit_cluster(group);
        // Protections all off: only the bare core block remains, holding the
        // shared anchor point for the crossing connector.
        let id = bib.cluster(group).block_id();
        assert_eq!(block_ids(&out[0]), vec![id]);
        let dot = crate::description::GraphDescription::new(out).to_dot();
        assert!(dot.contains(&bib.cluster(group).special_point_id()));
    }

    #[test]
    fn test_boundary_members_share_one_anchor() {
        let mut bib = Bibliotekon::new();
        let group = bib.open_cluster(Some(sized(60.0, 20.0)), SymbolKind::Frame, false);
        bib.add_node("entry", ShapeKind::PortRectangle, EntityPosition::Input, sized(8.0, 8.0))
            .unwrap();
        bib.add_node("exit", ShapeKind::PortRectangle, EntityPosition::Output, sized(8.0, 8.0))
            .unwrap();
        bib.close_cluster().unwrap();

        let out = serializer(&bib, false).emit_cluster(group);
        let dot = crate::description::GraphDescription::new(out).to_dot();
        let anchor = bib.cluster(group).special_point_id();

        // One shared anchor, both rank groups connected to it, no chaining.
        assert_eq!(dot.matches(&format!("{anchor} [shape=point")).count(), 1);
        assert!(dot.contains(&format!("entry->{anchor} [arrowhead=none];")));
        assert!(dot.contains(&format!("{anchor}->exit [arrowhead=none];")));
        assert!(!dot.contains("entry->exit"));
        assert!(dot.contains("{rank=source;\nentry;\n}"));
        assert!(dot.contains("{rank=sink;\nexit;\n}"));
    }

    #[test]
    fn test_port_members_chain_into_anchor() {
        let mut bib = Bibliotekon::new();
        let group = bib.open_cluster(None, SymbolKind::Frame, false);
        bib.add_node("p1", ShapeKind::PortRectangle, EntityPosition::PortIn, sized(8.0, 8.0))
            .unwrap();
        bib.add_node("p2", ShapeKind::PortRectangle, EntityPosition::PortIn, sized(8.0, 8.0))
            .unwrap();
        bib.close_cluster().unwrap();

        let out = serializer(&bib, false).emit_cluster(group);
        let dot = crate::description::GraphDescription::new(out).to_dot();
        let anchor = bib.cluster(group).special_point_id();

        assert!(dot.contains("p1->p2 [weight=999,arrowhead=none];"));
        assert!(dot.contains(&format!("p2->{anchor} [weight=999,arrowhead=none];")));
        // Port anchors are rectangular and carry the title slot.
        assert!(dot.contains(&format!("{anchor} [shape=rect,width=.01,height=.01,")));
    }

    #[test]
    fn test_boundary_members_disable_protections() {
        let mut bib = Bibliotekon::new();
        let group = bib.open_cluster(None, SymbolKind::Package, false);
        bib.add_node("entry", ShapeKind::PortRectangle, EntityPosition::Input, sized(8.0, 8.0))
            .unwrap();
        bib.close_cluster().unwrap();

        let out = serializer(&bib, false).emit_cluster(group);
        let id = bib.cluster(group).block_id();
        assert_eq!(block_ids(&out[0]), vec![id.clone(), format!("{id}ee")]);
    }

    #[test]
    fn test_packed_cluster_bypasses_wrappers() {
        let mut bib = Bibliotekon::new();
        let group = bib.open_cluster(None, SymbolKind::Package, true);
        bib.add_node("n1", ShapeKind::Rectangle, EntityPosition::Normal, sized(40.0, 20.0))
            .unwrap();
        bib.close_cluster().unwrap();

        let out = serializer(&bib, false).emit_cluster(group);
        assert!(out.iter().all(|s| matches!(s, Statement::Node { .. })));
    }

    #[test]
    fn test_swimlane_anchors_per_cluster() {
        let mut bib = Bibliotekon::new();
        let group = bib.open_cluster(None, SymbolKind::Package, false);
        bib.close_cluster().unwrap();

        let out = serializer(&bib, true).emit_cluster(group);
        let dot = crate::description::GraphDescription::new(out.clone()).to_dot();
        let cluster = bib.cluster(group);

        assert_eq!(
            dot.matches(&format!("{} [shape=point", cluster.source_in_id())).count(),
            1
        );
        assert_eq!(
            dot.matches(&format!("{} [shape=point", cluster.sink_in_id())).count(),
            1
        );
        assert!(dot.contains(&format!(
            "{}->{} [weight=999];",
            cluster.min_point_id(),
            cluster.source_in_id()
        )));
        assert!(dot.contains(&format!(
            "{}->{} [weight=999];",
            cluster.sink_in_id(),
            cluster.max_point_id()
        )));
        // Swimlane mode drops both protection wrappers around the core.
        let id = cluster.block_id();
        assert_eq!(block_ids(&out[0]), vec![id]);
    }

    #[test]
    fn test_nesting_depth_grows_with_tree() {
        let mut bib = Bibliotekon::new();
        let outer = bib.open_cluster(None, SymbolKind::Package, false);
        bib.open_cluster(None, SymbolKind::Package, false);
        bib.close_cluster().unwrap();
        bib.close_cluster().unwrap();

        let out = serializer(&bib, false).emit_cluster(outer);
        // Outer spine p0/core/p1, then the child's p0/core/p1 nested inside.
        let ids = block_ids(&out[0]);
        assert_eq!(ids.len(), 6);
        let dot = crate::description::GraphDescription::new(out).to_dot();
        assert_eq!(dot.matches('{').count(), dot.matches('}').count());
    }

    #[test]
    fn test_node_declaration_sizes_in_inches() {
        let mut bib = Bibliotekon::new();
        bib.add_node("n1", ShapeKind::RoundedRectangle, EntityPosition::Normal, sized(72.0, 36.0))
            .unwrap();

        let out = serializer(&bib, false).emit_root();
        let dot = crate::description::GraphDescription::new(out).to_dot();
        assert!(dot.contains(
            "n1 [shape=rect,style=rounded,fixedsize=true,width=1.00000,height=0.50000,label=\"\"];"
        ));
    }

    #[test]
    fn test_title_label_table() {
        let mut bib = Bibliotekon::new();
        let group = bib.open_cluster(Some(sized(80.0, 25.0)), SymbolKind::Package, false);
        bib.close_cluster().unwrap();

        let out = serializer(&bib, false).emit_cluster(group);
        let dot = crate::description::GraphDescription::new(out).to_dot();
        let hex = bib.cluster(group).title_color().hex();
        assert!(dot.contains(&format!(
            "label=<<table title=\"bound\" bgcolor=\"{hex}\" fixedsize=\"true\" width=\"80\" height=\"20\"><tr><td></td></tr></table>>;"
        )));
    }
}
