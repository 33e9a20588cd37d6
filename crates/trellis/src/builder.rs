//! Assembles the canonical description for one render.
//!
//! [`GraphDescriptionBuilder`] walks the registry exactly once and produces
//! one [`GraphDescription`], in a fixed statement order: global attributes,
//! shared min/max rank pinning (swimlane mode), the root cluster tree, then
//! connectors in two phases. Both engine backends consume derivations of the
//! same description, so a render can never feed them diverging graphs.
//!
//! Spacing is the dzeta heuristic: the largest connector label metric over
//! ten, floored by a diagram-type minimum, overridden by explicit
//! configuration. All lengths are emitted in engine length units (inches at
//! 72 pixels per inch).

use trellis_core::{
    entity::{DiagramKind, Line, LineEnd},
    registry::Bibliotekon,
};

use crate::{
    cluster::{ClusterSerializer, title_label},
    config::{Rankdir, RenderConfig, Splines},
    description::{Attr, GraphDescription, RankKind, Statement},
    engine::EngineCapabilities,
    error::BuildError,
};

/// Converts a pixel length to the engine's inch-based length units.
pub(crate) fn pixel_to_inches(px: f32) -> String {
    format!("{:.5}", px / 72.0)
}

fn min_node_sep(kind: DiagramKind) -> f32 {
    if kind == DiagramKind::Activity { 20.0 } else { 35.0 }
}

fn min_rank_sep(kind: DiagramKind) -> f32 {
    if kind == DiagramKind::Activity { 40.0 } else { 60.0 }
}

/// Builds the canonical [`GraphDescription`] from a populated registry.
pub(crate) struct GraphDescriptionBuilder<'a> {
    bib: &'a Bibliotekon,
    config: &'a RenderConfig,
    caps: EngineCapabilities,
    kind: DiagramKind,
}

impl<'a> GraphDescriptionBuilder<'a> {
    pub(crate) fn new(
        bib: &'a Bibliotekon,
        config: &'a RenderConfig,
        caps: EngineCapabilities,
        kind: DiagramKind,
    ) -> Self {
        Self {
            bib,
            config,
            caps,
            kind,
        }
    }

    pub(crate) fn build(&self) -> Result<GraphDescription, BuildError> {
        let swimlanes = self.config.use_swimlanes(self.kind);

        let node_sep = self.spacing(
            "node",
            self.config.spacing().node_sep(),
            |l| l.horizontal_dzeta(),
            min_node_sep(self.kind),
        )?;
        let rank_sep = self.spacing(
            "rank",
            self.config.spacing().rank_sep(),
            |l| l.vertical_dzeta(),
            min_rank_sep(self.kind),
        )?;

        let mut statements = vec![
            Statement::Attribute(Attr::plain("ranksep", pixel_to_inches(rank_sep))),
            Statement::Attribute(Attr::plain("nodesep", pixel_to_inches(node_sep))),
            Statement::Attribute(Attr::plain("remincross", "true")),
            Statement::Attribute(Attr::plain("searchsize", "500")),
        ];
        match self.config.splines() {
            Splines::Default => {}
            Splines::Polyline => {
                statements.push(Statement::Attribute(Attr::plain("splines", "polyline")));
            }
            Splines::Ortho => {
                statements.push(Statement::Attribute(Attr::plain("splines", "ortho")));
                statements.push(Statement::Attribute(Attr::plain("forcelabels", "true")));
            }
        }
        if self.config.rankdir() == Rankdir::LeftToRight {
            statements.push(Statement::Attribute(Attr::plain("rankdir", "LR")));
        }

        if swimlanes {
            statements.extend(self.min_max_ranks());
        }

        let serializer = ClusterSerializer::new(self.bib, self.caps, swimlanes);
        statements.extend(serializer.emit_root());

        for line in self.bib.lines0() {
            statements.push(self.line_statement(line));
        }
        for line in self.bib.lines1() {
            statements.push(self.line_statement(line));
        }

        Ok(GraphDescription::new(statements))
    }

    /// Resolves one spacing axis: heuristic, floored, then overridden.
    fn spacing(
        &self,
        axis: &'static str,
        explicit: Option<f32>,
        dzeta: fn(&Line) -> f32,
        floor: f32,
    ) -> Result<f32, BuildError> {
        if let Some(value) = explicit {
            if !value.is_finite() || value < 0.0 {
                return Err(BuildError::InvalidSpacing { axis, value });
            }
            return Ok(value);
        }
        let max = self
            .bib
            .lines()
            .map(dzeta)
            .fold(0.0f32, f32::max);
        Ok((max / 10.0).max(floor))
    }

    /// Pins every cluster's min/max point into shared rank groups, so the
    /// swimlane anchors of sibling clusters align across the whole diagram.
    fn min_max_ranks(&self) -> Vec<Statement> {
        let min_points: Vec<Statement> = self
            .bib
            .clusters()
            .map(|(_, c)| Statement::zero_point(c.min_point_id()))
            .collect();
        let max_points: Vec<Statement> = self
            .bib
            .clusters()
            .map(|(_, c)| Statement::zero_point(c.max_point_id()))
            .collect();
        let mut out = Vec::new();
        if !min_points.is_empty() {
            out.push(Statement::Rank {
                kind: RankKind::Min,
                body: min_points,
            });
            out.push(Statement::Rank {
                kind: RankKind::Max,
                body: max_points,
            });
        }
        out
    }

    /// Emits one connector edge. A group-boundary endpoint resolves to the
    /// cluster's shared anchor point, clipped at the cluster border.
    fn line_statement(&self, line: &Line) -> Statement {
        let mut attrs = Vec::new();
        let tail = match line.source() {
            LineEnd::Node(id) => id.to_string(),
            LineEnd::Group(handle) => {
                let cluster = self.bib.cluster(handle);
                attrs.push(Attr::quoted("ltail", cluster.block_id()));
                cluster.special_point_id()
            }
        };
        let head = match line.target() {
            LineEnd::Node(id) => id.to_string(),
            LineEnd::Group(handle) => {
                let cluster = self.bib.cluster(handle);
                attrs.push(Attr::quoted("lhead", cluster.block_id()));
                cluster.special_point_id()
            }
        };
        attrs.push(Attr::quoted("color", line.color().hex()));
        if let Some(size) = line.label() {
            attrs.push(Attr::html("label", title_label(size, line.color())));
        }
        Statement::Edge { tail, head, attrs }
    }
}
