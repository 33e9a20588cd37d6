//! Configuration for one render.
//!
//! [`RenderConfig`] gathers everything the description builder consults:
//! spacing overrides, edge-routing style, rank direction, the swimlane
//! switch, and the preferred backend. All types implement
//! [`serde::Deserialize`] for loading from external sources.

use serde::Deserialize;

use trellis_core::entity::DiagramKind;

use crate::engine::Backend;

/// Edge-routing style requested from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Splines {
    /// Engine default routing.
    #[default]
    Default,
    /// Polyline routing.
    Polyline,
    /// Orthogonal routing; also forces label placement.
    Ortho,
}

/// Overall rank direction of the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rankdir {
    #[default]
    TopToBottom,
    LeftToRight,
}

/// Explicit spacing overrides, in pixels.
///
/// When unset, spacing falls back to the dzeta heuristic computed from
/// connector metrics, floored by a diagram-type-dependent minimum.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SpacingConfig {
    #[serde(default)]
    node_sep: Option<f32>,

    #[serde(default)]
    rank_sep: Option<f32>,
}

impl SpacingConfig {
    /// Creates explicit overrides for both axes.
    pub fn new(node_sep: Option<f32>, rank_sep: Option<f32>) -> Self {
        Self { node_sep, rank_sep }
    }

    /// Returns the inter-node spacing override, if configured.
    pub fn node_sep(&self) -> Option<f32> {
        self.node_sep
    }

    /// Returns the inter-rank spacing override, if configured.
    pub fn rank_sep(&self) -> Option<f32> {
        self.rank_sep
    }
}

/// Render configuration consumed by the builder and the pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RenderConfig {
    /// Spacing overrides section.
    #[serde(default)]
    spacing: SpacingConfig,

    /// Edge-routing style.
    #[serde(default)]
    splines: Splines,

    /// Rank direction.
    #[serde(default)]
    rankdir: Rankdir,

    /// Whether swimlane alignment is requested.
    #[serde(default)]
    swimlanes: bool,

    /// Preferred layout backend.
    #[serde(default)]
    backend: Backend,
}

impl RenderConfig {
    /// Creates a configuration from its parts.
    pub fn new(
        spacing: SpacingConfig,
        splines: Splines,
        rankdir: Rankdir,
        swimlanes: bool,
        backend: Backend,
    ) -> Self {
        Self {
            spacing,
            splines,
            rankdir,
            swimlanes,
            backend,
        }
    }

    /// Returns the spacing overrides.
    pub fn spacing(&self) -> SpacingConfig {
        self.spacing
    }

    /// Returns the edge-routing style.
    pub fn splines(&self) -> Splines {
        self.splines
    }

    /// Returns the rank direction.
    pub fn rankdir(&self) -> Rankdir {
        self.rankdir
    }

    /// Whether swimlane mode is active for the given diagram kind.
    ///
    /// Swimlanes only exist in activity diagrams; the switch is ignored for
    /// every other kind.
    pub fn use_swimlanes(&self, kind: DiagramKind) -> bool {
        self.swimlanes && kind == DiagramKind::Activity
    }

    /// Returns the preferred backend.
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Sets the swimlane switch.
    pub fn with_swimlanes(mut self, swimlanes: bool) -> Self {
        self.swimlanes = swimlanes;
        self
    }

    /// Sets the preferred backend.
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Sets the spacing overrides.
    pub fn with_spacing(mut self, spacing: SpacingConfig) -> Self {
        self.spacing = spacing;
        self
    }

    /// Sets the edge-routing style.
    pub fn with_splines(mut self, splines: Splines) -> Self {
        self.splines = splines;
        self
    }

    /// Sets the rank direction.
    pub fn with_rankdir(mut self, rankdir: Rankdir) -> Self {
        self.rankdir = rankdir;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swimlanes_only_apply_to_activity() {
        let config = RenderConfig::default().with_swimlanes(true);
        assert!(config.use_swimlanes(DiagramKind::Activity));
        assert!(!config.use_swimlanes(DiagramKind::Class));
        assert!(!config.use_swimlanes(DiagramKind::State));
    }

    #[test]
    fn test_defaults() {
        let config = RenderConfig::default();
        assert_eq!(config.splines(), Splines::Default);
        assert_eq!(config.rankdir(), Rankdir::TopToBottom);
        assert!(config.spacing().node_sep().is_none());
        assert!(config.spacing().rank_sep().is_none());
    }
}
