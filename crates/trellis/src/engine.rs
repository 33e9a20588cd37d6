//! The layout-engine seam.
//!
//! Trellis never spawns processes or links layout libraries itself; an engine
//! is anything implementing [`LayoutEngine`]. The textual path hands the
//! engine a DOT string and expects a vector-markup result back; the native
//! path hands it the flattened [`NativeGraph`] and expects a typed
//! [`NativeLayout`].
//!
//! Capabilities are resolved once per render through
//! [`LayoutEngine::capabilities`] and threaded through the pipeline; they are
//! never cached process-wide.

use serde::Deserialize;
use thiserror::Error;

use crate::native::{NativeGraph, NativeLayout};

/// Which derivation of the canonical description an engine consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// The line-oriented textual description, for process-based engines.
    #[default]
    Text,
    /// The in-memory graph object, for in-process engines.
    Native,
}

/// Version-specific behavior flags of a concrete engine.
///
/// These are injectable predicates, not hard-coded version thresholds: the
/// engine implementation decides what its version supports.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct EngineCapabilities {
    /// Whether clusters touched by cross-boundary connectors need the
    /// link-protection wrapper pair.
    #[serde(default = "default_true")]
    cluster_link_protection: bool,
}

fn default_true() -> bool {
    true
}

impl Default for EngineCapabilities {
    fn default() -> Self {
        Self {
            cluster_link_protection: true,
        }
    }
}

impl EngineCapabilities {
    /// Creates capabilities with an explicit link-protection flag.
    pub fn new(cluster_link_protection: bool) -> Self {
        Self {
            cluster_link_protection,
        }
    }

    /// Whether the link-protection wrapper pair is required.
    pub fn cluster_link_protection(&self) -> bool {
        self.cluster_link_protection
    }
}

/// Errors reported by a layout engine invocation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A process-based invocation failed.
    #[error("layout process failed: {0}")]
    Process(String),

    /// The invocation exceeded its hard timeout. Terminal for the render.
    #[error("layout engine timed out")]
    Timeout,

    /// The native backend's distinguished runtime failure. The only error
    /// kind that triggers the one-shot fallback to the textual backend.
    #[error("native engine failure: {0}")]
    NativeRuntime(String),
}

/// An external layout engine, specified only through this interface.
pub trait LayoutEngine {
    /// Resolves the engine's version-specific capability flags.
    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities::default()
    }

    /// Runs the engine on the textual description, returning the raw
    /// vector-markup result.
    fn render_dot(&self, dot: &str) -> Result<String, EngineError>;

    /// Runs the engine on the in-memory graph, returning the typed result.
    fn layout_native(&self, graph: &NativeGraph) -> Result<NativeLayout, EngineError>;
}
