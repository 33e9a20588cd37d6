//! Trellis - bridging hierarchical diagram models to flat graph-layout engines.
//!
//! A diagram model is a tree of nested clusters holding leaf shapes and
//! connectors; layout engines understand only a flat, block-structured graph
//! description. Trellis encodes the tree as nested synthetic wrapper blocks,
//! hands the description to a [`engine::LayoutEngine`], and maps the
//! engine's geometry result back onto the model, correcting for the vertical
//! coordinate-convention mismatch on the way.

pub mod config;
pub mod description;
pub mod engine;
pub mod native;

mod builder;
mod cluster;
mod error;
mod mapper;

pub use trellis_core::{entity, geometry, identifier, registry};

pub use error::{BuildError, ResultError, TrellisError};

use log::{debug, warn};

use trellis_core::entity::DiagramKind;
use trellis_core::registry::Bibliotekon;

use builder::GraphDescriptionBuilder;
use config::RenderConfig;
use description::GraphDescription;
use engine::{Backend, EngineCapabilities, EngineError, LayoutEngine};
use mapper::LayoutResultMapper;
use native::NativeGraph;

/// Runs the layout pipeline for one diagram.
///
/// One renderer per diagram kind and configuration; the populated
/// [`Bibliotekon`] carries the entities of a single render.
///
/// # Examples
///
/// ```rust
/// use trellis::{Renderer, config::RenderConfig, engine::EngineCapabilities};
/// use trellis::entity::{DiagramKind, EntityPosition, ShapeKind, SymbolKind};
/// use trellis::geometry::Size;
/// use trellis::registry::Bibliotekon;
///
/// let mut bib = Bibliotekon::new();
/// bib.open_cluster(None, SymbolKind::Package, false);
/// bib.add_node("app", ShapeKind::Rectangle, EntityPosition::Normal, Size::new(80.0, 40.0))?;
/// bib.close_cluster()?;
///
/// let renderer = Renderer::new(RenderConfig::default(), DiagramKind::Component);
/// let dot = renderer.dot(&bib, EngineCapabilities::default())?;
/// assert!(dot.starts_with("digraph"));
/// # Ok::<(), trellis::TrellisError>(())
/// ```
pub struct Renderer {
    config: RenderConfig,
    kind: DiagramKind,
}

impl Renderer {
    /// Creates a renderer for the given configuration and diagram kind.
    pub fn new(config: RenderConfig, kind: DiagramKind) -> Self {
        Self { config, kind }
    }

    /// Returns the textual description the engine would receive.
    ///
    /// # Errors
    ///
    /// Returns an error when a configured spacing override is invalid.
    pub fn dot(&self, bib: &Bibliotekon, caps: EngineCapabilities) -> Result<String, TrellisError> {
        Ok(self.describe(bib, caps)?.to_dot())
    }

    /// Runs the full pipeline: build the description, invoke the engine, and
    /// write the corrected geometry back onto the model.
    ///
    /// With the native backend, an engine failure of the distinguished
    /// runtime kind triggers exactly one retry through the textual backend;
    /// any other engine error is fatal. A failed render leaves the model's
    /// layout fields untouched.
    ///
    /// # Errors
    ///
    /// Returns build, engine, or result-parsing errors; see [`TrellisError`].
    pub fn render(
        &self,
        bib: &mut Bibliotekon,
        engine: &dyn LayoutEngine,
    ) -> Result<(), TrellisError> {
        let caps = engine.capabilities();
        let description = self.describe(bib, caps)?;

        match self.config.backend() {
            Backend::Text => {
                debug!(backend = "text"; "Invoking layout engine");
                let result = engine.render_dot(&description.to_dot())?;
                LayoutResultMapper::new(bib).apply_svg(&result)?;
            }
            Backend::Native => {
                debug!(backend = "native"; "Invoking layout engine");
                let graph = NativeGraph::from_description(&description);
                match engine.layout_native(&graph) {
                    Ok(layout) => LayoutResultMapper::new(bib).apply_native(&layout)?,
                    Err(EngineError::NativeRuntime(reason)) => {
                        warn!(reason = reason; "Native layout failed, retrying with the textual backend");
                        let description = self.describe(bib, caps)?;
                        let result = engine.render_dot(&description.to_dot())?;
                        LayoutResultMapper::new(bib).apply_svg(&result)?;
                    }
                    Err(other) => return Err(other.into()),
                }
            }
        }
        debug!("Layout result applied");
        Ok(())
    }

    fn describe(
        &self,
        bib: &Bibliotekon,
        caps: EngineCapabilities,
    ) -> Result<GraphDescription, TrellisError> {
        let builder = GraphDescriptionBuilder::new(bib, &self.config, caps, self.kind);
        Ok(builder.build()?)
    }
}
