//! Error types for Trellis renders.
//!
//! The taxonomy mirrors the render pipeline: build-time errors are fatal and
//! never retried; engine-invocation errors may trigger the one-shot backend
//! fallback; result-parsing errors are fatal and never apply partial
//! geometry.

use thiserror::Error;

use trellis_core::registry::ModelError;

use crate::engine::EngineError;

/// Errors raised while assembling the description.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A configured spacing override is negative or not a finite number.
    #[error("invalid {axis} spacing override: {value}")]
    InvalidSpacing { axis: &'static str, value: f32 },
}

/// Errors raised while parsing a geometry result.
///
/// All variants are fatal for the render: the model's layout fields are left
/// exactly as they were before the render started.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResultError {
    /// The engine produced zero-length output.
    #[error("layout engine produced an empty result")]
    EmptyResult,

    /// The result header with the canvas size is missing or unparseable.
    #[error("result header is missing or unparseable")]
    MalformedHeader,

    /// The expected geometry marker for a known entity is absent.
    #[error("no geometry found for `{id}`")]
    MissingGeometry { id: String },

    /// The geometry found under an entity's marker does not match the
    /// extraction rule for its shape kind.
    #[error("geometry for `{id}` does not match its `{shape}` extraction rule")]
    ShapeMismatch { id: String, shape: String },
}

/// The main error type for Trellis renders.
#[derive(Debug, Error)]
pub enum TrellisError {
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("build error: {0}")]
    Build(#[from] BuildError),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("result error: {0}")]
    Result(#[from] ResultError),
}
