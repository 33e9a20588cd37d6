//! Trellis Core Types and Definitions
//!
//! Foundational types for the Trellis layout bridge:
//!
//! - **Identifiers**: interned node ids and the per-render color sequence
//!   ([`identifier`] module)
//! - **Geometry**: points, sizes, and corner helpers ([`geometry`] module)
//! - **Entities**: clusters, nodes, and connectors ([`entity`] module)
//! - **Registry**: the per-render flat index ([`registry::Bibliotekon`])

pub mod entity;
pub mod geometry;
pub mod identifier;
pub mod registry;
