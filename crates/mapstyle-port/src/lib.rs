// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Style backend port contract for map style reconciliation.
//!
//! This crate defines the contract between the reconciler and a stateful
//! style-management backend. Diffing lives in `mapstyle-reconciler`; nothing
//! here knows about content trees.
//!
//! # Design Principles
//!
//! - **Backends are dumb**: they receive imperative calls and apply them.
//! - **Values, not handles**: every spec is a plain value with structural
//!   equality and carries no backend identity.
//! - **Per-call outcomes**: every operation returns its own `Result`, so one
//!   failed call never poisons the rest of a batch.

use thiserror::Error;

/// Error reported by a [`StyleBackend`] for a single operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The backend refused the operation (invalid spec, conflicting id, ...).
    #[error("rejected: {0}")]
    Rejected(String),
    /// The operation referenced an object the backend does not hold.
    #[error("not found: {0}")]
    NotFound(String),
    /// The backend cannot accept operations right now (style not loaded).
    #[error("style unavailable")]
    Unavailable,
}

mod op;
mod port;
mod props;
mod types;

pub use op::StyleOp;
pub use port::StyleBackend;
pub use props::{apply_patch, diff_properties, Properties};
pub use types::{
    AtmosphereSpec, EffectKind, EffectSpec, ImageSpec, LayerSpec, LayerType, ModelSpec,
    ProjectionName, ProjectionSpec, Slot, SourceKind, SourceSpec, TerrainSpec,
};
