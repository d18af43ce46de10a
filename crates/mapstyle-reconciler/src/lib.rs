// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Declarative map style reconciliation.
//!
//! Callers describe the style they want as a [`ContentNode`] tree. The
//! [`StyleReconciler`] flattens it, diffs it against what the backend already
//! holds and issues the smallest ordered set of [`StyleBackend`] calls that
//! brings the backend in sync.
//!
//! ```
//! use mapstyle_port::{LayerSpec, LayerType, SourceKind, SourceSpec};
//! use mapstyle_reconciler::{flatten, reconcile, AppliedState, ContentNode};
//!
//! let tree = ContentNode::group(vec![
//!     SourceSpec::new("streets", SourceKind::Vector).into(),
//!     LayerSpec::new("roads", LayerType::Line).source("streets").into(),
//! ]);
//! let entries = flatten(&tree)?;
//! let (applied, ops) = reconcile(&AppliedState::new(), &entries, &|_| false)?;
//! assert_eq!(ops.len(), 2);
//!
//! // Same tree again: nothing to do.
//! let (_, ops) = reconcile(&applied, &entries, &|_| false)?;
//! assert!(ops.is_empty());
//! # Ok::<(), mapstyle_reconciler::ReconcileError>(())
//! ```
//!
//! [`StyleBackend`]: mapstyle_port::StyleBackend

mod applied;
pub mod config;
mod content;
mod error;
mod flatten;
mod gate;
mod key;
mod plan;
mod reconciler;
mod report;
mod snapshot;

pub use applied::AppliedState;
pub use content::{Child, Composite, ContentNode, Expansion, StyleNode};
pub use error::ReconcileError;
pub use flatten::{flatten, FlatEntry};
pub use gate::{GateAction, Readiness, ReadinessGate};
pub use key::{KeySegment, NodeIdentity, StableKey};
pub use plan::reconcile;
pub use reconciler::{Pass, StyleReconciler};
pub use report::{KeyOutcome, OpRecord, ReconcileReport};
pub use snapshot::{PlacedNode, StyleSnapshot};
