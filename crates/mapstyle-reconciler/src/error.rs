// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Reconciliation errors.

use mapstyle_port::BackendError;
use thiserror::Error;

use crate::key::StableKey;

/// Error reported for a whole pass or for one key within a pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// Two entries of one flatten pass resolve to the same key or identity.
    ///
    /// The pass is aborted and the applied state is left untouched.
    #[error("duplicate key {key}")]
    DuplicateKey {
        /// The key declared twice.
        key: StableKey,
    },
    /// A layer or terrain references a source that is not available, or a
    /// source cannot go while nodes reading from it remain.
    #[error("{key}: dependency on source {source_id:?} not satisfied")]
    DependencyUnsatisfied {
        /// The node whose operation was skipped.
        key: StableKey,
        /// The source the dependency is about.
        source_id: String,
    },
    /// The backend rejected the operation for this key.
    #[error("backend operation for {key} failed: {reason}")]
    BackendOperationFailed {
        /// The node whose operation failed.
        key: StableKey,
        /// What the backend reported.
        reason: BackendError,
    },
}

impl ReconcileError {
    /// The key this error is about.
    pub const fn key(&self) -> &StableKey {
        match self {
            Self::DuplicateKey { key }
            | Self::DependencyUnsatisfied { key, .. }
            | Self::BackendOperationFailed { key, .. } => key,
        }
    }
}
