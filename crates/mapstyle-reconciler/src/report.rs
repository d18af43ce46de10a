// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-pass outcome reporting.

use std::collections::BTreeMap;

use mapstyle_port::{BackendError, StyleOp};

use crate::error::ReconcileError;
use crate::key::StableKey;

/// What happened to one key during a pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The backend holds what the key declares (or no longer holds what it
    /// declared, for removed keys).
    Applied,
    /// The key could not be brought in sync.
    Failed(ReconcileError),
}

impl KeyOutcome {
    /// Whether the key is in sync.
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// One issued backend call and its result.
#[derive(Clone, Debug, PartialEq)]
pub struct OpRecord {
    /// The operation.
    pub op: StyleOp,
    /// What the backend returned.
    pub result: Result<(), BackendError>,
}

/// Result of one reconciliation pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReconcileReport {
    /// Outcome per key, covering every key of the next tree and every key
    /// removed by the pass.
    pub outcomes: BTreeMap<StableKey, KeyOutcome>,
    /// Backend calls in issue order.
    pub issued: Vec<OpRecord>,
    /// Whether the applied state was discarded before diffing.
    pub reset: bool,
}

impl ReconcileReport {
    /// Outcome for `key`.
    pub fn outcome(&self, key: &StableKey) -> Option<&KeyOutcome> {
        self.outcomes.get(key)
    }

    /// Failed keys with their errors, in key order.
    pub fn failures(&self) -> impl Iterator<Item = &ReconcileError> {
        self.outcomes.values().filter_map(|outcome| match outcome {
            KeyOutcome::Failed(err) => Some(err),
            KeyOutcome::Applied => None,
        })
    }

    /// Whether every key was applied.
    pub fn is_success(&self) -> bool {
        self.outcomes.values().all(KeyOutcome::is_applied)
    }

    /// Issued operations without their results.
    pub fn ops(&self) -> Vec<StyleOp> {
        self.issued.iter().map(|record| record.op.clone()).collect()
    }

    pub(crate) fn mark_applied(&mut self, key: StableKey) {
        self.outcomes.entry(key).or_insert(KeyOutcome::Applied);
    }

    /// Record a failure. The first failure of a key wins.
    pub(crate) fn mark_failed(&mut self, err: ReconcileError) {
        let entry = self
            .outcomes
            .entry(err.key().clone())
            .or_insert(KeyOutcome::Applied);
        if entry.is_applied() {
            *entry = KeyOutcome::Failed(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::NodeIdentity;

    #[test]
    fn first_failure_wins() {
        let key = StableKey::from(NodeIdentity::Layer("roads".into()));
        let mut report = ReconcileReport::default();
        report.mark_applied(key.clone());
        assert!(report.is_success());

        report.mark_failed(ReconcileError::DependencyUnsatisfied {
            key: key.clone(),
            source_id: "streets".into(),
        });
        report.mark_failed(ReconcileError::BackendOperationFailed {
            key: key.clone(),
            reason: BackendError::Unavailable,
        });
        report.mark_applied(key.clone());

        assert!(!report.is_success());
        assert!(matches!(
            report.outcome(&key),
            Some(KeyOutcome::Failed(ReconcileError::DependencyUnsatisfied { .. }))
        ));
        assert_eq!(report.failures().count(), 1);
    }
}
