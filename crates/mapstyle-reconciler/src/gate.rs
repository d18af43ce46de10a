// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Style readiness gate.
//!
//! The backend can only accept operations while its base style is loaded. The
//! gate turns readiness signals into one of three actions. A replacement seen
//! while not ready is remembered until the style becomes ready, because the
//! backend state was discarded either way.

use serde::{Deserialize, Serialize};

/// Whether the backend accepts operations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    /// Content is buffered.
    #[default]
    NotReady,
    /// Content is reconciled as it arrives.
    Ready,
}

/// What the reconciler does in response to a readiness signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateAction {
    /// Keep buffering.
    Hold,
    /// Diff the latest tree against the applied state.
    Reconcile,
    /// Forget the applied state, then diff (re-adds everything).
    Rebuild,
}

/// Readiness state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadinessGate {
    state: Readiness,
    replaced: bool,
}

impl ReadinessGate {
    /// Gate starting in `state`.
    pub const fn new(state: Readiness) -> Self {
        Self {
            state,
            replaced: false,
        }
    }

    /// Current state.
    pub const fn state(&self) -> Readiness {
        self.state
    }

    /// Whether operations may be issued.
    pub const fn is_ready(&self) -> bool {
        matches!(self.state, Readiness::Ready)
    }

    /// Feed one readiness signal.
    ///
    /// `is_replacement` marks a swap of the whole base style, as opposed to a
    /// first load or a reload that keeps backend state.
    pub fn signal(&mut self, is_ready: bool, is_replacement: bool) -> GateAction {
        if !is_ready {
            self.state = Readiness::NotReady;
            self.replaced |= is_replacement;
            return GateAction::Hold;
        }
        let replaced = core::mem::take(&mut self.replaced) || is_replacement;
        self.state = Readiness::Ready;
        if replaced {
            GateAction::Rebuild
        } else {
            GateAction::Reconcile
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_load_reconciles() {
        let mut gate = ReadinessGate::default();
        assert!(!gate.is_ready());
        assert_eq!(gate.signal(true, false), GateAction::Reconcile);
        assert_eq!(gate.state(), Readiness::Ready);
    }

    #[test]
    fn replacement_while_ready_rebuilds() {
        let mut gate = ReadinessGate::new(Readiness::Ready);
        assert_eq!(gate.signal(true, true), GateAction::Rebuild);
        assert_eq!(gate.signal(true, false), GateAction::Reconcile);
    }

    #[test]
    fn replacement_is_remembered_until_ready() {
        let mut gate = ReadinessGate::new(Readiness::Ready);
        assert_eq!(gate.signal(false, true), GateAction::Hold);
        assert_eq!(gate.signal(false, false), GateAction::Hold);
        assert_eq!(gate.signal(true, false), GateAction::Rebuild);
        assert_eq!(gate.signal(true, false), GateAction::Reconcile);
    }

    #[test]
    fn readiness_serializes_snake_case() {
        let json = serde_json::to_string(&Readiness::NotReady).unwrap_or_default();
        assert_eq!(json, "\"not_ready\"");
    }
}
