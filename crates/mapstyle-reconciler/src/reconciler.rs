// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The reconciler façade: flatten, gate, plan, execute.

use mapstyle_port::StyleBackend;
use tracing::{debug, info, instrument, warn};

use crate::applied::AppliedState;
use crate::config::ReconcilerConfig;
use crate::content::ContentNode;
use crate::error::ReconcileError;
use crate::flatten::flatten;
use crate::gate::{GateAction, Readiness, ReadinessGate};
use crate::plan::{plan, Plan};
use crate::report::{OpRecord, ReconcileReport};
use crate::snapshot::StyleSnapshot;

/// Result of [`StyleReconciler::submit`].
#[derive(Clone, Debug, PartialEq)]
pub enum Pass {
    /// The backend is not ready; the tree was recorded for later.
    Buffered,
    /// The tree was reconciled.
    Reconciled(ReconcileReport),
}

impl Pass {
    /// The report, if the tree was reconciled.
    pub const fn report(&self) -> Option<&ReconcileReport> {
        match self {
            Self::Buffered => None,
            Self::Reconciled(report) => Some(report),
        }
    }

    /// Consume into the report, if the tree was reconciled.
    pub fn into_report(self) -> Option<ReconcileReport> {
        match self {
            Self::Buffered => None,
            Self::Reconciled(report) => Some(report),
        }
    }
}

/// Keeps one [`StyleBackend`] in sync with submitted content trees.
///
/// All calls are synchronous; hosts that receive triggers from several places
/// serialize them before calling in.
#[derive(Debug)]
pub struct StyleReconciler<B> {
    backend: B,
    applied: AppliedState,
    gate: ReadinessGate,
    latest: StyleSnapshot,
    config: ReconcilerConfig,
}

impl<B: StyleBackend> StyleReconciler<B> {
    /// Reconciler driving `backend`.
    pub fn new(backend: B, config: ReconcilerConfig) -> Self {
        Self {
            backend,
            applied: AppliedState::new(),
            gate: ReadinessGate::new(config.initial_readiness),
            latest: StyleSnapshot::new(),
            config,
        }
    }

    /// Flatten `tree` and, when the backend is ready, reconcile it.
    ///
    /// # Errors
    ///
    /// [`ReconcileError::DuplicateKey`] when the tree declares a key or
    /// identity twice. Nothing is recorded or applied in that case.
    #[instrument(level = "debug", skip_all)]
    pub fn submit(&mut self, tree: &ContentNode) -> Result<Pass, ReconcileError> {
        let entries = flatten(tree)?;
        self.latest = StyleSnapshot::from_entries(entries)?;
        if !self.gate.is_ready() {
            debug!(nodes = self.latest.len(), "style not ready; tree buffered");
            return Ok(Pass::Buffered);
        }
        Ok(Pass::Reconciled(self.run(false)))
    }

    /// Feed a readiness signal from the backend.
    ///
    /// Returns the report of the pass the signal triggered, if any.
    #[instrument(level = "debug", skip(self))]
    pub fn notify_ready(
        &mut self,
        is_ready: bool,
        is_replacement: bool,
    ) -> Option<ReconcileReport> {
        match self.gate.signal(is_ready, is_replacement) {
            GateAction::Hold => {
                info!("style not ready; holding");
                None
            }
            GateAction::Reconcile => {
                info!("style ready");
                Some(self.run(false))
            }
            GateAction::Rebuild => {
                info!(dropped = self.applied.len(), "style replaced; rebuilding");
                self.applied.clear();
                Some(self.run(true))
            }
        }
    }

    /// Forget the applied state without touching the backend.
    pub fn reset(&mut self) {
        info!(dropped = self.applied.len(), "applied state reset");
        self.applied.clear();
    }

    /// What the backend is known to hold.
    pub const fn applied(&self) -> &AppliedState {
        &self.applied
    }

    /// Current gate state.
    pub const fn readiness(&self) -> Readiness {
        self.gate.state()
    }

    /// Active configuration.
    pub const fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// The driven backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// The driven backend, mutably. Changes made here are invisible to the
    /// applied state.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Consume the reconciler, returning the backend.
    pub fn into_backend(self) -> B {
        self.backend
    }

    fn source_available(&self, id: &str) -> bool {
        self.applied.has_source(id)
            || (self.config.resolve_external_sources && self.backend.has_source(id))
    }

    #[instrument(level = "debug", skip(self))]
    fn run(&mut self, reset: bool) -> ReconcileReport {
        let resolve = self.config.resolve_external_sources;
        let backend = &self.backend;
        let external = |id: &str| resolve && backend.has_source(id);
        let Plan {
            steps,
            skipped,
            refresh,
        } = plan(&self.applied, &self.latest, &external);

        let mut report = ReconcileReport {
            reset,
            ..ReconcileReport::default()
        };
        for err in skipped {
            warn!(%err, "skipping node");
            report.mark_failed(err);
        }

        for step in steps {
            if let Some(source) = &step.requires {
                if !self.source_available(source) {
                    warn!(op = %step.op, source = %source, "source unavailable; skipping");
                    for key in step.keys {
                        report.mark_failed(ReconcileError::DependencyUnsatisfied {
                            key,
                            source_id: source.clone(),
                        });
                    }
                    continue;
                }
            }
            if let Some(pending) = step
                .blocked_by
                .iter()
                .find(|identity| self.applied.get(identity).is_some())
            {
                warn!(op = %step.op, %pending, "still applied; skipping");
                let source_id = step.dependency();
                for key in step.keys {
                    report.mark_failed(ReconcileError::DependencyUnsatisfied {
                        key,
                        source_id: source_id.clone(),
                    });
                }
                continue;
            }
            let result = step.op.apply(&mut self.backend);
            match &result {
                Ok(()) => {
                    debug!(op = %step.op, "applied");
                    for commit in &step.commits {
                        self.applied.commit(commit);
                    }
                    for key in step.keys {
                        report.mark_applied(key);
                    }
                }
                Err(reason) => {
                    warn!(op = %step.op, %reason, "backend rejected operation");
                    for key in step.keys {
                        report.mark_failed(ReconcileError::BackendOperationFailed {
                            key,
                            reason: reason.clone(),
                        });
                    }
                }
            }
            report.issued.push(OpRecord {
                op: step.op,
                result,
            });
        }

        for commit in &refresh {
            self.applied.commit(commit);
        }
        for key in self.latest.keys() {
            report.mark_applied(key.clone());
        }
        debug!(
            issued = report.issued.len(),
            failed = report.failures().count(),
            "pass complete"
        );
        report
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use mapstyle_port::{
        AtmosphereSpec, BackendError, EffectKind, EffectSpec, ImageSpec, LayerSpec, ModelSpec,
        ProjectionSpec, Properties, Slot, SourceKind, SourceSpec, StyleOp, TerrainSpec,
    };

    /// Records ops; rejects any call whose target is in `reject`.
    #[derive(Debug, Default)]
    struct Recorder {
        ops: Vec<String>,
        reject: Vec<String>,
    }

    impl Recorder {
        fn record(&mut self, op: &StyleOp) -> Result<(), BackendError> {
            self.ops.push(op.to_string());
            match op.target() {
                Some(target) if self.reject.iter().any(|r| r == target) => {
                    Err(BackendError::Rejected(target.to_string()))
                }
                _ => Ok(()),
            }
        }
    }

    impl StyleBackend for Recorder {
        fn add_source(&mut self, spec: &SourceSpec) -> Result<(), BackendError> {
            self.record(&StyleOp::AddSource(spec.clone()))
        }
        fn update_source(&mut self, id: &str, changes: &Properties) -> Result<(), BackendError> {
            self.record(&StyleOp::UpdateSource {
                id: id.into(),
                changes: changes.clone(),
            })
        }
        fn remove_source(&mut self, id: &str) -> Result<(), BackendError> {
            self.record(&StyleOp::RemoveSource { id: id.into() })
        }
        fn add_layer(&mut self, spec: &LayerSpec, before: Option<&str>) -> Result<(), BackendError> {
            self.record(&StyleOp::AddLayer {
                spec: spec.clone(),
                before: before.map(str::to_string),
            })
        }
        fn update_layer_properties(
            &mut self,
            id: &str,
            changes: &Properties,
        ) -> Result<(), BackendError> {
            self.record(&StyleOp::UpdateLayerProperties {
                id: id.into(),
                changes: changes.clone(),
            })
        }
        fn move_layer(
            &mut self,
            id: &str,
            slot: Option<&Slot>,
            before: Option<&str>,
        ) -> Result<(), BackendError> {
            self.record(&StyleOp::MoveLayer {
                id: id.into(),
                slot: slot.cloned(),
                before: before.map(str::to_string),
            })
        }
        fn remove_layer(&mut self, id: &str) -> Result<(), BackendError> {
            self.record(&StyleOp::RemoveLayer { id: id.into() })
        }
        fn add_image(&mut self, spec: &ImageSpec) -> Result<(), BackendError> {
            self.record(&StyleOp::AddImage(spec.clone()))
        }
        fn remove_image(&mut self, id: &str) -> Result<(), BackendError> {
            self.record(&StyleOp::RemoveImage { id: id.into() })
        }
        fn add_model(&mut self, spec: &ModelSpec) -> Result<(), BackendError> {
            self.record(&StyleOp::AddModel(spec.clone()))
        }
        fn remove_model(&mut self, id: &str) -> Result<(), BackendError> {
            self.record(&StyleOp::RemoveModel { id: id.into() })
        }
        fn set_terrain(&mut self, spec: Option<&TerrainSpec>) -> Result<(), BackendError> {
            self.record(&StyleOp::SetTerrain(spec.cloned()))
        }
        fn set_atmosphere(&mut self, spec: Option<&AtmosphereSpec>) -> Result<(), BackendError> {
            self.record(&StyleOp::SetAtmosphere(spec.cloned()))
        }
        fn set_projection(&mut self, spec: Option<&ProjectionSpec>) -> Result<(), BackendError> {
            self.record(&StyleOp::SetProjection(spec.cloned()))
        }
        fn set_effect(
            &mut self,
            kind: EffectKind,
            spec: Option<&EffectSpec>,
        ) -> Result<(), BackendError> {
            self.record(&StyleOp::SetEffect {
                kind,
                spec: spec.cloned(),
            })
        }
    }

    fn ready() -> ReconcilerConfig {
        ReconcilerConfig {
            initial_readiness: Readiness::Ready,
            ..ReconcilerConfig::default()
        }
    }

    fn tree() -> ContentNode {
        ContentNode::group(vec![
            SourceSpec::new("a", SourceKind::Vector).into(),
            LayerSpec::new("l", mapstyle_port::LayerType::Line)
                .source("a")
                .into(),
        ])
    }

    #[test]
    fn buffers_until_ready() {
        let mut reconciler = StyleReconciler::new(Recorder::default(), ReconcilerConfig::default());
        assert_eq!(reconciler.submit(&tree()).unwrap(), Pass::Buffered);
        assert!(reconciler.backend().ops.is_empty());

        let report = reconciler.notify_ready(true, false).unwrap();
        assert!(report.is_success());
        assert!(!report.reset);
        assert_eq!(reconciler.backend().ops, ["add_source(a)", "add_layer(l)"]);
    }

    #[test]
    fn failed_source_skips_dependent_layer() {
        let backend = Recorder {
            reject: vec!["a".into()],
            ..Recorder::default()
        };
        let mut reconciler = StyleReconciler::new(backend, ready());
        let report = reconciler.submit(&tree()).unwrap().into_report().unwrap();
        assert_eq!(reconciler.backend().ops, ["add_source(a)"]);
        assert_eq!(report.failures().count(), 2);
        assert!(reconciler.applied().is_empty());
    }

    #[test]
    fn duplicate_key_leaves_state_untouched() {
        let mut reconciler = StyleReconciler::new(Recorder::default(), ready());
        reconciler.submit(&tree()).unwrap();
        let before = reconciler.applied().clone();
        let dup = ContentNode::group(vec![tree(), tree()]);
        assert!(matches!(
            reconciler.submit(&dup),
            Err(ReconcileError::DuplicateKey { .. })
        ));
        assert_eq!(reconciler.applied(), &before);
        assert!(reconciler.submit(&tree()).unwrap().report().unwrap().issued.is_empty());
    }
}
