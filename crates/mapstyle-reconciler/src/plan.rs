// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Diff planning.
//!
//! [`plan`] compares the applied state with the next snapshot and produces an
//! ordered list of backend operations. Nodes are matched by backend identity,
//! so a node whose key moved but whose identity did not is updated in place.
//!
//! Phases, in order:
//!
//! 1. layer removals (top of the old stack first)
//! 2. terrain clear, when it goes away or its source does
//! 3. source removals
//! 4. image and model removals
//! 5. atmosphere, projection and effect clears
//! 6. source adds and updates
//! 7. image and model adds
//! 8. layer adds, updates and moves
//! 9. terrain, atmosphere, projection and effects
//!
//! Every step carries the state changes it causes. The executor commits them
//! only when the backend call succeeds.

use std::collections::{BTreeMap, HashMap, HashSet};

use mapstyle_port::{
    diff_properties, LayerSpec, Properties, Slot, SourceKind, SourceSpec, StyleOp,
};
use serde_json::Value;

use crate::applied::{AppliedState, Commit};
use crate::content::StyleNode;
use crate::error::ReconcileError;
use crate::flatten::FlatEntry;
use crate::key::{NodeIdentity, StableKey};
use crate::snapshot::{PlacedNode, StyleSnapshot};

/// One backend call and what it changes.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct PlannedStep {
    pub(crate) op: StyleOp,
    pub(crate) keys: Vec<StableKey>,
    /// Source that must exist when the call is issued.
    pub(crate) requires: Option<String>,
    /// Nodes that must be gone when the call is issued.
    pub(crate) blocked_by: Vec<NodeIdentity>,
    pub(crate) commits: Vec<Commit>,
}

impl PlannedStep {
    /// Source named when a guard of this step fails.
    pub(crate) fn dependency(&self) -> String {
        self.requires
            .as_deref()
            .or_else(|| self.op.target())
            .unwrap_or_default()
            .to_string()
    }
}

/// Output of [`plan`].
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Plan {
    pub(crate) steps: Vec<PlannedStep>,
    /// Nodes left out because their source is unavailable.
    pub(crate) skipped: Vec<ReconcileError>,
    /// Key and order updates for nodes that stay in place.
    pub(crate) refresh: Vec<Commit>,
}

/// Compute the operations turning `previous` into `next`.
///
/// `external` reports sources that exist in the backend without being managed
/// here; layers and terrain may depend on them.
pub(crate) fn plan(
    previous: &AppliedState,
    next: &StyleSnapshot,
    external: &dyn Fn(&str) -> bool,
) -> Plan {
    Planner::new(previous, next, external).run()
}

/// Pure reconciliation: the state reached and the operations issued when
/// every backend call succeeds.
///
/// Nodes whose source is unavailable are left out of both.
///
/// # Errors
///
/// [`ReconcileError::DuplicateKey`] when `next` declares a key or identity
/// twice.
pub fn reconcile(
    previous: &AppliedState,
    next: &[FlatEntry],
    external: &dyn Fn(&str) -> bool,
) -> Result<(AppliedState, Vec<StyleOp>), ReconcileError> {
    let snapshot = StyleSnapshot::from_entries(next.iter().cloned())?;
    let Plan { steps, refresh, .. } = plan(previous, &snapshot, external);
    let mut state = previous.clone();
    let mut ops = Vec::with_capacity(steps.len());
    for step in steps {
        for commit in &step.commits {
            state.commit(commit);
        }
        ops.push(step.op);
    }
    for commit in &refresh {
        state.commit(commit);
    }
    Ok((state, ops))
}

struct Planner<'a> {
    prev: &'a StyleSnapshot,
    previous: &'a AppliedState,
    /// Next nodes whose dependencies resolve, in declaration order.
    desired: Vec<(&'a NodeIdentity, &'a PlacedNode)>,
    by_identity: HashMap<&'a NodeIdentity, &'a PlacedNode>,
    replaced_sources: HashSet<&'a str>,
    removed: HashSet<NodeIdentity>,
    terrain_cleared: bool,
    out: Plan,
}

impl<'a> Planner<'a> {
    fn new(
        previous: &'a AppliedState,
        next: &'a StyleSnapshot,
        external: &dyn Fn(&str) -> bool,
    ) -> Self {
        let prev = previous.snapshot();
        let mut out = Plan::default();

        let replaced_sources = next
            .iter()
            .filter_map(|(identity, placed)| match (&placed.node, prev.get(identity)) {
                (StyleNode::Source(new), Some(old)) => match &old.node {
                    StyleNode::Source(old) if old.kind != new.kind => Some(new.id.as_str()),
                    _ => None,
                },
                _ => None,
            })
            .collect();

        let available =
            |source: &str| next.has_source(source) || (!prev.has_source(source) && external(source));
        let mut desired = Vec::with_capacity(next.len());
        for (identity, placed) in next.ordered() {
            if let Some(source) = placed.node.required_source() {
                if !available(source) {
                    out.skipped.push(ReconcileError::DependencyUnsatisfied {
                        key: placed.key.clone(),
                        source_id: source.to_string(),
                    });
                    continue;
                }
            }
            desired.push((identity, placed));
        }
        let by_identity = desired.iter().copied().collect();

        Self {
            prev,
            previous,
            desired,
            by_identity,
            replaced_sources,
            removed: HashSet::new(),
            terrain_cleared: false,
            out,
        }
    }

    fn run(mut self) -> Plan {
        self.plan_removals();
        self.plan_sources();
        self.plan_resources();
        self.plan_layers();
        self.plan_globals();
        self.plan_refresh();
        self.out
    }

    fn source_goes_away(&self, id: &str) -> bool {
        self.prev.has_source(id)
            && (self.replaced_sources.contains(id)
                || !self
                    .by_identity
                    .contains_key(&NodeIdentity::Source(id.to_string())))
    }

    /// Whether the applied node cannot be updated into its next content.
    fn must_remove(&self, identity: &NodeIdentity, old: &PlacedNode) -> bool {
        let Some(new) = self.by_identity.get(identity) else {
            return true;
        };
        match (&old.node, &new.node) {
            (StyleNode::Source(old), StyleNode::Source(new)) => old.kind != new.kind,
            (StyleNode::Layer(old), StyleNode::Layer(new)) => {
                layer_needs_replace(old, new)
                    || new
                        .source
                        .as_deref()
                        .is_some_and(|source| self.replaced_sources.contains(source))
            }
            (StyleNode::Image(_), StyleNode::Image(_)) | (StyleNode::Model(_), StyleNode::Model(_)) => {
                old.node != new.node
            }
            (StyleNode::Terrain(old), StyleNode::Terrain(_)) => self.source_goes_away(&old.source),
            _ => false,
        }
    }

    fn push(
        &mut self,
        op: StyleOp,
        placed: &PlacedNode,
        requires: Option<String>,
        commits: Vec<Commit>,
    ) {
        // A re-add waits for the removal half of its replacement.
        let blocked_by = commits
            .iter()
            .filter_map(|commit| match commit {
                Commit::Place(identity, _) if self.removed.contains(identity) => {
                    Some(identity.clone())
                }
                _ => None,
            })
            .collect();
        self.out.steps.push(PlannedStep {
            op,
            keys: placed.keys().cloned().collect(),
            requires,
            blocked_by,
            commits,
        });
    }

    /// Applied layers and terrain reading from `source`.
    fn dependents_of(&self, source: &str) -> Vec<NodeIdentity> {
        self.prev
            .iter()
            .filter(|(_, placed)| placed.node.required_source() == Some(source))
            .map(|(identity, _)| identity.clone())
            .collect()
    }

    fn plan_removals(&mut self) {
        let prev = self.prev;
        let mut doomed: Vec<(&NodeIdentity, &PlacedNode)> = prev
            .ordered()
            .into_iter()
            .filter(|(identity, placed)| self.must_remove(identity, placed))
            .collect();
        doomed.reverse();

        for phase in 0..5 {
            for &(identity, placed) in &doomed {
                let op = match (phase, identity) {
                    (0, NodeIdentity::Layer(id)) => StyleOp::RemoveLayer { id: id.clone() },
                    (1, NodeIdentity::Terrain) => {
                        self.terrain_cleared = true;
                        StyleOp::SetTerrain(None)
                    }
                    (2, NodeIdentity::Source(id)) => StyleOp::RemoveSource { id: id.clone() },
                    (3, NodeIdentity::Image(id)) => StyleOp::RemoveImage { id: id.clone() },
                    (3, NodeIdentity::Model(id)) => StyleOp::RemoveModel { id: id.clone() },
                    (4, NodeIdentity::Atmosphere) => StyleOp::SetAtmosphere(None),
                    (4, NodeIdentity::Projection) => StyleOp::SetProjection(None),
                    (4, NodeIdentity::Effect(kind)) => StyleOp::SetEffect {
                        kind: *kind,
                        spec: None,
                    },
                    _ => continue,
                };
                let blocked_by = match identity {
                    NodeIdentity::Source(id) => self.dependents_of(id),
                    _ => Vec::new(),
                };
                self.removed.insert(identity.clone());
                self.out.steps.push(PlannedStep {
                    op,
                    keys: placed.keys().cloned().collect(),
                    requires: None,
                    blocked_by,
                    commits: vec![Commit::Drop(identity.clone())],
                });
            }
        }
    }

    /// Applied node that survives this pass.
    fn kept(&self, identity: &NodeIdentity) -> Option<&'a PlacedNode> {
        if self.removed.contains(identity) {
            return None;
        }
        self.prev.get(identity)
    }

    fn desired_of(&self, select: fn(&NodeIdentity) -> bool) -> Vec<(&'a NodeIdentity, &'a PlacedNode)> {
        self.desired
            .iter()
            .filter(|(identity, _)| select(identity))
            .copied()
            .collect()
    }

    fn plan_sources(&mut self) {
        for (identity, placed) in self.desired_of(|i| matches!(i, NodeIdentity::Source(_))) {
            let StyleNode::Source(spec) = &placed.node else {
                continue;
            };
            let old = match self.kept(identity).map(|p| &p.node) {
                Some(StyleNode::Source(old)) => old,
                _ => {
                    self.push(
                        StyleOp::AddSource(spec.clone()),
                        placed,
                        None,
                        vec![Commit::Place(identity.clone(), placed.clone())],
                    );
                    continue;
                }
            };
            let (data, changes) = source_changes(old, spec);
            if let Some(data) = data {
                let mut patch = Properties::new();
                patch.insert(SourceSpec::DATA.to_string(), data.clone());
                self.push(
                    StyleOp::UpdateGeoJsonData {
                        id: spec.id.clone(),
                        data,
                    },
                    placed,
                    None,
                    vec![Commit::Patch(identity.clone(), patch)],
                );
            }
            if !changes.is_empty() {
                self.push(
                    StyleOp::UpdateSource {
                        id: spec.id.clone(),
                        changes: changes.clone(),
                    },
                    placed,
                    None,
                    vec![Commit::Patch(identity.clone(), changes)],
                );
            }
        }
    }

    fn plan_resources(&mut self) {
        let resources =
            self.desired_of(|i| matches!(i, NodeIdentity::Image(_) | NodeIdentity::Model(_)));
        for (identity, placed) in resources {
            if self.kept(identity).is_some() {
                continue;
            }
            let op = match &placed.node {
                StyleNode::Image(spec) => StyleOp::AddImage(spec.clone()),
                StyleNode::Model(spec) => StyleOp::AddModel(spec.clone()),
                _ => continue,
            };
            self.push(
                op,
                placed,
                None,
                vec![Commit::Place(identity.clone(), placed.clone())],
            );
        }
    }

    fn plan_layers(&mut self) {
        let layers: Vec<(&NodeIdentity, &PlacedNode, &LayerSpec)> = self
            .desired_of(|i| matches!(i, NodeIdentity::Layer(_)))
            .into_iter()
            .filter_map(|(identity, placed)| match &placed.node {
                StyleNode::Layer(spec) => Some((identity, placed, spec)),
                _ => None,
            })
            .collect();

        let order_of: HashMap<&str, usize> = layers
            .iter()
            .filter(|(identity, _, _)| self.kept(identity).is_some())
            .map(|(_, placed, spec)| (spec.id.as_str(), placed.order))
            .collect();

        // Surviving layers already in increasing order stay where they are.
        let mut fixed: HashSet<&str> = HashSet::new();
        for slot in self.previous.slots() {
            let current: Vec<(&str, usize)> = self
                .previous
                .layers_in(slot)
                .iter()
                .filter_map(|id| order_of.get_key_value(id.as_str()))
                .map(|(id, order)| (*id, *order))
                .collect();
            let orders: Vec<usize> = current.iter().map(|(_, order)| *order).collect();
            for ((id, _), keep) in current.iter().zip(longest_increasing(&orders)) {
                if keep {
                    fixed.insert(*id);
                }
            }
        }

        let mut frame: BTreeMap<Option<&Slot>, Vec<(usize, &str)>> = BTreeMap::new();
        for (_, placed, spec) in &layers {
            if fixed.contains(spec.id.as_str()) {
                frame
                    .entry(spec.slot.as_ref())
                    .or_default()
                    .push((placed.order, spec.id.as_str()));
            }
        }
        let anchor = |slot: Option<&Slot>, order: usize| -> Option<String> {
            let pinned = frame.get(&slot)?;
            let at = pinned.partition_point(|(o, _)| *o <= order);
            pinned.get(at).map(|(_, id)| (*id).to_string())
        };

        for &(identity, placed, spec) in &layers {
            let before = anchor(spec.slot.as_ref(), placed.order);
            let position = Commit::Position {
                layer: spec.id.clone(),
                slot: spec.slot.clone(),
                before: before.clone(),
            };
            let Some(StyleNode::Layer(old)) = self.kept(identity).map(|p| &p.node) else {
                self.push(
                    StyleOp::AddLayer {
                        spec: spec.clone(),
                        before,
                    },
                    placed,
                    spec.source.clone(),
                    vec![Commit::Place(identity.clone(), placed.clone()), position],
                );
                continue;
            };
            let changes = diff_properties(&old.properties, &spec.properties);
            if !changes.is_empty() {
                self.push(
                    StyleOp::UpdateLayerProperties {
                        id: spec.id.clone(),
                        changes: changes.clone(),
                    },
                    placed,
                    None,
                    vec![Commit::Patch(identity.clone(), changes)],
                );
            }
            if !fixed.contains(spec.id.as_str()) {
                self.push(
                    StyleOp::MoveLayer {
                        id: spec.id.clone(),
                        slot: spec.slot.clone(),
                        before,
                    },
                    placed,
                    None,
                    vec![position],
                );
            }
        }
    }

    fn plan_globals(&mut self) {
        for (identity, placed) in self.desired_of(NodeIdentity::is_singleton) {
            let unchanged = !(matches!(identity, NodeIdentity::Terrain) && self.terrain_cleared)
                && self
                    .kept(identity)
                    .is_some_and(|old| old.node == placed.node);
            if unchanged {
                continue;
            }
            let (op, requires) = match &placed.node {
                StyleNode::Terrain(spec) => {
                    (StyleOp::SetTerrain(Some(spec.clone())), Some(spec.source.clone()))
                }
                StyleNode::Atmosphere(spec) => (StyleOp::SetAtmosphere(Some(spec.clone())), None),
                StyleNode::Projection(spec) => (StyleOp::SetProjection(Some(spec.clone())), None),
                StyleNode::Effect(spec) => (
                    StyleOp::SetEffect {
                        kind: spec.kind,
                        spec: Some(spec.clone()),
                    },
                    None,
                ),
                _ => continue,
            };
            self.push(
                op,
                placed,
                requires,
                vec![Commit::Place(identity.clone(), placed.clone())],
            );
        }
    }

    fn plan_refresh(&mut self) {
        for &(identity, placed) in &self.desired {
            if let Some(old) = self.kept(identity) {
                if !old.same_keys(placed) {
                    self.out
                        .refresh
                        .push(Commit::Rekey(identity.clone(), placed.clone()));
                }
            }
        }
    }
}

fn layer_needs_replace(old: &LayerSpec, new: &LayerSpec) -> bool {
    old.layer_type != new.layer_type
        || old.source != new.source
        || old.source_layer != new.source_layer
        || old.slot != new.slot
}

/// Split a source update into a GeoJSON data replacement and a property patch.
fn source_changes(old: &SourceSpec, new: &SourceSpec) -> (Option<Value>, Properties) {
    if new.kind != SourceKind::GeoJson {
        return (None, diff_properties(&old.properties, &new.properties));
    }
    let old_data = old.properties.get(SourceSpec::DATA).unwrap_or(&Value::Null);
    let new_data = new.properties.get(SourceSpec::DATA).unwrap_or(&Value::Null);
    let data = (old_data != new_data).then(|| new_data.clone());

    let without_data = |props: &Properties| -> Properties {
        props
            .iter()
            .filter(|(key, _)| key.as_str() != SourceSpec::DATA)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    };
    let changes = diff_properties(&without_data(&old.properties), &without_data(&new.properties));
    (data, changes)
}

/// Mark the members of one longest strictly increasing subsequence.
fn longest_increasing(seq: &[usize]) -> Vec<bool> {
    let mut tails: Vec<usize> = Vec::new();
    let mut back: Vec<Option<usize>> = vec![None; seq.len()];
    for (i, value) in seq.iter().enumerate() {
        let at = tails.partition_point(|&t| seq[t] < *value);
        if at > 0 {
            back[i] = Some(tails[at - 1]);
        }
        if at == tails.len() {
            tails.push(i);
        } else {
            tails[at] = i;
        }
    }
    let mut keep = vec![false; seq.len()];
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        keep[i] = true;
        cursor = back[i];
    }
    keep
}
