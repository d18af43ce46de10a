// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! What the backend is known to hold.

use std::collections::BTreeMap;

use mapstyle_port::{apply_patch, Properties, Slot};

use crate::content::StyleNode;
use crate::key::{NodeIdentity, StableKey};
use crate::snapshot::{PlacedNode, StyleSnapshot};

/// State change recorded once the operation carrying it succeeds.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Commit {
    /// The node now exists with exactly this content.
    Place(NodeIdentity, PlacedNode),
    /// The node no longer exists.
    Drop(NodeIdentity),
    /// Node properties changed by this patch.
    Patch(NodeIdentity, Properties),
    /// A layer now sits below `before` in `slot`, or on top of it.
    Position {
        layer: String,
        slot: Option<Slot>,
        before: Option<String>,
    },
    /// The node is declared by other keys now.
    Rekey(NodeIdentity, PlacedNode),
}

/// The reconciler's memory of the last successful operations.
///
/// Every entry reflects a backend call that succeeded, so the state never
/// runs ahead of the backend.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppliedState {
    nodes: StyleSnapshot,
    layer_order: BTreeMap<Option<Slot>, Vec<String>>,
}

impl AppliedState {
    /// Nothing applied.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing is applied.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of applied backend objects.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether a node declared by `key` is applied.
    pub fn contains_key(&self, key: &StableKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Applied content declared by `key`.
    pub fn node(&self, key: &StableKey) -> Option<&StyleNode> {
        self.nodes.get_by_key(key).map(|(_, placed)| &placed.node)
    }

    /// Applied node by identity.
    pub fn get(&self, identity: &NodeIdentity) -> Option<&PlacedNode> {
        self.nodes.get(identity)
    }

    /// Whether source `id` was added by the reconciler.
    pub fn has_source(&self, id: &str) -> bool {
        self.nodes.has_source(id)
    }

    /// Managed layer ids of `slot`, bottom to top.
    pub fn layers_in(&self, slot: Option<&Slot>) -> &[String] {
        self.layer_order
            .get(&slot.cloned())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Slots holding at least one managed layer.
    pub fn slots(&self) -> impl Iterator<Item = Option<&Slot>> {
        self.layer_order.keys().map(Option::as_ref)
    }

    /// Applied nodes in declaration order.
    pub fn entries(&self) -> Vec<(&NodeIdentity, &PlacedNode)> {
        self.nodes.ordered()
    }

    /// Number of keys declaring image `id`, zero if it is not applied.
    pub fn image_refcount(&self, id: &str) -> usize {
        self.nodes
            .get(&NodeIdentity::Image(id.to_string()))
            .map_or(0, PlacedNode::refcount)
    }

    /// Forget everything. Issues no backend calls.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub(crate) const fn snapshot(&self) -> &StyleSnapshot {
        &self.nodes
    }

    pub(crate) fn commit(&mut self, commit: &Commit) {
        match commit {
            Commit::Place(identity, placed) => {
                self.nodes.insert(identity.clone(), placed.clone());
            }
            Commit::Drop(identity) => {
                self.nodes.remove(identity);
                if let NodeIdentity::Layer(id) = identity {
                    self.unposition(id);
                }
            }
            Commit::Patch(identity, changes) => {
                if let Some(placed) = self.nodes.get_mut(identity) {
                    match &mut placed.node {
                        StyleNode::Source(spec) => apply_patch(&mut spec.properties, changes),
                        StyleNode::Layer(spec) => apply_patch(&mut spec.properties, changes),
                        _ => {}
                    }
                }
            }
            Commit::Position {
                layer,
                slot,
                before,
            } => {
                self.unposition(layer);
                let ids = self.layer_order.entry(slot.clone()).or_default();
                let at = before
                    .as_ref()
                    .and_then(|anchor| ids.iter().position(|id| id == anchor))
                    .unwrap_or(ids.len());
                ids.insert(at, layer.clone());
            }
            Commit::Rekey(identity, placed) => self.nodes.rekey(identity, placed),
        }
    }

    fn unposition(&mut self, layer: &str) {
        for ids in self.layer_order.values_mut() {
            ids.retain(|id| id != layer);
        }
        self.layer_order.retain(|_, ids| !ids.is_empty());
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use mapstyle_port::{LayerSpec, LayerType};
    use serde_json::json;

    fn place_layer(state: &mut AppliedState, id: &str, order: usize, before: Option<&str>) {
        let node = StyleNode::Layer(LayerSpec::new(id, LayerType::Line));
        let identity = node.identity();
        state.commit(&Commit::Place(
            identity.clone(),
            PlacedNode::new(StableKey::from(identity), order, node),
        ));
        state.commit(&Commit::Position {
            layer: id.into(),
            slot: None,
            before: before.map(str::to_string),
        });
    }

    #[test]
    fn positions_follow_anchors() {
        let mut state = AppliedState::new();
        place_layer(&mut state, "c", 2, None);
        place_layer(&mut state, "a", 0, Some("c"));
        place_layer(&mut state, "b", 1, Some("c"));
        assert_eq!(state.layers_in(None), ["a", "b", "c"]);
    }

    #[test]
    fn drop_removes_layer_position() {
        let mut state = AppliedState::new();
        place_layer(&mut state, "a", 0, None);
        state.commit(&Commit::Drop(NodeIdentity::Layer("a".into())));
        assert!(state.is_empty());
        assert!(state.layers_in(None).is_empty());
        assert_eq!(state.slots().count(), 0);
    }

    #[test]
    fn patch_updates_properties() {
        let mut state = AppliedState::new();
        place_layer(&mut state, "a", 0, None);
        let identity = NodeIdentity::Layer("a".into());
        let mut changes = Properties::new();
        changes.insert("line-color".into(), json!("red"));
        state.commit(&Commit::Patch(identity.clone(), changes));
        assert!(matches!(
            state.get(&identity).map(|p| &p.node),
            Some(StyleNode::Layer(spec)) if spec.properties.get("line-color") == Some(&json!("red"))
        ));
    }
}
