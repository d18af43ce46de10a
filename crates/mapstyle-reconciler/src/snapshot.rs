// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identity-indexed view of a flattened tree.
//!
//! A [`StyleSnapshot`] groups flat entries by backend identity and indexes
//! them by [`StableKey`]. Images and models may be declared by several keys
//! as long as every declaration is equal; everything else must be declared
//! exactly once.

use std::collections::{BTreeMap, HashMap};

use crate::content::StyleNode;
use crate::error::ReconcileError;
use crate::flatten::FlatEntry;
use crate::key::{NodeIdentity, StableKey};

/// One backend object together with the keys that declare it.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedNode {
    /// First declaring key.
    pub key: StableKey,
    /// Further declaring keys (shared images and models only).
    pub aliases: Vec<StableKey>,
    /// Declaration order of the first key.
    pub order: usize,
    /// The declared content.
    pub node: StyleNode,
}

impl PlacedNode {
    /// A node declared once.
    pub const fn new(key: StableKey, order: usize, node: StyleNode) -> Self {
        Self {
            key,
            aliases: Vec::new(),
            order,
            node,
        }
    }

    /// Every declaring key, first one first.
    pub fn keys(&self) -> impl Iterator<Item = &StableKey> {
        core::iter::once(&self.key).chain(&self.aliases)
    }

    /// Number of declarations.
    pub fn refcount(&self) -> usize {
        1 + self.aliases.len()
    }

    pub(crate) fn same_keys(&self, other: &Self) -> bool {
        self.key == other.key && self.aliases == other.aliases && self.order == other.order
    }
}

/// Backend objects of one tree, by identity and by key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyleSnapshot {
    nodes: BTreeMap<NodeIdentity, PlacedNode>,
    index: HashMap<StableKey, NodeIdentity>,
}

impl StyleSnapshot {
    /// Empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Group flat entries by identity.
    ///
    /// # Errors
    ///
    /// [`ReconcileError::DuplicateKey`] when two entries declare the same
    /// identity, unless both declare an equal image or model.
    pub fn from_entries(
        entries: impl IntoIterator<Item = FlatEntry>,
    ) -> Result<Self, ReconcileError> {
        let mut snapshot = Self::new();
        for FlatEntry { key, node, order } in entries {
            let identity = node.identity();
            if snapshot.index.contains_key(&key) {
                return Err(ReconcileError::DuplicateKey { key });
            }
            match snapshot.nodes.get_mut(&identity) {
                Some(existing) if is_shared(&identity) && existing.node == node => {
                    existing.aliases.push(key.clone());
                }
                Some(_) => return Err(ReconcileError::DuplicateKey { key }),
                None => {
                    snapshot
                        .nodes
                        .insert(identity.clone(), PlacedNode::new(key.clone(), order, node));
                }
            }
            snapshot.index.insert(key, identity);
        }
        Ok(snapshot)
    }

    /// Number of backend objects.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the snapshot holds nothing.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node by identity.
    pub fn get(&self, identity: &NodeIdentity) -> Option<&PlacedNode> {
        self.nodes.get(identity)
    }

    /// Node declared by `key`.
    pub fn get_by_key(&self, key: &StableKey) -> Option<(&NodeIdentity, &PlacedNode)> {
        let identity = self.index.get(key)?;
        self.nodes.get_key_value(identity)
    }

    /// Whether some node is declared by `key`.
    pub fn contains_key(&self, key: &StableKey) -> bool {
        self.index.contains_key(key)
    }

    /// Whether source `id` is present.
    pub fn has_source(&self, id: &str) -> bool {
        self.nodes.contains_key(&NodeIdentity::Source(id.to_string()))
    }

    /// Nodes in identity order.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeIdentity, &PlacedNode)> {
        self.nodes.iter()
    }

    /// Nodes in declaration order.
    pub fn ordered(&self) -> Vec<(&NodeIdentity, &PlacedNode)> {
        let mut nodes: Vec<_> = self.nodes.iter().collect();
        nodes.sort_by_key(|(_, placed)| placed.order);
        nodes
    }

    /// Every declaring key.
    pub fn keys(&self) -> impl Iterator<Item = &StableKey> {
        self.index.keys()
    }

    pub(crate) fn insert(&mut self, identity: NodeIdentity, placed: PlacedNode) {
        self.unindex(&identity);
        for key in placed.keys() {
            self.index.insert(key.clone(), identity.clone());
        }
        self.nodes.insert(identity, placed);
    }

    pub(crate) fn remove(&mut self, identity: &NodeIdentity) -> Option<PlacedNode> {
        self.unindex(identity);
        self.nodes.remove(identity)
    }

    pub(crate) fn get_mut(&mut self, identity: &NodeIdentity) -> Option<&mut PlacedNode> {
        self.nodes.get_mut(identity)
    }

    /// Replace the keys and order of `identity` with those of `placed`.
    pub(crate) fn rekey(&mut self, identity: &NodeIdentity, placed: &PlacedNode) {
        let Some(current) = self.nodes.get(identity) else {
            return;
        };
        if current.same_keys(placed) {
            return;
        }
        let node = current.node.clone();
        self.insert(
            identity.clone(),
            PlacedNode {
                key: placed.key.clone(),
                aliases: placed.aliases.clone(),
                order: placed.order,
                node,
            },
        );
    }

    fn unindex(&mut self, identity: &NodeIdentity) {
        if let Some(old) = self.nodes.get(identity) {
            for key in old.keys() {
                if self.index.get(key) == Some(identity) {
                    self.index.remove(key);
                }
            }
        }
    }
}

/// Images and models may be declared by several keys.
const fn is_shared(identity: &NodeIdentity) -> bool {
    matches!(identity, NodeIdentity::Image(_) | NodeIdentity::Model(_))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::key::KeySegment;
    use mapstyle_port::{ImageSpec, LayerSpec, LayerType};

    fn entry(prefix: &str, node: impl Into<StyleNode>, order: usize) -> FlatEntry {
        let node = node.into();
        let key = StableKey::root()
            .child(KeySegment::Id(prefix.into()))
            .child(KeySegment::Node(node.identity()));
        FlatEntry { key, node, order }
    }

    #[test]
    fn equal_images_share_one_node() {
        let pin = ImageSpec::new("pin", 1, 1, vec![1, 2, 3, 4]);
        let snapshot = StyleSnapshot::from_entries(vec![
            entry("a", pin.clone(), 0),
            entry("b", pin, 1),
        ])
        .unwrap();
        assert_eq!(snapshot.len(), 1);
        let placed = snapshot.get(&NodeIdentity::Image("pin".into())).unwrap();
        assert_eq!(placed.refcount(), 2);
        assert_eq!(snapshot.keys().count(), 2);
    }

    #[test]
    fn differing_images_under_one_id_are_rejected() {
        let pin = ImageSpec::new("pin", 1, 1, vec![1, 2, 3, 4]);
        let err = StyleSnapshot::from_entries(vec![
            entry("a", pin.clone(), 0),
            entry("b", pin.sdf(true), 1),
        ])
        .unwrap_err();
        assert!(matches!(err, ReconcileError::DuplicateKey { .. }));
    }

    #[test]
    fn layers_may_not_share_an_id() {
        let layer = LayerSpec::new("roads", LayerType::Line);
        let err = StyleSnapshot::from_entries(vec![
            entry("a", layer.clone(), 0),
            entry("b", layer, 1),
        ])
        .unwrap_err();
        assert_eq!(err.key().to_string(), "/b/layer:roads");
    }

    #[test]
    fn remove_drops_key_index() {
        let mut snapshot = StyleSnapshot::from_entries(vec![entry(
            "a",
            LayerSpec::new("roads", LayerType::Line),
            0,
        )])
        .unwrap();
        let key = snapshot.keys().next().cloned().unwrap();
        assert!(snapshot.contains_key(&key));
        snapshot.remove(&NodeIdentity::Layer("roads".into()));
        assert!(!snapshot.contains_key(&key));
        assert!(snapshot.is_empty());
    }

    #[test]
    fn rekey_moves_index_but_keeps_content() {
        let layer = LayerSpec::new("roads", LayerType::Line);
        let mut snapshot =
            StyleSnapshot::from_entries(vec![entry("a", layer.clone(), 0)]).unwrap();
        let moved = entry("b", layer, 3);
        let identity = moved.node.identity();
        let target = PlacedNode::new(moved.key.clone(), moved.order, moved.node);
        snapshot.rekey(&identity, &target);
        let (_, placed) = snapshot.get_by_key(&moved.key).unwrap();
        assert_eq!(placed.order, 3);
        assert_eq!(snapshot.keys().count(), 1);
    }
}
