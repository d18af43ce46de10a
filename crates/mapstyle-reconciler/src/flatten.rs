// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Tree flattening.
//!
//! [`flatten`] walks a content tree depth-first and emits one [`FlatEntry`] per
//! leaf, in declaration order. Composites are expanded exactly once per call
//! and never appear in the output. The walk has no side effects beyond running
//! deferred producers.

use std::collections::HashSet;

use crate::content::{Child, ContentNode, StyleNode};
use crate::error::ReconcileError;
use crate::key::{KeySegment, StableKey};

/// One leaf of a flattened tree.
#[derive(Clone, Debug, PartialEq)]
pub struct FlatEntry {
    /// Path-qualified key of the leaf.
    pub key: StableKey,
    /// The leaf itself.
    pub node: StyleNode,
    /// Position in the flattened sequence.
    pub order: usize,
}

/// Flatten `tree` into its ordered leaves.
///
/// # Errors
///
/// Returns [`ReconcileError::DuplicateKey`] when two leaves resolve to the
/// same [`StableKey`].
pub fn flatten(tree: &ContentNode) -> Result<Vec<FlatEntry>, ReconcileError> {
    let mut walker = Walker::default();
    match tree {
        ContentNode::Node(node) => {
            walker.emit(StableKey::from(node.identity()), node)?;
        }
        ContentNode::Composite(composite) => {
            walker.expand(&StableKey::root(), &composite.expand())?;
        }
    }
    Ok(walker.entries)
}

#[derive(Default)]
struct Walker {
    entries: Vec<FlatEntry>,
    seen: HashSet<StableKey>,
}

impl Walker {
    fn expand(&mut self, parent: &StableKey, children: &[Child]) -> Result<(), ReconcileError> {
        for (index, child) in children.iter().enumerate() {
            let key = parent.child(segment_for(index, child));
            match &child.node {
                ContentNode::Node(node) => self.emit(key, node)?,
                ContentNode::Composite(composite) => {
                    self.expand(&key, &composite.expand())?;
                }
            }
        }
        Ok(())
    }

    fn emit(&mut self, key: StableKey, node: &StyleNode) -> Result<(), ReconcileError> {
        if !self.seen.insert(key.clone()) {
            return Err(ReconcileError::DuplicateKey { key });
        }
        self.entries.push(FlatEntry {
            key,
            node: node.clone(),
            order: self.entries.len(),
        });
        Ok(())
    }
}

fn segment_for(index: usize, child: &Child) -> KeySegment {
    match (&child.node, &child.key) {
        (ContentNode::Node(node), _) => KeySegment::Node(node.identity()),
        (ContentNode::Composite(composite), key) => match (composite.id(), key) {
            (Some(id), _) => KeySegment::Id(id.to_string()),
            (None, Some(key)) => KeySegment::Data(key.clone()),
            (None, None) => KeySegment::Index(index),
        },
    }
}
