// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Stable keys and backend identities.
//!
//! A [`StableKey`] names one content node across rebuilds. It is the path of
//! [`KeySegment`]s chosen at each level of composite expansion:
//!
//! - a leaf node contributes its [`NodeIdentity`] (`layer:roads`),
//! - a composite with an explicit id contributes that id,
//! - a collection-generated child contributes its data key (`[42]`),
//! - anything else contributes its position in the parent (`#3`).
//!
//! Keys are totally ordered and hashable so they can index maps and sort
//! diagnostics deterministically.

use core::fmt;

use mapstyle_port::EffectKind;

/// What the backend knows a node as.
///
/// Sources, layers, images and models are keyed collections; the rest are
/// global singletons.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeIdentity {
    /// A source by id.
    Source(String),
    /// A layer by id.
    Layer(String),
    /// A style image by id.
    Image(String),
    /// A 3D model by id.
    Model(String),
    /// The global terrain.
    Terrain,
    /// The global atmosphere.
    Atmosphere,
    /// The projection.
    Projection,
    /// One global weather effect.
    Effect(EffectKind),
}

impl NodeIdentity {
    /// Whether the backend models this node as one global object.
    pub const fn is_singleton(&self) -> bool {
        matches!(
            self,
            Self::Terrain | Self::Atmosphere | Self::Projection | Self::Effect(_)
        )
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source(id) => write!(f, "source:{id}"),
            Self::Layer(id) => write!(f, "layer:{id}"),
            Self::Image(id) => write!(f, "image:{id}"),
            Self::Model(id) => write!(f, "model:{id}"),
            Self::Terrain => f.write_str("terrain"),
            Self::Atmosphere => f.write_str("atmosphere"),
            Self::Projection => f.write_str("projection"),
            Self::Effect(EffectKind::Snow) => f.write_str("effect:snow"),
            Self::Effect(EffectKind::Rain) => f.write_str("effect:rain"),
        }
    }
}

/// One level of a [`StableKey`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeySegment {
    /// Leaf node, identified by what it declares.
    Node(NodeIdentity),
    /// Composite with an explicit id.
    Id(String),
    /// Collection-generated child, identified by its data key.
    Data(String),
    /// Position within the parent expansion.
    Index(usize),
}

impl fmt::Display for KeySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(identity) => identity.fmt(f),
            Self::Id(id) => f.write_str(id),
            Self::Data(key) => write!(f, "[{key}]"),
            Self::Index(index) => write!(f, "#{index}"),
        }
    }
}

/// Path-qualified identity of a content node.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StableKey(Vec<KeySegment>);

impl StableKey {
    /// The empty key of the tree root.
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a key from explicit segments.
    pub fn from_segments(segments: impl IntoIterator<Item = KeySegment>) -> Self {
        Self(segments.into_iter().collect())
    }

    /// This key extended by one segment.
    #[must_use]
    pub fn child(&self, segment: KeySegment) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.extend_from_slice(&self.0);
        segments.push(segment);
        Self(segments)
    }

    /// The segments from root to leaf.
    pub fn segments(&self) -> &[KeySegment] {
        &self.0
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Backend identity of the leaf this key names, if it names a leaf.
    pub fn identity(&self) -> Option<&NodeIdentity> {
        match self.0.last() {
            Some(KeySegment::Node(identity)) => Some(identity),
            _ => None,
        }
    }
}

impl fmt::Display for StableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.0 {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl From<NodeIdentity> for StableKey {
    fn from(identity: NodeIdentity) -> Self {
        Self(vec![KeySegment::Node(identity)])
    }
}
