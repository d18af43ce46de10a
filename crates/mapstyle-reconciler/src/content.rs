// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Declarative style content.
//!
//! A map's desired style is a tree of [`ContentNode`]s. Leaves are
//! [`StyleNode`]s, which map one-to-one onto backend objects. Interior nodes
//! are [`Composite`]s, which are never applied themselves but expand into
//! further content when the tree is flattened.
//!
//! Conditionals, optionals and collections are all composites:
//!
//! ```
//! use mapstyle_port::{LayerSpec, LayerType, SourceKind, SourceSpec};
//! use mapstyle_reconciler::ContentNode;
//! use serde_json::json;
//!
//! let routes = vec![("r1", json!([])), ("r2", json!([]))];
//! let show_labels = false;
//!
//! let tree = ContentNode::group(vec![
//!     SourceSpec::new("streets", SourceKind::Vector).into(),
//!     ContentNode::for_each(routes, |(id, _)| *id, |(id, data)| {
//!         ContentNode::group(vec![
//!             SourceSpec::geojson(id, data).into(),
//!             LayerSpec::new(format!("{id}-line"), LayerType::Line).source(id).into(),
//!         ])
//!     }),
//!     ContentNode::when(show_labels, || {
//!         LayerSpec::new("labels", LayerType::Symbol).source("streets").into()
//!     }),
//! ]);
//! # let _ = tree;
//! ```

use core::fmt;

use mapstyle_port::{
    AtmosphereSpec, EffectSpec, ImageSpec, LayerSpec, ModelSpec, ProjectionSpec, SourceSpec,
    TerrainSpec,
};

use crate::key::NodeIdentity;

/// A leaf of the content tree: one backend object.
#[derive(Clone, Debug, PartialEq)]
pub enum StyleNode {
    /// A data source.
    Source(SourceSpec),
    /// A drawing layer.
    Layer(LayerSpec),
    /// A style image.
    Image(ImageSpec),
    /// A 3D model.
    Model(ModelSpec),
    /// Global terrain.
    Terrain(TerrainSpec),
    /// Global atmosphere.
    Atmosphere(AtmosphereSpec),
    /// Projection.
    Projection(ProjectionSpec),
    /// A global weather effect.
    Effect(EffectSpec),
}

impl StyleNode {
    /// Backend identity of this node.
    pub fn identity(&self) -> NodeIdentity {
        match self {
            Self::Source(spec) => NodeIdentity::Source(spec.id.clone()),
            Self::Layer(spec) => NodeIdentity::Layer(spec.id.clone()),
            Self::Image(spec) => NodeIdentity::Image(spec.id.clone()),
            Self::Model(spec) => NodeIdentity::Model(spec.id.clone()),
            Self::Terrain(_) => NodeIdentity::Terrain,
            Self::Atmosphere(_) => NodeIdentity::Atmosphere,
            Self::Projection(_) => NodeIdentity::Projection,
            Self::Effect(spec) => NodeIdentity::Effect(spec.kind),
        }
    }

    /// Source this node cannot exist without, if any.
    pub fn required_source(&self) -> Option<&str> {
        match self {
            Self::Layer(spec) => spec.source.as_deref(),
            Self::Terrain(spec) => Some(&spec.source),
            _ => None,
        }
    }
}

/// A child produced by a composite, optionally tagged with a data key.
#[derive(Debug)]
pub struct Child {
    /// Data-derived key for collection-generated children.
    pub key: Option<String>,
    /// The child content.
    pub node: ContentNode,
}

impl Child {
    /// A positional child.
    pub fn positional(node: impl Into<ContentNode>) -> Self {
        Self {
            key: None,
            node: node.into(),
        }
    }

    /// A child identified by a data key.
    pub fn keyed(key: impl Into<String>, node: impl Into<ContentNode>) -> Self {
        Self {
            key: Some(key.into()),
            node: node.into(),
        }
    }
}

type Producer = Box<dyn Fn() -> Vec<Child> + Send + Sync>;

enum Body {
    Static(Vec<Child>),
    Deferred(Producer),
}

/// Interior node that expands into further content at flatten time.
pub struct Composite {
    id: Option<String>,
    body: Body,
}

impl Composite {
    /// Explicit id, if one was declared.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Declare an explicit id, which replaces the positional key segment.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Expand one level. Deferred producers run once per call.
    pub fn expand(&self) -> Expansion<'_> {
        match &self.body {
            Body::Static(children) => Expansion::Borrowed(children),
            Body::Deferred(producer) => Expansion::Owned(producer()),
        }
    }
}

/// Children of one composite expansion.
#[derive(Debug)]
pub enum Expansion<'a> {
    /// Children stored in the tree.
    Borrowed(&'a [Child]),
    /// Children produced for this expansion only.
    Owned(Vec<Child>),
}

impl core::ops::Deref for Expansion<'_> {
    type Target = [Child];

    fn deref(&self) -> &[Child] {
        match self {
            Self::Borrowed(children) => children,
            Self::Owned(children) => children,
        }
    }
}

impl fmt::Debug for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Composite");
        s.field("id", &self.id);
        match &self.body {
            Body::Static(children) => s.field("children", children),
            Body::Deferred(_) => s.field("children", &"<deferred>"),
        };
        s.finish()
    }
}

/// A node of the declarative content tree.
#[derive(Debug)]
pub enum ContentNode {
    /// Applied to the backend.
    Node(StyleNode),
    /// Expanded into children.
    Composite(Composite),
}

impl ContentNode {
    /// A composite with no children.
    pub fn empty() -> Self {
        Self::from_children(Vec::new())
    }

    /// Children in declaration order, keyed by position.
    pub fn group(children: Vec<ContentNode>) -> Self {
        Self::from_children(children.into_iter().map(Child::positional).collect())
    }

    /// Children with explicit data keys.
    pub fn keyed(children: Vec<Child>) -> Self {
        Self::from_children(children)
    }

    /// A group with an explicit id.
    pub fn scope(id: impl Into<String>, children: Vec<ContentNode>) -> Self {
        match Self::group(children) {
            Self::Composite(composite) => Self::Composite(composite.with_id(id)),
            node @ Self::Node(_) => node,
        }
    }

    /// Children produced on demand each time the tree is flattened.
    ///
    /// The producer is `Send + Sync`, so a tree can be built on one thread
    /// and reconciled on another.
    pub fn deferred(producer: impl Fn() -> Vec<Child> + Send + Sync + 'static) -> Self {
        Self::Composite(Composite {
            id: None,
            body: Body::Deferred(Box::new(producer)),
        })
    }

    /// `content` when `condition` holds, nothing otherwise.
    ///
    /// The composite occupies its position either way, so later siblings keep
    /// their keys when the condition flips.
    pub fn when(condition: bool, content: impl FnOnce() -> ContentNode) -> Self {
        if condition {
            Self::group(vec![content()])
        } else {
            Self::empty()
        }
    }

    /// One of two branches. The branches get distinct keys, so switching
    /// replaces the content of one branch with the other.
    pub fn either(
        condition: bool,
        then: impl FnOnce() -> ContentNode,
        otherwise: impl FnOnce() -> ContentNode,
    ) -> Self {
        if condition {
            Self::keyed(vec![Child::keyed("then", then())])
        } else {
            Self::keyed(vec![Child::keyed("else", otherwise())])
        }
    }

    /// `content(value)` when `value` is present, nothing otherwise.
    pub fn optional<T>(value: Option<T>, content: impl FnOnce(T) -> ContentNode) -> Self {
        Self::when_some(value.map(content))
    }

    /// One child per item, keyed by `key(&item)`, in iteration order.
    pub fn for_each<I, K>(
        items: I,
        key: impl Fn(&I::Item) -> K,
        content: impl Fn(I::Item) -> ContentNode,
    ) -> Self
    where
        I: IntoIterator,
        K: ToString,
    {
        Self::from_children(
            items
                .into_iter()
                .map(|item| Child::keyed(key(&item).to_string(), content(item)))
                .collect(),
        )
    }

    fn when_some(node: Option<ContentNode>) -> Self {
        node.map_or_else(Self::empty, |node| Self::group(vec![node]))
    }

    fn from_children(children: Vec<Child>) -> Self {
        Self::Composite(Composite {
            id: None,
            body: Body::Static(children),
        })
    }
}

impl From<StyleNode> for ContentNode {
    fn from(node: StyleNode) -> Self {
        Self::Node(node)
    }
}

impl From<Composite> for ContentNode {
    fn from(composite: Composite) -> Self {
        Self::Composite(composite)
    }
}

macro_rules! leaf_from {
    ($($spec:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$spec> for StyleNode {
                fn from(spec: $spec) -> Self {
                    Self::$variant(spec)
                }
            }

            impl From<$spec> for ContentNode {
                fn from(spec: $spec) -> Self {
                    Self::Node(StyleNode::$variant(spec))
                }
            }
        )*
    };
}

leaf_from! {
    SourceSpec => Source,
    LayerSpec => Layer,
    ImageSpec => Image,
    ModelSpec => Model,
    TerrainSpec => Terrain,
    AtmosphereSpec => Atmosphere,
    ProjectionSpec => Projection,
    EffectSpec => Effect,
}
