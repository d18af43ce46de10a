// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Mock style backend for headless reconciler tests.
//!
//! `MockStyleBackend` keeps a live model of the style in ordinary collections
//! and validates every call the way a real map SDK would: ids must be unique,
//! layers need their source, sources in use cannot be removed. Every call is
//! recorded as a [`StyleOp`], including the ones that fail.

use std::collections::{BTreeMap, BTreeSet};

use mapstyle_port::{
    apply_patch, AtmosphereSpec, BackendError, EffectKind, EffectSpec, ImageSpec, LayerSpec,
    ModelSpec, ProjectionSpec, Properties, Slot, SourceSpec, StyleBackend, StyleOp, TerrainSpec,
};
use serde_json::Value;

/// A call pattern the mock should reject.
#[derive(Clone, Debug, PartialEq, Eq)]
struct FailRule {
    op: String,
    target: Option<String>,
}

impl FailRule {
    fn matches(&self, op: &StyleOp) -> bool {
        self.op == op.name()
            && self
                .target
                .as_deref()
                .is_none_or(|target| op.target() == Some(target))
    }
}

/// Mock style backend for testing.
#[derive(Debug, Default)]
pub struct MockStyleBackend {
    /// Sources added through the port.
    pub sources: BTreeMap<String, SourceSpec>,
    /// Layers added through the port.
    pub layers: BTreeMap<String, LayerSpec>,
    /// Registered images.
    pub images: BTreeMap<String, ImageSpec>,
    /// Registered models.
    pub models: BTreeMap<String, ModelSpec>,
    /// Current terrain.
    pub terrain: Option<TerrainSpec>,
    /// Current atmosphere.
    pub atmosphere: Option<AtmosphereSpec>,
    /// Current projection.
    pub projection: Option<ProjectionSpec>,
    /// Active weather effects.
    pub effects: BTreeMap<EffectKind, EffectSpec>,
    stacks: BTreeMap<Option<Slot>, Vec<String>>,
    base_sources: BTreeSet<String>,
    calls: Vec<StyleOp>,
    failures: Vec<FailRule>,
    unavailable: bool,
}

impl MockStyleBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend the base style provides source `id`.
    #[must_use]
    pub fn with_base_source(mut self, id: impl Into<String>) -> Self {
        self.base_sources.insert(id.into());
        self
    }

    /// Reject every `op` call (by [`StyleOp::name`]), optionally only for one target id.
    pub fn fail_on(&mut self, op: &str, target: Option<&str>) {
        self.failures.push(FailRule {
            op: op.to_string(),
            target: target.map(str::to_string),
        });
    }

    /// Stop rejecting calls.
    pub fn clear_failures(&mut self) {
        self.failures.clear();
    }

    /// Reject every call with [`BackendError::Unavailable`].
    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    /// Drop all style state, as a base style swap does. Calls are kept.
    pub fn discard_style(&mut self) {
        self.sources.clear();
        self.layers.clear();
        self.images.clear();
        self.models.clear();
        self.terrain = None;
        self.atmosphere = None;
        self.projection = None;
        self.effects.clear();
        self.stacks.clear();
    }

    /// Every call received, in order.
    pub fn calls(&self) -> &[StyleOp] {
        &self.calls
    }

    /// Calls rendered as `name(target)`, in order.
    pub fn call_names(&self) -> Vec<String> {
        self.calls.iter().map(ToString::to_string).collect()
    }

    /// Take the recorded calls, leaving none.
    pub fn take_calls(&mut self) -> Vec<StyleOp> {
        core::mem::take(&mut self.calls)
    }

    /// Layer ids of `slot`, bottom to top.
    pub fn layer_stack(&self, slot: Option<&Slot>) -> Vec<&str> {
        self.stacks
            .get(&slot.cloned())
            .map(|ids| ids.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Number of sources added through the port.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Number of layers added through the port.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Whether nothing added through the port remains.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
            && self.layers.is_empty()
            && self.images.is_empty()
            && self.models.is_empty()
            && self.terrain.is_none()
            && self.atmosphere.is_none()
            && self.projection.is_none()
            && self.effects.is_empty()
    }

    fn knows_source(&self, id: &str) -> bool {
        self.sources.contains_key(id) || self.base_sources.contains(id)
    }

    fn handle(&mut self, op: StyleOp) -> Result<(), BackendError> {
        let outcome = if self.unavailable {
            Err(BackendError::Unavailable)
        } else if self.failures.iter().any(|rule| rule.matches(&op)) {
            Err(BackendError::Rejected(format!("injected failure: {op}")))
        } else {
            self.apply(&op)
        };
        self.calls.push(op);
        outcome
    }

    fn apply(&mut self, op: &StyleOp) -> Result<(), BackendError> {
        match op {
            StyleOp::AddSource(spec) => {
                if self.knows_source(&spec.id) {
                    return Err(rejected("source", &spec.id, "already exists"));
                }
                self.sources.insert(spec.id.clone(), spec.clone());
            }
            StyleOp::UpdateSource { id, changes } => {
                let spec = self.sources.get_mut(id).ok_or_else(|| not_found("source", id))?;
                apply_patch(&mut spec.properties, changes);
            }
            StyleOp::UpdateGeoJsonData { id, data } => {
                let spec = self.sources.get_mut(id).ok_or_else(|| not_found("source", id))?;
                spec.properties
                    .insert(SourceSpec::DATA.to_string(), data.clone());
            }
            StyleOp::RemoveSource { id } => {
                if !self.sources.contains_key(id) {
                    return Err(not_found("source", id));
                }
                let used_by_layer = self
                    .layers
                    .values()
                    .any(|layer| layer.source.as_deref() == Some(id.as_str()));
                let used_by_terrain = self.terrain.as_ref().is_some_and(|t| &t.source == id);
                if used_by_layer || used_by_terrain {
                    return Err(rejected("source", id, "still in use"));
                }
                self.sources.remove(id);
            }
            StyleOp::AddLayer { spec, before } => {
                if self.layers.contains_key(&spec.id) {
                    return Err(rejected("layer", &spec.id, "already exists"));
                }
                if let Some(source) = &spec.source {
                    if !self.knows_source(source) {
                        return Err(not_found("source", source));
                    }
                }
                self.place(&spec.id, spec.slot.as_ref(), before.as_deref())?;
                self.layers.insert(spec.id.clone(), spec.clone());
            }
            StyleOp::UpdateLayerProperties { id, changes } => {
                let spec = self.layers.get_mut(id).ok_or_else(|| not_found("layer", id))?;
                apply_patch(&mut spec.properties, changes);
            }
            StyleOp::MoveLayer { id, slot, before } => {
                if !self.layers.contains_key(id) {
                    return Err(not_found("layer", id));
                }
                self.place(id, slot.as_ref(), before.as_deref())?;
            }
            StyleOp::RemoveLayer { id } => {
                self.layers.remove(id).ok_or_else(|| not_found("layer", id))?;
                self.unstack(id);
            }
            StyleOp::AddImage(spec) => {
                if self.images.contains_key(&spec.id) {
                    return Err(rejected("image", &spec.id, "already exists"));
                }
                self.images.insert(spec.id.clone(), spec.clone());
            }
            StyleOp::RemoveImage { id } => {
                self.images.remove(id).ok_or_else(|| not_found("image", id))?;
            }
            StyleOp::AddModel(spec) => {
                if self.models.contains_key(&spec.id) {
                    return Err(rejected("model", &spec.id, "already exists"));
                }
                self.models.insert(spec.id.clone(), spec.clone());
            }
            StyleOp::RemoveModel { id } => {
                self.models.remove(id).ok_or_else(|| not_found("model", id))?;
            }
            StyleOp::SetTerrain(spec) => {
                if let Some(spec) = spec {
                    if !self.knows_source(&spec.source) {
                        return Err(not_found("source", &spec.source));
                    }
                }
                self.terrain.clone_from(spec);
            }
            StyleOp::SetAtmosphere(spec) => self.atmosphere.clone_from(spec),
            StyleOp::SetProjection(spec) => self.projection.clone_from(spec),
            StyleOp::SetEffect { kind, spec } => match spec {
                Some(spec) => {
                    self.effects.insert(*kind, spec.clone());
                }
                None => {
                    self.effects.remove(kind);
                }
            },
        }
        Ok(())
    }

    /// Put layer `id` below `before` in `slot`, or on top of it.
    fn place(
        &mut self,
        id: &str,
        slot: Option<&Slot>,
        before: Option<&str>,
    ) -> Result<(), BackendError> {
        if let Some(anchor) = before {
            let known = anchor != id
                && self
                    .stacks
                    .get(&slot.cloned())
                    .is_some_and(|ids| ids.iter().any(|other| other == anchor));
            if !known {
                return Err(not_found("layer", anchor));
            }
        }
        self.unstack(id);
        let stack = self.stacks.entry(slot.cloned()).or_default();
        let at = before
            .and_then(|anchor| stack.iter().position(|other| other == anchor))
            .unwrap_or(stack.len());
        stack.insert(at, id.to_string());
        Ok(())
    }

    fn unstack(&mut self, id: &str) {
        for ids in self.stacks.values_mut() {
            ids.retain(|other| other != id);
        }
        self.stacks.retain(|_, ids| !ids.is_empty());
    }
}

fn not_found(kind: &str, id: &str) -> BackendError {
    BackendError::NotFound(format!("{kind} {id}"))
}

fn rejected(kind: &str, id: &str, why: &str) -> BackendError {
    BackendError::Rejected(format!("{kind} {id} {why}"))
}

impl StyleBackend for MockStyleBackend {
    fn add_source(&mut self, spec: &SourceSpec) -> Result<(), BackendError> {
        self.handle(StyleOp::AddSource(spec.clone()))
    }

    fn update_source(&mut self, id: &str, changes: &Properties) -> Result<(), BackendError> {
        self.handle(StyleOp::UpdateSource {
            id: id.to_string(),
            changes: changes.clone(),
        })
    }

    fn update_geojson_data(&mut self, id: &str, data: &Value) -> Result<(), BackendError> {
        self.handle(StyleOp::UpdateGeoJsonData {
            id: id.to_string(),
            data: data.clone(),
        })
    }

    fn remove_source(&mut self, id: &str) -> Result<(), BackendError> {
        self.handle(StyleOp::RemoveSource { id: id.to_string() })
    }

    fn has_source(&self, id: &str) -> bool {
        self.knows_source(id)
    }

    fn add_layer(&mut self, spec: &LayerSpec, before: Option<&str>) -> Result<(), BackendError> {
        self.handle(StyleOp::AddLayer {
            spec: spec.clone(),
            before: before.map(str::to_string),
        })
    }

    fn update_layer_properties(
        &mut self,
        id: &str,
        changes: &Properties,
    ) -> Result<(), BackendError> {
        self.handle(StyleOp::UpdateLayerProperties {
            id: id.to_string(),
            changes: changes.clone(),
        })
    }

    fn move_layer(
        &mut self,
        id: &str,
        slot: Option<&Slot>,
        before: Option<&str>,
    ) -> Result<(), BackendError> {
        self.handle(StyleOp::MoveLayer {
            id: id.to_string(),
            slot: slot.cloned(),
            before: before.map(str::to_string),
        })
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), BackendError> {
        self.handle(StyleOp::RemoveLayer { id: id.to_string() })
    }

    fn add_image(&mut self, spec: &ImageSpec) -> Result<(), BackendError> {
        self.handle(StyleOp::AddImage(spec.clone()))
    }

    fn remove_image(&mut self, id: &str) -> Result<(), BackendError> {
        self.handle(StyleOp::RemoveImage { id: id.to_string() })
    }

    fn add_model(&mut self, spec: &ModelSpec) -> Result<(), BackendError> {
        self.handle(StyleOp::AddModel(spec.clone()))
    }

    fn remove_model(&mut self, id: &str) -> Result<(), BackendError> {
        self.handle(StyleOp::RemoveModel { id: id.to_string() })
    }

    fn set_terrain(&mut self, spec: Option<&TerrainSpec>) -> Result<(), BackendError> {
        self.handle(StyleOp::SetTerrain(spec.cloned()))
    }

    fn set_atmosphere(&mut self, spec: Option<&AtmosphereSpec>) -> Result<(), BackendError> {
        self.handle(StyleOp::SetAtmosphere(spec.cloned()))
    }

    fn set_projection(&mut self, spec: Option<&ProjectionSpec>) -> Result<(), BackendError> {
        self.handle(StyleOp::SetProjection(spec.cloned()))
    }

    fn set_effect(
        &mut self,
        kind: EffectKind,
        spec: Option<&EffectSpec>,
    ) -> Result<(), BackendError> {
        self.handle(StyleOp::SetEffect {
            kind,
            spec: spec.cloned(),
        })
    }
}
