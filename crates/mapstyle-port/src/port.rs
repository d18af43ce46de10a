// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Style backend trait defining the imperative contract.

use serde_json::Value;

use crate::{
    AtmosphereSpec, BackendError, EffectKind, EffectSpec, ImageSpec, LayerSpec, ModelSpec,
    ProjectionSpec, Properties, Slot, SourceSpec, TerrainSpec,
};

/// Stateful style-management backend.
///
/// Implementors hold the live style (sources, layers, images, ...) and apply
/// one imperative call at a time. Every call is synchronous from the caller's
/// viewpoint and reports its own outcome.
///
/// # Design
///
/// This trait is a hexagonal port. The reconciler decides *which* calls to
/// make and in what order; adapters (a native map SDK, a web bridge, a test
/// double) decide *how* to apply them.
///
/// # Ordering
///
/// Layer positions are expressed relative to another layer in the same slot:
/// `before = Some(id)` places the layer immediately below `id`,
/// `before = None` appends it at the top of its slot.
pub trait StyleBackend {
    /// Add a source.
    fn add_source(&mut self, spec: &SourceSpec) -> Result<(), BackendError>;

    /// Apply a partial property patch to an existing source.
    fn update_source(&mut self, id: &str, changes: &Properties) -> Result<(), BackendError>;

    /// Replace the inline data of a GeoJSON source.
    ///
    /// Defaults to a `data` property patch through [`update_source`](Self::update_source).
    fn update_geojson_data(&mut self, id: &str, data: &Value) -> Result<(), BackendError> {
        let mut changes = Properties::new();
        changes.insert(SourceSpec::DATA.to_string(), data.clone());
        self.update_source(id, &changes)
    }

    /// Remove a source. Layers using it must already be gone.
    fn remove_source(&mut self, id: &str) -> Result<(), BackendError>;

    /// Whether the backend already provides a source (e.g. from the base style).
    fn has_source(&self, _id: &str) -> bool {
        false
    }

    /// Add a layer into its slot, below `before` or at the top of the slot.
    fn add_layer(&mut self, spec: &LayerSpec, before: Option<&str>) -> Result<(), BackendError>;

    /// Apply a partial property patch to an existing layer.
    fn update_layer_properties(
        &mut self,
        id: &str,
        changes: &Properties,
    ) -> Result<(), BackendError>;

    /// Reposition an existing layer within `slot`.
    fn move_layer(
        &mut self,
        id: &str,
        slot: Option<&Slot>,
        before: Option<&str>,
    ) -> Result<(), BackendError>;

    /// Remove a layer.
    fn remove_layer(&mut self, id: &str) -> Result<(), BackendError>;

    /// Register a style image.
    fn add_image(&mut self, spec: &ImageSpec) -> Result<(), BackendError>;

    /// Unregister a style image.
    fn remove_image(&mut self, id: &str) -> Result<(), BackendError>;

    /// Register a 3D model.
    fn add_model(&mut self, spec: &ModelSpec) -> Result<(), BackendError>;

    /// Unregister a 3D model.
    fn remove_model(&mut self, id: &str) -> Result<(), BackendError>;

    /// Set or clear (`None`) the global terrain.
    fn set_terrain(&mut self, spec: Option<&TerrainSpec>) -> Result<(), BackendError>;

    /// Set or clear (`None`) the global atmosphere.
    fn set_atmosphere(&mut self, spec: Option<&AtmosphereSpec>) -> Result<(), BackendError>;

    /// Set or clear (`None`) the projection. Clearing restores the style default.
    fn set_projection(&mut self, spec: Option<&ProjectionSpec>) -> Result<(), BackendError>;

    /// Set or clear (`None`) one global weather effect.
    fn set_effect(
        &mut self,
        kind: EffectKind,
        spec: Option<&EffectSpec>,
    ) -> Result<(), BackendError>;
}

macro_rules! forward_backend {
    ($($target:tt)*) => {
        impl<B: StyleBackend + ?Sized> StyleBackend for $($target)* {
            fn add_source(&mut self, spec: &SourceSpec) -> Result<(), BackendError> {
                (**self).add_source(spec)
            }
            fn update_source(&mut self, id: &str, changes: &Properties) -> Result<(), BackendError> {
                (**self).update_source(id, changes)
            }
            fn update_geojson_data(&mut self, id: &str, data: &Value) -> Result<(), BackendError> {
                (**self).update_geojson_data(id, data)
            }
            fn remove_source(&mut self, id: &str) -> Result<(), BackendError> {
                (**self).remove_source(id)
            }
            fn has_source(&self, id: &str) -> bool {
                (**self).has_source(id)
            }
            fn add_layer(&mut self, spec: &LayerSpec, before: Option<&str>) -> Result<(), BackendError> {
                (**self).add_layer(spec, before)
            }
            fn update_layer_properties(
                &mut self,
                id: &str,
                changes: &Properties,
            ) -> Result<(), BackendError> {
                (**self).update_layer_properties(id, changes)
            }
            fn move_layer(
                &mut self,
                id: &str,
                slot: Option<&Slot>,
                before: Option<&str>,
            ) -> Result<(), BackendError> {
                (**self).move_layer(id, slot, before)
            }
            fn remove_layer(&mut self, id: &str) -> Result<(), BackendError> {
                (**self).remove_layer(id)
            }
            fn add_image(&mut self, spec: &ImageSpec) -> Result<(), BackendError> {
                (**self).add_image(spec)
            }
            fn remove_image(&mut self, id: &str) -> Result<(), BackendError> {
                (**self).remove_image(id)
            }
            fn add_model(&mut self, spec: &ModelSpec) -> Result<(), BackendError> {
                (**self).add_model(spec)
            }
            fn remove_model(&mut self, id: &str) -> Result<(), BackendError> {
                (**self).remove_model(id)
            }
            fn set_terrain(&mut self, spec: Option<&TerrainSpec>) -> Result<(), BackendError> {
                (**self).set_terrain(spec)
            }
            fn set_atmosphere(&mut self, spec: Option<&AtmosphereSpec>) -> Result<(), BackendError> {
                (**self).set_atmosphere(spec)
            }
            fn set_projection(&mut self, spec: Option<&ProjectionSpec>) -> Result<(), BackendError> {
                (**self).set_projection(spec)
            }
            fn set_effect(
                &mut self,
                kind: EffectKind,
                spec: Option<&EffectSpec>,
            ) -> Result<(), BackendError> {
                (**self).set_effect(kind, spec)
            }
        }
    };
}

forward_backend!(&mut B);
forward_backend!(Box<B>);
