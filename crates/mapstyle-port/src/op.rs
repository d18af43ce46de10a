// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Backend operations as values.

use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    AtmosphereSpec, BackendError, EffectKind, EffectSpec, ImageSpec, LayerSpec, ModelSpec,
    ProjectionSpec, Properties, Slot, SourceSpec, StyleBackend, TerrainSpec,
};

/// One imperative style operation.
///
/// Operations are applied in order within a batch. Each variant maps to
/// exactly one [`StyleBackend`] call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "snake_case")]
pub enum StyleOp {
    /// Add a source.
    AddSource(SourceSpec),
    /// Patch source properties.
    UpdateSource {
        /// Source id.
        id: String,
        /// Changed properties only.
        changes: Properties,
    },
    /// Replace GeoJSON source data.
    UpdateGeoJsonData {
        /// Source id.
        id: String,
        /// New data.
        data: Value,
    },
    /// Remove a source.
    RemoveSource {
        /// Source id.
        id: String,
    },
    /// Add a layer below `before` (or at the top of its slot).
    AddLayer {
        /// Full layer spec.
        spec: LayerSpec,
        /// Layer to insert below.
        before: Option<String>,
    },
    /// Patch layer properties.
    UpdateLayerProperties {
        /// Layer id.
        id: String,
        /// Changed properties only.
        changes: Properties,
    },
    /// Reposition a layer within its slot.
    MoveLayer {
        /// Layer id.
        id: String,
        /// Slot the layer lives in.
        slot: Option<Slot>,
        /// Layer to move below.
        before: Option<String>,
    },
    /// Remove a layer.
    RemoveLayer {
        /// Layer id.
        id: String,
    },
    /// Register an image.
    AddImage(ImageSpec),
    /// Unregister an image.
    RemoveImage {
        /// Image id.
        id: String,
    },
    /// Register a model.
    AddModel(ModelSpec),
    /// Unregister a model.
    RemoveModel {
        /// Model id.
        id: String,
    },
    /// Set or clear terrain.
    SetTerrain(Option<TerrainSpec>),
    /// Set or clear atmosphere.
    SetAtmosphere(Option<AtmosphereSpec>),
    /// Set or clear projection.
    SetProjection(Option<ProjectionSpec>),
    /// Set or clear a weather effect.
    SetEffect {
        /// Effect kind.
        kind: EffectKind,
        /// New spec, `None` to clear.
        spec: Option<EffectSpec>,
    },
}

impl StyleOp {
    /// Issue this operation against `backend`.
    pub fn apply<B: StyleBackend + ?Sized>(&self, backend: &mut B) -> Result<(), BackendError> {
        match self {
            Self::AddSource(spec) => backend.add_source(spec),
            Self::UpdateSource { id, changes } => backend.update_source(id, changes),
            Self::UpdateGeoJsonData { id, data } => backend.update_geojson_data(id, data),
            Self::RemoveSource { id } => backend.remove_source(id),
            Self::AddLayer { spec, before } => backend.add_layer(spec, before.as_deref()),
            Self::UpdateLayerProperties { id, changes } => {
                backend.update_layer_properties(id, changes)
            }
            Self::MoveLayer { id, slot, before } => {
                backend.move_layer(id, slot.as_ref(), before.as_deref())
            }
            Self::RemoveLayer { id } => backend.remove_layer(id),
            Self::AddImage(spec) => backend.add_image(spec),
            Self::RemoveImage { id } => backend.remove_image(id),
            Self::AddModel(spec) => backend.add_model(spec),
            Self::RemoveModel { id } => backend.remove_model(id),
            Self::SetTerrain(spec) => backend.set_terrain(spec.as_ref()),
            Self::SetAtmosphere(spec) => backend.set_atmosphere(spec.as_ref()),
            Self::SetProjection(spec) => backend.set_projection(spec.as_ref()),
            Self::SetEffect { kind, spec } => backend.set_effect(*kind, spec.as_ref()),
        }
    }

    /// Short operation name (`add_layer`, `set_terrain`, ...).
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AddSource(_) => "add_source",
            Self::UpdateSource { .. } => "update_source",
            Self::UpdateGeoJsonData { .. } => "update_geojson_data",
            Self::RemoveSource { .. } => "remove_source",
            Self::AddLayer { .. } => "add_layer",
            Self::UpdateLayerProperties { .. } => "update_layer_properties",
            Self::MoveLayer { .. } => "move_layer",
            Self::RemoveLayer { .. } => "remove_layer",
            Self::AddImage(_) => "add_image",
            Self::RemoveImage { .. } => "remove_image",
            Self::AddModel(_) => "add_model",
            Self::RemoveModel { .. } => "remove_model",
            Self::SetTerrain(_) => "set_terrain",
            Self::SetAtmosphere(_) => "set_atmosphere",
            Self::SetProjection(_) => "set_projection",
            Self::SetEffect { .. } => "set_effect",
        }
    }

    /// Id of the object the operation targets, if it has one.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::AddSource(spec) => Some(&spec.id),
            Self::AddLayer { spec, .. } => Some(&spec.id),
            Self::AddImage(spec) => Some(&spec.id),
            Self::AddModel(spec) => Some(&spec.id),
            Self::UpdateSource { id, .. }
            | Self::UpdateGeoJsonData { id, .. }
            | Self::RemoveSource { id }
            | Self::UpdateLayerProperties { id, .. }
            | Self::MoveLayer { id, .. }
            | Self::RemoveLayer { id }
            | Self::RemoveImage { id }
            | Self::RemoveModel { id } => Some(id),
            Self::SetTerrain(_)
            | Self::SetAtmosphere(_)
            | Self::SetProjection(_)
            | Self::SetEffect { .. } => None,
        }
    }
}

impl fmt::Display for StyleOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self, self.target()) {
            (Self::SetEffect { kind, .. }, _) => write!(f, "{}({kind:?})", self.name()),
            (_, Some(target)) => write!(f, "{}({target})", self.name()),
            (_, None) => f.write_str(self.name()),
        }
    }
}
