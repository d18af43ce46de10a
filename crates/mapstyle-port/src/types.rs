// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Core style value types for the backend port contract.
//!
//! These types are pure values with structural equality. Setters consume
//! `self` and return the modified value, so a changed field always produces a
//! new spec instead of mutating a shared one.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Properties;

/// Kind of data source.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Vector tiles.
    Vector,
    /// Raster tiles.
    Raster,
    /// Raster elevation tiles (terrain, hillshade).
    RasterDem,
    /// Multi-band raster array tiles.
    RasterArray,
    /// Inline or remote GeoJSON.
    #[serde(rename = "geojson")]
    GeoJson,
    /// Georeferenced image.
    Image,
    /// Batched 3D models.
    Model,
    /// Backend-specific source type.
    Custom(String),
}

/// A data source declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Source identifier, unique among sources.
    pub id: String,
    /// Source type. Changing it requires re-creating the source.
    pub kind: SourceKind,
    /// Source properties (`url`, `tiles`, `data`, `minzoom`, ...).
    #[serde(default)]
    pub properties: Properties,
}

impl SourceSpec {
    /// Property carrying inline GeoJSON data.
    pub const DATA: &'static str = "data";

    /// Create a source with no properties.
    pub fn new(id: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            properties: Properties::new(),
        }
    }

    /// Shorthand for a GeoJSON source holding `data`.
    pub fn geojson(id: impl Into<String>, data: Value) -> Self {
        Self::new(id, SourceKind::GeoJson).property(Self::DATA, data)
    }

    /// Set one property.
    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

/// Named ordering group that layers are inserted relative to.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Slot {
    /// Below everything in the base style.
    Bottom,
    /// Between base style roads and labels.
    Middle,
    /// Above everything in the base style.
    Top,
    /// A slot declared by the base style.
    Custom(String),
}

/// Layer rendering type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerType {
    /// Filled polygons.
    Fill,
    /// Stroked lines.
    Line,
    /// Icons and text.
    Symbol,
    /// Circles.
    Circle,
    /// Density heatmap.
    Heatmap,
    /// Extruded polygons.
    FillExtrusion,
    /// Raster imagery.
    Raster,
    /// Animated raster particles.
    RasterParticle,
    /// Hillshading from elevation data.
    Hillshade,
    /// 3D models.
    Model,
    /// Solid background; has no source.
    Background,
    /// Sky dome; has no source.
    Sky,
    /// Backend-specific layer type.
    Custom(String),
}

/// A drawing layer declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Layer identifier, unique among layers.
    pub id: String,
    /// Rendering type. Changing it requires re-creating the layer.
    pub layer_type: LayerType,
    /// Source the layer draws from. `None` for background/sky layers.
    #[serde(default)]
    pub source: Option<String>,
    /// Source layer for vector sources.
    #[serde(default)]
    pub source_layer: Option<String>,
    /// Ordering group. `None` is the default group.
    #[serde(default)]
    pub slot: Option<Slot>,
    /// Paint/layout/filter properties.
    #[serde(default)]
    pub properties: Properties,
}

impl LayerSpec {
    /// Create a layer with no source, slot or properties.
    pub fn new(id: impl Into<String>, layer_type: LayerType) -> Self {
        Self {
            id: id.into(),
            layer_type,
            source: None,
            source_layer: None,
            slot: None,
            properties: Properties::new(),
        }
    }

    /// Set the source the layer draws from.
    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the vector source layer.
    #[must_use]
    pub fn source_layer(mut self, source_layer: impl Into<String>) -> Self {
        self.source_layer = Some(source_layer.into());
        self
    }

    /// Place the layer in `slot`.
    #[must_use]
    pub fn slot(mut self, slot: Slot) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Set one property.
    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

/// A style image (icon, pattern) registered by id.
///
/// Equality compares floats by bit pattern, so a NaN field still equals
/// itself and an unchanged image is never replaced.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageSpec {
    /// Image identifier.
    pub id: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8 pixels, row-major.
    pub pixels: Vec<u8>,
    /// Pixel ratio of the bitmap.
    pub scale: f32,
    /// Whether the image is a signed distance field.
    pub sdf: bool,
    /// Horizontally stretchable ranges `[from, to]`.
    #[serde(default)]
    pub stretch_x: Vec<[f32; 2]>,
    /// Vertically stretchable ranges `[from, to]`.
    #[serde(default)]
    pub stretch_y: Vec<[f32; 2]>,
    /// Content box `[left, top, right, bottom]` for text fitting.
    #[serde(default)]
    pub content: Option<[f32; 4]>,
}

impl PartialEq for ImageSpec {
    fn eq(&self, other: &Self) -> bool {
        fn ranges(values: &[[f32; 2]]) -> impl Iterator<Item = [u32; 2]> + '_ {
            values.iter().map(|range| range.map(f32::to_bits))
        }
        let content = |spec: &Self| spec.content.map(|rect| rect.map(f32::to_bits));
        self.id == other.id
            && self.width == other.width
            && self.height == other.height
            && self.pixels == other.pixels
            && self.scale.to_bits() == other.scale.to_bits()
            && self.sdf == other.sdf
            && ranges(&self.stretch_x).eq(ranges(&other.stretch_x))
            && ranges(&self.stretch_y).eq(ranges(&other.stretch_y))
            && content(self) == content(other)
    }
}

impl ImageSpec {
    /// Create an image from raw pixels at scale 1.
    pub fn new(id: impl Into<String>, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            pixels,
            scale: 1.0,
            sdf: false,
            stretch_x: Vec::new(),
            stretch_y: Vec::new(),
            content: None,
        }
    }

    /// Set the pixel ratio.
    #[must_use]
    pub fn scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Mark the image as a signed distance field.
    #[must_use]
    pub fn sdf(mut self, sdf: bool) -> Self {
        self.sdf = sdf;
        self
    }

    /// Set stretchable ranges.
    #[must_use]
    pub fn stretch(mut self, x: Vec<[f32; 2]>, y: Vec<[f32; 2]>) -> Self {
        self.stretch_x = x;
        self.stretch_y = y;
        self
    }

    /// Set the content box.
    #[must_use]
    pub fn content(mut self, content: [f32; 4]) -> Self {
        self.content = Some(content);
        self
    }
}

/// A 3D model registered by id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model identifier.
    pub id: String,
    /// Location of the mesh (glTF).
    pub uri: String,
    /// Placement properties (`position`, `orientation`, ...).
    #[serde(default)]
    pub properties: Properties,
}

impl ModelSpec {
    /// Create a model loaded from `uri`.
    pub fn new(id: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uri: uri.into(),
            properties: Properties::new(),
        }
    }

    /// Set one property.
    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

/// Global 3D terrain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainSpec {
    /// Raster DEM source providing elevation.
    pub source: String,
    /// Terrain properties (`exaggeration`, ...).
    #[serde(default)]
    pub properties: Properties,
}

impl TerrainSpec {
    /// Create terrain backed by `source`.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            properties: Properties::new(),
        }
    }

    /// Set one property.
    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

/// Global atmosphere (fog, horizon, stars).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AtmosphereSpec {
    /// Atmosphere properties.
    #[serde(default)]
    pub properties: Properties,
}

impl AtmosphereSpec {
    /// Atmosphere with backend defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one property.
    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

/// Map projection name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectionName {
    /// Web Mercator.
    Mercator,
    /// 3D globe.
    Globe,
}

/// Global map projection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionSpec {
    /// Projection name.
    pub name: ProjectionName,
}

impl ProjectionSpec {
    /// Create a projection spec.
    pub const fn new(name: ProjectionName) -> Self {
        Self { name }
    }
}

/// Kind of precipitation effect. Each kind is one global object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EffectKind {
    /// Snowfall.
    Snow,
    /// Rainfall.
    Rain,
}

/// A global weather effect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectSpec {
    /// Which effect this configures.
    pub kind: EffectKind,
    /// Effect properties (`density`, `intensity`, `color`, ...).
    #[serde(default)]
    pub properties: Properties,
}

impl EffectSpec {
    /// Create an effect with backend defaults.
    pub fn new(kind: EffectKind) -> Self {
        Self {
            kind,
            properties: Properties::new(),
        }
    }

    /// Snow with backend defaults.
    pub fn snow() -> Self {
        Self::new(EffectKind::Snow)
    }

    /// Rain with backend defaults.
    pub fn rain() -> Self {
        Self::new(EffectKind::Rain)
    }

    /// Set one property.
    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}
