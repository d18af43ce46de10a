// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Style content fixtures shared across test suites.

use mapstyle_port::{ImageSpec, LayerSpec, LayerType, SourceKind, SourceSpec};
use mapstyle_reconciler::config::ReconcilerConfig;
use mapstyle_reconciler::{ContentNode, Readiness, StyleReconciler};
use serde_json::{json, Value};

use crate::backend::MockStyleBackend;

/// A vector tile source.
pub fn vector_source(id: &str) -> SourceSpec {
    SourceSpec::new(id, SourceKind::Vector).property("url", json!(format!("mapbox://{id}")))
}

/// A line layer drawing from `source`.
pub fn line_layer(id: &str, source: &str) -> LayerSpec {
    LayerSpec::new(id, LayerType::Line)
        .source(source)
        .property("line-width", json!(2))
}

/// A 1x1 image filled with `rgba`.
pub fn pixel_image(id: &str, rgba: [u8; 4]) -> ImageSpec {
    ImageSpec::new(id, 1, 1, rgba.to_vec())
}

/// A GeoJSON line through `coords`.
pub fn line_string(coords: &[[f64; 2]]) -> Value {
    json!({ "type": "LineString", "coordinates": coords })
}

/// `source` followed by one line layer per id, in order.
pub fn source_with_layers(source: &str, layers: &[&str]) -> ContentNode {
    let mut children = vec![ContentNode::from(vector_source(source))];
    children.extend(layers.iter().map(|id| line_layer(id, source).into()));
    ContentNode::group(children)
}

/// One GeoJSON source and line layer per route, keyed by route id.
pub fn route_tree(routes: &[(&str, Value)]) -> ContentNode {
    ContentNode::for_each(
        routes.iter().cloned(),
        |(id, _)| *id,
        |(id, data)| {
            ContentNode::group(vec![
                SourceSpec::geojson(id, data).into(),
                line_layer(&format!("{id}-line"), id).into(),
            ])
        },
    )
}

/// Config with the gate open from the start.
pub fn ready_config() -> ReconcilerConfig {
    ReconcilerConfig {
        initial_readiness: Readiness::Ready,
        ..ReconcilerConfig::default()
    }
}

/// A reconciler over a fresh mock whose gate is already open.
pub fn ready_reconciler() -> StyleReconciler<MockStyleBackend> {
    StyleReconciler::new(MockStyleBackend::new(), ready_config())
}

/// Install a test-friendly `tracing` subscriber, filtered by `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
