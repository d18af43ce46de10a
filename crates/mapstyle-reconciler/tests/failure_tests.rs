// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Backend rejections, missing dependencies and invalid trees.

#![allow(missing_docs, clippy::expect_used, clippy::unwrap_used)]
use mapstyle_dry_tests::{
    init_tracing, line_layer, line_string, ready_config, ready_reconciler, source_with_layers,
    vector_source, MockStyleBackend,
};
use mapstyle_port::{
    BackendError, LayerSpec, LayerType, SourceKind, SourceSpec, StyleBackend, TerrainSpec,
};
use mapstyle_reconciler::config::ReconcilerConfig;
use mapstyle_reconciler::{
    ContentNode, KeyOutcome, NodeIdentity, ReconcileError, StableKey, StyleReconciler,
};
use serde_json::json;

fn key(identity: NodeIdentity) -> StableKey {
    StableKey::from(identity)
}

#[test]
fn failed_source_skips_its_layers() {
    init_tracing();
    let mut r = ready_reconciler();
    r.backend_mut().fail_on("add_source", Some("a"));
    let tree = source_with_layers("a", &["roads"]);

    let report = r.submit(&tree).unwrap().into_report().unwrap();
    assert_eq!(r.backend().call_names(), vec!["add_source(a)"]);
    assert!(matches!(
        report.outcome(&key(NodeIdentity::Source("a".into()))),
        Some(KeyOutcome::Failed(ReconcileError::BackendOperationFailed {
            reason: BackendError::Rejected(_),
            ..
        }))
    ));
    assert!(matches!(
        report.outcome(&key(NodeIdentity::Layer("roads".into()))),
        Some(KeyOutcome::Failed(ReconcileError::DependencyUnsatisfied { source_id, .. }))
            if source_id == "a"
    ));
    assert!(r.applied().is_empty());

    r.backend_mut().clear_failures();
    let retry = r.submit(&tree).unwrap().into_report().unwrap();
    assert!(retry.is_success());
    assert_eq!(r.backend().layer_stack(None), vec!["roads"]);
}

#[test]
fn failed_update_is_retried_on_the_next_pass() {
    let mut r = ready_reconciler();
    let tree = |width: u32| {
        ContentNode::group(vec![
            vector_source("a").into(),
            line_layer("roads", "a").property("line-width", json!(width)).into(),
        ])
    };
    r.submit(&tree(2)).unwrap();

    r.backend_mut().fail_on("update_layer_properties", None);
    let report = r.submit(&tree(4)).unwrap().into_report().unwrap();
    assert_eq!(report.failures().count(), 1);
    assert!(report
        .outcome(&key(NodeIdentity::Source("a".into())))
        .is_some_and(KeyOutcome::is_applied));

    r.backend_mut().clear_failures();
    let retry = r.submit(&tree(4)).unwrap().into_report().unwrap();
    assert_eq!(retry.ops().len(), 1);
    assert_eq!(r.backend().layers["roads"].properties["line-width"], json!(4));
}

#[test]
fn unavailable_backend_fails_every_key() {
    let mut r = ready_reconciler();
    r.backend_mut().set_unavailable(true);

    let report = r
        .submit(&source_with_layers("a", &["roads", "rail"]))
        .unwrap()
        .into_report()
        .unwrap();
    assert_eq!(report.failures().count(), 3);
    assert!(report
        .issued
        .iter()
        .all(|record| record.result == Err(BackendError::Unavailable)));
    assert!(r.applied().is_empty());
}

#[test]
fn duplicate_keys_reject_the_whole_tree() {
    let mut r = ready_reconciler();
    r.submit(&source_with_layers("a", &["roads"])).unwrap();
    r.backend_mut().take_calls();

    let tree = ContentNode::group(vec![vector_source("a").into(), vector_source("a").into()]);
    let err = r.submit(&tree).unwrap_err();
    assert!(matches!(err, ReconcileError::DuplicateKey { .. }));
    assert!(r.backend().calls().is_empty());
    assert_eq!(r.applied().len(), 2);
}

#[test]
fn base_style_sources_resolve_when_enabled() {
    let backend = MockStyleBackend::new().with_base_source("composite");
    let config = ReconcilerConfig {
        resolve_external_sources: true,
        ..ready_config()
    };
    let mut r = StyleReconciler::new(backend, config);
    let tree = ContentNode::group(vec![LayerSpec::new("buildings", LayerType::FillExtrusion)
        .source("composite")
        .source_layer("building")
        .into()]);

    let report = r.submit(&tree).unwrap().into_report().unwrap();
    assert!(report.is_success());
    assert_eq!(r.backend().call_names(), vec!["add_layer(buildings)"]);
}

#[test]
fn base_style_sources_are_ignored_by_default() {
    let backend = MockStyleBackend::new().with_base_source("composite");
    let mut r = StyleReconciler::new(backend, ready_config());
    let tree = ContentNode::group(vec![line_layer("roads", "composite").into()]);

    let report = r.submit(&tree).unwrap().into_report().unwrap();
    assert!(r.backend().calls().is_empty());
    assert!(matches!(
        report.failures().next(),
        Some(ReconcileError::DependencyUnsatisfied { source_id, .. }) if source_id == "composite"
    ));
}

fn source_held(report: &mapstyle_reconciler::ReconcileReport, id: &str) -> bool {
    matches!(
        report.outcome(&key(NodeIdentity::Source(id.into()))),
        Some(KeyOutcome::Failed(ReconcileError::DependencyUnsatisfied { source_id, .. }))
            if source_id == id
    )
}

#[test]
fn source_stays_while_a_layer_reading_it_remains() {
    let mut r = ready_reconciler();
    r.submit(&source_with_layers("A", &["L"])).unwrap();
    r.backend_mut().take_calls();
    r.backend_mut().fail_on("remove_layer", Some("L"));

    let report = r.submit(&ContentNode::empty()).unwrap().into_report().unwrap();
    assert_eq!(r.backend().call_names(), vec!["remove_layer(L)"]);
    assert!(source_held(&report, "A"));
    assert!(matches!(
        report.outcome(&key(NodeIdentity::Layer("L".into()))),
        Some(KeyOutcome::Failed(ReconcileError::BackendOperationFailed { .. }))
    ));
    assert_eq!(r.applied().len(), 2);
    assert!(r.backend().has_source("A"));

    r.backend_mut().clear_failures();
    r.backend_mut().take_calls();
    let retry = r.submit(&ContentNode::empty()).unwrap().into_report().unwrap();
    assert!(retry.is_success());
    assert_eq!(r.backend().call_names(), vec!["remove_layer(L)", "remove_source(A)"]);
    assert!(r.applied().is_empty());
}

#[test]
fn source_stays_while_terrain_reads_it() {
    let mut r = ready_reconciler();
    let tree = ContentNode::group(vec![
        SourceSpec::new("dem", SourceKind::RasterDem).into(),
        TerrainSpec::new("dem").into(),
    ]);
    r.submit(&tree).unwrap();
    r.backend_mut().take_calls();
    r.backend_mut().fail_on("set_terrain", None);

    let report = r.submit(&ContentNode::empty()).unwrap().into_report().unwrap();
    assert_eq!(r.backend().call_names(), vec!["set_terrain"]);
    assert!(source_held(&report, "dem"));
    assert!(r.backend().terrain.is_some());
    assert_eq!(r.applied().len(), 2);
}

#[test]
fn failed_removal_halts_the_replacement() {
    let mut r = ready_reconciler();
    r.submit(&source_with_layers("A", &["L"])).unwrap();
    r.backend_mut().take_calls();
    r.backend_mut().fail_on("remove_layer", Some("L"));

    let geojson = ContentNode::group(vec![
        SourceSpec::geojson("A", line_string(&[[0.0, 0.0], [1.0, 1.0]])).into(),
        line_layer("L", "A").into(),
    ]);
    let report = r.submit(&geojson).unwrap().into_report().unwrap();
    assert_eq!(r.backend().call_names(), vec!["remove_layer(L)"]);
    assert!(source_held(&report, "A"));
    assert_eq!(r.backend().sources["A"].kind, SourceKind::Vector);
    assert_eq!(r.applied().layers_in(None), ["L"]);

    r.backend_mut().clear_failures();
    r.backend_mut().take_calls();
    let retry = r.submit(&geojson).unwrap().into_report().unwrap();
    assert!(retry.is_success());
    assert_eq!(
        r.backend().call_names(),
        vec![
            "remove_layer(L)",
            "remove_source(A)",
            "add_source(A)",
            "add_layer(L)"
        ]
    );
    assert_eq!(r.backend().sources["A"].kind, SourceKind::GeoJson);
}
