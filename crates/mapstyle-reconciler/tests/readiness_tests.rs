// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Gate behaviour: buffering while the style loads and rebuilding after a swap.

#![allow(missing_docs, clippy::expect_used, clippy::unwrap_used)]
use mapstyle_dry_tests::{
    init_tracing, ready_reconciler, source_with_layers, InMemoryConfigStore, MockStyleBackend,
};
use mapstyle_reconciler::config::{ConfigService, ReconcilerConfig};
use mapstyle_reconciler::{Pass, Readiness, StyleReconciler};

fn names(report: &mapstyle_reconciler::ReconcileReport) -> Vec<String> {
    report.ops().iter().map(ToString::to_string).collect()
}

#[test]
fn trees_wait_for_the_style_and_only_the_latest_is_applied() {
    init_tracing();
    let mut r = StyleReconciler::new(MockStyleBackend::new(), ReconcilerConfig::default());
    assert_eq!(r.readiness(), Readiness::NotReady);

    let first = r.submit(&source_with_layers("s", &["a"])).unwrap();
    let second = r.submit(&source_with_layers("s", &["b"])).unwrap();
    assert!(matches!(first, Pass::Buffered) && matches!(second, Pass::Buffered));
    assert!(r.backend().calls().is_empty());

    let report = r.notify_ready(true, false).expect("ready triggers a pass");
    assert_eq!(names(&report), vec!["add_source(s)", "add_layer(b)"]);
    assert!(!report.reset);
    assert!(!r.backend().layers.contains_key("a"));
}

#[test]
fn not_ready_holds_without_touching_the_backend() {
    let mut r = ready_reconciler();
    r.submit(&source_with_layers("s", &["a"])).unwrap();
    r.backend_mut().take_calls();

    assert!(r.notify_ready(false, false).is_none());
    assert!(matches!(
        r.submit(&source_with_layers("s", &["a", "b"])).unwrap(),
        Pass::Buffered
    ));
    assert!(r.backend().calls().is_empty());

    let report = r.notify_ready(true, false).unwrap();
    assert_eq!(names(&report), vec!["add_layer(b)"]);
}

#[test]
fn style_swap_rebuilds_everything() {
    let mut r = ready_reconciler();
    let tree = source_with_layers("s", &["a", "b"]);
    r.submit(&tree).unwrap();

    r.backend_mut().discard_style();
    assert!(r.notify_ready(false, true).is_none());
    assert!(r.notify_ready(false, false).is_none());

    let report = r.notify_ready(true, false).unwrap();
    assert!(report.reset);
    assert!(report.is_success());
    assert_eq!(
        names(&report),
        vec!["add_source(s)", "add_layer(a)", "add_layer(b)"]
    );
    assert_eq!(r.backend().layer_stack(None), vec!["a", "b"]);
    assert_eq!(r.applied().len(), 3);
}

#[test]
fn replacement_reported_while_ready_rebuilds_at_once() {
    let mut r = ready_reconciler();
    r.submit(&source_with_layers("s", &["a"])).unwrap();
    r.backend_mut().discard_style();

    let report = r.notify_ready(true, true).unwrap();
    assert!(report.reset);
    assert_eq!(names(&report), vec!["add_source(s)", "add_layer(a)"]);

    let again = r.notify_ready(true, false).unwrap();
    assert!(again.issued.is_empty());
}

#[test]
fn reset_forgets_applied_state() {
    let mut r = ready_reconciler();
    let tree = source_with_layers("s", &["a"]);
    r.submit(&tree).unwrap();

    r.backend_mut().discard_style();
    r.reset();
    assert!(r.applied().is_empty());

    let report = r.submit(&tree).unwrap().into_report().unwrap();
    assert_eq!(names(&report), vec!["add_source(s)", "add_layer(a)"]);
    assert!(!report.reset);
}

#[test]
fn stored_config_opens_the_gate() {
    let store = InMemoryConfigStore::new();
    let service = ConfigService::new(store.clone());
    ReconcilerConfig {
        initial_readiness: Readiness::Ready,
        ..ReconcilerConfig::default()
    }
    .save(&service)
    .unwrap();

    let config = ReconcilerConfig::load_or_default(&service).unwrap();
    let mut r = StyleReconciler::new(MockStyleBackend::new(), config);
    assert_eq!(r.readiness(), Readiness::Ready);
    assert!(r.submit(&source_with_layers("s", &[])).unwrap().report().is_some());
    assert_eq!(store.save_count(), 1);
}
