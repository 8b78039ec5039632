//! Live state construction and reuse integration tests.
//!
//! Corresponds to packages/router/test/create_router_state.spec.ts

use std::sync::Arc;

use angular_router::models::{ComponentType, Route};
use angular_router::navigation_transition::RouterConfig;
use angular_router::route_reuse_strategy::{
    DetachedRouteHandle, RouteReuseStrategy, StoringRouteReuseStrategy,
};
use angular_router::router::{Router, RouterParts};
use angular_router::router_state::ActivatedRouteSnapshot;

const A: ComponentType = ComponentType("A");
const B: ComponentType = ComponentType("B");
const U: ComponentType = ComponentType("U");

#[tokio::test]
async fn should_preserve_route_identity_across_param_changes() {
    let router = Router::new(
        vec![Route::new("users/:id").component(U)],
        RouterConfig::default(),
    );
    assert!(router.navigate_by_url("/users/1").await.unwrap());
    let first = router.router_state().root.children[0].value.clone();
    assert_eq!(first.snapshot().param("id"), Some("1".to_string()));

    assert!(router.navigate_by_url("/users/2").await.unwrap());
    let second = router.router_state().root.children[0].value.clone();

    // Same live node, updated snapshot.
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.snapshot().param("id"), Some("2".to_string()));
}

#[tokio::test]
async fn should_recreate_the_node_when_the_config_changes() {
    let router = Router::new(
        vec![Route::new("a").component(A), Route::new("b").component(B)],
        RouterConfig::default(),
    );
    assert!(router.navigate_by_url("/a").await.unwrap());
    let first = router.router_state().root.children[0].value.clone();

    assert!(router.navigate_by_url("/b").await.unwrap());
    let second = router.router_state().root.children[0].value.clone();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(second.snapshot().component(), Some(B));
}

#[tokio::test]
async fn should_push_updates_through_the_params_observable() {
    let router = Router::new(
        vec![Route::new("users/:id").component(U)],
        RouterConfig::default(),
    );
    assert!(router.navigate_by_url("/users/1").await.unwrap());
    let route = router.router_state().root.children[0].value.clone();
    let params_rx = route.params();
    assert_eq!(
        params_rx.borrow().get("id").and_then(|v| v.as_str()),
        Some("1")
    );

    assert!(router.navigate_by_url("/users/2").await.unwrap());
    assert_eq!(
        params_rx.borrow().get("id").and_then(|v| v.as_str()),
        Some("2")
    );
}

#[tokio::test]
async fn should_keep_the_root_route_identity_across_navigations() {
    let router = Router::new(
        vec![Route::new("a").component(A), Route::new("b").component(B)],
        RouterConfig::default(),
    );
    let root_before = router.router_state().root_route();
    assert!(router.navigate_by_url("/a").await.unwrap());
    assert!(router.navigate_by_url("/b").await.unwrap());
    let root_after = router.router_state().root_route();
    assert!(Arc::ptr_eq(&root_before, &root_after));
}

struct AlwaysReuse;

impl RouteReuseStrategy for AlwaysReuse {
    fn should_detach(&self, _route: &Arc<ActivatedRouteSnapshot>) -> bool {
        false
    }

    fn store(&self, _route: &Arc<ActivatedRouteSnapshot>, _handle: Option<DetachedRouteHandle>) {}

    fn should_attach(&self, _route: &Arc<ActivatedRouteSnapshot>) -> bool {
        false
    }

    fn retrieve(&self, _route: &Arc<ActivatedRouteSnapshot>) -> Option<DetachedRouteHandle> {
        None
    }

    fn should_reuse_route(
        &self,
        _future: &Arc<ActivatedRouteSnapshot>,
        _current: &Arc<ActivatedRouteSnapshot>,
    ) -> bool {
        true
    }
}

#[tokio::test]
async fn should_let_a_custom_strategy_reuse_across_different_configs() {
    let parts = RouterParts {
        reuse_strategy: Arc::new(AlwaysReuse),
        ..RouterParts::default()
    };
    let router = Router::with_parts(
        vec![Route::new("a").component(A), Route::new("b").component(B)],
        RouterConfig::default(),
        parts,
    );
    assert!(router.navigate_by_url("/a").await.unwrap());
    let first = router.router_state().root.children[0].value.clone();

    // The strategy, not config identity, decides pairing: the live node
    // carries over to a different route config.
    assert!(router.navigate_by_url("/b").await.unwrap());
    let second = router.router_state().root.children[0].value.clone();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.snapshot().component(), Some(B));
}

#[tokio::test]
async fn should_reattach_a_stored_subtree() {
    let parts = RouterParts {
        reuse_strategy: Arc::new(StoringRouteReuseStrategy::default()),
        ..RouterParts::default()
    };
    let router = Router::with_parts(
        vec![Route::new("a").component(A), Route::new("b").component(B)],
        RouterConfig::default(),
        parts,
    );

    assert!(router.navigate_by_url("/a").await.unwrap());
    let detached = router.router_state().root.children[0].value.clone();

    // Navigating away detaches and stores the subtree.
    assert!(router.navigate_by_url("/b").await.unwrap());
    assert!(!Arc::ptr_eq(
        &detached,
        &router.router_state().root.children[0].value
    ));

    // Navigating back reattaches the very same live node.
    assert!(router.navigate_by_url("/a").await.unwrap());
    let reattached = router.router_state().root.children[0].value.clone();
    assert!(Arc::ptr_eq(&detached, &reattached));
}
