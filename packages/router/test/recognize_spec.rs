//! Recognition integration tests, driven through the router facade.
//!
//! Corresponds to packages/router/test/recognize.spec.ts

use std::sync::Arc;

use angular_router::models::{ComponentType, Route};
use angular_router::navigation_transition::{OnSameUrlNavigation, RouterConfig};
use angular_router::router::Router;
use angular_router::router_state::{ActivatedRouteSnapshot, ParamsInheritanceStrategy};
use angular_router::shared::ParamValue;
use angular_router::tree::TreeNode;
use angular_router::RouterError;

const A: ComponentType = ComponentType("A");
const B: ComponentType = ComponentType("B");
const C: ComponentType = ComponentType("C");

#[tokio::test]
async fn should_recognize_a_simple_config() {
    let router = Router::new(
        vec![Route::new("a/b").component(A)],
        RouterConfig::default(),
    );
    assert!(!router.navigated());
    assert!(router.navigate_by_url("/a/b").await.unwrap());
    assert!(router.navigated());
    assert_eq!(router.url(), "/a/b");

    let snapshot = router.router_state().snapshot.deepest_primary();
    assert_eq!(snapshot.component(), Some(A));
    assert_eq!(snapshot.url_display(), "a/b");
}

#[tokio::test]
async fn should_capture_route_params_and_matrix_params() {
    let router = Router::new(
        vec![Route::new("users/:id").component(A)],
        RouterConfig::default(),
    );
    assert!(router.navigate_by_url("/users/42;sort=asc").await.unwrap());

    let snapshot = router.router_state().snapshot.deepest_primary();
    assert_eq!(snapshot.param("id"), Some("42".to_string()));
    assert_eq!(snapshot.param("sort"), Some("asc".to_string()));
}

#[tokio::test]
async fn should_pick_the_first_matching_route_in_config_order() {
    let router = Router::new(
        vec![Route::new("a").component(A), Route::new("a").component(B)],
        RouterConfig::default(),
    );
    assert!(router.navigate_by_url("/a").await.unwrap());
    let snapshot = router.router_state().snapshot.deepest_primary();
    assert_eq!(snapshot.component(), Some(A));
}

#[tokio::test]
async fn should_recognize_nested_children() {
    let router = Router::new(
        vec![Route::new("team")
            .component(A)
            .children(vec![Route::new(":id").component(B)])],
        RouterConfig::default(),
    );
    assert!(router.navigate_by_url("/team/33").await.unwrap());

    let state = router.router_state();
    let leaf = state.snapshot.deepest_primary();
    assert_eq!(leaf.component(), Some(B));
    assert_eq!(leaf.param("id"), Some("33".to_string()));
    let parent = state.snapshot.parent_of(&leaf).expect("parent");
    assert_eq!(parent.component(), Some(A));
}

#[tokio::test]
async fn should_recognize_named_outlets() {
    let router = Router::new(
        vec![
            Route::new("a").component(A),
            Route::new("b").outlet("aux").component(B),
        ],
        RouterConfig::default(),
    );
    assert!(router.navigate_by_url("/a(aux:b)").await.unwrap());

    let state = router.router_state();
    let children = &state.snapshot.root.children;
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].value.outlet, "primary");
    assert_eq!(children[0].value.component(), Some(A));
    assert_eq!(children[1].value.outlet, "aux");
    assert_eq!(children[1].value.component(), Some(B));
}

#[tokio::test]
async fn should_error_when_nothing_matches() {
    let router = Router::new(vec![Route::new("a").component(A)], RouterConfig::default());
    let result = router.navigate_by_url("/nope").await;
    assert!(matches!(result, Err(RouterError::NoMatch { .. })));
    // The committed state is untouched.
    assert_eq!(router.url(), "/");
    assert!(!router.navigated());
}

#[tokio::test]
async fn should_fall_back_to_the_wildcard_route() {
    let router = Router::new(
        vec![Route::new("a").component(A), Route::new("**").component(C)],
        RouterConfig::default(),
    );
    assert!(router.navigate_by_url("/x/y").await.unwrap());
    assert_eq!(router.url(), "/x/y");
    let snapshot = router.router_state().snapshot.deepest_primary();
    assert_eq!(snapshot.component(), Some(C));
}

#[tokio::test]
async fn should_activate_empty_path_children() {
    let router = Router::new(
        vec![Route::new("a")
            .component(A)
            .children(vec![Route::new("").component(B)])],
        RouterConfig::default(),
    );
    assert!(router.navigate_by_url("/a").await.unwrap());
    assert_eq!(router.url(), "/a");
    let snapshot = router.router_state().snapshot.deepest_primary();
    assert_eq!(snapshot.component(), Some(B));
    assert!(snapshot.url.is_empty());
}

#[tokio::test]
async fn should_propagate_query_params_and_fragment_to_every_snapshot() {
    let router = Router::new(
        vec![Route::new("a")
            .component(A)
            .children(vec![Route::new("b").component(B)])],
        RouterConfig::default(),
    );
    assert!(router.navigate_by_url("/a/b?x=1#top").await.unwrap());

    let state = router.router_state();
    let leaf = state.snapshot.deepest_primary();
    assert_eq!(leaf.query_params.get("x"), Some(&ParamValue::Single("1".into())));
    assert_eq!(leaf.fragment.as_deref(), Some("top"));
    let parent = state.snapshot.parent_of(&leaf).expect("parent");
    assert_eq!(parent.query_params.get("x"), Some(&ParamValue::Single("1".into())));
}

#[tokio::test]
async fn should_inherit_params_from_a_componentless_parent() {
    let router = Router::new(
        vec![Route::new(":id").children(vec![Route::new("details").component(B)])],
        RouterConfig::default(),
    );
    assert!(router.navigate_by_url("/5/details").await.unwrap());
    let snapshot = router.router_state().snapshot.deepest_primary();
    assert_eq!(snapshot.component(), Some(B));
    assert_eq!(snapshot.param("id"), Some("5".to_string()));
}

#[tokio::test]
async fn should_not_inherit_past_a_component_parent_by_default() {
    let router = Router::new(
        vec![Route::new(":id")
            .component(A)
            .children(vec![Route::new("details").component(B)])],
        RouterConfig::default(),
    );
    assert!(router.navigate_by_url("/5/details").await.unwrap());
    let snapshot = router.router_state().snapshot.deepest_primary();
    assert_eq!(snapshot.param("id"), None);
}

#[tokio::test]
async fn should_inherit_everywhere_with_the_always_strategy() {
    let options = RouterConfig {
        params_inheritance: ParamsInheritanceStrategy::Always,
        ..RouterConfig::default()
    };
    let router = Router::new(
        vec![Route::new(":id")
            .component(A)
            .children(vec![Route::new("details").component(B)])],
        options,
    );
    assert!(router.navigate_by_url("/5/details").await.unwrap());
    let snapshot = router.router_state().snapshot.deepest_primary();
    assert_eq!(snapshot.param("id"), Some("5".to_string()));
}

#[tokio::test]
async fn should_merge_static_data_down_inheriting_chains() {
    let router = Router::new(
        vec![Route::new("a")
            .component(A)
            .data("section", serde_json::json!("left"))
            .children(vec![Route::new("")
                .component(B)
                .data("leaf", serde_json::json!(true))])],
        RouterConfig::default(),
    );
    assert!(router.navigate_by_url("/a").await.unwrap());
    let snapshot = router.router_state().snapshot.deepest_primary();
    let data = snapshot.data();
    assert_eq!(data.get("section"), Some(&serde_json::json!("left")));
    assert_eq!(data.get("leaf"), Some(&serde_json::json!(true)));
}

fn assert_same_tree(
    a: &TreeNode<Arc<ActivatedRouteSnapshot>>,
    b: &TreeNode<Arc<ActivatedRouteSnapshot>>,
) {
    assert_eq!(a.value.outlet, b.value.outlet);
    assert_eq!(a.value.params, b.value.params);
    assert_eq!(a.value.config_path(), b.value.config_path());
    assert_eq!(a.value.component(), b.value.component());
    assert_eq!(a.children.len(), b.children.len());
    for (a_child, b_child) in a.children.iter().zip(&b.children) {
        assert_same_tree(a_child, b_child);
    }
}

#[tokio::test]
async fn should_produce_the_same_snapshot_tree_when_recognizing_twice() {
    let options = RouterConfig {
        on_same_url_navigation: OnSameUrlNavigation::Reload,
        ..RouterConfig::default()
    };
    let router = Router::new(
        vec![Route::new("team/:id")
            .component(A)
            .children(vec![Route::new("details").component(B)])],
        options,
    );

    assert!(router.navigate_by_url("/team/3/details").await.unwrap());
    let first = router.router_state().snapshot.root.clone();
    assert!(router.navigate_by_url("/team/3/details").await.unwrap());
    let second = router.router_state().snapshot.root.clone();

    assert_same_tree(&first, &second);
}

#[tokio::test]
async fn should_swap_config_with_reset_config() {
    let router = Router::new(vec![Route::new("a").component(A)], RouterConfig::default());
    assert!(router.navigate_by_url("/a").await.unwrap());

    router.reset_config(vec![Route::new("b").component(B)]);
    assert!(matches!(
        router.navigate_by_url("/a").await,
        Err(RouterError::NoMatch { .. })
    ));
    assert!(router.navigate_by_url("/b").await.unwrap());
    assert_eq!(router.url(), "/b");
}
