//! Redirect handling integration tests.
//!
//! Corresponds to packages/router/test/apply_redirects.spec.ts

use angular_router::models::{ComponentType, Route};
use angular_router::navigation_transition::RouterConfig;
use angular_router::router::Router;
use angular_router::RouterError;

const HOME: ComponentType = ComponentType("Home");
const PERSON: ComponentType = ComponentType("Person");
const N: ComponentType = ComponentType("N");
const C: ComponentType = ComponentType("C");

#[tokio::test]
async fn should_follow_a_relative_redirect() {
    let router = Router::new(
        vec![
            Route::new("old").redirect_to("new"),
            Route::new("new").component(N),
        ],
        RouterConfig::default(),
    );
    assert!(router.navigate_by_url("/old").await.unwrap());
    assert_eq!(router.url(), "/new");
    let snapshot = router.router_state().snapshot.deepest_primary();
    assert_eq!(snapshot.component(), Some(N));
}

#[tokio::test]
async fn should_splice_remaining_segments_after_a_relative_redirect() {
    let router = Router::new(
        vec![
            Route::new("a").redirect_to("b"),
            Route::new("b").children(vec![Route::new("c").component(C)]),
        ],
        RouterConfig::default(),
    );
    assert!(router.navigate_by_url("/a/c").await.unwrap());
    assert_eq!(router.url(), "/b/c");
    let snapshot = router.router_state().snapshot.deepest_primary();
    assert_eq!(snapshot.component(), Some(C));
}

#[tokio::test]
async fn should_substitute_params_in_absolute_redirects() {
    let router = Router::new(
        vec![
            Route::new("users/:id").redirect_to("/people/:id"),
            Route::new("people/:id").component(PERSON),
        ],
        RouterConfig::default(),
    );
    assert!(router.navigate_by_url("/users/7").await.unwrap());
    assert_eq!(router.url(), "/people/7");
    let snapshot = router.router_state().snapshot.deepest_primary();
    assert_eq!(snapshot.param("id"), Some("7".to_string()));
}

#[tokio::test]
async fn should_carry_matrix_params_through_a_redirect() {
    let router = Router::new(
        vec![
            Route::new("users/:id").redirect_to("/people/:id"),
            Route::new("people/:id").component(PERSON),
        ],
        RouterConfig::default(),
    );
    assert!(router.navigate_by_url("/users/7;sort=asc").await.unwrap());
    assert_eq!(router.url(), "/people/7;sort=asc");
    let snapshot = router.router_state().snapshot.deepest_primary();
    assert_eq!(snapshot.param("sort"), Some("asc".to_string()));
}

#[tokio::test]
async fn should_carry_query_params_across_absolute_redirects() {
    let router = Router::new(
        vec![
            Route::new("users/:id").redirect_to("/people/:id"),
            Route::new("people/:id").component(PERSON),
        ],
        RouterConfig::default(),
    );
    assert!(router.navigate_by_url("/users/7?tab=posts").await.unwrap());
    assert_eq!(router.url(), "/people/7?tab=posts");
}

#[tokio::test]
async fn should_redirect_the_empty_url_to_a_default_route() {
    let router = Router::new(
        vec![
            Route::new("").redirect_to("home").path_match_full(),
            Route::new("home").component(HOME),
        ],
        RouterConfig::default(),
    );
    assert!(router.navigate_by_url("/").await.unwrap());
    assert_eq!(router.url(), "/home");
    let snapshot = router.router_state().snapshot.deepest_primary();
    assert_eq!(snapshot.component(), Some(HOME));
}

#[tokio::test]
async fn should_detect_redirect_cycles() {
    let router = Router::new(
        vec![
            Route::new("a").redirect_to("/b"),
            Route::new("b").redirect_to("/a"),
        ],
        RouterConfig::default(),
    );
    let result = router.navigate_by_url("/a").await;
    assert!(matches!(result, Err(RouterError::InfiniteRedirect { .. })));
    assert_eq!(router.url(), "/");
}

#[tokio::test]
async fn should_reject_named_outlets_in_relative_redirects() {
    let router = Router::new(
        vec![
            Route::new("old").redirect_to("new(aux:side)"),
            Route::new("new").component(N),
        ],
        RouterConfig::default(),
    );
    let result = router.navigate_by_url("/old").await;
    assert!(matches!(
        result,
        Err(RouterError::NamedOutletRedirect { .. })
    ));
}

#[tokio::test]
async fn should_not_follow_redirects_after_a_relative_redirect_resolved() {
    // The spliced segments are re-matched with redirects disabled, so a
    // redirect route earlier in the config cannot loop.
    let router = Router::new(
        vec![
            Route::new("a").redirect_to("b"),
            Route::new("b").redirect_to("a"),
        ],
        RouterConfig::default(),
    );
    let result = router.navigate_by_url("/a").await;
    assert!(matches!(result, Err(RouterError::NoMatch { .. })));
}
