//! Guard execution integration tests.
//!
//! Corresponds to packages/router/test/integration/guards.spec.ts

use std::sync::{Arc, Mutex};

use angular_router::models::{
    guard_fn, CanActivateContext, CanDeactivateContext, CanMatchContext, ComponentType,
    GuardResult, RedirectCommand, Route,
};
use angular_router::navigation_transition::RouterConfig;
use angular_router::router::{Router, RouterParts};
use angular_router::url_tree::{DefaultUrlSerializer, UrlSerializer};
use angular_router::{
    Event, NavigationCancellationCode, RouterError,
};

const A: ComponentType = ComponentType("A");
const B: ComponentType = ComponentType("B");
const LOGIN: ComponentType = ComponentType("Login");

type Log = Arc<Mutex<Vec<&'static str>>>;

fn log_of(log: &Log) -> Vec<&'static str> {
    log.lock().unwrap().clone()
}

fn redirect_command(url: &str) -> GuardResult {
    let tree = DefaultUrlSerializer.parse(url).unwrap();
    GuardResult::Redirect(RedirectCommand::new(tree))
}

fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn should_navigate_when_all_guards_allow() {
    let routes = vec![Route::new("a")
        .component(A)
        .can_activate(guard_fn(|_: CanActivateContext| async {
            GuardResult::Allow
        }))];
    let router = Router::new(routes, RouterConfig::default());
    assert!(router.navigate_by_url("/a").await.unwrap());
    assert_eq!(router.url(), "/a");
}

#[tokio::test]
async fn should_cancel_when_a_guard_rejects() {
    let routes = vec![Route::new("a")
        .component(A)
        .can_activate(guard_fn(|_: CanActivateContext| async {
            GuardResult::Reject
        }))];
    let router = Router::new(routes, RouterConfig::default());
    let mut rx = router.events();

    assert!(!router.navigate_by_url("/a").await.unwrap());
    assert_eq!(router.url(), "/");

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        Event::NavigationCancel {
            code: NavigationCancellationCode::GuardRejected,
            ..
        }
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        Event::GuardsCheckEnd {
            should_activate: false,
            ..
        }
    )));
}

#[tokio::test]
async fn should_prefer_a_redirect_over_a_rejection_in_the_same_guard_set() {
    let routes = vec![
        Route::new("a")
            .component(A)
            .can_activate(guard_fn(|_: CanActivateContext| async {
                GuardResult::Reject
            }))
            .can_activate(guard_fn(|_: CanActivateContext| async {
                redirect_command("/login")
            })),
        Route::new("login").component(LOGIN),
    ];
    let router = Router::new(routes, RouterConfig::default());
    // The caller's promise follows the redirect to its conclusion.
    assert!(router.navigate_by_url("/a").await.unwrap());
    assert_eq!(router.url(), "/login");
}

#[tokio::test]
async fn should_run_deactivation_checks_before_activation_checks() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let deactivate_log = log.clone();
    let activate_log = log.clone();
    let routes = vec![
        Route::new("a")
            .component(A)
            .can_deactivate(guard_fn(move |_: CanDeactivateContext| {
                let log = deactivate_log.clone();
                async move {
                    log.lock().unwrap().push("deactivate a");
                    GuardResult::Allow
                }
            })),
        Route::new("b")
            .component(B)
            .can_activate(guard_fn(move |_: CanActivateContext| {
                let log = activate_log.clone();
                async move {
                    log.lock().unwrap().push("activate b");
                    GuardResult::Allow
                }
            })),
    ];
    let router = Router::new(routes, RouterConfig::default());
    assert!(router.navigate_by_url("/a").await.unwrap());
    assert!(router.navigate_by_url("/b").await.unwrap());
    assert_eq!(log_of(&log), vec!["deactivate a", "activate b"]);
}

#[tokio::test]
async fn should_not_run_activation_guards_when_deactivation_rejects() {
    let activations: Arc<Mutex<usize>> = Arc::new(Mutex::new(0));
    let activation_count = activations.clone();
    let routes = vec![
        Route::new("a")
            .component(A)
            .can_deactivate(guard_fn(|_: CanDeactivateContext| async {
                GuardResult::Reject
            })),
        Route::new("b")
            .component(B)
            .can_activate(guard_fn(move |_: CanActivateContext| {
                let count = activation_count.clone();
                async move {
                    *count.lock().unwrap() += 1;
                    GuardResult::Allow
                }
            })),
    ];
    let router = Router::new(routes, RouterConfig::default());
    assert!(router.navigate_by_url("/a").await.unwrap());
    let mut rx = router.events();

    assert!(!router.navigate_by_url("/b").await.unwrap());
    assert_eq!(router.url(), "/a");
    // Deactivation rejected before any activation guard could run.
    assert_eq!(*activations.lock().unwrap(), 0);

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        Event::NavigationCancel {
            code: NavigationCancellationCode::GuardRejected,
            ..
        }
    )));
}

#[tokio::test]
async fn should_run_can_activate_child_before_the_childs_own_can_activate() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let child_log = log.clone();
    let own_log = log.clone();
    let routes = vec![Route::new("p")
        .component(A)
        .can_activate_child(guard_fn(move |_: CanActivateContext| {
            let log = child_log.clone();
            async move {
                log.lock().unwrap().push("canActivateChild p");
                GuardResult::Allow
            }
        }))
        .children(vec![Route::new(":id").component(B).can_activate(guard_fn(
            move |_: CanActivateContext| {
                let log = own_log.clone();
                async move {
                    log.lock().unwrap().push("canActivate :id");
                    GuardResult::Allow
                }
            },
        ))])];
    let router = Router::new(routes, RouterConfig::default());
    assert!(router.navigate_by_url("/p/1").await.unwrap());
    assert_eq!(log_of(&log), vec!["canActivateChild p", "canActivate :id"]);
}

#[tokio::test]
async fn should_treat_a_can_match_rejection_as_a_structural_no_match() {
    let routes = vec![
        Route::new("a")
            .component(A)
            .can_match(guard_fn(|_: CanMatchContext| async {
                GuardResult::Reject
            })),
        Route::new("a").component(B),
    ];
    let router = Router::new(routes, RouterConfig::default());
    assert!(router.navigate_by_url("/a").await.unwrap());
    let snapshot = router.router_state().snapshot.deepest_primary();
    assert_eq!(snapshot.component(), Some(B));
}

#[tokio::test]
async fn should_redirect_from_can_match() {
    let routes = vec![
        Route::new("a")
            .component(A)
            .can_match(guard_fn(|_: CanMatchContext| async {
                redirect_command("/login")
            })),
        Route::new("login").component(LOGIN),
    ];
    let router = Router::new(routes, RouterConfig::default());
    assert!(router.navigate_by_url("/a").await.unwrap());
    assert_eq!(router.url(), "/login");
}

#[tokio::test]
async fn should_cancel_the_navigation_when_can_load_rejects() {
    let routes = vec![Route::new("lazy")
        .can_load(guard_fn(|_: CanMatchContext| async { GuardResult::Reject }))
        .load_children(angular_router::models::load_children_fn(|| async {
            Ok(angular_router::models::LoadedRouterConfig {
                routes: angular_router::models::routes_of(vec![
                    Route::new("").component(B)
                ]),
                injector: None,
            })
        }))];
    let router = Router::new(routes, RouterConfig::default());
    let result = router.navigate_by_url("/lazy").await;
    assert!(matches!(result, Err(RouterError::CanLoadRejected { .. })));
    assert_eq!(router.url(), "/");
}

#[tokio::test]
async fn should_hand_the_consumed_segments_to_can_load() {
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_segments = seen.clone();
    let routes = vec![Route::new("lazy/:id")
        .can_load(guard_fn(move |ctx: CanMatchContext| {
            let seen = seen_segments.clone();
            async move {
                *seen.lock().unwrap() = ctx.segments.iter().map(|s| s.path.clone()).collect();
                GuardResult::Allow
            }
        }))
        .load_children(angular_router::models::load_children_fn(|| async {
            Ok(angular_router::models::LoadedRouterConfig {
                routes: angular_router::models::routes_of(vec![
                    Route::new("").component(B)
                ]),
                injector: None,
            })
        }))];
    let router = Router::new(routes, RouterConfig::default());
    assert!(router.navigate_by_url("/lazy/7").await.unwrap());
    assert_eq!(*seen.lock().unwrap(), vec!["lazy".to_string(), "7".to_string()]);
}

#[tokio::test]
async fn should_surface_guard_errors_as_navigation_errors() {
    let routes = vec![Route::new("a")
        .component(A)
        .can_activate(guard_fn(|_: CanActivateContext| async {
            GuardResult::Error("boom".to_string())
        }))];
    let router = Router::new(routes, RouterConfig::default());
    let mut rx = router.events();

    let result = router.navigate_by_url("/a").await;
    assert_eq!(
        result,
        Err(RouterError::GuardFailure {
            message: "boom".to_string()
        })
    );
    let events = drain(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::NavigationError { .. })));
}

struct AuthService {
    logged_in: bool,
}

#[tokio::test]
async fn should_hand_the_injector_to_guards() {
    let mut injector = angular_router::injector::Injector::new();
    injector.provide(AuthService { logged_in: true });
    let parts = RouterParts {
        injector: Arc::new(injector),
        ..RouterParts::default()
    };

    let routes = vec![Route::new("a").component(A).can_activate(guard_fn(
        |ctx: CanActivateContext| async move {
            let logged_in = ctx
                .injector
                .get::<AuthService>()
                .map(|auth| auth.logged_in)
                .unwrap_or(false);
            GuardResult::from(logged_in)
        },
    ))];
    let router = Router::with_parts(routes, RouterConfig::default(), parts);
    assert!(router.navigate_by_url("/a").await.unwrap());
}

#[tokio::test]
async fn should_rerun_guards_on_the_kept_node_when_params_change() {
    let count: Arc<Mutex<usize>> = Arc::new(Mutex::new(0));
    let guard_count = count.clone();
    let routes = vec![Route::new("users/:id").component(A).can_activate(guard_fn(
        move |_: CanActivateContext| {
            let count = guard_count.clone();
            async move {
                *count.lock().unwrap() += 1;
                GuardResult::Allow
            }
        },
    ))];
    let router = Router::new(routes, RouterConfig::default());

    assert!(router.navigate_by_url("/users/1").await.unwrap());
    assert_eq!(*count.lock().unwrap(), 1);
    // Param change on the same config re-runs the guard on the kept node.
    assert!(router.navigate_by_url("/users/2").await.unwrap());
    assert_eq!(*count.lock().unwrap(), 2);
}
