//! Guard Execution
//!
//! Corresponds to packages/router/src/operators/check_guards.ts and
//! packages/router/src/utils/preactivation.ts
//!
//! Ordering is load-bearing: every `canDeactivate` check of the routes being
//! torn down completes before any `canActivate` check runs, so a deactivation
//! veto never lets new state be entered. Within one concurrently-evaluated
//! guard set, a redirect outranks a plain rejection.

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::abort::AbortSignal;
use crate::errors::RouterError;
use crate::events::{Event, EventSink};
use crate::injector::Injector;
use crate::models::{
    BoxGuardFuture, CanActivateContext, CanDeactivateContext, CanMatchContext, GuardResult, Route,
    same_route_config,
};
use crate::router_state::{ActivatedRouteSnapshot, RouterStateSnapshot};
use crate::shared::params_eq;
use crate::tree::TreeNode;
use crate::url_tree::{UrlSegment, UrlTree};

/// The collapsed decision of one or more guards.
#[derive(Debug, Clone)]
pub(crate) enum GuardsOutcome {
    Allow,
    Reject,
    Redirect(UrlTree),
    Error(RouterError),
}

impl GuardsOutcome {
    pub fn is_allow(&self) -> bool {
        matches!(self, GuardsOutcome::Allow)
    }
}

/// Evaluate one set of guards concurrently, racing the whole set against the
/// navigation's abort signal. An aborted evaluation collapses to `Reject`
/// rather than hanging the transition. Priority: error, then the first
/// redirect in declaration order, then rejection.
pub(crate) async fn evaluate_guard_set(
    futures: Vec<BoxGuardFuture>,
    abort: Option<&AbortSignal>,
) -> GuardsOutcome {
    if futures.is_empty() {
        return GuardsOutcome::Allow;
    }
    let joined = join_all(futures);
    let results: Vec<GuardResult> = match abort {
        Some(signal) => {
            tokio::select! {
                _ = signal.cancelled() => return GuardsOutcome::Reject,
                results = joined => results,
            }
        }
        None => joined.await,
    };
    collapse(results)
}

fn collapse(results: Vec<GuardResult>) -> GuardsOutcome {
    let mut rejected = false;
    let mut redirect: Option<UrlTree> = None;
    for result in results {
        match result {
            GuardResult::Allow => {}
            GuardResult::Reject => rejected = true,
            GuardResult::Redirect(command) => {
                if redirect.is_none() {
                    redirect = Some(command.url_tree);
                }
            }
            GuardResult::Error(message) => {
                return GuardsOutcome::Error(RouterError::GuardFailure { message });
            }
        }
    }
    if let Some(url_tree) = redirect {
        GuardsOutcome::Redirect(url_tree)
    } else if rejected {
        GuardsOutcome::Reject
    } else {
        GuardsOutcome::Allow
    }
}

/// Run a route's `canMatch` guards. A rejection makes this route act as a
/// structural no-match; a redirect cancels the navigation with a new target.
pub(crate) async fn run_can_match_guards(
    injector: Arc<Injector>,
    route: &Arc<Route>,
    segments: &[UrlSegment],
    abort: Option<&AbortSignal>,
) -> GuardsOutcome {
    let futures: Vec<BoxGuardFuture> = route
        .can_match
        .iter()
        .map(|guard| {
            guard(CanMatchContext {
                route: route.clone(),
                segments: segments.to_vec(),
                injector: injector.clone(),
            })
        })
        .collect();
    evaluate_guard_set(futures, abort).await
}

/// Run a route's `canLoad` guards before its lazy children are fetched.
pub(crate) async fn run_can_load_guards(
    injector: Arc<Injector>,
    route: &Arc<Route>,
    segments: &[UrlSegment],
    abort: Option<&AbortSignal>,
) -> GuardsOutcome {
    let futures: Vec<BoxGuardFuture> = route
        .can_load
        .iter()
        .map(|guard| {
            guard(CanMatchContext {
                route: route.clone(),
                segments: segments.to_vec(),
                injector: injector.clone(),
            })
        })
        .collect();
    evaluate_guard_set(futures, abort).await
}

/// The guard checks derived from diffing the future snapshot tree against
/// the currently active one.
#[derive(Debug, Default)]
pub(crate) struct Checks {
    /// Routes being torn down, deepest first.
    pub can_deactivate: Vec<Arc<ActivatedRouteSnapshot>>,
    /// Root-to-node paths of routes being (re)activated, in activation
    /// order.
    pub can_activate: Vec<Vec<Arc<ActivatedRouteSnapshot>>>,
}

/// Diff the trees and collect which nodes need deactivation checks and which
/// need activation checks. Nodes kept with an unchanged config and unchanged
/// params carry their data/resolve results over instead of re-running.
pub(crate) fn get_all_route_guards(
    future: &RouterStateSnapshot,
    current: &RouterStateSnapshot,
) -> Checks {
    let mut checks = Checks::default();
    let future_path = vec![future.root.value.clone()];
    get_child_route_guards(
        &future.root,
        Some(&current.root),
        &future_path,
        &mut checks,
    );
    checks
}

fn node_children_by_outlet<'t>(
    node: Option<&'t TreeNode<Arc<ActivatedRouteSnapshot>>>,
) -> HashMap<String, &'t TreeNode<Arc<ActivatedRouteSnapshot>>> {
    let mut map = HashMap::new();
    if let Some(node) = node {
        for child in &node.children {
            map.insert(child.value.outlet.clone(), child);
        }
    }
    map
}

fn get_child_route_guards(
    future_node: &TreeNode<Arc<ActivatedRouteSnapshot>>,
    current_node: Option<&TreeNode<Arc<ActivatedRouteSnapshot>>>,
    future_path: &[Arc<ActivatedRouteSnapshot>],
    checks: &mut Checks,
) {
    let mut prev_children = node_children_by_outlet(current_node);
    for child in &future_node.children {
        let mut path = future_path.to_vec();
        path.push(child.value.clone());
        let prev = prev_children.remove(&child.value.outlet);
        get_route_guards(child, prev, &path, checks);
    }
    // Everything left in the previous tree is being torn down.
    for (_, prev) in prev_children {
        deactivate_route_and_its_children(prev, checks);
    }
}

fn get_route_guards(
    future_node: &TreeNode<Arc<ActivatedRouteSnapshot>>,
    current_node: Option<&TreeNode<Arc<ActivatedRouteSnapshot>>>,
    future_path: &[Arc<ActivatedRouteSnapshot>],
    checks: &mut Checks,
) {
    let future = &future_node.value;
    let current = current_node.map(|n| &n.value);

    match current {
        Some(current)
            if same_route_config(future.route_config.as_ref(), current.route_config.as_ref()) =>
        {
            let should_run = !equal_params_and_url_segments(current, future);
            if should_run {
                checks.can_activate.push(future_path.to_vec());
            } else {
                // Nothing changed for this node; carry results over.
                future.set_resolved_data(current.resolved_data());
                future.set_data(current.data());
            }
            get_child_route_guards(future_node, current_node, future_path, checks);
            let has_deactivate = current
                .route_config
                .as_ref()
                .map(|r| !r.can_deactivate.is_empty())
                .unwrap_or(false);
            if should_run && has_deactivate {
                checks.can_deactivate.push(current.clone());
            }
        }
        _ => {
            if let Some(current_node) = current_node {
                deactivate_route_and_its_children(current_node, checks);
            }
            checks.can_activate.push(future_path.to_vec());
            get_child_route_guards(future_node, None, future_path, checks);
        }
    }
}

fn deactivate_route_and_its_children(
    node: &TreeNode<Arc<ActivatedRouteSnapshot>>,
    checks: &mut Checks,
) {
    for child in &node.children {
        deactivate_route_and_its_children(child, checks);
    }
    checks.can_deactivate.push(node.value.clone());
}

fn equal_params_and_url_segments(
    a: &Arc<ActivatedRouteSnapshot>,
    b: &Arc<ActivatedRouteSnapshot>,
) -> bool {
    a.url == b.url && params_eq(&a.params, &b.params)
}

/// Run every collected check: all deactivations first, then activations in
/// order, firing the activation lifecycle events along the way.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn check_guards(
    checks: &Checks,
    future_state: &Arc<RouterStateSnapshot>,
    current_state: &Arc<RouterStateSnapshot>,
    root_injector: &Arc<Injector>,
    events: &EventSink,
    navigation_id: usize,
    abort: &AbortSignal,
) -> GuardsOutcome {
    let deactivation =
        run_can_deactivate_checks(checks, future_state, current_state, root_injector, abort).await;
    if !deactivation.is_allow() {
        debug!(navigation_id, "canDeactivate vetoed the navigation");
        return deactivation;
    }
    run_can_activate_checks(
        checks,
        future_state,
        root_injector,
        events,
        navigation_id,
        abort,
    )
    .await
}

async fn run_can_deactivate_checks(
    checks: &Checks,
    future_state: &Arc<RouterStateSnapshot>,
    current_state: &Arc<RouterStateSnapshot>,
    root_injector: &Arc<Injector>,
    abort: &AbortSignal,
) -> GuardsOutcome {
    let mut futures: Vec<BoxGuardFuture> = Vec::new();
    for snapshot in &checks.can_deactivate {
        let Some(config) = snapshot.route_config.as_ref() else {
            continue;
        };
        let injector = snapshot
            .route_injector()
            .unwrap_or_else(|| root_injector.clone());
        for guard in &config.can_deactivate {
            futures.push(guard(CanDeactivateContext {
                route: snapshot.clone(),
                current_state: current_state.clone(),
                next_state: future_state.clone(),
                injector: injector.clone(),
            }));
        }
    }
    evaluate_guard_set(futures, Some(abort)).await
}

async fn run_can_activate_checks(
    checks: &Checks,
    future_state: &Arc<RouterStateSnapshot>,
    root_injector: &Arc<Injector>,
    events: &EventSink,
    navigation_id: usize,
    abort: &AbortSignal,
) -> GuardsOutcome {
    for path in &checks.can_activate {
        let Some(snapshot) = path.last() else {
            continue;
        };
        // Lifecycle events fire whether or not any guard is registered;
        // they observe, they do not veto.
        if let Some(parent) = path.len().checked_sub(2).and_then(|i| path.get(i)) {
            events.emit(Event::ChildActivationStart {
                id: navigation_id,
                path: parent.config_path(),
            });
        }
        events.emit(Event::ActivationStart {
            id: navigation_id,
            path: snapshot.config_path(),
            outlet: snapshot.outlet.clone(),
        });

        let outcome = run_can_activate_child(path, future_state, root_injector, abort).await;
        if !outcome.is_allow() {
            return outcome;
        }
        let outcome = run_can_activate(snapshot, future_state, root_injector, abort).await;
        if !outcome.is_allow() {
            return outcome;
        }
    }
    GuardsOutcome::Allow
}

/// `canActivateChild` guards of every ancestor, innermost to outermost; each
/// ancestor's set is evaluated concurrently, ancestors sequentially.
async fn run_can_activate_child(
    path: &[Arc<ActivatedRouteSnapshot>],
    future_state: &Arc<RouterStateSnapshot>,
    root_injector: &Arc<Injector>,
    abort: &AbortSignal,
) -> GuardsOutcome {
    let Some((node, ancestors)) = path.split_last() else {
        return GuardsOutcome::Allow;
    };
    for ancestor in ancestors.iter().rev() {
        let Some(config) = ancestor.route_config.as_ref() else {
            continue;
        };
        if config.can_activate_child.is_empty() {
            continue;
        }
        let injector = ancestor
            .route_injector()
            .unwrap_or_else(|| root_injector.clone());
        let futures: Vec<BoxGuardFuture> = config
            .can_activate_child
            .iter()
            .map(|guard| {
                guard(CanActivateContext {
                    route: node.clone(),
                    state: future_state.clone(),
                    injector: injector.clone(),
                })
            })
            .collect();
        let outcome = evaluate_guard_set(futures, Some(abort)).await;
        if !outcome.is_allow() {
            return outcome;
        }
    }
    GuardsOutcome::Allow
}

async fn run_can_activate(
    snapshot: &Arc<ActivatedRouteSnapshot>,
    future_state: &Arc<RouterStateSnapshot>,
    root_injector: &Arc<Injector>,
    abort: &AbortSignal,
) -> GuardsOutcome {
    let Some(config) = snapshot.route_config.as_ref() else {
        return GuardsOutcome::Allow;
    };
    let injector = snapshot
        .route_injector()
        .unwrap_or_else(|| root_injector.clone());
    let futures: Vec<BoxGuardFuture> = config
        .can_activate
        .iter()
        .map(|guard| {
            guard(CanActivateContext {
                route: snapshot.clone(),
                state: future_state.clone(),
                injector: injector.clone(),
            })
        })
        .collect();
    evaluate_guard_set(futures, Some(abort)).await
}
