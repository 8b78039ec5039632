//! Route Reuse Strategy
//!
//! Corresponds to packages/router/src/route_reuse_strategy.ts
//!
//! The extension point deciding whether a live route (and its component
//! subtree) survives a navigation or is recreated.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::models::same_route_config;
use crate::router_state::ActivatedRouteSnapshot;
use crate::tree::TreeNode;

/// A detached live subtree stored for later reattachment.
#[derive(Clone)]
pub struct DetachedRouteHandle {
    pub root: TreeNode<Arc<crate::router_state::ActivatedRoute>>,
}

pub trait RouteReuseStrategy: Send + Sync {
    /// Whether the route (and its subtree) should be detached and stored
    /// when it is deactivated.
    fn should_detach(&self, route: &Arc<ActivatedRouteSnapshot>) -> bool;

    /// Store a detached subtree. Passing `None` erases a previous store.
    fn store(&self, route: &Arc<ActivatedRouteSnapshot>, handle: Option<DetachedRouteHandle>);

    /// Whether a stored subtree should be reattached for this snapshot.
    fn should_attach(&self, route: &Arc<ActivatedRouteSnapshot>) -> bool;

    /// The stored subtree for this snapshot, if any.
    fn retrieve(&self, route: &Arc<ActivatedRouteSnapshot>) -> Option<DetachedRouteHandle>;

    /// Whether the live node backing `current` survives the navigation and
    /// has `future` swapped in, instead of being recreated.
    fn should_reuse_route(
        &self,
        future: &Arc<ActivatedRouteSnapshot>,
        current: &Arc<ActivatedRouteSnapshot>,
    ) -> bool;
}

/// Shared plumbing for strategies that never detach. Subclass-style reuse:
/// implementors only override `should_reuse_route`.
pub struct BaseRouteReuseStrategy;

impl RouteReuseStrategy for BaseRouteReuseStrategy {
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
        future: &Arc<ActivatedRouteSnapshot>,
        current: &Arc<ActivatedRouteSnapshot>,
    ) -> bool {
        same_route_config(future.route_config.as_ref(), current.route_config.as_ref())
    }
}

/// The default strategy: reuse exactly when the route config identity
/// matches; never detach.
pub struct DefaultRouteReuseStrategy;

impl RouteReuseStrategy for DefaultRouteReuseStrategy {
    fn should_detach(&self, route: &Arc<ActivatedRouteSnapshot>) -> bool {
        BaseRouteReuseStrategy.should_detach(route)
    }

    fn store(&self, route: &Arc<ActivatedRouteSnapshot>, handle: Option<DetachedRouteHandle>) {
        BaseRouteReuseStrategy.store(route, handle)
    }

    fn should_attach(&self, route: &Arc<ActivatedRouteSnapshot>) -> bool {
        BaseRouteReuseStrategy.should_attach(route)
    }

    fn retrieve(&self, route: &Arc<ActivatedRouteSnapshot>) -> Option<DetachedRouteHandle> {
        BaseRouteReuseStrategy.retrieve(route)
    }

    fn should_reuse_route(
        &self,
        future: &Arc<ActivatedRouteSnapshot>,
        current: &Arc<ActivatedRouteSnapshot>,
    ) -> bool {
        BaseRouteReuseStrategy.should_reuse_route(future, current)
    }
}

/// A config-path-keyed storing strategy, mainly useful in tests exercising
/// the detach/store/retrieve surface.
#[derive(Default)]
pub struct StoringRouteReuseStrategy {
    handles: Mutex<HashMap<String, DetachedRouteHandle>>,
}

impl RouteReuseStrategy for StoringRouteReuseStrategy {
    fn should_detach(&self, route: &Arc<ActivatedRouteSnapshot>) -> bool {
        route.route_config.is_some()
    }

    fn store(&self, route: &Arc<ActivatedRouteSnapshot>, handle: Option<DetachedRouteHandle>) {
        let mut handles = self.handles.lock().expect("reuse store lock poisoned");
        match handle {
            Some(handle) => {
                handles.insert(route.config_path(), handle);
            }
            None => {
                handles.remove(&route.config_path());
            }
        }
    }

    fn should_attach(&self, route: &Arc<ActivatedRouteSnapshot>) -> bool {
        self.handles
            .lock()
            .expect("reuse store lock poisoned")
            .contains_key(&route.config_path())
    }

    fn retrieve(&self, route: &Arc<ActivatedRouteSnapshot>) -> Option<DetachedRouteHandle> {
        self.handles
            .lock()
            .expect("reuse store lock poisoned")
            .get(&route.config_path())
            .cloned()
    }

    fn should_reuse_route(
        &self,
        future: &Arc<ActivatedRouteSnapshot>,
        current: &Arc<ActivatedRouteSnapshot>,
    ) -> bool {
        same_route_config(future.route_config.as_ref(), current.route_config.as_ref())
    }
}
