//! Lazy Route Loading
//!
//! Corresponds to packages/router/src/router_config_loader.ts
//!
//! Load state lives in a side table keyed by route identity rather than in
//! mutable fields on the shared config. Loading is idempotent and memoized:
//! the first navigation to reach a route starts the load, concurrent
//! navigations await the same in-flight future, and a settled result is kept
//! permanently.

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::errors::RouterError;
use crate::events::{Event, EventSink};
use crate::models::{route_key, ComponentType, LoadedRouterConfig, Route};

type SharedLoad<T> = Shared<BoxFuture<'static, Result<T, RouterError>>>;

enum LoadState<T> {
    /// In flight, or settled with an error (the shared future replays it).
    Loading(SharedLoad<T>),
    Loaded(T),
}

#[derive(Default)]
pub struct RouterConfigLoader {
    children: Mutex<HashMap<usize, LoadState<LoadedRouterConfig>>>,
    components: Mutex<HashMap<usize, LoadState<ComponentType>>>,
}

impl RouterConfigLoader {
    pub fn new() -> Self {
        RouterConfigLoader::default()
    }

    /// The already-loaded child config, when a previous navigation settled
    /// the load.
    pub fn loaded_children(&self, route: &Arc<Route>) -> Option<LoadedRouterConfig> {
        let table = self.children.lock().expect("loader table lock poisoned");
        match table.get(&route_key(route)) {
            Some(LoadState::Loaded(config)) => Some(config.clone()),
            _ => None,
        }
    }

    /// Load (or join the in-flight load of) a route's lazy children.
    pub async fn load_children(
        &self,
        route: &Arc<Route>,
        events: &EventSink,
        navigation_id: usize,
    ) -> Result<LoadedRouterConfig, RouterError> {
        let key = route_key(route);
        let (shared, initiated) = {
            let mut table = self.children.lock().expect("loader table lock poisoned");
            match table.get(&key) {
                Some(LoadState::Loaded(config)) => return Ok(config.clone()),
                Some(LoadState::Loading(shared)) => (shared.clone(), false),
                None => {
                    let loader =
                        route
                            .load_children
                            .clone()
                            .ok_or_else(|| RouterError::LoadFailure {
                                path: route.path_display(),
                                message: "route has no loadChildren".to_string(),
                            })?;
                    let shared: SharedLoad<LoadedRouterConfig> = loader().boxed().shared();
                    table.insert(key, LoadState::Loading(shared.clone()));
                    (shared, true)
                }
            }
        };

        if initiated {
            debug!(path = %route.path_display(), navigation_id, "loading lazy route configuration");
            events.emit(Event::RouteConfigLoadStart {
                id: navigation_id,
                path: route.path_display(),
            });
        }

        let result = shared.await;
        if let Ok(config) = &result {
            let mut table = self.children.lock().expect("loader table lock poisoned");
            table.insert(key, LoadState::Loaded(config.clone()));
            if initiated {
                events.emit(Event::RouteConfigLoadEnd {
                    id: navigation_id,
                    path: route.path_display(),
                });
            }
        }
        result
    }

    /// Load (or join the in-flight load of) a route's lazy component.
    pub async fn load_component(
        &self,
        route: &Arc<Route>,
    ) -> Result<ComponentType, RouterError> {
        let key = route_key(route);
        let shared = {
            let mut table = self.components.lock().expect("loader table lock poisoned");
            match table.get(&key) {
                Some(LoadState::Loaded(component)) => return Ok(*component),
                Some(LoadState::Loading(shared)) => shared.clone(),
                None => {
                    let loader =
                        route
                            .load_component
                            .clone()
                            .ok_or_else(|| RouterError::LoadFailure {
                                path: route.path_display(),
                                message: "route has no loadComponent".to_string(),
                            })?;
                    let shared: SharedLoad<ComponentType> = loader().boxed().shared();
                    table.insert(key, LoadState::Loading(shared.clone()));
                    shared
                }
            }
        };

        let result = shared.await;
        if let Ok(component) = &result {
            let mut table = self.components.lock().expect("loader table lock poisoned");
            table.insert(key, LoadState::Loaded(*component));
        }
        result
    }

    /// The loaded component for a route, when already settled.
    pub fn loaded_component(&self, route: &Arc<Route>) -> Option<ComponentType> {
        let table = self.components.lock().expect("loader table lock poisoned");
        match table.get(&route_key(route)) {
            Some(LoadState::Loaded(component)) => Some(*component),
            _ => None,
        }
    }
}

impl std::fmt::Debug for RouterConfigLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterConfigLoader").finish_non_exhaustive()
    }
}
