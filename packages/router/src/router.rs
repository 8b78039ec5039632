//! Router Facade
//!
//! Corresponds to packages/router/src/router.ts
//!
//! Thin surface over the transition pipeline: URL parsing/serialization,
//! command-based tree construction, the event stream, and config swaps. All
//! navigation semantics live in `navigation_transition`.

use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::create_url_tree::{create_url_tree, UrlCommand};
use crate::errors::RouterError;
use crate::events::{Event, EventSink, NavigationTrigger};
use crate::injector::Injector;
use crate::models::{routes_of, ComponentType, Route};
use crate::navigation_transition::{
    NavigationExtras, NavigationTransitions, QueryParamsHandling, RouterConfig,
};
use crate::route_reuse_strategy::{DefaultRouteReuseStrategy, RouteReuseStrategy};
use crate::router_config_loader::RouterConfigLoader;
use crate::router_state::RouterState;
use crate::state_manager::{Location, MemoryLocation, RestoredState, StateManager};
use crate::url_handling_strategy::{DefaultUrlHandlingStrategy, UrlHandlingStrategy};
use crate::url_tree::{DefaultUrlSerializer, UrlSerializer, UrlTree};

/// Pluggable collaborators, defaulted for library use and overridable in
/// tests.
pub struct RouterParts {
    pub serializer: Arc<dyn UrlSerializer>,
    pub location: Arc<dyn Location>,
    pub reuse_strategy: Arc<dyn RouteReuseStrategy>,
    pub url_handling_strategy: Arc<dyn UrlHandlingStrategy>,
    pub injector: Arc<Injector>,
    pub root_component: Option<ComponentType>,
}

impl Default for RouterParts {
    fn default() -> Self {
        RouterParts {
            serializer: Arc::new(DefaultUrlSerializer),
            location: Arc::new(MemoryLocation::new()),
            reuse_strategy: Arc::new(DefaultRouteReuseStrategy),
            url_handling_strategy: Arc::new(DefaultUrlHandlingStrategy),
            injector: Arc::new(Injector::new()),
            root_component: None,
        }
    }
}

/// The public entry point. Requires a tokio runtime; the transition queue
/// is consumed by a spawned actor task for the router's lifetime.
pub struct Router {
    serializer: Arc<dyn UrlSerializer>,
    state_manager: Arc<StateManager>,
    transitions: Arc<NavigationTransitions>,
    events: EventSink,
}

impl Router {
    pub fn new(routes: Vec<Route>, options: RouterConfig) -> Self {
        Router::with_parts(routes, options, RouterParts::default())
    }

    pub fn with_parts(routes: Vec<Route>, options: RouterConfig, parts: RouterParts) -> Self {
        let events = EventSink::new();
        let state_manager = Arc::new(StateManager::new(
            parts.serializer.clone(),
            parts.location,
            parts.root_component,
        ));
        let transitions = NavigationTransitions::new(
            parts.serializer.clone(),
            routes_of(routes),
            parts.root_component,
            parts.injector,
            Arc::new(RouterConfigLoader::new()),
            events.clone(),
            state_manager.clone(),
            parts.reuse_strategy,
            parts.url_handling_strategy,
            options,
        );
        Router {
            serializer: parts.serializer,
            state_manager,
            transitions,
            events,
        }
    }

    /// The serialized committed URL.
    pub fn url(&self) -> String {
        self.state_manager.url()
    }

    /// The live route tree of the last committed navigation.
    pub fn router_state(&self) -> Arc<RouterState> {
        self.state_manager.router_state()
    }

    /// Whether at least one navigation has succeeded.
    pub fn navigated(&self) -> bool {
        self.transitions.navigated()
    }

    /// Subscribe to router events from this point on.
    pub fn events(&self) -> UnboundedReceiver<Event> {
        self.events.subscribe()
    }

    /// Replace the route configuration. In-flight navigations keep the
    /// config they started with; subsequent ones use the new one.
    pub fn reset_config(&self, routes: Vec<Route>) {
        self.transitions.set_config(routes_of(routes));
    }

    pub fn parse_url(&self, url: &str) -> Result<UrlTree, RouterError> {
        self.serializer.parse(url)
    }

    pub fn serialize_url(&self, tree: &UrlTree) -> String {
        self.serializer.serialize(tree)
    }

    /// Navigate to a URL string with default extras.
    pub async fn navigate_by_url(&self, url: &str) -> Result<bool, RouterError> {
        self.navigate_by_url_with_extras(url, NavigationExtras::default())
            .await
    }

    pub async fn navigate_by_url_with_extras(
        &self,
        url: &str,
        extras: NavigationExtras,
    ) -> Result<bool, RouterError> {
        let tree = self.serializer.parse(url)?;
        self.navigate_to_tree(tree, extras, NavigationTrigger::Imperative, None)
            .await
    }

    /// Navigate with a command list, resolved relative to
    /// `extras.relative_to` (or the root).
    pub async fn navigate(
        &self,
        commands: &[UrlCommand],
        extras: NavigationExtras,
    ) -> Result<bool, RouterError> {
        let tree = self.create_url_tree(commands, &extras)?;
        self.navigate_to_tree(tree, extras, NavigationTrigger::Imperative, None)
            .await
    }

    /// Build the target tree for a command list without navigating.
    pub fn create_url_tree(
        &self,
        commands: &[UrlCommand],
        extras: &NavigationExtras,
    ) -> Result<UrlTree, RouterError> {
        let current = self.state_manager.current_url_tree();
        let query_params = match extras.query_params_handling {
            QueryParamsHandling::Replace => extras.query_params.clone(),
            QueryParamsHandling::Preserve => Some(current.query_params.clone()),
            QueryParamsHandling::Merge => {
                let mut merged = current.query_params.clone();
                if let Some(provided) = &extras.query_params {
                    for (k, v) in provided {
                        merged.insert(k.clone(), v.clone());
                    }
                }
                Some(merged)
            }
        };
        let state = self.state_manager.router_state();
        create_url_tree(
            &current,
            Some(&state.snapshot),
            extras.relative_to.as_ref(),
            commands,
            query_params,
            extras.fragment.clone(),
        )
    }

    /// Queue a navigation for an already-built tree.
    pub async fn navigate_to_tree(
        &self,
        tree: UrlTree,
        extras: NavigationExtras,
        trigger: NavigationTrigger,
        restored: Option<RestoredState>,
    ) -> Result<bool, RouterError> {
        let rx = self
            .transitions
            .request_navigation(tree, extras, trigger, restored);
        rx.await.unwrap_or(Err(RouterError::RouterDestroyed))
    }

    /// Abort the in-flight navigation, if any; it settles as cancelled.
    pub fn abort_current_navigation(&self) {
        self.transitions.abort_in_flight();
    }

    /// The currently applied route configuration is owned by the transition
    /// pipeline; tests reach the location through here.
    pub fn location(&self) -> Arc<dyn Location> {
        self.state_manager.location()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("url", &self.url())
            .field("navigated", &self.navigated())
            .finish_non_exhaustive()
    }
}
