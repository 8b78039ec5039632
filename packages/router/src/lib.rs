#![deny(clippy::all)]

/**
 * Angular Router - Rust Implementation
 *
 * The navigation transition pipeline of the Angular Router: URL parsing,
 * route matching with redirects and guards, data resolution, and live
 * router state, orchestrated through a single-consumer async pipeline.
 */

// Core modules (root level - mirrors packages/router/src/*.ts)
pub mod abort;
mod apply_redirects;
pub mod config_matching;
mod create_router_state;
pub mod create_url_tree;
pub mod errors;
pub mod events;
mod guards;
pub mod injector;
pub mod models;
pub mod navigation_transition;
mod recognize;
mod resolve_data;
pub mod route_reuse_strategy;
pub mod router;
pub mod router_config_loader;
pub mod router_state;
pub mod shared;
pub mod state_manager;
pub mod tree;
pub mod url_handling_strategy;
pub mod url_tree;

// Re-exports
pub use create_url_tree::UrlCommand;
pub use errors::RouterError;
pub use events::{
    Event, NavigationCancellationCode, NavigationSkippedCode, NavigationTrigger,
};
pub use models::{
    guard_fn, load_children_fn, load_component_fn, resolve_fn, routes_of, ComponentType,
    GuardResult, LoadedRouterConfig, PathMatch, RedirectCommand, Route, Routes,
};
pub use navigation_transition::{
    NavigationExtras, OnSameUrlNavigation, QueryParamsHandling, RouterConfig,
};
pub use router::{Router, RouterParts};
pub use router_state::{
    ActivatedRoute, ActivatedRouteSnapshot, ParamsInheritanceStrategy, RouterState,
    RouterStateSnapshot,
};
pub use shared::{ParamValue, Params, PRIMARY_OUTLET};
pub use url_tree::{
    contains_tree, DefaultUrlSerializer, UrlSegment, UrlSegmentGroup, UrlSerializer, UrlTree,
};
