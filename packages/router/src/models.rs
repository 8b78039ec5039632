//! Route Configuration Model
//!
//! Corresponds to packages/router/src/models.ts
//!
//! Route configs are author-supplied, immutable after construction, and
//! shared as `Arc<Route>`; route identity (pointer equality) drives both the
//! lazy-load side-table and the default reuse strategy. Guards, resolvers
//! and loaders are plain functions returning boxed `Send` futures; first
//! value wins and evaluation is raced against the navigation's abort signal
//! by the callers.

use futures::future::BoxFuture;
use indexmap::IndexMap;
use std::future::Future;
use std::sync::Arc;

use crate::errors::RouterError;
use crate::injector::Injector;
use crate::router_state::{ActivatedRouteSnapshot, RouterStateSnapshot};
use crate::shared::{Data, PRIMARY_OUTLET};
use crate::url_tree::{UrlSegment, UrlSegmentGroup, UrlTree};

/// An opaque handle standing in for a component class. The router never
/// instantiates components; it only threads their identity through
/// snapshots and activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentType(pub &'static str);

impl ComponentType {
    pub fn name(&self) -> &'static str {
        self.0
    }
}

/// How much of the remaining URL a route's `path` must consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathMatch {
    #[default]
    Prefix,
    Full,
}

/// A guard's decision.
#[derive(Debug, Clone)]
pub enum GuardResult {
    Allow,
    Reject,
    /// Cancel this navigation and start a new one at the given URL.
    Redirect(RedirectCommand),
    /// The guard itself failed; surfaces as a navigation error.
    Error(String),
}

impl From<bool> for GuardResult {
    fn from(value: bool) -> Self {
        if value {
            GuardResult::Allow
        } else {
            GuardResult::Reject
        }
    }
}

/// A redirect requested by a guard or error handler.
#[derive(Debug, Clone)]
pub struct RedirectCommand {
    pub url_tree: UrlTree,
}

impl RedirectCommand {
    pub fn new(url_tree: UrlTree) -> Self {
        RedirectCommand { url_tree }
    }
}

pub type BoxGuardFuture = BoxFuture<'static, GuardResult>;

/// Arguments handed to `canActivate` / `canActivateChild` guards.
#[derive(Clone)]
pub struct CanActivateContext {
    pub route: Arc<ActivatedRouteSnapshot>,
    pub state: Arc<RouterStateSnapshot>,
    pub injector: Arc<Injector>,
}

/// Arguments handed to `canDeactivate` guards.
#[derive(Clone)]
pub struct CanDeactivateContext {
    pub route: Arc<ActivatedRouteSnapshot>,
    pub current_state: Arc<RouterStateSnapshot>,
    pub next_state: Arc<RouterStateSnapshot>,
    pub injector: Arc<Injector>,
}

/// Arguments handed to `canLoad` / `canMatch` guards.
#[derive(Clone)]
pub struct CanMatchContext {
    pub route: Arc<Route>,
    pub segments: Vec<UrlSegment>,
    pub injector: Arc<Injector>,
}

pub type CanActivateFn = Arc<dyn Fn(CanActivateContext) -> BoxGuardFuture + Send + Sync>;
pub type CanActivateChildFn = CanActivateFn;
pub type CanDeactivateFn = Arc<dyn Fn(CanDeactivateContext) -> BoxGuardFuture + Send + Sync>;
pub type CanLoadFn = Arc<dyn Fn(CanMatchContext) -> BoxGuardFuture + Send + Sync>;
pub type CanMatchFn = CanLoadFn;

/// Wrap an async closure as a guard function of any guard kind.
pub fn guard_fn<C, F, Fut>(f: F) -> Arc<dyn Fn(C) -> BoxGuardFuture + Send + Sync>
where
    F: Fn(C) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = GuardResult> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

/// Arguments handed to resolvers.
#[derive(Clone)]
pub struct ResolveContext {
    pub route: Arc<ActivatedRouteSnapshot>,
    pub state: Arc<RouterStateSnapshot>,
    pub injector: Arc<Injector>,
}

/// `Ok(None)` means the resolver completed without producing a value, which
/// cancels the navigation with `NoDataFromResolver`.
pub type ResolveOutput = Result<Option<serde_json::Value>, RouterError>;

pub type ResolveFn = Arc<dyn Fn(ResolveContext) -> BoxFuture<'static, ResolveOutput> + Send + Sync>;

/// Wrap an async closure as a resolver.
pub fn resolve_fn<F, Fut>(f: F) -> ResolveFn
where
    F: Fn(ResolveContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ResolveOutput> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

/// The result of loading a lazy child configuration.
#[derive(Clone)]
pub struct LoadedRouterConfig {
    pub routes: Vec<Arc<Route>>,
    pub injector: Option<Arc<Injector>>,
}

pub type LoadChildrenFn =
    Arc<dyn Fn() -> BoxFuture<'static, Result<LoadedRouterConfig, RouterError>> + Send + Sync>;
pub type LoadComponentFn =
    Arc<dyn Fn() -> BoxFuture<'static, Result<ComponentType, RouterError>> + Send + Sync>;

/// Wrap an async closure as a `loadChildren` implementation.
pub fn load_children_fn<F, Fut>(f: F) -> LoadChildrenFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<LoadedRouterConfig, RouterError>> + Send + 'static,
{
    Arc::new(move || Box::pin(f()))
}

/// Wrap an async closure as a `loadComponent` implementation.
pub fn load_component_fn<F, Fut>(f: F) -> LoadComponentFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ComponentType, RouterError>> + Send + 'static,
{
    Arc::new(move || Box::pin(f()))
}

/// The result of a custom URL matcher.
#[derive(Debug, Clone)]
pub struct UrlMatchResult {
    pub consumed: Vec<UrlSegment>,
    pub pos_params: IndexMap<String, UrlSegment>,
}

pub type UrlMatcherFn = Arc<
    dyn Fn(&[UrlSegment], &UrlSegmentGroup, &Route) -> Option<UrlMatchResult> + Send + Sync,
>;

/// One node of the author-supplied route configuration.
#[derive(Clone, Default)]
pub struct Route {
    /// The path template (`"users/:id"`, `""`, `"**"`). `None` when a
    /// custom `matcher` is used instead.
    pub path: Option<String>,
    pub matcher: Option<UrlMatcherFn>,
    pub path_match: PathMatch,
    pub outlet: Option<String>,
    pub component: Option<ComponentType>,
    pub redirect_to: Option<String>,
    pub can_activate: Vec<CanActivateFn>,
    pub can_activate_child: Vec<CanActivateChildFn>,
    pub can_deactivate: Vec<CanDeactivateFn>,
    pub can_load: Vec<CanLoadFn>,
    pub can_match: Vec<CanMatchFn>,
    pub resolve: IndexMap<String, ResolveFn>,
    pub data: Data,
    pub children: Vec<Arc<Route>>,
    pub load_children: Option<LoadChildrenFn>,
    pub load_component: Option<LoadComponentFn>,
}

impl Route {
    pub fn new(path: impl Into<String>) -> Self {
        Route {
            path: Some(path.into()),
            ..Route::default()
        }
    }

    pub fn with_matcher(matcher: UrlMatcherFn) -> Self {
        Route {
            matcher: Some(matcher),
            ..Route::default()
        }
    }

    pub fn component(mut self, component: ComponentType) -> Self {
        self.component = Some(component);
        self
    }

    pub fn outlet(mut self, outlet: impl Into<String>) -> Self {
        self.outlet = Some(outlet.into());
        self
    }

    pub fn redirect_to(mut self, target: impl Into<String>) -> Self {
        self.redirect_to = Some(target.into());
        self
    }

    pub fn path_match_full(mut self) -> Self {
        self.path_match = PathMatch::Full;
        self
    }

    pub fn children(mut self, children: Vec<Route>) -> Self {
        self.children = children.into_iter().map(Arc::new).collect();
        self
    }

    pub fn can_activate(mut self, guard: CanActivateFn) -> Self {
        self.can_activate.push(guard);
        self
    }

    pub fn can_activate_child(mut self, guard: CanActivateChildFn) -> Self {
        self.can_activate_child.push(guard);
        self
    }

    pub fn can_deactivate(mut self, guard: CanDeactivateFn) -> Self {
        self.can_deactivate.push(guard);
        self
    }

    pub fn can_load(mut self, guard: CanLoadFn) -> Self {
        self.can_load.push(guard);
        self
    }

    pub fn can_match(mut self, guard: CanMatchFn) -> Self {
        self.can_match.push(guard);
        self
    }

    pub fn resolve(mut self, key: impl Into<String>, resolver: ResolveFn) -> Self {
        self.resolve.insert(key.into(), resolver);
        self
    }

    pub fn data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    pub fn load_children(mut self, loader: LoadChildrenFn) -> Self {
        self.load_children = Some(loader);
        self
    }

    pub fn load_component(mut self, loader: LoadComponentFn) -> Self {
        self.load_component = Some(loader);
        self
    }

    /// The outlet this route fills; `primary` when unspecified.
    pub fn outlet_name(&self) -> &str {
        self.outlet.as_deref().unwrap_or(PRIMARY_OUTLET)
    }

    /// Whether this route's `path` is the empty string.
    pub fn is_empty_path(&self) -> bool {
        matches!(self.path.as_deref(), Some(""))
    }

    /// Display form of the path for events and errors.
    pub fn path_display(&self) -> String {
        self.path.clone().unwrap_or_else(|| "<matcher>".to_string())
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("outlet", &self.outlet_name())
            .field("component", &self.component)
            .field("redirect_to", &self.redirect_to)
            .field("children", &self.children.len())
            .field("lazy", &self.load_children.is_some())
            .finish()
    }
}

/// A full route configuration.
pub type Routes = Vec<Arc<Route>>;

/// Wrap plain `Route` values into a shared configuration.
pub fn routes_of(routes: Vec<Route>) -> Routes {
    routes.into_iter().map(Arc::new).collect()
}

/// Stable identity key of a route config node.
pub(crate) fn route_key(route: &Arc<Route>) -> usize {
    Arc::as_ptr(route) as usize
}

/// Identity comparison of optional route configs.
pub fn same_route_config(a: Option<&Arc<Route>>, b: Option<&Arc<Route>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}
