//! Router State
//!
//! Corresponds to packages/router/src/router_state.ts
//!
//! `ActivatedRouteSnapshot` is an immutable per-navigation record (resolved
//! data lands exactly once, during the resolve stage). `ActivatedRoute` is
//! the live, navigation-spanning counterpart: its snapshot is swapped on
//! reuse and consumers observe updates through watch channels without being
//! destroyed.

use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::watch;

use crate::injector::Injector;
use crate::models::{ComponentType, Route};
use crate::shared::{merge_data, merge_params, Data, ParamValue, Params, PRIMARY_OUTLET};
use crate::tree::TreeNode;
use crate::url_tree::UrlSegment;

/// How `params` and `data` flow from parent to child snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamsInheritanceStrategy {
    /// Only routes with an empty own path (or a componentless parent)
    /// inherit.
    #[default]
    EmptyOnly,
    /// Every descendant inherits and merges.
    Always,
}

/// An immutable capture of one matched route for one navigation attempt.
pub struct ActivatedRouteSnapshot {
    /// The URL segments this route consumed.
    pub url: Vec<UrlSegment>,
    /// Matrix + positional params, already merged with inherited params per
    /// the configured strategy.
    pub params: Params,
    pub query_params: Params,
    pub fragment: Option<String>,
    pub outlet: String,
    pub route_config: Option<Arc<Route>>,
    // Filled in late when the component is lazily loaded.
    component: RwLock<Option<ComponentType>>,
    data: RwLock<Data>,
    resolved: RwLock<Data>,
    // The closest route injector, set during recognition.
    injector: RwLock<Option<Arc<Injector>>>,
}

impl ActivatedRouteSnapshot {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        url: Vec<UrlSegment>,
        params: Params,
        query_params: Params,
        fragment: Option<String>,
        outlet: String,
        component: Option<ComponentType>,
        route_config: Option<Arc<Route>>,
        data: Data,
    ) -> Self {
        ActivatedRouteSnapshot {
            url,
            params,
            query_params,
            fragment,
            outlet,
            route_config,
            component: RwLock::new(component),
            data: RwLock::new(data),
            resolved: RwLock::new(Data::new()),
            injector: RwLock::new(None),
        }
    }

    /// The component rendered for this route, once known. Lazily loaded
    /// components land here during the load stage.
    pub fn component(&self) -> Option<ComponentType> {
        *self.component.read().expect("snapshot data lock poisoned")
    }

    pub(crate) fn set_component(&self, component: ComponentType) {
        *self.component.write().expect("snapshot data lock poisoned") = Some(component);
    }

    /// The injector of the closest lazily-loaded config, when any.
    pub fn route_injector(&self) -> Option<Arc<Injector>> {
        self.injector
            .read()
            .expect("snapshot data lock poisoned")
            .clone()
    }

    pub(crate) fn set_route_injector(&self, injector: Arc<Injector>) {
        *self.injector.write().expect("snapshot data lock poisoned") = Some(injector);
    }

    /// An empty root snapshot.
    pub fn empty_root(query_params: Params, fragment: Option<String>, component: Option<ComponentType>) -> Self {
        ActivatedRouteSnapshot::new(
            vec![],
            Params::new(),
            query_params,
            fragment,
            PRIMARY_OUTLET.to_string(),
            component,
            None,
            Data::new(),
        )
    }

    pub fn param(&self, name: &str) -> Option<String> {
        self.params
            .get(name)
            .and_then(ParamValue::as_str)
            .map(String::from)
    }

    /// Static + resolved + inherited data.
    pub fn data(&self) -> Data {
        self.data.read().expect("snapshot data lock poisoned").clone()
    }

    pub(crate) fn set_data(&self, data: Data) {
        *self.data.write().expect("snapshot data lock poisoned") = data;
    }

    /// This node's own resolver outputs.
    pub fn resolved_data(&self) -> Data {
        self.resolved
            .read()
            .expect("snapshot data lock poisoned")
            .clone()
    }

    pub(crate) fn set_resolved_data(&self, data: Data) {
        *self.resolved.write().expect("snapshot data lock poisoned") = data;
    }

    /// Serialized form of the consumed segments, for errors and events.
    pub fn url_display(&self) -> String {
        self.url
            .iter()
            .map(|s| s.path.clone())
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn config_path(&self) -> String {
        self.route_config
            .as_ref()
            .map(|r| r.path_display())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for ActivatedRouteSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivatedRouteSnapshot")
            .field("url", &self.url_display())
            .field("outlet", &self.outlet)
            .field("params", &self.params)
            .field("component", &self.component())
            .finish()
    }
}

/// The tree of snapshots produced by one successful recognition.
#[derive(Debug)]
pub struct RouterStateSnapshot {
    /// The serialized URL the snapshot was built from.
    pub url: String,
    pub root: TreeNode<Arc<ActivatedRouteSnapshot>>,
}

impl RouterStateSnapshot {
    pub fn new(url: String, root: TreeNode<Arc<ActivatedRouteSnapshot>>) -> Self {
        RouterStateSnapshot { url, root }
    }

    pub fn root_snapshot(&self) -> Arc<ActivatedRouteSnapshot> {
        self.root.value.clone()
    }

    pub fn path_from_root(
        &self,
        node: &Arc<ActivatedRouteSnapshot>,
    ) -> Vec<Arc<ActivatedRouteSnapshot>> {
        self.root.path_from_root(node)
    }

    pub fn parent_of(
        &self,
        node: &Arc<ActivatedRouteSnapshot>,
    ) -> Option<Arc<ActivatedRouteSnapshot>> {
        self.root.parent_of(node)
    }

    pub fn children_of(
        &self,
        node: &Arc<ActivatedRouteSnapshot>,
    ) -> Vec<Arc<ActivatedRouteSnapshot>> {
        self.root.children_of(node)
    }

    /// The deepest primary-outlet snapshot.
    pub fn deepest_primary(&self) -> Arc<ActivatedRouteSnapshot> {
        let mut node = &self.root;
        loop {
            let next = node
                .children
                .iter()
                .find(|c| c.value.outlet == PRIMARY_OUTLET);
            match next {
                Some(child) => node = child,
                None => return node.value.clone(),
            }
        }
    }
}

/// Whether a route with `config` inherits params/data from `parent` under
/// `strategy`.
pub fn inherits_from_parent(
    config: Option<&Arc<Route>>,
    parent: Option<&Arc<ActivatedRouteSnapshot>>,
    strategy: ParamsInheritanceStrategy,
) -> bool {
    match strategy {
        ParamsInheritanceStrategy::Always => true,
        ParamsInheritanceStrategy::EmptyOnly => {
            let empty_own_path = config.map(|c| c.is_empty_path()).unwrap_or(false);
            let componentless_parent =
                parent.is_some_and(|p| p.component().is_none() && p.route_config.is_some());
            empty_own_path || componentless_parent
        }
    }
}

/// Merged params and data along `path_from_root`, honoring the strategy.
pub fn inherited_params_data(
    path_from_root: &[Arc<ActivatedRouteSnapshot>],
    strategy: ParamsInheritanceStrategy,
) -> (Params, Data) {
    let mut start = path_from_root.len().saturating_sub(1);
    while start >= 1 {
        let current = &path_from_root[start];
        let parent = path_from_root.get(start - 1);
        if inherits_from_parent(current.route_config.as_ref(), parent, strategy) {
            start -= 1;
        } else {
            break;
        }
    }
    let mut params = Params::new();
    let mut data = Data::new();
    for node in &path_from_root[start..] {
        merge_params(&mut params, &node.params);
        let own_static = node
            .route_config
            .as_ref()
            .map(|c| c.data.clone())
            .unwrap_or_default();
        merge_data(&mut data, &own_static);
        merge_data(&mut data, &node.resolved_data());
    }
    (params, data)
}

/// Walk the snapshot tree root-to-leaf, installing inherited `data`
/// (static config data plus resolver outputs) on every node.
pub fn apply_inherited_data(snapshot: &RouterStateSnapshot, strategy: ParamsInheritanceStrategy) {
    fn walk(
        node: &TreeNode<Arc<ActivatedRouteSnapshot>>,
        parent: Option<&Arc<ActivatedRouteSnapshot>>,
        parent_data: &Data,
        strategy: ParamsInheritanceStrategy,
    ) {
        let mut data = if inherits_from_parent(node.value.route_config.as_ref(), parent, strategy) {
            parent_data.clone()
        } else {
            Data::new()
        };
        if let Some(config) = &node.value.route_config {
            merge_data(&mut data, &config.data);
        }
        merge_data(&mut data, &node.value.resolved_data());
        node.value.set_data(data.clone());
        for child in &node.children {
            walk(child, Some(&node.value), &data, strategy);
        }
    }
    walk(&snapshot.root, None, &Data::new(), strategy);
}

/// The live, navigation-spanning counterpart of a snapshot. Consumers hold
/// it across navigations when the reuse strategy keeps the node; its
/// observable values push the latest snapshot's state.
pub struct ActivatedRoute {
    pub outlet: String,
    pub component: Option<ComponentType>,
    url_tx: watch::Sender<Vec<UrlSegment>>,
    params_tx: watch::Sender<Params>,
    query_params_tx: watch::Sender<Params>,
    fragment_tx: watch::Sender<Option<String>>,
    data_tx: watch::Sender<Data>,
    snapshot: RwLock<Arc<ActivatedRouteSnapshot>>,
    future_snapshot: Mutex<Option<Arc<ActivatedRouteSnapshot>>>,
}

impl ActivatedRoute {
    pub fn from_snapshot(snapshot: Arc<ActivatedRouteSnapshot>) -> Arc<Self> {
        let (url_tx, _) = watch::channel(snapshot.url.clone());
        let (params_tx, _) = watch::channel(snapshot.params.clone());
        let (query_params_tx, _) = watch::channel(snapshot.query_params.clone());
        let (fragment_tx, _) = watch::channel(snapshot.fragment.clone());
        let (data_tx, _) = watch::channel(snapshot.data());
        Arc::new(ActivatedRoute {
            outlet: snapshot.outlet.clone(),
            component: snapshot.component(),
            url_tx,
            params_tx,
            query_params_tx,
            fragment_tx,
            data_tx,
            snapshot: RwLock::new(snapshot),
            future_snapshot: Mutex::new(None),
        })
    }

    pub fn snapshot(&self) -> Arc<ActivatedRouteSnapshot> {
        self.snapshot
            .read()
            .expect("activated route lock poisoned")
            .clone()
    }

    pub fn route_config(&self) -> Option<Arc<Route>> {
        self.snapshot().route_config.clone()
    }

    /// Latest-value streams. A new subscriber immediately observes the
    /// current value.
    pub fn url(&self) -> watch::Receiver<Vec<UrlSegment>> {
        self.url_tx.subscribe()
    }

    pub fn params(&self) -> watch::Receiver<Params> {
        self.params_tx.subscribe()
    }

    pub fn query_params(&self) -> watch::Receiver<Params> {
        self.query_params_tx.subscribe()
    }

    pub fn fragment(&self) -> watch::Receiver<Option<String>> {
        self.fragment_tx.subscribe()
    }

    pub fn data(&self) -> watch::Receiver<Data> {
        self.data_tx.subscribe()
    }

    /// Stage the snapshot this node will carry once the navigation commits.
    pub(crate) fn set_future_snapshot(&self, snapshot: Arc<ActivatedRouteSnapshot>) {
        *self
            .future_snapshot
            .lock()
            .expect("activated route lock poisoned") = Some(snapshot);
    }

    /// Swap in the staged snapshot and push any changed values to
    /// observers. Runs only during route activation.
    pub(crate) fn advance(&self) {
        let future = self
            .future_snapshot
            .lock()
            .expect("activated route lock poisoned")
            .take();
        let Some(future) = future else {
            return;
        };
        let previous = self.snapshot();
        *self.snapshot.write().expect("activated route lock poisoned") = future.clone();

        if previous.query_params != future.query_params {
            self.query_params_tx.send_replace(future.query_params.clone());
        }
        if previous.fragment != future.fragment {
            self.fragment_tx.send_replace(future.fragment.clone());
        }
        if previous.params != future.params {
            self.params_tx.send_replace(future.params.clone());
        }
        if previous.url != future.url {
            self.url_tx.send_replace(future.url.clone());
        }
        let future_data = future.data();
        if previous.data() != future_data {
            self.data_tx.send_replace(future_data);
        }
    }
}

impl std::fmt::Debug for ActivatedRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivatedRoute")
            .field("outlet", &self.outlet)
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

/// The live route tree of the last committed navigation.
#[derive(Debug)]
pub struct RouterState {
    pub root: TreeNode<Arc<ActivatedRoute>>,
    pub snapshot: Arc<RouterStateSnapshot>,
}

impl RouterState {
    pub fn new(root: TreeNode<Arc<ActivatedRoute>>, snapshot: Arc<RouterStateSnapshot>) -> Self {
        RouterState { root, snapshot }
    }

    /// The initial state before any navigation: one root node with the
    /// root component and an empty URL.
    pub fn create_empty(root_component: Option<ComponentType>) -> Self {
        let snapshot = Arc::new(ActivatedRouteSnapshot::empty_root(
            Params::new(),
            None,
            root_component,
        ));
        let state_snapshot = Arc::new(RouterStateSnapshot::new(
            "/".to_string(),
            TreeNode::leaf(snapshot.clone()),
        ));
        let route = ActivatedRoute::from_snapshot(snapshot);
        RouterState::new(TreeNode::leaf(route), state_snapshot)
    }

    pub fn root_route(&self) -> Arc<ActivatedRoute> {
        self.root.value.clone()
    }

    pub fn parent_of(&self, route: &Arc<ActivatedRoute>) -> Option<Arc<ActivatedRoute>> {
        self.root.parent_of(route)
    }

    pub fn children_of(&self, route: &Arc<ActivatedRoute>) -> Vec<Arc<ActivatedRoute>> {
        self.root.children_of(route)
    }
}
