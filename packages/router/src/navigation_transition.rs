//! Navigation Transitions
//!
//! Corresponds to packages/router/src/navigation_transition.ts
//!
//! The single-consumer pipeline that turns navigation requests into state
//! changes. Requests are queued on an mpsc channel and processed by one
//! actor task in submission order; submitting a new request immediately
//! fires the in-flight transition's abort signal, and every stage boundary
//! re-checks staleness so a superseded navigation terminates quietly instead
//! of fighting the newer one. The visible URL and live route tree only
//! change at activation time.

use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tracing::debug;

use crate::abort::{AbortController, AbortSignal};
use crate::create_router_state::create_router_state;
use crate::errors::RouterError;
use crate::events::{
    Event, EventSink, NavigationCancellationCode, NavigationSkippedCode, NavigationTrigger,
};
use crate::guards::{check_guards, get_all_route_guards, GuardsOutcome};
use crate::injector::Injector;
use crate::models::{ComponentType, RedirectCommand, Routes};
use crate::recognize::{RecognizeError, Recognizer};
use crate::resolve_data::{resolve_data, ResolveOutcome};
use crate::route_reuse_strategy::{DetachedRouteHandle, RouteReuseStrategy};
use crate::router_config_loader::RouterConfigLoader;
use crate::router_state::{
    ActivatedRoute, ActivatedRouteSnapshot, ParamsInheritanceStrategy, RouterStateSnapshot,
};
use crate::shared::Params;
use crate::state_manager::{RestoredState, StateManager};
use crate::tree::TreeNode;
use crate::url_handling_strategy::UrlHandlingStrategy;
use crate::url_tree::{UrlSerializer, UrlTree};

/// What to do when navigating to the URL that is already active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnSameUrlNavigation {
    #[default]
    Ignore,
    Reload,
}

/// How `navigate` treats query params relative to the current URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryParamsHandling {
    /// Only the provided query params are used.
    #[default]
    Replace,
    /// Provided params are merged over the current ones.
    Merge,
    /// The current params are kept; provided ones are ignored.
    Preserve,
}

/// Per-navigation options.
#[derive(Clone, Default)]
pub struct NavigationExtras {
    pub relative_to: Option<Arc<ActivatedRouteSnapshot>>,
    pub query_params: Option<Params>,
    pub fragment: Option<String>,
    pub query_params_handling: QueryParamsHandling,
    /// Navigate without touching the browser URL.
    pub skip_location_change: bool,
    /// Replace the current history entry instead of pushing one.
    pub replace_url: bool,
}

/// Maps an unrecovered navigation error to a redirect, or lets it surface.
pub type NavigationErrorHandlerFn =
    Arc<dyn Fn(&RouterError) -> Option<RedirectCommand> + Send + Sync>;

/// Hook awaited between resolve and activation (Angular uses this for
/// preloading and view transitions).
pub type NavigationHookFn =
    Arc<dyn Fn() -> BoxFuture<'static, Result<(), RouterError>> + Send + Sync>;

/// Router-wide behavior options, consumed at construction.
#[derive(Clone, Default)]
pub struct RouterConfig {
    pub params_inheritance: ParamsInheritanceStrategy,
    pub on_same_url_navigation: OnSameUrlNavigation,
    /// Settle the navigation promise with `Ok(false)` instead of `Err` when
    /// an unrecovered error occurs.
    pub resolve_navigation_promise_on_error: bool,
    pub error_handler: Option<NavigationErrorHandlerFn>,
    pub after_preactivation: Option<NavigationHookFn>,
    pub view_transition: Option<NavigationHookFn>,
}

type NavigationResult = Result<bool, RouterError>;

struct Transition {
    id: usize,
    raw_url: UrlTree,
    extras: NavigationExtras,
    trigger: NavigationTrigger,
    restored: Option<RestoredState>,
    signal: AbortSignal,
    /// Settles the caller's promise; handed over to the follow-up
    /// navigation on redirect.
    done: Option<oneshot::Sender<NavigationResult>>,
}

impl Transition {
    fn settle(&mut self, result: NavigationResult) {
        if let Some(done) = self.done.take() {
            let _ = done.send(result);
        }
    }
}

/// The transition queue and pipeline. One actor task consumes the queue for
/// the lifetime of the router.
pub struct NavigationTransitions {
    serializer: Arc<dyn UrlSerializer>,
    config: RwLock<Routes>,
    root_component_type: Option<ComponentType>,
    injector: Arc<Injector>,
    config_loader: Arc<RouterConfigLoader>,
    events: EventSink,
    state_manager: Arc<StateManager>,
    reuse_strategy: Arc<dyn RouteReuseStrategy>,
    url_handling_strategy: Arc<dyn UrlHandlingStrategy>,
    options: RouterConfig,
    next_id: AtomicUsize,
    navigated: AtomicBool,
    current_abort: Mutex<Option<AbortController>>,
    tx: UnboundedSender<Transition>,
}

impl NavigationTransitions {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        serializer: Arc<dyn UrlSerializer>,
        config: Routes,
        root_component_type: Option<ComponentType>,
        injector: Arc<Injector>,
        config_loader: Arc<RouterConfigLoader>,
        events: EventSink,
        state_manager: Arc<StateManager>,
        reuse_strategy: Arc<dyn RouteReuseStrategy>,
        url_handling_strategy: Arc<dyn UrlHandlingStrategy>,
        options: RouterConfig,
    ) -> Arc<Self> {
        let (tx, rx) = unbounded_channel();
        let this = Arc::new(NavigationTransitions {
            serializer,
            config: RwLock::new(config),
            root_component_type,
            injector,
            config_loader,
            events,
            state_manager,
            reuse_strategy,
            url_handling_strategy,
            options,
            next_id: AtomicUsize::new(0),
            navigated: AtomicBool::new(false),
            current_abort: Mutex::new(None),
            tx,
        });
        // The actor holds only a weak reference; dropping the last `Router`
        // drops `tx`, closes the queue and ends the task. Requests still
        // queued at that point settle with `RouterDestroyed` through their
        // dropped oneshot senders.
        let actor = Arc::downgrade(&this);
        tokio::spawn(NavigationTransitions::run(actor, rx));
        this
    }

    pub(crate) fn set_config(&self, config: Routes) {
        *self.config.write().expect("config lock poisoned") = config;
    }

    pub fn navigated(&self) -> bool {
        self.navigated.load(Ordering::SeqCst)
    }

    /// Fire the in-flight navigation's abort signal without starting a new
    /// one; it settles as cancelled with `Aborted`.
    pub fn abort_in_flight(&self) {
        if let Some(controller) = self
            .current_abort
            .lock()
            .expect("abort lock poisoned")
            .as_ref()
        {
            controller.abort();
        }
    }

    /// Queue a navigation. The returned receiver settles with the final
    /// outcome, following redirects to their conclusion.
    pub(crate) fn request_navigation(
        &self,
        raw_url: UrlTree,
        extras: NavigationExtras,
        trigger: NavigationTrigger,
        restored: Option<RestoredState>,
    ) -> oneshot::Receiver<NavigationResult> {
        let (done_tx, done_rx) = oneshot::channel();
        self.submit(raw_url, extras, trigger, restored, done_tx);
        done_rx
    }

    fn submit(
        &self,
        raw_url: UrlTree,
        extras: NavigationExtras,
        trigger: NavigationTrigger,
        restored: Option<RestoredState>,
        done: oneshot::Sender<NavigationResult>,
    ) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let controller = AbortController::new();
        let signal = controller.signal();
        {
            // A new submission supersedes whatever is in flight.
            let mut current = self.current_abort.lock().expect("abort lock poisoned");
            if let Some(previous) = current.replace(controller) {
                previous.abort();
            }
        }
        let transition = Transition {
            id,
            raw_url,
            extras,
            trigger,
            restored,
            signal,
            done: Some(done),
        };
        if self.tx.send(transition).is_err() {
            // Actor is gone; the oneshot sender was moved and dropped,
            // settling the caller with `RouterDestroyed`.
            debug!("navigation request dropped, transition queue closed");
        }
    }

    fn latest_id(&self) -> usize {
        self.next_id.load(Ordering::SeqCst)
    }

    /// `Some(code)` when the transition must stop at this stage boundary.
    fn interruption(&self, t: &Transition) -> Option<NavigationCancellationCode> {
        if t.id != self.latest_id() {
            Some(NavigationCancellationCode::SupersededByNewNavigation)
        } else if t.signal.aborted() {
            Some(NavigationCancellationCode::Aborted)
        } else {
            None
        }
    }

    async fn run(this: Weak<Self>, mut rx: UnboundedReceiver<Transition>) {
        while let Some(transition) = rx.recv().await {
            let Some(transitions) = this.upgrade() else {
                return;
            };
            transitions.handle(transition).await;
        }
    }

    async fn handle(&self, mut t: Transition) {
        let url = self.serializer.serialize(&t.raw_url);
        debug!(navigation_id = t.id, %url, "navigation started");

        if !self.url_handling_strategy.should_process_url(&t.raw_url) {
            self.events.emit(Event::NavigationSkipped {
                id: t.id,
                url,
                code: NavigationSkippedCode::IgnoredByUrlHandlingStrategy,
                reason: "the URL handling strategy declined this URL".to_string(),
            });
            t.settle(Ok(false));
            return;
        }

        if self.navigated()
            && self.options.on_same_url_navigation == OnSameUrlNavigation::Ignore
            && self.serializer.serialize(&self.state_manager.raw_url_tree()) == url
        {
            self.events.emit(Event::NavigationSkipped {
                id: t.id,
                url,
                code: NavigationSkippedCode::IgnoredSameUrlNavigation,
                reason: "navigation to the current URL is ignored".to_string(),
            });
            t.settle(Ok(false));
            return;
        }

        let extracted = self.url_handling_strategy.extract(&t.raw_url);
        self.events.emit(Event::NavigationStart {
            id: t.id,
            url: url.clone(),
            trigger: t.trigger,
        });

        // Recognize (redirects and lazy loading interleaved).
        let recognizer = Recognizer::new(
            self.injector.clone(),
            &self.config_loader,
            self.root_component_type,
            self.config.read().expect("config lock poisoned").clone(),
            extracted,
            self.serializer.as_ref(),
            self.options.params_inheritance,
            &self.events,
            t.id,
            t.signal.clone(),
        );
        let recognized = match recognizer.recognize().await {
            Ok(recognized) => recognized,
            Err(RecognizeError::Redirect(tree)) => {
                self.redirect(&mut t, &url, tree);
                return;
            }
            Err(RecognizeError::Error(error)) => {
                self.fail(&mut t, &url, error);
                return;
            }
        };
        let url_after_redirects = self
            .serializer
            .serialize(&recognized.url_after_redirects);
        let target_snapshot = Arc::new(recognized.state);
        self.events.emit(Event::RoutesRecognized {
            id: t.id,
            url: url.clone(),
            url_after_redirects: url_after_redirects.clone(),
        });
        if let Some(code) = self.interruption(&t) {
            self.cancel(&mut t, &url, code);
            return;
        }

        // Guards.
        let current_state = self.state_manager.router_state();
        let current_snapshot = current_state.snapshot.clone();
        self.events.emit(Event::GuardsCheckStart {
            id: t.id,
            url: url.clone(),
            url_after_redirects: url_after_redirects.clone(),
        });
        let checks = get_all_route_guards(&target_snapshot, &current_snapshot);
        let outcome = check_guards(
            &checks,
            &target_snapshot,
            &current_snapshot,
            &self.injector,
            &self.events,
            t.id,
            &t.signal,
        )
        .await;
        let should_activate = outcome.is_allow();
        self.events.emit(Event::GuardsCheckEnd {
            id: t.id,
            url: url.clone(),
            url_after_redirects: url_after_redirects.clone(),
            should_activate,
        });
        match outcome {
            GuardsOutcome::Allow => {}
            GuardsOutcome::Redirect(tree) => {
                self.redirect(&mut t, &url, tree);
                return;
            }
            GuardsOutcome::Reject => {
                let code = self
                    .interruption(&t)
                    .unwrap_or(NavigationCancellationCode::GuardRejected);
                self.cancel(&mut t, &url, code);
                return;
            }
            GuardsOutcome::Error(error) => {
                self.fail(&mut t, &url, error);
                return;
            }
        }
        if let Some(code) = self.interruption(&t) {
            self.cancel(&mut t, &url, code);
            return;
        }

        // Resolve.
        self.events.emit(Event::ResolveStart {
            id: t.id,
            url: url.clone(),
            url_after_redirects: url_after_redirects.clone(),
        });
        match resolve_data(
            &checks,
            &target_snapshot,
            &self.injector,
            self.options.params_inheritance,
            &t.signal,
        )
        .await
        {
            ResolveOutcome::Complete => {}
            ResolveOutcome::NoData(path) => {
                self.events.emit(Event::ResolveEnd {
                    id: t.id,
                    url: url.clone(),
                    url_after_redirects: url_after_redirects.clone(),
                });
                self.cancel_with_reason(
                    &mut t,
                    &url,
                    NavigationCancellationCode::NoDataFromResolver,
                    format!("the resolver of route 'path: {path}' completed without a value"),
                );
                return;
            }
            ResolveOutcome::Aborted => {
                let code = self
                    .interruption(&t)
                    .unwrap_or(NavigationCancellationCode::Aborted);
                self.cancel(&mut t, &url, code);
                return;
            }
            ResolveOutcome::Error(error) => {
                self.fail(&mut t, &url, error);
                return;
            }
        }
        self.events.emit(Event::ResolveEnd {
            id: t.id,
            url: url.clone(),
            url_after_redirects: url_after_redirects.clone(),
        });
        if let Some(code) = self.interruption(&t) {
            self.cancel(&mut t, &url, code);
            return;
        }

        // Lazy standalone components of the activating routes.
        if let Err(error) = self.load_components(&target_snapshot).await {
            self.fail(&mut t, &url, error);
            return;
        }

        for hook in [&self.options.after_preactivation, &self.options.view_transition]
            .into_iter()
            .flatten()
        {
            if let Err(error) = hook().await {
                self.fail(&mut t, &url, error);
                return;
            }
        }
        if let Some(code) = self.interruption(&t) {
            self.cancel(&mut t, &url, code);
            return;
        }

        // Build the live tree, preserving reused nodes.
        let target_state = Arc::new(create_router_state(
            self.reuse_strategy.as_ref(),
            target_snapshot.clone(),
            Some(current_state.as_ref()),
        ));

        // Commit point: from here on the navigation is visible.
        self.events.emit(Event::BeforeActivateRoutes {
            id: t.id,
            url: url.clone(),
        });
        let merged_raw = self
            .url_handling_strategy
            .merge(&recognized.url_after_redirects, &t.raw_url);
        self.state_manager.commit(
            recognized.url_after_redirects.clone(),
            merged_raw,
            target_state.clone(),
            t.id,
            t.extras.skip_location_change,
            t.extras.replace_url,
            t.restored,
        );

        self.store_detached_subtrees(&current_state.root, &target_snapshot.root);
        self.activate(&target_state.root, t.id);
        self.navigated.store(true, Ordering::SeqCst);

        debug!(navigation_id = t.id, url = %url_after_redirects, "navigation succeeded");
        self.events.emit(Event::NavigationEnd {
            id: t.id,
            url,
            url_after_redirects,
        });
        t.settle(Ok(true));
    }

    fn cancel(&self, t: &mut Transition, url: &str, code: NavigationCancellationCode) {
        let reason = match code {
            NavigationCancellationCode::SupersededByNewNavigation => {
                "superseded by a newer navigation".to_string()
            }
            NavigationCancellationCode::Aborted => "the navigation was aborted".to_string(),
            NavigationCancellationCode::GuardRejected => {
                "a guard rejected the navigation".to_string()
            }
            _ => String::new(),
        };
        self.cancel_with_reason(t, url, code, reason);
    }

    fn cancel_with_reason(
        &self,
        t: &mut Transition,
        url: &str,
        code: NavigationCancellationCode,
        reason: String,
    ) {
        debug!(navigation_id = t.id, ?code, "navigation cancelled");
        self.events.emit(Event::NavigationCancel {
            id: t.id,
            url: url.to_string(),
            code,
            reason,
        });
        if t.restored.is_some() {
            self.state_manager.restore_history(t.id, t.restored);
        }
        t.settle(Ok(false));
    }

    /// Cancel the current navigation and queue a follow-up to the redirect
    /// target; the caller's promise follows the new navigation.
    fn redirect(&self, t: &mut Transition, url: &str, target: UrlTree) {
        self.events.emit(Event::NavigationCancel {
            id: t.id,
            url: url.to_string(),
            code: NavigationCancellationCode::Redirect,
            reason: format!(
                "redirecting to '{}'",
                self.serializer.serialize(&target)
            ),
        });
        let Some(done) = t.done.take() else {
            return;
        };
        let extras = NavigationExtras {
            skip_location_change: t.extras.skip_location_change,
            replace_url: t.extras.replace_url,
            ..NavigationExtras::default()
        };
        self.submit(target, extras, NavigationTrigger::Imperative, None, done);
    }

    fn fail(&self, t: &mut Transition, url: &str, error: RouterError) {
        // A failure observed by a superseded or aborted transition is a
        // cancellation, not a navigation error; the raced guards of the
        // recognize stage otherwise surface here as spurious no-matches.
        if let Some(code) = self.interruption(t) {
            self.cancel(t, url, code);
            return;
        }
        debug!(navigation_id = t.id, %error, "navigation failed");
        self.events.emit(Event::NavigationError {
            id: t.id,
            url: url.to_string(),
            error: error.to_string(),
        });
        self.state_manager.restore_history(t.id, t.restored);

        if let Some(handler) = &self.options.error_handler {
            if let Some(command) = handler(&error) {
                let Some(done) = t.done.take() else {
                    return;
                };
                let extras = NavigationExtras {
                    skip_location_change: t.extras.skip_location_change,
                    replace_url: t.extras.replace_url,
                    ..NavigationExtras::default()
                };
                self.submit(
                    command.url_tree,
                    extras,
                    NavigationTrigger::Imperative,
                    None,
                    done,
                );
                return;
            }
        }

        if self.options.resolve_navigation_promise_on_error {
            t.settle(Ok(false));
        } else {
            t.settle(Err(error));
        }
    }

    async fn load_components(&self, state: &RouterStateSnapshot) -> Result<(), RouterError> {
        let mut pending: Vec<Arc<ActivatedRouteSnapshot>> = Vec::new();
        state.root.for_each(&mut |node| {
            let snapshot = &node.value;
            if snapshot.component().is_none() {
                if let Some(config) = &snapshot.route_config {
                    if config.load_component.is_some() {
                        pending.push(snapshot.clone());
                    }
                }
            }
        });
        for snapshot in pending {
            let config = snapshot
                .route_config
                .clone()
                .ok_or_else(|| RouterError::internal("lazy component route lost its config"))?;
            let component = self.config_loader.load_component(&config).await?;
            snapshot.set_component(component);
        }
        Ok(())
    }

    /// Offer subtrees that are being torn down to the reuse strategy before
    /// they disappear from the live tree.
    fn store_detached_subtrees(
        &self,
        old_node: &TreeNode<Arc<ActivatedRoute>>,
        new_node: &TreeNode<Arc<ActivatedRouteSnapshot>>,
    ) {
        for old_child in &old_node.children {
            let snapshot = old_child.value.snapshot();
            let survives = new_node.children.iter().find(|n| {
                crate::models::same_route_config(
                    n.value.route_config.as_ref(),
                    snapshot.route_config.as_ref(),
                )
            });
            match survives {
                Some(new_child) => self.store_detached_subtrees(old_child, new_child),
                None => {
                    if self.reuse_strategy.should_detach(&snapshot) {
                        self.reuse_strategy.store(
                            &snapshot,
                            Some(DetachedRouteHandle {
                                root: old_child.clone(),
                            }),
                        );
                    }
                }
            }
        }
    }

    /// Advance every live route to its staged snapshot, children after their
    /// parent, firing activation-end events leaf-to-root.
    fn activate(&self, root: &TreeNode<Arc<ActivatedRoute>>, navigation_id: usize) {
        fn walk(
            node: &TreeNode<Arc<ActivatedRoute>>,
            events: &EventSink,
            navigation_id: usize,
            is_root: bool,
        ) {
            node.value.advance();
            for child in &node.children {
                walk(child, events, navigation_id, false);
            }
            if !node.children.is_empty() {
                events.emit(Event::ChildActivationEnd {
                    id: navigation_id,
                    path: node.value.snapshot().config_path(),
                });
            }
            if !is_root {
                let snapshot = node.value.snapshot();
                events.emit(Event::ActivationEnd {
                    id: navigation_id,
                    path: snapshot.config_path(),
                    outlet: snapshot.outlet.clone(),
                });
            }
        }
        walk(root, &self.events, navigation_id, true);
    }
}

impl std::fmt::Debug for NavigationTransitions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationTransitions")
            .field("latest_id", &self.latest_id())
            .field("navigated", &self.navigated())
            .finish_non_exhaustive()
    }
}
