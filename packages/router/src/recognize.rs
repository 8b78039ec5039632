//! URL Recognition
//!
//! Corresponds to packages/router/src/recognize.ts
//!
//! Turns a parsed URL tree into a tree of `ActivatedRouteSnapshot`s,
//! applying `redirectTo` rules and `canMatch`/`canLoad` guards inline with
//! matching. Routes are tried in config order and the first structural match
//! wins; a route whose `canMatch` rejects behaves exactly like a structural
//! no-match. An absolute redirect restarts matching from the new tree, with
//! a hop ceiling guarding against redirect cycles.

use futures::future::BoxFuture;
use futures::FutureExt;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::abort::AbortSignal;
use crate::apply_redirects::{
    can_load_fails, no_match_error, AppliedRedirect, RecognizeFailure, RedirectApplier,
};
use crate::config_matching::{
    match_route, no_leftovers_in_url, sort_by_matching_outlets, split, MatchResult,
};
use crate::errors::RouterError;
use crate::events::EventSink;
use crate::guards::{run_can_load_guards, run_can_match_guards, GuardsOutcome};
use crate::injector::Injector;
use crate::models::{ComponentType, Route, Routes};
use crate::router_config_loader::RouterConfigLoader;
use crate::router_state::{
    apply_inherited_data, inherits_from_parent, ActivatedRouteSnapshot, ParamsInheritanceStrategy,
    RouterStateSnapshot,
};
use crate::shared::{merge_params, PRIMARY_OUTLET};
use crate::tree::TreeNode;
use crate::url_tree::{UrlSegment, UrlSegmentGroup, UrlSerializer, UrlTree};

/// Redirect chains longer than this are treated as cycles.
const MAX_ALLOWED_REDIRECTS: usize = 31;

/// How a failed recognition surfaces to the navigation pipeline.
#[derive(Debug)]
pub(crate) enum RecognizeError {
    /// A `canMatch`/`canLoad` guard redirected; start a new navigation.
    Redirect(UrlTree),
    Error(RouterError),
}

/// A successful recognition: the snapshot tree plus the URL it describes
/// after all redirects were applied.
pub(crate) struct Recognized {
    pub state: RouterStateSnapshot,
    pub url_after_redirects: UrlTree,
}

pub(crate) struct Recognizer<'a> {
    pub injector: Arc<Injector>,
    pub config_loader: &'a RouterConfigLoader,
    pub root_component_type: Option<ComponentType>,
    pub config: Routes,
    pub serializer: &'a dyn UrlSerializer,
    pub params_inheritance: ParamsInheritanceStrategy,
    pub events: &'a EventSink,
    pub navigation_id: usize,
    pub abort: AbortSignal,
    url_tree: UrlTree,
}

impl<'a> Recognizer<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        injector: Arc<Injector>,
        config_loader: &'a RouterConfigLoader,
        root_component_type: Option<ComponentType>,
        config: Routes,
        url_tree: UrlTree,
        serializer: &'a dyn UrlSerializer,
        params_inheritance: ParamsInheritanceStrategy,
        events: &'a EventSink,
        navigation_id: usize,
        abort: AbortSignal,
    ) -> Self {
        Recognizer {
            injector,
            config_loader,
            root_component_type,
            config,
            serializer,
            params_inheritance,
            events,
            navigation_id,
            abort,
            url_tree,
        }
    }

    pub async fn recognize(mut self) -> Result<Recognized, RecognizeError> {
        let original = self.url_tree.clone();
        let mut redirects = 0usize;
        loop {
            match self.match_tree().await {
                Ok(recognized) => return Ok(recognized),
                Err(RecognizeFailure::AbsoluteRedirect(new_tree)) => {
                    redirects += 1;
                    if redirects > MAX_ALLOWED_REDIRECTS {
                        return Err(RecognizeError::Error(RouterError::InfiniteRedirect {
                            from: self.serializer.serialize(&original),
                            to: self.serializer.serialize(&new_tree),
                        }));
                    }
                    debug!(
                        navigation_id = self.navigation_id,
                        target = %self.serializer.serialize(&new_tree),
                        "absolute redirect, restarting recognition"
                    );
                    self.url_tree = new_tree;
                }
                Err(RecognizeFailure::GuardRedirect(tree)) => {
                    return Err(RecognizeError::Redirect(tree));
                }
                Err(RecognizeFailure::NoMatch) => {
                    return Err(RecognizeError::Error(no_match_error(
                        &self.url_tree,
                        self.serializer,
                    )));
                }
                Err(RecognizeFailure::Error(error)) => {
                    return Err(RecognizeError::Error(error));
                }
            }
        }
    }

    async fn match_tree(&self) -> Result<Recognized, RecognizeFailure> {
        let root_snapshot = Arc::new(ActivatedRouteSnapshot::empty_root(
            self.url_tree.query_params.clone(),
            self.url_tree.fragment.clone(),
            self.root_component_type,
        ));
        root_snapshot.set_route_injector(self.injector.clone());

        // The root group is processed like any other so empty-path routes
        // can match the bare `/` URL.
        let children = self
            .process_segment_group(
                self.injector.clone(),
                self.config.clone(),
                self.url_tree.root.clone(),
                PRIMARY_OUTLET.to_string(),
                root_snapshot.clone(),
            )
            .await?;

        let root_node = TreeNode::new(root_snapshot, children);
        let url_after_redirects = self.url_from_snapshots(&root_node);
        let state = RouterStateSnapshot::new(
            self.serializer.serialize(&url_after_redirects),
            root_node,
        );
        apply_inherited_data(&state, self.params_inheritance);
        Ok(Recognized {
            state,
            url_after_redirects,
        })
    }

    /// Rebuild the URL from the consumed segments of the snapshot tree, so
    /// the committed URL reflects redirects rather than the requested one.
    fn url_from_snapshots(
        &self,
        root: &TreeNode<Arc<ActivatedRouteSnapshot>>,
    ) -> UrlTree {
        fn group_from(node: &TreeNode<Arc<ActivatedRouteSnapshot>>) -> UrlSegmentGroup {
            let mut children = IndexMap::new();
            for child in &node.children {
                let group = group_from(child);
                if !group.is_empty() {
                    children.insert(child.value.outlet.clone(), group);
                }
            }
            UrlSegmentGroup::new(node.value.url.clone(), children)
        }
        UrlTree::new(
            group_from(root).squashed(),
            self.url_tree.query_params.clone(),
            self.url_tree.fragment.clone(),
        )
    }

    fn process_segment_group(
        &self,
        injector: Arc<Injector>,
        config: Routes,
        segment_group: UrlSegmentGroup,
        outlet: String,
        parent: Arc<ActivatedRouteSnapshot>,
    ) -> BoxFuture<'_, Result<Vec<TreeNode<Arc<ActivatedRouteSnapshot>>>, RecognizeFailure>>
    {
        async move {
            if segment_group.segments.is_empty() && segment_group.has_children() {
                return self
                    .process_children(injector, config, segment_group, parent)
                    .await;
            }
            let segments = segment_group.segments.clone();
            self.process_segment(injector, config, segment_group, segments, outlet, true, parent)
                .await
        }
        .boxed()
    }

    /// Process every child outlet of a group, primary first, then verify
    /// outlet uniqueness and order siblings deterministically.
    fn process_children(
        &self,
        injector: Arc<Injector>,
        config: Routes,
        segment_group: UrlSegmentGroup,
        parent: Arc<ActivatedRouteSnapshot>,
    ) -> BoxFuture<'_, Result<Vec<TreeNode<Arc<ActivatedRouteSnapshot>>>, RecognizeFailure>>
    {
        async move {
            let mut outlets: Vec<String> = Vec::new();
            for outlet in segment_group.children.keys() {
                if outlet == PRIMARY_OUTLET {
                    outlets.insert(0, outlet.clone());
                } else {
                    outlets.push(outlet.clone());
                }
            }

            let mut children = Vec::new();
            for outlet in outlets {
                let child = segment_group
                    .children
                    .get(&outlet)
                    .cloned()
                    .ok_or_else(|| RouterError::internal("child outlet disappeared"))?;
                let sorted = sort_by_matching_outlets(&config, &outlet);
                let nodes = self
                    .process_segment_group(
                        injector.clone(),
                        sorted,
                        child,
                        outlet.clone(),
                        parent.clone(),
                    )
                    .await?;
                children.extend(nodes);
            }

            check_outlet_uniqueness(&children)?;
            sort_activated_route_snapshots(&mut children);
            Ok(children)
        }
        .boxed()
    }

    /// Try each route in order against `segments`; the first match wins. No
    /// match at all is fine only when the URL is fully consumed here.
    #[allow(clippy::too_many_arguments)]
    fn process_segment(
        &self,
        injector: Arc<Injector>,
        routes: Routes,
        segment_group: UrlSegmentGroup,
        segments: Vec<UrlSegment>,
        outlet: String,
        allow_redirects: bool,
        parent: Arc<ActivatedRouteSnapshot>,
    ) -> BoxFuture<'_, Result<Vec<TreeNode<Arc<ActivatedRouteSnapshot>>>, RecognizeFailure>>
    {
        async move {
            for route in &routes {
                let attempt = self
                    .process_segment_against_route(
                        injector.clone(),
                        routes.clone(),
                        route.clone(),
                        segment_group.clone(),
                        segments.clone(),
                        outlet.clone(),
                        allow_redirects,
                        parent.clone(),
                    )
                    .await;
                match attempt {
                    Ok(nodes) => return Ok(nodes),
                    Err(RecognizeFailure::NoMatch) => continue,
                    Err(other) => return Err(other),
                }
            }
            if no_leftovers_in_url(&segment_group, &segments, &outlet) {
                return Ok(vec![]);
            }
            Err(RecognizeFailure::NoMatch)
        }
        .boxed()
    }

    #[allow(clippy::too_many_arguments)]
    fn process_segment_against_route(
        &self,
        injector: Arc<Injector>,
        routes: Routes,
        route: Arc<Route>,
        segment_group: UrlSegmentGroup,
        segments: Vec<UrlSegment>,
        outlet: String,
        allow_redirects: bool,
        parent: Arc<ActivatedRouteSnapshot>,
    ) -> BoxFuture<'_, Result<Vec<TreeNode<Arc<ActivatedRouteSnapshot>>>, RecognizeFailure>>
    {
        async move {
            if route.outlet_name() != outlet
                && (outlet == PRIMARY_OUTLET
                    || !crate::config_matching::empty_path_match(&segment_group, &segments, &route))
            {
                return Err(RecognizeFailure::NoMatch);
            }

            if route.redirect_to.is_none() {
                return self
                    .match_segment_against_route(
                        injector,
                        route,
                        segment_group,
                        segments,
                        outlet,
                        parent,
                    )
                    .await;
            }

            if !allow_redirects {
                return Err(RecognizeFailure::NoMatch);
            }

            self.expand_with_redirect(injector, routes, route, segment_group, segments, outlet, parent)
                .await
        }
        .boxed()
    }

    /// Apply a matching route's `redirectTo`. Absolute targets unwind the
    /// whole recognition; relative targets are spliced in and re-matched
    /// against the same sibling config with further redirects disallowed.
    #[allow(clippy::too_many_arguments)]
    async fn expand_with_redirect(
        &self,
        injector: Arc<Injector>,
        routes: Routes,
        route: Arc<Route>,
        segment_group: UrlSegmentGroup,
        segments: Vec<UrlSegment>,
        outlet: String,
        parent: Arc<ActivatedRouteSnapshot>,
    ) -> Result<Vec<TreeNode<Arc<ActivatedRouteSnapshot>>>, RecognizeFailure> {
        let result = match_route(&segment_group, &route, &segments);
        if !result.matched {
            return Err(RecognizeFailure::NoMatch);
        }
        if let Some(outcome) = self
            .can_match_outcome(injector.clone(), &route, &result.consumed_segments)
            .await?
        {
            return Err(outcome);
        }

        let redirect_to = route
            .redirect_to
            .clone()
            .ok_or_else(|| RouterError::internal("redirect route lost its target"))?;
        let applier = RedirectApplier {
            serializer: self.serializer,
            url_tree: &self.url_tree,
        };
        match applier.apply(
            &route,
            &redirect_to,
            &result.consumed_segments,
            &result.positional_param_segments,
        )? {
            AppliedRedirect::Absolute(tree) => Err(RecognizeFailure::AbsoluteRedirect(tree)),
            AppliedRedirect::Relative(new_segments) => {
                let mut spliced = new_segments;
                spliced.extend(result.remaining_segments.iter().cloned());
                self.process_segment(
                    injector,
                    routes,
                    segment_group,
                    spliced,
                    outlet,
                    false,
                    parent,
                )
                .await
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn match_segment_against_route(
        &self,
        injector: Arc<Injector>,
        route: Arc<Route>,
        segment_group: UrlSegmentGroup,
        segments: Vec<UrlSegment>,
        outlet: String,
        parent: Arc<ActivatedRouteSnapshot>,
    ) -> Result<Vec<TreeNode<Arc<ActivatedRouteSnapshot>>>, RecognizeFailure> {
        let result = match_route(&segment_group, &route, &segments);
        if !result.matched {
            return Err(RecognizeFailure::NoMatch);
        }
        if let Some(outcome) = self
            .can_match_outcome(injector.clone(), &route, &result.consumed_segments)
            .await?
        {
            return Err(outcome);
        }

        let snapshot = self.build_snapshot(&route, &result, &parent);
        let (child_config, child_injector) = self
            .get_child_config(injector, &route, &result.consumed_segments)
            .await?;
        snapshot.set_route_injector(child_injector.clone());

        let split_result = split(
            &segment_group,
            &result.consumed_segments,
            &result.remaining_segments,
            &child_config,
        );

        if split_result.sliced_segments.is_empty() && split_result.segment_group.has_children() {
            let children = self
                .process_children(
                    child_injector,
                    child_config,
                    split_result.segment_group,
                    snapshot.clone(),
                )
                .await?;
            return Ok(vec![TreeNode::new(snapshot, children)]);
        }

        if child_config.is_empty() && split_result.sliced_segments.is_empty() {
            return Ok(vec![TreeNode::leaf(snapshot)]);
        }

        let matched_on_outlet = route.outlet_name() == outlet;
        let child_outlet = if matched_on_outlet {
            PRIMARY_OUTLET.to_string()
        } else {
            outlet
        };
        let children = self
            .process_segment(
                child_injector,
                child_config,
                split_result.segment_group,
                split_result.sliced_segments,
                child_outlet,
                true,
                snapshot.clone(),
            )
            .await?;
        Ok(vec![TreeNode::new(snapshot, children)])
    }

    fn build_snapshot(
        &self,
        route: &Arc<Route>,
        result: &MatchResult,
        parent: &Arc<ActivatedRouteSnapshot>,
    ) -> Arc<ActivatedRouteSnapshot> {
        let params = if inherits_from_parent(
            Some(route),
            Some(parent),
            self.params_inheritance,
        ) {
            let mut merged = parent.params.clone();
            merge_params(&mut merged, &result.parameters);
            merged
        } else {
            result.parameters.clone()
        };
        let component = route
            .component
            .or_else(|| self.config_loader.loaded_component(route));
        Arc::new(ActivatedRouteSnapshot::new(
            result.consumed_segments.clone(),
            params,
            self.url_tree.query_params.clone(),
            self.url_tree.fragment.clone(),
            route.outlet_name().to_string(),
            component,
            Some(route.clone()),
            route.data.clone(),
        ))
    }

    /// `Some(failure)` when a `canMatch` guard turned the route down.
    async fn can_match_outcome(
        &self,
        injector: Arc<Injector>,
        route: &Arc<Route>,
        consumed: &[UrlSegment],
    ) -> Result<Option<RecognizeFailure>, RecognizeFailure> {
        if route.can_match.is_empty() {
            return Ok(None);
        }
        match run_can_match_guards(injector, route, consumed, Some(&self.abort)).await {
            GuardsOutcome::Allow => Ok(None),
            // A rejected canMatch makes the route invisible to matching.
            GuardsOutcome::Reject => Ok(Some(RecognizeFailure::NoMatch)),
            GuardsOutcome::Redirect(tree) => Ok(Some(RecognizeFailure::GuardRedirect(tree))),
            GuardsOutcome::Error(error) => Err(RecognizeFailure::Error(error)),
        }
    }

    /// The child config of a matched route: inline children, or the lazily
    /// loaded config gated behind `canLoad`.
    async fn get_child_config(
        &self,
        injector: Arc<Injector>,
        route: &Arc<Route>,
        consumed: &[UrlSegment],
    ) -> Result<(Routes, Arc<Injector>), RecognizeFailure> {
        if !route.children.is_empty() {
            return Ok((route.children.clone(), injector));
        }
        if route.load_children.is_none() {
            return Ok((vec![], injector));
        }

        if let Some(loaded) = self.config_loader.loaded_children(route) {
            let child_injector = loaded.injector.unwrap_or(injector);
            return Ok((loaded.routes, child_injector));
        }

        if !route.can_load.is_empty() {
            match run_can_load_guards(injector.clone(), route, consumed, Some(&self.abort)).await {
                GuardsOutcome::Allow => {}
                // Unlike canMatch, a rejected canLoad cancels the whole
                // navigation rather than skipping the route.
                GuardsOutcome::Reject => {
                    return Err(RecognizeFailure::Error(can_load_fails(route)));
                }
                GuardsOutcome::Redirect(tree) => {
                    return Err(RecognizeFailure::GuardRedirect(tree));
                }
                GuardsOutcome::Error(error) => return Err(RecognizeFailure::Error(error)),
            }
        }

        let loaded = self
            .config_loader
            .load_children(route, self.events, self.navigation_id)
            .await?;
        let child_injector = loaded.injector.unwrap_or(injector);
        Ok((loaded.routes, child_injector))
    }
}

fn check_outlet_uniqueness(
    nodes: &[TreeNode<Arc<ActivatedRouteSnapshot>>],
) -> Result<(), RouterError> {
    let mut seen: HashMap<&str, &Arc<ActivatedRouteSnapshot>> = HashMap::new();
    for node in nodes {
        if let Some(previous) = seen.get(node.value.outlet.as_str()) {
            return Err(RouterError::OutletCollision {
                a: previous.url_display(),
                b: node.value.url_display(),
            });
        }
        seen.insert(node.value.outlet.as_str(), &node.value);
    }
    Ok(())
}

/// Primary outlet first, remaining siblings in lexicographic outlet order.
fn sort_activated_route_snapshots(
    nodes: &mut [TreeNode<Arc<ActivatedRouteSnapshot>>],
) {
    nodes.sort_by(|a, b| {
        if a.value.outlet == PRIMARY_OUTLET {
            return std::cmp::Ordering::Less;
        }
        if b.value.outlet == PRIMARY_OUTLET {
            return std::cmp::Ordering::Greater;
        }
        a.value.outlet.cmp(&b.value.outlet)
    });
}
