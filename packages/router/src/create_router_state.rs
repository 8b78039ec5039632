//! Live State Construction
//!
//! Corresponds to packages/router/src/create_router_state.ts
//!
//! Diffs the recognized snapshot tree against the previous live tree in
//! lockstep. Where the reuse strategy says a node survives, the existing
//! `ActivatedRoute` is kept (identity preserved for consumers holding it)
//! and only its staged snapshot is swapped; everywhere else fresh nodes are
//! created.

use std::sync::Arc;

use crate::route_reuse_strategy::RouteReuseStrategy;
use crate::router_state::{
    ActivatedRoute, ActivatedRouteSnapshot, RouterState, RouterStateSnapshot,
};
use crate::tree::TreeNode;

pub(crate) fn create_router_state(
    strategy: &dyn RouteReuseStrategy,
    curr: Arc<RouterStateSnapshot>,
    prev_state: Option<&RouterState>,
) -> RouterState {
    let root = create_node(strategy, &curr.root, prev_state.map(|s| &s.root));
    RouterState::new(root, curr)
}

fn create_node(
    strategy: &dyn RouteReuseStrategy,
    curr: &TreeNode<Arc<ActivatedRouteSnapshot>>,
    prev: Option<&TreeNode<Arc<ActivatedRoute>>>,
) -> TreeNode<Arc<ActivatedRoute>> {
    if let Some(prev) = prev {
        if strategy.should_reuse_route(&curr.value, &prev.value.snapshot()) {
            let value = prev.value.clone();
            value.set_future_snapshot(curr.value.clone());
            let children = create_or_reuse_children(strategy, curr, prev);
            return TreeNode::new(value, children);
        }
    }

    if strategy.should_attach(&curr.value) {
        if let Some(handle) = strategy.retrieve(&curr.value) {
            let tree = handle.root;
            set_future_snapshots(curr, &tree);
            return tree;
        }
    }

    let value = ActivatedRoute::from_snapshot(curr.value.clone());
    let children = curr
        .children
        .iter()
        .map(|c| create_node(strategy, c, None))
        .collect();
    TreeNode::new(value, children)
}

fn create_or_reuse_children(
    strategy: &dyn RouteReuseStrategy,
    curr: &TreeNode<Arc<ActivatedRouteSnapshot>>,
    prev: &TreeNode<Arc<ActivatedRoute>>,
) -> Vec<TreeNode<Arc<ActivatedRoute>>> {
    curr.children
        .iter()
        .map(|child| {
            // The strategy decides pairing too, so a custom strategy can
            // carry a live node across config boundaries.
            let prev_child = prev
                .children
                .iter()
                .find(|p| strategy.should_reuse_route(&child.value, &p.value.snapshot()));
            create_node(strategy, child, prev_child)
        })
        .collect()
}

/// Stage the new snapshots on a reattached subtree, walking both trees in
/// lockstep.
fn set_future_snapshots(
    curr: &TreeNode<Arc<ActivatedRouteSnapshot>>,
    tree: &TreeNode<Arc<ActivatedRoute>>,
) {
    tree.value.set_future_snapshot(curr.value.clone());
    for (curr_child, tree_child) in curr.children.iter().zip(&tree.children) {
        set_future_snapshots(curr_child, tree_child);
    }
}
