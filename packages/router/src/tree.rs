//! Route Trees
//!
//! Corresponds to packages/router/src/utils/tree.ts
//!
//! Both the snapshot tree and the live router state are trees of shared
//! nodes; lookups (`parent`, `path_from_root`) compare node identity, not
//! structure.

use std::sync::Arc;

/// Identity comparison for tree lookups.
pub trait RefEq {
    fn ref_eq(&self, other: &Self) -> bool;
}

impl<T: ?Sized> RefEq for Arc<T> {
    fn ref_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

#[derive(Debug, Clone)]
pub struct TreeNode<T> {
    pub value: T,
    pub children: Vec<TreeNode<T>>,
}

impl<T> TreeNode<T> {
    pub fn new(value: T, children: Vec<TreeNode<T>>) -> Self {
        TreeNode { value, children }
    }

    pub fn leaf(value: T) -> Self {
        TreeNode {
            value,
            children: vec![],
        }
    }

    /// Preorder walk over all nodes.
    pub fn for_each<F: FnMut(&TreeNode<T>)>(&self, f: &mut F) {
        f(self);
        for child in &self.children {
            child.for_each(f);
        }
    }
}

impl<T: RefEq + Clone> TreeNode<T> {
    /// The root-to-target path of values, identity-matched. Empty when the
    /// target is not in this tree.
    pub fn path_from_root(&self, target: &T) -> Vec<T> {
        let mut path = Vec::new();
        if self.collect_path(target, &mut path) {
            path.reverse();
        } else {
            path.clear();
        }
        path
    }

    fn collect_path(&self, target: &T, path: &mut Vec<T>) -> bool {
        if self.value.ref_eq(target) {
            path.push(self.value.clone());
            return true;
        }
        for child in &self.children {
            if child.collect_path(target, path) {
                path.push(self.value.clone());
                return true;
            }
        }
        false
    }

    /// The parent value of `target`, if any.
    pub fn parent_of(&self, target: &T) -> Option<T> {
        let path = self.path_from_root(target);
        if path.len() >= 2 {
            path.get(path.len() - 2).cloned()
        } else {
            None
        }
    }

    /// The direct children values of `target`.
    pub fn children_of(&self, target: &T) -> Vec<T> {
        self.find_node(target)
            .map(|node| node.children.iter().map(|c| c.value.clone()).collect())
            .unwrap_or_default()
    }

    pub fn find_node(&self, target: &T) -> Option<&TreeNode<T>> {
        if self.value.ref_eq(target) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_node(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(v: usize, children: Vec<TreeNode<Arc<usize>>>) -> TreeNode<Arc<usize>> {
        TreeNode::new(Arc::new(v), children)
    }

    #[test]
    fn should_find_the_path_from_root_by_identity() {
        let target = Arc::new(3usize);
        let tree = TreeNode::new(
            Arc::new(1usize),
            vec![node(2, vec![]), TreeNode::leaf(target.clone())],
        );
        let path = tree.path_from_root(&target);
        assert_eq!(path.len(), 2);
        assert!(Arc::ptr_eq(&path[1], &target));
    }

    #[test]
    fn should_not_match_structurally_equal_but_distinct_nodes() {
        let tree = node(1, vec![node(2, vec![])]);
        let impostor = Arc::new(2usize);
        assert!(tree.path_from_root(&impostor).is_empty());
    }
}
