//! URL and History State
//!
//! Corresponds to packages/router/src/statemanager/state_manager.ts
//!
//! Owns the committed URL tree, the raw requested tree, the live router
//! state, and the browser location abstraction. The visible URL only moves
//! at activation time; cancellations before that are invisible, and failures
//! after a commit are rolled back here.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::warn;

use crate::models::ComponentType;
use crate::router_state::RouterState;
use crate::url_tree::{UrlSerializer, UrlTree};

/// The history-state blob attached to every entry the router writes, used
/// to compute rollback deltas for popstate-originated navigations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoredState {
    pub navigation_id: usize,
    pub router_page_id: usize,
}

/// Browser location abstraction. The router only needs path read/write,
/// push vs replace, and relative history traversal.
pub trait Location: Send + Sync {
    fn path(&self) -> String;
    fn go(&self, path: &str, state: RestoredState);
    fn replace_state(&self, path: &str, state: RestoredState);
    fn history_go(&self, delta: isize);
    fn state(&self) -> Option<RestoredState>;

    fn is_current_path_equal_to(&self, path: &str) -> bool {
        self.path() == path
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    path: String,
    state: Option<RestoredState>,
}

/// An in-memory history stack, standing in for the browser in tests.
#[derive(Debug)]
pub struct MemoryLocation {
    entries: Mutex<(Vec<MemoryEntry>, usize)>,
}

impl Default for MemoryLocation {
    fn default() -> Self {
        MemoryLocation {
            entries: Mutex::new((
                vec![MemoryEntry {
                    path: "/".to_string(),
                    state: None,
                }],
                0,
            )),
        }
    }
}

impl MemoryLocation {
    pub fn new() -> Self {
        MemoryLocation::default()
    }

    /// Number of entries currently on the stack.
    pub fn length(&self) -> usize {
        self.entries.lock().expect("location lock poisoned").0.len()
    }
}

impl Location for MemoryLocation {
    fn path(&self) -> String {
        let entries = self.entries.lock().expect("location lock poisoned");
        entries.0[entries.1].path.clone()
    }

    fn go(&self, path: &str, state: RestoredState) {
        let mut entries = self.entries.lock().expect("location lock poisoned");
        let index = entries.1;
        entries.0.truncate(index + 1);
        entries.0.push(MemoryEntry {
            path: path.to_string(),
            state: Some(state),
        });
        entries.1 = index + 1;
    }

    fn replace_state(&self, path: &str, state: RestoredState) {
        let mut entries = self.entries.lock().expect("location lock poisoned");
        let index = entries.1;
        entries.0[index] = MemoryEntry {
            path: path.to_string(),
            state: Some(state),
        };
    }

    fn history_go(&self, delta: isize) {
        let mut entries = self.entries.lock().expect("location lock poisoned");
        let target = entries.1 as isize + delta;
        let clamped = target.clamp(0, entries.0.len() as isize - 1);
        entries.1 = clamped as usize;
    }

    fn state(&self) -> Option<RestoredState> {
        let entries = self.entries.lock().expect("location lock poisoned");
        entries.0[entries.1].state
    }
}

/// Tracks URL and state across navigations.
pub struct StateManager {
    serializer: Arc<dyn UrlSerializer>,
    location: Arc<dyn Location>,
    current_url_tree: RwLock<UrlTree>,
    raw_url_tree: RwLock<UrlTree>,
    router_state: RwLock<Arc<RouterState>>,
    /// The page id of the currently displayed history entry.
    current_page_id: AtomicUsize,
}

impl StateManager {
    pub fn new(
        serializer: Arc<dyn UrlSerializer>,
        location: Arc<dyn Location>,
        root_component: Option<ComponentType>,
    ) -> Self {
        StateManager {
            serializer,
            location,
            current_url_tree: RwLock::new(UrlTree::empty()),
            raw_url_tree: RwLock::new(UrlTree::empty()),
            router_state: RwLock::new(Arc::new(RouterState::create_empty(root_component))),
            current_page_id: AtomicUsize::new(0),
        }
    }

    pub fn current_url_tree(&self) -> UrlTree {
        self.current_url_tree
            .read()
            .expect("state lock poisoned")
            .clone()
    }

    pub fn raw_url_tree(&self) -> UrlTree {
        self.raw_url_tree.read().expect("state lock poisoned").clone()
    }

    pub fn router_state(&self) -> Arc<RouterState> {
        self.router_state.read().expect("state lock poisoned").clone()
    }

    pub fn location(&self) -> Arc<dyn Location> {
        self.location.clone()
    }

    pub fn current_page_id(&self) -> usize {
        self.current_page_id.load(Ordering::SeqCst)
    }

    /// The serialized committed URL.
    pub fn url(&self) -> String {
        self.serializer.serialize(&self.current_url_tree())
    }

    /// Commit a successful navigation: swap in the new trees and state and
    /// move the browser URL (unless the navigation asked not to).
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn commit(
        &self,
        url: UrlTree,
        raw_url: UrlTree,
        state: Arc<RouterState>,
        navigation_id: usize,
        skip_location_change: bool,
        replace_url: bool,
        restored: Option<RestoredState>,
    ) {
        let path = self.serializer.serialize(&raw_url);
        *self.current_url_tree.write().expect("state lock poisoned") = url;
        *self.raw_url_tree.write().expect("state lock poisoned") = raw_url;
        *self.router_state.write().expect("state lock poisoned") = state;

        if let Some(restored) = restored {
            // A popstate navigation: the browser already moved, adopt its
            // page id.
            self.current_page_id
                .store(restored.router_page_id, Ordering::SeqCst);
            return;
        }
        if skip_location_change {
            return;
        }

        let replace = replace_url || self.location.is_current_path_equal_to(&path);
        let router_page_id = if replace {
            self.current_page_id()
        } else {
            self.current_page_id() + 1
        };
        let blob = RestoredState {
            navigation_id,
            router_page_id,
        };
        if replace {
            self.location.replace_state(&path, blob);
        } else {
            self.location.go(&path, blob);
        }
        self.current_page_id.store(router_page_id, Ordering::SeqCst);
    }

    /// Roll the visible URL back to the last committed one after a failed or
    /// cancelled navigation that already touched history.
    pub(crate) fn restore_history(&self, navigation_id: usize, restored: Option<RestoredState>) {
        if let Some(restored) = restored {
            // Undo a popstate by traveling the delta back to the committed
            // page.
            let delta = self.current_page_id() as isize - restored.router_page_id as isize;
            if delta != 0 {
                warn!(navigation_id, delta, "restoring history after failed navigation");
                self.location.history_go(delta);
            }
            return;
        }

        let committed_path = self.serializer.serialize(&self.current_url_tree());
        if self.location.is_current_path_equal_to(&committed_path) {
            return;
        }
        warn!(navigation_id, path = %committed_path, "resetting browser URL after failed navigation");
        let blob = RestoredState {
            navigation_id,
            router_page_id: self.current_page_id(),
        };
        self.location.replace_state(&committed_path, blob);
    }
}

impl std::fmt::Debug for StateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateManager")
            .field("url", &self.url())
            .field("current_page_id", &self.current_page_id())
            .finish()
    }
}
