//! Router Events
//!
//! Corresponds to packages/router/src/events.ts
//!
//! Events are tagged unions of plain records rather than a class hierarchy.
//! Each navigation emits every applicable kind at most once, in pipeline
//! order, and the stream is the only supported way to observe transition
//! progress.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Identifies what initiated a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavigationTrigger {
    Imperative,
    PopState,
    HashChange,
}

/// Why a navigation was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavigationCancellationCode {
    /// A guard or redirect produced a new URL; a follow-up navigation was
    /// scheduled.
    Redirect,
    /// A newer navigation started before this one finished.
    SupersededByNewNavigation,
    /// A resolver completed without producing a value.
    NoDataFromResolver,
    /// A guard returned `false`.
    GuardRejected,
    /// The navigation was cancelled from outside the pipeline.
    Aborted,
}

/// Why a navigation was skipped without running the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavigationSkippedCode {
    IgnoredSameUrlNavigation,
    IgnoredByUrlHandlingStrategy,
}

/// One router event. `id` is the navigation id the event belongs to; `url`
/// is the serialized requested URL of that navigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    NavigationStart {
        id: usize,
        url: String,
        trigger: NavigationTrigger,
    },
    RouteConfigLoadStart {
        id: usize,
        path: String,
    },
    RouteConfigLoadEnd {
        id: usize,
        path: String,
    },
    RoutesRecognized {
        id: usize,
        url: String,
        url_after_redirects: String,
    },
    GuardsCheckStart {
        id: usize,
        url: String,
        url_after_redirects: String,
    },
    ChildActivationStart {
        id: usize,
        /// The `path` of the route config whose children are activating.
        path: String,
    },
    ActivationStart {
        id: usize,
        path: String,
        outlet: String,
    },
    GuardsCheckEnd {
        id: usize,
        url: String,
        url_after_redirects: String,
        should_activate: bool,
    },
    ResolveStart {
        id: usize,
        url: String,
        url_after_redirects: String,
    },
    ResolveEnd {
        id: usize,
        url: String,
        url_after_redirects: String,
    },
    BeforeActivateRoutes {
        id: usize,
        url: String,
    },
    ActivationEnd {
        id: usize,
        path: String,
        outlet: String,
    },
    ChildActivationEnd {
        id: usize,
        path: String,
    },
    NavigationEnd {
        id: usize,
        url: String,
        url_after_redirects: String,
    },
    NavigationCancel {
        id: usize,
        url: String,
        code: NavigationCancellationCode,
        reason: String,
    },
    NavigationError {
        id: usize,
        url: String,
        error: String,
    },
    NavigationSkipped {
        id: usize,
        url: String,
        code: NavigationSkippedCode,
        reason: String,
    },
}

impl Event {
    /// The id of the navigation this event belongs to.
    pub fn id(&self) -> usize {
        match self {
            Event::NavigationStart { id, .. }
            | Event::RouteConfigLoadStart { id, .. }
            | Event::RouteConfigLoadEnd { id, .. }
            | Event::RoutesRecognized { id, .. }
            | Event::GuardsCheckStart { id, .. }
            | Event::ChildActivationStart { id, .. }
            | Event::ActivationStart { id, .. }
            | Event::GuardsCheckEnd { id, .. }
            | Event::ResolveStart { id, .. }
            | Event::ResolveEnd { id, .. }
            | Event::BeforeActivateRoutes { id, .. }
            | Event::ActivationEnd { id, .. }
            | Event::ChildActivationEnd { id, .. }
            | Event::NavigationEnd { id, .. }
            | Event::NavigationCancel { id, .. }
            | Event::NavigationError { id, .. }
            | Event::NavigationSkipped { id, .. } => *id,
        }
    }

    /// Short kind name, used by tests asserting event order.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::NavigationStart { .. } => "NavigationStart",
            Event::RouteConfigLoadStart { .. } => "RouteConfigLoadStart",
            Event::RouteConfigLoadEnd { .. } => "RouteConfigLoadEnd",
            Event::RoutesRecognized { .. } => "RoutesRecognized",
            Event::GuardsCheckStart { .. } => "GuardsCheckStart",
            Event::ChildActivationStart { .. } => "ChildActivationStart",
            Event::ActivationStart { .. } => "ActivationStart",
            Event::GuardsCheckEnd { .. } => "GuardsCheckEnd",
            Event::ResolveStart { .. } => "ResolveStart",
            Event::ResolveEnd { .. } => "ResolveEnd",
            Event::BeforeActivateRoutes { .. } => "BeforeActivateRoutes",
            Event::ActivationEnd { .. } => "ActivationEnd",
            Event::ChildActivationEnd { .. } => "ChildActivationEnd",
            Event::NavigationEnd { .. } => "NavigationEnd",
            Event::NavigationCancel { .. } => "NavigationCancel",
            Event::NavigationError { .. } => "NavigationError",
            Event::NavigationSkipped { .. } => "NavigationSkipped",
        }
    }
}

/// Fan-out of router events to any number of subscribers.
///
/// Delivery is in emission order per subscriber; closed subscribers are
/// dropped on the next emission.
#[derive(Clone, Default)]
pub struct EventSink {
    subscribers: Arc<Mutex<Vec<UnboundedSender<Event>>>>,
}

impl EventSink {
    pub fn new() -> Self {
        EventSink::default()
    }

    pub fn subscribe(&self) -> UnboundedReceiver<Event> {
        let (tx, rx) = unbounded_channel();
        self.subscribers
            .lock()
            .expect("event sink lock poisoned")
            .push(tx);
        rx
    }

    pub fn emit(&self, event: Event) {
        let mut subscribers = self.subscribers.lock().expect("event sink lock poisoned");
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink").finish_non_exhaustive()
    }
}
