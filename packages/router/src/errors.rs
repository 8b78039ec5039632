//! Router Errors
//!
//! Corresponds to packages/router/src/errors.ts

use thiserror::Error;

/// The public error taxonomy of the router.
///
/// Cancellations and skips are not errors; they settle the navigation
/// promise with `false` and are reported through the event stream only.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouterError {
    /// No route configuration matches the requested URL.
    #[error("Cannot match any routes. URL Segment: '{segments}'")]
    NoMatch { segments: String },

    /// The bounded absolute-redirect counter overflowed; the configuration
    /// contains a redirect cycle.
    #[error("Detected possible infinite redirect when redirecting from '{from}' to '{to}'")]
    InfiniteRedirect { from: String, to: String },

    /// A relative `redirectTo` cannot retarget named outlets.
    #[error(
        "Only absolute redirects can have named outlets. redirectTo: '{redirect_to}'"
    )]
    NamedOutletRedirect { redirect_to: String },

    /// Two sibling route matches claimed the same outlet.
    #[error("Two segments cannot have the same outlet name: '{a}' and '{b}'")]
    OutletCollision { a: String, b: String },

    /// A malformed URL string.
    #[error("Cannot parse url '{url}': {message}")]
    UrlParse { message: String, url: String },

    /// `canLoad` rejected loading a lazy route.
    #[error("Cannot load children because the guard of the route \"path: '{path}'\" returned false")]
    CanLoadRejected { path: String },

    /// A lazy route loader failed.
    #[error("Failed to load route configuration for path '{path}': {message}")]
    LoadFailure { path: String, message: String },

    /// A guard or resolver failed with an application error.
    #[error("{message}")]
    GuardFailure { message: String },

    /// The router (and its transition queue) was destroyed while the
    /// navigation was in flight.
    #[error("The navigation was aborted because the router was destroyed")]
    RouterDestroyed,

    /// Any other unexpected failure inside the pipeline.
    #[error("Navigation failed: {message}")]
    Internal { message: String },
}

impl RouterError {
    pub fn internal(message: impl Into<String>) -> Self {
        RouterError::Internal {
            message: message.into(),
        }
    }
}
