//! URL Handling Strategy
//!
//! Corresponds to packages/router/src/url_handling_strategy.ts
//!
//! Lets an application run the router on only part of the URL space, e.g.
//! during incremental migrations. The default strategy processes everything.

use crate::url_tree::UrlTree;

pub trait UrlHandlingStrategy: Send + Sync {
    /// Whether the router should run its pipeline for this URL at all.
    fn should_process_url(&self, url: &UrlTree) -> bool;

    /// The part of the URL the router is responsible for.
    fn extract(&self, url: &UrlTree) -> UrlTree;

    /// Recombine the router-owned part with the rest of the raw URL for the
    /// browser address bar.
    fn merge(&self, new_url_part: &UrlTree, raw_url: &UrlTree) -> UrlTree;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultUrlHandlingStrategy;

impl UrlHandlingStrategy for DefaultUrlHandlingStrategy {
    fn should_process_url(&self, _url: &UrlTree) -> bool {
        true
    }

    fn extract(&self, url: &UrlTree) -> UrlTree {
        url.clone()
    }

    fn merge(&self, new_url_part: &UrlTree, _raw_url: &UrlTree) -> UrlTree {
        new_url_part.clone()
    }
}
