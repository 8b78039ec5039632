//! Data Resolution
//!
//! Corresponds to packages/router/src/operators/resolve_data.ts
//!
//! Runs after all guards pass. Routes resolve in activation order; the
//! resolvers of one route run concurrently. A resolver that completes
//! without producing a value cancels the navigation.

use futures::future::join_all;
use std::sync::Arc;
use tracing::debug;

use crate::abort::AbortSignal;
use crate::errors::RouterError;
use crate::guards::Checks;
use crate::injector::Injector;
use crate::models::ResolveContext;
use crate::router_state::{apply_inherited_data, ParamsInheritanceStrategy, RouterStateSnapshot};
use crate::shared::Data;

#[derive(Debug)]
pub(crate) enum ResolveOutcome {
    Complete,
    /// A resolver finished without a value; carries the route path for the
    /// cancellation message.
    NoData(String),
    Aborted,
    Error(RouterError),
}

/// Run the resolvers of every route being (re)activated and install their
/// outputs on the snapshots, re-deriving inherited `data` as results land so
/// later resolvers observe ancestor outputs.
pub(crate) async fn resolve_data(
    checks: &Checks,
    future_state: &Arc<RouterStateSnapshot>,
    root_injector: &Arc<Injector>,
    strategy: ParamsInheritanceStrategy,
    abort: &AbortSignal,
) -> ResolveOutcome {
    for path in &checks.can_activate {
        let Some(snapshot) = path.last() else {
            continue;
        };
        let Some(config) = snapshot.route_config.as_ref() else {
            continue;
        };
        if config.resolve.is_empty() {
            continue;
        }
        let injector = snapshot
            .route_injector()
            .unwrap_or_else(|| root_injector.clone());

        let keys: Vec<String> = config.resolve.keys().cloned().collect();
        let futures: Vec<_> = config
            .resolve
            .values()
            .map(|resolver| {
                resolver(ResolveContext {
                    route: snapshot.clone(),
                    state: future_state.clone(),
                    injector: injector.clone(),
                })
            })
            .collect();
        let results = tokio::select! {
            _ = abort.cancelled() => return ResolveOutcome::Aborted,
            results = join_all(futures) => results,
        };

        let mut resolved = Data::new();
        for (key, result) in keys.into_iter().zip(results) {
            match result {
                Ok(Some(value)) => {
                    resolved.insert(key, value);
                }
                Ok(None) => {
                    debug!(path = %config.path_display(), key, "resolver completed without a value");
                    return ResolveOutcome::NoData(config.path_display());
                }
                Err(error) => return ResolveOutcome::Error(error),
            }
        }
        snapshot.set_resolved_data(resolved);
        apply_inherited_data(future_state, strategy);
    }
    ResolveOutcome::Complete
}
