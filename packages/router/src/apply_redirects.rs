//! Redirect Application
//!
//! Corresponds to packages/router/src/apply_redirects.ts
//!
//! Builds the URL a `redirectTo` points at, substituting `:name`
//! placeholders from the consumed segments and positional captures. An
//! absolute target (leading `/`) aborts the surrounding expansion through a
//! control-flow signal so matching restarts from the new tree.

use indexmap::IndexMap;
use std::sync::Arc;

use crate::errors::RouterError;
use crate::models::Route;
use crate::shared::{ParamValue, Params};
use crate::url_tree::{UrlSegment, UrlSegmentGroup, UrlSerializer, UrlTree};

/// Control-flow outcome of expanding one segment group. `NoMatch` is
/// recoverable within sibling-route iteration; the other variants unwind the
/// whole recognition.
#[derive(Debug)]
pub(crate) enum RecognizeFailure {
    NoMatch,
    /// Restart matching from this tree; resets the no-further-redirects flag
    /// once.
    AbsoluteRedirect(UrlTree),
    /// A `canMatch`/`canLoad` guard asked for a redirect.
    GuardRedirect(UrlTree),
    Error(RouterError),
}

impl From<RouterError> for RecognizeFailure {
    fn from(error: RouterError) -> Self {
        RecognizeFailure::Error(error)
    }
}

/// The applied form of one `redirectTo`.
pub(crate) enum AppliedRedirect {
    /// Restart from the substituted absolute tree.
    Absolute(UrlTree),
    /// Splice these segments in place of the consumed ones and continue.
    Relative(Vec<UrlSegment>),
}

pub(crate) struct RedirectApplier<'a> {
    pub serializer: &'a dyn UrlSerializer,
    /// The tree being navigated to; supplies query params and fragment for
    /// carry-over and `:name` query substitution.
    pub url_tree: &'a UrlTree,
}

impl<'a> RedirectApplier<'a> {
    pub fn apply(
        &self,
        route: &Route,
        redirect_to: &str,
        consumed_segments: &[UrlSegment],
        pos_params: &IndexMap<String, UrlSegment>,
    ) -> Result<AppliedRedirect, RouterError> {
        let parsed = self.serializer.parse(redirect_to)?;
        let root =
            self.create_segment_group(redirect_to, &parsed.root, consumed_segments, pos_params)?;

        if redirect_to.starts_with('/') {
            let query_params = if parsed.query_params.is_empty() {
                self.url_tree.query_params.clone()
            } else {
                self.substitute_query_params(&parsed.query_params)
            };
            let fragment = parsed
                .fragment
                .clone()
                .or_else(|| self.url_tree.fragment.clone());
            return Ok(AppliedRedirect::Absolute(UrlTree::new(
                root,
                query_params,
                fragment,
            )));
        }

        Ok(AppliedRedirect::Relative(self.linearize_segments(
            route,
            &root,
            redirect_to,
        )?))
    }

    /// `:name` query values are taken from the requested URL's query params.
    fn substitute_query_params(&self, redirect_params: &Params) -> Params {
        let mut out = Params::new();
        for (key, value) in redirect_params {
            let substituted = match value {
                ParamValue::Single(v) if v.starts_with(':') => self
                    .url_tree
                    .query_params
                    .get(&v[1..])
                    .cloned()
                    .unwrap_or_else(|| value.clone()),
                other => other.clone(),
            };
            out.insert(key.clone(), substituted);
        }
        out
    }

    fn create_segment_group(
        &self,
        redirect_to: &str,
        group: &UrlSegmentGroup,
        actual_segments: &[UrlSegment],
        pos_params: &IndexMap<String, UrlSegment>,
    ) -> Result<UrlSegmentGroup, RouterError> {
        let segments =
            self.create_segments(redirect_to, &group.segments, actual_segments, pos_params)?;
        let mut children = IndexMap::new();
        for (outlet, child) in &group.children {
            children.insert(
                outlet.clone(),
                self.create_segment_group(redirect_to, child, actual_segments, pos_params)?,
            );
        }
        Ok(UrlSegmentGroup::new(segments, children))
    }

    fn create_segments(
        &self,
        redirect_to: &str,
        redirect_segments: &[UrlSegment],
        actual_segments: &[UrlSegment],
        pos_params: &IndexMap<String, UrlSegment>,
    ) -> Result<Vec<UrlSegment>, RouterError> {
        redirect_segments
            .iter()
            .map(|segment| {
                if let Some(name) = segment.path.strip_prefix(':') {
                    pos_params.get(name).cloned().ok_or_else(|| {
                        RouterError::internal(format!(
                            "Cannot redirect to '{redirect_to}'. Cannot find ':{name}'."
                        ))
                    })
                } else {
                    // Reuse the matching consumed segment so its matrix
                    // params survive the redirect.
                    Ok(actual_segments
                        .iter()
                        .find(|actual| actual.path == segment.path)
                        .cloned()
                        .unwrap_or_else(|| segment.clone()))
                }
            })
            .collect()
    }

    /// Flatten the primary chain of a relative redirect into a segment
    /// list. Named outlets require an absolute redirect.
    fn linearize_segments(
        &self,
        _route: &Route,
        root: &UrlSegmentGroup,
        redirect_to: &str,
    ) -> Result<Vec<UrlSegment>, RouterError> {
        let mut segments = Vec::new();
        let mut current = root;
        loop {
            segments.extend(current.segments.iter().cloned());
            if current.number_of_children() == 0 {
                return Ok(segments);
            }
            if current.number_of_children() > 1 || current.primary_child().is_none() {
                return Err(RouterError::NamedOutletRedirect {
                    redirect_to: redirect_to.to_string(),
                });
            }
            current = current
                .primary_child()
                .ok_or_else(|| RouterError::internal("primary child disappeared"))?;
        }
    }
}

/// The error raised when a `canLoad` guard rejects a lazy route.
pub(crate) fn can_load_fails(route: &Arc<Route>) -> RouterError {
    RouterError::CanLoadRejected {
        path: route.path_display(),
    }
}

/// The error surfaced when nothing matched the remaining URL.
pub(crate) fn no_match_error(url_tree: &UrlTree, serializer: &dyn UrlSerializer) -> RouterError {
    RouterError::NoMatch {
        segments: serializer.serialize(url_tree),
    }
}
