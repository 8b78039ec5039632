//! Route Matching
//!
//! Corresponds to packages/router/src/utils/config_matching.ts
//!
//! Matching is purely structural: a route's path template is compared to the
//! literal URL segments (or a custom matcher is delegated to). Route
//! selection order is config-array order and the first structural match
//! wins; there is no backtracking across earlier choices.

use indexmap::IndexMap;
use std::sync::Arc;

use crate::models::{PathMatch, Route, UrlMatchResult};
use crate::shared::{ParamValue, Params, PRIMARY_OUTLET};
use crate::url_tree::{UrlSegment, UrlSegmentGroup};

/// The outcome of matching one route against the head of a segment list.
#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    pub matched: bool,
    pub consumed_segments: Vec<UrlSegment>,
    pub remaining_segments: Vec<UrlSegment>,
    /// Named positional captures (`:id`), keyed by name.
    pub positional_param_segments: IndexMap<String, UrlSegment>,
    /// Positional captures plus the matrix params of the last consumed
    /// segment.
    pub parameters: Params,
}

impl MatchResult {
    fn no_match() -> Self {
        MatchResult::default()
    }
}

/// The default structural matcher: path template parts against literal
/// segments, `:name` parts capturing positionally.
pub fn default_url_matcher(
    segments: &[UrlSegment],
    segment_group: &UrlSegmentGroup,
    route: &Route,
) -> Option<UrlMatchResult> {
    let path = route.path.as_deref()?;
    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() > segments.len() {
        return None;
    }
    if route.path_match == PathMatch::Full
        && (segment_group.has_children() || parts.len() < segments.len())
    {
        return None;
    }
    let mut pos_params: IndexMap<String, UrlSegment> = IndexMap::new();
    for (part, segment) in parts.iter().zip(segments) {
        if let Some(name) = part.strip_prefix(':') {
            pos_params.insert(name.to_string(), segment.clone());
        } else if *part != segment.path {
            return None;
        }
    }
    Some(UrlMatchResult {
        consumed: segments[..parts.len()].to_vec(),
        pos_params,
    })
}

/// Match one route against `segments` within `segment_group`.
pub fn match_route(
    segment_group: &UrlSegmentGroup,
    route: &Arc<Route>,
    segments: &[UrlSegment],
) -> MatchResult {
    if route.is_empty_path() {
        if route.path_match == PathMatch::Full
            && (segment_group.has_children() || !segments.is_empty())
        {
            return MatchResult::no_match();
        }
        return MatchResult {
            matched: true,
            consumed_segments: vec![],
            remaining_segments: segments.to_vec(),
            positional_param_segments: IndexMap::new(),
            parameters: Params::new(),
        };
    }

    if route.path.as_deref() == Some("**") {
        let parameters = segments
            .last()
            .map(|s| matrix_params(s))
            .unwrap_or_default();
        return MatchResult {
            matched: true,
            consumed_segments: segments.to_vec(),
            remaining_segments: vec![],
            positional_param_segments: IndexMap::new(),
            parameters,
        };
    }

    let result = match &route.matcher {
        Some(matcher) => matcher(segments, segment_group, route),
        None => default_url_matcher(segments, segment_group, route),
    };
    let Some(result) = result else {
        return MatchResult::no_match();
    };

    let mut parameters: Params = result
        .pos_params
        .iter()
        .map(|(name, segment)| (name.clone(), ParamValue::Single(segment.path.clone())))
        .collect();
    if let Some(last) = result.consumed.last() {
        for (k, v) in &last.parameters {
            parameters.insert(k.clone(), ParamValue::Single(v.clone()));
        }
    }

    let remaining = segments[result.consumed.len()..].to_vec();
    MatchResult {
        matched: true,
        consumed_segments: result.consumed,
        remaining_segments: remaining,
        positional_param_segments: result.pos_params,
        parameters,
    }
}

fn matrix_params(segment: &UrlSegment) -> Params {
    segment
        .parameters
        .iter()
        .map(|(k, v)| (k.clone(), ParamValue::Single(v.clone())))
        .collect()
}

/// The result of [`split`]: a (possibly rewritten) segment group and the
/// segments still destined for the child config.
#[derive(Debug, Clone)]
pub struct SplitResult {
    pub segment_group: UrlSegmentGroup,
    pub sliced_segments: Vec<UrlSegment>,
}

/// Partition a segment group between this level and its child config,
/// explicitly materializing empty-path matches so empty-path routes under
/// different outlets can coexist.
pub fn split(
    segment_group: &UrlSegmentGroup,
    consumed_segments: &[UrlSegment],
    sliced_segments: &[UrlSegment],
    config: &[Arc<Route>],
) -> SplitResult {
    if !sliced_segments.is_empty()
        && contains_empty_path_matches_with_named_outlets(segment_group, sliced_segments, config)
    {
        let primary = UrlSegmentGroup::new(sliced_segments.to_vec(), segment_group.children.clone());
        let rewritten = UrlSegmentGroup::new(
            consumed_segments.to_vec(),
            create_children_for_empty_paths(config, primary),
        );
        return SplitResult {
            segment_group: rewritten,
            sliced_segments: vec![],
        };
    }

    if sliced_segments.is_empty()
        && contains_empty_path_matches(segment_group, sliced_segments, config)
    {
        let rewritten = UrlSegmentGroup::new(
            segment_group.segments.clone(),
            add_empty_paths_to_children_if_needed(segment_group, sliced_segments, config),
        );
        return SplitResult {
            segment_group: rewritten,
            sliced_segments: sliced_segments.to_vec(),
        };
    }

    SplitResult {
        segment_group: segment_group.clone(),
        sliced_segments: sliced_segments.to_vec(),
    }
}

fn add_empty_paths_to_children_if_needed(
    segment_group: &UrlSegmentGroup,
    sliced_segments: &[UrlSegment],
    routes: &[Arc<Route>],
) -> IndexMap<String, UrlSegmentGroup> {
    let mut children = segment_group.children.clone();
    for route in routes {
        if empty_path_match(segment_group, sliced_segments, route)
            && !children.contains_key(route.outlet_name())
        {
            children.insert(route.outlet_name().to_string(), UrlSegmentGroup::default());
        }
    }
    children
}

fn create_children_for_empty_paths(
    routes: &[Arc<Route>],
    primary_segment: UrlSegmentGroup,
) -> IndexMap<String, UrlSegmentGroup> {
    let mut children = IndexMap::new();
    children.insert(PRIMARY_OUTLET.to_string(), primary_segment);
    for route in routes {
        if route.is_empty_path() && route.outlet_name() != PRIMARY_OUTLET {
            children.insert(route.outlet_name().to_string(), UrlSegmentGroup::default());
        }
    }
    children
}

fn contains_empty_path_matches_with_named_outlets(
    segment_group: &UrlSegmentGroup,
    sliced_segments: &[UrlSegment],
    routes: &[Arc<Route>],
) -> bool {
    routes.iter().any(|r| {
        empty_path_match(segment_group, sliced_segments, r) && r.outlet_name() != PRIMARY_OUTLET
    })
}

fn contains_empty_path_matches(
    segment_group: &UrlSegmentGroup,
    sliced_segments: &[UrlSegment],
    routes: &[Arc<Route>],
) -> bool {
    routes
        .iter()
        .any(|r| empty_path_match(segment_group, sliced_segments, r))
}

/// Whether an empty-path route matches at this position.
pub fn empty_path_match(
    segment_group: &UrlSegmentGroup,
    sliced_segments: &[UrlSegment],
    route: &Route,
) -> bool {
    if (segment_group.has_children() || !sliced_segments.is_empty())
        && route.path_match == PathMatch::Full
    {
        return false;
    }
    route.is_empty_path()
}

/// Stable-sort a config so routes for `outlet_name` come first. Matching
/// still respects the original config order within each partition.
pub fn sort_by_matching_outlets(routes: &[Arc<Route>], outlet_name: &str) -> Vec<Arc<Route>> {
    let mut sorted: Vec<Arc<Route>> = routes
        .iter()
        .filter(|r| r.outlet_name() == outlet_name)
        .cloned()
        .collect();
    sorted.extend(
        routes
            .iter()
            .filter(|r| r.outlet_name() != outlet_name)
            .cloned(),
    );
    sorted
}

/// Whether the URL is fully consumed at this point.
pub fn no_leftovers_in_url(
    segment_group: &UrlSegmentGroup,
    segments: &[UrlSegment],
    outlet: &str,
) -> bool {
    segments.is_empty() && !matches!(segment_group.children.get(outlet), Some(c) if !c.is_empty())
}
