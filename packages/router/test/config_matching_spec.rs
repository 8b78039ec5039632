//! Route matching integration tests.
//!
//! Corresponds to packages/router/test/config/config_matching.spec.ts

use std::sync::Arc;

use angular_router::config_matching::{
    match_route, no_leftovers_in_url, sort_by_matching_outlets, split,
};
use angular_router::models::{ComponentType, Route};
use angular_router::shared::ParamValue;
use angular_router::url_tree::{UrlSegment, UrlSegmentGroup};

fn segments(paths: &[&str]) -> Vec<UrlSegment> {
    paths.iter().map(|p| UrlSegment::new(*p)).collect()
}

fn group(paths: &[&str]) -> UrlSegmentGroup {
    UrlSegmentGroup::new(segments(paths), Default::default())
}

#[test]
fn should_match_literal_paths() {
    let route = Arc::new(Route::new("a/b"));
    let segs = segments(&["a", "b", "c"]);
    let result = match_route(&group(&["a", "b", "c"]), &route, &segs);
    assert!(result.matched);
    assert_eq!(result.consumed_segments.len(), 2);
    assert_eq!(result.remaining_segments.len(), 1);
    assert_eq!(result.remaining_segments[0].path, "c");
}

#[test]
fn should_not_match_a_different_path() {
    let route = Arc::new(Route::new("a/b"));
    let segs = segments(&["a", "x"]);
    assert!(!match_route(&group(&["a", "x"]), &route, &segs).matched);
}

#[test]
fn should_capture_positional_params() {
    let route = Arc::new(Route::new("users/:id"));
    let segs = segments(&["users", "5"]);
    let result = match_route(&group(&["users", "5"]), &route, &segs);
    assert!(result.matched);
    assert_eq!(
        result.parameters.get("id"),
        Some(&ParamValue::Single("5".into()))
    );
    assert_eq!(
        result.positional_param_segments.get("id").map(|s| s.path.as_str()),
        Some("5")
    );
}

#[test]
fn should_merge_matrix_params_of_the_last_consumed_segment() {
    let route = Arc::new(Route::new("users/:id"));
    let mut segs = segments(&["users"]);
    let mut params = indexmap::IndexMap::new();
    params.insert("sort".to_string(), "asc".to_string());
    segs.push(UrlSegment::with_parameters("5", params));
    let sg = UrlSegmentGroup::new(segs.clone(), Default::default());
    let result = match_route(&sg, &route, &segs);
    assert!(result.matched);
    assert_eq!(
        result.parameters.get("sort"),
        Some(&ParamValue::Single("asc".into()))
    );
}

#[test]
fn should_respect_full_path_matching() {
    let route = Arc::new(Route::new("a").path_match_full());
    let segs = segments(&["a", "b"]);
    assert!(!match_route(&group(&["a", "b"]), &route, &segs).matched);

    let segs = segments(&["a"]);
    assert!(match_route(&group(&["a"]), &route, &segs).matched);
}

#[test]
fn should_match_the_wildcard_route_against_anything() {
    let route = Arc::new(Route::new("**"));
    let segs = segments(&["x", "y", "z"]);
    let result = match_route(&group(&["x", "y", "z"]), &route, &segs);
    assert!(result.matched);
    assert_eq!(result.consumed_segments.len(), 3);
    assert!(result.remaining_segments.is_empty());
}

#[test]
fn should_match_empty_path_routes_without_consuming() {
    let route = Arc::new(Route::new(""));
    let segs = segments(&["a"]);
    let result = match_route(&group(&["a"]), &route, &segs);
    assert!(result.matched);
    assert!(result.consumed_segments.is_empty());
    assert_eq!(result.remaining_segments.len(), 1);

    let full = Arc::new(Route::new("").path_match_full());
    assert!(!match_route(&group(&["a"]), &full, &segs).matched);
    assert!(match_route(&group(&[]), &full, &[]).matched);
}

#[test]
fn should_sort_routes_for_the_requested_outlet_first() {
    let routes = vec![
        Arc::new(Route::new("a").component(ComponentType("A"))),
        Arc::new(Route::new("b").outlet("aux").component(ComponentType("B"))),
        Arc::new(Route::new("c").component(ComponentType("C"))),
    ];
    let sorted = sort_by_matching_outlets(&routes, "aux");
    assert_eq!(sorted[0].path.as_deref(), Some("b"));
    assert_eq!(sorted[1].path.as_deref(), Some("a"));
    assert_eq!(sorted[2].path.as_deref(), Some("c"));
}

#[test]
fn should_detect_leftover_segments() {
    let empty = group(&[]);
    assert!(no_leftovers_in_url(&empty, &[], "primary"));
    assert!(!no_leftovers_in_url(&empty, &segments(&["a"]), "primary"));

    let mut children = indexmap::IndexMap::new();
    children.insert("primary".to_string(), group(&["rest"]));
    let with_child = UrlSegmentGroup::new(vec![], children);
    assert!(!no_leftovers_in_url(&with_child, &[], "primary"));
}

#[test]
fn should_materialize_empty_path_children_on_split() {
    let sg = group(&["a"]);
    let consumed = segments(&["a"]);
    let config = vec![
        Arc::new(Route::new("").component(ComponentType("Main"))),
        Arc::new(Route::new("").outlet("aux").component(ComponentType("Side"))),
    ];
    let result = split(&sg, &consumed, &[], &config);
    assert!(result.sliced_segments.is_empty());
    assert!(result.segment_group.children.contains_key("primary"));
    assert!(result.segment_group.children.contains_key("aux"));
}
