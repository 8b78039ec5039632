//! URL Construction
//!
//! Corresponds to packages/router/src/create_url_tree.ts
//!
//! Builds a new `UrlTree` from navigation commands applied relative to an
//! activated route (or absolutely from the root). The current tree is never
//! mutated; the affected segment group is rebuilt and spliced back in, then
//! the whole tree is squashed.

use indexmap::IndexMap;
use std::sync::Arc;

use crate::errors::RouterError;
use crate::router_state::{ActivatedRouteSnapshot, RouterStateSnapshot};
use crate::shared::{Params, PRIMARY_OUTLET};
use crate::url_tree::{UrlSegment, UrlSegmentGroup, UrlTree};

/// One element of a `navigate` command list.
#[derive(Debug, Clone)]
pub enum UrlCommand {
    /// A path fragment; may contain `/`, a leading `/` on the first command
    /// makes the navigation absolute, `..` climbs one level.
    Path(String),
    /// Matrix params attached to the preceding path command.
    MatrixParams(IndexMap<String, String>),
    /// Per-outlet command lists; `None` clears the outlet.
    Outlets(IndexMap<String, Option<Vec<UrlCommand>>>),
}

impl UrlCommand {
    pub fn path(path: impl Into<String>) -> Self {
        UrlCommand::Path(path.into())
    }
}

struct Navigation {
    is_absolute: bool,
    double_dots: usize,
    commands: Vec<UrlCommand>,
}

/// Where command application starts: the segment group at `path` from the
/// root, either rewriting its children or its segments from `index` on.
struct Position {
    path: Vec<String>,
    process_children: bool,
    index: usize,
}

/// Apply `commands` to `current`, relative to `relative_to` when given
/// (otherwise the root). `query_params`/`fragment` replace the tree's;
/// merge/preserve policies are the caller's concern.
pub fn create_url_tree(
    current: &UrlTree,
    state: Option<&RouterStateSnapshot>,
    relative_to: Option<&Arc<ActivatedRouteSnapshot>>,
    commands: &[UrlCommand],
    query_params: Option<Params>,
    fragment: Option<String>,
) -> Result<UrlTree, RouterError> {
    let query_params = query_params.unwrap_or_default();

    if commands.is_empty() {
        return Ok(UrlTree::new(current.root.clone(), query_params, fragment));
    }

    let nav = compute_navigation(commands)?;
    if nav.is_absolute && nav.commands.is_empty() {
        // Navigation to `/`.
        return Ok(UrlTree::new(UrlSegmentGroup::default(), query_params, fragment));
    }

    let position = find_starting_position(&nav, current, state, relative_to)?;
    let target = group_at(&current.root, &position.path)
        .cloned()
        .unwrap_or_default();
    let new_group = if position.process_children {
        update_segment_group_children(&target, position.index, &nav.commands)?
    } else {
        update_segment_group(&target, position.index, &nav.commands)?
    };
    let new_root = replace_at(&current.root, &position.path, new_group);
    Ok(UrlTree::new(new_root.squashed(), query_params, fragment))
}

/// Normalize commands: split path strings on `/`, detect an absolute
/// navigation, strip and count leading `..`.
fn compute_navigation(commands: &[UrlCommand]) -> Result<Navigation, RouterError> {
    let mut normalized: Vec<UrlCommand> = Vec::new();
    let mut is_absolute = false;
    for (i, command) in commands.iter().enumerate() {
        match command {
            UrlCommand::Path(path) => {
                if i == 0 && path.starts_with('/') {
                    is_absolute = true;
                }
                for part in path.split('/') {
                    if part.is_empty() || part == "." {
                        continue;
                    }
                    normalized.push(UrlCommand::Path(part.to_string()));
                }
            }
            other => normalized.push(other.clone()),
        }
    }

    let mut double_dots = 0;
    while matches!(normalized.first(), Some(UrlCommand::Path(p)) if p == "..") {
        normalized.remove(0);
        double_dots += 1;
    }
    if normalized
        .iter()
        .any(|c| matches!(c, UrlCommand::Path(p) if p == ".."))
    {
        return Err(RouterError::internal("'..' is only allowed at the start of commands"));
    }
    if is_absolute && double_dots > 0 {
        return Err(RouterError::internal("absolute navigations cannot use '..'"));
    }
    Ok(Navigation {
        is_absolute,
        double_dots,
        commands: normalized,
    })
}

fn find_starting_position(
    nav: &Navigation,
    current: &UrlTree,
    state: Option<&RouterStateSnapshot>,
    relative_to: Option<&Arc<ActivatedRouteSnapshot>>,
) -> Result<Position, RouterError> {
    if nav.is_absolute {
        return Ok(Position {
            path: vec![],
            process_children: true,
            index: 0,
        });
    }
    let (Some(state), Some(relative_to)) = (state, relative_to) else {
        return Ok(Position {
            path: vec![],
            process_children: true,
            index: 0,
        });
    };

    // Re-derive the route's position inside the URL tree by consuming the
    // segments of every ancestor down to `relative_to`.
    let mut path: Vec<String> = Vec::new();
    let mut group = &current.root;
    let mut index = 0usize;
    for node in state.path_from_root(relative_to).iter().skip(1) {
        for segment in &node.url {
            if index >= group.segments.len() {
                let key = node.outlet.clone();
                group = group.children.get(&key).ok_or_else(|| {
                    RouterError::internal("activated route does not line up with the current URL")
                })?;
                path.push(key);
                index = 0;
            }
            if group.segments.get(index).map(|s| &s.path) != Some(&segment.path) {
                return Err(RouterError::internal(
                    "activated route does not line up with the current URL",
                ));
            }
            index += 1;
        }
    }

    if index == 0 {
        return Ok(Position {
            path,
            process_children: true,
            index: 0,
        });
    }

    // Matrix params as the first command modify the last consumed segment
    // rather than appending after it.
    let modifier = if matches!(nav.commands.first(), Some(UrlCommand::MatrixParams(_))) {
        0
    } else {
        1
    };
    let start = index - 1 + modifier;
    apply_double_dots(current, path, start, nav.double_dots)
}

fn apply_double_dots(
    current: &UrlTree,
    mut path: Vec<String>,
    mut index: usize,
    mut double_dots: usize,
) -> Result<Position, RouterError> {
    while double_dots > index {
        double_dots -= index;
        if path.pop().is_none() {
            return Err(RouterError::internal("invalid number of '../'"));
        }
        index = group_at(&current.root, &path)
            .map(|g| g.segments.len())
            .unwrap_or(0);
    }
    Ok(Position {
        path,
        process_children: false,
        index: index - double_dots,
    })
}

fn group_at<'t>(root: &'t UrlSegmentGroup, path: &[String]) -> Option<&'t UrlSegmentGroup> {
    let mut group = root;
    for outlet in path {
        group = group.children.get(outlet)?;
    }
    Some(group)
}

fn replace_at(root: &UrlSegmentGroup, path: &[String], new_group: UrlSegmentGroup) -> UrlSegmentGroup {
    let Some((head, rest)) = path.split_first() else {
        return new_group;
    };
    let mut children = root.children.clone();
    if let Some(child) = root.children.get(head) {
        children.insert(head.clone(), replace_at(child, rest, new_group));
    }
    UrlSegmentGroup::new(root.segments.clone(), children)
}

fn update_segment_group(
    group: &UrlSegmentGroup,
    start: usize,
    commands: &[UrlCommand],
) -> Result<UrlSegmentGroup, RouterError> {
    if group.segments.is_empty() && group.has_children() {
        return update_segment_group_children(group, start, commands);
    }

    let (matched, path_index, command_index) = prefixed_with(group, start, commands);
    let sliced = &commands[command_index..];

    if matched && path_index < group.segments.len() {
        // Commands diverge inside this group: split it there.
        let mut children = IndexMap::new();
        children.insert(
            PRIMARY_OUTLET.to_string(),
            UrlSegmentGroup::new(group.segments[path_index..].to_vec(), group.children.clone()),
        );
        let split = UrlSegmentGroup::new(group.segments[..path_index].to_vec(), children);
        return update_segment_group_children(&split, 0, sliced);
    }
    if matched && sliced.is_empty() {
        return Ok(UrlSegmentGroup::new(group.segments.clone(), IndexMap::new()));
    }
    if matched && !group.has_children() {
        return create_new_segment_group(group, start, commands);
    }
    if matched {
        return update_segment_group_children(group, 0, sliced);
    }
    create_new_segment_group(group, start, commands)
}

fn update_segment_group_children(
    group: &UrlSegmentGroup,
    start: usize,
    commands: &[UrlCommand],
) -> Result<UrlSegmentGroup, RouterError> {
    if commands.is_empty() {
        return Ok(UrlSegmentGroup::new(group.segments.clone(), group.children.clone()));
    }

    let outlets = outlets_of(commands);
    let mut children: IndexMap<String, UrlSegmentGroup> = IndexMap::new();
    for (outlet, outlet_commands) in &outlets {
        if let Some(outlet_commands) = outlet_commands {
            let existing = group.children.get(outlet);
            let updated = match existing {
                Some(child) => update_segment_group(child, start, outlet_commands)?,
                None => update_segment_group(&UrlSegmentGroup::default(), start, outlet_commands)?,
            };
            children.insert(outlet.clone(), updated);
        }
        // `None` clears the outlet: simply not carried over.
    }
    for (outlet, child) in &group.children {
        if !outlets.contains_key(outlet) {
            children.insert(outlet.clone(), child.clone());
        }
    }
    Ok(UrlSegmentGroup::new(group.segments.clone(), children))
}

/// Distribute commands across outlets: an `Outlets` command maps directly,
/// anything else belongs to the primary outlet.
fn outlets_of(commands: &[UrlCommand]) -> IndexMap<String, Option<Vec<UrlCommand>>> {
    if let Some(UrlCommand::Outlets(outlets)) = commands.first() {
        return outlets.clone();
    }
    let mut map = IndexMap::new();
    map.insert(PRIMARY_OUTLET.to_string(), Some(commands.to_vec()));
    map
}

/// How far the commands re-state the existing segments starting at `start`.
fn prefixed_with(group: &UrlSegmentGroup, start: usize, commands: &[UrlCommand]) -> (bool, usize, usize) {
    let mut command_index = 0;
    let mut path_index = start;
    while path_index < group.segments.len() {
        let Some(command) = commands.get(command_index) else {
            return (false, 0, 0);
        };
        let segment = &group.segments[path_index];
        match command {
            UrlCommand::Path(path) => {
                let next_is_matrix =
                    matches!(commands.get(command_index + 1), Some(UrlCommand::MatrixParams(_)));
                if next_is_matrix {
                    let Some(UrlCommand::MatrixParams(params)) = commands.get(command_index + 1)
                    else {
                        return (false, 0, 0);
                    };
                    if *path != segment.path || *params != segment.parameters {
                        return (false, 0, 0);
                    }
                    command_index += 2;
                } else {
                    if *path != segment.path {
                        return (false, 0, 0);
                    }
                    command_index += 1;
                }
            }
            _ => return (false, 0, 0),
        }
        path_index += 1;
    }
    (true, path_index, command_index)
}

fn create_new_segment_group(
    group: &UrlSegmentGroup,
    start: usize,
    commands: &[UrlCommand],
) -> Result<UrlSegmentGroup, RouterError> {
    let mut segments: Vec<UrlSegment> = group.segments[..start.min(group.segments.len())].to_vec();
    let mut i = 0;
    while i < commands.len() {
        match &commands[i] {
            UrlCommand::Outlets(outlets) => {
                let mut children = IndexMap::new();
                for (outlet, outlet_commands) in outlets {
                    if let Some(outlet_commands) = outlet_commands {
                        children.insert(
                            outlet.clone(),
                            create_new_segment_group(
                                &UrlSegmentGroup::default(),
                                0,
                                outlet_commands,
                            )?,
                        );
                    }
                }
                return Ok(UrlSegmentGroup::new(segments, children));
            }
            UrlCommand::MatrixParams(params) => {
                if i == 0 {
                    // Matrix params as the first command re-state the segment
                    // at `start` with new params.
                    if let Some(existing) = group.segments.get(start) {
                        segments.push(UrlSegment::with_parameters(
                            existing.path.clone(),
                            params.clone(),
                        ));
                    } else if let Some(last) = segments.last_mut() {
                        last.parameters = params.clone();
                    }
                    i += 1;
                } else {
                    return Err(RouterError::internal(
                        "matrix params must follow a path command",
                    ));
                }
            }
            UrlCommand::Path(path) => {
                if let Some(UrlCommand::MatrixParams(params)) = commands.get(i + 1) {
                    segments.push(UrlSegment::with_parameters(path.clone(), params.clone()));
                    i += 2;
                } else {
                    segments.push(UrlSegment::new(path.clone()));
                    i += 1;
                }
            }
        }
    }
    Ok(UrlSegmentGroup::new(segments, IndexMap::new()))
}
