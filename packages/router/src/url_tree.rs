//! UrlTree and URL Serialization
//!
//! Corresponds to packages/router/src/url_tree.ts
//!
//! A parsed URL is represented as an immutable tree: ordered path segments
//! carrying matrix parameters, outlet-named children, plus query parameters
//! and a fragment. Transformations never mutate a tree in place.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::RouterError;
use crate::shared::{ParamValue, Params, PRIMARY_OUTLET};

/// One path segment and its matrix parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlSegment {
    pub path: String,
    pub parameters: IndexMap<String, String>,
}

impl UrlSegment {
    pub fn new(path: impl Into<String>) -> Self {
        UrlSegment {
            path: path.into(),
            parameters: IndexMap::new(),
        }
    }

    pub fn with_parameters(
        path: impl Into<String>,
        parameters: IndexMap<String, String>,
    ) -> Self {
        UrlSegment {
            path: path.into(),
            parameters,
        }
    }
}

impl fmt::Display for UrlSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", serialize_path(self))
    }
}

/// A group of segments plus outlet-named children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlSegmentGroup {
    pub segments: Vec<UrlSegment>,
    pub children: IndexMap<String, UrlSegmentGroup>,
}

impl UrlSegmentGroup {
    pub fn new(segments: Vec<UrlSegment>, children: IndexMap<String, UrlSegmentGroup>) -> Self {
        UrlSegmentGroup { segments, children }
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn number_of_children(&self) -> usize {
        self.children.len()
    }

    /// The child registered under the primary outlet, if any.
    pub fn primary_child(&self) -> Option<&UrlSegmentGroup> {
        self.children.get(PRIMARY_OUTLET)
    }

    /// A group with no segments and no children serializes to nothing.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty() && self.children.is_empty()
    }

    /// Recursively prune empty named-outlet children ("squashing"). A
    /// primary child collapses into its parent when it is the only child
    /// and the parent has no segments of its own.
    pub fn squashed(&self) -> UrlSegmentGroup {
        let mut children: IndexMap<String, UrlSegmentGroup> = IndexMap::new();
        for (outlet, child) in &self.children {
            let squashed = child.squashed();
            if outlet == PRIMARY_OUTLET || !squashed.is_empty() {
                children.insert(outlet.clone(), squashed);
            }
        }
        if children.len() == 1 && self.segments.is_empty() {
            if let Some(primary) = children.get(PRIMARY_OUTLET) {
                return primary.clone();
            }
        }
        UrlSegmentGroup::new(self.segments.clone(), children)
    }
}

/// An immutable parsed URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlTree {
    pub root: UrlSegmentGroup,
    pub query_params: Params,
    pub fragment: Option<String>,
}

impl UrlTree {
    pub fn new(root: UrlSegmentGroup, query_params: Params, fragment: Option<String>) -> Self {
        UrlTree {
            root,
            query_params,
            fragment,
        }
    }

    /// An empty tree, equivalent to parsing `"/"`.
    pub fn empty() -> Self {
        UrlTree::default()
    }
}

impl fmt::Display for UrlTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", DefaultUrlSerializer.serialize(self))
    }
}

/// Whether `container` contains `containee`.
///
/// With `exact` the trees must match segment-for-segment and carry equal
/// query params; otherwise `containee` may be a prefix of `container` and its
/// query params a subset.
pub fn contains_tree(container: &UrlTree, containee: &UrlTree, exact: bool) -> bool {
    if exact {
        container.root == containee.root && container.query_params == containee.query_params
    } else {
        containee
            .query_params
            .iter()
            .all(|(k, v)| container.query_params.get(k) == Some(v))
            && contains_segment_group(&container.root, &containee.root)
    }
}

fn contains_segment_group(container: &UrlSegmentGroup, containee: &UrlSegmentGroup) -> bool {
    if containee.segments.len() > container.segments.len() {
        return contains_segment_group_helper(container, containee, &containee.segments);
    }
    let paths_match = container.segments[..containee.segments.len()]
        .iter()
        .zip(&containee.segments)
        .all(|(a, b)| a.path == b.path);
    if !paths_match {
        return false;
    }
    if containee.segments.len() < container.segments.len() {
        // The remainder of this group must absorb the containee's children.
        if containee.has_children() {
            return false;
        }
        true
    } else {
        containee.children.iter().all(|(outlet, child)| {
            container
                .children
                .get(outlet)
                .is_some_and(|c| contains_segment_group(c, child))
        })
    }
}

fn contains_segment_group_helper(
    container: &UrlSegmentGroup,
    containee: &UrlSegmentGroup,
    containee_paths: &[UrlSegment],
) -> bool {
    if container.segments.len() > containee_paths.len() {
        return false;
    }
    let matched = container
        .segments
        .iter()
        .zip(containee_paths)
        .all(|(a, b)| a.path == b.path);
    if !matched {
        return false;
    }
    let Some(primary) = container.primary_child() else {
        return false;
    };
    let rest = &containee_paths[container.segments.len()..];
    if rest.is_empty() {
        contains_segment_group(primary, &UrlSegmentGroup::new(vec![], containee.children.clone()))
    } else {
        contains_segment_group_helper(primary, containee, rest)
    }
}

/// Pluggable URL string representation.
pub trait UrlSerializer: Send + Sync {
    fn parse(&self, url: &str) -> Result<UrlTree, RouterError>;
    fn serialize(&self, tree: &UrlTree) -> String;
}

/// The default serializer: path segments separated by `/`, matrix parameters
/// as `;k=v`, named outlets as `(name:path//other:path)`, standard query
/// string and fragment.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultUrlSerializer;

impl UrlSerializer for DefaultUrlSerializer {
    fn parse(&self, url: &str) -> Result<UrlTree, RouterError> {
        let mut parser = UrlParser::new(url);
        let root = parser.parse_root_segment()?;
        let query_params = parser.parse_query_params()?;
        let fragment = parser.parse_fragment();
        Ok(UrlTree::new(root, query_params, fragment))
    }

    fn serialize(&self, tree: &UrlTree) -> String {
        let segment = format!("/{}", serialize_segment_group(&tree.root, true));
        let query = serialize_query_params(&tree.query_params);
        let fragment = tree
            .fragment
            .as_ref()
            .map(|f| format!("#{}", encode_uri_fragment(f)))
            .unwrap_or_default();
        format!("{segment}{query}{fragment}")
    }
}

fn serialize_segment_group(segment: &UrlSegmentGroup, root: bool) -> String {
    if segment.has_children() && root && segment.segments.is_empty() {
        let primary = segment
            .primary_child()
            .map(|c| serialize_segment_group(c, false))
            .unwrap_or_default();
        let children: Vec<String> = segment
            .children
            .iter()
            .filter(|(outlet, _)| outlet.as_str() != PRIMARY_OUTLET)
            .map(|(outlet, child)| format!("{outlet}:{}", serialize_segment_group(child, false)))
            .collect();
        if children.is_empty() {
            primary
        } else {
            format!("{primary}({})", children.join("//"))
        }
    } else if segment.has_children() {
        let children: Vec<String> = segment
            .children
            .iter()
            .map(|(outlet, child)| {
                if outlet.as_str() == PRIMARY_OUTLET {
                    serialize_segment_group(child, false)
                } else {
                    format!("{outlet}:{}", serialize_segment_group(child, false))
                }
            })
            .collect();
        if segment.number_of_children() == 1 && segment.primary_child().is_some() {
            format!("{}/{}", serialize_paths(segment), children[0])
        } else {
            format!("{}/({})", serialize_paths(segment), children.join("//"))
        }
    } else {
        serialize_paths(segment)
    }
}

fn serialize_paths(segment: &UrlSegmentGroup) -> String {
    segment
        .segments
        .iter()
        .map(serialize_path)
        .collect::<Vec<_>>()
        .join("/")
}

fn serialize_path(segment: &UrlSegment) -> String {
    let mut out = encode_uri_segment(&segment.path);
    for (key, value) in &segment.parameters {
        out.push(';');
        out.push_str(&encode_uri_segment(key));
        out.push('=');
        out.push_str(&encode_uri_segment(value));
    }
    out
}

fn serialize_query_params(params: &Params) -> String {
    let mut pairs: Vec<String> = Vec::new();
    for (key, value) in params {
        match value {
            ParamValue::Single(v) => {
                pairs.push(format!("{}={}", encode_uri_query(key), encode_uri_query(v)));
            }
            ParamValue::List(values) => {
                for v in values {
                    pairs.push(format!("{}={}", encode_uri_query(key), encode_uri_query(v)));
                }
            }
        }
    }
    if pairs.is_empty() {
        String::new()
    } else {
        format!("?{}", pairs.join("&"))
    }
}

// Characters beyond the unreserved set that stay literal per context.
const SEGMENT_EXTRA: &str = "@:$,+*'!";
const QUERY_EXTRA: &str = "@:$,;+*'!/?";
const FRAGMENT_EXTRA: &str = "@:$,;+*'!/?&=";

fn encode_with(s: &str, extra: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        let c = byte as char;
        if byte.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~') || extra.contains(c) {
            out.push(c);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

pub fn encode_uri_segment(s: &str) -> String {
    encode_with(s, SEGMENT_EXTRA)
}

pub fn encode_uri_query(s: &str) -> String {
    encode_with(s, QUERY_EXTRA)
}

pub fn encode_uri_fragment(s: &str) -> String {
    encode_with(s, FRAGMENT_EXTRA)
}

/// Percent-decode. Invalid escapes are kept literally rather than rejected,
/// matching lenient browser behavior.
pub fn decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let Some(hex) = bytes.get(i + 1..i + 3) {
                if let Ok(value) = u8::from_str_radix(std::str::from_utf8(hex).unwrap_or(""), 16) {
                    out.push(value);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Hand-rolled single-pass URL parser.
struct UrlParser<'a> {
    remaining: &'a str,
}

impl<'a> UrlParser<'a> {
    fn new(url: &'a str) -> Self {
        UrlParser { remaining: url }
    }

    fn peek_starts_with(&self, s: &str) -> bool {
        self.remaining.starts_with(s)
    }

    fn consume_optional(&mut self, s: &str) -> bool {
        if self.peek_starts_with(s) {
            self.remaining = &self.remaining[s.len()..];
            true
        } else {
            false
        }
    }

    fn capture(&mut self, s: &str) -> Result<(), RouterError> {
        if !self.consume_optional(s) {
            return Err(RouterError::UrlParse {
                message: format!("expected \"{s}\""),
                url: self.remaining.to_string(),
            });
        }
        Ok(())
    }

    fn match_until(&self, terminators: &str) -> &'a str {
        let end = self
            .remaining
            .find(|c| terminators.contains(c))
            .unwrap_or(self.remaining.len());
        &self.remaining[..end]
    }

    fn parse_root_segment(&mut self) -> Result<UrlSegmentGroup, RouterError> {
        self.consume_optional("/");
        if self.remaining.is_empty()
            || self.peek_starts_with("?")
            || self.peek_starts_with("#")
        {
            return Ok(UrlSegmentGroup::default());
        }
        // The root segment group never has segments of its own.
        let children = self.parse_children()?;
        Ok(UrlSegmentGroup::new(vec![], children))
    }

    fn parse_children(&mut self) -> Result<IndexMap<String, UrlSegmentGroup>, RouterError> {
        if self.remaining.is_empty() {
            return Ok(IndexMap::new());
        }
        self.consume_optional("/");

        let mut segments: Vec<UrlSegment> = Vec::new();
        if !self.peek_starts_with("(") && !self.remaining.is_empty() && !self.peek_starts_with("?")
            && !self.peek_starts_with("#")
        {
            segments.push(self.parse_segment()?);
        }

        while self.peek_starts_with("/")
            && !self.peek_starts_with("//")
            && !self.peek_starts_with("/(")
        {
            self.capture("/")?;
            segments.push(self.parse_segment()?);
        }

        let mut children: IndexMap<String, UrlSegmentGroup> = IndexMap::new();
        if self.peek_starts_with("/(") {
            self.capture("/")?;
            children = self.parse_parens(true)?;
        }

        let mut res: IndexMap<String, UrlSegmentGroup> = IndexMap::new();
        if self.peek_starts_with("(") {
            res = self.parse_parens(false)?;
        }

        if !segments.is_empty() || !children.is_empty() {
            res.insert(
                PRIMARY_OUTLET.to_string(),
                UrlSegmentGroup::new(segments, children),
            );
        }
        Ok(res)
    }

    fn parse_segment(&mut self) -> Result<UrlSegment, RouterError> {
        let path = self.match_until("/();?#=&").to_string();
        if path.is_empty() && self.peek_starts_with(";") {
            return Err(RouterError::UrlParse {
                message: "empty path url segment cannot have parameters".to_string(),
                url: self.remaining.to_string(),
            });
        }
        if path.is_empty() {
            return Err(RouterError::UrlParse {
                message: "expected a path segment".to_string(),
                url: self.remaining.to_string(),
            });
        }
        self.capture(&path.clone())?;
        let parameters = self.parse_matrix_params()?;
        Ok(UrlSegment::with_parameters(decode(&path), parameters))
    }

    fn parse_matrix_params(&mut self) -> Result<IndexMap<String, String>, RouterError> {
        let mut params = IndexMap::new();
        while self.consume_optional(";") {
            let key = self.match_until("/();?#=&").to_string();
            if key.is_empty() {
                break;
            }
            self.capture(&key.clone())?;
            let mut value = String::new();
            if self.consume_optional("=") {
                let matched = self.match_until("/();?#&").to_string();
                if !matched.is_empty() {
                    self.capture(&matched.clone())?;
                    value = matched;
                }
            }
            params.insert(decode(&key), decode(&value));
        }
        Ok(params)
    }

    fn parse_parens(
        &mut self,
        allow_primary: bool,
    ) -> Result<IndexMap<String, UrlSegmentGroup>, RouterError> {
        let mut groups: IndexMap<String, UrlSegmentGroup> = IndexMap::new();
        self.capture("(")?;
        while !self.consume_optional(")") && !self.remaining.is_empty() {
            let path = self.match_until("/();?#=&").to_string();
            let outlet = if let Some(colon) = path.find(':') {
                let name = path[..colon].to_string();
                self.capture(&path[..colon].to_string())?;
                self.capture(":")?;
                name
            } else if allow_primary {
                PRIMARY_OUTLET.to_string()
            } else {
                return Err(RouterError::UrlParse {
                    message: "secondary segment must carry an outlet name".to_string(),
                    url: self.remaining.to_string(),
                });
            };
            let children = self.parse_children()?;
            let group = if children.len() == 1 && children.contains_key(PRIMARY_OUTLET) {
                children.into_iter().next().map(|(_, g)| g).unwrap_or_default()
            } else {
                UrlSegmentGroup::new(vec![], children)
            };
            groups.insert(outlet, group);
            self.consume_optional("//");
        }
        Ok(groups)
    }

    fn parse_query_params(&mut self) -> Result<Params, RouterError> {
        let mut params = Params::new();
        if self.consume_optional("?") {
            loop {
                self.parse_query_param(&mut params)?;
                if !self.consume_optional("&") {
                    break;
                }
            }
        }
        Ok(params)
    }

    fn parse_query_param(&mut self, params: &mut Params) -> Result<(), RouterError> {
        let key = self.match_until("=?&#").to_string();
        if key.is_empty() {
            return Ok(());
        }
        self.capture(&key.clone())?;
        let mut value = String::new();
        if self.consume_optional("=") {
            let matched = self.match_until("?&#").to_string();
            if !matched.is_empty() {
                self.capture(&matched.clone())?;
                value = matched;
            }
        }
        let decoded_key = decode(&key);
        let decoded_value = decode(&value);
        match params.get_mut(&decoded_key) {
            Some(existing) => existing.push(decoded_value),
            None => {
                params.insert(decoded_key, ParamValue::Single(decoded_value));
            }
        }
        Ok(())
    }

    fn parse_fragment(&mut self) -> Option<String> {
        if self.consume_optional("#") {
            Some(decode(self.remaining))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(url: &str) -> UrlTree {
        DefaultUrlSerializer.parse(url).unwrap()
    }

    #[test]
    fn should_parse_the_root_url() {
        let tree = parse("/");
        assert!(tree.root.is_empty());
        assert!(tree.query_params.is_empty());
        assert_eq!(tree.fragment, None);
    }

    #[test]
    fn should_parse_segments_with_matrix_params() {
        let tree = parse("/one;a=1;b=2/two");
        let primary = tree.root.primary_child().unwrap();
        assert_eq!(primary.segments.len(), 2);
        assert_eq!(primary.segments[0].path, "one");
        assert_eq!(primary.segments[0].parameters.get("a"), Some(&"1".to_string()));
        assert_eq!(primary.segments[1].path, "two");
    }

    #[test]
    fn should_roundtrip_named_outlets() {
        let url = "/a/(b//aux:c)";
        let tree = parse(url);
        assert_eq!(DefaultUrlSerializer.serialize(&tree), url);
    }
}
