//! Shared Router Types
//!
//! Corresponds to packages/router/src/shared.ts

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The name of the default outlet.
pub const PRIMARY_OUTLET: &str = "primary";

/// A single parameter value: either one string or a list of strings
/// (query parameters may repeat).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Single(String),
    List(Vec<String>),
}

impl ParamValue {
    /// The first (or only) string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Single(s) => Some(s),
            ParamValue::List(values) => values.first().map(|s| s.as_str()),
        }
    }

    /// All values, one or many.
    pub fn values(&self) -> Vec<&str> {
        match self {
            ParamValue::Single(s) => vec![s.as_str()],
            ParamValue::List(values) => values.iter().map(|s| s.as_str()).collect(),
        }
    }

    /// Fold another value for the same key into this one.
    pub fn push(&mut self, value: String) {
        match self {
            ParamValue::Single(existing) => {
                *self = ParamValue::List(vec![std::mem::take(existing), value]);
            }
            ParamValue::List(values) => values.push(value),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Single(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Single(value)
    }
}

/// A map of matrix/positional/query parameters.
///
/// Insertion order is preserved so serialization and event payloads are
/// deterministic.
pub type Params = IndexMap<String, ParamValue>;

/// Static and resolved route data.
pub type Data = IndexMap<String, serde_json::Value>;

/// Read a single-valued parameter.
pub fn param(params: &Params, name: &str) -> Option<String> {
    params.get(name).and_then(|v| v.as_str()).map(String::from)
}

/// Build a [`Params`] map from string pairs. Test and construction helper.
pub fn params_of<I, K, V>(pairs: I) -> Params
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), ParamValue::Single(v.into())))
        .collect()
}

/// Shallow-equality over two parameter maps.
pub fn params_eq(a: &Params, b: &Params) -> bool {
    a.len() == b.len() && a.iter().all(|(k, v)| b.get(k) == Some(v))
}

/// Merge `source` into `target`, later keys winning.
pub fn merge_params(target: &mut Params, source: &Params) {
    for (k, v) in source {
        target.insert(k.clone(), v.clone());
    }
}

/// Merge `source` into `target`, later keys winning.
pub fn merge_data(target: &mut Data, source: &Data) {
    for (k, v) in source {
        target.insert(k.clone(), v.clone());
    }
}
