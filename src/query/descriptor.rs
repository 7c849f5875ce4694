//! Breakpoint descriptors.
//!
//! A descriptor is either an already-valid media query string, a feature
//! object mapping camelCase feature names to values, or a sequence of those
//! meaning logical OR. Descriptors convert from `serde_json::Value`, so
//! configurations can be written as plain JSON.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MediaQueryError;

/// A value attached to a feature key.
///
/// # Examples
///
/// ```
/// use mediaset::FeatureValue;
///
/// let width = FeatureValue::from("593..896");
/// let height = FeatureValue::range(100, 200);
///
/// assert!(width.is_string());
/// assert!(height.is_list());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum FeatureValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<FeatureValue>),
    Null,
    Map(serde_json::Map<String, serde_json::Value>),
}

impl FeatureValue {
    /// Creates a two-element range value.
    #[must_use]
    pub fn range(min: impl Into<Self>, max: impl Into<Self>) -> Self {
        Self::List(vec![min.into(), max.into()])
    }

    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    pub const fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Null => "null",
            Self::Map(_) => "map",
        }
    }
}

impl Default for FeatureValue {
    fn default() -> Self {
        Self::Null
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Null => write!(f, "null"),
            Self::Map(v) => write!(f, "{}", serde_json::Value::Object(v.clone())),
        }
    }
}

impl From<serde_json::Value> for FeatureValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            serde_json::Value::Object(map) => Self::Map(map),
        }
    }
}

impl From<FeatureValue> for serde_json::Value {
    fn from(v: FeatureValue) -> Self {
        match v {
            FeatureValue::Null => Self::Null,
            FeatureValue::Bool(b) => Self::Bool(b),
            FeatureValue::Int(i) => Self::from(i),
            FeatureValue::Float(x) => serde_json::Number::from_f64(x).map_or(Self::Null, Self::Number),
            FeatureValue::String(s) => Self::String(s),
            FeatureValue::List(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            FeatureValue::Map(map) => Self::Object(map),
        }
    }
}

impl From<bool> for FeatureValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for FeatureValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for FeatureValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for FeatureValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for FeatureValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for FeatureValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<Vec<FeatureValue>> for FeatureValue {
    fn from(v: Vec<FeatureValue>) -> Self {
        Self::List(v)
    }
}

/// A mapping from camelCase feature name to value.
///
/// Keys are kept sorted so equality and error listings are deterministic;
/// clause order in the compiled query comes from the feature vocabulary, not
/// from insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureObject(BTreeMap<String, FeatureValue>);

impl FeatureObject {
    /// Creates an empty feature object.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a feature, replacing any previous value for the key.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FeatureValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FeatureValue>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FeatureValue> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, FeatureValue)> for FeatureObject {
    fn from_iter<I: IntoIterator<Item = (String, FeatureValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The user-supplied matching condition of a breakpoint.
///
/// # Examples
///
/// ```
/// use mediaset::{Descriptor, FeatureObject};
///
/// let plain = Descriptor::query("(min-width: 40em)");
/// let features = Descriptor::features(FeatureObject::new().with("type", "screen"));
/// let either = Descriptor::any_of(vec![plain.clone(), features]);
///
/// assert!(plain.is_query());
/// assert!(either.is_any_of());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub enum Descriptor {
    /// An already-valid media query, passed through unchanged.
    Query(String),
    /// A feature object compiled into `and`-joined clauses.
    Features(FeatureObject),
    /// Alternatives joined with `, ` (logical OR).
    AnyOf(Vec<Descriptor>),
}

impl Descriptor {
    #[must_use]
    pub fn query(query: impl Into<String>) -> Self {
        Self::Query(query.into())
    }

    #[must_use]
    pub const fn features(features: FeatureObject) -> Self {
        Self::Features(features)
    }

    #[must_use]
    pub const fn any_of(alternatives: Vec<Self>) -> Self {
        Self::AnyOf(alternatives)
    }

    pub const fn is_query(&self) -> bool {
        matches!(self, Self::Query(_))
    }

    pub const fn is_features(&self) -> bool {
        matches!(self, Self::Features(_))
    }

    pub const fn is_any_of(&self) -> bool {
        matches!(self, Self::AnyOf(_))
    }
}

fn json_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

fn clause_from_json(v: serde_json::Value) -> Result<Descriptor, MediaQueryError> {
    match v {
        serde_json::Value::String(s) => Ok(Descriptor::Query(s)),
        serde_json::Value::Object(map) => Ok(Descriptor::Features(
            map.into_iter()
                .map(|(k, v)| (k, FeatureValue::from(v)))
                .collect(),
        )),
        other => Err(MediaQueryError::InvalidInput {
            found: json_type_name(&other).to_string(),
        }),
    }
}

impl TryFrom<serde_json::Value> for Descriptor {
    type Error = MediaQueryError;

    fn try_from(v: serde_json::Value) -> Result<Self, Self::Error> {
        match v {
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(clause_from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::AnyOf),
            other => clause_from_json(other),
        }
    }
}

impl From<Descriptor> for serde_json::Value {
    fn from(d: Descriptor) -> Self {
        match d {
            Descriptor::Query(s) => Self::String(s),
            Descriptor::Features(features) => Self::Object(
                features
                    .0
                    .into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect(),
            ),
            Descriptor::AnyOf(items) => Self::Array(items.into_iter().map(Self::from).collect()),
        }
    }
}

impl From<&str> for Descriptor {
    fn from(v: &str) -> Self {
        Self::Query(v.to_string())
    }
}

impl From<String> for Descriptor {
    fn from(v: String) -> Self {
        Self::Query(v)
    }
}

impl From<FeatureObject> for Descriptor {
    fn from(v: FeatureObject) -> Self {
        Self::Features(v)
    }
}

impl From<Vec<Descriptor>> for Descriptor {
    fn from(v: Vec<Descriptor>) -> Self {
        Self::AnyOf(v)
    }
}
