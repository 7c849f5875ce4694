//! Descriptor to media-query compiler.
//!
//! Compilation is a pure function of the descriptor: strings pass through,
//! sequences are joined with `, `, and feature objects become `and`-joined
//! clauses in vocabulary order.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::MediaQueryError;

use super::descriptor::{Descriptor, FeatureObject, FeatureValue};
use super::vocabulary::{
    bound_key, is_length_feature, kebab_case, BOUND_PREFIXES, MEDIA_TYPES, RANGEABLE_FEATURES,
    UNRANGEABLE_FEATURES,
};

const TYPE_KEY: &str = "type";

fn type_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(not|only)\s+(\w+)$").expect("static media type pattern"))
}

fn range_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(\w*?)\s*\.\.\s*(\w*?)\s*$").expect("static range pattern")
    })
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+$").expect("static number pattern"))
}

/// Compiles a descriptor into its canonical media query.
///
/// # Errors
///
/// Returns a [`MediaQueryError`] for unknown feature keys, invalid media
/// types, ranges on unrangeable features, ranges with the wrong number of
/// bounds, unsupported values, and nested sequences.
///
/// # Examples
///
/// ```
/// use mediaset::{compile, Descriptor, FeatureObject, FeatureValue};
///
/// let d = Descriptor::features(
///     FeatureObject::new()
///         .with("type", "screen")
///         .with("height", FeatureValue::range(100, 200)),
/// );
/// assert_eq!(
///     compile(&d).unwrap(),
///     "screen and (min-height: 100px) and (max-height: 200px)"
/// );
/// ```
pub fn compile(descriptor: &Descriptor) -> Result<String, MediaQueryError> {
    match descriptor {
        Descriptor::AnyOf(alternatives) => Ok(alternatives
            .iter()
            .map(compile_alternative)
            .collect::<Result<Vec<_>, _>>()?
            .join(", ")),
        other => compile_alternative(other),
    }
}

/// Converts a JSON value into a descriptor and compiles it.
///
/// # Errors
///
/// Returns [`MediaQueryError::InvalidInput`] when the value is not a string,
/// object, or sequence of those, and otherwise the errors of [`compile`].
pub fn compile_json(value: &serde_json::Value) -> Result<String, MediaQueryError> {
    let descriptor = Descriptor::try_from(value.clone())?;
    compile(&descriptor)
}

fn compile_alternative(descriptor: &Descriptor) -> Result<String, MediaQueryError> {
    match descriptor {
        Descriptor::Query(query) => Ok(query.clone()),
        Descriptor::Features(features) => compile_features(features),
        Descriptor::AnyOf(_) => Err(MediaQueryError::InvalidInput {
            found: "nested sequence".to_string(),
        }),
    }
}

fn compile_features(features: &FeatureObject) -> Result<String, MediaQueryError> {
    let mut unconsumed: BTreeSet<&str> = features.keys().collect();
    let mut clauses: Vec<String> = Vec::new();

    if let Some(value) = features.get(TYPE_KEY) {
        unconsumed.remove(TYPE_KEY);
        clauses.push(media_type(value)?);
    }

    for feature in UNRANGEABLE_FEATURES {
        let Some(value) = features.get(feature) else { continue };
        unconsumed.remove(feature);
        if is_range_shaped(value) {
            return Err(MediaQueryError::RangeNotAllowed {
                feature: (*feature).to_string(),
            });
        }
        clauses.push(clause(feature, value)?);
    }

    // Explicit bound keys (`minWidth`, `maxColor`, ...) take single values only.
    for feature in RANGEABLE_FEATURES {
        for prefix in BOUND_PREFIXES {
            let key = bound_key(prefix, feature);
            let Some(value) = features.get(&key) else { continue };
            unconsumed.remove(key.as_str());
            if value.is_list() {
                return Err(MediaQueryError::RangeNotAllowed { feature: key });
            }
            clauses.push(clause(&key, value)?);
        }
    }

    for feature in RANGEABLE_FEATURES {
        let Some(value) = features.get(feature) else { continue };
        unconsumed.remove(feature);
        match range_bounds(feature, value)? {
            Some((min, max)) => {
                if let Some(min) = min {
                    clauses.push(clause(&bound_key("min", feature), &min)?);
                }
                if let Some(max) = max {
                    clauses.push(clause(&bound_key("max", feature), &max)?);
                }
            }
            None => clauses.push(clause(feature, value)?),
        }
    }

    if !unconsumed.is_empty() {
        return Err(MediaQueryError::UnrecognizedKeys {
            keys: unconsumed.into_iter().map(str::to_string).collect(),
        });
    }

    Ok(clauses.join(" and "))
}

fn media_type(value: &FeatureValue) -> Result<String, MediaQueryError> {
    let Some(raw) = value.as_string() else {
        return Err(MediaQueryError::InvalidValue {
            feature: TYPE_KEY.to_string(),
            value: value.to_string(),
        });
    };

    let base = type_pattern()
        .captures(raw)
        .and_then(|caps| caps.get(2))
        .map_or(raw, |m| m.as_str());

    if MEDIA_TYPES.contains(&base) {
        Ok(raw.to_string())
    } else {
        Err(MediaQueryError::InvalidMediaType {
            media_type: base.to_string(),
        })
    }
}

fn is_range_shaped(value: &FeatureValue) -> bool {
    match value {
        FeatureValue::List(_) => true,
        FeatureValue::String(s) => range_pattern().is_match(s),
        _ => false,
    }
}

type Bounds = (Option<FeatureValue>, Option<FeatureValue>);

/// Splits a range-encoded value into its bounds; `None` means "not a range".
fn range_bounds(feature: &str, value: &FeatureValue) -> Result<Option<Bounds>, MediaQueryError> {
    match value {
        FeatureValue::List(items) if items.len() == 2 => {
            Ok(Some((non_empty(&items[0]), non_empty(&items[1]))))
        }
        FeatureValue::List(items) => Err(MediaQueryError::InvalidRangeArity {
            feature: feature.to_string(),
            len: items.len(),
        }),
        FeatureValue::String(s) => Ok(range_pattern().captures(s).map(|caps| {
            let bound = |i: usize| {
                caps.get(i)
                    .map(|m| m.as_str())
                    .filter(|b| !b.is_empty())
                    .map(FeatureValue::from)
            };
            (bound(1), bound(2))
        })),
        _ => Ok(None),
    }
}

fn non_empty(bound: &FeatureValue) -> Option<FeatureValue> {
    match bound {
        FeatureValue::Null => None,
        FeatureValue::String(s) if s.is_empty() => None,
        other => Some(other.clone()),
    }
}

fn clause(key: &str, value: &FeatureValue) -> Result<String, MediaQueryError> {
    let css_key = kebab_case(key);
    let px = |numeric: bool| if numeric && is_length_feature(key) { "px" } else { "" };

    match value {
        FeatureValue::Bool(true) => Ok(format!("({css_key})")),
        FeatureValue::String(s) => Ok(format!(
            "({css_key}: {s}{})",
            px(number_pattern().is_match(s))
        )),
        FeatureValue::Int(n) => Ok(format!("({css_key}: {n}{})", px(true))),
        FeatureValue::Float(n) => Ok(format!("({css_key}: {n}{})", px(true))),
        other => Err(MediaQueryError::InvalidValue {
            feature: key.to_string(),
            value: other.to_string(),
        }),
    }
}
