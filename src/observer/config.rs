//! Breakpoint and observer configuration.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::error::ConfigurationError;
use crate::query::{Descriptor, FeatureObject};

use super::debounce::DEFAULT_DEBOUNCE_MS;

/// Names of the breakpoints currently matching.
pub type BreakpointSet = BTreeSet<String>;

/// Mapping from breakpoint name to descriptor.
///
/// Equality is structural: two configurations built separately with the same
/// names and descriptors are equal, and reconfiguring with an equal one is a
/// no-op.
///
/// When deserialized, an entry whose value is not a descriptor is logged and
/// left out; the remaining breakpoints are kept.
///
/// # Examples
///
/// ```
/// use mediaset::Configuration;
///
/// let config = Configuration::from_json(r#"{"tv": {"type": "tv"}, "wide": {"width": "1200.."}}"#).unwrap();
/// assert_eq!(config.len(), 2);
/// assert_ne!(config, Configuration::default());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Configuration(BTreeMap<String, Descriptor>);

impl Configuration {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Adds a breakpoint, replacing any previous one with the same name.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, descriptor: impl Into<Descriptor>) -> Self {
        self.insert(name, descriptor);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, descriptor: impl Into<Descriptor>) {
        self.0.insert(name.into(), descriptor.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Descriptor> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Descriptor)> {
        self.0.iter().map(|(name, d)| (name.as_str(), d))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
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

    /// Checks that every breakpoint name is non-blank.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidConfiguration` naming the problem.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.0.keys().any(|name| name.trim().is_empty()) {
            return Err(ConfigurationError::InvalidConfiguration {
                reason: "breakpoint names cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Parses a JSON object mapping names to descriptors.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidConfiguration` when the text is not
    /// a JSON object or a name is blank.
    pub fn from_json(text: &str) -> Result<Self, ConfigurationError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ConfigurationError::InvalidConfiguration {
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::Io` if the file cannot be read, and the
    /// errors of [`Configuration::from_json`] otherwise.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigurationError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&text)
    }
}

impl Default for Configuration {
    /// `small <= 592px < medium <= 896px < large`.
    fn default() -> Self {
        Self::new()
            .with("small", FeatureObject::new().with("width", "..592"))
            .with("medium", FeatureObject::new().with("width", "593..896"))
            .with("large", FeatureObject::new().with("width", "897.."))
    }
}

impl<'de> Deserialize<'de> for Configuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        let mut breakpoints = BTreeMap::new();
        for (name, value) in raw {
            match Descriptor::try_from(value) {
                Ok(descriptor) => {
                    breakpoints.insert(name, descriptor);
                }
                Err(err) => {
                    warn!(breakpoint = %name, error = %err, "dropping breakpoint with invalid descriptor");
                }
            }
        }
        Ok(Self(breakpoints))
    }
}

impl FromIterator<(String, Descriptor)> for Configuration {
    fn from_iter<I: IntoIterator<Item = (String, Descriptor)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Observer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserverConfig {
    /// Quiet period before a burst of changes is republished.
    pub debounce_ms: u64,
    /// Set published verbatim when no match-state provider is available.
    pub fallback: Option<BreakpointSet>,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            fallback: None,
        }
    }
}

impl ObserverConfig {
    /// Sets the fallback set.
    #[must_use]
    pub fn with_fallback<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fallback = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the debounce window.
    #[must_use]
    pub const fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    #[must_use]
    pub const fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Checks the fallback set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidFallback` if a name is blank.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if let Some(fallback) = &self.fallback {
            if fallback.iter().any(|name| name.trim().is_empty()) {
                return Err(ConfigurationError::InvalidFallback {
                    reason: "breakpoint names cannot be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Parses `{"debounce_ms": <u64>, "fallback": [<names>]}`; both keys optional.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidFallback` for a malformed fallback
    /// and `ConfigurationError::InvalidConfiguration` for anything else.
    pub fn from_json(text: &str) -> Result<Self, ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::InvalidConfiguration { reason };

        let value: serde_json::Value = serde_json::from_str(text).map_err(|e| invalid(e.to_string()))?;
        let Some(object) = value.as_object() else {
            return Err(invalid("observer config must be a JSON object".to_string()));
        };

        let debounce_ms = match object.get("debounce_ms") {
            None => DEFAULT_DEBOUNCE_MS,
            Some(v) => v
                .as_u64()
                .ok_or_else(|| invalid(format!("debounce_ms must be a non-negative integer, got {v}")))?,
        };

        let fallback = match object.get("fallback") {
            None | Some(serde_json::Value::Null) => None,
            Some(v) => Some(fallback_from_json(v)?),
        };

        let config = Self { debounce_ms, fallback };
        config.validate()?;
        Ok(config)
    }
}

/// Validates a JSON fallback: it must be an array of distinct, non-blank strings.
///
/// # Errors
///
/// Returns `ConfigurationError::InvalidFallback` describing the first problem.
pub fn fallback_from_json(value: &serde_json::Value) -> Result<BreakpointSet, ConfigurationError> {
    let invalid = |reason: String| ConfigurationError::InvalidFallback { reason };

    let Some(items) = value.as_array() else {
        return Err(invalid(format!("expected an array of names, got {value}")));
    };

    let mut set = BreakpointSet::new();
    for item in items {
        let Some(name) = item.as_str() else {
            return Err(invalid(format!("expected a string name, got {item}")));
        };
        if name.trim().is_empty() {
            return Err(invalid("breakpoint names cannot be empty".to_string()));
        }
        if !set.insert(name.to_string()) {
            return Err(invalid(format!("duplicate name {name:?}")));
        }
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::compile;
    use serde_json::json;

    #[test]
    fn test_default_configuration_compiles() {
        let config = Configuration::default();
        let compiled: Vec<(String, String)> = config
            .iter()
            .map(|(name, d)| (name.to_string(), compile(d).unwrap()))
            .collect();
        assert_eq!(
            compiled,
            vec![
                ("large".to_string(), "(min-width: 897px)".to_string()),
                (
                    "medium".to_string(),
                    "(min-width: 593px) and (max-width: 896px)".to_string()
                ),
                ("small".to_string(), "(max-width: 592px)".to_string()),
            ]
        );
    }

    #[test]
    fn test_structural_equality() {
        let a = Configuration::new().with("one", "1").with("two", "2");
        let b = Configuration::new().with("two", "2").with("one", "1");
        assert_eq!(a, b);
        assert_ne!(a, b.with("three", "3"));
    }

    #[test]
    fn test_from_json_rejects_bad_shape() {
        assert!(Configuration::from_json("[1, 2]").is_err());
        assert!(Configuration::from_json(r#"{" ": "tv"}"#).is_err());
    }

    #[test]
    fn test_from_json_drops_only_malformed_breakpoints() {
        let config = Configuration::from_json(
            r#"{"ok": "(color)", "bad": 5, "flag": true, "nested": [["tv"]], "tv": {"type": "tv"}}"#,
        )
        .unwrap();
        assert_eq!(config.names().collect::<Vec<_>>(), vec!["ok", "tv"]);
        assert_eq!(config.get("ok"), Some(&Descriptor::query("(color)")));
    }

    #[test]
    fn test_observer_config_defaults() {
        let cfg = ObserverConfig::default();
        assert_eq!(cfg.debounce_window(), Duration::from_millis(50));
        assert!(cfg.fallback.is_none());
    }

    #[test]
    fn test_observer_config_from_json() {
        let cfg = ObserverConfig::from_json(r#"{"debounce_ms": 20, "fallback": ["tv"]}"#).unwrap();
        assert_eq!(cfg.debounce_ms, 20);
        assert_eq!(cfg.fallback, Some(BreakpointSet::from(["tv".to_string()])));
    }

    #[test]
    fn test_fallback_must_be_a_set() {
        assert!(fallback_from_json(&json!(["1", "2", "3"])).is_ok());
        for bad in [json!("tv"), json!({"tv": true}), json!(["a", "a"]), json!([1]), json!([""])] {
            let err = fallback_from_json(&bad).unwrap_err();
            assert!(matches!(err, ConfigurationError::InvalidFallback { .. }), "{bad}");
        }
    }

    #[test]
    fn test_blank_fallback_name_fails_validation() {
        let cfg = ObserverConfig::default().with_fallback(["  "]);
        assert!(cfg.validate().is_err());
    }
}
