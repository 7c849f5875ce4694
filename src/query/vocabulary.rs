//! The finite feature vocabulary understood by the compiler.

/// Media types accepted by the `type` key (after an optional `not`/`only` modifier).
pub const MEDIA_TYPES: &[&str] = &[
    "all",
    "screen",
    "print",
    "aural",
    "braille",
    "handheld",
    "projection",
    "tty",
    "tv",
];

/// Features that accept exactly one value.
pub const UNRANGEABLE_FEATURES: &[&str] = &["orientation", "scan", "grid"];

/// Features that accept a single value or a `min..max` range.
pub const RANGEABLE_FEATURES: &[&str] = &[
    "aspectRatio",
    "color",
    "colorIndex",
    "deviceAspectRatio",
    "deviceHeight",
    "deviceWidth",
    "height",
    "monochrome",
    "resolution",
    "width",
];

/// Features measured in lengths; bare numbers get a `px` unit.
pub const LENGTH_FEATURES: &[&str] = &["width", "height", "deviceWidth", "deviceHeight"];

/// Range bound prefixes, in emission order.
pub const BOUND_PREFIXES: [&str; 2] = ["min", "max"];

/// Builds the camelCase key of a bound form, e.g. `("min", "deviceWidth")` -> `minDeviceWidth`.
#[must_use]
pub fn bound_key(prefix: &str, feature: &str) -> String {
    let mut chars = feature.chars();
    let mut key = String::with_capacity(prefix.len() + feature.len());
    key.push_str(prefix);
    if let Some(first) = chars.next() {
        key.extend(first.to_uppercase());
        key.push_str(chars.as_str());
    }
    key
}

/// Returns true for length features and their `min`/`max` forms.
#[must_use]
pub fn is_length_feature(key: &str) -> bool {
    LENGTH_FEATURES.iter().any(|feature| {
        *feature == key
            || BOUND_PREFIXES
                .iter()
                .any(|prefix| bound_key(prefix, feature) == key)
    })
}

/// Translates a camelCase feature key into the kebab-case emitted in queries.
#[must_use]
pub fn kebab_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            if !out.is_empty() {
                out.push('-');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bound_key() {
        assert_eq!(bound_key("min", "width"), "minWidth");
        assert_eq!(bound_key("max", "deviceAspectRatio"), "maxDeviceAspectRatio");
    }

    #[test]
    fn test_kebab_case() {
        assert_eq!(kebab_case("width"), "width");
        assert_eq!(kebab_case("minDeviceWidth"), "min-device-width");
        assert_eq!(kebab_case("aspectRatio"), "aspect-ratio");
    }

    #[test]
    fn test_length_features() {
        for key in ["width", "minHeight", "maxDeviceWidth", "deviceHeight"] {
            assert!(is_length_feature(key), "{key} should be a length feature");
        }
        for key in ["monochrome", "minColor", "resolution", "orientation"] {
            assert!(!is_length_feature(key), "{key} should not be a length feature");
        }
    }
}
