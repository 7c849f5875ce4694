use serde_json::json;

use mediaset::{compile, compile_json, Configuration, Descriptor, FeatureObject, FeatureValue, MediaQueryError};

#[test]
fn compile_passes_strings_through_unchanged() {
    for s in ["", "tv", "screen and (min-width: 40em)", "  odd spacing  "] {
        assert_eq!(compile(&Descriptor::query(s)).unwrap(), s);
    }
}

#[test]
fn compile_rejects_non_descriptor_json() {
    for value in [json!(10), json!(true), json!(null), json!(1.5)] {
        let err = compile_json(&value).unwrap_err();
        assert!(matches!(err, MediaQueryError::InvalidInput { .. }), "{value}");
    }
}

#[test]
fn compile_sequence_equals_joined_parts() {
    let a = Descriptor::features(FeatureObject::new().with("type", "screen").with("color", true));
    let b = Descriptor::query("print and (monochrome: 8)");
    let joined = format!("{}, {}", compile(&a).unwrap(), compile(&b).unwrap());
    assert_eq!(compile(&Descriptor::any_of(vec![a, b])).unwrap(), joined);
}

#[test]
fn compile_builds_ranges_from_rust_values() {
    let d = Descriptor::features(
        FeatureObject::new()
            .with("height", FeatureValue::range(100, 200))
            .with("resolution", FeatureValue::range(FeatureValue::Null, "300dpi")),
    );
    assert_eq!(
        compile(&d).unwrap(),
        "(min-height: 100px) and (max-height: 200px) and (max-resolution: 300dpi)"
    );
}

#[test]
fn compile_reports_every_unrecognized_key() {
    let err = compile_json(&json!({"zeta": 1, "alpha": 2, "width": 3})).unwrap_err();
    assert_eq!(
        err,
        MediaQueryError::UnrecognizedKeys {
            keys: vec!["alpha".to_string(), "zeta".to_string()]
        }
    );
    assert_eq!(err.to_string(), "Unrecognized media query keys: alpha, zeta");
}

#[test]
fn compile_rejects_unsupported_feature_values() {
    for value in [json!({"width": {"px": 3}}), json!({"color": null}), json!({"height": false})] {
        assert!(
            matches!(compile_json(&value), Err(MediaQueryError::InvalidValue { .. })),
            "{value}"
        );
    }
}

#[test]
fn compile_handles_every_rangeable_feature() {
    let cases = [
        ("aspectRatio", "aspect-ratio", ""),
        ("color", "color", ""),
        ("colorIndex", "color-index", ""),
        ("deviceAspectRatio", "device-aspect-ratio", ""),
        ("deviceHeight", "device-height", "px"),
        ("deviceWidth", "device-width", "px"),
        ("height", "height", "px"),
        ("monochrome", "monochrome", ""),
        ("resolution", "resolution", ""),
        ("width", "width", "px"),
    ];
    for (key, css, unit) in cases {
        let d = Descriptor::features(FeatureObject::new().with(key, "1..2"));
        assert_eq!(
            compile(&d).unwrap(),
            format!("(min-{css}: 1{unit}) and (max-{css}: 2{unit})")
        );
    }
}

#[test]
fn default_configuration_matches_documented_queries() {
    let config = Configuration::default();
    let query = |name: &str| compile(config.get(name).unwrap()).unwrap();
    assert_eq!(query("small"), "(max-width: 592px)");
    assert_eq!(query("medium"), "(min-width: 593px) and (max-width: 896px)");
    assert_eq!(query("large"), "(min-width: 897px)");
}

#[test]
fn descriptors_deserialize_inside_configuration_files() {
    let config = Configuration::from_json(
        r#"{
            "hd": [{"type": "screen", "deviceWidth": "1920.."}, {"type": "tv"}],
            "print": "print"
        }"#,
    )
    .unwrap();
    assert_eq!(
        compile(config.get("hd").unwrap()).unwrap(),
        "screen and (min-device-width: 1920px), tv"
    );
    assert_eq!(compile(config.get("print").unwrap()).unwrap(), "print");
}
