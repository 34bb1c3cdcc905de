use coreg_core::config::{
    AlignmentConfig, CorrelationConfig, DescriptorKind, FeatureConfig, IntensityConfig,
    PlausibilityConfig, RegistrationMethod,
};
use coreg_core::error::CoregError;
use coreg_core::frame::LayerKind;
use coreg_core::resample::{Border, Interpolation};
use coreg_core::transform::TransformFamily;

// ---------------------------------------------------------------------------
// RegistrationMethod Display
// ---------------------------------------------------------------------------

#[test]
fn test_method_display_correlation() {
    let m = RegistrationMethod::Correlation(CorrelationConfig::default());
    assert_eq!(format!("{}", m), "Phase Correlation");
}

#[test]
fn test_method_display_intensity_counts_levels() {
    let m = RegistrationMethod::Intensity(IntensityConfig {
        pyramid_levels: 3,
        ..IntensityConfig::default()
    });
    assert_eq!(format!("{}", m), "ECC (4 levels)");
}

#[test]
fn test_method_display_feature() {
    let m = RegistrationMethod::Feature(FeatureConfig {
        transform_family: TransformFamily::Homography,
        descriptor_type: "patch".to_string(),
        ..FeatureConfig::default()
    });
    assert_eq!(format!("{}", m), "Feature (Homography, patch)");
}

#[test]
fn test_method_default_is_correlation() {
    assert!(matches!(
        RegistrationMethod::default(),
        RegistrationMethod::Correlation(_)
    ));
    assert_eq!(
        RegistrationMethod::default().family(),
        TransformFamily::Translation
    );
}

#[test]
fn test_interpolation_display() {
    assert_eq!(format!("{}", Interpolation::Nearest), "Nearest");
    assert_eq!(format!("{}", Interpolation::Linear), "Bilinear");
    assert_eq!(format!("{}", Interpolation::Cubic), "Bicubic");
    assert_eq!(Interpolation::default(), Interpolation::Linear);
}

// ---------------------------------------------------------------------------
// DescriptorKind
// ---------------------------------------------------------------------------

#[test]
fn test_descriptor_kind_parse_is_case_insensitive() {
    assert_eq!("ORB".parse::<DescriptorKind>().unwrap(), DescriptorKind::Orb);
    assert_eq!("patch".parse::<DescriptorKind>().unwrap(), DescriptorKind::Patch);
}

#[test]
fn test_descriptor_kind_unknown_is_invalid_config() {
    assert!(matches!(
        "brisk".parse::<DescriptorKind>(),
        Err(CoregError::InvalidConfig(_))
    ));
}

// ---------------------------------------------------------------------------
// Defaults and validation
// ---------------------------------------------------------------------------

#[test]
fn test_alignment_config_defaults() {
    let config = AlignmentConfig::default();
    assert_eq!(config.reference_index, 0);
    assert_eq!(config.layer, "image");
    assert_eq!(config.channel, 0);
    assert_eq!(config.border, Border::Constant(0.0));
    assert_eq!(config.layers.get("image"), Some(&LayerKind::Continuous));
    assert_eq!(config.plausibility, PlausibilityConfig::default());
    assert!(config.validate().is_ok());
}

#[test]
fn test_with_layer_kind_registers_layer() {
    let config = AlignmentConfig::default().with_layer_kind("mask", LayerKind::Categorical);
    assert_eq!(config.layers.len(), 2);
    assert_eq!(config.layers["mask"], LayerKind::Categorical);
}

#[test]
fn test_validate_rejects_out_of_range_parameters() {
    let invalid = [
        RegistrationMethod::Correlation(CorrelationConfig {
            min_confidence: 1.5,
        }),
        RegistrationMethod::Intensity(IntensityConfig {
            max_iterations: 0,
            ..IntensityConfig::default()
        }),
        RegistrationMethod::Intensity(IntensityConfig {
            convergence_epsilon: 0.0,
            ..IntensityConfig::default()
        }),
        RegistrationMethod::Feature(FeatureConfig {
            ratio_test: 0.0,
            ..FeatureConfig::default()
        }),
        RegistrationMethod::Feature(FeatureConfig {
            transform_family: TransformFamily::Translation,
            ..FeatureConfig::default()
        }),
        RegistrationMethod::Feature(FeatureConfig {
            descriptor_type: "sift".to_string(),
            ..FeatureConfig::default()
        }),
    ];
    for method in invalid {
        let config = AlignmentConfig::default().with_algorithm(method.clone());
        assert!(
            matches!(config.validate(), Err(CoregError::InvalidConfig(_))),
            "{method:?} should be rejected"
        );
    }
}

#[test]
fn test_validate_rejects_inverted_scale_bounds() {
    let mut config = AlignmentConfig::default();
    config.plausibility.min_scale = 2.0;
    config.plausibility.max_scale = 1.0;
    assert!(matches!(config.validate(), Err(CoregError::InvalidConfig(_))));
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

#[test]
fn test_config_json_roundtrip() {
    let config = AlignmentConfig {
        reference_index: 3,
        interpolation: Interpolation::Cubic,
        border: Border::Replicate,
        ..AlignmentConfig::default()
    }
    .with_algorithm(RegistrationMethod::Feature(FeatureConfig {
        transform_family: TransformFamily::Affine,
        descriptor_type: "patch".to_string(),
        seed: 42,
        ..FeatureConfig::default()
    }))
    .with_layer_kind("labels", LayerKind::Categorical);

    let json = serde_json::to_string(&config).unwrap();
    let back: AlignmentConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back.reference_index, 3);
    assert_eq!(back.border, Border::Replicate);
    assert_eq!(back.layers, config.layers);
    assert_eq!(back.algorithm.family(), TransformFamily::Affine);
    match back.algorithm {
        RegistrationMethod::Feature(f) => {
            assert_eq!(f.seed, 42);
            assert_eq!(f.descriptor().unwrap(), DescriptorKind::Patch);
        }
        other => panic!("expected feature method, got {other:?}"),
    }
}

#[test]
fn test_partial_config_fills_defaults() {
    let json = r#"{ "reference_index": 2, "algorithm": { "Intensity": { "pyramid_levels": 1 } } }"#;
    let config: AlignmentConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.reference_index, 2);
    assert_eq!(config.layer, "image");
    match config.algorithm {
        RegistrationMethod::Intensity(c) => {
            assert_eq!(c.pyramid_levels, 1);
            assert_eq!(c.max_iterations, IntensityConfig::default().max_iterations);
        }
        other => panic!("expected intensity method, got {other:?}"),
    }
}
