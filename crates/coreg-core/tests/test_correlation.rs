mod common;

use ndarray::Array2;

use coreg_core::config::{CorrelationConfig, RegistrationMethod};
use coreg_core::error::{CoregError, EstimateFailure};
use coreg_core::registration::correlation::estimate_translation;
use coreg_core::resample::shift_array;
use coreg_core::transform::{TransformFamily, TransformModel};

use common::spot_image;

fn base() -> Array2<f32> {
    spot_image(96, 96, 24, 12, 7)
}

#[test]
fn test_identical_frames_give_zero_shift() {
    let reference = base();
    let estimate =
        estimate_translation(&reference.view(), &reference.view(), &CorrelationConfig::default())
            .unwrap();
    let (dx, dy) = estimate.transform.translation_components();
    assert!(dx.abs() < 0.05, "dx={dx} should be ~0");
    assert!(dy.abs() < 0.05, "dy={dy} should be ~0");
    assert!(estimate.confidence > 0.9, "confidence={}", estimate.confidence);
    assert_eq!(estimate.transform.family(), TransformFamily::Translation);
}

#[test]
fn test_integer_shift_is_recovered_with_correct_sign() {
    let reference = base();
    let target = shift_array(&reference, 5.0, -3.0);

    let estimate =
        estimate_translation(&reference.view(), &target.view(), &CorrelationConfig::default())
            .unwrap();
    // Maps target coordinates back onto the reference.
    let (dx, dy) = estimate.transform.translation_components();
    assert!((dx + 5.0).abs() < 0.2, "dx={dx} should be ~-5");
    assert!((dy - 3.0).abs() < 0.2, "dy={dy} should be ~3");
}

#[test]
fn test_subpixel_shift_is_recovered() {
    let reference = base();
    let target = shift_array(&reference, 2.3, 1.6);

    let estimate =
        estimate_translation(&reference.view(), &target.view(), &CorrelationConfig::default())
            .unwrap();
    let shift = TransformModel::translation(2.3, 1.6);
    let residual = estimate.transform.compose(&shift);
    let (rx, ry) = residual.translation_components();
    assert!(
        rx.abs() < 0.3 && ry.abs() < 0.3,
        "residual ({rx:.3}, {ry:.3}) should be below 0.3 px"
    );
}

#[test]
fn test_negative_shift_is_unwrapped() {
    let reference = base();
    let target = shift_array(&reference, -12.0, 0.0);
    let estimate =
        estimate_translation(&reference.view(), &target.view(), &CorrelationConfig::default())
            .unwrap();
    let (dx, _) = estimate.transform.translation_components();
    assert!((dx - 12.0).abs() < 0.3, "dx={dx} should be ~12");
}

#[test]
fn test_textureless_input_is_low_confidence() {
    let reference = base();
    let flat = Array2::from_elem((96, 96), 0.5f32);
    let result = estimate_translation(&reference.view(), &flat.view(), &CorrelationConfig::default());
    assert!(matches!(
        result,
        Err(EstimateFailure::LowConfidence { confidence, .. }) if confidence == 0.0
    ));
}

#[test]
fn test_unrelated_frames_fall_below_threshold() {
    let reference = base();
    let other = spot_image(96, 96, 24, 12, 99);
    let config = CorrelationConfig {
        min_confidence: 0.5,
    };
    let result = estimate_translation(&reference.view(), &other.view(), &config);
    assert!(
        matches!(result, Err(EstimateFailure::LowConfidence { .. })),
        "unrelated scenes should not correlate: {result:?}"
    );
}

#[test]
fn test_dispatch_rejects_shape_mismatch() {
    let reference = base();
    let small = Array2::<f32>::zeros((48, 96));
    let result = RegistrationMethod::default().estimate(&reference.view(), &small.view());
    assert!(matches!(result, Err(CoregError::ShapeMismatch { .. })));
}
