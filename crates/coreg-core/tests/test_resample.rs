mod common;

use std::collections::BTreeSet;

use approx::assert_abs_diff_eq;
use ndarray::Array2;

use coreg_core::error::CoregError;
use coreg_core::frame::{Layer, LayerKind};
use coreg_core::resample::{
    resample, resample_layer, sample_at, shift_array, Border, Interpolation, LayerPolicy,
};
use coreg_core::transform::TransformModel;

use common::{label_image, spot_image};

fn ramp(h: usize, w: usize) -> Array2<f32> {
    Array2::from_shape_fn((h, w), |(r, c)| (r * w + c) as f32)
}

// ---------------------------------------------------------------------------
// resample
// ---------------------------------------------------------------------------

#[test]
fn test_identity_resample_is_exact_for_every_kernel() {
    let src = spot_image(32, 40, 6, 6, 3);
    for interpolation in [Interpolation::Nearest, Interpolation::Linear, Interpolation::Cubic] {
        let out = resample(
            src.view(),
            &TransformModel::identity(),
            interpolation,
            src.dim(),
            Border::default(),
        )
        .unwrap();
        for (a, b) in out.iter().zip(src.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-6);
        }
    }
}

#[test]
fn test_integer_translation_moves_content() {
    let src = ramp(8, 10);
    let out = resample(
        src.view(),
        &TransformModel::translation(2.0, 1.0),
        Interpolation::Linear,
        src.dim(),
        Border::Constant(-1.0),
    )
    .unwrap();

    // output(p) = src(p - (2, 1))
    assert_abs_diff_eq!(out[[3, 5]], src[[2, 3]], epsilon = 1e-5);
    assert_abs_diff_eq!(out[[7, 9]], src[[6, 7]], epsilon = 1e-5);
    assert_eq!(out[[0, 4]], -1.0, "row 0 maps outside the source");
    assert_eq!(out[[4, 1]], -1.0, "column 1 maps outside the source");
}

#[test]
fn test_output_shape_may_differ_from_source() {
    let src = ramp(8, 10);
    let out = resample(
        src.view(),
        &TransformModel::identity(),
        Interpolation::Nearest,
        (4, 12),
        Border::Constant(0.0),
    )
    .unwrap();
    assert_eq!(out.dim(), (4, 12));
    assert_eq!(out[[3, 9]], src[[3, 9]]);
    assert_eq!(out[[3, 11]], 0.0);
}

#[test]
fn test_replicate_border_clamps_to_edge() {
    let src = ramp(6, 6);
    let out = resample(
        src.view(),
        &TransformModel::translation(-3.0, 0.0),
        Interpolation::Nearest,
        src.dim(),
        Border::Replicate,
    )
    .unwrap();
    for row in 0..6 {
        assert_eq!(out[[row, 5]], src[[row, 5]], "row {row} should replicate the last column");
    }
}

#[test]
fn test_singular_transform_is_fatal() {
    let src = ramp(4, 4);
    let t = TransformModel::affine([0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
    let result = resample(src.view(), &t, Interpolation::Linear, (4, 4), Border::default());
    assert!(matches!(result, Err(CoregError::SingularTransform { .. })));
}

#[test]
fn test_cubic_preserves_constant_field() {
    let src = Array2::from_elem((16, 16), 0.4f32);
    let t = TransformModel::euler_about(7.5, 7.5, 0.3, -0.2, 0.05);
    let out = resample(src.view(), &t, Interpolation::Cubic, (16, 16), Border::Replicate).unwrap();
    for v in out.iter() {
        assert_abs_diff_eq!(*v, 0.4, epsilon = 1e-5);
    }
}

#[test]
fn test_nearest_introduces_no_new_values() {
    let src = label_image(20, 24);
    let t = TransformModel::euler_about(12.0, 10.0, 0.7, 0.3, 0.1);
    let out = resample(src.view(), &t, Interpolation::Nearest, src.dim(), Border::Constant(0.0))
        .unwrap();
    let allowed: BTreeSet<u32> = [0, 1, 2, 3].into_iter().collect();
    for v in out.iter() {
        assert!(allowed.contains(&(*v as u32)), "unexpected value {v}");
        assert_eq!(v.fract(), 0.0);
    }
}

#[test]
fn test_sample_at_outside_footprint_is_none() {
    let src = ramp(4, 4);
    assert!(sample_at(&src.view(), -0.6, 1.0, Interpolation::Linear).is_none());
    assert!(sample_at(&src.view(), 1.0, 3.6, Interpolation::Linear).is_none());
    assert!(sample_at(&src.view(), f64::NAN, 1.0, Interpolation::Linear).is_none());
    assert_eq!(sample_at(&src.view(), 1.0, 2.0, Interpolation::Linear), Some(9.0));
}

#[test]
fn test_shift_array_half_pixel_averages_neighbours() {
    let src = ramp(4, 4);
    let out = shift_array(&src, 0.5, 0.0);
    assert_abs_diff_eq!(out[[1, 2]], 0.5 * (src[[1, 1]] + src[[1, 2]]), epsilon = 1e-5);
}

// ---------------------------------------------------------------------------
// Layers
// ---------------------------------------------------------------------------

#[test]
fn test_categorical_layer_forces_nearest_and_fill() {
    let layer = Layer::from_array2(label_image(20, 20));
    let policy = LayerPolicy {
        kind: LayerKind::Categorical,
        interpolation: Interpolation::Cubic,
        border: Border::Constant(0.0),
        no_data: 255.0,
    };
    assert_eq!(
        policy.effective(),
        (Interpolation::Nearest, Border::Constant(255.0))
    );

    let t = TransformModel::euler_about(10.0, 10.0, 2.3, -1.4, 0.2);
    let out = resample_layer(&layer, &t, &policy).unwrap();
    assert_eq!(out.dim(), layer.dim());
    let values: BTreeSet<u32> = out.data.iter().map(|v| *v as u32).collect();
    assert!(values.is_subset(&[1, 2, 3, 255].into_iter().collect()));
    assert!(values.contains(&255), "corners should map outside the source");
}

#[test]
fn test_continuous_layer_resamples_every_channel() {
    let mut data = ndarray::Array3::<f32>::zeros((3, 10, 10));
    for ch in 0..3 {
        data.index_axis_mut(ndarray::Axis(0), ch).fill(ch as f32 + 1.0);
    }
    let layer = Layer::new(data);
    let policy = LayerPolicy {
        kind: LayerKind::Continuous,
        interpolation: Interpolation::Linear,
        border: Border::Replicate,
        no_data: 0.0,
    };
    let out = resample_layer(&layer, &TransformModel::translation(0.4, 0.4), &policy).unwrap();
    assert_eq!(out.channels(), 3);
    for ch in 0..3 {
        assert!(out
            .channel(ch)
            .iter()
            .all(|v| (v - (ch as f32 + 1.0)).abs() < 1e-5));
    }
}
