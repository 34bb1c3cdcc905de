//! Translation estimation by FFT phase correlation.

use ndarray::{Array2, ArrayView2, Axis};
use num_complex::Complex;
use rustfft::FftPlanner;
use tracing::trace;

use crate::config::CorrelationConfig;
use crate::consts::{EPSILON, TEXTURELESS_VARIANCE};
use crate::error::EstimateFailure;
use crate::transform::TransformModel;

use super::subpixel::refine_peak_periodic;
use super::{mean_variance, Diagnostics, Estimation, RegistrationEstimate};

/// Estimate the translation that maps `target` onto `reference`.
///
/// Both rasters must have the same shape. The confidence is the height of
/// the phase-correlation peak; estimates below `config.min_confidence`, and
/// textureless inputs, are reported as [`EstimateFailure::LowConfidence`].
pub fn estimate_translation(
    reference: &ArrayView2<'_, f32>,
    target: &ArrayView2<'_, f32>,
    config: &CorrelationConfig,
) -> Estimation {
    let low_confidence = |confidence: f64| EstimateFailure::LowConfidence {
        confidence,
        threshold: config.min_confidence,
    };

    let (h, w) = reference.dim();
    let (ref_mean, ref_var) = mean_variance(reference);
    let (tgt_mean, tgt_var) = mean_variance(target);
    if ref_var < TEXTURELESS_VARIANCE || tgt_var < TEXTURELESS_VARIANCE {
        return Err(low_confidence(0.0));
    }

    // Remove the mean and apply a Hann window to reduce spectral leakage
    let ref_windowed = apply_hann(reference, ref_mean);
    let tgt_windowed = apply_hann(target, tgt_mean);

    let ref_fft = fft2d(&ref_windowed);
    let tgt_fft = fft2d(&tgt_windowed);
    let cross_power = normalized_cross_power(&ref_fft, &tgt_fft);
    let correlation = ifft2d(&cross_power);

    let (peak_row, peak_col, peak_val) = find_peak(&correlation);

    // Convert to signed offset (handle wrap-around)
    let dy = if peak_row > h / 2 {
        peak_row as f64 - h as f64
    } else {
        peak_row as f64
    };
    let dx = if peak_col > w / 2 {
        peak_col as f64 - w as f64
    } else {
        peak_col as f64
    };

    let (sub_dy, sub_dx) = refine_peak_periodic(&correlation, peak_row, peak_col);
    let confidence = peak_val.clamp(0.0, 1.0);
    trace!(dx = dx + sub_dx, dy = dy + sub_dy, confidence, "phase correlation peak");

    if confidence < config.min_confidence {
        return Err(low_confidence(confidence));
    }

    Ok(RegistrationEstimate {
        transform: TransformModel::translation(dx + sub_dx, dy + sub_dy),
        confidence,
        diagnostics: Diagnostics::default(),
    })
}

fn apply_hann(data: &ArrayView2<'_, f32>, mean: f64) -> Array2<f64> {
    let (h, w) = data.dim();
    let window = |i: usize, n: usize| 0.5 * (1.0 - (std::f64::consts::TAU * i as f64 / n as f64).cos());
    let wx: Vec<f64> = (0..w).map(|c| window(c, w)).collect();
    Array2::from_shape_fn((h, w), |(row, col)| {
        (data[[row, col]] as f64 - mean) * window(row, h) * wx[col]
    })
}

/// 2D FFT: row-wise FFT, then column-wise FFT.
fn fft2d(data: &Array2<f64>) -> Array2<Complex<f64>> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let fft_row = planner.plan_fft_forward(w);
    let fft_col = planner.plan_fft_forward(h);

    let mut result = data.mapv(|v| Complex::new(v, 0.0));
    transform_lanes(&mut result, Axis(1), |buf| fft_row.process(buf));
    transform_lanes(&mut result, Axis(0), |buf| fft_col.process(buf));
    result
}

/// Inverse 2D FFT, normalized, real part only.
fn ifft2d(data: &Array2<Complex<f64>>) -> Array2<f64> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let ifft_row = planner.plan_fft_inverse(w);
    let ifft_col = planner.plan_fft_inverse(h);

    let mut work = data.clone();
    transform_lanes(&mut work, Axis(0), |buf| ifft_col.process(buf));
    transform_lanes(&mut work, Axis(1), |buf| ifft_row.process(buf));

    let scale = 1.0 / (h * w) as f64;
    work.mapv(|c| c.re * scale)
}

/// Run an in-place 1D transform over every lane along `axis`.
fn transform_lanes(
    data: &mut Array2<Complex<f64>>,
    axis: Axis,
    process: impl Fn(&mut [Complex<f64>]),
) {
    let mut buffer = vec![Complex::new(0.0, 0.0); data.len_of(axis)];
    for mut lane in data.lanes_mut(axis) {
        for (b, v) in buffer.iter_mut().zip(lane.iter()) {
            *b = *v;
        }
        process(&mut buffer);
        for (v, b) in lane.iter_mut().zip(buffer.iter()) {
            *v = *b;
        }
    }
}

fn normalized_cross_power(
    ref_fft: &Array2<Complex<f64>>,
    tgt_fft: &Array2<Complex<f64>>,
) -> Array2<Complex<f64>> {
    let mut result = Array2::<Complex<f64>>::zeros(ref_fft.dim());
    ndarray::Zip::from(&mut result)
        .and(ref_fft)
        .and(tgt_fft)
        .for_each(|out, &r, &t| {
            let cross = r * t.conj();
            let mag = cross.norm();
            *out = if mag > EPSILON {
                cross / mag
            } else {
                Complex::new(0.0, 0.0)
            };
        });
    result
}

fn find_peak(data: &Array2<f64>) -> (usize, usize, f64) {
    let mut best = (0, 0, f64::NEG_INFINITY);
    for ((row, col), &v) in data.indexed_iter() {
        if v > best.2 {
            best = (row, col, v);
        }
    }
    best
}
