use ndarray::{Array2, ArrayView2, Axis, Zip};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

/// Apply a separable Gaussian blur. Edges are clamped.
///
/// A non-positive `sigma` returns a copy of the input.
pub fn gaussian_blur_array(data: &ArrayView2<'_, f32>, sigma: f32) -> Array2<f32> {
    if sigma <= 0.0 || data.is_empty() {
        return data.to_owned();
    }
    let kernel = make_gaussian_kernel(sigma);
    let row_pass = convolve_axis(data, &kernel, Axis(1));
    convolve_axis(&row_pass.view(), &kernel, Axis(0))
}

fn make_gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil() as usize;
    let size = 2 * radius + 1;
    let mut kernel = vec![0.0f32; size];
    let s2 = 2.0 * sigma * sigma;
    let mut sum = 0.0f32;

    for (i, k) in kernel.iter_mut().enumerate() {
        let x = i as f32 - radius as f32;
        *k = (-x * x / s2).exp();
        sum += *k;
    }

    for v in &mut kernel {
        *v /= sum;
    }

    kernel
}

/// 1D convolution along `axis` (1 = along rows, 0 = along columns).
fn convolve_axis(data: &ArrayView2<'_, f32>, kernel: &[f32], axis: Axis) -> Array2<f32> {
    let (h, w) = data.dim();
    let radius = kernel.len() as isize / 2;
    let len = data.len_of(axis) as isize;

    let mut result = Array2::<f32>::zeros((h, w));
    let convolve = |(row, col): (usize, usize), out: &mut f32| {
        let mut sum = 0.0f32;
        for (ki, &kv) in kernel.iter().enumerate() {
            let offset = ki as isize - radius;
            let v = if axis == Axis(1) {
                let src = (col as isize + offset).clamp(0, len - 1) as usize;
                data[[row, src]]
            } else {
                let src = (row as isize + offset).clamp(0, len - 1) as usize;
                data[[src, col]]
            };
            sum += v * kv;
        }
        *out = sum;
    };

    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        Zip::indexed(&mut result).par_for_each(convolve);
    } else {
        Zip::indexed(&mut result).for_each(convolve);
    }
    result
}

/// Halve both dimensions by taking every other pixel. Blur first.
pub fn downsample_2x(data: &ArrayView2<'_, f32>) -> Array2<f32> {
    let (h, w) = data.dim();
    let new_h = h.div_ceil(2);
    let new_w = w.div_ceil(2);
    Array2::from_shape_fn((new_h, new_w), |(r, c)| data[[r * 2, c * 2]])
}
