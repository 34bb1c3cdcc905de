#![allow(dead_code)]

use ndarray::{s, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use coreg_core::frame::{Frame, Layer, Stack};
use coreg_core::transform::TransformModel;

/// Smooth synthetic scene: a sum of Gaussian spots kept `margin` pixels
/// away from the border, so the edges are (close to) zero.
pub fn spot_image(height: usize, width: usize, spots: usize, margin: usize, seed: u64) -> Array2<f32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let params: Vec<(f64, f64, f64, f64)> = (0..spots)
        .map(|_| {
            let cy = rng.random_range(margin as f64..(height - margin) as f64);
            let cx = rng.random_range(margin as f64..(width - margin) as f64);
            let sigma = rng.random_range(2.0..4.0);
            let amplitude = rng.random_range(0.3..1.0);
            (cx, cy, sigma, amplitude)
        })
        .collect();

    let mut data = Array2::<f32>::zeros((height, width));
    for ((row, col), v) in data.indexed_iter_mut() {
        let mut sum = 0.0;
        for &(cx, cy, sigma, amplitude) in &params {
            let d2 = (col as f64 - cx).powi(2) + (row as f64 - cy).powi(2);
            sum += amplitude * (-d2 / (2.0 * sigma * sigma)).exp();
        }
        *v = sum as f32;
    }
    normalize(data)
}

/// Piecewise-constant scene of overlapping rectangles. Plenty of sharp
/// corners for keypoint detection.
pub fn block_image(height: usize, width: usize, blocks: usize, margin: usize, seed: u64) -> Array2<f32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut data = Array2::<f32>::zeros((height, width));
    for _ in 0..blocks {
        let h = rng.random_range(6..20);
        let w = rng.random_range(6..20);
        let r0 = rng.random_range(margin..height - margin - h);
        let c0 = rng.random_range(margin..width - margin - w);
        let value: f32 = rng.random_range(0.2..1.0);
        data.slice_mut(s![r0..r0 + h, c0..c0 + w]).fill(value);
    }
    data
}

/// Label raster with a few rectangular classes (1, 2, 3) on background 1.
pub fn label_image(height: usize, width: usize) -> Array2<f32> {
    Array2::from_shape_fn((height, width), |(row, col)| {
        if row < height / 2 && col < width / 2 {
            2.0
        } else if row >= height / 2 && col >= width / 3 {
            3.0
        } else {
            1.0
        }
    })
}

pub fn normalize(mut data: Array2<f32>) -> Array2<f32> {
    let max = data.iter().cloned().fold(0.0f32, f32::max);
    if max > 0.0 {
        data.mapv_inplace(|v| v / max);
    }
    data
}

pub fn image_frame(data: Array2<f32>) -> Frame {
    Frame::new().with_layer("image", Layer::from_array2(data))
}

pub fn image_stack(frames: Vec<Array2<f32>>) -> Stack {
    Stack::new(frames.into_iter().map(image_frame).collect()).unwrap()
}

/// Largest displacement `|t(p) - p|` over the four corners of an
/// `height x width` raster.
pub fn max_corner_error(t: &TransformModel, height: usize, width: usize) -> f64 {
    let (h, w) = ((height - 1) as f64, (width - 1) as f64);
    [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)]
        .iter()
        .map(|&(x, y)| {
            let (px, py) = t.apply(x, y);
            (px - x).hypot(py - y)
        })
        .fold(0.0, f64::max)
}

/// Mean absolute difference over the interior, skipping `margin` pixels on
/// every side.
pub fn interior_mad(a: &Array2<f32>, b: &Array2<f32>, margin: usize) -> f64 {
    let (h, w) = a.dim();
    let a = a.slice(s![margin..h - margin, margin..w - margin]);
    let b = b.slice(s![margin..h - margin, margin..w - margin]);
    let sum: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs() as f64)
        .sum();
    sum / a.len() as f64
}
