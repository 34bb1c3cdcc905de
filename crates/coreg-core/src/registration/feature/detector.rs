use ndarray::{Array2, ArrayView2, Zip};

use crate::consts::{
    CORNER_MIN_DISTANCE, CORNER_QUALITY_LEVEL, CORNER_WINDOW_SIGMA, DESCRIPTOR_RADIUS, EPSILON,
    ORIENTATION_RADIUS,
};
use crate::filters::gaussian_blur::gaussian_blur_array;
use crate::filters::gradient::sobel_gradients;
use crate::registration::subpixel::parabola_vertex;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    /// Column, sub-pixel.
    pub x: f64,
    /// Row, sub-pixel.
    pub y: f64,
    /// Minimum eigenvalue of the structure tensor.
    pub response: f64,
    /// Intensity-centroid orientation in radians.
    pub angle: f64,
}

/// Shi-Tomasi response: the smaller eigenvalue of the smoothed structure
/// tensor at every pixel.
pub fn corner_response(image: &ArrayView2<'_, f32>) -> Array2<f32> {
    let (gx, gy) = sobel_gradients(image);
    let ixx = gaussian_blur_array(&(&gx * &gx).view(), CORNER_WINDOW_SIGMA);
    let iyy = gaussian_blur_array(&(&gy * &gy).view(), CORNER_WINDOW_SIGMA);
    let ixy = gaussian_blur_array(&(&gx * &gy).view(), CORNER_WINDOW_SIGMA);

    let mut response = Array2::<f32>::zeros(image.dim());
    Zip::from(&mut response)
        .and(&ixx)
        .and(&iyy)
        .and(&ixy)
        .for_each(|r, &a, &c, &b| {
            let half_trace = (a + c) / 2.0;
            let disc = (((a - c) / 2.0).powi(2) + b * b).sqrt();
            *r = half_trace - disc;
        });
    response
}

/// Detect up to `max_keypoints` corners, strongest first.
///
/// Corners closer than the descriptor radius to the border are skipped so
/// that every keypoint can be described from in-image pixels.
pub fn detect_keypoints(image: &ArrayView2<'_, f32>, max_keypoints: usize) -> Vec<Keypoint> {
    let (h, w) = image.dim();
    let margin = DESCRIPTOR_RADIUS.ceil() as usize + 1;
    if h <= 2 * margin || w <= 2 * margin || max_keypoints == 0 {
        return Vec::new();
    }

    let response = corner_response(image);
    let max_response = response.iter().copied().fold(0.0f32, f32::max) as f64;
    if max_response <= EPSILON {
        return Vec::new();
    }
    let threshold = (CORNER_QUALITY_LEVEL * max_response) as f32;

    let mut candidates = Vec::new();
    for row in margin..h - margin {
        for col in margin..w - margin {
            let v = response[[row, col]];
            if v <= threshold {
                continue;
            }
            let is_max = (row - 1..=row + 1).all(|r| {
                (col - 1..=col + 1).all(|c| (r == row && c == col) || response[[r, c]] <= v)
            });
            if is_max {
                candidates.push((row, col, v));
            }
        }
    }
    candidates.sort_by(|a, b| b.2.total_cmp(&a.2));

    let min_dist_sq = CORNER_MIN_DISTANCE * CORNER_MIN_DISTANCE;
    let mut keypoints: Vec<Keypoint> = Vec::with_capacity(max_keypoints.min(candidates.len()));
    for (row, col, v) in candidates {
        if keypoints.len() >= max_keypoints {
            break;
        }
        let dy = parabola_vertex(
            response[[row - 1, col]] as f64,
            v as f64,
            response[[row + 1, col]] as f64,
        );
        let dx = parabola_vertex(
            response[[row, col - 1]] as f64,
            v as f64,
            response[[row, col + 1]] as f64,
        );
        let (x, y) = (col as f64 + dx, row as f64 + dy);
        let crowded = keypoints
            .iter()
            .any(|k| (k.x - x).powi(2) + (k.y - y).powi(2) < min_dist_sq);
        if crowded {
            continue;
        }
        keypoints.push(Keypoint {
            x,
            y,
            response: v as f64,
            angle: orientation(image, row, col),
        });
    }

    keypoints
}

/// Angle of the intensity centroid over a disc around `(row, col)`.
fn orientation(image: &ArrayView2<'_, f32>, row: usize, col: usize) -> f64 {
    let (h, w) = image.dim();
    let radius = ORIENTATION_RADIUS;
    let mut m01 = 0.0f64;
    let mut m10 = 0.0f64;

    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy > radius * radius {
                continue;
            }
            let r = row as i64 + dy;
            let c = col as i64 + dx;
            if r < 0 || c < 0 || r >= h as i64 || c >= w as i64 {
                continue;
            }
            let intensity = image[[r as usize, c as usize]] as f64;
            m01 += intensity * dy as f64;
            m10 += intensity * dx as f64;
        }
    }

    m01.atan2(m10)
}
