//! RANSAC fitting of point correspondences.
//!
//! Minimal subsets are drawn with a seeded ChaCha generator, so a given
//! seed always produces the same model. The best hypothesis (most inliers,
//! then lowest inlier error) is refit by least squares on its inliers.

use nalgebra::{DMatrix, SVD};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::consts::EPSILON;
use crate::transform::{TransformFamily, TransformModel};

pub type Point = (f64, f64);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RansacParams {
    /// Inlier reprojection threshold in pixels.
    pub threshold: f64,
    pub max_iterations: usize,
    pub seed: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RansacFit {
    /// Maps `src` points onto `dst` points.
    pub transform: TransformModel,
    pub inliers: Vec<usize>,
    pub iterations: usize,
}

/// Robustly fit `family` to the correspondences `src[i] -> dst[i]`.
///
/// Returns `None` when there are fewer correspondences than the minimal
/// sample size or no sample yields a valid model.
pub fn fit_ransac(
    src: &[Point],
    dst: &[Point],
    family: TransformFamily,
    params: &RansacParams,
) -> Option<RansacFit> {
    let n = src.len().min(dst.len());
    let k = family.min_points().max(1);
    if n < k {
        return None;
    }

    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let mut best: Option<(TransformModel, Vec<usize>, f64)> = None;
    let mut sample_indices: Vec<usize> = Vec::with_capacity(k);
    let mut sample_src: Vec<Point> = Vec::with_capacity(k);
    let mut sample_dst: Vec<Point> = Vec::with_capacity(k);
    let mut iterations = 0;

    while iterations < params.max_iterations {
        iterations += 1;
        random_sample_into(&mut rng, n, k, &mut sample_indices);
        sample_src.clear();
        sample_dst.clear();
        for &i in &sample_indices {
            sample_src.push(src[i]);
            sample_dst.push(dst[i]);
        }

        let Some(model) = estimate_transform(&sample_src, &sample_dst, family) else {
            continue;
        };
        let (inliers, error) = count_inliers(src, dst, &model, params.threshold);
        let better = match &best {
            None => !inliers.is_empty(),
            Some((_, best_inliers, best_error)) => {
                inliers.len() > best_inliers.len()
                    || (inliers.len() == best_inliers.len() && error < *best_error)
            }
        };
        if better {
            let all = inliers.len() == n;
            best = Some((model, inliers, error));
            if all {
                break;
            }
        }
    }

    let (model, inliers, _) = best?;

    // Final refinement with least squares on all inliers
    let refined = if inliers.len() >= k {
        let in_src: Vec<Point> = inliers.iter().map(|&i| src[i]).collect();
        let in_dst: Vec<Point> = inliers.iter().map(|&i| dst[i]).collect();
        estimate_transform(&in_src, &in_dst, family)
            .map(|t| (t, count_inliers(src, dst, &t, params.threshold).0))
            .filter(|(_, refit_inliers)| refit_inliers.len() >= inliers.len())
    } else {
        None
    };
    let (transform, inliers) = refined.unwrap_or((model, inliers));

    Some(RansacFit {
        transform,
        inliers,
        iterations,
    })
}

/// Floyd's algorithm: `k` distinct indices from `0..n`.
fn random_sample_into<R: Rng>(rng: &mut R, n: usize, k: usize, buffer: &mut Vec<usize>) {
    buffer.clear();
    for j in (n - k)..n {
        let t = rng.random_range(0..=j);
        if buffer.contains(&t) {
            buffer.push(j);
        } else {
            buffer.push(t);
        }
    }
}

/// Indices within `threshold` and the summed squared error over them.
fn count_inliers(
    src: &[Point],
    dst: &[Point],
    model: &TransformModel,
    threshold: f64,
) -> (Vec<usize>, f64) {
    let threshold_sq = threshold * threshold;
    let mut inliers = Vec::new();
    let mut error = 0.0;
    for (i, (&(sx, sy), &(dx, dy))) in src.iter().zip(dst.iter()).enumerate() {
        let (px, py) = model.apply(sx, sy);
        let d2 = (px - dx).powi(2) + (py - dy).powi(2);
        if d2 < threshold_sq {
            inliers.push(i);
            error += d2;
        }
    }
    (inliers, error)
}

/// Least-squares fit of `family` to the correspondences. Returns `None`
/// for degenerate configurations.
pub fn estimate_transform(
    src: &[Point],
    dst: &[Point],
    family: TransformFamily,
) -> Option<TransformModel> {
    let model = match family {
        TransformFamily::Identity => Some(TransformModel::identity()),
        TransformFamily::Translation => estimate_translation(src, dst),
        TransformFamily::Euler => estimate_euler(src, dst),
        TransformFamily::Affine => estimate_affine(src, dst),
        TransformFamily::Homography => estimate_homography(src, dst),
    }?;
    let finite = model.matrix().iter().flatten().all(|v| v.is_finite());
    (finite && model.invert().is_ok()).then_some(model)
}

fn centroid(points: &[Point]) -> Point {
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(ax, ay), &(x, y)| (ax + x, ay + y));
    (sx / n, sy / n)
}

fn estimate_translation(src: &[Point], dst: &[Point]) -> Option<TransformModel> {
    if src.is_empty() {
        return None;
    }
    let (scx, scy) = centroid(src);
    let (dcx, dcy) = centroid(dst);
    Some(TransformModel::translation(dcx - scx, dcy - scy))
}

/// Rigid Procrustes fit (rotation + translation, unit scale).
fn estimate_euler(src: &[Point], dst: &[Point]) -> Option<TransformModel> {
    if src.len() < 2 {
        return None;
    }
    let (scx, scy) = centroid(src);
    let (dcx, dcy) = centroid(dst);

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syx = 0.0;
    let mut syy = 0.0;
    let mut src_var = 0.0;
    for (&(x, y), &(u, v)) in src.iter().zip(dst.iter()) {
        let (x, y) = (x - scx, y - scy);
        let (u, v) = (u - dcx, v - dcy);
        sxx += x * u;
        sxy += x * v;
        syx += y * u;
        syy += y * v;
        src_var += x * x + y * y;
    }
    if src_var < EPSILON {
        return None;
    }

    let angle = (sxy - syx).atan2(sxx + syy);
    let (sin, cos) = angle.sin_cos();
    let tx = dcx - (cos * scx - sin * scy);
    let ty = dcy - (sin * scx + cos * scy);
    Some(TransformModel::euler(tx, ty, angle))
}

/// Affine fit via the normal equations, one 3x3 system per output axis.
fn estimate_affine(src: &[Point], dst: &[Point]) -> Option<TransformModel> {
    if src.len() < 3 {
        return None;
    }
    // Centre the source for conditioning: dst = A (src - c) + b'
    let (cx, cy) = centroid(src);
    let n = src.len() as f64;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    let mut su = 0.0;
    let mut sv = 0.0;
    let mut sxu = 0.0;
    let mut syu = 0.0;
    let mut sxv = 0.0;
    let mut syv = 0.0;
    for (&(x, y), &(u, v)) in src.iter().zip(dst.iter()) {
        let (x, y) = (x - cx, y - cy);
        sxx += x * x;
        sxy += x * y;
        syy += y * y;
        su += u;
        sv += v;
        sxu += x * u;
        syu += y * u;
        sxv += x * v;
        syv += y * v;
    }

    // With centred x, y the system decouples into a 2x2 for the linear
    // part and the mean for the offset.
    let det = sxx * syy - sxy * sxy;
    if det.abs() < EPSILON {
        return None;
    }
    let inv = |p: f64, q: f64| ((syy * p - sxy * q) / det, (sxx * q - sxy * p) / det);
    let (a, b) = inv(sxu, syu);
    let (c, d) = inv(sxv, syv);
    let (bu, bv) = (su / n, sv / n);

    let tx = bu - a * cx - b * cy;
    let ty = bv - c * cx - d * cy;
    Some(TransformModel::affine([a, b, tx, c, d, ty]))
}

/// Similarity normalization: centroid to origin, mean distance sqrt(2).
fn normalize_points(points: &[Point]) -> (Vec<Point>, TransformModel) {
    let (cx, cy) = centroid(points);
    let mean_dist = points
        .iter()
        .map(|&(x, y)| ((x - cx).powi(2) + (y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / points.len() as f64;
    let scale = if mean_dist > EPSILON {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    let normalized = points
        .iter()
        .map(|&(x, y)| ((x - cx) * scale, (y - cy) * scale))
        .collect();
    let t = TransformModel::affine([scale, 0.0, -cx * scale, 0.0, scale, -cy * scale]);
    (normalized, t)
}

/// Normalized direct linear transform, solved with an SVD.
fn estimate_homography(src: &[Point], dst: &[Point]) -> Option<TransformModel> {
    if src.len() < 4 {
        return None;
    }
    let (src_n, src_t) = normalize_points(src);
    let (dst_n, dst_t) = normalize_points(dst);

    // Pad to at least 9 rows so the SVD yields the full right basis.
    let rows = (2 * src.len()).max(9);
    let mut a = DMatrix::<f64>::zeros(rows, 9);
    for (i, (&(x, y), &(u, v))) in src_n.iter().zip(dst_n.iter()).enumerate() {
        let r = 2 * i;
        let row1 = [-x, -y, -1.0, 0.0, 0.0, 0.0, x * u, y * u, u];
        let row2 = [0.0, 0.0, 0.0, -x, -y, -1.0, x * v, y * v, v];
        for c in 0..9 {
            a[(r, c)] = row1[c];
            a[(r + 1, c)] = row2[c];
        }
    }

    let svd = SVD::new(a, false, true);
    let v_t = svd.v_t?;
    let (min_idx, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|x, y| x.1.total_cmp(y.1))?;
    let h = v_t.row(min_idx);

    let h_norm = TransformModel::from_matrix(
        [[h[0], h[1], h[2]], [h[3], h[4], h[5]], [h[6], h[7], h[8]]],
        TransformFamily::Homography,
    );
    let dst_t_inv = dst_t.invert().ok()?;
    let denorm = dst_t_inv.compose(&h_norm).compose(&src_t);
    if denorm.matrix()[2][2].abs() < EPSILON {
        return None;
    }
    Some(TransformModel::from_matrix(
        *denorm.matrix(),
        TransformFamily::Homography,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Vec<Point> {
        (0..5)
            .flat_map(|i| (0..5).map(move |j| (10.0 + 15.0 * i as f64, 12.0 + 13.0 * j as f64)))
            .collect()
    }

    fn map(t: &TransformModel, pts: &[Point]) -> Vec<Point> {
        pts.iter().map(|&(x, y)| t.apply(x, y)).collect()
    }

    #[test]
    fn exact_fits_recover_each_family() {
        let src = grid();
        let truths = [
            TransformModel::euler(3.0, -2.0, 0.1),
            TransformModel::affine([1.05, 0.02, 4.0, -0.03, 0.97, -1.5]),
            TransformModel::homography([1.01, 0.02, 3.0, -0.01, 0.99, 2.0, 1e-4, -5e-5]),
        ];
        for truth in truths {
            let dst = map(&truth, &src);
            let fit = estimate_transform(&src, &dst, truth.family()).expect("fit");
            assert!(fit.approx_eq(&truth, 1e-6), "{truth} vs {fit}");
        }
    }

    #[test]
    fn collinear_points_are_degenerate_for_affine() {
        let src: Vec<Point> = (0..5).map(|i| (i as f64, 2.0 * i as f64)).collect();
        assert!(estimate_transform(&src, &src, TransformFamily::Affine).is_none());
    }

    #[test]
    fn ransac_ignores_outliers_and_is_deterministic() {
        let src = grid();
        let truth = TransformModel::euler(5.0, 1.0, -0.05);
        let mut dst = map(&truth, &src);
        for (k, p) in dst.iter_mut().enumerate().step_by(5) {
            *p = (p.0 + 20.0 + k as f64, p.1 - 17.0);
        }
        let params = RansacParams {
            threshold: 1.0,
            max_iterations: 200,
            seed: 7,
        };
        let a = fit_ransac(&src, &dst, TransformFamily::Euler, &params).expect("fit");
        let b = fit_ransac(&src, &dst, TransformFamily::Euler, &params).expect("fit");
        assert_eq!(a, b);
        assert_eq!(a.inliers.len(), 20);
        assert!(a.transform.approx_eq(&truth, 1e-6));
    }

    #[test]
    fn too_few_points_yields_none() {
        let params = RansacParams {
            threshold: 1.0,
            max_iterations: 10,
            seed: 0,
        };
        let pts = [(1.0, 2.0), (3.0, 4.0), (5.0, 7.0)];
        assert!(fit_ransac(&pts, &pts, TransformFamily::Homography, &params).is_none());
    }
}
