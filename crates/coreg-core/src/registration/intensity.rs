//! Euler (rotation + translation) estimation by enhanced correlation
//! coefficient maximization.
//!
//! The warp maps reference coordinates into the target; parameters are
//! optimized in image-centred coordinates at each pyramid level, coarsest
//! first. The returned estimate is the inverse warp (target onto reference).

use nalgebra::{Matrix3, Vector3};
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;
use tracing::trace;

use crate::config::IntensityConfig;
use crate::consts::{
    ECC_DIVERGENCE_TOLERANCE, ECC_MIN_OVERLAP, EPSILON, PARALLEL_PIXEL_THRESHOLD,
    TEXTURELESS_VARIANCE,
};
use crate::error::EstimateFailure;
use crate::filters::gaussian_blur::gaussian_blur_array;
use crate::filters::gradient::central_gradients;
use crate::resample::in_footprint;
use crate::transform::TransformModel;

use super::pyramid::build_pyramid;
use super::{mean_variance, Diagnostics, Estimation, RegistrationEstimate};

/// Euler warp in origin coordinates: `x_target = R(theta) x_ref + (tx, ty)`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct EulerParams {
    theta: f64,
    tx: f64,
    ty: f64,
}

impl EulerParams {
    /// Translation expressed about centre `(cx, cy)`.
    fn centred(&self, cx: f64, cy: f64) -> (f64, f64) {
        let (sin, cos) = self.theta.sin_cos();
        (
            self.tx - cx + (cos * cx - sin * cy),
            self.ty - cy + (sin * cx + cos * cy),
        )
    }

    fn from_centred(theta: f64, tcx: f64, tcy: f64, cx: f64, cy: f64) -> Self {
        let (sin, cos) = theta.sin_cos();
        Self {
            theta,
            tx: tcx + cx - (cos * cx - sin * cy),
            ty: tcy + cy - (sin * cx + cos * cy),
        }
    }
}

/// Estimate the Euler transform mapping `target` onto `reference`.
pub fn estimate_euler(
    reference: &ArrayView2<'_, f32>,
    target: &ArrayView2<'_, f32>,
    config: &IntensityConfig,
) -> Estimation {
    let (_, ref_var) = mean_variance(reference);
    let (_, tgt_var) = mean_variance(target);
    if ref_var < TEXTURELESS_VARIANCE || tgt_var < TEXTURELESS_VARIANCE {
        return Err(EstimateFailure::ConvergenceFailure {
            iterations: 0,
            reason: "textureless input".to_string(),
        });
    }

    let ref_pyramid = build_pyramid(reference, config.pyramid_levels);
    let tgt_pyramid = build_pyramid(target, config.pyramid_levels);
    let coarsest = ref_pyramid.len() - 1;

    let mut params = EulerParams::default();
    let mut total_iterations = 0;
    let mut rho = 0.0;

    // Iterate from coarsest (last) to finest (first = original)
    for level in (0..=coarsest).rev() {
        if level < coarsest {
            params.tx *= 2.0;
            params.ty *= 2.0;
        }
        let template = gaussian_blur_array(&ref_pyramid[level].view(), config.gaussian_sigma);
        let image = gaussian_blur_array(&tgt_pyramid[level].view(), config.gaussian_sigma);

        let outcome = refine_level(&template, &image, params, config, total_iterations)?;
        params = outcome.params;
        rho = outcome.rho;
        total_iterations += outcome.iterations;
        trace!(
            level,
            iterations = outcome.iterations,
            rho,
            theta = params.theta,
            tx = params.tx,
            ty = params.ty,
            "ECC level done"
        );
    }

    let warp = TransformModel::euler(params.tx, params.ty, params.theta);
    let transform = warp
        .invert()
        .map_err(|_| EstimateFailure::SingularTransform)?;

    Ok(RegistrationEstimate {
        transform,
        confidence: rho.clamp(0.0, 1.0),
        diagnostics: Diagnostics {
            iterations: Some(total_iterations),
            ..Diagnostics::default()
        },
    })
}

struct LevelOutcome {
    params: EulerParams,
    rho: f64,
    iterations: usize,
}

/// Raw sums over the valid pixels of one iteration. Zero-mean quantities
/// are derived from these so a single pass suffices.
#[derive(Clone, Copy, Default)]
struct Accum {
    n: f64,
    sum_t: f64,
    sum_i: f64,
    sum_tt: f64,
    sum_ii: f64,
    sum_ti: f64,
    sum_j: [f64; 3],
    sum_jt: [f64; 3],
    sum_ji: [f64; 3],
    /// Upper triangle of `J^T J`: (00, 01, 02, 11, 12, 22).
    hessian: [f64; 6],
}

impl Accum {
    #[inline]
    fn add(&mut self, t: f64, i: f64, j: [f64; 3]) {
        self.n += 1.0;
        self.sum_t += t;
        self.sum_i += i;
        self.sum_tt += t * t;
        self.sum_ii += i * i;
        self.sum_ti += t * i;
        for k in 0..3 {
            self.sum_j[k] += j[k];
            self.sum_jt[k] += j[k] * t;
            self.sum_ji[k] += j[k] * i;
        }
        self.hessian[0] += j[0] * j[0];
        self.hessian[1] += j[0] * j[1];
        self.hessian[2] += j[0] * j[2];
        self.hessian[3] += j[1] * j[1];
        self.hessian[4] += j[1] * j[2];
        self.hessian[5] += j[2] * j[2];
    }

    fn merge(mut self, other: Accum) -> Accum {
        self.n += other.n;
        self.sum_t += other.sum_t;
        self.sum_i += other.sum_i;
        self.sum_tt += other.sum_tt;
        self.sum_ii += other.sum_ii;
        self.sum_ti += other.sum_ti;
        for k in 0..3 {
            self.sum_j[k] += other.sum_j[k];
            self.sum_jt[k] += other.sum_jt[k];
            self.sum_ji[k] += other.sum_ji[k];
        }
        for k in 0..6 {
            self.hessian[k] += other.hessian[k];
        }
        self
    }
}

fn refine_level(
    template: &Array2<f32>,
    image: &Array2<f32>,
    start: EulerParams,
    config: &IntensityConfig,
    iterations_before: usize,
) -> Result<LevelOutcome, EstimateFailure> {
    let (h, w) = template.dim();
    let cx = (w as f64 - 1.0) / 2.0;
    let cy = (h as f64 - 1.0) / 2.0;
    let radius = (cx * cx + cy * cy).sqrt();
    let (gx, gy) = central_gradients(&image.view());

    let fail = |iterations: usize, reason: &str| EstimateFailure::ConvergenceFailure {
        iterations: iterations_before + iterations,
        reason: reason.to_string(),
    };

    let mut theta = start.theta;
    let (mut tcx, mut tcy) = start.centred(cx, cy);
    let mut previous_rho = f64::NEG_INFINITY;
    let mut worsening = 0;
    let mut rho = 0.0;
    let mut iterations = 0;

    while iterations < config.max_iterations {
        iterations += 1;
        let acc = accumulate(template, image, &gx, &gy, theta, tcx, tcy, cx, cy);

        if acc.n < ECC_MIN_OVERLAP * (h * w) as f64 {
            return Err(fail(iterations, "warped target no longer overlaps the reference"));
        }

        let t_mean = acc.sum_t / acc.n;
        let i_mean = acc.sum_i / acc.n;
        let t_norm_sq = acc.sum_tt - acc.n * t_mean * t_mean;
        let i_norm_sq = acc.sum_ii - acc.n * i_mean * i_mean;
        if t_norm_sq < EPSILON || i_norm_sq < EPSILON {
            return Err(fail(iterations, "textureless overlap"));
        }
        let corr = acc.sum_ti - acc.n * t_mean * i_mean;
        rho = corr / (t_norm_sq.sqrt() * i_norm_sq.sqrt());

        if rho < previous_rho - ECC_DIVERGENCE_TOLERANCE {
            worsening += 1;
            if worsening > config.divergence_patience {
                return Err(fail(iterations, "correlation keeps decreasing"));
            }
        } else {
            worsening = 0;
        }
        previous_rho = rho;

        let hs = &acc.hessian;
        let hessian = Matrix3::new(
            hs[0], hs[1], hs[2], //
            hs[1], hs[3], hs[4], //
            hs[2], hs[4], hs[5],
        );
        let Some(hessian_inv) = hessian.try_inverse() else {
            return Err(fail(iterations, "singular Hessian"));
        };

        let j_sum = Vector3::from(acc.sum_j);
        let tmpl_proj = Vector3::from(acc.sum_jt) - j_sum * t_mean;
        let img_proj = Vector3::from(acc.sum_ji) - j_sum * i_mean;

        let lambda_n = i_norm_sq - img_proj.dot(&(hessian_inv * img_proj));
        let lambda_d = corr - tmpl_proj.dot(&(hessian_inv * img_proj));
        if lambda_d <= 0.0 || !lambda_n.is_finite() {
            return Err(fail(iterations, "degenerate ECC update"));
        }
        let lambda = lambda_n / lambda_d;

        let error_proj = tmpl_proj * lambda - img_proj;
        let delta = hessian_inv * error_proj;
        if !delta.iter().all(|v| v.is_finite()) {
            return Err(fail(iterations, "non-finite parameter update"));
        }

        theta += delta[0];
        tcx += delta[1];
        tcy += delta[2];

        let step = (delta[1] * delta[1] + delta[2] * delta[2]).sqrt() + delta[0].abs() * radius;
        if step < config.convergence_epsilon {
            break;
        }
    }

    Ok(LevelOutcome {
        params: EulerParams::from_centred(theta, tcx, tcy, cx, cy),
        rho,
        iterations,
    })
}

#[allow(clippy::too_many_arguments)]
fn accumulate(
    template: &Array2<f32>,
    image: &Array2<f32>,
    gx: &Array2<f32>,
    gy: &Array2<f32>,
    theta: f64,
    tcx: f64,
    tcy: f64,
    cx: f64,
    cy: f64,
) -> Accum {
    let (h, w) = template.dim();
    let (sin, cos) = theta.sin_cos();
    let image = image.view();
    let gx = gx.view();
    let gy = gy.view();

    let row_accum = |row: usize| {
        let mut acc = Accum::default();
        let yc = row as f64 - cy;
        for col in 0..w {
            let xc = col as f64 - cx;
            let x = cos * xc - sin * yc + tcx + cx;
            let y = sin * xc + cos * yc + tcy + cy;
            if !in_footprint(x, y, h, w) {
                continue;
            }
            let i = bilinear(&image, x, y);
            let g_x = bilinear(&gx, x, y);
            let g_y = bilinear(&gy, x, y);
            let j_theta = g_x * (-sin * xc - cos * yc) + g_y * (cos * xc - sin * yc);
            acc.add(template[[row, col]] as f64, i, [j_theta, g_x, g_y]);
        }
        acc
    };

    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        (0..h)
            .into_par_iter()
            .map(row_accum)
            .reduce(Accum::default, Accum::merge)
    } else {
        (0..h).map(row_accum).fold(Accum::default(), Accum::merge)
    }
}

#[inline]
fn bilinear(data: &ArrayView2<'_, f32>, x: f64, y: f64) -> f64 {
    crate::resample::sample_at(data, x, y, crate::resample::Interpolation::Linear)
        .map_or(0.0, f64::from)
}
