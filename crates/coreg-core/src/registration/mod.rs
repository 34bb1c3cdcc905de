//! Pairwise registration: estimate the transform that maps a target raster
//! onto a reference raster.

pub mod correlation;
pub mod feature;
pub mod intensity;
pub mod plausibility;
mod pyramid;
mod subpixel;

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::config::RegistrationMethod;
use crate::error::{CoregError, EstimateFailure, Result};
use crate::transform::TransformModel;

/// Algorithm-specific counters reported with an estimate.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Iterations used (ECC: summed over pyramid levels; RANSAC: trials).
    pub iterations: Option<usize>,
    /// Descriptor matches surviving the ratio test.
    pub matches: Option<usize>,
    pub inliers: Option<usize>,
}

/// A transform mapping target pixel coordinates onto the reference grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegistrationEstimate {
    pub transform: TransformModel,
    /// Correlation peak, ECC coefficient or inlier ratio, in `[0, 1]`.
    pub confidence: f64,
    pub diagnostics: Diagnostics,
}

/// Per-frame outcome: either an estimate or the reason none was trusted.
pub type Estimation = std::result::Result<RegistrationEstimate, EstimateFailure>;

impl RegistrationMethod {
    /// Estimate the transform mapping `target` onto `reference`.
    ///
    /// The outer `Result` carries fatal errors (shape mismatch, invalid
    /// configuration); the inner one carries recoverable estimation
    /// failures.
    pub fn estimate(
        &self,
        reference: &ArrayView2<'_, f32>,
        target: &ArrayView2<'_, f32>,
    ) -> Result<Estimation> {
        check_shape("registration target", reference.dim(), target.dim())?;
        match self {
            Self::Correlation(config) => Ok(correlation::estimate_translation(
                reference, target, config,
            )),
            Self::Intensity(config) => Ok(intensity::estimate_euler(reference, target, config)),
            Self::Feature(config) => feature::estimate_features(reference, target, config),
        }
    }
}

pub(crate) fn check_shape(
    context: &str,
    expected: (usize, usize),
    actual: (usize, usize),
) -> Result<()> {
    if expected != actual {
        return Err(CoregError::ShapeMismatch {
            context: context.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Mean and population variance, accumulated in f64.
pub(crate) fn mean_variance(data: &ArrayView2<'_, f32>) -> (f64, f64) {
    let n = data.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let (sum, sum_sq) = data.iter().fold((0.0f64, 0.0f64), |(s, s2), &v| {
        let v = v as f64;
        (s + v, s2 + v * v)
    });
    let mean = sum / n as f64;
    (mean, (sum_sq / n as f64 - mean * mean).max(0.0))
}
