//! Keypoint-based registration: corners, descriptors, ratio-test matching
//! and RANSAC model fitting.

pub mod descriptor;
pub mod detector;
pub mod matching;
pub mod ransac;

use ndarray::ArrayView2;
use tracing::trace;

use crate::config::FeatureConfig;
use crate::consts::DESCRIPTOR_BLUR_SIGMA;
use crate::error::{CoregError, EstimateFailure, Result};
use crate::filters::gaussian_blur::gaussian_blur_array;
use crate::transform::TransformFamily;

use self::descriptor::describe;
use self::detector::detect_keypoints;
use self::matching::match_descriptors;
use self::ransac::{fit_ransac, Point, RansacParams};

use super::{Diagnostics, Estimation, RegistrationEstimate};

/// Estimate the `config.transform_family` transform mapping `target` onto
/// `reference`.
///
/// An unknown descriptor type or unsupported family is fatal. Too few
/// matches or inliers (fewer than the family's degrees of freedom, or an
/// inlier ratio below `min_inlier_ratio`) is reported as
/// [`EstimateFailure::InsufficientMatches`].
pub fn estimate_features(
    reference: &ArrayView2<'_, f32>,
    target: &ArrayView2<'_, f32>,
    config: &FeatureConfig,
) -> Result<Estimation> {
    let kind = config.descriptor()?;
    let family = config.transform_family;
    if !matches!(
        family,
        TransformFamily::Euler | TransformFamily::Affine | TransformFamily::Homography
    ) {
        return Err(CoregError::InvalidConfig(format!(
            "feature registration cannot fit a {family} transform"
        )));
    }
    let required = family.degrees_of_freedom();

    let ref_smooth = gaussian_blur_array(reference, DESCRIPTOR_BLUR_SIGMA);
    let tgt_smooth = gaussian_blur_array(target, DESCRIPTOR_BLUR_SIGMA);

    let (ref_kp, tgt_kp) = rayon::join(
        || detect_keypoints(&ref_smooth.view(), config.max_keypoints),
        || detect_keypoints(&tgt_smooth.view(), config.max_keypoints),
    );
    let ref_desc = describe(&ref_smooth.view(), &ref_kp, kind);
    let tgt_desc = describe(&tgt_smooth.view(), &tgt_kp, kind);

    let matches = match_descriptors(&tgt_desc, &ref_desc, config.ratio_test);
    trace!(
        reference_keypoints = ref_kp.len(),
        target_keypoints = tgt_kp.len(),
        matches = matches.len(),
        "descriptor matching"
    );
    if matches.len() < required {
        return Ok(Err(EstimateFailure::InsufficientMatches {
            found: matches.len(),
            required,
        }));
    }

    let src: Vec<Point> = matches
        .iter()
        .map(|m| (tgt_kp[m.query].x, tgt_kp[m.query].y))
        .collect();
    let dst: Vec<Point> = matches
        .iter()
        .map(|m| (ref_kp[m.train].x, ref_kp[m.train].y))
        .collect();

    let params = RansacParams {
        threshold: config.ransac_threshold,
        max_iterations: config.max_iterations,
        seed: config.seed,
    };
    let Some(fit) = fit_ransac(&src, &dst, family, &params) else {
        return Ok(Err(EstimateFailure::InsufficientMatches { found: 0, required }));
    };

    let inliers = fit.inliers.len();
    let min_by_ratio = (config.min_inlier_ratio * matches.len() as f64).ceil() as usize;
    let needed = required.max(min_by_ratio);
    if inliers < needed {
        return Ok(Err(EstimateFailure::InsufficientMatches {
            found: inliers,
            required: needed,
        }));
    }

    Ok(Ok(RegistrationEstimate {
        transform: fit.transform,
        confidence: inliers as f64 / matches.len() as f64,
        diagnostics: Diagnostics {
            iterations: Some(fit.iterations),
            matches: Some(matches.len()),
            inliers: Some(inliers),
        },
    }))
}
