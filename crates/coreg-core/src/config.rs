use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{CoregError, Result};
use crate::frame::LayerKind;
use crate::resample::{Border, Interpolation};
use crate::transform::TransformFamily;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Peaks below this value are reported as low confidence.
    pub min_confidence: f64,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CORRELATION_CONFIDENCE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntensityConfig {
    /// Iteration cap per pyramid level; reaching it is not a failure.
    pub max_iterations: usize,
    /// Stop once the parameter update moves no pixel by more than this.
    pub convergence_epsilon: f64,
    /// Pre-blur applied to both images; 0 disables it.
    pub gaussian_sigma: f32,
    /// Number of 2x downsampled levels above full resolution.
    pub pyramid_levels: usize,
    /// Consecutive worsening iterations tolerated before giving up.
    pub divergence_patience: usize,
}

impl Default for IntensityConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_ECC_MAX_ITERATIONS,
            convergence_epsilon: DEFAULT_ECC_EPSILON,
            gaussian_sigma: DEFAULT_ECC_GAUSSIAN_SIGMA,
            pyramid_levels: DEFAULT_ECC_PYRAMID_LEVELS,
            divergence_patience: DEFAULT_ECC_DIVERGENCE_PATIENCE,
        }
    }
}

/// Descriptor computed around each keypoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    /// Rotated binary intensity tests, compared by Hamming distance.
    Orb,
    /// Oriented, normalized intensity patch, compared by Euclidean distance.
    Patch,
}

impl FromStr for DescriptorKind {
    type Err = CoregError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "orb" => Ok(Self::Orb),
            "patch" => Ok(Self::Patch),
            other => Err(CoregError::InvalidConfig(format!(
                "unknown descriptor type '{other}' (expected 'orb' or 'patch')"
            ))),
        }
    }
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Orb => write!(f, "orb"),
            Self::Patch => write!(f, "patch"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// One of Euler, Affine or Homography.
    pub transform_family: TransformFamily,
    /// `"orb"` or `"patch"`.
    pub descriptor_type: String,
    /// Maximum reprojection error in pixels for a RANSAC inlier.
    pub ransac_threshold: f64,
    /// RANSAC trials.
    pub max_iterations: usize,
    pub max_keypoints: usize,
    /// Lowe ratio between best and second-best descriptor distance.
    pub ratio_test: f64,
    pub seed: u64,
    /// Minimum inliers / matches for the estimate to be trusted.
    pub min_inlier_ratio: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            transform_family: TransformFamily::Euler,
            descriptor_type: "orb".to_string(),
            ransac_threshold: DEFAULT_RANSAC_THRESHOLD,
            max_iterations: DEFAULT_RANSAC_ITERATIONS,
            max_keypoints: DEFAULT_MAX_KEYPOINTS,
            ratio_test: DEFAULT_RATIO_TEST,
            seed: DEFAULT_RANSAC_SEED,
            min_inlier_ratio: DEFAULT_MIN_INLIER_RATIO,
        }
    }
}

impl FeatureConfig {
    pub fn descriptor(&self) -> Result<DescriptorKind> {
        self.descriptor_type.parse()
    }
}

/// Registration algorithm and its parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RegistrationMethod {
    Correlation(CorrelationConfig),
    Intensity(IntensityConfig),
    Feature(FeatureConfig),
}

impl Default for RegistrationMethod {
    fn default() -> Self {
        Self::Correlation(CorrelationConfig::default())
    }
}

impl fmt::Display for RegistrationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Correlation(_) => write!(f, "Phase Correlation"),
            Self::Intensity(c) => write!(f, "ECC ({} levels)", c.pyramid_levels + 1),
            Self::Feature(c) => write!(
                f,
                "Feature ({}, {})",
                c.transform_family, c.descriptor_type
            ),
        }
    }
}

impl RegistrationMethod {
    /// Family of the transform this method produces.
    pub fn family(&self) -> TransformFamily {
        match self {
            Self::Correlation(_) => TransformFamily::Translation,
            Self::Intensity(_) => TransformFamily::Euler,
            Self::Feature(c) => c.transform_family,
        }
    }
}

/// Bounds an estimate must satisfy before it is applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlausibilityConfig {
    pub max_rotation_deg: f64,
    /// Bounds on the singular values of the linear part.
    pub min_scale: f64,
    pub max_scale: f64,
    /// Maximum translation magnitude in pixels; unbounded when unset.
    pub max_translation: Option<f64>,
    /// Maximum magnitude of either perspective coefficient.
    pub max_perspective: f64,
    pub allow_reflection: bool,
}

impl Default for PlausibilityConfig {
    fn default() -> Self {
        Self {
            max_rotation_deg: DEFAULT_MAX_ROTATION_DEG,
            min_scale: DEFAULT_MIN_SCALE,
            max_scale: DEFAULT_MAX_SCALE,
            max_translation: None,
            max_perspective: DEFAULT_MAX_PERSPECTIVE,
            allow_reflection: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    pub reference_index: usize,
    /// Layer used to estimate transforms.
    pub layer: String,
    /// Channel of `layer` used to estimate transforms.
    pub channel: usize,
    /// Kernel for continuous layers.
    pub interpolation: Interpolation,
    /// Label written where categorical layers map out of bounds.
    pub categorical_fill: f32,
    pub border: Border,
    /// Kind of every layer in the stack.
    pub layers: BTreeMap<String, LayerKind>,
    pub algorithm: RegistrationMethod,
    pub plausibility: PlausibilityConfig,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        let mut layers = BTreeMap::new();
        layers.insert("image".to_string(), LayerKind::Continuous);
        Self {
            reference_index: 0,
            layer: "image".to_string(),
            channel: 0,
            interpolation: Interpolation::default(),
            categorical_fill: 0.0,
            border: Border::default(),
            layers,
            algorithm: RegistrationMethod::default(),
            plausibility: PlausibilityConfig::default(),
        }
    }
}

impl AlignmentConfig {
    pub fn with_algorithm(mut self, algorithm: RegistrationMethod) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_layer_kind(mut self, name: impl Into<String>, kind: LayerKind) -> Self {
        self.layers.insert(name.into(), kind);
        self
    }

    /// Check parameter ranges that do not depend on the stack.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(CoregError::InvalidConfig(msg));

        match &self.algorithm {
            RegistrationMethod::Correlation(c) => {
                if !(0.0..=1.0).contains(&c.min_confidence) {
                    return invalid(format!(
                        "min_confidence must be in [0, 1], got {}",
                        c.min_confidence
                    ));
                }
            }
            RegistrationMethod::Intensity(c) => {
                if c.max_iterations == 0 {
                    return invalid("max_iterations must be at least 1".into());
                }
                if !(c.convergence_epsilon > 0.0) {
                    return invalid(format!(
                        "convergence_epsilon must be positive, got {}",
                        c.convergence_epsilon
                    ));
                }
                if c.gaussian_sigma < 0.0 {
                    return invalid(format!(
                        "gaussian_sigma must be non-negative, got {}",
                        c.gaussian_sigma
                    ));
                }
            }
            RegistrationMethod::Feature(c) => {
                if !matches!(
                    c.transform_family,
                    TransformFamily::Euler | TransformFamily::Affine | TransformFamily::Homography
                ) {
                    return invalid(format!(
                        "feature registration cannot fit a {} transform",
                        c.transform_family
                    ));
                }
                c.descriptor()?;
                if !(c.ransac_threshold > 0.0) {
                    return invalid(format!(
                        "ransac_threshold must be positive, got {}",
                        c.ransac_threshold
                    ));
                }
                if c.max_iterations == 0 {
                    return invalid("max_iterations must be at least 1".into());
                }
                if !(c.ratio_test > 0.0 && c.ratio_test <= 1.0) {
                    return invalid(format!(
                        "ratio_test must be in (0, 1], got {}",
                        c.ratio_test
                    ));
                }
                if !(0.0..=1.0).contains(&c.min_inlier_ratio) {
                    return invalid(format!(
                        "min_inlier_ratio must be in [0, 1], got {}",
                        c.min_inlier_ratio
                    ));
                }
            }
        }

        let p = &self.plausibility;
        if !(p.min_scale > 0.0 && p.min_scale <= p.max_scale) {
            return invalid(format!(
                "scale bounds must satisfy 0 < min_scale <= max_scale, got [{}, {}]",
                p.min_scale, p.max_scale
            ));
        }
        if p.max_rotation_deg < 0.0 || p.max_perspective < 0.0 {
            return invalid("plausibility bounds must be non-negative".into());
        }
        Ok(())
    }
}
