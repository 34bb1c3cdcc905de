/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Minimum frame count to use frame-level Rayon parallelism.
pub const PARALLEL_FRAME_THRESHOLD: usize = 4;

/// Small epsilon to avoid division by zero in floating-point comparisons.
pub const EPSILON: f64 = 1e-10;

/// Absolute determinant below which a transform is treated as singular.
pub const SINGULAR_DETERMINANT: f64 = 1e-12;

/// Pixel variance below which an image is considered textureless.
pub const TEXTURELESS_VARIANCE: f64 = 1e-10;

/// Default minimum phase-correlation peak for a translation to be trusted.
pub const DEFAULT_MIN_CORRELATION_CONFIDENCE: f64 = 0.1;

/// Default ECC iteration cap per pyramid level.
pub const DEFAULT_ECC_MAX_ITERATIONS: usize = 200;

/// Default ECC termination threshold on the parameter update, in pixels.
pub const DEFAULT_ECC_EPSILON: f64 = 1e-4;

/// Default Gaussian pre-smoothing sigma for ECC.
pub const DEFAULT_ECC_GAUSSIAN_SIGMA: f32 = 1.0;

/// Default number of downsampled pyramid levels for ECC.
pub const DEFAULT_ECC_PYRAMID_LEVELS: usize = 2;

/// Consecutive worsening iterations tolerated before ECC is declared divergent.
pub const DEFAULT_ECC_DIVERGENCE_PATIENCE: usize = 5;

/// Correlation drop that counts as a worsening ECC iteration.
pub const ECC_DIVERGENCE_TOLERANCE: f64 = 1e-6;

/// Minimum fraction of reference pixels that must map inside the target
/// during an ECC iteration.
pub const ECC_MIN_OVERLAP: f64 = 0.25;

/// Gaussian blur sigma used for building pyramids.
pub const PYRAMID_BLUR_SIGMA: f32 = 1.0;

/// Smallest pyramid level dimension worth registering.
pub const MIN_PYRAMID_SIZE: usize = 16;

/// Default RANSAC inlier reprojection threshold in pixels.
pub const DEFAULT_RANSAC_THRESHOLD: f64 = 2.0;

/// Default number of RANSAC trials.
pub const DEFAULT_RANSAC_ITERATIONS: usize = 1000;

/// Default RANSAC seed; sampling is deterministic for a given seed.
pub const DEFAULT_RANSAC_SEED: u64 = 0x5EED_C0DE;

/// Default cap on detected keypoints per image.
pub const DEFAULT_MAX_KEYPOINTS: usize = 500;

/// Default Lowe ratio for descriptor matching.
pub const DEFAULT_RATIO_TEST: f64 = 0.8;

/// Default minimum fraction of matches that must be RANSAC inliers.
pub const DEFAULT_MIN_INLIER_RATIO: f64 = 0.2;

/// Corner response relative to the strongest corner below which keypoints are dropped.
pub const CORNER_QUALITY_LEVEL: f64 = 0.01;

/// Minimum distance in pixels between two accepted keypoints.
pub const CORNER_MIN_DISTANCE: f64 = 5.0;

/// Gaussian sigma of the structure-tensor integration window.
pub const CORNER_WINDOW_SIGMA: f32 = 1.5;

/// Radius of the intensity-centroid patch used for keypoint orientation.
pub const ORIENTATION_RADIUS: i64 = 7;

/// Half-size of the square region sampled by descriptors.
pub const DESCRIPTOR_RADIUS: f64 = 12.0;

/// Number of binary tests in an ORB descriptor (256 bits).
pub const ORB_BITS: usize = 256;

/// Fixed seed for the ORB sampling pattern, so descriptors are reproducible.
pub const ORB_PATTERN_SEED: u64 = 0x0B0B_1E55;

/// Side length of the sampling grid of a patch descriptor.
pub const PATCH_GRID: usize = 8;

/// Gaussian sigma applied before descriptor extraction.
pub const DESCRIPTOR_BLUR_SIGMA: f32 = 1.2;

/// Default plausibility bound on rotation, in degrees.
pub const DEFAULT_MAX_ROTATION_DEG: f64 = 45.0;

/// Default plausibility lower bound on scale.
pub const DEFAULT_MIN_SCALE: f64 = 0.5;

/// Default plausibility upper bound on scale.
pub const DEFAULT_MAX_SCALE: f64 = 2.0;

/// Default plausibility bound on the homography perspective terms.
pub const DEFAULT_MAX_PERSPECTIVE: f64 = 1e-3;
