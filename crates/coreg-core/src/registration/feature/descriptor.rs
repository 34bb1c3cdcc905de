use ndarray::ArrayView2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::DescriptorKind;
use crate::consts::{DESCRIPTOR_RADIUS, EPSILON, ORB_BITS, ORB_PATTERN_SEED, PATCH_GRID};
use crate::resample::{sample_at, Interpolation};

use super::detector::Keypoint;

pub const ORB_WORDS: usize = ORB_BITS / 64;

/// Descriptors of one image, one entry per keypoint.
#[derive(Clone, Debug, PartialEq)]
pub enum Descriptors {
    /// Packed binary tests.
    Binary(Vec<[u64; ORB_WORDS]>),
    /// Zero-mean, unit-norm sampled patches.
    Patch(Vec<Vec<f32>>),
}

impl Descriptors {
    pub fn len(&self) -> usize {
        match self {
            Self::Binary(d) => d.len(),
            Self::Patch(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Describe every keypoint of `image` with the chosen descriptor.
pub fn describe(
    image: &ArrayView2<'_, f32>,
    keypoints: &[Keypoint],
    kind: DescriptorKind,
) -> Descriptors {
    match kind {
        DescriptorKind::Orb => {
            let pattern = orb_pattern();
            Descriptors::Binary(
                keypoints
                    .iter()
                    .map(|kp| orb_descriptor(image, kp, &pattern))
                    .collect(),
            )
        }
        DescriptorKind::Patch => Descriptors::Patch(
            keypoints
                .iter()
                .map(|kp| patch_descriptor(image, kp))
                .collect(),
        ),
    }
}

type TestPair = ((f64, f64), (f64, f64));

/// Fixed pseudo-random pairs of sample points inside the descriptor disc.
fn orb_pattern() -> Vec<TestPair> {
    let mut rng = ChaCha8Rng::seed_from_u64(ORB_PATTERN_SEED);
    let mut point = || loop {
        let x = rng.random_range(-DESCRIPTOR_RADIUS..=DESCRIPTOR_RADIUS);
        let y = rng.random_range(-DESCRIPTOR_RADIUS..=DESCRIPTOR_RADIUS);
        if x * x + y * y <= DESCRIPTOR_RADIUS * DESCRIPTOR_RADIUS {
            return (x, y);
        }
    };
    (0..ORB_BITS).map(|_| (point(), point())).collect()
}

/// Sample at `(x, y)` with coordinates clamped to the raster.
#[inline]
fn sample_clamped(image: &ArrayView2<'_, f32>, x: f64, y: f64) -> f32 {
    let (h, w) = image.dim();
    let x = x.clamp(0.0, w.saturating_sub(1) as f64);
    let y = y.clamp(0.0, h.saturating_sub(1) as f64);
    sample_at(image, x, y, Interpolation::Linear).unwrap_or(0.0)
}

#[inline]
fn rotate(kp: &Keypoint, (dx, dy): (f64, f64), sin: f64, cos: f64) -> (f64, f64) {
    (kp.x + cos * dx - sin * dy, kp.y + sin * dx + cos * dy)
}

fn orb_descriptor(image: &ArrayView2<'_, f32>, kp: &Keypoint, pattern: &[TestPair]) -> [u64; ORB_WORDS] {
    let (sin, cos) = kp.angle.sin_cos();
    let mut descriptor = [0u64; ORB_WORDS];
    for (bit, &(p1, p2)) in pattern.iter().enumerate() {
        let (x1, y1) = rotate(kp, p1, sin, cos);
        let (x2, y2) = rotate(kp, p2, sin, cos);
        if sample_clamped(image, x1, y1) < sample_clamped(image, x2, y2) {
            descriptor[bit / 64] |= 1 << (bit % 64);
        }
    }
    descriptor
}

fn patch_descriptor(image: &ArrayView2<'_, f32>, kp: &Keypoint) -> Vec<f32> {
    let (sin, cos) = kp.angle.sin_cos();
    let step = 2.0 * DESCRIPTOR_RADIUS / (PATCH_GRID - 1) as f64;
    let mut values = Vec::with_capacity(PATCH_GRID * PATCH_GRID);
    for gy in 0..PATCH_GRID {
        for gx in 0..PATCH_GRID {
            let offset = (
                gx as f64 * step - DESCRIPTOR_RADIUS,
                gy as f64 * step - DESCRIPTOR_RADIUS,
            );
            let (x, y) = rotate(kp, offset, sin, cos);
            values.push(sample_clamped(image, x, y));
        }
    }

    let mean = values.iter().sum::<f32>() / values.len() as f32;
    for v in &mut values {
        *v -= mean;
    }
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if (norm as f64) > EPSILON {
        for v in &mut values {
            *v /= norm;
        }
    }
    values
}

#[inline]
pub fn hamming_distance(a: &[u64; ORB_WORDS], b: &[u64; ORB_WORDS]) -> u32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x ^ y).count_ones()).sum()
}

#[inline]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn textured() -> Array2<f32> {
        Array2::from_shape_fn((64, 64), |(r, c)| {
            ((r as f32 * 0.37).sin() + (c as f32 * 0.23).cos() + ((r * c) as f32 * 0.011).sin())
                * 0.25
                + 0.5
        })
    }

    #[test]
    fn pattern_is_deterministic_and_inside_disc() {
        let a = orb_pattern();
        let b = orb_pattern();
        assert_eq!(a, b);
        assert_eq!(a.len(), ORB_BITS);
        let r2 = DESCRIPTOR_RADIUS * DESCRIPTOR_RADIUS;
        assert!(a
            .iter()
            .all(|&((x1, y1), (x2, y2))| x1 * x1 + y1 * y1 <= r2 && x2 * x2 + y2 * y2 <= r2));
    }

    #[test]
    fn identical_keypoints_have_identical_descriptors() {
        let image = textured();
        let kp = Keypoint {
            x: 30.0,
            y: 31.0,
            response: 1.0,
            angle: 0.4,
        };
        let Descriptors::Binary(d) = describe(&image.view(), &[kp, kp], DescriptorKind::Orb) else {
            panic!("expected binary descriptors");
        };
        assert_eq!(hamming_distance(&d[0], &d[1]), 0);
    }

    #[test]
    fn patch_descriptor_is_normalized() {
        let image = textured();
        let kp = Keypoint {
            x: 32.0,
            y: 32.0,
            response: 1.0,
            angle: 0.0,
        };
        let Descriptors::Patch(d) = describe(&image.view(), &[kp], DescriptorKind::Patch) else {
            panic!("expected patch descriptors");
        };
        let norm: f32 = d[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        let mean: f32 = d[0].iter().sum::<f32>() / d[0].len() as f32;
        assert!((norm - 1.0).abs() < 1e-4, "norm={norm}");
        assert!(mean.abs() < 1e-5, "mean={mean}");
    }
}
