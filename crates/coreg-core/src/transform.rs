//! Planar geometric transforms in homogeneous coordinates.
//!
//! A [`TransformModel`] is a 3x3 matrix acting on column vectors `(x, y, 1)`,
//! where `x` is the column and `y` the row of a pixel centre. The family tag
//! records how many degrees of freedom produced the matrix and is used by
//! estimation and plausibility checks.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::{EPSILON, SINGULAR_DETERMINANT};
use crate::error::{CoregError, Result};

/// Transform families ordered by increasing generality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TransformFamily {
    Identity,
    /// dx, dy
    Translation,
    /// dx, dy, rotation
    Euler,
    /// Full 2x3 linear + translation
    Affine,
    /// Projective, normalized so that `h22 = 1`
    Homography,
}

impl TransformFamily {
    pub fn degrees_of_freedom(self) -> usize {
        match self {
            Self::Identity => 0,
            Self::Translation => 2,
            Self::Euler => 3,
            Self::Affine => 6,
            Self::Homography => 8,
        }
    }

    /// Minimum number of point correspondences that determine the family.
    pub fn min_points(self) -> usize {
        match self {
            Self::Identity => 0,
            Self::Translation => 1,
            Self::Euler => 2,
            Self::Affine => 3,
            Self::Homography => 4,
        }
    }
}

impl fmt::Display for TransformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => write!(f, "Identity"),
            Self::Translation => write!(f, "Translation"),
            Self::Euler => write!(f, "Euler"),
            Self::Affine => write!(f, "Affine"),
            Self::Homography => write!(f, "Homography"),
        }
    }
}

/// Immutable 3x3 homogeneous planar transform.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransformModel {
    matrix: [[f64; 3]; 3],
    family: TransformFamily,
}

impl Default for TransformModel {
    fn default() -> Self {
        Self::identity()
    }
}

impl TransformModel {
    pub fn identity() -> Self {
        Self {
            matrix: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            family: TransformFamily::Identity,
        }
    }

    pub fn translation(dx: f64, dy: f64) -> Self {
        Self {
            matrix: [[1.0, 0.0, dx], [0.0, 1.0, dy], [0.0, 0.0, 1.0]],
            family: TransformFamily::Translation,
        }
    }

    /// Rotation by `theta` radians about the origin, followed by `(dx, dy)`.
    pub fn euler(dx: f64, dy: f64, theta: f64) -> Self {
        let (sin, cos) = theta.sin_cos();
        Self {
            matrix: [[cos, -sin, dx], [sin, cos, dy], [0.0, 0.0, 1.0]],
            family: TransformFamily::Euler,
        }
    }

    /// Rotation by `theta` radians about `(cx, cy)`, followed by `(dx, dy)`.
    pub fn euler_about(cx: f64, cy: f64, dx: f64, dy: f64, theta: f64) -> Self {
        let (sin, cos) = theta.sin_cos();
        let tx = cx - (cos * cx - sin * cy) + dx;
        let ty = cy - (sin * cx + cos * cy) + dy;
        Self::euler(tx, ty, theta)
    }

    /// Affine transform from `[a, b, tx, c, d, ty]` (row-major top two rows).
    pub fn affine(params: [f64; 6]) -> Self {
        Self {
            matrix: [
                [params[0], params[1], params[2]],
                [params[3], params[4], params[5]],
                [0.0, 0.0, 1.0],
            ],
            family: TransformFamily::Affine,
        }
    }

    /// Homography from its first eight row-major coefficients; `h22 = 1`.
    pub fn homography(params: [f64; 8]) -> Self {
        Self {
            matrix: [
                [params[0], params[1], params[2]],
                [params[3], params[4], params[5]],
                [params[6], params[7], 1.0],
            ],
            family: TransformFamily::Homography,
        }
    }

    /// Wrap a raw matrix. Homographies are rescaled so that `h22 = 1` when
    /// that element is non-zero.
    pub fn from_matrix(matrix: [[f64; 3]; 3], family: TransformFamily) -> Self {
        let mut model = Self { matrix, family };
        model.normalize();
        model
    }

    fn normalize(&mut self) {
        if self.family != TransformFamily::Homography {
            return;
        }
        let scale = self.matrix[2][2];
        if scale.abs() > EPSILON && scale != 1.0 {
            for row in &mut self.matrix {
                for v in row.iter_mut() {
                    *v /= scale;
                }
            }
        }
    }

    pub fn matrix(&self) -> &[[f64; 3]; 3] {
        &self.matrix
    }

    pub fn family(&self) -> TransformFamily {
        self.family
    }

    /// Matrix product `self * other`: `other` is applied first.
    pub fn compose(&self, other: &TransformModel) -> TransformModel {
        let a = &self.matrix;
        let b = &other.matrix;
        let mut m = [[0.0; 3]; 3];
        for (r, row) in m.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = a[r][0] * b[0][c] + a[r][1] * b[1][c] + a[r][2] * b[2][c];
            }
        }
        Self::from_matrix(m, self.family.max(other.family))
    }

    pub fn determinant(&self) -> f64 {
        let m = &self.matrix;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Inverse transform, or [`CoregError::SingularTransform`] when the
    /// determinant is below numerical tolerance.
    pub fn invert(&self) -> Result<TransformModel> {
        let det = self.determinant();
        if !det.is_finite() || det.abs() < SINGULAR_DETERMINANT {
            return Err(CoregError::SingularTransform { determinant: det });
        }
        let m = &self.matrix;
        let inv_det = 1.0 / det;
        let inv = [
            [
                (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det,
                (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
                (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
            ],
            [
                (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det,
                (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
                (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
            ],
            [
                (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det,
                (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
                (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
            ],
        ];
        Ok(Self::from_matrix(inv, self.family))
    }

    /// Map a point. The result is non-finite when the point is sent to
    /// infinity by a projective transform.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let m = &self.matrix;
        let xp = m[0][0] * x + m[0][1] * y + m[0][2];
        let yp = m[1][0] * x + m[1][1] * y + m[1][2];
        let w = m[2][0] * x + m[2][1] * y + m[2][2];
        if w == 1.0 {
            (xp, yp)
        } else {
            (xp / w, yp / w)
        }
    }

    pub fn translation_components(&self) -> (f64, f64) {
        (self.matrix[0][2], self.matrix[1][2])
    }

    /// Rotation angle in radians of the closest rotation to the linear part.
    pub fn rotation(&self) -> f64 {
        let m = &self.matrix;
        (m[1][0] - m[0][1]).atan2(m[0][0] + m[1][1])
    }

    /// Determinant of the 2x2 linear part; negative means a reflection.
    pub fn linear_determinant(&self) -> f64 {
        let m = &self.matrix;
        m[0][0] * m[1][1] - m[0][1] * m[1][0]
    }

    /// Singular values `(largest, smallest)` of the 2x2 linear part.
    pub fn singular_values(&self) -> (f64, f64) {
        let m = &self.matrix;
        let e = m[0][0].powi(2) + m[0][1].powi(2) + m[1][0].powi(2) + m[1][1].powi(2);
        let det = self.linear_determinant();
        let disc = (e * e - 4.0 * det * det).max(0.0).sqrt();
        (((e + disc) / 2.0).sqrt(), ((e - disc) / 2.0).max(0.0).sqrt())
    }

    /// Mean isotropic scale, `sqrt(|det|)` of the linear part.
    pub fn scale(&self) -> f64 {
        self.linear_determinant().abs().sqrt()
    }

    /// Perspective coefficients `(h20, h21)`; zero for affine families.
    pub fn perspective(&self) -> (f64, f64) {
        (self.matrix[2][0], self.matrix[2][1])
    }

    /// Element-wise comparison of the matrices, ignoring the family tag.
    pub fn approx_eq(&self, other: &TransformModel, tolerance: f64) -> bool {
        self.matrix
            .iter()
            .flatten()
            .zip(other.matrix.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }

    pub fn is_identity(&self, tolerance: f64) -> bool {
        self.approx_eq(&Self::identity(), tolerance)
    }
}

impl fmt::Display for TransformModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (dx, dy) = self.translation_components();
        let rot = self.rotation().to_degrees();
        match self.family {
            TransformFamily::Identity => write!(f, "Identity"),
            TransformFamily::Translation => write!(f, "Translation(dx={dx:.2}, dy={dy:.2})"),
            TransformFamily::Euler => {
                write!(f, "Euler(dx={dx:.2}, dy={dy:.2}, rot={rot:.3}°)")
            }
            TransformFamily::Affine | TransformFamily::Homography => write!(
                f,
                "{}(dx={dx:.2}, dy={dy:.2}, rot={rot:.3}°, scale={:.4})",
                self.family,
                self.scale()
            ),
        }
    }
}
