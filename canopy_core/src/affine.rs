//! Affine transforms over 3D points and vectors.
//!
//! A transform is a 3x3 linear map plus a translation. Only invertible
//! linear parts are supported; `inverse` returns `None` for singular maps
//! so callers can reject them up front.

use crate::types::Vec3;

/// A 3x3 matrix stored as columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3 {
    /// Matrix columns.
    pub cols: [Vec3; 3],
}

impl Mat3 {
    /// The identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ],
    };

    /// Create a matrix from three columns.
    #[inline]
    pub const fn from_cols(c0: Vec3, c1: Vec3, c2: Vec3) -> Self {
        Self { cols: [c0, c1, c2] }
    }

    /// Create a diagonal (scaling) matrix.
    #[inline]
    pub const fn from_diagonal(d: Vec3) -> Self {
        Self {
            cols: [
                Vec3::new(d.x, 0.0, 0.0),
                Vec3::new(0.0, d.y, 0.0),
                Vec3::new(0.0, 0.0, d.z),
            ],
        }
    }

    /// Rotation about the z axis by `angle` radians.
    pub fn rotation_z(angle: f32) -> Self {
        let (sin, cos) = (libm::sinf(angle), libm::cosf(angle));
        Self::from_cols(
            Vec3::new(cos, sin, 0.0),
            Vec3::new(-sin, cos, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        )
    }

    /// Transform a vector.
    #[inline]
    pub fn mul_vec3(&self, v: Vec3) -> Vec3 {
        self.cols[0] * v.x + self.cols[1] * v.y + self.cols[2] * v.z
    }

    /// Matrix determinant.
    #[inline]
    pub fn determinant(&self) -> f32 {
        self.cols[0].dot(self.cols[1].cross(self.cols[2]))
    }

    /// Transposed matrix.
    pub fn transpose(&self) -> Self {
        let [c0, c1, c2] = self.cols;
        Self::from_cols(
            Vec3::new(c0.x, c1.x, c2.x),
            Vec3::new(c0.y, c1.y, c2.y),
            Vec3::new(c0.z, c1.z, c2.z),
        )
    }

    /// Matrix inverse, or `None` if the matrix is singular.
    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det == 0.0 {
            return None;
        }
        let inv_det = 1.0 / det;
        // rows of the inverse via the adjugate
        let r0 = self.cols[1].cross(self.cols[2]) * inv_det;
        let r1 = self.cols[2].cross(self.cols[0]) * inv_det;
        let r2 = self.cols[0].cross(self.cols[1]) * inv_det;
        Some(Self::from_cols(
            Vec3::new(r0.x, r1.x, r2.x),
            Vec3::new(r0.y, r1.y, r2.y),
            Vec3::new(r0.z, r1.z, r2.z),
        ))
    }
}

impl Default for Mat3 {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// An affine transform: linear part plus translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine3 {
    /// Linear part (rotation, scale, shear).
    pub linear: Mat3,
    /// Translation applied after the linear part.
    pub translation: Vec3,
}

impl Affine3 {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        linear: Mat3::IDENTITY,
        translation: Vec3::ZERO,
    };

    /// Create a transform from a linear part and a translation.
    #[inline]
    pub const fn new(linear: Mat3, translation: Vec3) -> Self {
        Self {
            linear,
            translation,
        }
    }

    /// A pure translation.
    #[inline]
    pub const fn from_translation(translation: Vec3) -> Self {
        Self {
            linear: Mat3::IDENTITY,
            translation,
        }
    }

    /// Transform a point (linear part plus translation).
    #[inline]
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.linear.mul_vec3(p) + self.translation
    }

    /// Transform a direction (linear part only).
    #[inline]
    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        self.linear.mul_vec3(v)
    }

    /// Inverse transform, or `None` if the linear part is singular.
    pub fn inverse(&self) -> Option<Self> {
        let inv = self.linear.inverse()?;
        Some(Self {
            linear: inv,
            translation: -inv.mul_vec3(self.translation),
        })
    }
}

impl Default for Affine3 {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}
