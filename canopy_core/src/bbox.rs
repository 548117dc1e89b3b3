//! Axis-aligned bounding boxes.

use crate::affine::Affine3;
use crate::types::Vec3;

/// Axis-aligned 3D bounding box.
///
/// The canonical empty box has `min = +inf`, `max = -inf` on each axis, so
/// expansion and union work componentwise without special cases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb {
    /// Create an empty (inverted) box.
    #[inline]
    pub const fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    /// Create a box from min/max corners.
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Expand this box to include a point.
    #[inline]
    pub fn expand(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Union of two boxes.
    #[inline]
    pub fn union(&self, other: &Aabb) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Center of the box.
    #[inline]
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Extents of the box (`max - min`).
    #[inline]
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Half surface area (`xy + yz + zx`), the SAH integrand.
    ///
    /// Returns zero for inverted boxes.
    #[inline]
    pub fn half_area(&self) -> f32 {
        let d = self.extent();
        if d.x < 0.0 || d.y < 0.0 || d.z < 0.0 {
            0.0
        } else {
            d.x * d.y + d.y * d.z + d.z * d.x
        }
    }

    /// Longest axis of the box (0 = x, 1 = y, 2 = z).
    #[inline]
    pub fn longest_axis(&self) -> usize {
        let d = self.extent();
        if d.x >= d.y && d.x >= d.z {
            0
        } else if d.y >= d.z {
            1
        } else {
            2
        }
    }

    /// True if the two boxes intersect on every axis.
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        if self.max.x < other.min.x || self.min.x > other.max.x {
            return false;
        }
        if self.max.y < other.min.y || self.min.y > other.max.y {
            return false;
        }
        if self.max.z < other.min.z || self.min.z > other.max.z {
            return false;
        }
        true
    }

    /// Squared distance from a point to the box (zero inside).
    #[inline]
    pub fn distance_squared(&self, p: Vec3) -> f32 {
        let mut dd = 0.0;
        for axis in 0..3 {
            let v = p.axis(axis);
            let lo = self.min.axis(axis);
            let hi = self.max.axis(axis);
            if v < lo {
                dd += (lo - v) * (lo - v);
            }
            if v > hi {
                dd += (v - hi) * (v - hi);
            }
        }
        dd
    }

    /// True if the box is non-inverted (`min <= max` on every axis).
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Transform the box by an affine map.
    ///
    /// The eight corners are transformed and re-boxed, a conservative
    /// envelope under rotation. Empty boxes stay empty.
    pub fn transformed(&self, xf: &Affine3) -> Self {
        if !self.is_valid() {
            return Self::empty();
        }
        let corners = [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ];
        let mut out = Self::empty();
        for corner in corners {
            out.expand(xf.transform_point(corner));
        }
        out
    }
}

impl Default for Aabb {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}
