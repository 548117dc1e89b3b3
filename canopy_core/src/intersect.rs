//! Element-wise ray intersection kernels.
//!
//! Each kernel reports a hit as `Some((t, uv))` with the ray parameter and
//! element-local coordinates, or `None`. Nothing is written on a miss.
//! Degenerate configurations (parallel ray, zero determinant) reject
//! exactly, with no epsilon widening.

use crate::bbox::Aabb;
use crate::types::{ElemUv, Ray3, Vec3};

/// Intersect a ray with a fat point of radius `r`.
///
/// Finds the parameter of the closest approach between the ray and the
/// point and accepts when the approach distance is within the radius.
/// The reported `t` is the closest-approach parameter, not a sphere
/// surface parameter. Coordinates are `(0, 0)`.
#[inline]
pub fn ray_point(ray: &Ray3, p: Vec3, r: f32) -> Option<(f32, ElemUv)> {
    // parameter of the point on the ray line nearest to p
    let w = p - ray.origin;
    let t = w.dot(ray.dir) / ray.dir.dot(ray.dir);

    if t < ray.tmin || t > ray.tmax {
        return None;
    }

    let rp = ray.at(t);
    let prp = p - rp;
    if prp.dot(prp) > r * r {
        return None;
    }

    Some((t, ElemUv::new(0.0, 0.0)))
}

/// Intersect a ray with a tapered line segment.
///
/// Solves the 2x2 system for the closest points between the ray line and
/// the segment line, clamps the segment parameter to `[0, 1]`, and accepts
/// when the gap is within the radius interpolated at that parameter.
/// `u` is the segment parameter, `v` is zero.
#[inline]
pub fn ray_line(
    ray: &Ray3,
    v0: Vec3,
    v1: Vec3,
    r0: f32,
    r1: f32,
) -> Option<(f32, ElemUv)> {
    let u = ray.dir;
    let v = v1 - v0;
    let w = ray.origin - v0;

    let a = u.dot(u);
    let b = u.dot(v);
    let c = v.dot(v);
    let d = u.dot(w);
    let e = v.dot(w);
    let det = a * c - b * b;

    // parallel (or degenerate) lines
    if det == 0.0 {
        return None;
    }

    let t = (b * e - c * d) / det;
    let s = ((a * e - b * d) / det).clamp(0.0, 1.0);

    if t < ray.tmin || t > ray.tmax {
        return None;
    }

    let p0 = ray.at(t);
    let p1 = v0 + v * s;
    let p01 = p0 - p1;

    let r = r0 * (1.0 - s) + r1 * s;
    if p01.dot(p01) > r * r {
        return None;
    }

    Some((t, ElemUv::new(s, 0.0)))
}

/// Intersect a ray with a triangle (Moller-Trumbore).
///
/// Coordinates are barycentric: the hit point is
/// `v0 + u * (v1 - v0) + v * (v2 - v0)`.
#[inline]
pub fn ray_triangle(ray: &Ray3, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<(f32, ElemUv)> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let pvec = ray.dir.cross(edge2);
    let det = edge1.dot(pvec);

    // parallel ray or degenerate triangle
    if det == 0.0 {
        return None;
    }
    let inv_det = 1.0 / det;

    let tvec = ray.origin - v0;
    let u = tvec.dot(pvec) * inv_det;
    if u < 0.0 || u > 1.0 {
        return None;
    }

    let qvec = tvec.cross(edge1);
    let v = ray.dir.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = edge2.dot(qvec) * inv_det;
    if t < ray.tmin || t > ray.tmax {
        return None;
    }

    Some((t, ElemUv::new(u, v)))
}

/// Slab test of a ray against a bounding box.
///
/// Clips the ray window against the bounding planes of each axis and
/// reports whether any of the window survives. Tangential grazes where
/// the clipped window collapses to a point are admitted.
#[inline]
pub fn ray_aabb(ray: &Ray3, bbox: &Aabb) -> bool {
    let mut tmin = ray.tmin;
    let mut tmax = ray.tmax;

    for axis in 0..3 {
        let invd = 1.0 / ray.dir.axis(axis);
        let mut t0 = (bbox.min.axis(axis) - ray.origin.axis(axis)) * invd;
        let mut t1 = (bbox.max.axis(axis) - ray.origin.axis(axis)) * invd;
        if invd < 0.0 {
            core::mem::swap(&mut t0, &mut t1);
        }
        tmin = if t0 > tmin { t0 } else { tmin };
        tmax = if t1 < tmax { t1 } else { tmax };
        if tmin > tmax {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_point_closest_approach() {
        // point at the origin with radius 0.5, ray marching in from +x
        let ray = Ray3::segment(
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(-1.0, 0.0, 0.0),
            0.0,
            10.0,
        );
        let (t, uv) = ray_point(&ray, Vec3::ZERO, 0.5).unwrap();
        assert!((t - 2.0).abs() < 1e-6);
        assert_eq!(uv.as_array(), [0.0, 0.0]);
    }

    #[test]
    fn test_ray_point_misses() {
        let ray = Ray3::new(Vec3::new(2.0, 1.0, 0.0), Vec3::new(-1.0, 0.0, 0.0));
        // approach distance 1.0 > radius 0.5
        assert!(ray_point(&ray, Vec3::ZERO, 0.5).is_none());
        // behind the window
        let behind = Ray3::segment(
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            0.0,
            10.0,
        );
        assert!(ray_point(&behind, Vec3::ZERO, 0.5).is_none());
    }

    #[test]
    fn test_ray_line_hit() {
        // segment along x with constant radius, ray dropping straight down
        let ray = Ray3::segment(
            Vec3::new(0.5, 1.0, 0.0),
            Vec3::new(0.0, -1.0, 0.0),
            0.0,
            10.0,
        );
        let (t, uv) = ray_line(
            &ray,
            Vec3::ZERO,
            Vec3::new(1.0, 0.0, 0.0),
            0.1,
            0.1,
        )
        .unwrap();
        assert!((t - 1.0).abs() < 1e-6);
        assert!((uv.u - 0.5).abs() < 1e-6);
        assert_eq!(uv.v, 0.0);
    }

    #[test]
    fn test_ray_line_clamps_to_endpoint() {
        // closest approach past the end of the segment clamps to s = 1
        let ray = Ray3::new(Vec3::new(1.5, 1.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        let hit = ray_line(&ray, Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), 0.6, 0.6);
        let (_, uv) = hit.unwrap();
        assert_eq!(uv.u, 1.0);
    }

    #[test]
    fn test_ray_line_parallel_rejected() {
        let ray = Ray3::new(Vec3::new(0.0, 0.05, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(ray_line(&ray, Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), 0.1, 0.1).is_none());
    }

    #[test]
    fn test_ray_triangle_hit() {
        let ray = Ray3::segment(
            Vec3::new(0.25, 0.25, -1.0),
            Vec3::new(0.0, 0.0, 1.0),
            0.0,
            10.0,
        );
        let (t, uv) = ray_triangle(
            &ray,
            Vec3::ZERO,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        )
        .unwrap();
        assert!((t - 1.0).abs() < 1e-6);
        assert!((uv.u - 0.25).abs() < 1e-6);
        assert!((uv.v - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_ray_triangle_outside() {
        let ray = Ray3::new(Vec3::new(0.75, 0.75, -1.0), Vec3::new(0.0, 0.0, 1.0));
        // u + v > 1 on the plane
        assert!(ray_triangle(
            &ray,
            Vec3::ZERO,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        )
        .is_none());
    }

    #[test]
    fn test_ray_triangle_parallel_rejected() {
        // ray in the triangle plane: det is exactly zero
        let ray = Ray3::new(Vec3::new(-1.0, 0.25, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(ray_triangle(
            &ray,
            Vec3::ZERO,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        )
        .is_none());
    }

    #[test]
    fn test_ray_triangle_window() {
        let tri = (
            Vec3::ZERO,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        let ray = Ray3::segment(
            Vec3::new(0.25, 0.25, -1.0),
            Vec3::new(0.0, 0.0, 1.0),
            0.0,
            0.5,
        );
        assert!(ray_triangle(&ray, tri.0, tri.1, tri.2).is_none());
    }

    #[test]
    fn test_ray_aabb_basics() {
        let bbox = Aabb::new(Vec3::ZERO, Vec3::splat(1.0));

        let hit = Ray3::new(Vec3::new(-1.0, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0));
        assert!(ray_aabb(&hit, &bbox));

        let miss = Ray3::new(Vec3::new(-1.0, 2.0, 0.5), Vec3::new(1.0, 0.0, 0.0));
        assert!(!ray_aabb(&miss, &bbox));

        // pointing away
        let away = Ray3::new(Vec3::new(-1.0, 0.5, 0.5), Vec3::new(-1.0, 0.0, 0.0));
        assert!(!ray_aabb(&away, &bbox));
    }

    #[test]
    fn test_ray_aabb_graze_admitted() {
        // flat box; the clipped window collapses to a point but still hits
        let flat = Aabb::new(Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0));
        let ray = Ray3::new(Vec3::new(0.5, 0.5, -1.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(ray_aabb(&ray, &flat));
    }

    #[test]
    fn test_ray_aabb_empty_rejects() {
        let ray = Ray3::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));
        assert!(!ray_aabb(&ray, &Aabb::empty()));
    }
}
