//! Element-wise closest-point and distance kernels.
//!
//! Each kernel accepts a query position and a maximum distance, and reports
//! `Some((dist, uv))` with the unsigned distance and the element-local
//! coordinates of the closest point. The comparison radius is expanded by
//! the primitive's local radius: acceptance is `d^2 <= (dist_max + r)^2`.

use crate::types::{ElemUv, Vec3};

/// Distance query against a fat point.
#[inline]
pub fn point_point(pos: Vec3, dist_max: f32, p: Vec3, r: f32) -> Option<(f32, ElemUv)> {
    let d2 = pos.distance_squared(p);
    if d2 > (dist_max + r) * (dist_max + r) {
        return None;
    }
    Some((libm::sqrtf(d2), ElemUv::new(0.0, 0.0)))
}

/// Parameter of the closest point on a segment to `pos`, clamped to `[0, 1]`.
///
/// A zero-length segment reports its first endpoint (`u = 0`).
#[inline]
pub fn closest_uv_line(pos: Vec3, v0: Vec3, v1: Vec3) -> f32 {
    let ab = v1 - v0;
    let d = ab.dot(ab);
    if d == 0.0 {
        return 0.0;
    }
    ((pos - v0).dot(ab) / d).clamp(0.0, 1.0)
}

/// Distance query against a tapered line segment.
///
/// The comparison radius is interpolated linearly along the segment.
/// `u` is the segment parameter of the closest point, `v` is zero.
#[inline]
pub fn point_line(
    pos: Vec3,
    dist_max: f32,
    v0: Vec3,
    v1: Vec3,
    r0: f32,
    r1: f32,
) -> Option<(f32, ElemUv)> {
    let u = closest_uv_line(pos, v0, v1);
    let p = v0.lerp(v1, u);
    let r = r0 + (r1 - r0) * u;
    let d2 = pos.distance_squared(p);
    if d2 > (dist_max + r) * (dist_max + r) {
        return None;
    }
    Some((libm::sqrtf(d2), ElemUv::new(u, 0.0)))
}

/// Barycentric coordinates of the closest point on a triangle to `pos`.
///
/// Classic seven-region Voronoi test (Ericson, Real-Time Collision
/// Detection 5.1.5): three vertex regions, three edge regions via
/// edge-plane sign tests, then the interior face region. The closest
/// point is `v0 + u * (v1 - v0) + v * (v2 - v0)`.
pub fn closest_uv_triangle(pos: Vec3, v0: Vec3, v1: Vec3, v2: Vec3) -> ElemUv {
    let ab = v1 - v0;
    let ac = v2 - v0;
    let ap = pos - v0;

    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return ElemUv::new(0.0, 0.0);
    }

    let bp = pos - v1;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return ElemUv::new(1.0, 0.0);
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        return ElemUv::new(d1 / (d1 - d3), 0.0);
    }

    let cp = pos - v2;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return ElemUv::new(0.0, 1.0);
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        return ElemUv::new(0.0, d2 / (d2 - d6));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return ElemUv::new(1.0 - w, w);
    }

    let denom = 1.0 / (va + vb + vc);
    ElemUv::new(vb * denom, vc * denom)
}

/// Distance query against a triangle.
///
/// The comparison radius is interpolated barycentrically across the
/// triangle; pass zeros for shapes without radii.
#[inline]
pub fn point_triangle(
    pos: Vec3,
    dist_max: f32,
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
    r0: f32,
    r1: f32,
    r2: f32,
) -> Option<(f32, ElemUv)> {
    let uv = closest_uv_triangle(pos, v0, v1, v2);
    let w = 1.0 - uv.u - uv.v;
    let p = v0 * w + v1 * uv.u + v2 * uv.v;
    let r = r0 * w + r1 * uv.u + r2 * uv.v;
    let d2 = pos.distance_squared(p);
    if d2 > (dist_max + r) * (dist_max + r) {
        return None;
    }
    Some((libm::sqrtf(d2), uv))
}
