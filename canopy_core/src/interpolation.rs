//! Vertex-property interpolation at query results.
//!
//! Mirrors the `(u, v)` conventions of the ray and nearest-point kernels,
//! so interpolating vertex positions at a hit's coordinates reproduces the
//! hit point: values are copied for points, lerped for lines, and blended
//! barycentrically for triangles.

use crate::error::CoreError;
use crate::types::{ElemUv, Elements};

/// Interpolate a dense per-vertex property at element-local coordinates.
///
/// `vert` holds one `vsize`-float record per vertex; the interpolated
/// record for element `eid` at `euv` is accumulated into `out[..vsize]`.
///
/// # Errors
/// * `ElementOutOfBounds` if `eid` is not a valid element index
/// * `VertexOutOfBounds` if an element references vertex data past the
///   end of `vert`
/// * `InsufficientCapacity` if `out` is shorter than `vsize`
pub fn interpolate_vert(
    elements: &Elements<'_>,
    eid: usize,
    euv: ElemUv,
    vsize: usize,
    vert: &[f32],
    out: &mut [f32],
) -> Result<(), CoreError> {
    if out.len() < vsize {
        return Err(CoreError::InsufficientCapacity {
            required: vsize,
            provided: out.len(),
        });
    }
    for c in out[..vsize].iter_mut() {
        *c = 0.0;
    }

    let out_of_bounds = CoreError::ElementOutOfBounds {
        index: eid,
        count: elements.len(),
    };
    match elements {
        Elements::Points(ids) => {
            let f = *ids.get(eid).ok_or(out_of_bounds)?;
            accumulate(out, vert, f, 1.0, vsize)?;
        }
        Elements::Lines(segs) => {
            let [a, b] = *segs.get(eid).ok_or(out_of_bounds)?;
            accumulate(out, vert, a, 1.0 - euv.u, vsize)?;
            accumulate(out, vert, b, euv.u, vsize)?;
        }
        Elements::Triangles(tris) => {
            let [a, b, c] = *tris.get(eid).ok_or(out_of_bounds)?;
            accumulate(out, vert, a, 1.0 - euv.u - euv.v, vsize)?;
            accumulate(out, vert, b, euv.u, vsize)?;
            accumulate(out, vert, c, euv.v, vsize)?;
        }
    }
    Ok(())
}

/// Accumulate one weighted vertex record into the output.
fn accumulate(
    out: &mut [f32],
    vert: &[f32],
    vid: u32,
    weight: f32,
    vsize: usize,
) -> Result<(), CoreError> {
    let base = vid as usize * vsize;
    let src = vert
        .get(base..base + vsize)
        .ok_or(CoreError::VertexOutOfBounds {
            index: vid as usize,
            count: if vsize == 0 { 0 } else { vert.len() / vsize },
        })?;
    for (o, s) in out[..vsize].iter_mut().zip(src) {
        *o += weight * s;
    }
    Ok(())
}
