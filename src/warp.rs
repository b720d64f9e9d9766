//! Component G: the cubed-shell equiangular gnomonic warp.
//!
//! Pure function, no state, kept in its own module so it can be used both
//! by the cubed-shell generator's own tests (round-trip onto the sphere)
//! and directly by downstream callers (§6) without depending on anything
//! else in this crate.

use crate::error::{Result, TopologyError};

/// Maps a point `(a, b, c)` on the surface of an axis-aligned cube of
/// half-side `R = max(|a|, |b|, |c|)` onto the sphere of radius `R`, via
/// the equiangular gnomonic projection (Ronchi, Iacono & Paolucci 1996).
///
/// Fails with [`TopologyError::InvalidWarpInput`] if no axis dominates
/// (e.g. the origin), since then the point does not lie on any cube face.
pub fn warp(a: f64, b: f64, c: f64) -> Result<(f64, f64, f64)> {
    let r = a.abs().max(b.abs()).max(c.abs());
    if r == 0.0 {
        return Err(TopologyError::InvalidWarpInput { a, b, c });
    }

    // Six cases by dominant axis and its sign; (xi, eta) are the two
    // in-face angular parameters, chosen so that a positive rotation sense
    // is consistent across faces.
    let (xi, eta, dominant_sign, dominant_axis) = if a.abs() == r && a > 0.0 {
        (b / r, c / r, 1.0, 0)
    } else if a.abs() == r && a < 0.0 {
        (-b / r, c / r, -1.0, 0)
    } else if b.abs() == r && b > 0.0 {
        (-a / r, c / r, 1.0, 1)
    } else if b.abs() == r && b < 0.0 {
        (a / r, c / r, -1.0, 1)
    } else if c.abs() == r && c > 0.0 {
        (a / r, b / r, 1.0, 2)
    } else if c.abs() == r && c < 0.0 {
        (a / r, -b / r, -1.0, 2)
    } else {
        return Err(TopologyError::InvalidWarpInput { a, b, c });
    };

    let x_param = (std::f64::consts::FRAC_PI_4 * xi).tan();
    let y_param = (std::f64::consts::FRAC_PI_4 * eta).tan();
    let denom = (x_param * x_param + y_param * y_param + 1.0).sqrt();
    let dominant = dominant_sign * r / denom;
    let sub1 = dominant * x_param;
    let sub2 = dominant * y_param;

    Ok(match dominant_axis {
        0 => (dominant, sub1, sub2),
        1 => (-sub1, dominant, sub2),
        _ => (sub1, sub2, dominant),
    })
}
