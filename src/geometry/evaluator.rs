//! Differential geometry of a graph surface `z = f(x, y)` over point batches
//!
//! Turns raw partial-derivative evaluations from a [`SurfaceFunction`] into
//! the quantities the integrator needs: unit normals, gradients, Hessian
//! products and the normal curvature along a direction of travel

use log::warn;
use nalgebra::Matrix2;

use crate::geometry::linalg::normalize_or_zero;
use crate::simulation::states::{NVec2, NVec3};
use crate::surface::function::SurfaceFunction;

/// Unit normals at `points`
///
/// Built as `Tx × Ty` with tangents `Tx = (1, 0, fx)` and `Ty = (0, 1, fy)`.
/// A zero cross product is returned as the zero vector, never NaN
pub fn build_normals(surface: &dyn SurfaceFunction, points: &[NVec2]) -> Vec<NVec3> {
    let fx = surface.gradient_x(points);
    let fy = surface.gradient_y(points);

    fx.iter()
        .zip(fy.iter())
        .map(|(&dx, &dy)| {
            // rise over a unit run along each axis
            let tx = NVec3::new(1.0, 0.0, dx);
            let ty = NVec3::new(0.0, 1.0, dy);
            normalize_or_zero(&tx.cross(&ty))
        })
        .collect()
}

/// `f(x, y)` at every point, one entry per point even for constant formulas
pub fn build_values(surface: &dyn SurfaceFunction, points: &[NVec2]) -> Vec<f64> {
    let mut values = surface.evaluate(points);
    // a provider returning a single broadcast scalar gets expanded here
    if values.len() == 1 && points.len() > 1 {
        values = vec![values[0]; points.len()];
    }
    values
}

/// Surface gradient `(fx, fy)` at every point
pub fn build_gradient_first(surface: &dyn SurfaceFunction, points: &[NVec2]) -> Vec<NVec2> {
    let fx = surface.gradient_x(points);
    let fy = surface.gradient_y(points);

    fx.into_iter()
        .zip(fy)
        .map(|(dx, dy)| NVec2::new(dx, dy))
        .collect()
}

/// Symmetric Hessian `[[fxx, fxy], [fxy, fyy]]` at every point
pub fn build_hessians(surface: &dyn SurfaceFunction, points: &[NVec2]) -> Vec<Matrix2<f64>> {
    let fxx = surface.hessian_xx(points);
    let fyy = surface.hessian_yy(points);
    let fxy = surface.hessian_xy(points);

    fxx.iter()
        .zip(fyy.iter())
        .zip(fxy.iter())
        .map(|((&xx, &yy), &xy)| Matrix2::new(xx, xy, xy, yy))
        .collect()
}

/// `H(p) · p` for every point `p`
///
/// The query point doubles as the vector the Hessian is applied to, so passing unit directions as
/// `points` gives Hessians evaluated at those directions applied to themselves
pub fn build_gradient_second(surface: &dyn SurfaceFunction, points: &[NVec2]) -> Vec<NVec2> {
    build_hessians(surface, points)
        .iter()
        .zip(points.iter())
        .map(|(h, p)| h * p)
        .collect()
}

/// Normal curvature of the surface at `points` along `directions`
///
/// For each direction `u`:
/// - `s1 = ∇f · u`
/// - `s2 = fxx ux² + 2 fxy ux uy + fyy uy²`
/// - `κ = |s2| / (1 + s1²)^(3/2)`
///
/// Entries with a zero direction (body at rest) are masked out before any
/// derivative is evaluated and come back as exactly 0, as do entries where
/// the surface cannot be evaluated (NaN / inf outside its domain)
pub fn directional_curvature(
    surface: &dyn SurfaceFunction,
    points: &[NVec2],
    directions: &[NVec2],
) -> Vec<f64> {
    let mut curvature = vec![0.0; points.len()];

    // mask of entries that need derivatives at all
    let moving: Vec<usize> = directions
        .iter()
        .enumerate()
        .filter_map(|(i, u)| (u.norm_squared() != 0.0).then_some(i))
        .collect();

    if moving.is_empty() {
        return curvature;
    }

    let moving_points: Vec<NVec2> = moving.iter().map(|&i| points[i]).collect();
    let gradients = build_gradient_first(surface, &moving_points);
    let hessians = build_hessians(surface, &moving_points);

    let mut degenerate = 0usize;
    for ((&i, grad), h) in moving.iter().zip(gradients.iter()).zip(hessians.iter()) {
        let u = directions[i];

        // directional slope and second directional derivative along u
        let s1 = grad.dot(&u);
        let s2 = h[(0, 0)] * u.x * u.x + 2.0 * h[(0, 1)] * u.x * u.y + h[(1, 1)] * u.y * u.y;

        let k = s2.abs() / (1.0 + s1 * s1).powf(1.5);
        if k.is_finite() {
            curvature[i] = k;
        } else {
            degenerate += 1;
        }
    }

    if degenerate > 0 {
        warn!("curvature: {degenerate} point(s) outside the surface domain, using 0");
    }

    curvature
}
