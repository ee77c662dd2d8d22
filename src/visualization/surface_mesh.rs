//! Grid sampling of a surface into a triangle mesh
//!
//! Positions and normals stay in simulation coordinates (z up); the viewer
//! converts them to its own axes

use crate::geometry::evaluator::{build_normals, build_values};
use crate::simulation::engine::Domain;
use crate::simulation::states::NVec2;
use crate::surface::function::SurfaceFunction;

pub const MIN_RESOLUTION: usize = 2;

#[derive(Debug, Clone)]
pub struct SurfaceMesh {
    pub resolution: usize,        // samples per axis
    pub positions: Vec<[f32; 3]>, // resolution^2 vertices, row-major in y
    pub normals: Vec<[f32; 3]>,   // unit normals, +z where undefined
    pub indices: Vec<u32>,        // two counter-clockwise triangles per cell
}

impl SurfaceMesh {
    /// Sample `surface` on a `resolution x resolution` grid over `domain`
    ///
    /// Heights that cannot be evaluated are drawn at 0
    pub fn sample(surface: &dyn SurfaceFunction, domain: &Domain, resolution: usize) -> Self {
        let res = resolution.max(MIN_RESOLUTION);
        let points = grid_points(domain, res);

        let heights = build_values(surface, &points);
        let normals = build_normals(surface, &points);

        let positions = points
            .iter()
            .zip(heights.iter())
            .map(|(p, &z)| {
                let z = if z.is_finite() { z } else { 0.0 };
                [p.x as f32, p.y as f32, z as f32]
            })
            .collect();

        let normals = normals
            .iter()
            .map(|n| {
                if n.norm_squared() > 0.0 && n.iter().all(|c| c.is_finite()) {
                    [n.x as f32, n.y as f32, n.z as f32]
                } else {
                    [0.0, 0.0, 1.0]
                }
            })
            .collect();

        Self {
            resolution: res,
            positions,
            normals,
            indices: grid_indices(res),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

fn grid_points(domain: &Domain, res: usize) -> Vec<NVec2> {
    let step = |(lo, hi): (f64, f64), k: usize| lo + (hi - lo) * k as f64 / (res - 1) as f64;

    let mut points = Vec::with_capacity(res * res);
    for row in 0..res {
        for col in 0..res {
            points.push(NVec2::new(step(domain.x, col), step(domain.y, row)));
        }
    }
    points
}

fn grid_indices(res: usize) -> Vec<u32> {
    let mut indices = Vec::with_capacity((res - 1) * (res - 1) * 6);
    let at = |row: usize, col: usize| (row * res + col) as u32;

    for row in 0..res - 1 {
        for col in 0..res - 1 {
            let a = at(row, col);
            let b = at(row, col + 1);
            let c = at(row + 1, col + 1);
            let d = at(row + 1, col);
            indices.extend_from_slice(&[a, b, c, a, c, d]);
        }
    }
    indices
}
