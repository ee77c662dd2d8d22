//! Surface-frame forces on a batch of rolling bodies
//!
//! Each body is resolved in the local frame of the surface under it: the unit
//! normal `Z` and the tangent plane. Forces considered:
//! - weight, split into its normal and tangential parts,
//! - the centripetal force needed to follow the surface curvature,
//! - the contact (normal) force balancing both,
//! - kinetic friction opposing the direction of travel

use crate::geometry::evaluator::{build_normals, directional_curvature};
use crate::geometry::linalg::{normalize_or_zero, project};
use crate::simulation::params::Parameters;
use crate::simulation::states::{NVec2, NVec3};
use crate::surface::function::SurfaceFunction;

/// Per-body force terms for one integration step
#[derive(Debug, Clone, Default)]
pub struct SurfaceForces {
    pub normals: Vec<NVec3>,         // unit surface normal Z
    pub curvature: Vec<f64>,         // normal curvature along travel
    pub centripetal: Vec<NVec3>,     // Fnet_z = κ |v|² m Z
    pub gravity_tangent: Vec<NVec3>, // Fg_x = Fg - (Fg . Z) Z
    pub friction: Vec<NVec3>,        // Fk = -v̂ μ N
    pub normal_force: Vec<f64>,      // N = |Fnet_z - Fg_z|
}

impl SurfaceForces {
    /// Resolve forces for bodies at `positions` moving with `velocities`
    ///
    /// `velocities` must already be free of infinities
    pub fn compute(
        surface: &dyn SurfaceFunction,
        params: &Parameters,
        positions: &[NVec3],
        velocities: &[NVec3],
        masses: &[f64],
    ) -> Self {
        let n = positions.len();
        if n == 0 {
            return Self::default();
        }

        let points: Vec<NVec2> = positions.iter().map(|s| s.xy()).collect();

        // local reference frame of each body
        let normals = build_normals(surface, &points);

        // curvature along the direction of travel, 0 for bodies at rest
        let directions: Vec<NVec3> = velocities.iter().map(normalize_or_zero).collect();
        let travel_dirs: Vec<NVec2> = directions.iter().map(|d| d.xy()).collect();
        let curvature = directional_curvature(surface, &points, &travel_dirs);

        let g = params.gravity_vector();

        let mut forces = Self {
            normals: Vec::with_capacity(n),
            curvature: Vec::with_capacity(n),
            centripetal: Vec::with_capacity(n),
            gravity_tangent: Vec::with_capacity(n),
            friction: Vec::with_capacity(n),
            normal_force: Vec::with_capacity(n),
        };

        for i in 0..n {
            let z = normals[i];
            let m = masses[i];
            let v = velocities[i];
            let k = curvature[i];

            // weight split along the normal and in the tangent plane
            let weight = g * m;
            let fg_z = project(&weight, &z);
            let fg_x = weight - fg_z;

            // curvature: k = 1/r, radial acceleration: v^2/r = v^2 k
            let fnet_z = z * (k * v.norm_squared() * m);

            // contact force provides the centripetal part and cancels weight
            let n_mag = (fnet_z - fg_z).norm();

            let fk = -directions[i] * (params.friction * n_mag);

            forces.normals.push(z);
            forces.curvature.push(k);
            forces.centripetal.push(fnet_z);
            forces.gravity_tangent.push(fg_x);
            forces.friction.push(fk);
            forces.normal_force.push(n_mag);
        }

        forces
    }

    /// Write net accelerations `a = (Fnet_z + Fg_x + Fk) / m` into `out`
    pub fn accumulate_accels(&self, masses: &[f64], out: &mut [NVec3]) {
        for (i, (a, m)) in out.iter_mut().zip(masses.iter()).enumerate() {
            let a_z = self.centripetal[i] / *m;
            let a_xy = (self.gravity_tangent[i] + self.friction[i]) / *m;
            *a = a_z + a_xy;
        }
    }
}
