//! Fixed-step time integrator for bodies rolling on a surface
//!
//! Semi-implicit (symplectic) Euler driven by [`SurfaceForces`], with an
//! optional z-correction that snaps bodies back onto the surface

use log::{debug, warn};

use crate::geometry::evaluator::build_values;
use crate::geometry::linalg::clear_infinite;
use crate::simulation::forces::SurfaceForces;
use crate::simulation::params::Parameters;
use crate::simulation::states::{BodyStore, NVec2, NVec3};
use crate::surface::function::SurfaceFunction;

/// Advance every active body in `store` by one step `dt`
///
/// Updates velocities then positions in-place:
/// - `v_n+1 = v_n + a_n dt`
/// - `s_n+1 = s_n + v_n+1 dt`
///
/// With `z_correction` the new height is overwritten with `f(x_n+1, y_n+1)`.
/// Bodies whose state stops being finite (they left the surface domain) are
/// deactivated
pub fn euler_integrator(
    store: &mut BodyStore,
    surface: &dyn SurfaceFunction,
    params: &Parameters,
    dt: f64,
    z_correction: bool,
) {
    let slots = store.active_indices();
    let n = slots.len();
    if n == 0 { // no bodies, return
        return;
    }

    let pos = store.active_positions();
    let masses = store.active_masses();

    // infinite components from an earlier blow-up are reset to zero
    let vel: Vec<NVec3> = store.active_velocities().iter().map(clear_infinite).collect();

    // a_n from the surface frame at s_n
    let forces = SurfaceForces::compute(surface, params, &pos, &vel, &masses);
    let mut accel = vec![NVec3::zeros(); n];
    forces.accumulate_accels(&masses, &mut accel);

    // Kick: v_n+1 = v_n + a_n dt
    let v_new: Vec<NVec3> = vel.iter().zip(accel.iter()).map(|(v, a)| v + a * dt).collect();

    // Drift: s_n+1 = s_n + v_n+1 dt
    let mut s_new: Vec<NVec3> = pos.iter().zip(v_new.iter()).map(|(s, v)| s + v * dt).collect();

    if z_correction {
        let points: Vec<NVec2> = s_new.iter().map(|s| s.xy()).collect();
        let heights = build_values(surface, &points);
        for (s, z) in s_new.iter_mut().zip(heights) {
            s.z = z;
        }
    }

    store.scatter(&slots, &s_new, &v_new);

    // bodies that left the evaluation domain have no defined state anymore
    for (slot, s) in slots.iter().zip(s_new.iter()) {
        if !s.iter().all(|c| c.is_finite()) {
            warn!("integrator: body in slot {slot} left the surface domain, removing it");
            store.deactivate(*slot);
        }
    }

    debug!("integrator: advanced {n} bodies by dt = {dt}");
}
