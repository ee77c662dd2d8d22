//! Mechanics context: parameters plus the body store they act on
//!
//! This is the object a UI or control layer talks to. Gravity and friction
//! live here as plain fields and are read by every `update`

use log::info;

use crate::error::MechanicsError;
use crate::simulation::integrator::euler_integrator;
use crate::simulation::params::{check_finite, Parameters};
use crate::simulation::states::{BodyStore, NVec3};
use crate::surface::function::SurfaceFunction;

#[derive(Debug, Clone)]
pub struct Mechanics {
    parameters: Parameters,
    store: BodyStore,
}

impl Mechanics {
    pub fn new(parameters: Parameters) -> Self {
        let store = BodyStore::new(parameters.capacity, parameters.capacity_policy);
        Self { parameters, store }
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn store(&self) -> &BodyStore {
        &self.store
    }

    pub fn gravity(&self) -> f64 {
        self.parameters.gravity
    }

    /// Gravitational acceleration vector `(0, 0, -g)`
    pub fn gravity_vector(&self) -> NVec3 {
        self.parameters.gravity_vector()
    }

    /// Set gravity magnitude (m/s^2), acting along -z
    pub fn set_gravity(&mut self, gravity: f64) -> Result<(), MechanicsError> {
        self.parameters.gravity = check_finite("gravity", gravity)?;
        Ok(())
    }

    pub fn friction(&self) -> f64 {
        self.parameters.friction
    }

    /// Set the kinetic friction coefficient
    pub fn set_friction(&mut self, friction: f64) -> Result<(), MechanicsError> {
        self.parameters.friction = check_finite("friction", friction)?;
        Ok(())
    }

    /// Add a body at rest at `position`, returns the slot it landed in
    pub fn add_body(&mut self, position: NVec3, mass: f64) -> Result<usize, MechanicsError> {
        self.add_body_with_velocity(position, NVec3::zeros(), mass)
    }

    /// Add a body with an initial velocity, returns the slot it landed in
    pub fn add_body_with_velocity(
        &mut self,
        position: NVec3,
        velocity: NVec3,
        mass: f64,
    ) -> Result<usize, MechanicsError> {
        if !(mass.is_finite() && mass > 0.0) {
            return Err(MechanicsError::InvalidMass(mass));
        }
        if !position.iter().all(|c| c.is_finite()) {
            return Err(MechanicsError::InvalidPosition(position.x, position.y, position.z));
        }

        let velocity = if velocity.iter().all(|c| c.is_finite()) {
            velocity
        } else {
            NVec3::zeros()
        };

        Ok(self.store.add_with_velocity(position, velocity, mass))
    }

    /// Remove the body nearest to `position`, no-op when there are none
    pub fn remove_nearest(&mut self, position: &NVec3) -> Option<usize> {
        self.store.remove_nearest(position)
    }

    /// Remove all bodies, capacity is kept
    pub fn clear(&mut self) {
        if self.store.active_count() > 0 {
            info!("mechanics: clear {} bodies", self.store.active_count());
        }
        self.store.clear();
    }

    /// Integrate every active body by `dt` on `surface`
    pub fn update(&mut self, dt: f64, surface: &dyn SurfaceFunction, z_correction: bool) {
        euler_integrator(&mut self.store, surface, &self.parameters, dt, z_correction);
    }

    pub fn get_active_positions(&self) -> Vec<NVec3> {
        self.store.active_positions()
    }

    pub fn get_active_velocities(&self) -> Vec<NVec3> {
        self.store.active_velocities()
    }

    pub fn get_active_masses(&self) -> Vec<f64> {
        self.store.active_masses()
    }

    pub fn get_active_count(&self) -> usize {
        self.store.active_count()
    }

    pub fn get_capacity(&self) -> usize {
        self.store.capacity()
    }
}

impl Default for Mechanics {
    fn default() -> Self {
        Self::new(Parameters::default())
    }
}
