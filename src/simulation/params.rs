//! Physical parameters of the rolling simulation
//!
//! `Parameters` holds runtime settings:
//! - gravity magnitude (acts along -z) and kinetic friction coefficient,
//! - initial body capacity, also used as the growth increment,
//! - what to do when the body store is full

use crate::error::MechanicsError;
use crate::simulation::states::{CapacityPolicy, NVec3};

#[derive(Debug, Clone)]
pub struct Parameters {
    pub gravity: f64,                    // gravity magnitude (m/s^2)
    pub friction: f64,                   // kinetic friction coefficient
    pub capacity: usize,                 // initial slots / growth step
    pub capacity_policy: CapacityPolicy, // grow or evict when full
}

/// Reject NaN and infinite values for a named parameter
pub fn check_finite(name: &'static str, value: f64) -> Result<f64, MechanicsError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(MechanicsError::InvalidParameter { name, value })
    }
}

impl Parameters {
    /// Check every scalar before the parameters reach the integrator
    pub fn validate(&self) -> Result<(), MechanicsError> {
        check_finite("gravity", self.gravity)?;
        check_finite("friction", self.friction)?;
        Ok(())
    }

    /// Gravitational acceleration vector `(0, 0, -g)`
    pub fn gravity_vector(&self) -> NVec3 {
        NVec3::new(0.0, 0.0, -self.gravity)
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            gravity: 25.0,
            friction: 0.2,
            capacity: 32,
            capacity_policy: CapacityPolicy::Grow,
        }
    }
}
