//! Core state types for the rolling-body simulation
//!
//! `BodyStore` keeps every body field in its own contiguous array
//! (structure of arrays) plus an activity mask:
//! - `positions` / `velocities` using `NVec3`
//! - `masses` as plain `f64`
//! - `active` flags deciding which slots are simulated and drawn
//!
//! All arrays always share the same length, the store capacity

use log::{info, warn};
use serde::Deserialize;

use nalgebra::{Vector2, Vector3};
pub type NVec2 = Vector2<f64>;
pub type NVec3 = Vector3<f64>;

/// What `add` does when every slot is already active
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapacityPolicy {
    /// Grow every array by the growth increment, nothing is lost
    #[default]
    #[serde(rename = "grow")]
    Grow,

    /// Overwrite the active body farthest from the origin
    #[serde(rename = "evict_farthest")]
    EvictFarthest,
}

#[derive(Debug, Clone)]
pub struct BodyStore {
    positions: Vec<NVec3>,  // position (m)
    velocities: Vec<NVec3>, // velocity (m/s)
    masses: Vec<f64>,       // mass (kg)
    active: Vec<bool>,      // slot participates in integration
    increment: usize,       // growth step when full
    policy: CapacityPolicy,
}

impl BodyStore {
    /// Empty store with `capacity` slots, growing by `capacity` when full
    pub fn new(capacity: usize, policy: CapacityPolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            positions: vec![NVec3::zeros(); capacity],
            velocities: vec![NVec3::zeros(); capacity],
            masses: vec![0.0; capacity],
            active: vec![false; capacity],
            increment: capacity,
            policy,
        }
    }

    pub fn policy(&self) -> CapacityPolicy {
        self.policy
    }

    /// Total number of slots, active or not
    pub fn capacity(&self) -> usize {
        self.active.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.iter().filter(|a| **a).count()
    }

    /// Slot indices of active bodies, ascending
    pub fn active_indices(&self) -> Vec<usize> {
        self.active
            .iter()
            .enumerate()
            .filter_map(|(i, a)| a.then_some(i))
            .collect()
    }

    pub fn active_positions(&self) -> Vec<NVec3> {
        self.gather(&self.positions)
    }

    pub fn active_velocities(&self) -> Vec<NVec3> {
        self.gather(&self.velocities)
    }

    pub fn active_masses(&self) -> Vec<f64> {
        self.gather(&self.masses)
    }

    fn gather<T: Copy>(&self, field: &[T]) -> Vec<T> {
        field
            .iter()
            .zip(self.active.iter())
            .filter_map(|(v, a)| a.then_some(*v))
            .collect()
    }

    /// Write back integrated state for `slots` (as returned by `active_indices`)
    pub fn scatter(&mut self, slots: &[usize], positions: &[NVec3], velocities: &[NVec3]) {
        for ((&i, s), v) in slots.iter().zip(positions.iter()).zip(velocities.iter()) {
            self.positions[i] = *s;
            self.velocities[i] = *v;
        }
    }

    /// Insert a body at rest, returns the slot used
    pub fn add(&mut self, position: NVec3, mass: f64) -> usize {
        self.add_with_velocity(position, NVec3::zeros(), mass)
    }

    /// Insert a body with an initial velocity, returns the slot used
    pub fn add_with_velocity(&mut self, position: NVec3, velocity: NVec3, mass: f64) -> usize {
        let i = self.available_slot();

        self.positions[i] = position;
        self.velocities[i] = velocity;
        self.masses[i] = mass;
        self.active[i] = true;

        i
    }

    /// First free slot, or a slot made free according to the capacity policy
    fn available_slot(&mut self) -> usize {
        if let Some(i) = self.active.iter().position(|a| !*a) {
            return i;
        }

        match self.policy {
            CapacityPolicy::Grow => {
                let old_size = self.capacity();
                let new_size = old_size + self.increment;
                info!("body store: reallocate, from {old_size} to {new_size}");

                // resize keeps old contents in the low indices
                self.positions.resize(new_size, NVec3::zeros());
                self.velocities.resize(new_size, NVec3::zeros());
                self.masses.resize(new_size, 0.0);
                self.active.resize(new_size, false);

                old_size
            }
            CapacityPolicy::EvictFarthest => {
                let i = farthest_from_origin(&self.positions);
                warn!("body store full: overwrite slot {i} (farthest from origin)");
                i
            }
        }
    }

    /// Deactivate the active body closest to `query`, returns its slot
    pub fn remove_nearest(&mut self, query: &NVec3) -> Option<usize> {
        let nearest = self
            .positions
            .iter()
            .enumerate()
            .filter(|(i, _)| self.active[*i])
            .map(|(i, s)| (i, (s - query).norm_squared()))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)?;

        self.active[nearest] = false;
        Some(nearest)
    }

    pub fn deactivate(&mut self, slot: usize) {
        if let Some(a) = self.active.get_mut(slot) {
            *a = false;
        }
    }

    /// Deactivate every slot, capacity is kept
    pub fn clear(&mut self) {
        self.active.iter_mut().for_each(|a| *a = false);
    }
}

fn farthest_from_origin(positions: &[NVec3]) -> usize {
    positions
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.norm_squared().total_cmp(&b.1.norm_squared()))
        .map(|(i, _)| i)
        .unwrap_or(0)
}
