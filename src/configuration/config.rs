//! Configuration types for loading simulation scenarios from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! scenario. A scenario consists of:
//!
//! - [`SurfaceConfig`] – the formula and the domain it is drawn over
//! - [`PhysicsConfig`] – gravity, friction and body store settings
//! - [`RunConfig`]     – step size, step count and viewer toggle
//! - [`BodyConfig`]    – initial state for each body
//! - [`ScenarioConfig`] – top-level wrapper used to load a scenario from YAML
//!
//! # YAML format
//!
//! ```yaml
//! surface:
//!   expression: "sin(x + y)"
//!   x_domain: [-3.14159, 3.14159]
//!   y_domain: [-3.14159, 3.14159]
//!   presets:                   # optional, cycled with Tab in the viewer
//!     - "x^2 - y^2"
//!     - "cos(x*y)"
//!
//! physics:
//!   gravity: 25.0              # m/s^2, along -z
//!   friction: 0.2              # kinetic coefficient
//!   capacity: 32               # initial slots, also the growth step
//!   capacity_policy: grow      # or evict_farthest
//!   z_correction: true
//!
//! run:
//!   dt: 0.01
//!   steps: 500
//!   viewer: false
//!
//! bodies:
//!   - xy: [0.5, 0.5]
//!     mass: 10.0
//!   - xy: [-1.0, 0.0]
//!     mass: 5.0
//!     v: [0.0, 2.0, 0.0]       # optional launch velocity
//! ```
//!
//! Body heights are not given: each body is placed on the surface above its
//! `xy` point when the scenario is built.

use serde::Deserialize;

use crate::simulation::states::CapacityPolicy;

fn default_domain() -> [f64; 2] {
    [-std::f64::consts::PI, std::f64::consts::PI]
}

fn default_true() -> bool {
    true
}

/// Surface formula and drawing domain
#[derive(Deserialize, Debug, Clone)]
pub struct SurfaceConfig {
    pub expression: String, // formula in x and y
    #[serde(default = "default_domain")]
    pub x_domain: [f64; 2], // [min, max] along x
    #[serde(default = "default_domain")]
    pub y_domain: [f64; 2], // [min, max] along y
    #[serde(default)]
    pub presets: Vec<String>, // more formulas to cycle through in the viewer
}

/// Physical parameters and body store settings
#[derive(Deserialize, Debug, Clone)]
pub struct PhysicsConfig {
    pub gravity: f64,  // gravity magnitude (m/s^2)
    pub friction: f64, // kinetic friction coefficient
    pub capacity: Option<usize>, // initial body slots, default 32
    #[serde(default)]
    pub capacity_policy: CapacityPolicy, // `grow` (default) or `evict_farthest`
    #[serde(default = "default_true")]
    pub z_correction: bool, // snap bodies back onto the surface each step
}

/// How long and how finely to run
#[derive(Deserialize, Debug, Clone)]
pub struct RunConfig {
    pub dt: f64,      // fixed time step (s)
    pub steps: usize, // number of steps for headless runs
    #[serde(default)]
    pub viewer: bool, // open the 3D viewer instead of running headless
}

/// Configuration for a single body's initial state
#[derive(Deserialize, Debug, Clone)]
pub struct BodyConfig {
    pub xy: [f64; 2],         // drop point, height comes from the surface
    pub mass: f64,            // mass (kg)
    pub v: Option<[f64; 3]>,  // initial velocity, at rest when missing
}

/// Top-level scenario configuration loaded from YAML.
#[derive(Deserialize, Debug, Clone)]
pub struct ScenarioConfig {
    pub surface: SurfaceConfig, // formula and domain
    pub physics: PhysicsConfig, // physical parameters
    pub run: RunConfig,         // stepping settings
    #[serde(default)]
    pub bodies: Vec<BodyConfig>, // initial bodies, may be empty
}
