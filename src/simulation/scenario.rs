//! Build fully-initialized simulation scenarios from configuration
//!
//! Takes a `ScenarioConfig` (YAML-facing) and produces the runtime bundle
//! `Scenario`, containing:
//! - the engine (surface, domain, mechanics with bodies at t = 0)
//! - the stepping settings (`dt`, step count, viewer toggle)
//!
//! The scenario is inserted into Bevy as a `Resource` and consumed by the
//! stepping and visualization systems, or run headless from `main`.
//!
//! It also owns the list of formulas the viewer cycles through and a
//! revision counter bumped whenever the drawn surface or domain changes

use anyhow::{Context, Result};
use bevy::prelude::Resource;
use log::{info, warn};

use crate::configuration::config::{BodyConfig, ScenarioConfig};
use crate::error::SurfaceError;
use crate::simulation::engine::{Domain, Engine};
use crate::simulation::params::Parameters;
use crate::simulation::states::NVec3;

/// Runtime stepping settings
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub dt: f64,
    pub steps: usize,
    pub viewer: bool,
}

/// Bevy resource representing a fully-initialized scenario
#[derive(Resource, Debug)]
pub struct Scenario {
    pub engine: Engine,
    pub run: RunSettings,
    pub t: f64,            // simulated time so far
    pub revision: u64,     // bumped when the surface or domain changes
    surfaces: Vec<String>, // scenario formula followed by its presets
    surface_index: usize,  // entry of `surfaces` currently loaded
}

impl Scenario {
    pub fn build_scenario(cfg: ScenarioConfig) -> Result<Self> {
        // Parameters (runtime) from PhysicsConfig
        let p_cfg = &cfg.physics;
        let defaults = Parameters::default();
        let parameters = Parameters {
            gravity: p_cfg.gravity,
            friction: p_cfg.friction,
            capacity: p_cfg.capacity.unwrap_or(defaults.capacity),
            capacity_policy: p_cfg.capacity_policy,
        };
        parameters.validate().context("invalid physics settings")?;

        let s_cfg = &cfg.surface;
        let domain = Domain::new(
            (s_cfg.x_domain[0], s_cfg.x_domain[1]),
            (s_cfg.y_domain[0], s_cfg.y_domain[1]),
        );

        let mut engine = Engine::new(&s_cfg.expression, domain, parameters, p_cfg.z_correction)
            .with_context(|| format!("invalid surface expression `{}`", s_cfg.expression))?;

        // Bodies: drop each one onto the surface above its xy point
        for (i, bc) in cfg.bodies.iter().enumerate() {
            add_configured_body(&mut engine, bc)
                .with_context(|| format!("invalid body #{i} in scenario"))?;
        }

        if !(cfg.run.dt.is_finite() && cfg.run.dt > 0.0) {
            anyhow::bail!("run.dt must be finite and > 0, got {}", cfg.run.dt);
        }

        info!(
            "scenario: {} bodies on z = {}, dt = {}",
            engine.mechanics().get_active_count(),
            engine.surface().function(),
            cfg.run.dt
        );

        Ok(Self {
            engine,
            run: RunSettings {
                dt: cfg.run.dt,
                steps: cfg.run.steps,
                viewer: cfg.run.viewer,
            },
            t: 0.0,
            revision: 0,
            surfaces: std::iter::once(s_cfg.expression.clone())
                .chain(s_cfg.presets.iter().cloned())
                .collect(),
            surface_index: 0,
        })
    }

    /// Formulas available to `next_surface`, in cycling order
    pub fn surfaces(&self) -> &[String] {
        &self.surfaces
    }

    /// Load the next formula of the scenario's list
    ///
    /// Bodies are cleared on success. A formula that fails leaves the current
    /// surface and bodies in place, the list still moves past it
    pub fn next_surface(&mut self) -> Result<(), SurfaceError> {
        if self.surfaces.len() < 2 {
            return Ok(());
        }
        self.surface_index = (self.surface_index + 1) % self.surfaces.len();
        let expression = self.surfaces[self.surface_index].clone();

        let result = self.engine.set_expression(&expression).map(|_| ());
        match &result {
            Ok(()) => {
                self.revision += 1;
                info!("scenario: {}", self.engine.status());
                for (label, text) in self.engine.derivative_listing() {
                    info!("  {label} {text}");
                }
            }
            Err(_) => warn!("scenario: {}", self.engine.status()),
        }
        result
    }

    /// Shrink (`factor < 1`) or grow the drawn domain about its centre
    pub fn zoom(&mut self, factor: f64) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        let d = self.engine.domain().scaled(factor);
        self.engine.set_domain(d.x, d.y);
        self.revision += 1;
        info!(
            "scenario: domain x [{:.3}, {:.3}], y [{:.3}, {:.3}]",
            d.x.0, d.x.1, d.y.0, d.y.1
        );
    }

    /// Advance one fixed step
    pub fn step(&mut self) {
        self.engine.step(self.run.dt);
        self.t += self.run.dt;
    }

    /// Run `run.steps` fixed steps
    pub fn run_headless(&mut self) {
        for _ in 0..self.run.steps {
            self.step();
        }
    }
}

fn add_configured_body(engine: &mut Engine, bc: &BodyConfig) -> Result<usize> {
    let [x, y] = bc.xy;
    let position = engine.lift(x, y);
    let velocity = bc.v.map(NVec3::from).unwrap_or_else(NVec3::zeros);

    let slot = engine
        .mechanics_mut()
        .add_body_with_velocity(position, velocity, bc.mass)?;
    Ok(slot)
}
