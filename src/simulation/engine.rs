//! High-level runtime engine
//!
//! Couples the current surface, its evaluation domain and the mechanics
//! context. Replacing the surface clears every body, since a position on
//! the old surface means nothing on the new one

use log::{info, warn};

use crate::error::{MechanicsError, SurfaceError};
use crate::simulation::mechanics::Mechanics;
use crate::simulation::params::Parameters;
use crate::simulation::states::{NVec2, NVec3};
use crate::surface::function::{SurfaceFunction, SymbolicSurface};

pub const PARSE_OK: &str = "Parsed successfully";

/// Rectangular `(x, y)` region the surface is drawn over
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    pub x: (f64, f64), // (min, max)
    pub y: (f64, f64), // (min, max)
}

impl Domain {
    /// Build a domain, swapping bounds given in the wrong order
    pub fn new(x: (f64, f64), y: (f64, f64)) -> Self {
        let order = |(a, b): (f64, f64)| if a <= b { (a, b) } else { (b, a) };
        Self { x: order(x), y: order(y) }
    }

    pub fn center(&self) -> NVec2 {
        NVec2::new(0.5 * (self.x.0 + self.x.1), 0.5 * (self.y.0 + self.y.1))
    }

    /// Same centre, both extents multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        let c = self.center();
        let hx = 0.5 * (self.x.1 - self.x.0) * factor;
        let hy = 0.5 * (self.y.1 - self.y.0) * factor;
        Self::new((c.x - hx, c.x + hx), (c.y - hy, c.y + hy))
    }

    pub fn contains(&self, p: &NVec2) -> bool {
        (self.x.0..=self.x.1).contains(&p.x) && (self.y.0..=self.y.1).contains(&p.y)
    }
}

impl Default for Domain {
    fn default() -> Self {
        use std::f64::consts::PI;
        Self { x: (-PI, PI), y: (-PI, PI) }
    }
}

/// What the render side reads each frame
#[derive(Debug, Clone, Default)]
pub struct RenderSnapshot {
    pub positions: Vec<NVec3>,
    pub velocities: Vec<NVec3>,
    pub masses: Vec<f64>,
    pub active: usize,
    pub capacity: usize,
}

#[derive(Debug, Clone)]
pub struct Engine {
    surface: SymbolicSurface,
    domain: Domain,
    mechanics: Mechanics,
    pub z_correction: bool, // snap bodies back onto the surface every step
    status: String,         // last parser message
}

impl Engine {
    pub fn new(
        expression: &str,
        domain: Domain,
        parameters: Parameters,
        z_correction: bool,
    ) -> Result<Self, SurfaceError> {
        let surface = SymbolicSurface::parse(expression)?;
        info!("engine: surface z = {}", surface.function());

        Ok(Self {
            surface,
            domain,
            mechanics: Mechanics::new(parameters),
            z_correction,
            status: PARSE_OK.to_string(),
        })
    }

    pub fn surface(&self) -> &SymbolicSurface {
        &self.surface
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn set_domain(&mut self, x: (f64, f64), y: (f64, f64)) {
        self.domain = Domain::new(x, y);
    }

    pub fn mechanics(&self) -> &Mechanics {
        &self.mechanics
    }

    pub fn mechanics_mut(&mut self) -> &mut Mechanics {
        &mut self.mechanics
    }

    /// Message from the last expression update
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Replace the surface with a new formula
    ///
    /// On success every body is cleared. On failure the previous surface and
    /// bodies stay untouched and the error message becomes the status
    pub fn set_expression(&mut self, expression: &str) -> Result<&str, SurfaceError> {
        match SymbolicSurface::parse(expression) {
            Ok(surface) => {
                info!("engine: surface replaced, z = {}", surface.function());
                self.surface = surface;
                self.mechanics.clear();
                self.status = PARSE_OK.to_string();
                Ok(&self.status)
            }
            Err(err) => {
                warn!("engine: keeping previous surface, {err}");
                self.status = err.to_string();
                Err(err)
            }
        }
    }

    /// Lift `(x, y)` onto the surface
    pub fn lift(&self, x: f64, y: f64) -> NVec3 {
        NVec3::new(x, y, self.surface.value_at(x, y))
    }

    /// Drop a body of `mass` onto the surface above `(x, y)`
    pub fn add_body_at(&mut self, x: f64, y: f64, mass: f64) -> Result<usize, MechanicsError> {
        let position = self.lift(x, y);
        self.mechanics.add_body(position, mass)
    }

    /// Remove the body nearest to the surface point above `(x, y)`
    pub fn remove_nearest_at(&mut self, x: f64, y: f64) -> Option<usize> {
        let position = self.lift(x, y);
        self.mechanics.remove_nearest(&position)
    }

    pub fn clear(&mut self) {
        self.mechanics.clear();
    }

    /// Advance the simulation by `dt`
    pub fn step(&mut self, dt: f64) {
        self.mechanics.update(dt, &self.surface, self.z_correction);
    }

    /// Pretty-printed function and derivatives for display
    pub fn derivative_listing(&self) -> Vec<(&'static str, String)> {
        self.surface.listing()
    }

    pub fn snapshot(&self) -> RenderSnapshot {
        RenderSnapshot {
            positions: self.mechanics.get_active_positions(),
            velocities: self.mechanics.get_active_velocities(),
            masses: self.mechanics.get_active_masses(),
            active: self.mechanics.get_active_count(),
            capacity: self.mechanics.get_capacity(),
        }
    }
}
