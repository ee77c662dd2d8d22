//! Finite-difference surface provider
//!
//! Wraps any `Fn(x, y) -> z` and approximates the partials with central
//! differences of step `h`. Accuracy is O(h^2) away from singularities and
//! degrades near them (e.g. the rim of a hemisphere), where the symbolic
//! provider should be preferred

use crate::simulation::states::NVec2;
use crate::surface::function::SurfaceFunction;

pub const DEFAULT_STEP: f64 = 1e-4;

pub struct FiniteDifferenceSurface<F>
where
    F: Fn(f64, f64) -> f64 + Send + Sync,
{
    f: F,
    h: f64,
}

impl<F> FiniteDifferenceSurface<F>
where
    F: Fn(f64, f64) -> f64 + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f, h: DEFAULT_STEP }
    }

    /// Use a custom difference step, must be > 0
    pub fn with_step(mut self, h: f64) -> Self {
        if h > 0.0 && h.is_finite() {
            self.h = h;
        }
        self
    }

    pub fn step(&self) -> f64 {
        self.h
    }

    fn map(&self, points: &[NVec2], g: impl Fn(f64, f64) -> f64) -> Vec<f64> {
        points.iter().map(|p| g(p.x, p.y)).collect()
    }
}

impl<F> SurfaceFunction for FiniteDifferenceSurface<F>
where
    F: Fn(f64, f64) -> f64 + Send + Sync,
{
    fn evaluate(&self, points: &[NVec2]) -> Vec<f64> {
        self.map(points, |x, y| (self.f)(x, y))
    }

    fn gradient_x(&self, points: &[NVec2]) -> Vec<f64> {
        let h = self.h;
        self.map(points, |x, y| ((self.f)(x + h, y) - (self.f)(x - h, y)) / (2.0 * h))
    }

    fn gradient_y(&self, points: &[NVec2]) -> Vec<f64> {
        let h = self.h;
        self.map(points, |x, y| ((self.f)(x, y + h) - (self.f)(x, y - h)) / (2.0 * h))
    }

    fn hessian_xx(&self, points: &[NVec2]) -> Vec<f64> {
        let h = self.h;
        self.map(points, |x, y| {
            ((self.f)(x + h, y) - 2.0 * (self.f)(x, y) + (self.f)(x - h, y)) / (h * h)
        })
    }

    fn hessian_yy(&self, points: &[NVec2]) -> Vec<f64> {
        let h = self.h;
        self.map(points, |x, y| {
            ((self.f)(x, y + h) - 2.0 * (self.f)(x, y) + (self.f)(x, y - h)) / (h * h)
        })
    }

    fn hessian_xy(&self, points: &[NVec2]) -> Vec<f64> {
        let h = self.h;
        self.map(points, |x, y| {
            ((self.f)(x + h, y + h) - (self.f)(x + h, y - h) - (self.f)(x - h, y + h)
                + (self.f)(x - h, y - h))
                / (4.0 * h * h)
        })
    }
}
