//! Surface providers: everything the physics needs to know about `f(x, y)`
//!
//! The core never looks at formulas. It only calls the batch evaluation
//! methods of [`SurfaceFunction`], which take a slice of `(x, y)` points and
//! return one value per point

use log::debug;

use crate::error::SurfaceError;
use crate::simulation::states::NVec2;
use crate::surface::diff::derivative;
use crate::surface::expr::{Expr, Var};
use crate::surface::parser::parse_expression;

/// Largest derivative tree accepted before giving up on a formula
const MAX_DERIVATIVE_NODES: usize = 200_000;

/// Batch evaluation interface of a surface `z = f(x, y)`
///
/// Every method should return one entry per input point. `evaluate` may also
/// return a single broadcast value for a constant formula, which
/// `build_values` expands to the batch length
pub trait SurfaceFunction: Send + Sync {
    fn evaluate(&self, points: &[NVec2]) -> Vec<f64>;
    fn gradient_x(&self, points: &[NVec2]) -> Vec<f64>;
    fn gradient_y(&self, points: &[NVec2]) -> Vec<f64>;
    fn hessian_xx(&self, points: &[NVec2]) -> Vec<f64>;
    fn hessian_yy(&self, points: &[NVec2]) -> Vec<f64>;
    fn hessian_xy(&self, points: &[NVec2]) -> Vec<f64>;

    /// Single point convenience wrapper around [`SurfaceFunction::evaluate`]
    fn value_at(&self, x: f64, y: f64) -> f64 {
        self.evaluate(&[NVec2::new(x, y)])
            .first()
            .copied()
            .unwrap_or(0.0)
    }
}

fn sample(expr: &Expr, points: &[NVec2]) -> Vec<f64> {
    points.iter().map(|p| expr.eval(p.x, p.y)).collect()
}

/// Parsed formula together with its symbolic partial derivatives
#[derive(Debug, Clone)]
pub struct SymbolicSurface {
    source: String,
    f: Expr,
    fx: Expr,
    fy: Expr,
    fxx: Expr,
    fyy: Expr,
    fxy: Expr,
}

impl SymbolicSurface {
    /// Parse `text` and derive fx, fy, fxx, fyy and fxy
    pub fn parse(text: &str) -> Result<Self, SurfaceError> {
        let f = parse_expression(text)?;

        let fx = derivative(&f, Var::X);
        let fy = derivative(&f, Var::Y);
        let fxx = derivative(&fx, Var::X);
        let fyy = derivative(&fy, Var::Y);
        // mixed partial taken from fy
        let fxy = derivative(&fy, Var::X);

        for (label, d) in [("fxx", &fxx), ("fyy", &fyy), ("fxy", &fxy)] {
            if d.size() > MAX_DERIVATIVE_NODES {
                return Err(SurfaceError::Derivation(format!(
                    "{label} has {} terms, limit is {MAX_DERIVATIVE_NODES}",
                    d.size()
                )));
            }
        }

        debug!("derived `{}`: fx = {}, fy = {}", text, fx, fy);

        Ok(Self {
            source: text.to_string(),
            f,
            fx,
            fy,
            fxx,
            fyy,
            fxy,
        })
    }

    /// The text the surface was parsed from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn function(&self) -> &Expr {
        &self.f
    }

    /// Pure partial derivative of order 1 or 2 with respect to `var`
    pub fn partial(&self, var: Var, order: u8) -> Option<&Expr> {
        match (var, order) {
            (Var::X, 1) => Some(&self.fx),
            (Var::X, 2) => Some(&self.fxx),
            (Var::Y, 1) => Some(&self.fy),
            (Var::Y, 2) => Some(&self.fyy),
            _ => None,
        }
    }

    pub fn mixed_partial(&self) -> &Expr {
        &self.fxy
    }

    /// Display rows for the function and every derivative
    pub fn listing(&self) -> Vec<(&'static str, String)> {
        vec![
            ("f(x,y) =", self.f.to_string()),
            ("df/dx =", self.fx.to_string()),
            ("df/dy =", self.fy.to_string()),
            ("d2f/dx2 =", self.fxx.to_string()),
            ("d2f/dy2 =", self.fyy.to_string()),
            ("d2f/dxdy =", self.fxy.to_string()),
        ]
    }
}

impl SurfaceFunction for SymbolicSurface {
    fn evaluate(&self, points: &[NVec2]) -> Vec<f64> {
        sample(&self.f, points)
    }

    fn gradient_x(&self, points: &[NVec2]) -> Vec<f64> {
        sample(&self.fx, points)
    }

    fn gradient_y(&self, points: &[NVec2]) -> Vec<f64> {
        sample(&self.fy, points)
    }

    fn hessian_xx(&self, points: &[NVec2]) -> Vec<f64> {
        sample(&self.fxx, points)
    }

    fn hessian_yy(&self, points: &[NVec2]) -> Vec<f64> {
        sample(&self.fyy, points)
    }

    fn hessian_xy(&self, points: &[NVec2]) -> Vec<f64> {
        sample(&self.fxy, points)
    }
}
