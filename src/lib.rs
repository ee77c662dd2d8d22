pub mod error;
pub mod surface;
pub mod geometry;
pub mod simulation;
pub mod configuration;
pub mod visualization;
pub mod benchmark;

pub use error::{MechanicsError, SurfaceError};

pub use surface::expr::{Expr, Func, Var};
pub use surface::parser::parse_expression;
pub use surface::function::{SurfaceFunction, SymbolicSurface};
pub use surface::numeric::FiniteDifferenceSurface;

pub use geometry::evaluator::{
    build_gradient_first, build_gradient_second, build_hessians, build_normals, build_values,
    directional_curvature,
};

pub use simulation::states::{BodyStore, CapacityPolicy, NVec2, NVec3};
pub use simulation::params::Parameters;
pub use simulation::forces::SurfaceForces;
pub use simulation::integrator::euler_integrator;
pub use simulation::mechanics::Mechanics;
pub use simulation::engine::{Domain, Engine, RenderSnapshot};
pub use simulation::scenario::{RunSettings, Scenario};

pub use configuration::config::{BodyConfig, PhysicsConfig, RunConfig, ScenarioConfig, SurfaceConfig};

pub use visualization::{surface_mesh::SurfaceMesh, viewer::{next_drop_mass, run_viewer}};

pub use benchmark::benchmark::{bench_curvature, bench_update};
