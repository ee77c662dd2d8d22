pub mod states;
pub mod params;
pub mod forces;
pub mod integrator;
pub mod mechanics;
pub mod engine;
pub mod scenario;
