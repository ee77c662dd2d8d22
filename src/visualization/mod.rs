pub mod surface_mesh;
pub mod viewer;
