pub mod linalg;
pub mod evaluator;
