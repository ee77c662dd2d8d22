pub mod expr;
pub mod parser;
pub mod diff;
pub mod function;
pub mod numeric;
