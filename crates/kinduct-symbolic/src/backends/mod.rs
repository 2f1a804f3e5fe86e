//! Solver backends.

pub mod z3_backend;

pub use z3_backend::{Z3Error, Z3Factory, Z3Solver};
