//! Compilation of transition-system scripts into verification tasks.
//!
//! [`compile`] resolves names, closes the macro table, sort-checks every
//! formula and flattens subsystem composition. [`Program::task`] turns a
//! `verify` command into a [`VerificationTask`] for the induction engine.

pub mod compile;
pub mod error;
pub mod flatten;
pub mod program;
pub mod store;
pub mod system;

pub use compile::{compile, compile_source};
pub use error::{CompileError, CompileResult, SourceDiagnostic};
pub use flatten::{flatten, FlatSystem, Flattener};
pub use program::{Assumption, Goal, GoalKind, Program, VerificationTask, VerifyCommand};
pub use store::{Entry, Property, Relation, RelationMode, Store};
pub use system::{Actual, Instantiation, System};
