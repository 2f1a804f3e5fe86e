//! Typed symbolic terms over Bool, Int and Real.
//!
//! Terms reference state variables at two timepoints (`curr`, `next`),
//! let-bound locals, rigid constants and, before inlining, macros. This
//! crate provides substitution, macro inlining, sort checking and a concrete
//! evaluator that threads both state rows explicitly.

pub mod check;
pub mod error;
pub mod eval;
pub mod inline;
pub mod signature;
pub mod sort;
pub mod subst;
pub mod term;
pub mod value;

pub use check::{elaborate_formula, type_check, SortContext};
pub use error::{TermError, TermResult};
pub use eval::{eval, eval_bool, Frame};
pub use inline::{inline_macros, Macro, MacroTable, MAX_INLINE_DEPTH};
pub use signature::{StateRow, StateSignature, Variable};
pub use sort::Sort;
pub use subst::{bump, substitute, substitute_locals, Mapping, VarRef};
pub use term::{Op, Stage, StateVar, Term};
pub use value::Value;
