//! Declared transition systems.

use kinduct_syntax::Span;
use kinduct_term::{Sort, StateSignature, Term};

/// A system as declared, before composition.
///
/// `init` references only `curr` variables of `signature`; `trans` may
/// reference both timepoints. Both are macro-free and sort-checked.
#[derive(Debug, Clone)]
pub struct System {
    pub name: String,
    pub signature: StateSignature,
    pub init: Term,
    pub trans: Term,
    pub instances: Vec<Instantiation>,
    /// Opaque comment lines from the source.
    pub doc: Vec<String>,
    pub span: Span,
}

/// One subsystem instantiation inside a parent system.
#[derive(Debug, Clone)]
pub struct Instantiation {
    /// Name of the instantiated system.
    pub system: String,
    /// Actual arguments over the parent's `curr` variables, positionally
    /// matching the subsystem's signature.
    pub actuals: Vec<Actual>,
    pub span: Span,
}

/// An elaborated actual argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Actual {
    pub term: Term,
    pub sort: Sort,
}
