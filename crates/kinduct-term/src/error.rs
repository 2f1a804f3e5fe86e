//! Errors raised while building, checking or evaluating terms.

use thiserror::Error;

/// Term-level error. Callers attach the source location of the declaration
/// the term came from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TermError {
    /// Ill-sorted operator application.
    #[error("sort error in `{term}`: {message}")]
    Sort { term: String, message: String },

    /// Statically detectable domain violation, e.g. division by literal zero.
    #[error("domain error in `{term}`: {message}")]
    Domain { term: String, message: String },

    /// Wrong timepoint: `next` where only `curr` is allowed.
    #[error("stage error in `{term}`: {message}")]
    Stage { term: String, message: String },

    #[error("unbound macro '{name}'")]
    UnboundMacro { name: String },

    #[error("macro inlining did not terminate within depth {depth}: {}", chain.join(" -> "))]
    MacroCycle { chain: Vec<String>, depth: usize },

    #[error("'{name}' expects {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: String,
        found: usize,
    },

    /// Staged reference to a variable missing from the signature.
    #[error("unknown state variable '{name}'")]
    UnknownVariable { name: String },

    /// Free local or constant with no binding.
    #[error("unbound name '{name}'")]
    UnboundName { name: String },

    #[error("duplicate variable '{name}' in signature")]
    DuplicateVariable { name: String },

    /// Runtime failure of the concrete evaluator.
    #[error("evaluation error: {message}")]
    Eval { message: String },
}

impl TermError {
    pub(crate) fn sort(term: &impl ToString, message: impl Into<String>) -> Self {
        TermError::Sort {
            term: term.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn eval(message: impl Into<String>) -> Self {
        TermError::Eval {
            message: message.into(),
        }
    }
}

pub type TermResult<T> = Result<T, TermError>;
