//! Compilation errors and their source diagnostics.

use kinduct_syntax::{ParseError, Span};
use kinduct_term::{Sort, TermError};
use miette::{Diagnostic, NamedSource, SourceSpan};
use std::sync::Arc;
use thiserror::Error;

/// An error found while lowering or validating a script.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("in '{decl}': {source}")]
    Term {
        decl: String,
        source: TermError,
        span: Span,
    },

    #[error("duplicate definition of {kind} '{name}'")]
    DuplicateName {
        name: String,
        kind: &'static str,
        span: Span,
    },

    #[error("unknown sort '{name}'")]
    UnknownSort { name: String, span: Span },

    #[error("unknown name '{name}'")]
    UnknownName { name: String, span: Span },

    #[error("unknown system '{name}'")]
    UnknownSystem { name: String, span: Span },

    #[error("system '{system}' has no state variable '{name}'")]
    UnknownVariable {
        name: String,
        system: String,
        span: Span,
    },

    #[error("no property or relation named '{name}' is defined")]
    UnknownGoal { name: String, span: Span },

    #[error("'{name}' belongs to system '{owner}', not '{system}'")]
    WrongSystem {
        name: String,
        owner: String,
        system: String,
        span: Span,
    },

    #[error("in '{decl}': {message}")]
    Stage {
        decl: String,
        message: String,
        span: Span,
    },

    #[error("instantiation of '{system}' expects {expected} argument(s), got {found}")]
    Arity {
        system: String,
        expected: usize,
        found: usize,
        span: Span,
    },

    #[error(
        "argument {position} of '{system}' instantiation has sort {found}, expected {expected}"
    )]
    ArgumentSort {
        system: String,
        position: usize,
        expected: Sort,
        found: Sort,
        span: Span,
    },

    #[error("subsystem cycle: {}", path.join(" -> "))]
    CompositionCycle { path: Vec<String>, span: Span },
}

impl CompileError {
    /// Get the source span of this error.
    pub fn span(&self) -> Span {
        match self {
            CompileError::Parse(e) => e.span(),
            CompileError::Term { span, .. }
            | CompileError::DuplicateName { span, .. }
            | CompileError::UnknownSort { span, .. }
            | CompileError::UnknownName { span, .. }
            | CompileError::UnknownSystem { span, .. }
            | CompileError::UnknownVariable { span, .. }
            | CompileError::UnknownGoal { span, .. }
            | CompileError::WrongSystem { span, .. }
            | CompileError::Stage { span, .. }
            | CompileError::Arity { span, .. }
            | CompileError::ArgumentSort { span, .. }
            | CompileError::CompositionCycle { span, .. } => *span,
        }
    }

    /// Render this error against its source text.
    pub fn diagnostic(&self, filename: &str, source: Arc<String>) -> SourceDiagnostic {
        let span = self.span();
        let code = match self {
            CompileError::Parse(_) => "kinduct::parse_error",
            CompileError::Term { .. } => "kinduct::term_error",
            CompileError::CompositionCycle { .. } => "kinduct::composition_cycle",
            _ => "kinduct::reference_error",
        };
        SourceDiagnostic {
            message: self.to_string(),
            code,
            src: NamedSource::new(filename, source),
            span: (span.start, span.len()).into(),
        }
    }
}

/// A compile error with source context for pretty printing.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SourceDiagnostic {
    pub message: String,
    code: &'static str,
    src: NamedSource<Arc<String>>,
    span: SourceSpan,
}

impl Diagnostic for SourceDiagnostic {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        Some(Box::new(self.code))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.src)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(miette::LabeledSpan::new_with_span(
            Some("here".to_string()),
            self.span,
        ))))
    }
}

pub type CompileResult<T> = Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;
    use miette::Diagnostic;

    #[test]
    fn test_diagnostic_points_at_span() {
        let source = Arc::new("(verify nowhere ())".to_string());
        let err = CompileError::UnknownSystem {
            name: "nowhere".into(),
            span: Span::new(8, 15, 1, 9),
        };
        let diag = err.diagnostic("test.kin", source);
        assert_eq!(diag.message, "unknown system 'nowhere'");
        let labels: Vec<_> = diag.labels().into_iter().flatten().collect();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].offset(), 8);
        assert_eq!(labels[0].len(), 7);
        assert!(diag.code().is_some());
    }
}
