//! Sort checking and elaboration.
//!
//! Elaboration returns a copy of the term in which `Int` literals used as
//! `Real` operands have been replaced by the equal `Real` literal. Any other
//! mix of `Int` and `Real` is rejected.

use crate::error::{TermError, TermResult};
use crate::signature::StateSignature;
use crate::sort::Sort;
use crate::term::{Op, Term};
use crate::value::Value;
use indexmap::IndexMap;

/// Names visible to a term: state variables, declared constants and
/// enclosing locals.
pub struct SortContext<'a> {
    signature: &'a StateSignature,
    constants: &'a IndexMap<String, Sort>,
    locals: Vec<(String, Sort)>,
}

impl<'a> SortContext<'a> {
    pub fn new(signature: &'a StateSignature, constants: &'a IndexMap<String, Sort>) -> Self {
        Self {
            signature,
            constants,
            locals: Vec::new(),
        }
    }

    /// Bring locals into scope, e.g. macro parameters.
    pub fn with_locals(mut self, locals: impl IntoIterator<Item = (String, Sort)>) -> Self {
        self.locals.extend(locals);
        self
    }

    /// Check `term` and return its elaborated form and sort.
    pub fn elaborate(&mut self, term: &Term) -> TermResult<(Term, Sort)> {
        match term {
            Term::Lit(v) => Ok((term.clone(), v.sort())),
            Term::State(v) => {
                let sort = self
                    .signature
                    .sort_of(&v.name)
                    .ok_or_else(|| TermError::UnknownVariable {
                        name: v.name.clone(),
                    })?;
                Ok((term.clone(), sort))
            }
            Term::Local(name) => {
                let sort = self
                    .locals
                    .iter()
                    .rev()
                    .find(|(n, _)| n == name)
                    .map(|(_, s)| *s)
                    .ok_or_else(|| TermError::UnboundName { name: name.clone() })?;
                Ok((term.clone(), sort))
            }
            Term::Const(name) => {
                let sort = self
                    .constants
                    .get(name)
                    .copied()
                    .ok_or_else(|| TermError::UnboundName { name: name.clone() })?;
                Ok((term.clone(), sort))
            }
            Term::Call(name, _) => Err(TermError::UnboundMacro { name: name.clone() }),
            Term::Let(bindings, body) => {
                let mut elaborated = Vec::with_capacity(bindings.len());
                let mut scope = Vec::with_capacity(bindings.len());
                for (name, value) in bindings {
                    let (value, sort) = self.elaborate(value)?;
                    elaborated.push((name.clone(), value));
                    scope.push((name.clone(), sort));
                }
                let mark = self.locals.len();
                self.locals.extend(scope);
                let result = self.elaborate(body);
                self.locals.truncate(mark);
                let (body, sort) = result?;
                Ok((Term::Let(elaborated, Box::new(body)), sort))
            }
            Term::App(op, args) => {
                let args = args
                    .iter()
                    .map(|a| self.elaborate(a))
                    .collect::<TermResult<Vec<_>>>()?;
                check_app(term, *op, args)
            }
        }
    }
}

/// Sort of `term`, which must be closed except for state variables and
/// declared constants.
pub fn type_check(
    term: &Term,
    signature: &StateSignature,
    constants: &IndexMap<String, Sort>,
) -> TermResult<Sort> {
    SortContext::new(signature, constants)
        .elaborate(term)
        .map(|(_, sort)| sort)
}

/// Elaborate a formula and require sort `Bool`.
pub fn elaborate_formula(
    term: &Term,
    signature: &StateSignature,
    constants: &IndexMap<String, Sort>,
) -> TermResult<Term> {
    let (term, sort) = SortContext::new(signature, constants).elaborate(term)?;
    if sort != Sort::Bool {
        return Err(TermError::sort(&term, format!("expected Bool formula, found {}", sort)));
    }
    Ok(term)
}

fn check_app(original: &Term, op: Op, args: Vec<(Term, Sort)>) -> TermResult<(Term, Sort)> {
    let n = args.len();
    match op {
        Op::Not => {
            arity(op, n, 1, Some(1))?;
            let args = expect_all(original, args, Sort::Bool)?;
            Ok((Term::App(op, args), Sort::Bool))
        }
        Op::And | Op::Or => {
            arity(op, n, 1, None)?;
            let args = expect_all(original, args, Sort::Bool)?;
            Ok((Term::App(op, args), Sort::Bool))
        }
        Op::Implies | Op::Xor => {
            arity(op, n, 2, None)?;
            let args = expect_all(original, args, Sort::Bool)?;
            Ok((Term::App(op, args), Sort::Bool))
        }
        Op::Eq | Op::Distinct => {
            arity(op, n, 2, None)?;
            let (args, _) = unify(original, args)?;
            Ok((Term::App(op, args), Sort::Bool))
        }
        Op::Ite => {
            arity(op, n, 3, Some(3))?;
            let mut args = args.into_iter();
            let (cond, cond_sort) = args.next().unwrap_or((Term::bool(true), Sort::Bool));
            if cond_sort != Sort::Bool {
                return Err(TermError::sort(
                    original,
                    format!("ite condition must be Bool, found {}", cond_sort),
                ));
            }
            let (branches, sort) = unify(original, args.collect())?;
            let mut all = vec![cond];
            all.extend(branches);
            Ok((Term::App(op, all), sort))
        }
        Op::Lt | Op::Le | Op::Gt | Op::Ge => {
            arity(op, n, 2, None)?;
            let (args, _) = unify_numeric(original, args)?;
            Ok((Term::App(op, args), Sort::Bool))
        }
        Op::Add | Op::Mul | Op::Sub => {
            arity(op, n, 2, None)?;
            let (args, sort) = unify_numeric(original, args)?;
            Ok((Term::App(op, args), sort))
        }
        Op::Neg | Op::Abs => {
            arity(op, n, 1, Some(1))?;
            let (args, sort) = unify_numeric(original, args)?;
            Ok((Term::App(op, args), sort))
        }
        Op::Div => {
            arity(op, n, 2, None)?;
            let args = coerce_all(original, args, Sort::Real)?;
            reject_zero_divisor(original, &args)?;
            Ok((Term::App(op, args), Sort::Real))
        }
        Op::IntDiv | Op::Mod => {
            arity(op, n, 2, Some(2))?;
            let args = expect_all(original, args, Sort::Int)?;
            reject_zero_divisor(original, &args)?;
            Ok((Term::App(op, args), Sort::Int))
        }
        Op::ToReal => {
            arity(op, n, 1, Some(1))?;
            let args = expect_all(original, args, Sort::Int)?;
            Ok((Term::App(op, args), Sort::Real))
        }
        Op::ToInt => {
            arity(op, n, 1, Some(1))?;
            let args = coerce_all(original, args, Sort::Real)?;
            Ok((Term::App(op, args), Sort::Int))
        }
    }
}

fn arity(op: Op, found: usize, min: usize, max: Option<usize>) -> TermResult<()> {
    let ok = found >= min && max.map_or(true, |m| found <= m);
    if ok {
        return Ok(());
    }
    let expected = match max {
        Some(m) if m == min => min.to_string(),
        Some(m) => format!("{} to {}", min, m),
        None => format!("at least {}", min),
    };
    Err(TermError::Arity {
        name: op.symbol().to_string(),
        expected,
        found,
    })
}

fn expect_all(original: &Term, args: Vec<(Term, Sort)>, sort: Sort) -> TermResult<Vec<Term>> {
    args.into_iter()
        .map(|(t, s)| {
            if s == sort {
                Ok(t)
            } else {
                Err(TermError::sort(
                    original,
                    format!("operand `{}` has sort {}, expected {}", t, s, sort),
                ))
            }
        })
        .collect()
}

/// Require every operand to have `target` sort, promoting Int literals when
/// the target is Real.
fn coerce_all(original: &Term, args: Vec<(Term, Sort)>, target: Sort) -> TermResult<Vec<Term>> {
    args.into_iter()
        .map(|(t, s)| coerce(original, t, s, target))
        .collect()
}

fn coerce(original: &Term, term: Term, sort: Sort, target: Sort) -> TermResult<Term> {
    if sort == target {
        return Ok(term);
    }
    match (&term, target) {
        (Term::Lit(v @ Value::Int(_)), Sort::Real) => Ok(Term::Lit(v.to_real())),
        _ => Err(TermError::sort(
            original,
            format!(
                "operand `{}` has sort {}, expected {}{}",
                term,
                sort,
                target,
                if sort == Sort::Int && target == Sort::Real {
                    " (use to_real)"
                } else {
                    ""
                }
            ),
        )),
    }
}

/// Operands of one numeric sort: Real if any operand is Real, else Int.
fn unify_numeric(original: &Term, args: Vec<(Term, Sort)>) -> TermResult<(Vec<Term>, Sort)> {
    if let Some((t, s)) = args.iter().find(|(_, s)| !s.is_numeric()) {
        return Err(TermError::sort(
            original,
            format!("operand `{}` has sort {}, expected a numeric sort", t, s),
        ));
    }
    let target = if args.iter().any(|(_, s)| *s == Sort::Real) {
        Sort::Real
    } else {
        Sort::Int
    };
    Ok((coerce_all(original, args, target)?, target))
}

/// Operands of one common sort, numeric literals coerced.
fn unify(original: &Term, args: Vec<(Term, Sort)>) -> TermResult<(Vec<Term>, Sort)> {
    if args.iter().all(|(_, s)| s.is_numeric()) {
        return unify_numeric(original, args);
    }
    let first = args.first().map(|(_, s)| *s).unwrap_or(Sort::Bool);
    if let Some((t, s)) = args.iter().find(|(_, s)| *s != first) {
        return Err(TermError::sort(
            original,
            format!("operand `{}` has sort {}, expected {}", t, s, first),
        ));
    }
    Ok((args.into_iter().map(|(t, _)| t).collect(), first))
}

fn reject_zero_divisor(original: &Term, args: &[Term]) -> TermResult<()> {
    for divisor in args.iter().skip(1) {
        if let Term::Lit(v) = divisor {
            if v.is_zero() {
                return Err(TermError::Domain {
                    term: original.to_string(),
                    message: "division by zero".to_string(),
                });
            }
        }
    }
    Ok(())
}
