//! Concrete evaluation over an explicit pair of state rows.

use crate::error::{TermError, TermResult};
use crate::signature::StateRow;
use crate::term::{Op, Stage, Term};
use crate::value::{absolute, negate, Value};
use indexmap::IndexMap;
use num::{BigInt, BigRational, Integer, Signed, Zero};

/// The two adjacent rows a formula is evaluated against, plus rigid
/// constants. `next` is absent when evaluating one-state formulas.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub curr: &'a StateRow,
    pub next: Option<&'a StateRow>,
    pub constants: &'a IndexMap<String, Value>,
}

impl<'a> Frame<'a> {
    pub fn single(curr: &'a StateRow, constants: &'a IndexMap<String, Value>) -> Self {
        Self {
            curr,
            next: None,
            constants,
        }
    }

    pub fn step(
        curr: &'a StateRow,
        next: &'a StateRow,
        constants: &'a IndexMap<String, Value>,
    ) -> Self {
        Self {
            curr,
            next: Some(next),
            constants,
        }
    }
}

/// Evaluate a macro-free term.
pub fn eval(term: &Term, frame: &Frame<'_>) -> TermResult<Value> {
    Evaluator {
        frame,
        locals: Vec::new(),
    }
    .eval(term)
}

/// Evaluate a formula to a boolean.
pub fn eval_bool(term: &Term, frame: &Frame<'_>) -> TermResult<bool> {
    eval(term, frame)?
        .as_bool()
        .ok_or_else(|| TermError::eval(format!("`{}` is not a formula", term)))
}

struct Evaluator<'f, 'a> {
    frame: &'f Frame<'a>,
    locals: Vec<(String, Value)>,
}

impl Evaluator<'_, '_> {
    fn eval(&mut self, term: &Term) -> TermResult<Value> {
        match term {
            Term::Lit(v) => Ok(v.clone()),
            Term::State(v) => {
                let row = match v.stage {
                    Stage::Curr => self.frame.curr,
                    Stage::Next => self.frame.next.ok_or_else(|| {
                        TermError::eval(format!("`{}` needs a successor state", term))
                    })?,
                };
                row.get(&v.name)
                    .cloned()
                    .ok_or_else(|| TermError::eval(format!("no value for `{}`", term)))
            }
            Term::Local(name) => self
                .locals
                .iter()
                .rev()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| TermError::UnboundName { name: name.clone() }),
            Term::Const(name) => self
                .frame
                .constants
                .get(name)
                .cloned()
                .ok_or_else(|| TermError::eval(format!("no value for constant `{}`", name))),
            Term::Call(name, _) => Err(TermError::UnboundMacro { name: name.clone() }),
            Term::Let(bindings, body) => {
                let values = bindings
                    .iter()
                    .map(|(n, v)| Ok((n.clone(), self.eval(v)?)))
                    .collect::<TermResult<Vec<_>>>()?;
                let mark = self.locals.len();
                self.locals.extend(values);
                let result = self.eval(body);
                self.locals.truncate(mark);
                result
            }
            Term::App(op, args) => self.eval_app(term, *op, args),
        }
    }

    fn eval_bool(&mut self, term: &Term) -> TermResult<bool> {
        self.eval(term)?
            .as_bool()
            .ok_or_else(|| TermError::eval(format!("`{}` is not Bool", term)))
    }

    fn eval_app(&mut self, term: &Term, op: Op, args: &[Term]) -> TermResult<Value> {
        match op {
            Op::Not => Ok(Value::Bool(!self.eval_bool(arg(term, args, 0)?)?)),
            Op::And => {
                for a in args {
                    if !self.eval_bool(a)? {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            Op::Or => {
                for a in args {
                    if self.eval_bool(a)? {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            Op::Implies => {
                let values = self.eval_bools(args)?;
                let result = values
                    .iter()
                    .rev()
                    .skip(1)
                    .fold(values.last().copied().unwrap_or(true), |acc, &a| !a || acc);
                Ok(Value::Bool(result))
            }
            Op::Xor => {
                let values = self.eval_bools(args)?;
                Ok(Value::Bool(values.iter().fold(false, |acc, &b| acc ^ b)))
            }
            Op::Ite => {
                if self.eval_bool(arg(term, args, 0)?)? {
                    self.eval(arg(term, args, 1)?)
                } else {
                    self.eval(arg(term, args, 2)?)
                }
            }
            Op::Eq => {
                let values = self.eval_all(args)?;
                Ok(Value::Bool(
                    values.windows(2).all(|w| w[0].semantic_eq(&w[1])),
                ))
            }
            Op::Distinct => {
                let values = self.eval_all(args)?;
                let all_distinct = values.iter().enumerate().all(|(i, a)| {
                    values[i + 1..].iter().all(|b| !a.semantic_eq(b))
                });
                Ok(Value::Bool(all_distinct))
            }
            Op::Lt | Op::Le | Op::Gt | Op::Ge => {
                let values = self.eval_rationals(term, args)?;
                let holds = values.windows(2).all(|w| match op {
                    Op::Lt => w[0] < w[1],
                    Op::Le => w[0] <= w[1],
                    Op::Gt => w[0] > w[1],
                    _ => w[0] >= w[1],
                });
                Ok(Value::Bool(holds))
            }
            Op::Add | Op::Sub | Op::Mul => {
                let values = self.eval_all(args)?;
                fold_arith(term, op, values)
            }
            Op::Neg => {
                let v = self.eval(arg(term, args, 0)?)?;
                negate(&v).ok_or_else(|| TermError::eval(format!("`{}` is not numeric", term)))
            }
            Op::Abs => {
                let v = self.eval(arg(term, args, 0)?)?;
                absolute(&v).ok_or_else(|| TermError::eval(format!("`{}` is not numeric", term)))
            }
            Op::Div => {
                let values = self.eval_rationals(term, args)?;
                let mut iter = values.into_iter();
                let mut acc = iter
                    .next()
                    .ok_or_else(|| TermError::eval(format!("`{}` has no operands", term)))?;
                for d in iter {
                    if d.is_zero() {
                        return Err(TermError::eval(format!("division by zero in `{}`", term)));
                    }
                    acc /= d;
                }
                Ok(Value::Real(acc))
            }
            Op::IntDiv | Op::Mod => {
                let a = self.eval_int(term, arg(term, args, 0)?)?;
                let b = self.eval_int(term, arg(term, args, 1)?)?;
                if b.is_zero() {
                    return Err(TermError::eval(format!("division by zero in `{}`", term)));
                }
                // Euclidean: the remainder is always in [0, |b|).
                let r = a.mod_floor(&b.abs());
                if op == Op::Mod {
                    Ok(Value::Int(r))
                } else {
                    Ok(Value::Int((a - &r) / b))
                }
            }
            Op::ToReal => {
                let v = self.eval(arg(term, args, 0)?)?;
                Ok(v.to_real())
            }
            Op::ToInt => {
                let v = self.eval(arg(term, args, 0)?)?;
                let r = v
                    .as_rational()
                    .ok_or_else(|| TermError::eval(format!("`{}` is not numeric", term)))?;
                Ok(Value::Int(r.floor().to_integer()))
            }
        }
    }

    fn eval_all(&mut self, args: &[Term]) -> TermResult<Vec<Value>> {
        args.iter().map(|a| self.eval(a)).collect()
    }

    fn eval_bools(&mut self, args: &[Term]) -> TermResult<Vec<bool>> {
        args.iter().map(|a| self.eval_bool(a)).collect()
    }

    fn eval_rationals(&mut self, term: &Term, args: &[Term]) -> TermResult<Vec<BigRational>> {
        args.iter()
            .map(|a| {
                self.eval(a)?
                    .as_rational()
                    .ok_or_else(|| TermError::eval(format!("non-numeric operand in `{}`", term)))
            })
            .collect()
    }

    fn eval_int(&mut self, term: &Term, arg: &Term) -> TermResult<BigInt> {
        match self.eval(arg)? {
            Value::Int(n) => Ok(n),
            _ => Err(TermError::eval(format!("non-integer operand in `{}`", term))),
        }
    }
}

fn arg<'t>(term: &Term, args: &'t [Term], i: usize) -> TermResult<&'t Term> {
    args.get(i)
        .ok_or_else(|| TermError::eval(format!("missing operand {} in `{}`", i, term)))
}

/// Left fold of `+`, `-` or `*`. Stays in Int unless an operand is Real.
fn fold_arith(term: &Term, op: Op, values: Vec<Value>) -> TermResult<Value> {
    let all_int = values.iter().all(|v| matches!(v, Value::Int(_)));
    if all_int {
        let mut ints = values.into_iter().filter_map(|v| match v {
            Value::Int(n) => Some(n),
            _ => None,
        });
        let first = ints
            .next()
            .ok_or_else(|| TermError::eval(format!("`{}` has no operands", term)))?;
        let result = ints.fold(first, |acc, n| match op {
            Op::Add => acc + n,
            Op::Sub => acc - n,
            _ => acc * n,
        });
        return Ok(Value::Int(result));
    }
    let rationals = values
        .iter()
        .map(|v| {
            v.as_rational()
                .ok_or_else(|| TermError::eval(format!("non-numeric operand in `{}`", term)))
        })
        .collect::<TermResult<Vec<_>>>()?;
    let mut iter = rationals.into_iter();
    let first = iter
        .next()
        .ok_or_else(|| TermError::eval(format!("`{}` has no operands", term)))?;
    let result = iter.fold(first, |acc, r| match op {
        Op::Add => acc + r,
        Op::Sub => acc - r,
        _ => acc * r,
    });
    Ok(Value::Real(result))
}
