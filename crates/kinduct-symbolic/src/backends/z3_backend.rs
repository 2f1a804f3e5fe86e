use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use num::{BigInt, BigRational};
use thiserror::Error;
use tracing::debug;
use z3::ast::{Bool, Int, Real};
use z3::SatResult as Z3SatResult;

use crate::smt::{SmtTerm, SmtVar};
use crate::solver::{Model, SatResult, SmtSolver, SolverFactory};
use crate::CancelToken;
use kinduct_term::{Op, Sort, Value};

/// Decimal places kept when an algebraic model value is approximated.
const APPROX_DIGITS: usize = 20;

/// How often a running check looks at its cancel token.
const WATCH_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum Z3Error {
    #[error("Z3 error: {0}")]
    Internal(String),
    #[error("unknown variable: {0}")]
    UnknownVariable(String),
    #[error("sort mismatch in `{op}`: {message}")]
    SortMismatch { op: String, message: String },
    #[error("unreadable model value `{text}` for {var}")]
    ModelValue { var: String, text: String },
}

/// A Z3 session on the calling thread's context.
pub struct Z3Solver {
    solver: z3::Solver,
    vars: HashMap<SmtVar, Z3Term>,
    params: Option<z3::Params>,
    cancel: Option<CancelToken>,
}

impl Z3Solver {
    pub fn new() -> Self {
        Self {
            solver: z3::Solver::new(),
            vars: HashMap::new(),
            params: None,
            cancel: None,
        }
    }

    pub fn with_timeout_ms(timeout_ms: u64) -> Self {
        if timeout_ms == 0 {
            return Self::new();
        }
        let solver = z3::Solver::new();
        let mut params = z3::Params::new();
        let timeout = u32::try_from(timeout_ms).unwrap_or(u32::MAX);
        params.set_u32("timeout", timeout);
        solver.set_params(&params);
        Self {
            solver,
            vars: HashMap::new(),
            params: Some(params),
            cancel: None,
        }
    }

    /// Checks run on a watcher thread's clock: once `cancel` fires, the
    /// context is interrupted and the check answers `unknown`.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn translate(&self, term: &SmtTerm) -> Result<Z3Term, Z3Error> {
        match term {
            SmtTerm::Var(var) => self
                .vars
                .get(var)
                .cloned()
                .ok_or_else(|| Z3Error::UnknownVariable(var.symbol())),
            SmtTerm::Lit(value) => literal(value),
            SmtTerm::App(op, args) => {
                let args = args
                    .iter()
                    .map(|a| self.translate(a))
                    .collect::<Result<Vec<_>, _>>()?;
                apply(*op, args)
            }
        }
    }
}

impl Default for Z3Solver {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
enum Z3Term {
    Bool(Bool),
    Int(Int),
    Real(Real),
}

impl Z3Term {
    fn into_bool(self, op: Op) -> Result<Bool, Z3Error> {
        match self {
            Z3Term::Bool(b) => Ok(b),
            _ => Err(mismatch(op, "expected Bool")),
        }
    }
}

fn mismatch(op: Op, message: &str) -> Z3Error {
    Z3Error::SortMismatch {
        op: op.symbol().to_string(),
        message: message.to_string(),
    }
}

fn literal(value: &Value) -> Result<Z3Term, Z3Error> {
    match value {
        Value::Bool(b) => Ok(Z3Term::Bool(Bool::from_bool(*b))),
        Value::Int(n) => Ok(Z3Term::Int(Int::from_big_int(n))),
        Value::Real(r) => Ok(Z3Term::Real(Real::from_big_rational(r))),
    }
}

/// Read a decimal such as `-1.41421` into an exact rational.
fn parse_decimal(text: &str) -> Option<Value> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() || !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }
    let numer: BigInt = format!("{}{}", whole, frac).parse().ok()?;
    let denom = num::pow(BigInt::from(10), frac.len());
    let numer = if negative { -numer } else { numer };
    Some(Value::Real(BigRational::new(numer, denom)))
}

/// Run `solver.check()` while a scoped watcher interrupts the thread's
/// context as soon as `cancel` fires.
fn check_interruptible(solver: &z3::Solver, cancel: &CancelToken) -> Z3SatResult {
    let ctx = z3::Context::thread_local();
    let handle = ctx.handle();
    let done = AtomicBool::new(false);
    thread::scope(|scope| {
        let watcher = scope.spawn(|| {
            while !done.load(Ordering::Acquire) {
                if cancel.is_cancelled() {
                    debug!("interrupting Z3 check");
                    handle.interrupt();
                    return;
                }
                thread::park_timeout(WATCH_INTERVAL);
            }
        });
        let result = solver.check();
        done.store(true, Ordering::Release);
        watcher.thread().unpark();
        result
    })
}

/// Operands of one numeric sort, as produced by the sort checker.
enum Numeric {
    Int(Vec<Int>),
    Real(Vec<Real>),
}

fn numeric(op: Op, args: Vec<Z3Term>) -> Result<Numeric, Z3Error> {
    match args.first() {
        Some(Z3Term::Int(_)) => args
            .into_iter()
            .map(|a| match a {
                Z3Term::Int(i) => Ok(i),
                _ => Err(mismatch(op, "mixed numeric operands")),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Numeric::Int),
        Some(Z3Term::Real(_)) => args
            .into_iter()
            .map(|a| match a {
                Z3Term::Real(r) => Ok(r),
                _ => Err(mismatch(op, "mixed numeric operands")),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Numeric::Real),
        _ => Err(mismatch(op, "expected numeric operands")),
    }
}

fn bools(op: Op, args: Vec<Z3Term>) -> Result<Vec<Bool>, Z3Error> {
    args.into_iter().map(|a| a.into_bool(op)).collect()
}

fn equal(op: Op, a: &Z3Term, b: &Z3Term) -> Result<Bool, Z3Error> {
    match (a, b) {
        (Z3Term::Bool(x), Z3Term::Bool(y)) => Ok(x.iff(y)),
        (Z3Term::Int(x), Z3Term::Int(y)) => Ok(x.eq(y)),
        (Z3Term::Real(x), Z3Term::Real(y)) => Ok(x.eq(y)),
        _ => Err(mismatch(op, "operands of different sorts")),
    }
}

/// `a0 op a1 ∧ a1 op a2 ∧ …`
fn chain<T>(items: &[T], rel: impl Fn(&T, &T) -> Bool) -> Bool {
    let links: Vec<Bool> = items.windows(2).map(|w| rel(&w[0], &w[1])).collect();
    Bool::and(&links)
}

fn apply(op: Op, mut args: Vec<Z3Term>) -> Result<Z3Term, Z3Error> {
    let term = match op {
        Op::Not => {
            let [a] = one(op, args)?;
            Z3Term::Bool(a.into_bool(op)?.not())
        }
        Op::And => Z3Term::Bool(Bool::and(&bools(op, args)?)),
        Op::Or => Z3Term::Bool(Bool::or(&bools(op, args)?)),
        Op::Implies => {
            let mut items = bools(op, args)?;
            let mut acc = items.pop().ok_or_else(|| mismatch(op, "no operands"))?;
            while let Some(premise) = items.pop() {
                acc = premise.implies(&acc);
            }
            Z3Term::Bool(acc)
        }
        Op::Xor => {
            let mut items = bools(op, args)?.into_iter();
            let first = items.next().ok_or_else(|| mismatch(op, "no operands"))?;
            Z3Term::Bool(items.fold(first, |acc, b| acc.xor(&b)))
        }
        Op::Eq => {
            let links = args
                .windows(2)
                .map(|w| equal(op, &w[0], &w[1]))
                .collect::<Result<Vec<_>, _>>()?;
            Z3Term::Bool(Bool::and(&links))
        }
        Op::Distinct => {
            let mut pairs = Vec::new();
            for i in 0..args.len() {
                for j in i + 1..args.len() {
                    pairs.push(equal(op, &args[i], &args[j])?.not());
                }
            }
            Z3Term::Bool(Bool::and(&pairs))
        }
        Op::Ite => {
            if args.len() != 3 {
                return Err(mismatch(op, "expected 3 operands"));
            }
            let otherwise = args.pop().ok_or_else(|| mismatch(op, "no else branch"))?;
            let then = args.pop().ok_or_else(|| mismatch(op, "no then branch"))?;
            let cond = args
                .pop()
                .ok_or_else(|| mismatch(op, "no condition"))?
                .into_bool(op)?;
            match (then, otherwise) {
                (Z3Term::Bool(t), Z3Term::Bool(e)) => Z3Term::Bool(cond.ite(&t, &e)),
                (Z3Term::Int(t), Z3Term::Int(e)) => Z3Term::Int(cond.ite(&t, &e)),
                (Z3Term::Real(t), Z3Term::Real(e)) => Z3Term::Real(cond.ite(&t, &e)),
                _ => return Err(mismatch(op, "branches of different sorts")),
            }
        }
        Op::Lt | Op::Le | Op::Gt | Op::Ge => Z3Term::Bool(match numeric(op, args)? {
            Numeric::Int(items) => match op {
                Op::Lt => chain(&items, |a, b| a.lt(b)),
                Op::Le => chain(&items, |a, b| a.le(b)),
                Op::Gt => chain(&items, |a, b| a.gt(b)),
                _ => chain(&items, |a, b| a.ge(b)),
            },
            Numeric::Real(items) => match op {
                Op::Lt => chain(&items, |a, b| a.lt(b)),
                Op::Le => chain(&items, |a, b| a.le(b)),
                Op::Gt => chain(&items, |a, b| a.gt(b)),
                _ => chain(&items, |a, b| a.ge(b)),
            },
        }),
        Op::Add => match numeric(op, args)? {
            Numeric::Int(items) => Z3Term::Int(Int::add(&items)),
            Numeric::Real(items) => Z3Term::Real(Real::add(&items)),
        },
        Op::Sub => match numeric(op, args)? {
            Numeric::Int(items) => Z3Term::Int(Int::sub(&items)),
            Numeric::Real(items) => Z3Term::Real(Real::sub(&items)),
        },
        Op::Mul => match numeric(op, args)? {
            Numeric::Int(items) => Z3Term::Int(Int::mul(&items)),
            Numeric::Real(items) => Z3Term::Real(Real::mul(&items)),
        },
        Op::Neg => match one(op, args)? {
            [Z3Term::Int(i)] => Z3Term::Int(i.unary_minus()),
            [Z3Term::Real(r)] => Z3Term::Real(r.unary_minus()),
            _ => return Err(mismatch(op, "expected a numeric operand")),
        },
        Op::Abs => match one(op, args)? {
            [Z3Term::Int(i)] => {
                let nonneg = i.ge(&Int::from_i64(0));
                Z3Term::Int(nonneg.ite(&i, &i.unary_minus()))
            }
            [Z3Term::Real(r)] => {
                let nonneg = r.ge(&Int::from_i64(0).to_real());
                Z3Term::Real(nonneg.ite(&r, &r.unary_minus()))
            }
            _ => return Err(mismatch(op, "expected a numeric operand")),
        },
        Op::Div => match numeric(op, args)? {
            Numeric::Real(items) => {
                let mut items = items.into_iter();
                let first = items.next().ok_or_else(|| mismatch(op, "no operands"))?;
                Z3Term::Real(items.fold(first, |acc, d| acc.div(&d)))
            }
            Numeric::Int(_) => return Err(mismatch(op, "expected Real operands")),
        },
        Op::IntDiv | Op::Mod => match numeric(op, args)? {
            Numeric::Int(items) if items.len() == 2 => {
                let (a, b) = (&items[0], &items[1]);
                Z3Term::Int(if op == Op::IntDiv { a.div(b) } else { a.modulo(b) })
            }
            _ => return Err(mismatch(op, "expected two Int operands")),
        },
        Op::ToReal => match one(op, args)? {
            [Z3Term::Int(i)] => Z3Term::Real(i.to_real()),
            _ => return Err(mismatch(op, "expected an Int operand")),
        },
        Op::ToInt => match one(op, args)? {
            [Z3Term::Real(r)] => Z3Term::Int(r.to_int()),
            _ => return Err(mismatch(op, "expected a Real operand")),
        },
    };
    Ok(term)
}

fn one(op: Op, args: Vec<Z3Term>) -> Result<[Z3Term; 1], Z3Error> {
    <[Z3Term; 1]>::try_from(args).map_err(|_| mismatch(op, "expected one operand"))
}

impl SmtSolver for Z3Solver {
    type Error = Z3Error;

    fn declare(&mut self, var: &SmtVar, sort: Sort) -> Result<(), Z3Error> {
        let name = var.symbol();
        let term = match sort {
            Sort::Bool => Z3Term::Bool(Bool::new_const(name)),
            Sort::Int => Z3Term::Int(Int::new_const(name)),
            Sort::Real => Z3Term::Real(Real::new_const(name)),
        };
        self.vars.insert(var.clone(), term);
        Ok(())
    }

    fn assert(&mut self, term: &SmtTerm) -> Result<(), Z3Error> {
        let formula = self.translate(term)?.into_bool(Op::And)?;
        self.solver.assert(&formula);
        Ok(())
    }

    fn push(&mut self) -> Result<(), Z3Error> {
        self.solver.push();
        Ok(())
    }

    fn pop(&mut self) -> Result<(), Z3Error> {
        self.solver.pop(1);
        Ok(())
    }

    fn check_sat(&mut self) -> Result<SatResult, Z3Error> {
        let result = match &self.cancel {
            Some(cancel) if cancel.is_cancelled() => {
                return Ok(SatResult::Unknown("cancelled".to_string()))
            }
            Some(cancel) => check_interruptible(&self.solver, cancel),
            None => self.solver.check(),
        };
        match result {
            Z3SatResult::Sat => Ok(SatResult::Sat),
            Z3SatResult::Unsat => Ok(SatResult::Unsat),
            Z3SatResult::Unknown if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) => {
                Ok(SatResult::Unknown("cancelled".to_string()))
            }
            Z3SatResult::Unknown => Ok(SatResult::Unknown(
                self.solver
                    .get_reason_unknown()
                    .unwrap_or_else(|| "Z3 returned unknown".to_string()),
            )),
        }
    }

    fn get_model(&mut self, vars: &[SmtVar]) -> Result<Model, Z3Error> {
        let z3_model = self
            .solver
            .get_model()
            .ok_or_else(|| Z3Error::Internal("SAT but no model available".into()))?;
        let mut model = Model::default();
        for var in vars {
            let declared = self
                .vars
                .get(var)
                .ok_or_else(|| Z3Error::UnknownVariable(var.symbol()))?;
            let missing = || Z3Error::Internal(format!("no model value for {}", var));
            let unreadable = |text: String| Z3Error::ModelValue {
                var: var.symbol(),
                text,
            };
            let value = match declared {
                Z3Term::Bool(b) => {
                    let text = z3_model.eval(b, true).ok_or_else(missing)?.to_string();
                    Value::parse_smt(&text).ok_or_else(|| unreadable(text))?
                }
                Z3Term::Int(i) => {
                    let text = z3_model.eval(i, true).ok_or_else(missing)?.to_string();
                    Value::parse_smt(&text).ok_or_else(|| unreadable(text))?
                }
                Z3Term::Real(r) => {
                    let value = z3_model.eval(r, true).ok_or_else(missing)?;
                    let text = value.to_string();
                    match Value::parse_smt(&text) {
                        Some(exact) => exact,
                        // Irrational: an algebraic number such as `(root-obj ...)`.
                        None => {
                            let approx = value.approx(APPROX_DIGITS);
                            debug!(var = %var, %text, %approx, "approximating algebraic model value");
                            model.approximate = true;
                            parse_decimal(&approx).ok_or_else(|| unreadable(text))?
                        }
                    }
                }
            };
            model.insert(var.clone(), value);
        }
        Ok(model)
    }

    fn reset(&mut self) -> Result<(), Z3Error> {
        self.solver.reset();
        // Z3 may drop per-solver parameters on reset.
        if let Some(params) = &self.params {
            self.solver.set_params(params);
        }
        self.vars.clear();
        Ok(())
    }

    fn interrupt_on(&mut self, cancel: &CancelToken) {
        self.cancel = Some(cancel.clone());
    }
}

/// Creates [`Z3Solver`] sessions on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Z3Factory;

impl SolverFactory for Z3Factory {
    type Solver = Z3Solver;

    fn create(&self, timeout_ms: Option<u64>) -> Z3Solver {
        match timeout_ms {
            Some(ms) => Z3Solver::with_timeout_ms(ms),
            None => Z3Solver::new(),
        }
    }
}
