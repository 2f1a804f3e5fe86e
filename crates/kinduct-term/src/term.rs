//! Symbolic term representation.

use crate::value::Value;
use kinduct_syntax::{format_integer, format_rational};
use std::collections::BTreeSet;
use std::fmt;

/// Timepoint of a staged variable reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Curr,
    Next,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Curr => write!(f, "curr"),
            Stage::Next => write!(f, "next"),
        }
    }
}

/// A state variable at a timepoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateVar {
    pub name: String,
    pub stage: Stage,
}

impl StateVar {
    pub fn curr(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stage: Stage::Curr,
        }
    }

    pub fn next(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stage: Stage::Next,
        }
    }
}

/// Built-in operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Not,
    And,
    Or,
    /// `=>`, right-associative.
    Implies,
    Xor,
    /// `=`, chainable.
    Eq,
    Distinct,
    Ite,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    /// Unary `-`.
    Neg,
    Mul,
    /// Real division `/`.
    Div,
    /// Integer division `div`.
    IntDiv,
    Mod,
    Abs,
    ToReal,
    ToInt,
}

impl Op {
    /// Resolve an operator symbol. `-` maps to `Sub`; callers pick `Neg`
    /// for the unary form.
    pub fn from_symbol(symbol: &str) -> Option<Op> {
        Some(match symbol {
            "not" => Op::Not,
            "and" => Op::And,
            "or" => Op::Or,
            "=>" => Op::Implies,
            "xor" => Op::Xor,
            "=" => Op::Eq,
            "distinct" => Op::Distinct,
            "ite" => Op::Ite,
            "<" => Op::Lt,
            "<=" => Op::Le,
            ">" => Op::Gt,
            ">=" => Op::Ge,
            "+" => Op::Add,
            "-" => Op::Sub,
            "*" => Op::Mul,
            "/" => Op::Div,
            "div" => Op::IntDiv,
            "mod" => Op::Mod,
            "abs" => Op::Abs,
            "to_real" => Op::ToReal,
            "to_int" => Op::ToInt,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Op::Not => "not",
            Op::And => "and",
            Op::Or => "or",
            Op::Implies => "=>",
            Op::Xor => "xor",
            Op::Eq => "=",
            Op::Distinct => "distinct",
            Op::Ite => "ite",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Add => "+",
            Op::Sub | Op::Neg => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::IntDiv => "div",
            Op::Mod => "mod",
            Op::Abs => "abs",
            Op::ToReal => "to_real",
            Op::ToInt => "to_int",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(self, Op::Lt | Op::Le | Op::Gt | Op::Ge)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A symbolic expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Lit(Value),
    /// `(_ curr v)` / `(_ next v)`
    State(StateVar),
    /// Let-bound name or macro parameter.
    Local(String),
    /// Declared rigid constant.
    Const(String),
    App(Op, Vec<Term>),
    /// Parallel let: every binding is evaluated in the outer scope.
    Let(Vec<(String, Term)>, Box<Term>),
    /// Macro application; removed by inlining.
    Call(String, Vec<Term>),
}

impl Term {
    pub fn bool(b: bool) -> Term {
        Term::Lit(Value::Bool(b))
    }

    pub fn int(n: i64) -> Term {
        Term::Lit(Value::int(n))
    }

    pub fn curr(name: impl Into<String>) -> Term {
        Term::State(StateVar::curr(name))
    }

    pub fn next(name: impl Into<String>) -> Term {
        Term::State(StateVar::next(name))
    }

    pub fn app(op: Op, args: Vec<Term>) -> Term {
        Term::App(op, args)
    }

    pub fn not(t: Term) -> Term {
        Term::App(Op::Not, vec![t])
    }

    pub fn eq(a: Term, b: Term) -> Term {
        Term::App(Op::Eq, vec![a, b])
    }

    pub fn ite(c: Term, t: Term, e: Term) -> Term {
        Term::App(Op::Ite, vec![c, t, e])
    }

    /// Conjunction with the trivial cases folded: no conjuncts is `true`,
    /// one conjunct is itself, and `true` conjuncts are dropped.
    pub fn and_all(terms: impl IntoIterator<Item = Term>) -> Term {
        let mut conjuncts: Vec<Term> = terms
            .into_iter()
            .filter(|t| !t.is_true())
            .collect();
        match conjuncts.len() {
            0 => Term::bool(true),
            1 => conjuncts.remove(0),
            _ => Term::App(Op::And, conjuncts),
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Term::Lit(Value::Bool(true)))
    }

    /// Free state variables, ordered by name then stage.
    pub fn state_vars(&self) -> BTreeSet<StateVar> {
        let mut out = BTreeSet::new();
        self.visit(&mut |t| {
            if let Term::State(v) = t {
                out.insert(v.clone());
            }
        });
        out
    }

    /// Names of declared constants referenced by this term.
    pub fn constants(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.visit(&mut |t| {
            if let Term::Const(c) = t {
                out.insert(c.clone());
            }
        });
        out
    }

    pub fn uses_stage(&self, stage: Stage) -> bool {
        self.state_vars().iter().any(|v| v.stage == stage)
    }

    pub fn uses_next(&self) -> bool {
        self.uses_stage(Stage::Next)
    }

    /// Locals that are not bound by an enclosing `let` within this term.
    pub fn free_locals(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        collect_free_locals(self, &mut Vec::new(), &mut out);
        out
    }

    /// Pre-order traversal.
    pub fn visit(&self, f: &mut impl FnMut(&Term)) {
        f(self);
        match self {
            Term::Lit(_) | Term::State(_) | Term::Local(_) | Term::Const(_) => {}
            Term::App(_, args) | Term::Call(_, args) => {
                for arg in args {
                    arg.visit(f);
                }
            }
            Term::Let(bindings, body) => {
                for (_, value) in bindings {
                    value.visit(f);
                }
                body.visit(f);
            }
        }
    }
}

fn collect_free_locals(term: &Term, bound: &mut Vec<String>, out: &mut BTreeSet<String>) {
    match term {
        Term::Local(name) => {
            if !bound.contains(name) {
                out.insert(name.clone());
            }
        }
        Term::Lit(_) | Term::State(_) | Term::Const(_) => {}
        Term::App(_, args) | Term::Call(_, args) => {
            for arg in args {
                collect_free_locals(arg, bound, out);
            }
        }
        Term::Let(bindings, body) => {
            for (_, value) in bindings {
                collect_free_locals(value, bound, out);
            }
            let mark = bound.len();
            bound.extend(bindings.iter().map(|(name, _)| name.clone()));
            collect_free_locals(body, bound, out);
            bound.truncate(mark);
        }
    }
}

impl From<Value> for Term {
    fn from(value: Value) -> Self {
        Term::Lit(value)
    }
}

/// Prints SMT-LIB style s-expressions that the script parser accepts.
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Lit(Value::Bool(b)) => write!(f, "{}", b),
            Term::Lit(Value::Int(n)) => write!(f, "{}", format_integer(n)),
            Term::Lit(Value::Real(r)) => write!(f, "{}", format_rational(r)),
            Term::State(v) => write!(f, "(_ {} {})", v.stage, v.name),
            Term::Local(name) | Term::Const(name) => write!(f, "{}", name),
            Term::Call(name, args) if args.is_empty() => write!(f, "{}", name),
            Term::App(op, args) => {
                write!(f, "({}", op)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                write!(f, ")")
            }
            Term::Call(name, args) => {
                write!(f, "({}", name)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                write!(f, ")")
            }
            Term::Let(bindings, body) => {
                write!(f, "(let (")?;
                for (i, (name, value)) in bindings.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "({} {})", name, value)?;
                }
                write!(f, ") {})", body)
            }
        }
    }
}
