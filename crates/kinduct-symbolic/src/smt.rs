//! Solver-agnostic terms over unrolled state positions.

use kinduct_term::{Op, Value};
use std::fmt;

/// A solver variable: a state variable at a position of the unrolled path,
/// or a rigid constant shared by every position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SmtVar {
    pub name: String,
    pub index: Option<usize>,
}

impl SmtVar {
    pub fn state(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index: Some(index),
        }
    }

    pub fn constant(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: None,
        }
    }

    /// Name used inside the solver. `@` cannot appear in script symbols.
    pub fn symbol(&self) -> String {
        match self.index {
            Some(i) => format!("{}@{}", self.name, i),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for SmtVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol())
    }
}

/// A quantifier-free term. Operators keep the n-ary, chainable meaning
/// they have in [`kinduct_term::Term`]; backends expand them.
#[derive(Debug, Clone, PartialEq)]
pub enum SmtTerm {
    Var(SmtVar),
    Lit(Value),
    App(Op, Vec<SmtTerm>),
}

impl SmtTerm {
    pub fn bool(b: bool) -> Self {
        SmtTerm::Lit(Value::Bool(b))
    }

    pub fn var(var: SmtVar) -> Self {
        SmtTerm::Var(var)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        match self {
            SmtTerm::Lit(Value::Bool(b)) => SmtTerm::bool(!b),
            other => SmtTerm::App(Op::Not, vec![other]),
        }
    }

    /// Conjunction, dropping `true` and collapsing the trivial cases.
    pub fn and_all(terms: impl IntoIterator<Item = SmtTerm>) -> Self {
        let mut conjuncts: Vec<SmtTerm> = terms
            .into_iter()
            .filter(|t| *t != SmtTerm::bool(true))
            .collect();
        match conjuncts.len() {
            0 => SmtTerm::bool(true),
            1 => conjuncts.remove(0),
            _ => SmtTerm::App(Op::And, conjuncts),
        }
    }

    /// Every variable mentioned, in first-occurrence order.
    pub fn vars(&self) -> Vec<&SmtVar> {
        let mut out = Vec::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars<'a>(&'a self, out: &mut Vec<&'a SmtVar>) {
        match self {
            SmtTerm::Var(v) => {
                if !out.contains(&v) {
                    out.push(v);
                }
            }
            SmtTerm::Lit(_) => {}
            SmtTerm::App(_, args) => args.iter().for_each(|a| a.collect_vars(out)),
        }
    }
}

impl fmt::Display for SmtTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmtTerm::Var(v) => write!(f, "{}", v),
            SmtTerm::Lit(v) => write!(f, "{}", v),
            SmtTerm::App(op, args) => {
                write!(f, "({}", op)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}
