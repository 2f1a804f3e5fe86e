//! Verdicts per goal.

use indexmap::IndexMap;
use kinduct_term::{StateRow, Value};
use std::fmt;

/// A counterexample path from an initial state.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    /// One full assignment per position, `X_0` first.
    pub states: Vec<StateRow>,
    /// Values chosen for the rigid constants.
    pub constants: IndexMap<String, Value>,
    /// Some real value is a decimal approximation of an irrational model
    /// value.
    pub approximate: bool,
}

impl Trace {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn last(&self) -> Option<&StateRow> {
        self.states.last()
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.constants.is_empty() {
            let consts: Vec<String> = self
                .constants
                .iter()
                .map(|(name, value)| format!("{} = {}", name, value))
                .collect();
            writeln!(f, "  constants: {}", consts.join(", "))?;
        }
        for (i, state) in self.states.iter().enumerate() {
            writeln!(f, "  {}: {}", i, state)?;
        }
        if self.approximate {
            writeln!(f, "  (real values approximated)")?;
        }
        Ok(())
    }
}

/// Outcome for one goal. The three cases are never conflated.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Proved jointly with the other goals of the task by (depth+1)-induction.
    AllHold { depth: usize },
    /// Falsified on a path of `depth + 1` states.
    Violated { depth: usize, trace: Trace },
    /// Neither proved nor falsified up to `depth`.
    Unknown { depth: usize, reason: String },
}

impl Verdict {
    pub fn holds(&self) -> bool {
        matches!(self, Verdict::AllHold { .. })
    }

    pub fn is_violated(&self) -> bool {
        matches!(self, Verdict::Violated { .. })
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Verdict::Unknown { .. })
    }

    pub fn depth(&self) -> usize {
        match self {
            Verdict::AllHold { depth }
            | Verdict::Violated { depth, .. }
            | Verdict::Unknown { depth, .. } => *depth,
        }
    }

    pub fn trace(&self) -> Option<&Trace> {
        match self {
            Verdict::Violated { trace, .. } => Some(trace),
            _ => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::AllHold { depth } => write!(f, "holds (k = {})", depth),
            Verdict::Violated { depth, .. } => write!(f, "violated at depth {}", depth),
            Verdict::Unknown { depth, reason } => {
                write!(f, "unknown after depth {}: {}", depth, reason)
            }
        }
    }
}

/// Verdicts of one verification task, in `verify` order.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub system: String,
    pub results: IndexMap<String, Verdict>,
    /// Proved goals implied by the other proved goals.
    pub redundant: Vec<String>,
}

impl Report {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            results: IndexMap::new(),
            redundant: Vec::new(),
        }
    }

    pub fn verdict(&self, goal: &str) -> Option<&Verdict> {
        self.results.get(goal)
    }

    pub fn all_hold(&self) -> bool {
        self.results.values().all(Verdict::holds)
    }

    pub fn violations(&self) -> impl Iterator<Item = (&str, &Verdict)> {
        self.results
            .iter()
            .filter(|(_, v)| v.is_violated())
            .map(|(name, v)| (name.as_str(), v))
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.system)?;
        for (name, verdict) in &self.results {
            writeln!(f, "  {}: {}", name, verdict)?;
            if let Some(trace) = verdict.trace() {
                write!(f, "{}", trace)?;
            }
        }
        if !self.redundant.is_empty() {
            writeln!(f, "  redundant: {}", self.redundant.join(", "))?;
        }
        Ok(())
    }
}
