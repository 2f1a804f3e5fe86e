//! Progress events emitted while a task runs.

use std::fmt;
use std::sync::mpsc::Sender;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Started {
        system: String,
        goals: Vec<String>,
    },
    /// No path of `depth + 1` states falsifies `goals`: they are k-true
    /// for `k = depth + 1`.
    BaseClean {
        system: String,
        depth: usize,
        goals: Vec<String>,
    },
    /// Generated invariants assumed by the inductive step.
    Strengthened {
        system: String,
        invariants: Vec<String>,
    },
    /// The step query at `depth` found a counterexample to induction.
    StepFailed { system: String, depth: usize },
    Proved {
        system: String,
        depth: usize,
        goals: Vec<String>,
    },
    Falsified {
        system: String,
        depth: usize,
        goal: String,
    },
    Unresolved {
        system: String,
        depth: usize,
        goals: Vec<String>,
        reason: String,
    },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Started { system, goals } => {
                write!(f, "{}: started ({})", system, goals.join(", "))
            }
            Event::BaseClean { system, depth, goals } => {
                write!(f, "{}: {} true up to depth {}", system, goals.join(", "), depth)
            }
            Event::Strengthened { system, invariants } => {
                write!(f, "{}: {} invariants assumed", system, invariants.len())
            }
            Event::StepFailed { system, depth } => {
                write!(f, "{}: step failed at depth {}", system, depth)
            }
            Event::Proved { system, depth, goals } => {
                write!(f, "{}: proved {} at depth {}", system, goals.join(", "), depth)
            }
            Event::Falsified { system, depth, goal } => {
                write!(f, "{}: falsified {} at depth {}", system, goal, depth)
            }
            Event::Unresolved {
                system,
                depth,
                goals,
                reason,
            } => write!(
                f,
                "{}: {} unresolved after depth {} ({})",
                system,
                goals.join(", "),
                depth,
                reason
            ),
        }
    }
}

/// Optional event channel. A disconnected receiver is ignored.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    sender: Option<Sender<Event>>,
}

impl EventSink {
    pub fn new(sender: Sender<Event>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    pub fn emit(&self, event: Event) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }
}
