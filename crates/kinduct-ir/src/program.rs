//! Compiled programs and the verification tasks they submit.

use crate::error::{CompileError, CompileResult};
use crate::flatten::FlatSystem;
use crate::store::{Entry, RelationMode, Store};
use crate::system::System;
use indexmap::IndexMap;
use kinduct_syntax::Span;
use kinduct_term::{MacroTable, Sort, Term};
use std::sync::Arc;

/// A compiled script.
#[derive(Debug, Clone)]
pub struct Program {
    /// Inlined and sort-checked macros.
    pub macros: MacroTable,
    /// Rigid constants from `declare-fun`.
    pub constants: IndexMap<String, Sort>,
    pub systems: IndexMap<String, System>,
    pub store: Store,
    pub verifies: Vec<VerifyCommand>,
    /// Flattened form of every system, keyed by name.
    pub(crate) flat: IndexMap<String, Arc<FlatSystem>>,
}

/// A `verify` command.
#[derive(Debug, Clone)]
pub struct VerifyCommand {
    pub system: String,
    pub names: Vec<String>,
    pub doc: Vec<String>,
    pub span: Span,
}

/// Kind of a goal, which fixes how many states its formula spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalKind {
    Property,
    Relation,
}

/// A formula to prove.
#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    pub name: String,
    pub kind: GoalKind,
    pub formula: Term,
}

/// A relation assumed at every step.
#[derive(Debug, Clone, PartialEq)]
pub struct Assumption {
    pub name: String,
    pub formula: Term,
}

/// One `verify` invocation: a flattened system and the formulas submitted
/// together. Goals keep the order of the `verify` list.
#[derive(Debug, Clone)]
pub struct VerificationTask {
    pub system: Arc<FlatSystem>,
    pub constants: IndexMap<String, Sort>,
    pub goals: Vec<Goal>,
    pub assumptions: Vec<Assumption>,
}

impl VerificationTask {
    /// A task over an already flattened system.
    pub fn new(system: Arc<FlatSystem>) -> Self {
        Self {
            system,
            constants: IndexMap::new(),
            goals: Vec::new(),
            assumptions: Vec::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, formula: Term) -> Self {
        self.goals.push(Goal {
            name: name.into(),
            kind: GoalKind::Property,
            formula,
        });
        self
    }

    pub fn with_relation(
        mut self,
        name: impl Into<String>,
        formula: Term,
        mode: RelationMode,
    ) -> Self {
        match mode {
            RelationMode::Prove => self.goals.push(Goal {
                name: name.into(),
                kind: GoalKind::Relation,
                formula,
            }),
            RelationMode::Assume => self.assumptions.push(Assumption {
                name: name.into(),
                formula,
            }),
        }
        self
    }

    pub fn goal_names(&self) -> impl Iterator<Item = &str> {
        self.goals.iter().map(|g| g.name.as_str())
    }
}

impl Program {
    /// The flattened form of a system.
    pub fn flat_system(&self, name: &str) -> Option<Arc<FlatSystem>> {
        self.flat.get(name).cloned()
    }

    /// Build the task for one `verify` command.
    pub fn task(&self, cmd: &VerifyCommand) -> CompileResult<VerificationTask> {
        let system = self
            .flat_system(&cmd.system)
            .ok_or_else(|| CompileError::UnknownSystem {
                name: cmd.system.clone(),
                span: cmd.span,
            })?;
        let mut task = VerificationTask::new(system);
        task.constants = self.constants.clone();

        for name in &cmd.names {
            let entry = self.store.get(name).ok_or_else(|| CompileError::UnknownGoal {
                name: name.clone(),
                span: cmd.span,
            })?;
            if entry.system() != cmd.system {
                return Err(CompileError::WrongSystem {
                    name: name.clone(),
                    owner: entry.system().to_string(),
                    system: cmd.system.clone(),
                    span: cmd.span,
                });
            }
            task = match entry {
                Entry::Property(p) => task.with_property(&p.name, p.formula.clone()),
                Entry::Relation(r) => task.with_relation(&r.name, r.formula.clone(), r.mode),
            };
        }
        Ok(task)
    }

    /// Tasks for every `verify` command, in script order.
    pub fn tasks(&self) -> CompileResult<Vec<VerificationTask>> {
        self.verifies.iter().map(|cmd| self.task(cmd)).collect()
    }
}
