//! Counterexample extraction and concrete replay.

use crate::report::Trace;
use crate::smt::SmtVar;
use crate::solver::Model;
use crate::unroll::Unroller;
use crate::{SymbolicError, SymbolicResult};
use indexmap::IndexMap;
use kinduct_ir::{Goal, GoalKind, VerificationTask};
use kinduct_term::{eval_bool, Frame, StateRow, TermError, Value};
use thiserror::Error;
use tracing::{debug, warn};

/// Every variable a trace of `depth + 1` states reads from the model.
pub fn trace_vars(unroller: &Unroller<'_>, depth: usize) -> Vec<SmtVar> {
    let mut vars = unroller.constant_vars();
    for i in 0..=depth {
        vars.extend(unroller.frame_vars(i));
    }
    vars
}

/// Read positions `0..=depth` out of a model.
pub fn extract_trace(model: &Model, unroller: &Unroller<'_>, depth: usize) -> SymbolicResult<Trace> {
    let lookup = |var: &SmtVar| {
        model
            .get(var)
            .cloned()
            .ok_or_else(|| SymbolicError::MissingValue(var.symbol()))
    };

    let mut constants = IndexMap::new();
    for var in unroller.constant_vars() {
        let value = lookup(&var)?;
        constants.insert(var.name, value);
    }

    let mut states = Vec::with_capacity(depth + 1);
    for i in 0..=depth {
        let mut row = StateRow::new();
        for var in unroller.frame_vars(i) {
            let value = lookup(&var)?;
            row.insert(var.name, value);
        }
        states.push(row);
    }
    Ok(Trace {
        states,
        constants,
        approximate: model.approximate,
    })
}

/// Why a counterexample failed to replay.
#[derive(Debug, Error)]
pub enum ReplayMismatch {
    #[error("trace is empty")]
    Empty,
    #[error("state 0 violates Init")]
    Init,
    #[error("the step from state {0} violates Trans")]
    Trans(usize),
    #[error("step {step} violates assumed relation `{name}`")]
    Assumption { step: usize, name: String },
    #[error("goal `{0}` holds at the end of the trace")]
    GoalHolds(String),
    #[error("evaluation failed: {0}")]
    Eval(#[from] TermError),
}

/// Evaluate a counterexample concretely: Init holds at state 0, Trans and
/// every assumption hold between consecutive states, and `goal` is false
/// at the end.
pub fn replay(task: &VerificationTask, goal: &Goal, trace: &Trace) -> Result<(), ReplayMismatch> {
    let first = trace.states.first().ok_or(ReplayMismatch::Empty)?;
    let constants: &IndexMap<String, Value> = &trace.constants;

    if !eval_bool(&task.system.init, &Frame::single(first, constants))? {
        return Err(ReplayMismatch::Init);
    }
    for (i, pair) in trace.states.windows(2).enumerate() {
        let frame = Frame::step(&pair[0], &pair[1], constants);
        if !eval_bool(&task.system.trans, &frame)? {
            return Err(ReplayMismatch::Trans(i));
        }
        for assumption in &task.assumptions {
            if !eval_bool(&assumption.formula, &frame)? {
                return Err(ReplayMismatch::Assumption {
                    step: i,
                    name: assumption.name.clone(),
                });
            }
        }
    }

    let n = trace.states.len();
    let holds = match goal.kind {
        GoalKind::Property => eval_bool(&goal.formula, &Frame::single(&trace.states[n - 1], constants))?,
        GoalKind::Relation if n >= 2 => eval_bool(
            &goal.formula,
            &Frame::step(&trace.states[n - 2], &trace.states[n - 1], constants),
        )?,
        GoalKind::Relation => true,
    };
    if holds {
        return Err(ReplayMismatch::GoalHolds(goal.name.clone()));
    }
    Ok(())
}

/// Replay and log the outcome; a mismatch never changes the verdict.
/// Approximated values cannot replay exactly, so those traces are skipped.
pub(crate) fn check_replay(task: &VerificationTask, goal: &Goal, trace: &Trace) {
    if trace.approximate {
        debug!(goal = %goal.name, "skipping replay of approximate counterexample");
        return;
    }
    match replay(task, goal, trace) {
        Ok(()) => debug!(goal = %goal.name, states = trace.len(), "counterexample replayed"),
        Err(mismatch) => warn!(
            goal = %goal.name,
            system = %task.system.name,
            %mismatch,
            "counterexample does not replay concretely"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinduct_ir::FlatSystem;
    use kinduct_term::{Op, Sort, StateSignature, Term, Variable};
    use std::sync::Arc;

    fn task() -> VerificationTask {
        let system = FlatSystem {
            name: "up".into(),
            signature: StateSignature::new([Variable::new("x", Sort::Int)]).unwrap(),
            init: Term::eq(Term::curr("x"), Term::Const("start".into())),
            trans: Term::eq(
                Term::next("x"),
                Term::app(Op::Add, vec![Term::curr("x"), Term::int(1)]),
            ),
        };
        let mut task = VerificationTask::new(Arc::new(system)).with_property(
            "small",
            Term::app(Op::Lt, vec![Term::curr("x"), Term::int(2)]),
        );
        task.constants.insert("start".into(), Sort::Int);
        task
    }

    fn model(start: i64, xs: &[i64]) -> Model {
        let mut model = Model::default();
        model.insert(SmtVar::constant("start"), Value::int(start));
        for (i, x) in xs.iter().enumerate() {
            model.insert(SmtVar::state("x", i), Value::int(*x));
        }
        model
    }

    #[test]
    fn test_extract_and_replay() {
        let task = task();
        let unroller = Unroller::new(&task);
        let trace = extract_trace(&model(1, &[1, 2]), &unroller, 1).unwrap();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.constants["start"], Value::int(1));
        assert_eq!(trace.states[1].get("x"), Some(&Value::int(2)));
        assert!(replay(&task, &task.goals[0], &trace).is_ok());
    }

    #[test]
    fn test_missing_value() {
        let task = task();
        let unroller = Unroller::new(&task);
        assert!(matches!(
            extract_trace(&model(1, &[1]), &unroller, 1),
            Err(SymbolicError::MissingValue(v)) if v == "x@1"
        ));
    }

    #[test]
    fn test_replay_mismatches() {
        let task = task();
        let unroller = Unroller::new(&task);
        let goal = &task.goals[0];

        let bad_init = extract_trace(&model(0, &[5]), &unroller, 0).unwrap();
        assert!(matches!(replay(&task, goal, &bad_init), Err(ReplayMismatch::Init)));

        let bad_step = extract_trace(&model(0, &[0, 3]), &unroller, 1).unwrap();
        assert!(matches!(replay(&task, goal, &bad_step), Err(ReplayMismatch::Trans(0))));

        let holds = extract_trace(&model(0, &[0, 1]), &unroller, 1).unwrap();
        assert!(matches!(replay(&task, goal, &holds), Err(ReplayMismatch::GoalHolds(_))));
    }
}
