//! Counterexample trace validation.
//!
//! A violation must come with a trace that the concrete evaluator accepts:
//!   1. the first state satisfies Init
//!   2. each consecutive pair satisfies Trans
//!   3. the goal holds in every state but the last, where it fails
//!
//! The check runs the evaluator directly rather than `replay`, so the two
//! halves of the pipeline are validated against each other.

use kinduct_ir::VerificationTask;
use kinduct_soundness::{check_script, compile_script};
use kinduct_symbolic::{verify, SymbolicConfig, Trace, Verdict};
use kinduct_term::{eval_bool, Frame, Value};
use proptest::prelude::*;

fn counter_script(step: u8, bound: u8) -> String {
    format!(
        r#"(define-sys up ((x Int))
  (= (_ curr x) 0)
  (= (_ next x) (+ (_ curr x) {step}))
  ())

(define-prop below up (< (_ curr x) {bound}))

(verify up (below))
"#
    )
}

fn single_task(source: &str) -> VerificationTask {
    let program = compile_script(source).expect("script should compile");
    let mut tasks = program.tasks().expect("tasks should build");
    assert_eq!(tasks.len(), 1);
    tasks.remove(0)
}

fn validate(task: &VerificationTask, goal: &str, trace: &Trace) -> Result<(), String> {
    let system = &task.system;
    let formula = &task
        .goals
        .iter()
        .find(|g| g.name == goal)
        .ok_or_else(|| format!("no goal {}", goal))?
        .formula;
    let constants = &trace.constants;
    let first = trace.states.first().ok_or("empty trace")?;

    let init = eval_bool(&system.init, &Frame::single(first, constants)).map_err(|e| e.to_string())?;
    if !init {
        return Err(format!("initial state violates Init:\n{}", trace));
    }
    for (i, pair) in trace.states.windows(2).enumerate() {
        let frame = Frame::step(&pair[0], &pair[1], constants);
        if !eval_bool(&system.trans, &frame).map_err(|e| e.to_string())? {
            return Err(format!("step {} violates Trans:\n{}", i, trace));
        }
    }
    let last = trace.states.len() - 1;
    for (i, state) in trace.states.iter().enumerate() {
        let holds = eval_bool(formula, &Frame::single(state, constants)).map_err(|e| e.to_string())?;
        if holds == (i == last) {
            return Err(format!("goal {} has the wrong value in state {}:\n{}", goal, i, trace));
        }
    }
    Ok(())
}

#[test]
fn violation_trace_starts_in_init() {
    let task = single_task(&counter_script(1, 3));
    let report = verify(&task, &SymbolicConfig::default()).expect("verify should not error");
    let trace = report
        .verdict("below")
        .and_then(Verdict::trace)
        .expect("below should be violated");
    assert_eq!(trace.states[0].get("x"), Some(&Value::int(0)));
    assert_eq!(trace.last().and_then(|s| s.get("x")), Some(&Value::int(3)));
}

#[test]
fn toggle_trace_is_a_real_run() {
    let source = kinduct_soundness::fixture("toggle.kin").expect("fixture");
    let program = compile_script(&source).expect("toggle compiles");
    let task = program.task(&program.verifies[0]).expect("task");
    let report = verify(&task, &SymbolicConfig::default()).expect("verify");
    let trace = report
        .verdict("bounded")
        .and_then(Verdict::trace)
        .expect("bounded should be violated");
    validate(&task, "bounded", trace).unwrap();
}

#[test]
fn holding_goal_has_no_trace() {
    let source = kinduct_soundness::fixture("counter.kin").expect("fixture");
    let reports = check_script(&source, &SymbolicConfig::default()).expect("check");
    for report in &reports {
        assert!(report.results.values().all(|v| v.trace().is_none()), "{}", report);
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 24,
        .. ProptestConfig::default()
    })]

    #[test]
    fn counterexamples_are_minimal_and_valid(step in 1u8..=3, bound in 1u8..=10) {
        let task = single_task(&counter_script(step, bound));
        let report = verify(&task, &SymbolicConfig::default())
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        // x reaches bound after ceil(bound / step) steps.
        let expected = usize::from((bound + step - 1) / step);
        match report.verdict("below") {
            Some(Verdict::Violated { depth, trace }) => {
                prop_assert_eq!(*depth, expected);
                prop_assert_eq!(trace.len(), expected + 1);
                validate(&task, "below", trace).map_err(TestCaseError::fail)?;
            }
            other => prop_assert!(false, "expected a violation, got {:?}", other),
        }
    }
}
