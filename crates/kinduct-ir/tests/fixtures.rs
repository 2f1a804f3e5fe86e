//! Compile every fixture script and check the resulting programs.

use kinduct_ir::{compile_source, CompileError, GoalKind, Program, RelationMode};
use kinduct_syntax::parse;
use kinduct_term::{Op, Term};
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures")
        .join(name)
}

fn load(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|e| panic!("cannot read fixture {}: {}", name, e))
}

fn compile_fixture(name: &str) -> Program {
    compile_source(&load(name)).unwrap_or_else(|e| panic!("{}: {}", name, e))
}

#[test]
fn test_all_fixtures_parse() {
    for name in [
        "counter.kin",
        "toggle.kin",
        "strengthen.kin",
        "composition.kin",
        "relations.kin",
        "cycle.kin",
    ] {
        parse(&load(name)).unwrap_or_else(|e| panic!("{}: {}", name, e));
    }
}

#[test]
fn test_counter_fixture() {
    let program = compile_fixture("counter.kin");
    assert_eq!(program.verifies.len(), 2);
    let tasks = program.tasks().unwrap();
    assert_eq!(tasks[0].goals.len(), 1);
    assert!(tasks[0].assumptions.is_empty());
    assert_eq!(tasks[1].goals.len(), 1);
    assert_eq!(tasks[1].assumptions.len(), 1);
    assert_eq!(tasks[1].assumptions[0].name, "inc_on_input");

    // Dataflow comments are carried as opaque documentation.
    let system = &program.systems["counter"];
    assert!(system.doc.iter().any(|l| l.starts_with("node counter")));
}

#[test]
fn test_toggle_fixture_inlines_limit() {
    let program = compile_fixture("toggle.kin");
    let task = program.task(&program.verifies[0]).unwrap();
    assert_eq!(
        task.goals[0].formula,
        Term::app(Op::Le, vec![Term::curr("out"), Term::int(10)])
    );
}

#[test]
fn test_composition_fixture_flattens() {
    let program = compile_fixture("composition.kin");
    let flat = program.flat_system("tracker").unwrap();
    assert_eq!(
        flat.signature.names().collect::<Vec<_>>(),
        vec!["pos", "vel", "rate"]
    );
    // Own trans plus one conjunct per instantiation.
    match &flat.trans {
        Term::App(Op::And, conjuncts) => assert_eq!(conjuncts.len(), 3),
        other => panic!("expected a conjunction, got {}", other),
    }
    let trans = flat.trans.to_string();
    assert!(!trans.contains("(_ curr v)"), "{}", trans);
    assert!(trans.contains("(+ (_ next pos) (_ next vel))"), "{}", trans);
    // The bounded_derivative subsystem has a trivial init.
    assert!(!flat.init.to_string().contains("lim"));
}

#[test]
fn test_relations_fixture_modes() {
    let program = compile_fixture("relations.kin");
    let tasks = program.tasks().unwrap();
    assert_eq!(tasks.len(), 3);

    let kinds: Vec<_> = tasks[0].goals.iter().map(|g| g.kind).collect();
    assert_eq!(kinds, vec![GoalKind::Property, GoalKind::Relation]);

    let names: Vec<_> = tasks[1].goal_names().collect();
    assert_eq!(names, vec!["jumps_by_two", "nonneg"]);

    let modes: Vec<_> = program.store.relations().map(|r| r.mode).collect();
    assert_eq!(modes, vec![RelationMode::Prove, RelationMode::Prove]);
    assert!(tasks[2].constants.contains_key("start"));
}

#[test]
fn test_cycle_fixture_rejected() {
    match compile_source(&load("cycle.kin")) {
        Err(CompileError::CompositionCycle { path, span }) => {
            assert_eq!(path, vec!["a", "b", "a"]);
            assert!(span.line > 0);
        }
        Err(other) => panic!("expected a composition cycle, got {}", other),
        Ok(_) => panic!("expected a composition cycle"),
    }
}
