//! Composition cycles are rejected, and always with the same path.

use kinduct_ir::{compile_source, CompileError};
use kinduct_soundness::fixture;

fn cycle_path(source: &str) -> Vec<String> {
    match compile_source(source) {
        Err(CompileError::CompositionCycle { path, .. }) => path,
        Err(other) => panic!("expected a composition cycle, got {}", other),
        Ok(_) => panic!("expected a composition cycle"),
    }
}

#[test]
fn two_cycle_is_deterministic() {
    let source = fixture("cycle.kin").unwrap();
    let first = cycle_path(&source);
    assert_eq!(first, vec!["a", "b", "a"]);
    for _ in 0..20 {
        assert_eq!(cycle_path(&source), first);
    }
}

#[test]
fn three_cycle_reports_full_path() {
    let source = r#"
(define-sys a ((x Int)) true true ((b (_ curr x))))
(define-sys b ((x Int)) true true ((c (_ curr x))))
(define-sys c ((x Int)) true true ((a (_ curr x))))
"#;
    assert_eq!(cycle_path(source), vec!["a", "b", "c", "a"]);
}

#[test]
fn self_instantiation_is_a_cycle() {
    let source = "(define-sys s ((x Int)) true true ((s (_ curr x))))";
    assert_eq!(cycle_path(source), vec!["s", "s"]);
}

#[test]
fn shared_subsystem_is_not_a_cycle() {
    let source = r#"
(define-sys leaf ((x Int)) true true ())
(define-sys left ((x Int)) true true ((leaf (_ curr x))))
(define-sys right ((x Int)) true true ((leaf (_ curr x))))
(define-sys top ((x Int)) true true ((left (_ curr x)) (right (_ curr x))))
"#;
    let program = compile_source(source).unwrap();
    assert!(program.flat_system("top").is_some());
}
