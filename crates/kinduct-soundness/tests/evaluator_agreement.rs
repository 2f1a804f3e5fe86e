//! The concrete evaluator and the solver encoding agree on integer terms.
//!
//! For a random term t and a concrete state s, eval(t, s) = v must make
//! `s /\ t != v` unsatisfiable. Divisors are nonzero literals and products
//! have a small literal factor so every value fits the solver's literals.

use indexmap::IndexMap;
use kinduct_ir::FlatSystem;
use kinduct_soundness::solver_agrees;
use kinduct_term::{eval, Frame, Op, Sort, StateRow, StateSignature, Term, Value, Variable};
use proptest::prelude::*;
use std::sync::Arc;

fn system() -> Arc<FlatSystem> {
    Arc::new(FlatSystem {
        name: "vars".into(),
        signature: StateSignature::new([
            Variable::new("x", Sort::Int),
            Variable::new("y", Sort::Int),
        ])
        .unwrap(),
        init: Term::bool(true),
        trans: Term::bool(true),
    })
}

fn divisor() -> impl Strategy<Value = i64> {
    prop_oneof![-5i64..=-1, 1i64..=5]
}

fn int_term() -> impl Strategy<Value = Term> {
    let leaf = prop_oneof![
        Just(Term::curr("x")),
        Just(Term::curr("y")),
        (-20i64..=20).prop_map(Term::int),
    ];
    leaf.prop_recursive(4, 32, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Term::app(Op::Add, vec![a, b])),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Term::app(Op::Sub, vec![a, b])),
            (inner.clone(), -5i64..=5)
                .prop_map(|(a, k)| Term::app(Op::Mul, vec![Term::int(k), a])),
            inner.clone().prop_map(|a| Term::app(Op::Neg, vec![a])),
            inner.clone().prop_map(|a| Term::app(Op::Abs, vec![a])),
            (inner.clone(), divisor())
                .prop_map(|(a, d)| Term::app(Op::IntDiv, vec![a, Term::int(d)])),
            (inner.clone(), divisor())
                .prop_map(|(a, d)| Term::app(Op::Mod, vec![a, Term::int(d)])),
            (inner.clone(), inner.clone(), inner.clone(), inner).prop_map(|(a, b, t, e)| {
                Term::ite(Term::app(Op::Ge, vec![a, b]), t, e)
            }),
        ]
    })
}

fn row(x: i64, y: i64) -> StateRow {
    let mut row = StateRow::new();
    row.insert("x", Value::int(x));
    row.insert("y", Value::int(y));
    row
}

#[test]
fn euclidean_division_agrees() {
    let system = system();
    for (a, b) in [(7, 2), (-7, 2), (7, -2), (-7, -2)] {
        let state = row(a, b);
        for op in [Op::IntDiv, Op::Mod] {
            let term = Term::app(op, vec![Term::curr("x"), Term::curr("y")]);
            let value = eval(&term, &Frame::single(&state, &IndexMap::new())).unwrap();
            assert!(
                solver_agrees(&system, &state, &term, &value).unwrap(),
                "{} with x = {}, y = {} gives {}",
                term,
                a,
                b,
                value
            );
        }
    }
}

#[test]
fn wrong_value_is_refuted() {
    let system = system();
    let state = row(3, 4);
    let term = Term::app(Op::Add, vec![Term::curr("x"), Term::curr("y")]);
    assert!(solver_agrees(&system, &state, &term, &Value::int(7)).unwrap());
    assert!(!solver_agrees(&system, &state, &term, &Value::int(8)).unwrap());
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn evaluator_matches_solver(term in int_term(), x in -50i64..=50, y in -50i64..=50) {
        let state = row(x, y);
        let value = eval(&term, &Frame::single(&state, &IndexMap::new()))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let agrees = solver_agrees(&system(), &state, &term, &value)
            .map_err(TestCaseError::fail)?;
        prop_assert!(agrees, "{} evaluates to {} at x = {}, y = {}", term, value, x, y);
    }
}
