//! Detecting proved properties that follow from the other proved ones.

use crate::path::Path;
use crate::smt::SmtTerm;
use crate::solver::{SatResult, SmtSolver};
use crate::unroll::Unroller;
use crate::{CancelToken, SymbolicResult};
use kinduct_ir::GoalKind;
use tracing::debug;

/// Names of the proved properties implied, in any single state, by the
/// proved properties not already found redundant. `proved` holds goal
/// indices in goal order; relations are never reported.
pub fn redundant_goals<S: SmtSolver>(
    unroller: &Unroller<'_>,
    solver: S,
    proved: &[usize],
    cancel: CancelToken,
) -> SymbolicResult<Vec<String>> {
    let goals = &unroller.task().goals;
    let properties: Vec<usize> = proved
        .iter()
        .copied()
        .filter(|&g| goals[g].kind == GoalKind::Property)
        .collect();
    if properties.len() < 2 {
        return Ok(Vec::new());
    }

    let mut path = Path::new(unroller, solver, false, cancel)?;
    let mut kept = properties.clone();
    let mut redundant = Vec::new();

    for &candidate in &properties {
        let others: Vec<_> = kept.iter().filter(|&&g| g != candidate).map(|&g| &goals[g]).collect();
        if others.is_empty() {
            continue;
        }
        let premise = unroller.goals_at(others, 0)?;
        let conclusion = unroller.goals_at([&goals[candidate]], 0)?;
        let query = SmtTerm::and_all([premise, conclusion.not()]);
        if path.query(&query, &[])?.0 == SatResult::Unsat {
            debug!(goal = %goals[candidate].name, "implied by the other proved goals");
            kept.retain(|&g| g != candidate);
            redundant.push(goals[candidate].name.clone());
        }
    }
    Ok(redundant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::mock::MockFactory;
    use crate::solver::SolverFactory;
    use kinduct_ir::{FlatSystem, RelationMode, VerificationTask};
    use kinduct_term::{Op, Sort, StateSignature, Term, Variable};
    use std::sync::Arc;

    fn task() -> VerificationTask {
        let system = FlatSystem {
            name: "s".into(),
            signature: StateSignature::new([Variable::new("x", Sort::Int)]).unwrap(),
            init: Term::bool(true),
            trans: Term::bool(true),
        };
        let ge = |n| Term::app(Op::Ge, vec![Term::curr("x"), Term::int(n)]);
        VerificationTask::new(Arc::new(system))
            .with_property("ge1", ge(1))
            .with_property("ge0", ge(0))
            .with_relation(
                "rel",
                Term::eq(Term::next("x"), Term::curr("x")),
                RelationMode::Prove,
            )
    }

    #[test]
    fn test_implied_property_reported_once() {
        let task = task();
        let unroller = Unroller::new(&task);
        // ge1 given ge0: sat. ge0 given ge1: unsat.
        let factory = MockFactory::new([SatResult::Sat, SatResult::Unsat]);
        let redundant =
            redundant_goals(&unroller, factory.create(None), &[0, 1, 2], CancelToken::new()).unwrap();
        assert_eq!(redundant, vec!["ge0"]);
        assert_eq!(factory.remaining(), 0);
    }

    #[test]
    fn test_single_property_not_pruned() {
        let task = task();
        let unroller = Unroller::new(&task);
        let factory = MockFactory::new([]);
        let redundant =
            redundant_goals(&unroller, factory.create(None), &[1, 2], CancelToken::new()).unwrap();
        assert!(redundant.is_empty());
        assert_eq!(factory.checks(), 0);
    }
}
