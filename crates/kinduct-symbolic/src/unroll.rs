//! Instantiating formulas at positions of an unrolled path.
//!
//! A one-state formula at position `i` reads `X_i`; a two-state formula at
//! position `i` reads `curr` from `X_i` and `next` from `X_{i+1}`.

use crate::smt::{SmtTerm, SmtVar};
use crate::solver::SmtSolver;
use crate::{solver_error, SymbolicError, SymbolicResult};
use kinduct_ir::{Goal, GoalKind, VerificationTask};
use kinduct_term::{Stage, Term};

/// Instantiates the formulas of one task.
pub struct Unroller<'t> {
    task: &'t VerificationTask,
}

impl<'t> Unroller<'t> {
    pub fn new(task: &'t VerificationTask) -> Self {
        Self { task }
    }

    pub fn task(&self) -> &'t VerificationTask {
        self.task
    }

    /// State variables of position `index`, in signature order.
    pub fn frame_vars(&self, index: usize) -> Vec<SmtVar> {
        self.task
            .system
            .signature
            .names()
            .map(|name| SmtVar::state(name, index))
            .collect()
    }

    pub fn constant_vars(&self) -> Vec<SmtVar> {
        self.task.constants.keys().map(SmtVar::constant).collect()
    }

    pub fn declare_constants<S: SmtSolver>(&self, solver: &mut S) -> SymbolicResult<()> {
        for (name, sort) in &self.task.constants {
            solver
                .declare(&SmtVar::constant(name), *sort)
                .map_err(solver_error)?;
        }
        Ok(())
    }

    pub fn declare_frame<S: SmtSolver>(&self, solver: &mut S, index: usize) -> SymbolicResult<()> {
        for var in self.task.system.signature.iter() {
            solver
                .declare(&SmtVar::state(var.name, index), var.sort)
                .map_err(solver_error)?;
        }
        Ok(())
    }

    /// `term` with `curr` at `position` and `next` at `position + 1`.
    pub fn instantiate(&self, term: &Term, position: usize) -> SymbolicResult<SmtTerm> {
        Instantiation {
            position,
            locals: Vec::new(),
        }
        .lower(term)
    }

    /// Init(X_0).
    pub fn init(&self) -> SymbolicResult<SmtTerm> {
        self.instantiate(&self.task.system.init, 0)
    }

    /// Trans(X_i, X_{i+1}).
    pub fn trans(&self, i: usize) -> SymbolicResult<SmtTerm> {
        self.instantiate(&self.task.system.trans, i)
    }

    /// Every assumed relation over (X_i, X_{i+1}).
    pub fn assumptions(&self, i: usize) -> SymbolicResult<SmtTerm> {
        let terms = self
            .task
            .assumptions
            .iter()
            .map(|a| self.instantiate(&a.formula, i))
            .collect::<SymbolicResult<Vec<_>>>()?;
        Ok(SmtTerm::and_all(terms))
    }

    /// One goal at depth `k`: a property at `X_k`, a relation over
    /// `(X_{k-1}, X_k)`. Relations have no instance at depth 0.
    pub fn goal_at(&self, goal: &Goal, k: usize) -> SymbolicResult<Option<SmtTerm>> {
        match goal.kind {
            GoalKind::Property => self.instantiate(&goal.formula, k).map(Some),
            GoalKind::Relation if k == 0 => Ok(None),
            GoalKind::Relation => self.instantiate(&goal.formula, k - 1).map(Some),
        }
    }

    /// Conjunction of the selected goals at depth `k`.
    pub fn goals_at<'g>(
        &self,
        goals: impl IntoIterator<Item = &'g Goal>,
        k: usize,
    ) -> SymbolicResult<SmtTerm> {
        let mut terms = Vec::new();
        for goal in goals {
            if let Some(term) = self.goal_at(goal, k)? {
                terms.push(term);
            }
        }
        Ok(SmtTerm::and_all(terms))
    }
}

struct Instantiation {
    position: usize,
    /// Let-bound names in scope, innermost last.
    locals: Vec<(String, SmtTerm)>,
}

impl Instantiation {
    fn lower(&mut self, term: &Term) -> SymbolicResult<SmtTerm> {
        match term {
            Term::Lit(v) => Ok(SmtTerm::Lit(v.clone())),
            Term::State(v) => {
                let index = match v.stage {
                    Stage::Curr => self.position,
                    Stage::Next => self.position + 1,
                };
                Ok(SmtTerm::Var(SmtVar::state(v.name.clone(), index)))
            }
            Term::Const(name) => Ok(SmtTerm::Var(SmtVar::constant(name.clone()))),
            Term::Local(name) => self
                .locals
                .iter()
                .rev()
                .find(|(n, _)| n == name)
                .map(|(_, t)| t.clone())
                .ok_or_else(|| SymbolicError::Encoding {
                    term: name.clone(),
                    message: "unbound local".to_string(),
                }),
            Term::App(op, args) => {
                let args = args
                    .iter()
                    .map(|a| self.lower(a))
                    .collect::<SymbolicResult<Vec<_>>>()?;
                Ok(SmtTerm::App(*op, args))
            }
            Term::Let(bindings, body) => {
                // Parallel binding: every value sees the outer scope only.
                let values = bindings
                    .iter()
                    .map(|(name, value)| Ok((name.clone(), self.lower(value)?)))
                    .collect::<SymbolicResult<Vec<_>>>()?;
                let mark = self.locals.len();
                self.locals.extend(values);
                let result = self.lower(body);
                self.locals.truncate(mark);
                result
            }
            Term::Call(name, _) => Err(SymbolicError::Encoding {
                term: term.to_string(),
                message: format!("macro `{}` was not inlined", name),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinduct_ir::{FlatSystem, RelationMode};
    use kinduct_term::{Op, Sort, StateSignature, Variable};
    use std::sync::Arc;

    fn task() -> VerificationTask {
        let system = FlatSystem {
            name: "count".into(),
            signature: StateSignature::new([
                Variable::new("on", Sort::Bool),
                Variable::new("n", Sort::Int),
            ])
            .unwrap(),
            init: Term::eq(Term::curr("n"), Term::int(0)),
            trans: Term::eq(
                Term::next("n"),
                Term::app(Op::Add, vec![Term::curr("n"), Term::int(1)]),
            ),
        };
        VerificationTask::new(Arc::new(system))
            .with_property("nonneg", Term::app(Op::Ge, vec![Term::curr("n"), Term::int(0)]))
            .with_relation(
                "grows",
                Term::app(Op::Gt, vec![Term::next("n"), Term::curr("n")]),
                RelationMode::Prove,
            )
            .with_relation("on", Term::next("on"), RelationMode::Assume)
    }

    #[test]
    fn test_trans_positions() {
        let task = task();
        let u = Unroller::new(&task);
        assert_eq!(u.trans(2).unwrap().to_string(), "(= n@3 (+ n@2 1))");
        assert_eq!(u.init().unwrap().to_string(), "(= n@0 0)");
        assert_eq!(u.assumptions(4).unwrap().to_string(), "on@5");
    }

    #[test]
    fn test_goal_depths() {
        let task = task();
        let u = Unroller::new(&task);
        assert_eq!(u.goals_at(&task.goals, 0).unwrap().to_string(), "(>= n@0 0)");
        assert_eq!(
            u.goals_at(&task.goals, 2).unwrap().to_string(),
            "(and (>= n@2 0) (> n@2 n@1))"
        );
        assert_eq!(u.goal_at(&task.goals[1], 0).unwrap(), None);
    }

    #[test]
    fn test_let_is_parallel_and_scoped() {
        let task = task();
        let u = Unroller::new(&task);
        // (let ((a n) (b 1)) (let ((a (+ a b)) (b a)) (= b a)))
        let inner = Term::Let(
            vec![
                (
                    "a".into(),
                    Term::app(Op::Add, vec![Term::Local("a".into()), Term::Local("b".into())]),
                ),
                ("b".into(), Term::Local("a".into())),
            ],
            Box::new(Term::eq(Term::Local("b".into()), Term::Local("a".into()))),
        );
        let term = Term::Let(
            vec![("a".into(), Term::curr("n")), ("b".into(), Term::int(1))],
            Box::new(inner),
        );
        assert_eq!(
            u.instantiate(&term, 0).unwrap().to_string(),
            "(= n@0 (+ n@0 1))"
        );
    }

    #[test]
    fn test_unbound_local_and_call_rejected() {
        let task = task();
        let u = Unroller::new(&task);
        assert!(matches!(
            u.instantiate(&Term::Local("ghost".into()), 0),
            Err(SymbolicError::Encoding { .. })
        ));
        assert!(matches!(
            u.instantiate(&Term::Call("limit".into(), vec![]), 0),
            Err(SymbolicError::Encoding { .. })
        ));
    }

    #[test]
    fn test_frame_vars_follow_signature() {
        let task = task();
        let u = Unroller::new(&task);
        let names: Vec<_> = u.frame_vars(1).iter().map(|v| v.symbol()).collect();
        assert_eq!(names, vec!["on@1", "n@1"]);
        assert!(u.constant_vars().is_empty());
    }
}
