//! Invariant generation from templates mined out of the system.
//!
//! Candidates are one-state atoms: the comparisons and equalities that
//! occur in Init and Trans (with `next` read as `curr`), Bool state
//! variables and their negations, and bounds `v >= c` / `v <= c` for every
//! numeric state variable `v` and literal `c` of its sort. Candidates that
//! fail in some initial state are dropped, then the rest are filtered to a
//! fixpoint where their conjunction is 1-inductive. What survives holds in
//! every reachable state and may be assumed by the inductive step.

use crate::path::Path;
use crate::smt::SmtTerm;
use crate::solver::{SatResult, SmtSolver};
use crate::trace::{extract_trace, trace_vars};
use crate::unroll::Unroller;
use crate::{CancelToken, SymbolicResult};
use indexmap::{IndexMap, IndexSet};
use kinduct_term::{
    eval_bool, substitute, Frame, Mapping, Op, Sort, Stage, StateRow, StateVar, Term, Value,
    VarRef,
};
use tracing::{debug, info};

/// Candidates kept after mining.
pub const MAX_CANDIDATES: usize = 128;

/// Mine candidate invariants from the Init and Trans of the task's system.
pub fn candidates(unroller: &Unroller<'_>) -> Vec<Term> {
    let system = &unroller.task().system;
    let mut found = IndexSet::new();
    let mut literals = IndexSet::new();

    for formula in [&system.init, &system.trans] {
        formula.visit(&mut |t| match t {
            Term::Lit(value @ (Value::Int(_) | Value::Real(_))) => {
                literals.insert(value.clone());
            }
            Term::App(op, args) if is_atom(*op) && args.len() >= 2 => {
                if let Some(atom) = one_state(t) {
                    found.insert(atom);
                }
            }
            _ => {}
        });
    }

    for var in system.signature.iter() {
        let current = Term::curr(var.name.clone());
        match var.sort {
            Sort::Bool => {
                found.insert(current.clone());
                found.insert(Term::not(current));
            }
            sort => {
                for value in literals.iter().filter(|v| v.sort() == sort) {
                    let bound = Term::Lit(value.clone());
                    found.insert(Term::app(Op::Ge, vec![current.clone(), bound.clone()]));
                    found.insert(Term::app(Op::Le, vec![current.clone(), bound]));
                }
            }
        }
    }

    found.into_iter().take(MAX_CANDIDATES).collect()
}

fn is_atom(op: Op) -> bool {
    op.is_comparison() || matches!(op, Op::Eq | Op::Distinct)
}

/// `term` over a single state: unchanged if it only reads `curr`, shifted
/// back if it only reads `next`. Terms over both states, locals or macro
/// calls are not candidates.
fn one_state(term: &Term) -> Option<Term> {
    let mut closed = true;
    term.visit(&mut |t| {
        if matches!(t, Term::Local(_) | Term::Let(..) | Term::Call(..)) {
            closed = false;
        }
    });
    let vars = term.state_vars();
    if !closed || vars.is_empty() {
        return None;
    }
    let uses_curr = vars.iter().any(|v| v.stage == Stage::Curr);
    let uses_next = vars.iter().any(|v| v.stage == Stage::Next);
    match (uses_curr, uses_next) {
        (true, false) => Some(term.clone()),
        (false, true) => {
            let mapping: Mapping = vars
                .into_iter()
                .map(|v| {
                    let image = Term::State(StateVar::curr(v.name.clone()));
                    (VarRef::State(v), image)
                })
                .collect();
            Some(substitute(term, &mapping))
        }
        _ => None,
    }
}

/// The candidates that hold initially and are jointly 1-inductive. Solver
/// `unknown` answers give up and return no invariants.
pub fn generate_invariants<S: SmtSolver>(
    unroller: &Unroller<'_>,
    base_solver: S,
    step_solver: S,
    cancel: CancelToken,
) -> SymbolicResult<Vec<Term>> {
    let system = &unroller.task().system.name;
    let mut kept = candidates(unroller);
    info!(%system, candidates = kept.len(), "mining invariants");
    if kept.is_empty() {
        return Ok(kept);
    }

    let mut base = Path::new(unroller, base_solver, true, cancel.clone())?;
    let read = trace_vars(unroller, 0);
    while !kept.is_empty() {
        let negated = conjunction(unroller, &kept, 0)?.not();
        let model = match base.query(&negated, &read)? {
            (SatResult::Unsat, _) => break,
            (SatResult::Sat, Some(model)) => model,
            (SatResult::Sat, None) => return Ok(Vec::new()),
            (SatResult::Unknown(reason), _) => {
                debug!(%system, %reason, "invariant base check unknown");
                return Ok(Vec::new());
            }
        };
        let trace = extract_trace(&model, unroller, 0)?;
        if !retain_holding(&mut kept, &trace.states[0], &trace.constants) {
            return Ok(Vec::new());
        }
    }
    debug!(%system, remaining = kept.len(), "initial states filtered");

    let mut step = Path::new(unroller, step_solver, false, cancel)?;
    step.extend_to(1)?;
    let read = trace_vars(unroller, 1);
    while !kept.is_empty() {
        let query = SmtTerm::and_all([
            conjunction(unroller, &kept, 0)?,
            conjunction(unroller, &kept, 1)?.not(),
        ]);
        let model = match step.query(&query, &read)? {
            (SatResult::Unsat, _) => break,
            (SatResult::Sat, Some(model)) => model,
            (SatResult::Sat, None) => return Ok(Vec::new()),
            (SatResult::Unknown(reason), _) => {
                debug!(%system, %reason, "invariant step check unknown");
                return Ok(Vec::new());
            }
        };
        let trace = extract_trace(&model, unroller, 1)?;
        if !retain_holding(&mut kept, &trace.states[1], &trace.constants) {
            return Ok(Vec::new());
        }
    }

    info!(%system, invariants = kept.len(), "invariants generated");
    Ok(kept)
}

/// Drop the candidates false in `row`. False when nothing was dropped,
/// which happens when the model was approximated.
fn retain_holding(
    kept: &mut Vec<Term>,
    row: &StateRow,
    constants: &IndexMap<String, Value>,
) -> bool {
    let before = kept.len();
    let frame = Frame::single(row, constants);
    kept.retain(|c| eval_bool(c, &frame).unwrap_or(false));
    kept.len() < before
}

/// The conjunction of `invariants` at `position`.
pub(crate) fn conjunction(
    unroller: &Unroller<'_>,
    invariants: &[Term],
    position: usize,
) -> SymbolicResult<SmtTerm> {
    let terms = invariants
        .iter()
        .map(|t| unroller.instantiate(t, position))
        .collect::<SymbolicResult<Vec<_>>>()?;
    Ok(SmtTerm::and_all(terms))
}
