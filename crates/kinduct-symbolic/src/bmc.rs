//! Bounded model checking: the base case of k-induction on its own.
//!
//! At depth `k` the path from Init is unrolled to `X_k` and the pending
//! goals are negated at depth `k`. A satisfiable query is a real
//! counterexample of `k + 1` states.

use crate::event::Event;
use crate::path::Path;
use crate::report::{Report, Trace, Verdict};
use crate::solver::{SatResult, SmtSolver, SolverFactory};
use crate::trace::{check_replay, extract_trace, trace_vars};
use crate::unroll::Unroller;
use crate::{SymbolicConfig, SymbolicResult};
use tracing::{debug, info};

/// What the base query at one depth found.
#[derive(Debug, Default)]
pub(crate) struct BaseOutcome {
    /// Falsified goals (indices into the task's goals) in goal order.
    pub violations: Vec<(usize, Trace)>,
    /// The solver could not decide the remaining goals.
    pub unknown: Option<String>,
}

/// Falsify pending goals at depth `k`. Falsified goals are removed from
/// `pending`; the search continues with the rest until the joint query is
/// unsatisfiable.
pub(crate) fn falsify<S: SmtSolver>(
    path: &mut Path<'_, '_, S>,
    unroller: &Unroller<'_>,
    pending: &mut Vec<usize>,
    k: usize,
) -> SymbolicResult<BaseOutcome> {
    let goals = &unroller.task().goals;
    let mut outcome = BaseOutcome::default();

    while !pending.is_empty() {
        let negated = unroller.goals_at(pending.iter().map(|&g| &goals[g]), k)?.not();
        match path.query(&negated, &[])?.0 {
            SatResult::Unsat => break,
            SatResult::Unknown(reason) => {
                outcome.unknown = Some(reason);
                break;
            }
            SatResult::Sat => {}
        }

        // Some goal fails at depth k: find the first one in goal order.
        let read = trace_vars(unroller, k);
        let mut found = None;
        for (slot, &g) in pending.iter().enumerate() {
            let Some(term) = unroller.goal_at(&goals[g], k)? else {
                continue;
            };
            if let (SatResult::Sat, Some(model)) = path.query(&term.not(), &read)? {
                found = Some((slot, extract_trace(&model, unroller, k)?));
                break;
            }
        }
        match found {
            Some((slot, trace)) => {
                let g = pending.remove(slot);
                debug!(goal = %goals[g].name, depth = k, "isolated falsified goal");
                outcome.violations.push((g, trace));
            }
            None => {
                outcome.unknown = Some(format!(
                    "could not isolate the falsified goal at depth {}",
                    k
                ));
                break;
            }
        }
    }
    Ok(outcome)
}

/// Record base-case violations in `verdicts`.
pub(crate) fn record_violations(
    config: &SymbolicConfig,
    unroller: &Unroller<'_>,
    verdicts: &mut [Option<Verdict>],
    violations: Vec<(usize, Trace)>,
    depth: usize,
) {
    let task = unroller.task();
    for (g, trace) in violations {
        let goal = &task.goals[g];
        info!(system = %task.system.name, goal = %goal.name, depth, "goal falsified");
        check_replay(task, goal, &trace);
        config.events.emit(Event::Falsified {
            system: task.system.name.clone(),
            depth,
            goal: goal.name.clone(),
        });
        verdicts[g] = Some(Verdict::Violated { depth, trace });
    }
}

/// Mark every pending goal unresolved.
pub(crate) fn resolve_unknown(
    config: &SymbolicConfig,
    unroller: &Unroller<'_>,
    verdicts: &mut [Option<Verdict>],
    pending: &mut Vec<usize>,
    depth: usize,
    reason: String,
) {
    if pending.is_empty() {
        return;
    }
    let task = unroller.task();
    let names: Vec<String> = pending.iter().map(|&g| task.goals[g].name.clone()).collect();
    info!(system = %task.system.name, depth, %reason, goals = ?names, "goals unresolved");
    config.events.emit(Event::Unresolved {
        system: task.system.name.clone(),
        depth,
        goals: names,
        reason: reason.clone(),
    });
    for g in pending.drain(..) {
        verdicts[g] = Some(Verdict::Unknown {
            depth,
            reason: reason.clone(),
        });
    }
}

/// Collect verdicts into a report in goal order.
pub(crate) fn into_report(unroller: &Unroller<'_>, verdicts: Vec<Option<Verdict>>) -> Report {
    let task = unroller.task();
    let mut report = Report::new(task.system.name.clone());
    for (goal, verdict) in task.goals.iter().zip(verdicts) {
        let verdict = verdict.unwrap_or_else(|| Verdict::Unknown {
            depth: 0,
            reason: "not checked".to_string(),
        });
        report.results.insert(goal.name.clone(), verdict);
    }
    report
}

/// Search for counterexamples up to `config.max_depth`. Never proves.
pub fn check_bmc<F: SolverFactory>(
    task: &kinduct_ir::VerificationTask,
    config: &SymbolicConfig,
    factory: &F,
) -> SymbolicResult<Report> {
    let unroller = Unroller::new(task);
    let system = &task.system.name;
    let mut verdicts = vec![None; task.goals.len()];
    let mut pending: Vec<usize> = (0..task.goals.len()).collect();

    info!(%system, goals = pending.len(), max_depth = config.max_depth, "starting BMC");
    config.events.emit(Event::Started {
        system: system.clone(),
        goals: task.goal_names().map(String::from).collect(),
    });
    if pending.is_empty() {
        return Ok(into_report(&unroller, verdicts));
    }

    let mut path = Path::new(
        &unroller,
        factory.create(config.timeout_ms),
        true,
        config.cancel.clone(),
    )?;

    // An unknown depth does not stop the search: deeper paths may still
    // reach a violation.
    let mut undecided: Option<String> = None;
    for k in 0..=config.max_depth {
        if config.cancel.is_cancelled() {
            resolve_unknown(config, &unroller, &mut verdicts, &mut pending, k, "cancelled".into());
            break;
        }
        debug!(%system, depth = k, "BMC step");
        path.extend_to(k)?;
        let outcome = falsify(&mut path, &unroller, &mut pending, k)?;
        record_violations(config, &unroller, &mut verdicts, outcome.violations, k);
        if pending.is_empty() {
            break;
        }
        if let Some(reason) = outcome.unknown {
            debug!(%system, depth = k, %reason, "BMC depth unknown");
            undecided.get_or_insert(reason);
            continue;
        }
        config.events.emit(Event::BaseClean {
            system: system.clone(),
            depth: k,
            goals: pending.iter().map(|&g| task.goals[g].name.clone()).collect(),
        });
    }

    let reason = undecided
        .unwrap_or_else(|| format!("no counterexample up to depth {}", config.max_depth));
    resolve_unknown(
        config,
        &unroller,
        &mut verdicts,
        &mut pending,
        config.max_depth,
        reason,
    );
    Ok(into_report(&unroller, verdicts))
}
