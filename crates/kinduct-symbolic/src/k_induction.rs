//! k-induction over the goals of one task, checked jointly.
//!
//! At depth `k` two queries run, each on its own incremental session:
//!   Base case: Init(X_0), Trans and assumptions up to X_k, and the
//!     pending goals negated at depth k. Satisfiable means a real
//!     counterexample.
//!   Inductive step: Trans and assumptions up to X_{k+1}, the pending goals
//!     assumed at depths 0..=k, and negated at depth k+1. Unsatisfiable
//!     means every pending goal holds in all reachable states.
//!
//! Goals strengthen each other: all of them are hypotheses of the step
//! query. A goal falsified by the base case is dropped and the step
//! session is rebuilt without it, since it can no longer serve as a
//! hypothesis. Generated invariants, when enabled, are hypotheses at every
//! position of the step path.
//!
//! A step proof at depth k needs a clean base case at every depth up to k.
//! Once a base query comes back unknown, later depths only search for
//! counterexamples.

use crate::bmc::{falsify, into_report, record_violations, resolve_unknown};
use crate::event::Event;
use crate::invgen::{conjunction, generate_invariants};
use crate::path::Path;
use crate::prune::redundant_goals;
use crate::report::{Report, Verdict};
use crate::solver::{SatResult, SolverFactory};
use crate::unroll::Unroller;
use crate::{SymbolicConfig, SymbolicResult};
use kinduct_ir::VerificationTask;
use tracing::{debug, info};

/// Run k-induction for depths `0..=config.max_depth`.
pub fn check_k_induction<F: SolverFactory>(
    task: &VerificationTask,
    config: &SymbolicConfig,
    factory: &F,
) -> SymbolicResult<Report> {
    let unroller = Unroller::new(task);
    let system = &task.system.name;
    let goals = &task.goals;
    let names = |pending: &[usize]| -> Vec<String> {
        pending.iter().map(|&g| goals[g].name.clone()).collect()
    };

    let mut verdicts = vec![None; goals.len()];
    let mut pending: Vec<usize> = (0..goals.len()).collect();

    info!(
        %system,
        goals = goals.len(),
        assumptions = task.assumptions.len(),
        max_depth = config.max_depth,
        invgen = config.invgen,
        "starting k-induction"
    );
    config.events.emit(Event::Started {
        system: system.clone(),
        goals: names(&pending),
    });
    if pending.is_empty() {
        return Ok(into_report(&unroller, verdicts));
    }

    let invariants = if config.invgen {
        generate_invariants(
            &unroller,
            factory.create(config.timeout_ms),
            factory.create(config.timeout_ms),
            config.cancel.clone(),
        )?
    } else {
        Vec::new()
    };
    if !invariants.is_empty() {
        config.events.emit(Event::Strengthened {
            system: system.clone(),
            invariants: invariants.iter().map(ToString::to_string).collect(),
        });
    }

    let mut base = Path::new(
        &unroller,
        factory.create(config.timeout_ms),
        true,
        config.cancel.clone(),
    )?;
    let mut step = Path::new(
        &unroller,
        factory.create(config.timeout_ms),
        false,
        config.cancel.clone(),
    )?;
    // The step session holds the pending goals as hypotheses at
    // 0..hypotheses and the invariants at 0..strengthened.
    let mut hypotheses = 0;
    let mut strengthened = 0;
    let mut proved_at = None;
    let mut last_unknown = None;
    // First depth whose base case the solver could not decide.
    let mut undecided: Option<(usize, String)> = None;

    for k in 0..=config.max_depth {
        if config.cancel.is_cancelled() {
            info!(%system, depth = k, "k-induction cancelled");
            resolve_unknown(config, &unroller, &mut verdicts, &mut pending, k, "cancelled".into());
            break;
        }

        debug!(%system, depth = k, "k-induction base case");
        base.extend_to(k)?;
        let outcome = falsify(&mut base, &unroller, &mut pending, k)?;
        let falsified = !outcome.violations.is_empty();
        record_violations(config, &unroller, &mut verdicts, outcome.violations, k);
        if let Some(reason) = outcome.unknown {
            debug!(%system, depth = k, %reason, "base case unknown");
            undecided.get_or_insert((k, reason));
        }
        if pending.is_empty() {
            break;
        }
        if undecided.is_some() {
            continue;
        }
        config.events.emit(Event::BaseClean {
            system: system.clone(),
            depth: k,
            goals: names(&pending),
        });

        if falsified {
            step.reset()?;
            hypotheses = 0;
            strengthened = 0;
        }

        debug!(%system, depth = k, "k-induction inductive step");
        step.extend_to(k + 1)?;
        while hypotheses <= k {
            let held = unroller.goals_at(pending.iter().map(|&g| &goals[g]), hypotheses)?;
            step.assert(&held)?;
            hypotheses += 1;
        }
        while strengthened <= k + 1 {
            step.assert(&conjunction(&unroller, &invariants, strengthened)?)?;
            strengthened += 1;
        }
        let negated = unroller
            .goals_at(pending.iter().map(|&g| &goals[g]), k + 1)?
            .not();
        match step.query(&negated, &[])?.0 {
            SatResult::Unsat => {
                info!(%system, depth = k, goals = ?names(&pending), "goals proved");
                config.events.emit(Event::Proved {
                    system: system.clone(),
                    depth: k,
                    goals: names(&pending),
                });
                for g in pending.drain(..) {
                    verdicts[g] = Some(Verdict::AllHold { depth: k });
                }
                proved_at = Some(k);
                break;
            }
            SatResult::Sat => {
                debug!(%system, depth = k, "inductive step failed");
                config.events.emit(Event::StepFailed {
                    system: system.clone(),
                    depth: k,
                });
            }
            SatResult::Unknown(reason) => {
                debug!(%system, depth = k, %reason, "inductive step unknown");
                config.events.emit(Event::StepFailed {
                    system: system.clone(),
                    depth: k,
                });
                last_unknown = Some(reason);
            }
        }
    }

    let reason = match undecided {
        Some((depth, reason)) => format!("{} (base case at depth {})", reason, depth),
        None => last_unknown.unwrap_or_else(|| {
            format!(
                "not proved or falsified up to depth {}",
                config.max_depth
            )
        }),
    };
    resolve_unknown(
        config,
        &unroller,
        &mut verdicts,
        &mut pending,
        config.max_depth,
        reason,
    );

    let proved: Vec<usize> = verdicts
        .iter()
        .enumerate()
        .filter(|(_, v)| matches!(v, Some(Verdict::AllHold { .. })))
        .map(|(g, _)| g)
        .collect();
    let mut report = into_report(&unroller, verdicts);
    if config.prune && proved.len() > 1 {
        debug!(%system, depth = ?proved_at, "pruning proved goals");
        let solver = factory.create(config.timeout_ms);
        report.redundant = redundant_goals(&unroller, solver, &proved, config.cancel.clone())?;
    }
    Ok(report)
}
