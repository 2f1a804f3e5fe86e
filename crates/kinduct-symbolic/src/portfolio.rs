//! Running independent verification tasks in parallel.
//!
//! Each task gets its own thread and its own solver sessions; Z3 contexts
//! are thread-local, so nothing solver-side is shared. Reports come back in
//! task order. A task that fails only loses its own verdicts.

use crate::event::Event;
use crate::report::{Report, Verdict};
use crate::solver::SolverFactory;
use crate::{verify_with, SymbolicConfig, SymbolicError};
use kinduct_ir::VerificationTask;
use std::thread;
use tracing::{info, warn};

/// Verify every task, one thread per task. A task whose run fails gets an
/// `Unknown` verdict for each of its goals, carrying the error.
pub fn verify_all_with<F>(
    tasks: &[VerificationTask],
    config: &SymbolicConfig,
    factory: &F,
) -> Vec<Report>
where
    F: SolverFactory + Sync,
{
    info!(tasks = tasks.len(), "verifying tasks in parallel");
    thread::scope(|scope| {
        let handles: Vec<_> = tasks
            .iter()
            .map(|task| {
                let config = config.clone();
                scope.spawn(move || verify_with(task, &config, factory))
            })
            .collect();
        handles
            .into_iter()
            .zip(tasks)
            .map(|(handle, task)| {
                handle
                    .join()
                    .unwrap_or_else(|_| {
                        Err(SymbolicError::TaskPanicked(task.system.name.clone()))
                    })
                    .unwrap_or_else(|error| failed_report(task, config, &error))
            })
            .collect()
    })
}

/// Every goal of `task` unresolved because of `error`.
fn failed_report(task: &VerificationTask, config: &SymbolicConfig, error: &SymbolicError) -> Report {
    let system = &task.system.name;
    warn!(%system, %error, "verification task failed");
    let reason = error.to_string();
    config.events.emit(Event::Unresolved {
        system: system.clone(),
        depth: 0,
        goals: task.goal_names().map(String::from).collect(),
        reason: reason.clone(),
    });
    let mut report = Report::new(system.clone());
    for goal in &task.goals {
        report.results.insert(
            goal.name.clone(),
            Verdict::Unknown {
                depth: 0,
                reason: reason.clone(),
            },
        );
    }
    report
}
