//! Symbolic verification of kinduct systems using Z3.
//!
//! Provides k-induction, which proves or falsifies the goals of a `verify`
//! command jointly, and bounded model checking, which only falsifies.

pub mod backends;
pub mod bmc;
pub mod event;
pub mod invgen;
pub mod k_induction;
mod path;
pub mod portfolio;
pub mod prune;
pub mod report;
pub mod smt;
pub mod solver;
pub mod trace;
pub mod unroll;

pub use backends::{Z3Error, Z3Factory, Z3Solver};
pub use event::{Event, EventSink};
pub use report::{Report, Trace, Verdict};
pub use smt::{SmtTerm, SmtVar};
pub use solver::{Model, SatResult, SmtSolver, SolverFactory};
pub use trace::{replay, ReplayMismatch};

use kinduct_ir::{compile_source, CompileError, VerificationTask};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use thiserror::Error;

/// Symbolic checking error. Solver `unknown` answers are not errors; they
/// become [`Verdict::Unknown`].
#[derive(Debug, Error)]
pub enum SymbolicError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("cannot encode `{term}`: {message}")]
    Encoding { term: String, message: String },

    #[error("solver error: {0}")]
    Solver(String),

    #[error("model has no value for {0}")]
    MissingValue(String),

    #[error("verification of system '{0}' panicked")]
    TaskPanicked(String),
}

pub type SymbolicResult<T> = Result<T, SymbolicError>;

pub(crate) fn solver_error(e: impl std::error::Error) -> SymbolicError {
    SymbolicError::Solver(e.to_string())
}

/// Shared flag for stopping a run. Checked between solver calls; sessions
/// that support it also abandon a check in progress.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Symbolic checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymbolicMode {
    /// Prove or falsify by k-induction.
    #[default]
    KInduction,
    /// Bounded model checking: search for counterexamples only.
    Bmc,
}

/// Configuration for symbolic checking.
#[derive(Debug, Clone)]
pub struct SymbolicConfig {
    pub mode: SymbolicMode,
    /// Largest depth tried; depths run from 0.
    pub max_depth: usize,
    /// Per solver call, in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Report proved goals implied by the other proved goals.
    pub prune: bool,
    /// Mine invariants and assume them in the inductive step.
    pub invgen: bool,
    pub cancel: CancelToken,
    pub events: EventSink,
}

impl Default for SymbolicConfig {
    fn default() -> Self {
        Self {
            mode: SymbolicMode::KInduction,
            max_depth: 10,
            timeout_ms: None,
            prune: false,
            invgen: false,
            cancel: CancelToken::new(),
            events: EventSink::default(),
        }
    }
}

impl SymbolicConfig {
    pub fn bmc() -> Self {
        Self {
            mode: SymbolicMode::Bmc,
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: SymbolicMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_prune(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    pub fn with_invgen(mut self, invgen: bool) -> Self {
        self.invgen = invgen;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_events(mut self, sender: Sender<Event>) -> Self {
        self.events = EventSink::new(sender);
        self
    }
}

/// Verify one task with sessions from `factory`.
pub fn verify_with<F: SolverFactory>(
    task: &VerificationTask,
    config: &SymbolicConfig,
    factory: &F,
) -> SymbolicResult<Report> {
    match config.mode {
        SymbolicMode::KInduction => k_induction::check_k_induction(task, config, factory),
        SymbolicMode::Bmc => bmc::check_bmc(task, config, factory),
    }
}

/// Verify one task with Z3.
pub fn verify(task: &VerificationTask, config: &SymbolicConfig) -> SymbolicResult<Report> {
    verify_with(task, config, &Z3Factory)
}

/// Verify independent tasks in parallel with Z3. A failing task reports
/// its goals as unknown without affecting the others.
pub fn verify_all(tasks: &[VerificationTask], config: &SymbolicConfig) -> Vec<Report> {
    portfolio::verify_all_with(tasks, config, &Z3Factory)
}

/// Compile a script and run every `verify` command in it.
pub fn verify_script(source: &str, config: &SymbolicConfig) -> SymbolicResult<Vec<Report>> {
    let program = compile_source(source)?;
    let tasks = program.tasks()?;
    Ok(verify_all(&tasks, config))
}
