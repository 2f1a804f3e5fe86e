//! Helpers shared by the soundness tests.
//!
//! Every helper returns `Result<_, String>` so tests can report the failing
//! stage in a proptest message without caring which crate produced it.

use indexmap::IndexMap;
use kinduct_ir::{compile_source, FlatSystem, Program, VerificationTask};
use kinduct_symbolic::unroll::Unroller;
use kinduct_symbolic::{
    verify_all, Report, SatResult, SmtSolver, SymbolicConfig, Verdict, Z3Solver,
};
use kinduct_syntax::{parse, pretty_print};
use kinduct_term::{Op, Sort, StateRow, Term, Value};
use std::path::PathBuf;
use std::sync::Arc;

/// Read a script from the workspace `fixtures/` directory.
pub fn fixture(name: &str) -> Result<String, String> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures")
        .join(name);
    std::fs::read_to_string(&path).map_err(|e| format!("{}: {}", path.display(), e))
}

pub fn compile_script(source: &str) -> Result<Program, String> {
    compile_source(source).map_err(|e| e.to_string())
}

/// Compile and verify every `verify` command of a script.
pub fn check_script(source: &str, config: &SymbolicConfig) -> Result<Vec<Report>, String> {
    let program = compile_script(source)?;
    let tasks = program.tasks().map_err(|e| e.to_string())?;
    Ok(verify_all(&tasks, config))
}

/// Verdict of `goal` in the `index`-th report.
pub fn verdict<'r>(reports: &'r [Report], index: usize, goal: &str) -> Option<&'r Verdict> {
    reports.get(index)?.verdict(goal)
}

/// Parse and pretty-print twice. A stable printer gives `p1 == p2`.
pub fn roundtrip_pretty(source: &str) -> Result<(String, String), String> {
    let first = parse(source).map_err(|e| format!("parse: {}", e))?;
    let p1 = pretty_print(&first);
    let second = parse(&p1).map_err(|e| format!("reparse: {}\n{}", e, p1))?;
    let p2 = pretty_print(&second);
    Ok((p1, p2))
}

/// Flattened form of every system in a program, in declaration order.
pub fn flat_systems(program: &Program) -> Result<Vec<Arc<FlatSystem>>, String> {
    program
        .systems
        .keys()
        .map(|name| {
            program
                .flat_system(name)
                .ok_or_else(|| format!("system '{}' was not flattened", name))
        })
        .collect()
}

/// Whether two formulas over a current and a next state of `system` agree
/// under every assignment.
pub fn equivalent(
    system: &Arc<FlatSystem>,
    constants: &IndexMap<String, Sort>,
    a: &Term,
    b: &Term,
) -> Result<bool, String> {
    let differ = Term::app(Op::Xor, vec![a.clone(), b.clone()]);
    unsatisfiable(system, constants, &differ)
}

/// Whether the solver agrees that `term` evaluates to `value` in `row`.
pub fn solver_agrees(
    system: &Arc<FlatSystem>,
    row: &StateRow,
    term: &Term,
    value: &Value,
) -> Result<bool, String> {
    let pinned = row
        .iter()
        .map(|(name, v)| Term::eq(Term::curr(name), Term::Lit(v.clone())));
    let differs = Term::not(Term::eq(term.clone(), Term::Lit(value.clone())));
    let query = Term::and_all(pinned.chain([differs]));
    unsatisfiable(system, &IndexMap::new(), &query)
}

fn unsatisfiable(
    system: &Arc<FlatSystem>,
    constants: &IndexMap<String, Sort>,
    formula: &Term,
) -> Result<bool, String> {
    let mut task = VerificationTask::new(system.clone());
    task.constants = constants.clone();
    let unroller = Unroller::new(&task);
    let mut solver = Z3Solver::new();

    unroller
        .declare_constants(&mut solver)
        .map_err(|e| e.to_string())?;
    for i in 0..2 {
        unroller
            .declare_frame(&mut solver, i)
            .map_err(|e| e.to_string())?;
    }
    let encoded = unroller.instantiate(formula, 0).map_err(|e| e.to_string())?;
    solver.assert(&encoded).map_err(|e| e.to_string())?;
    match solver.check_sat().map_err(|e| e.to_string())? {
        SatResult::Unsat => Ok(true),
        SatResult::Sat => Ok(false),
        SatResult::Unknown(reason) => Err(format!("solver unknown: {}", reason)),
    }
}
