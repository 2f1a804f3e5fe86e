//! An unrolled path held by one solver session.

use crate::smt::{SmtTerm, SmtVar};
use crate::solver::{Model, SatResult, SmtSolver};
use crate::unroll::Unroller;
use crate::{solver_error, CancelToken, SymbolicResult};
use tracing::debug;

/// Positions `0..len` of a path, with Trans and the assumed relations
/// asserted between consecutive positions. Extending the path keeps every
/// earlier assertion, so deeper queries reuse the solver state.
pub(crate) struct Path<'u, 't, S: SmtSolver> {
    unroller: &'u Unroller<'t>,
    solver: S,
    /// Position 0 is constrained by Init.
    initial: bool,
    len: usize,
    cancel: CancelToken,
}

impl<'u, 't, S: SmtSolver> Path<'u, 't, S> {
    pub fn new(
        unroller: &'u Unroller<'t>,
        mut solver: S,
        initial: bool,
        cancel: CancelToken,
    ) -> SymbolicResult<Self> {
        solver.interrupt_on(&cancel);
        let mut path = Self {
            unroller,
            solver,
            initial,
            len: 0,
            cancel,
        };
        path.build()?;
        Ok(path)
    }

    fn build(&mut self) -> SymbolicResult<()> {
        self.unroller.declare_constants(&mut self.solver)?;
        self.unroller.declare_frame(&mut self.solver, 0)?;
        if self.initial {
            let init = self.unroller.init()?;
            self.assert(&init)?;
        }
        self.len = 1;
        Ok(())
    }

    /// Drop every assertion and start again from position 0.
    pub fn reset(&mut self) -> SymbolicResult<()> {
        debug!(initial = self.initial, "resetting path");
        self.solver.reset().map_err(solver_error)?;
        self.build()
    }

    /// Make position `last` available.
    pub fn extend_to(&mut self, last: usize) -> SymbolicResult<()> {
        while self.len <= last {
            let i = self.len - 1;
            self.unroller.declare_frame(&mut self.solver, i + 1)?;
            let trans = self.unroller.trans(i)?;
            self.assert(&trans)?;
            let assumed = self.unroller.assumptions(i)?;
            self.assert(&assumed)?;
            self.len += 1;
        }
        Ok(())
    }

    pub fn assert(&mut self, term: &SmtTerm) -> SymbolicResult<()> {
        if *term == SmtTerm::bool(true) {
            return Ok(());
        }
        self.solver.assert(term).map_err(solver_error)
    }

    /// Check the path together with `extra`, which is retracted afterwards.
    /// On `Sat`, the values of `read` are returned. A cancelled run answers
    /// `Unknown` without calling the solver.
    pub fn query(
        &mut self,
        extra: &SmtTerm,
        read: &[SmtVar],
    ) -> SymbolicResult<(SatResult, Option<Model>)> {
        if self.cancel.is_cancelled() {
            return Ok((SatResult::Unknown("cancelled".to_string()), None));
        }
        self.solver.push().map_err(solver_error)?;
        let result = self.query_in_scope(extra, read);
        self.solver.pop().map_err(solver_error)?;
        result
    }

    fn query_in_scope(
        &mut self,
        extra: &SmtTerm,
        read: &[SmtVar],
    ) -> SymbolicResult<(SatResult, Option<Model>)> {
        self.assert(extra)?;
        let result = self.solver.check_sat().map_err(solver_error)?;
        let model = if result == SatResult::Sat && !read.is_empty() {
            Some(self.solver.get_model(read).map_err(solver_error)?)
        } else {
            None
        };
        Ok((result, model))
    }
}
