//! Abstract incremental solver interface.

use crate::smt::{SmtTerm, SmtVar};
use crate::CancelToken;
use kinduct_term::{Sort, Value};
use std::collections::HashMap;

/// Result of a satisfiability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatResult {
    Sat,
    Unsat,
    /// Resource limit, timeout or incompleteness; carries the reason.
    Unknown(String),
}

/// Variable assignments read back after a `Sat` result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub values: HashMap<SmtVar, Value>,
    /// Some value is a rational approximation of an irrational one.
    pub approximate: bool,
}

impl Model {
    pub fn get(&self, var: &SmtVar) -> Option<&Value> {
        self.values.get(var)
    }

    pub fn insert(&mut self, var: SmtVar, value: Value) {
        self.values.insert(var, value);
    }
}

/// One solver session. Sessions are owned by a single task and never
/// shared.
pub trait SmtSolver {
    type Error: std::error::Error;

    /// Declare a variable before it is used in an assertion.
    fn declare(&mut self, var: &SmtVar, sort: Sort) -> Result<(), Self::Error>;

    fn assert(&mut self, term: &SmtTerm) -> Result<(), Self::Error>;

    fn push(&mut self) -> Result<(), Self::Error>;

    fn pop(&mut self) -> Result<(), Self::Error>;

    fn check_sat(&mut self) -> Result<SatResult, Self::Error>;

    /// Values of `vars` in the model of the last `Sat` check.
    fn get_model(&mut self, vars: &[SmtVar]) -> Result<Model, Self::Error>;

    /// Drop every declaration and assertion.
    fn reset(&mut self) -> Result<(), Self::Error>;

    /// Abandon a running check once `cancel` fires. Sessions that cannot
    /// be interrupted ignore this and stop at the next query.
    fn interrupt_on(&mut self, _cancel: &CancelToken) {}
}

/// Creates fresh solver sessions.
pub trait SolverFactory {
    type Solver: SmtSolver;

    fn create(&self, timeout_ms: Option<u64>) -> Self::Solver;
}

/// A solver answering from a shared script, for engine tests.
#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::fmt;
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    pub struct MockError(pub String);

    impl fmt::Display for MockError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl std::error::Error for MockError {}

    /// Shared by every session created from one factory, so the script is
    /// consumed in global call order.
    #[derive(Debug, Default)]
    pub struct Script {
        pub answers: VecDeque<SatResult>,
        pub checks: usize,
        pub resets: usize,
        pub asserted: Vec<String>,
        /// Fired once `checks` reaches the given count.
        pub cancel_after: Option<(usize, CancelToken)>,
    }

    #[derive(Clone, Default)]
    pub struct MockFactory {
        pub script: Arc<Mutex<Script>>,
    }

    impl MockFactory {
        pub fn new(answers: impl IntoIterator<Item = SatResult>) -> Self {
            let script = Script {
                answers: answers.into_iter().collect(),
                ..Script::default()
            };
            Self {
                script: Arc::new(Mutex::new(script)),
            }
        }

        pub fn checks(&self) -> usize {
            self.script.lock().unwrap().checks
        }

        pub fn resets(&self) -> usize {
            self.script.lock().unwrap().resets
        }

        pub fn remaining(&self) -> usize {
            self.script.lock().unwrap().answers.len()
        }

        /// Cancel `token` right after the `checks`-th check answers.
        pub fn cancel_after(self, checks: usize, token: CancelToken) -> Self {
            self.script.lock().unwrap().cancel_after = Some((checks, token));
            self
        }
    }

    pub struct MockSolver {
        script: Arc<Mutex<Script>>,
        sorts: HashMap<SmtVar, Sort>,
    }

    impl SmtSolver for MockSolver {
        type Error = MockError;

        fn declare(&mut self, var: &SmtVar, sort: Sort) -> Result<(), MockError> {
            self.sorts.insert(var.clone(), sort);
            Ok(())
        }

        fn assert(&mut self, term: &SmtTerm) -> Result<(), MockError> {
            for var in term.vars() {
                if !self.sorts.contains_key(var) {
                    return Err(MockError(format!("undeclared {}", var)));
                }
            }
            self.script.lock().unwrap().asserted.push(term.to_string());
            Ok(())
        }

        fn push(&mut self) -> Result<(), MockError> {
            Ok(())
        }

        fn pop(&mut self) -> Result<(), MockError> {
            Ok(())
        }

        fn check_sat(&mut self) -> Result<SatResult, MockError> {
            let mut script = self.script.lock().unwrap();
            script.checks += 1;
            if let Some((after, token)) = &script.cancel_after {
                if script.checks >= *after {
                    token.cancel();
                }
            }
            script
                .answers
                .pop_front()
                .ok_or_else(|| MockError("script exhausted".into()))
        }

        fn get_model(&mut self, vars: &[SmtVar]) -> Result<Model, MockError> {
            let mut model = Model::default();
            for var in vars {
                let value = match self.sorts.get(var) {
                    Some(Sort::Bool) => Value::Bool(false),
                    Some(Sort::Int) => Value::int(0),
                    Some(Sort::Real) => Value::real(0, 1),
                    None => return Err(MockError(format!("undeclared {}", var))),
                };
                model.insert(var.clone(), value);
            }
            Ok(model)
        }

        fn reset(&mut self) -> Result<(), MockError> {
            self.sorts.clear();
            self.script.lock().unwrap().resets += 1;
            Ok(())
        }
    }

    impl SolverFactory for MockFactory {
        type Solver = MockSolver;

        fn create(&self, _timeout_ms: Option<u64>) -> MockSolver {
            MockSolver {
                script: self.script.clone(),
                sorts: HashMap::new(),
            }
        }
    }
}
