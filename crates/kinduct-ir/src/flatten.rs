//! Composition: flattening subsystem instantiations into one system.
//!
//! Every state variable of an instantiated system is a formal parameter
//! bound to an actual argument, so the subsystem's formulas are rewritten
//! entirely in terms of the parent's variables and the flattened signature
//! is the parent's own.

use crate::error::{CompileError, CompileResult};
use crate::system::{Actual, System};
use indexmap::IndexMap;
use kinduct_syntax::Span;
use kinduct_term::{bump, substitute, Mapping, Sort, StateSignature, StateVar, Term, VarRef};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A closed system: one Init and one Trans over one signature.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatSystem {
    pub name: String,
    pub signature: StateSignature,
    pub init: Term,
    pub trans: Term,
}

/// Flattens systems, memoizing the result per system name.
pub struct Flattener<'a> {
    systems: &'a IndexMap<String, System>,
    cache: HashMap<String, Arc<FlatSystem>>,
    /// Systems on the current composition path.
    visiting: Vec<String>,
}

impl<'a> Flattener<'a> {
    pub fn new(systems: &'a IndexMap<String, System>) -> Self {
        Self {
            systems,
            cache: HashMap::new(),
            visiting: Vec::new(),
        }
    }

    /// Flatten `name` and everything it instantiates.
    pub fn flatten(&mut self, name: &str) -> CompileResult<Arc<FlatSystem>> {
        self.flatten_at(name, None)
    }

    /// Consume the flattener, returning flattened systems in declaration order.
    pub fn into_flat_systems(mut self) -> IndexMap<String, Arc<FlatSystem>> {
        self.systems
            .keys()
            .filter_map(|name| self.cache.remove(name).map(|flat| (name.clone(), flat)))
            .collect()
    }

    fn flatten_at(&mut self, name: &str, site: Option<Span>) -> CompileResult<Arc<FlatSystem>> {
        if let Some(flat) = self.cache.get(name) {
            debug!(system = name, "flatten cache hit");
            return Ok(flat.clone());
        }

        let systems = self.systems;
        let system = systems.get(name).ok_or_else(|| CompileError::UnknownSystem {
            name: name.to_string(),
            span: site.unwrap_or_default(),
        })?;

        if let Some(pos) = self.visiting.iter().position(|n| n == name) {
            let mut path = self.visiting[pos..].to_vec();
            path.push(name.to_string());
            return Err(CompileError::CompositionCycle {
                path,
                span: site.unwrap_or(system.span),
            });
        }

        debug!(system = name, instances = system.instances.len(), "flattening");
        self.visiting.push(name.to_string());
        let result = self.compose(system);
        self.visiting.pop();

        let flat = Arc::new(result?);
        self.cache.insert(name.to_string(), flat.clone());
        Ok(flat)
    }

    fn compose(&mut self, system: &System) -> CompileResult<FlatSystem> {
        let mut init = vec![system.init.clone()];
        let mut trans = vec![system.trans.clone()];

        for inst in &system.instances {
            let child = self.flatten_at(&inst.system, Some(inst.span))?;
            let mapping = bind_formals(system, &inst.system, &child.signature, &inst.actuals, inst.span)?;
            init.push(substitute(&child.init, &mapping));
            trans.push(substitute(&child.trans, &mapping));
        }

        Ok(FlatSystem {
            name: system.name.clone(),
            signature: system.signature.clone(),
            init: Term::and_all(init),
            trans: Term::and_all(trans),
        })
    }
}

/// Map each formal `curr` variable to its actual and each formal `next`
/// variable to the actual shifted one step.
fn bind_formals(
    parent: &System,
    child: &str,
    formals: &StateSignature,
    actuals: &[Actual],
    span: Span,
) -> CompileResult<Mapping> {
    if formals.len() != actuals.len() {
        return Err(CompileError::Arity {
            system: child.to_string(),
            expected: formals.len(),
            found: actuals.len(),
            span,
        });
    }

    let mut mapping = Mapping::new();
    for (position, (formal, actual)) in formals.iter().zip(actuals).enumerate() {
        let term = coerce_actual(child, position, formal.sort, actual, span)?;
        let next = bump(&term).map_err(|e| CompileError::Stage {
            decl: parent.name.clone(),
            message: e.to_string(),
            span,
        })?;
        mapping.insert(VarRef::State(StateVar::curr(formal.name.clone())), term);
        mapping.insert(VarRef::State(StateVar::next(formal.name)), next);
    }
    Ok(mapping)
}

fn coerce_actual(
    child: &str,
    position: usize,
    expected: Sort,
    actual: &Actual,
    span: Span,
) -> CompileResult<Term> {
    if actual.sort == expected {
        return Ok(actual.term.clone());
    }
    match (&actual.term, expected) {
        (Term::Lit(v), Sort::Real) if actual.sort == Sort::Int => Ok(Term::Lit(v.to_real())),
        _ => Err(CompileError::ArgumentSort {
            system: child.to_string(),
            position: position + 1,
            expected,
            found: actual.sort,
            span,
        }),
    }
}

/// Flatten one system of `systems`.
pub fn flatten(
    systems: &IndexMap<String, System>,
    name: &str,
) -> CompileResult<Arc<FlatSystem>> {
    Flattener::new(systems).flatten(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::Instantiation;
    use kinduct_term::{Op, Variable};

    fn system(name: &str, vars: &[(&str, Sort)], init: Term, trans: Term) -> System {
        System {
            name: name.into(),
            signature: StateSignature::new(vars.iter().map(|(n, s)| Variable::new(*n, *s)))
                .unwrap(),
            init,
            trans,
            instances: vec![],
            doc: vec![],
            span: Span::dummy(),
        }
    }

    fn inst(target: &str, actuals: Vec<(Term, Sort)>) -> Instantiation {
        Instantiation {
            system: target.into(),
            actuals: actuals
                .into_iter()
                .map(|(term, sort)| Actual { term, sort })
                .collect(),
            span: Span::dummy(),
        }
    }

    fn table(systems: Vec<System>) -> IndexMap<String, System> {
        systems.into_iter().map(|s| (s.name.clone(), s)).collect()
    }

    /// `inc(v)`: v starts at 0 and grows by one each step.
    fn inc() -> System {
        system(
            "inc",
            &[("v", Sort::Int)],
            Term::eq(Term::curr("v"), Term::int(0)),
            Term::eq(
                Term::next("v"),
                Term::app(Op::Add, vec![Term::curr("v"), Term::int(1)]),
            ),
        )
    }

    #[test]
    fn test_flatten_leaf_is_identity() {
        let systems = table(vec![inc()]);
        let flat = flatten(&systems, "inc").unwrap();
        assert_eq!(flat.init, systems["inc"].init);
        assert_eq!(flat.trans, systems["inc"].trans);
        assert_eq!(flat.signature.len(), 1);
    }

    #[test]
    fn test_flatten_substitutes_actuals() {
        let mut parent = system("parent", &[("a", Sort::Int)], Term::bool(true), Term::bool(true));
        let actual = Term::app(Op::Mul, vec![Term::curr("a"), Term::int(2)]);
        parent.instances.push(inst("inc", vec![(actual.clone(), Sort::Int)]));
        let systems = table(vec![inc(), parent]);

        let flat = flatten(&systems, "parent").unwrap();
        assert_eq!(flat.init, Term::eq(actual.clone(), Term::int(0)));
        assert_eq!(
            flat.trans,
            Term::eq(
                Term::app(Op::Mul, vec![Term::next("a"), Term::int(2)]),
                Term::app(Op::Add, vec![actual, Term::int(1)]),
            )
        );
        assert_eq!(flat.signature.names().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_flatten_is_memoized() {
        let mut parent = system("parent", &[("a", Sort::Int), ("b", Sort::Int)], Term::bool(true), Term::bool(true));
        parent.instances.push(inst("inc", vec![(Term::curr("a"), Sort::Int)]));
        parent.instances.push(inst("inc", vec![(Term::curr("b"), Sort::Int)]));
        let systems = table(vec![inc(), parent]);

        let mut flattener = Flattener::new(&systems);
        let flat = flattener.flatten("parent").unwrap();
        assert!(matches!(&flat.init, Term::App(Op::And, args) if args.len() == 2));
        let again = flattener.flatten("parent").unwrap();
        assert!(Arc::ptr_eq(&flat, &again));
        let all = flattener.into_flat_systems();
        assert_eq!(all.keys().collect::<Vec<_>>(), vec!["inc", "parent"]);
    }

    #[test]
    fn test_arity_mismatch() {
        let mut parent = system("parent", &[("a", Sort::Int)], Term::bool(true), Term::bool(true));
        parent.instances.push(inst("inc", vec![]));
        let systems = table(vec![inc(), parent]);
        assert!(matches!(
            flatten(&systems, "parent"),
            Err(CompileError::Arity { expected: 1, found: 0, .. })
        ));
    }

    #[test]
    fn test_argument_sort_mismatch() {
        let mut parent = system("parent", &[("b", Sort::Bool)], Term::bool(true), Term::bool(true));
        parent.instances.push(inst("inc", vec![(Term::curr("b"), Sort::Bool)]));
        let systems = table(vec![inc(), parent]);
        assert!(matches!(
            flatten(&systems, "parent"),
            Err(CompileError::ArgumentSort { position: 1, .. })
        ));
    }

    #[test]
    fn test_cycle_detected_with_path() {
        let mut a = system("a", &[("x", Sort::Int)], Term::bool(true), Term::bool(true));
        let mut b = system("b", &[("y", Sort::Int)], Term::bool(true), Term::bool(true));
        a.instances.push(inst("b", vec![(Term::curr("x"), Sort::Int)]));
        b.instances.push(inst("a", vec![(Term::curr("y"), Sort::Int)]));
        let systems = table(vec![a, b]);
        for _ in 0..2 {
            match flatten(&systems, "a") {
                Err(CompileError::CompositionCycle { path, .. }) => {
                    assert_eq!(path, vec!["a", "b", "a"]);
                }
                other => panic!("expected cycle, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_unknown_subsystem() {
        let mut parent = system("parent", &[("a", Sort::Int)], Term::bool(true), Term::bool(true));
        parent.instances.push(inst("ghost", vec![(Term::curr("a"), Sort::Int)]));
        let systems = table(vec![parent]);
        assert!(matches!(
            flatten(&systems, "parent"),
            Err(CompileError::UnknownSystem { .. })
        ));
    }
}
