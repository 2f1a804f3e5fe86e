//! Capture-avoiding substitution and timepoint shifting.

use crate::error::{TermError, TermResult};
use crate::term::{Stage, StateVar, Term};
use std::collections::{BTreeSet, HashMap};

/// A substitutable variable: a staged state variable or a local name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VarRef {
    State(StateVar),
    Local(String),
}

/// Simultaneous substitution.
pub type Mapping = HashMap<VarRef, Term>;

/// Replace every variable that is a key of `mapping` by its image.
///
/// A `let` binder hides an outer mapping entry of the same local name in its
/// body. Binders that would capture a free local of an image are renamed.
pub fn substitute(term: &Term, mapping: &Mapping) -> Term {
    if mapping.is_empty() {
        return term.clone();
    }
    match term {
        Term::Lit(_) | Term::Const(_) => term.clone(),
        Term::State(v) => mapping
            .get(&VarRef::State(v.clone()))
            .cloned()
            .unwrap_or_else(|| term.clone()),
        Term::Local(name) => mapping
            .get(&VarRef::Local(name.clone()))
            .cloned()
            .unwrap_or_else(|| term.clone()),
        Term::App(op, args) => {
            Term::App(*op, args.iter().map(|a| substitute(a, mapping)).collect())
        }
        Term::Call(name, args) => Term::Call(
            name.clone(),
            args.iter().map(|a| substitute(a, mapping)).collect(),
        ),
        Term::Let(bindings, body) => substitute_let(bindings, body, mapping),
    }
}

fn substitute_let(bindings: &[(String, Term)], body: &Term, mapping: &Mapping) -> Term {
    // Bound values live in the outer scope.
    let values: Vec<Term> = bindings.iter().map(|(_, v)| substitute(v, mapping)).collect();

    let mut inner: Mapping = mapping
        .iter()
        .filter(|(key, _)| match key {
            VarRef::Local(name) => !bindings.iter().any(|(b, _)| b == name),
            VarRef::State(_) => true,
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    // Only images that can reach the body can capture.
    let body_free = body.free_locals();
    let mut captured: BTreeSet<String> = BTreeSet::new();
    for (key, image) in &inner {
        let reaches_body = match key {
            VarRef::Local(name) => body_free.contains(name),
            VarRef::State(v) => body.state_vars().contains(v),
        };
        if reaches_body {
            captured.extend(image.free_locals());
        }
    }

    let mut avoid = captured.clone();
    avoid.extend(body_free.iter().cloned());
    for image in inner.values() {
        avoid.extend(image.free_locals());
    }

    let mut new_bindings = Vec::with_capacity(bindings.len());
    for ((name, _), value) in bindings.iter().zip(values) {
        if captured.contains(name) {
            let fresh = fresh_name(name, &avoid);
            avoid.insert(fresh.clone());
            inner.insert(VarRef::Local(name.clone()), Term::Local(fresh.clone()));
            new_bindings.push((fresh, value));
        } else {
            new_bindings.push((name.clone(), value));
        }
    }

    Term::Let(new_bindings, Box::new(substitute(body, &inner)))
}

/// A name derived from `base` that is not in `avoid`. The `@` separator
/// cannot appear in source symbols.
fn fresh_name(base: &str, avoid: &BTreeSet<String>) -> String {
    (1..)
        .map(|i| format!("{}@{}", base, i))
        .find(|candidate| !avoid.contains(candidate))
        .unwrap_or_else(|| format!("{}@", base))
}

/// Substitute locals by name, e.g. macro parameters by actual arguments.
pub fn substitute_locals(term: &Term, bindings: &[(String, Term)]) -> Term {
    let mapping: Mapping = bindings
        .iter()
        .map(|(name, t)| (VarRef::Local(name.clone()), t.clone()))
        .collect();
    substitute(term, &mapping)
}

/// Shift every `curr` reference to `next`.
///
/// Fails on a term that already references `next`: its image would lie two
/// steps ahead.
pub fn bump(term: &Term) -> TermResult<Term> {
    if term.uses_next() {
        return Err(TermError::Stage {
            term: term.to_string(),
            message: "cannot shift a term that already references next".to_string(),
        });
    }
    Ok(bump_unchecked(term))
}

fn bump_unchecked(term: &Term) -> Term {
    match term {
        Term::State(v) => Term::State(StateVar {
            name: v.name.clone(),
            stage: Stage::Next,
        }),
        Term::Lit(_) | Term::Local(_) | Term::Const(_) => term.clone(),
        Term::App(op, args) => Term::App(*op, args.iter().map(bump_unchecked).collect()),
        Term::Call(name, args) => {
            Term::Call(name.clone(), args.iter().map(bump_unchecked).collect())
        }
        Term::Let(bindings, body) => Term::Let(
            bindings
                .iter()
                .map(|(n, v)| (n.clone(), bump_unchecked(v)))
                .collect(),
            Box::new(bump_unchecked(body)),
        ),
    }
}
