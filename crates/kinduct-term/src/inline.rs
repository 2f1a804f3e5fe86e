//! Macro table and inlining of `define-fun` applications.

use crate::error::{TermError, TermResult};
use crate::sort::Sort;
use crate::subst::substitute_locals;
use crate::term::Term;
use indexmap::IndexMap;

/// Maximum nesting of macro expansions before inlining is declared cyclic.
pub const MAX_INLINE_DEPTH: usize = 64;

/// A named macro. Its body refers to parameters as `Term::Local`.
#[derive(Debug, Clone, PartialEq)]
pub struct Macro {
    pub name: String,
    pub params: Vec<(String, Sort)>,
    pub ret: Sort,
    pub body: Term,
}

/// Macros in declaration order.
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    macros: IndexMap<String, Macro>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a macro, returning the previous definition of the same name.
    pub fn insert(&mut self, m: Macro) -> Option<Macro> {
        self.macros.insert(m.name.clone(), m)
    }

    pub fn get(&self, name: &str) -> Option<&Macro> {
        self.macros.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Macro> {
        self.macros.values()
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }
}

/// Replace every macro application by its body with the actual arguments
/// substituted, until no `Call` remains.
pub fn inline_macros(term: &Term, table: &MacroTable) -> TermResult<Term> {
    Inliner {
        table,
        stack: Vec::new(),
    }
    .inline(term)
}

struct Inliner<'a> {
    table: &'a MacroTable,
    /// Macros currently being expanded, outermost first.
    stack: Vec<String>,
}

impl Inliner<'_> {
    fn inline(&mut self, term: &Term) -> TermResult<Term> {
        match term {
            Term::Lit(_) | Term::State(_) | Term::Local(_) | Term::Const(_) => Ok(term.clone()),
            Term::App(op, args) => Ok(Term::App(*op, self.inline_all(args)?)),
            Term::Let(bindings, body) => {
                let bindings = bindings
                    .iter()
                    .map(|(name, value)| Ok((name.clone(), self.inline(value)?)))
                    .collect::<TermResult<Vec<_>>>()?;
                Ok(Term::Let(bindings, Box::new(self.inline(body)?)))
            }
            Term::Call(name, args) => self.expand(name, args),
        }
    }

    fn inline_all(&mut self, args: &[Term]) -> TermResult<Vec<Term>> {
        args.iter().map(|a| self.inline(a)).collect()
    }

    fn expand(&mut self, name: &str, args: &[Term]) -> TermResult<Term> {
        let table = self.table;
        let m = table.get(name).ok_or_else(|| TermError::UnboundMacro {
            name: name.to_string(),
        })?;
        if m.params.len() != args.len() {
            return Err(TermError::Arity {
                name: name.to_string(),
                expected: m.params.len().to_string(),
                found: args.len(),
            });
        }
        if self.stack.len() >= MAX_INLINE_DEPTH {
            let mut chain = self.stack.clone();
            chain.push(name.to_string());
            return Err(TermError::MacroCycle {
                chain: shortest_cycle(chain),
                depth: MAX_INLINE_DEPTH,
            });
        }

        let actuals = self.inline_all(args)?;
        let bindings: Vec<(String, Term)> = m
            .params
            .iter()
            .map(|(p, _)| p.clone())
            .zip(actuals)
            .collect();
        let body = substitute_locals(&m.body, &bindings);

        self.stack.push(name.to_string());
        let result = self.inline(&body);
        self.stack.pop();
        result
    }
}

/// Trim an expansion chain to the innermost repetition, e.g.
/// `[f, g, h, g, h, g]` becomes `[g, h, g]`.
fn shortest_cycle(chain: Vec<String>) -> Vec<String> {
    let Some(last) = chain.last() else {
        return chain;
    };
    match chain[..chain.len() - 1].iter().rposition(|n| n == last) {
        Some(start) => chain[start..].to_vec(),
        None => chain,
    }
}
