//! Named properties and relations attached to systems.

use indexmap::IndexMap;
use kinduct_syntax::Span;
use kinduct_term::Term;

/// A one-state invariant candidate.
#[derive(Debug, Clone)]
pub struct Property {
    pub name: String,
    pub system: String,
    /// Bool formula over `curr` only.
    pub formula: Term,
    pub doc: Vec<String>,
    pub span: Span,
}

/// Whether a relation is a proof obligation or a hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationMode {
    /// Proved jointly with the properties it is verified with.
    Prove,
    /// Assumed at every step; never proved.
    Assume,
}

/// A two-state step lemma.
#[derive(Debug, Clone)]
pub struct Relation {
    pub name: String,
    pub system: String,
    /// Bool formula over `curr` and `next`.
    pub formula: Term,
    pub mode: RelationMode,
    pub doc: Vec<String>,
    pub span: Span,
}

/// A store entry.
#[derive(Debug, Clone)]
pub enum Entry {
    Property(Property),
    Relation(Relation),
}

impl Entry {
    pub fn name(&self) -> &str {
        match self {
            Entry::Property(p) => &p.name,
            Entry::Relation(r) => &r.name,
        }
    }

    /// Name of the owning system.
    pub fn system(&self) -> &str {
        match self {
            Entry::Property(p) => &p.system,
            Entry::Relation(r) => &r.system,
        }
    }

    pub fn formula(&self) -> &Term {
        match self {
            Entry::Property(p) => &p.formula,
            Entry::Relation(r) => &r.formula,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Entry::Property(p) => p.span,
            Entry::Relation(r) => r.span,
        }
    }
}

/// Properties and relations in declaration order. Names are unique across
/// both kinds.
#[derive(Debug, Clone, Default)]
pub struct Store {
    entries: IndexMap<String, Entry>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, returning the one it replaced, if any.
    pub fn insert(&mut self, entry: Entry) -> Option<Entry> {
        self.entries.insert(entry.name().to_string(), entry)
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.entries.values().filter_map(|e| match e {
            Entry::Property(p) => Some(p),
            Entry::Relation(_) => None,
        })
    }

    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.entries.values().filter_map(|e| match e {
            Entry::Relation(r) => Some(r),
            Entry::Property(_) => None,
        })
    }

    /// Entries owned by `system`, in declaration order.
    pub fn for_system<'a>(&'a self, system: &'a str) -> impl Iterator<Item = &'a Entry> + 'a {
        self.entries.values().filter(move |e| e.system() == system)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
