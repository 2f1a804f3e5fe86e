//! State signatures and concrete state rows.

use crate::error::{TermError, TermResult};
use crate::sort::Sort;
use crate::value::Value;
use indexmap::IndexMap;
use std::fmt;

/// A state variable declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    pub name: String,
    pub sort: Sort,
}

impl Variable {
    pub fn new(name: impl Into<String>, sort: Sort) -> Self {
        Self {
            name: name.into(),
            sort,
        }
    }
}

/// Ordered state variables with unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateSignature {
    vars: IndexMap<String, Sort>,
}

impl StateSignature {
    pub fn new(vars: impl IntoIterator<Item = Variable>) -> TermResult<Self> {
        let mut sig = Self::default();
        for var in vars {
            sig.push(var)?;
        }
        Ok(sig)
    }

    /// Append a variable; names must be unique.
    pub fn push(&mut self, var: Variable) -> TermResult<()> {
        if self.vars.contains_key(&var.name) {
            return Err(TermError::DuplicateVariable { name: var.name });
        }
        self.vars.insert(var.name, var.sort);
        Ok(())
    }

    pub fn sort_of(&self, name: &str) -> Option<Sort> {
        self.vars.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.vars.get_index_of(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = Variable> + '_ {
        self.vars
            .iter()
            .map(|(name, sort)| Variable::new(name.clone(), *sort))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Concrete assignment to the variables of one timepoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateRow {
    values: IndexMap<String, Value>,
}

impl StateRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, Value)> for StateRow {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for StateRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .values
            .iter()
            .map(|(k, v)| format!("{} = {}", k, v))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_rejects_duplicates() {
        let err = StateSignature::new([
            Variable::new("x", Sort::Int),
            Variable::new("x", Sort::Bool),
        ])
        .unwrap_err();
        assert_eq!(err, TermError::DuplicateVariable { name: "x".into() });
    }

    #[test]
    fn test_signature_order_and_lookup() {
        let sig = StateSignature::new([
            Variable::new("in", Sort::Bool),
            Variable::new("out", Sort::Int),
        ])
        .unwrap();
        assert_eq!(sig.names().collect::<Vec<_>>(), vec!["in", "out"]);
        assert_eq!(sig.sort_of("out"), Some(Sort::Int));
        assert_eq!(sig.index_of("out"), Some(1));
        assert_eq!(sig.sort_of("missing"), None);
    }

    #[test]
    fn test_state_row_display() {
        let mut row = StateRow::new();
        row.insert("in", Value::Bool(true));
        row.insert("out", Value::int(-1));
        assert_eq!(row.to_string(), "{in = true, out = (- 1)}");
    }
}
