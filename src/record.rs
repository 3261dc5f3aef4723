//! `Record`: the ordered, case-folded attribute container that is both a ClassAd value
//! and an evaluation scope.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::ast::Expression;

/// Names that cannot be used as attribute names, checked (case-insensitively) at
/// insertion time. `super` and `target` are not in this set because the grammar never
/// lexes them as a plain identifier to begin with (see `src/classad.pest`), so they
/// can never reach `Record::insert` as a name in the first place.
const RESERVED_NAMES: &[&str] = &["error", "false", "is", "isnt", "parent", "true", "undefined"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    ReservedName(String),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::ReservedName(name) => {
                write!(f, "'{name}' is a reserved word and cannot be used as an attribute name")
            }
        }
    }
}

impl std::error::Error for RecordError {}

/// An ordered mapping from case-folded attribute name to its (unevaluated) expression.
///
/// Storage keeps both the definition-order entry list (required so stream-form and
/// record-form of the same input produce equal ASTs) and a `BTreeMap` index from
/// case-folded name to the entry's position, so lookup does not require a linear scan.
/// The two are only ever mutated together, through `insert`.
#[derive(Debug, Clone, Default)]
pub struct Record {
    entries: Vec<(Arc<str>, Expression)>,
    index: BTreeMap<Arc<str>, usize>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an attribute, case-folding the name. Rejects reserved names. Re-inserting
    /// an existing name overwrites its expression in place, preserving its original
    /// position in definition order (matching how a ClassAd treats a re-defined
    /// attribute: last writer wins, first position sticks).
    pub fn insert(&mut self, name: &str, expr: Expression) -> Result<(), RecordError> {
        let folded = name.to_ascii_lowercase();
        if RESERVED_NAMES.contains(&folded.as_str()) {
            return Err(RecordError::ReservedName(name.to_string()));
        }
        let key: Arc<str> = folded.into();
        if let Some(&pos) = self.index.get(&key) {
            self.entries[pos].1 = expr;
        } else {
            self.index.insert(key.clone(), self.entries.len());
            self.entries.push((key, expr));
        }
        Ok(())
    }

    /// Look up an attribute's expression by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&Expression> {
        let folded = name.to_ascii_lowercase();
        self.index.get(folded.as_str()).map(|&pos| &self.entries[pos].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Attribute names in definition order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_ref())
    }

    /// Attribute entries in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Expression)> {
        self.entries.iter().map(|(name, expr)| (name.as_ref(), expr))
    }

    /// Raw pointer identity, used by the evaluator's cycle-detection stack. Records are
    /// never relocated while borrowed during one evaluation call, so the address is a
    /// stable, allocation-free key for "have I already started evaluating this
    /// (record, name) pair".
    pub(crate) fn identity(&self) -> usize {
        self as *const Record as usize
    }
}

impl PartialEq for Record {
    /// Insensitive to iteration order and to attribute-name case (already folded),
    /// sensitive to the definition set: same names mapping to structurally equal
    /// expressions.
    fn eq(&self, other: &Self) -> bool {
        if self.entries.len() != other.entries.len() {
            return false;
        }
        let a: BTreeMap<&Arc<str>, &Expression> =
            self.entries.iter().map(|(k, v)| (k, v)).collect();
        let b: BTreeMap<&Arc<str>, &Expression> =
            other.entries.iter().map(|(k, v)| (k, v)).collect();
        a == b
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, (name, expr)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{name} = {expr}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn reserved_names_are_rejected() {
        let mut r = Record::new();
        assert!(r.insert("true", Expression::Literal(Value::Int(1))).is_err());
        assert!(r.insert("Error", Expression::Literal(Value::Int(1))).is_err());
        assert!(r.insert("ok", Expression::Literal(Value::Int(1))).is_ok());
    }

    #[test]
    fn lookup_is_case_insensitive_and_order_preserving() {
        let mut r = Record::new();
        r.insert("B", Expression::Literal(Value::Int(2))).unwrap();
        r.insert("a", Expression::Literal(Value::Int(1))).unwrap();
        assert!(r.get("b").is_some());
        assert_eq!(r.names().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn equality_ignores_order_and_case() {
        let mut a = Record::new();
        a.insert("A", Expression::Literal(Value::Int(1))).unwrap();
        a.insert("B", Expression::Literal(Value::Int(2))).unwrap();

        let mut b = Record::new();
        b.insert("b", Expression::Literal(Value::Int(2))).unwrap();
        b.insert("a", Expression::Literal(Value::Int(1))).unwrap();

        assert_eq!(a, b);
    }
}
