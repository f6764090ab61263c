//! Records: the field maps exchanged with concepts.
//!
//! Action inputs, action outcomes and query rows are all records. An outcome
//! carrying an `error` field is a domain error; it is ordinary data, not a
//! Rust error.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FromIterator;
use std::sync::Arc;

use crate::value::Value;

/// Name of the field that marks an outcome as a domain error.
pub const ERROR_FIELD: &str = "error";

/// Persistent, field-ordered map from field names to values.
///
/// Cloning is O(1). Iteration order is the lexical order of field names, so
/// debug output and test assertions are deterministic.
#[derive(Clone, Default)]
pub struct Record(im::OrdMap<Arc<str>, Value>);

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self(im::OrdMap::new())
    }

    /// Creates an error outcome `{error: message}`.
    #[must_use]
    pub fn from_error(message: impl Into<String>) -> Self {
        Self::new().with(ERROR_FIELD, message.into())
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Gets a field value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Returns true if the field is present.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Returns a new record with `field` set to `value`.
    #[must_use]
    pub fn with(&self, field: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
        Self(self.0.update(field.into(), value.into()))
    }

    /// Returns a new record without `field`.
    #[must_use]
    pub fn without(&self, field: &str) -> Self {
        Self(self.0.without(field))
    }

    /// Returns a new record holding the fields of both; `other` wins on conflict.
    #[must_use]
    pub fn merge(&self, other: &Record) -> Self {
        // `OrdMap::union` picks its base by size, so precedence is applied by hand.
        let mut fields = self.0.clone();
        for (field, value) in &other.0 {
            fields.insert(field.clone(), value.clone());
        }
        Self(fields)
    }

    /// Returns the error message if this record is an error outcome.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self.0.get(ERROR_FIELD) {
            Some(Value::String(msg)) => Some(msg),
            _ => None,
        }
    }

    /// Returns true if this record carries an `error` field.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.0.contains_key(ERROR_FIELD)
    }

    /// Returns an iterator over `(field, value)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_ref(), v))
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}: {v}")?;
        }
        write!(f, "}}")
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for (k, v) in self.iter() {
            k.hash(state);
            v.hash(state);
        }
    }
}

impl<K: Into<Arc<str>>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Builds a [`Record`] from `field: value` pairs.
///
/// ```
/// use concord_foundation::{record, Value};
///
/// let r = record! { username: "alice", attempts: 3 };
/// assert_eq!(r.get("username"), Some(&Value::from("alice")));
/// ```
#[macro_export]
macro_rules! record {
    () => { $crate::Record::new() };
    ($($field:ident : $value:expr),+ $(,)?) => {
        $crate::Record::new()$(.with(stringify!($field), $value))+
    };
}
