//! Record and action patterns, unification and substitution.
//!
//! A pattern field is either a literal, which must match exactly, or a
//! variable, which binds on first sight and must agree afterwards.

use std::fmt;
use std::sync::Arc;

use concord_foundation::{Error, Id, Record, Result, Value};

use crate::frame::Frame;
use crate::log::Occurrence;
use crate::var::Var;

// =============================================================================
// Terms
// =============================================================================

/// One side of a pattern field.
#[derive(Clone, PartialEq)]
pub enum Term {
    /// Must equal this value.
    Literal(Value),
    /// Binds (or must agree with) this variable.
    Var(Var),
}

impl Term {
    /// Resolves the term against a frame: literals resolve to themselves,
    /// variables to their binding.
    #[must_use]
    pub fn resolve(&self, frame: &Frame) -> Option<Value> {
        match self {
            Self::Literal(value) => Some(value.clone()),
            Self::Var(var) => frame.get(var).cloned(),
        }
    }

    /// Returns the variable if this term is one.
    #[must_use]
    pub const fn as_var(&self) -> Option<&Var> {
        match self {
            Self::Var(var) => Some(var),
            Self::Literal(_) => None,
        }
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => write!(f, "{value:?}"),
            Self::Var(var) => write!(f, "{var}"),
        }
    }
}

impl From<Var> for Term {
    fn from(var: Var) -> Self {
        Self::Var(var)
    }
}

impl From<&Var> for Term {
    fn from(var: &Var) -> Self {
        Self::Var(var.clone())
    }
}

impl From<Value> for Term {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

impl From<&str> for Term {
    fn from(s: &str) -> Self {
        Self::Literal(Value::from(s))
    }
}

impl From<String> for Term {
    fn from(s: String) -> Self {
        Self::Literal(Value::from(s))
    }
}

impl From<bool> for Term {
    fn from(b: bool) -> Self {
        Self::Literal(Value::Bool(b))
    }
}

impl From<i64> for Term {
    fn from(n: i64) -> Self {
        Self::Literal(Value::Int(n))
    }
}

impl From<i32> for Term {
    fn from(n: i32) -> Self {
        Self::Literal(Value::from(n))
    }
}

impl From<Id> for Term {
    fn from(id: Id) -> Self {
        Self::Literal(Value::Id(id))
    }
}

// =============================================================================
// Record Patterns
// =============================================================================

/// An ordered list of `(field, term)` constraints over a record.
///
/// Only the named fields are constrained; extra fields in the record are
/// ignored. A named field missing from the record is a non-match.
#[derive(Clone, Default, PartialEq)]
pub struct RecordPattern {
    fields: Vec<(Arc<str>, Term)>,
}

impl RecordPattern {
    /// Creates an empty pattern, which matches any record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field constraint.
    #[must_use]
    pub fn with(mut self, field: impl Into<Arc<str>>, term: impl Into<Term>) -> Self {
        self.fields.push((field.into(), term.into()));
        self
    }

    /// Returns the field constraints in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[(Arc<str>, Term)] {
        &self.fields
    }

    /// Returns true if the pattern constrains nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates the variables referenced by this pattern.
    pub fn vars(&self) -> impl Iterator<Item = &Var> {
        self.fields.iter().filter_map(|(_, term)| term.as_var())
    }

    /// Unifies `record` against this pattern, starting from `frame`.
    ///
    /// Returns the extended frame, or `None` on a literal mismatch, a
    /// missing field, or a variable already bound to a different value.
    #[must_use]
    pub fn unify(&self, record: &Record, frame: &Frame) -> Option<Frame> {
        let mut bound = frame.clone();
        for (field, term) in &self.fields {
            let value = record.get(field)?;
            match term {
                Term::Literal(literal) => {
                    if literal != value {
                        return None;
                    }
                }
                Term::Var(var) => match bound.get(var) {
                    Some(existing) if existing != value => return None,
                    Some(_) => {}
                    None => bound = bound.with(var.clone(), value.clone()),
                },
            }
        }
        Some(bound)
    }

    /// Builds a concrete record by substituting the frame's bindings.
    ///
    /// # Errors
    /// Returns an error if a referenced variable is unbound.
    pub fn substitute(&self, frame: &Frame) -> Result<Record> {
        let mut record = Record::new();
        for (field, term) in &self.fields {
            let value = term
                .resolve(frame)
                .ok_or_else(|| Error::unbound_variable(term_name(term)))?;
            record = record.with(field.clone(), value);
        }
        Ok(record)
    }
}

fn term_name(term: &Term) -> String {
    term.as_var()
        .map_or_else(|| format!("{term:?}"), |var| var.name().to_string())
}

impl fmt::Debug for RecordPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.fields.iter().map(|(k, v)| (k.as_ref(), v)))
            .finish()
    }
}

/// Builds a [`RecordPattern`] from `field: term` pairs.
///
/// Terms are anything convertible into a [`Term`]: a `&Var` binds, a plain
/// value must match.
///
/// ```
/// use concord_engine::{pattern, Var};
///
/// let session = Var::new("session");
/// let p = pattern! { path: "/logout", session: &session };
/// assert_eq!(p.fields().len(), 2);
/// ```
#[macro_export]
macro_rules! pattern {
    () => { $crate::RecordPattern::new() };
    ($($field:ident : $term:expr),+ $(,)?) => {
        $crate::RecordPattern::new()$(.with(stringify!($field), $term))+
    };
}

// =============================================================================
// Action Patterns
// =============================================================================

/// A trigger slot: an action name plus patterns over its input and outcome.
#[derive(Clone, Debug)]
pub struct ActionPattern {
    /// Fully qualified action name (`Concept.action`).
    pub action: Arc<str>,
    /// Pattern over the action's input record.
    pub input: RecordPattern,
    /// Pattern over the action's outcome record.
    pub output: RecordPattern,
}

impl ActionPattern {
    /// Creates a new action pattern.
    #[must_use]
    pub fn new(action: impl Into<Arc<str>>, input: RecordPattern, output: RecordPattern) -> Self {
        Self {
            action: action.into(),
            input,
            output,
        }
    }

    /// Unifies an occurrence against this slot, starting from `frame`.
    #[must_use]
    pub fn unify(&self, occurrence: &Occurrence, frame: &Frame) -> Option<Frame> {
        if occurrence.action != self.action {
            return None;
        }
        let bound = self.input.unify(&occurrence.input, frame)?;
        self.output.unify(&occurrence.outcome, &bound)
    }

    /// Iterates the variables referenced by the input and output patterns.
    pub fn vars(&self) -> impl Iterator<Item = &Var> {
        self.input.vars().chain(self.output.vars())
    }
}

// =============================================================================
// Tests
// =============================================================================
