//! Binding frames and the operators that reshape them.
//!
//! A [`Frame`] is one consistent assignment of values to variables; a
//! [`Frames`] set is an ordered collection of alternative frames, like the
//! rows of a relation. Every operator takes the set by reference and returns
//! a fresh set; frames are persistent maps and are never mutated in place.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::iter::FromIterator;

use concord_foundation::{Array, Record, Result, Value};
use tracing::{trace, warn};

use crate::concept::QueryRef;
use crate::pattern::RecordPattern;
use crate::var::Var;

// =============================================================================
// Frame
// =============================================================================

/// A single assignment of values to variables.
///
/// Each variable has at most one value; unbound variables are absent.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Frame(im::OrdMap<Var, Value>);

impl Frame {
    /// Creates an empty frame.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the value bound to a variable.
    #[must_use]
    pub fn get(&self, var: &Var) -> Option<&Value> {
        self.0.get(var)
    }

    /// Returns true if the variable is bound.
    #[must_use]
    pub fn is_bound(&self, var: &Var) -> bool {
        self.0.contains_key(var)
    }

    /// Returns a new frame with `var` bound to `value`, replacing any prior binding.
    #[must_use]
    pub fn with(&self, var: Var, value: impl Into<Value>) -> Self {
        Self(self.0.update(var, value.into()))
    }

    /// Returns a new frame without a binding for `var`.
    #[must_use]
    pub fn without(&self, var: &Var) -> Self {
        Self(self.0.without(var))
    }

    /// Number of bound variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates bindings in variable-creation order.
    pub fn iter(&self) -> impl Iterator<Item = (&Var, &Value)> {
        self.0.iter()
    }

    /// Returns true if every binding of `self` is also in `other` with the same value.
    #[must_use]
    pub fn is_subset_of(&self, other: &Frame) -> bool {
        self.iter().all(|(var, value)| other.get(var) == Some(value))
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(var, value)| (var.name(), value)))
            .finish()
    }
}

impl FromIterator<(Var, Value)> for Frame {
    fn from_iter<I: IntoIterator<Item = (Var, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// =============================================================================
// Frames
// =============================================================================

/// An ordered set of alternative frames.
///
/// Order carries no meaning for correctness but every operator preserves it.
/// An empty set means "no solutions".
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Frames(Vec<Frame>);

impl Frames {
    /// Creates an empty frame set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set holding exactly one frame.
    #[must_use]
    pub fn single(frame: Frame) -> Self {
        Self(vec![frame])
    }

    /// Number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the first frame.
    #[must_use]
    pub fn first(&self) -> Option<&Frame> {
        self.0.first()
    }

    /// Iterates frames in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.0.iter()
    }

    /// Query-join: extends every frame with the rows returned by `query`.
    ///
    /// For each frame the bound variables are substituted into `input`, the
    /// query is invoked, and `output` is unified against every returned row
    /// starting from that frame. Each successful unification is one output
    /// frame; a frame with no unifying rows is dropped (inner join).
    ///
    /// # Errors
    /// Returns an error if `input` references a variable the frame does not bind.
    pub async fn query(
        &self,
        query: &QueryRef,
        input: &RecordPattern,
        output: &RecordPattern,
    ) -> Result<Frames> {
        let mut joined = Vec::new();
        for frame in &self.0 {
            let args = input.substitute(frame)?;
            let rows = query.call(args).await;
            joined.extend(rows.iter().filter_map(|row| output.unify(row, frame)));
        }
        trace!(
            query = %query.name(),
            frames_in = self.len(),
            frames_out = joined.len(),
            "query-join"
        );
        Ok(Self(joined))
    }

    /// Keeps only the frames satisfying `predicate`.
    #[must_use]
    pub fn filter(&self, predicate: impl Fn(&Frame) -> bool) -> Frames {
        self.0.iter().filter(|f| predicate(f)).cloned().collect()
    }

    /// Maps every frame to a new frame.
    #[must_use]
    pub fn map(&self, f: impl Fn(&Frame) -> Frame) -> Frames {
        self.0.iter().map(f).collect()
    }

    /// Collects the values of `sources` into an array bound to `dest`.
    ///
    /// Frames are grouped by every binding other than `sources` and `dest`;
    /// each group becomes one frame with the group's bindings plus `dest`.
    /// With a single source, `dest` holds that variable's values; with
    /// several, it holds records keyed by the variables' names. Groups keep
    /// the order of their first frame and values keep input order. A source
    /// missing from a frame contributes `Value::Null`.
    ///
    /// Record fields are named by [`Var::name`], which is not unique: when two
    /// sources share a name the later one in `sources` fills the field, and
    /// a warning is logged.
    #[must_use]
    pub fn collect_as(&self, sources: &[Var], dest: &Var) -> Frames {
        let excluded: HashSet<&Var> = sources.iter().chain(std::iter::once(dest)).collect();
        if sources.len() > 1 {
            let mut names = HashSet::new();
            for var in sources {
                if !names.insert(var.name()) {
                    warn!(name = var.name(), "collect sources share a name; later source wins");
                }
            }
        }
        let mut index: HashMap<Frame, usize> = HashMap::new();
        let mut groups: Vec<(Frame, Vec<Value>)> = Vec::new();

        for frame in &self.0 {
            let key: Frame = frame
                .iter()
                .filter(|(var, _)| !excluded.contains(var))
                .map(|(var, value)| (var.clone(), value.clone()))
                .collect();

            let item = match sources {
                [only] => frame.get(only).cloned().unwrap_or(Value::Null),
                _ => Value::Record(
                    sources
                        .iter()
                        .map(|var| {
                            (
                                var.name().to_string(),
                                frame.get(var).cloned().unwrap_or(Value::Null),
                            )
                        })
                        .collect::<Record>(),
                ),
            };

            let slot = *index.entry(key.clone()).or_insert_with(|| {
                groups.push((key, Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(item);
        }

        groups
            .into_iter()
            .map(|(key, items)| key.with(dest.clone(), items.into_iter().collect::<Array>()))
            .collect()
    }

    /// Replaces an empty set with `fallback`; a non-empty set is returned as is.
    ///
    /// This is how a rule answers "no rows": it builds an explicit frame
    /// carrying an error marker instead of relying on dropped frames.
    #[must_use]
    pub fn or_else(self, fallback: impl FnOnce() -> Frames) -> Frames {
        if self.is_empty() { fallback() } else { self }
    }
}

impl fmt::Debug for Frames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl From<Vec<Frame>> for Frames {
    fn from(frames: Vec<Frame>) -> Self {
        Self(frames)
    }
}

impl FromIterator<Frame> for Frames {
    fn from_iter<I: IntoIterator<Item = Frame>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Frames {
    type Item = Frame;
    type IntoIter = std::vec::IntoIter<Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Frames {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// =============================================================================
// Tests
// =============================================================================
