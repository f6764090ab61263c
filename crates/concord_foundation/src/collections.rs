//! Persistent arrays with structural sharing.
//!
//! A thin wrapper around `im::Vector`, so values can be cloned in O(1) and
//! frames holding arrays stay cheap to copy.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FromIterator;

use crate::value::Value;

/// Persistent vector of values.
///
/// Cloning is O(1). Modifications return a new array sharing structure
/// with the original.
#[derive(Clone, Default)]
pub struct Array(im::Vector<Value>);

impl Array {
    /// Creates an empty array.
    #[must_use]
    pub fn new() -> Self {
        Self(im::Vector::new())
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the array is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Gets an element by index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Returns a new array with the element appended.
    #[must_use]
    pub fn push_back(&self, value: Value) -> Self {
        let mut new = self.0.clone();
        new.push_back(value);
        Self(new)
    }

    /// Returns true if any element equals `value`.
    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        self.0.iter().any(|v| v == value)
    }

    /// Returns an iterator over the elements.
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.0.iter()
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Array {}

impl Hash for Array {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for item in self.iter() {
            item.hash(state);
        }
    }
}

impl FromIterator<Value> for Array {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(im::Vector::from_iter(iter))
    }
}

impl IntoIterator for Array {
    type Item = Value;
    type IntoIter = im::vector::ConsumingIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Array {
    type Item = &'a Value;
    type IntoIter = im::vector::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
