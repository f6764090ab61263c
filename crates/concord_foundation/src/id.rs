//! Opaque identifiers minted by concepts.

use std::fmt;
use std::sync::Arc;

/// An opaque identifier (users, sessions, requests, ...).
///
/// Concepts mint identifiers with [`Id::generate`]; the textual form is a
/// UUID v4 but callers must not rely on its shape.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(Arc<str>);

impl Id {
    /// Wraps an existing identifier string.
    #[must_use]
    pub fn new(raw: impl Into<Arc<str>>) -> Self {
        Self(raw.into())
    }

    /// Mints a fresh, globally unique identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string().into())
    }

    /// Returns the textual form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.0)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
