//! Rule-scoped variables.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

static NEXT_VAR: AtomicU64 = AtomicU64::new(0);

/// A symbolic variable.
///
/// Every call to [`Var::new`] mints a new identity, so two rules that both
/// declare `request` still get distinct variables. Equality, ordering and
/// hashing use the identity; the name is only for display.
#[derive(Clone)]
pub struct Var {
    id: u64,
    name: Arc<str>,
}

impl Var {
    /// Creates a fresh variable.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            id: NEXT_VAR.fetch_add(1, AtomicOrdering::Relaxed),
            name: name.into(),
        }
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the unique identity of this variable.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }
}

impl PartialEq for Var {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Var {}

impl Hash for Var {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Var {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Var {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}#{}", self.name, self.id)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.name)
    }
}

/// Declares fresh variables named after the given identifiers.
///
/// ```
/// concord_engine::vars!(request, session);
/// assert_eq!(request.name(), "request");
/// assert_ne!(request, session);
/// ```
#[macro_export]
macro_rules! vars {
    ($($name:ident),+ $(,)?) => {
        $(let $name = $crate::Var::new(stringify!($name));)+
    };
}
