//! In-memory reference concepts.
//!
//! Each concept owns its state outright and exposes it only through actions
//! and queries. State lives in persistent `im` maps behind a lock, so a read
//! takes a cheap snapshot and never blocks on a writer for long.

pub mod blocking;
pub mod friending;
pub mod requesting;
pub mod scheduling;
pub mod sessioning;
pub mod user_authentication;

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use concord_foundation::{Id, Record, Value};

pub use blocking::Blocking;
pub use friending::Friending;
pub use requesting::{Requesting, RequestingConfig, RequestingError};
pub use scheduling::Scheduling;
pub use sessioning::Sessioning;
pub use user_authentication::UserAuthentication;

/// Lock-wrapped concept state. A poisoned lock still yields its data.
#[derive(Debug, Default)]
pub(crate) struct Store<T>(RwLock<T>);

impl<T> Store<T> {
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, T> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Reads an identifier field, accepting either an id or its string form.
pub(crate) fn id_field(input: &Record, field: &str) -> Option<Id> {
    input.get(field).and_then(Value::as_id_str).map(Id::new)
}

/// Reads a plain string field.
pub(crate) fn str_field<'a>(input: &'a Record, field: &str) -> Option<&'a str> {
    input.get(field).and_then(Value::as_str)
}

/// Outcome for an input missing a required field.
pub(crate) fn missing(field: &str) -> Record {
    Record::from_error(format!("Missing field: {field}"))
}

/// Outcome for an action name the concept does not implement.
pub(crate) fn unknown_action(concept: &str, action: &str) -> Record {
    Record::from_error(format!("Unknown action: {concept}.{action}"))
}
