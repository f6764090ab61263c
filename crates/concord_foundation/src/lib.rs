//! Core values, records, identifiers and errors for Concord.
//!
//! This crate provides:
//! - [`Value`] - The value type carried by records and bindings
//! - [`Record`] - Persistent field maps used for action inputs, outcomes and query rows
//! - [`Array`] - Persistent vectors of values
//! - [`Id`] - Opaque identifiers minted by concepts
//! - [`Error`] - Rich error types with context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod collections;
pub mod error;
pub mod id;
pub mod record;
pub mod value;

#[cfg(feature = "serde")]
mod serde_impl;

pub use collections::Array;
pub use error::{Error, ErrorContext, ErrorKind, SemanticLimit};
pub use id::Id;
pub use record::Record;
pub use value::Value;

/// Result alias used throughout Concord.
pub type Result<T> = std::result::Result<T, Error>;
