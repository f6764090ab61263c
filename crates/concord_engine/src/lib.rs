//! Synchronization engine for Concord.
//!
//! This crate provides:
//! - [`Concept`] / [`ConceptRegistry`] - The seam to independent data services
//! - [`Frame`] / [`Frames`] - Binding frames and the join, filter and collect operators
//! - [`RecordPattern`] / [`ActionPattern`] - Unification against records and occurrences
//! - [`Rule`] - Declarative `when` / `where` / `then` synchronizations
//! - [`ChainMatcher`] - Incremental multi-occurrence matching with refraction
//! - [`SyncEngine`] - The dispatch loop, per-flow occurrence log and kill switch

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod concept;
pub mod config;
pub mod engine;
pub mod frame;
pub mod log;
pub mod matcher;
pub mod pattern;
pub mod rule;
pub mod var;

#[cfg(test)]
mod testing;

pub use concept::{ActionRef, Concept, ConceptRegistry, QueryRef};
pub use config::EngineConfig;
pub use engine::{EngineBuilder, Invocation, SyncEngine};
pub use frame::{Frame, Frames};
pub use log::{FiringRecord, FlowId, Occurrence, OccurrenceLog};
pub use matcher::{ChainMatcher, Completion, Explanation};
pub use pattern::{ActionPattern, RecordPattern, Term};
pub use rule::{Effect, Extension, Rule};
pub use var::Var;

pub use concord_foundation::{Error, ErrorKind, Id, Record, Result, Value};
