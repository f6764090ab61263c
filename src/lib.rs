//! Concord - Concepts wired together by declarative synchronizations
//!
//! This crate re-exports all layers of the Concord system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: concord_concepts   — Reference concepts, synchronizations, gateway
//! Layer 1: concord_engine     — Rules, matching, binding frames, dispatch
//! Layer 0: concord_foundation — Core types (Value, Record, Id, Error)
//! ```

pub use concord_concepts as concepts;
pub use concord_engine as engine;
pub use concord_foundation as foundation;
