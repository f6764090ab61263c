//! Reference concepts and synchronizations for Concord.
//!
//! This crate provides:
//! - [`concepts`] - In-memory Requesting, Sessioning, UserAuthentication,
//!   Blocking, Friending and Scheduling concepts
//! - [`syncs`] - The rules wiring them into a request/response API
//! - [`Gateway`] - The transport-side entry point: request in, response out

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod concepts;
pub mod gateway;
pub mod syncs;

pub use gateway::{Gateway, GatewayError, Reply};
