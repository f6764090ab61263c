//! End-to-end tests over the reference concepts and synchronizations
//!
//! Every test drives requests through the gateway, exactly as a transport would.

mod auth;
mod blocking;
mod event_friends;
mod friending;
mod support;
