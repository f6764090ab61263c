//! Integration tests for the synchronization engine
//!
//! Tests for matching, frame operators and dispatch.

mod dispatch;
mod matching;
mod support;
