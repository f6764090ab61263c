//! Integration tests for Layer 0: Foundation
//!
//! Tests for core types: Value, Record, Id, Error.

mod errors;
mod values;
