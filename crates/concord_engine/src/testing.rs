//! Small concepts used by the unit tests.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use concord_foundation::{Record, Value, record};

use crate::concept::Concept;

/// A fixed friendship table answering `Friends._getFriends`.
pub struct FriendTable {
    edges: Vec<(String, String)>,
}

impl FriendTable {
    pub fn new(edges: &[(&str, &str)]) -> Self {
        Self {
            edges: edges
                .iter()
                .map(|(a, b)| ((*a).to_string(), (*b).to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl Concept for FriendTable {
    fn name(&self) -> &'static str {
        "Friends"
    }

    fn actions(&self) -> &[&'static str] {
        &[]
    }

    fn queries(&self) -> &[&'static str] {
        &["_getFriends"]
    }

    async fn perform(&self, action: &str, _input: Record) -> Record {
        Record::from_error(format!("unknown action {action}"))
    }

    async fn query(&self, _query: &str, input: Record) -> Vec<Record> {
        let Some(user) = input.get("user").and_then(Value::as_str) else {
            return Vec::new();
        };
        self.edges
            .iter()
            .filter(|(from, _)| from == user)
            .map(|(_, to)| record! { friend: to.as_str() })
            .collect()
    }
}

/// A counter with one action, `increment { by? } -> { count }`.
#[derive(Default)]
pub struct Counter {
    count: AtomicI64,
}

#[async_trait]
impl Concept for Counter {
    fn name(&self) -> &'static str {
        "Counter"
    }

    fn actions(&self) -> &[&'static str] {
        &["increment"]
    }

    fn queries(&self) -> &[&'static str] {
        &["_value"]
    }

    async fn perform(&self, _action: &str, input: Record) -> Record {
        let by = input.get("by").and_then(Value::as_int).unwrap_or(1);
        let count = self.count.fetch_add(by, Ordering::SeqCst) + by;
        record! { count: count }
    }

    async fn query(&self, _query: &str, _input: Record) -> Vec<Record> {
        vec![record! { count: self.count.load(Ordering::SeqCst) }]
    }
}
