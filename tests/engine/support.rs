//! A small concept for exercising the engine.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use concord_engine::{Concept, ConceptRegistry, EngineConfig, Rule, SyncEngine};
use concord_foundation::{Record, Value, record};

/// `Social`: a fixed friend table and a log of notifications.
///
/// Actions:
/// - `post { author, text } -> { post }`
/// - `notify { ... } -> {}` (recorded)
/// - `ping {} -> {}`
/// - `fail {} -> { error }`
///
/// Queries:
/// - `_friends { user } -> [{ friend }]`
pub struct Social {
    edges: Vec<(String, String)>,
    notified: Mutex<Vec<Record>>,
}

impl Social {
    pub fn with_friends(edges: &[(&str, &str)]) -> Self {
        Self {
            edges: edges
                .iter()
                .map(|(a, b)| ((*a).to_string(), (*b).to_string()))
                .collect(),
            notified: Mutex::new(Vec::new()),
        }
    }

    pub fn notified(&self) -> Vec<Record> {
        self.notified.lock().unwrap().clone()
    }
}

#[async_trait]
impl Concept for Social {
    fn name(&self) -> &'static str {
        "Social"
    }

    fn actions(&self) -> &[&'static str] {
        &["post", "notify", "ping", "fail"]
    }

    fn queries(&self) -> &[&'static str] {
        &["_friends"]
    }

    async fn perform(&self, action: &str, input: Record) -> Record {
        match action {
            "post" => record! { post: input.get("text").cloned().unwrap_or(Value::Null) },
            "notify" => {
                self.notified.lock().unwrap().push(input);
                Record::new()
            }
            "ping" => Record::new(),
            _ => Record::from_error("boom"),
        }
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

/// alice -> bob, carol, dave; bob -> alice.
pub fn social() -> Arc<Social> {
    Arc::new(Social::with_friends(&[
        ("alice", "bob"),
        ("alice", "carol"),
        ("alice", "dave"),
        ("bob", "alice"),
    ]))
}

pub fn registry(social: &Arc<Social>) -> ConceptRegistry {
    let mut registry = ConceptRegistry::new();
    registry.register(social.clone()).unwrap();
    registry
}

pub fn engine(social: &Arc<Social>, rules: Vec<Rule>) -> SyncEngine {
    engine_with(social, rules, EngineConfig::default())
}

pub fn engine_with(social: &Arc<Social>, rules: Vec<Rule>, config: EngineConfig) -> SyncEngine {
    SyncEngine::builder(registry(social))
        .rules(rules)
        .config(config)
        .build()
        .unwrap()
}

/// The `user` field of every notification, in dispatch order.
pub fn notified_users(social: &Social) -> Vec<String> {
    social
        .notified()
        .iter()
        .filter_map(|n| n.get("user").and_then(Value::as_str).map(str::to_string))
        .collect()
}
