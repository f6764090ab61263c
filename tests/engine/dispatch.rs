//! Building engines, dispatch order, concurrency and the step limit.

use std::sync::Arc;

use concord_engine::{EngineConfig, ErrorKind, Frames, Rule, SyncEngine, pattern, vars};
use concord_foundation::{Error, SemanticLimit, record};

use crate::support::{engine, engine_with, notified_users, registry, social};

fn ping_forever() -> Rule {
    Rule::new("PingForever")
        .when("Social.ping", pattern! {}, pattern! {})
        .then("Social.ping", pattern! {})
}

// =============================================================================
// Building
// =============================================================================

#[test]
fn build_rejects_duplicate_rule_names() {
    let social = social();
    let err = SyncEngine::builder(registry(&social))
        .rule(ping_forever())
        .rule(ping_forever())
        .build()
        .err()
        .unwrap();
    assert!(matches!(err.kind, ErrorKind::DuplicateRule(ref name) if name == "PingForever"));
}

#[test]
fn build_rejects_unknown_actions() {
    let social = social();
    let err = SyncEngine::builder(registry(&social))
        .rule(
            Rule::new("Typo")
                .when("Social.post", pattern! {}, pattern! {})
                .then("Social.notfy", pattern! {}),
        )
        .build()
        .err()
        .unwrap();
    assert!(matches!(err.kind, ErrorKind::UnknownAction(_)));
}

#[test]
fn build_rejects_effects_with_unbound_variables() {
    vars!(nobody);
    let social = social();
    let err = SyncEngine::builder(registry(&social))
        .rule(
            Rule::new("Dangling")
                .when("Social.post", pattern! {}, pattern! {})
                .then("Social.notify", pattern! { user: &nobody }),
        )
        .build()
        .err()
        .unwrap();
    assert!(matches!(err.kind, ErrorKind::InvalidRule { .. }));
}

#[tokio::test]
async fn invoking_an_unknown_action_opens_no_flow() {
    let social = social();
    let engine = engine(&social, vec![]);
    let err = engine.invoke("Social.dance", record! {}).await.unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnknownAction(_)));
    assert_eq!(engine.flow_count(), 0);
}

// =============================================================================
// Dispatch
// =============================================================================

#[tokio::test]
async fn effects_run_in_declaration_order() {
    let social = social();
    let engine = engine(
        &social,
        vec![
            Rule::new("Both")
                .when("Social.ping", pattern! {}, pattern! {})
                .then("Social.notify", pattern! { user: "first" })
                .then("Social.notify", pattern! { user: "second" }),
        ],
    );

    engine.invoke("Social.ping", record! {}).await.unwrap();
    assert_eq!(notified_users(&social), vec!["first", "second"]);
}

#[tokio::test]
async fn failing_extension_skips_only_its_rule() {
    let social = social();
    let engine = engine(
        &social,
        vec![
            Rule::new("Broken")
                .when("Social.ping", pattern! {}, pattern! {})
                .where_(|_frames: Frames| async move {
                    Err::<Frames, _>(Error::unknown_query("Social._missing"))
                })
                .then("Social.notify", pattern! { user: "broken" }),
            Rule::new("Fine")
                .when("Social.ping", pattern! {}, pattern! {})
                .then("Social.notify", pattern! { user: "fine" }),
        ],
    );

    let invocation = engine.invoke("Social.ping", record! {}).await.unwrap();
    assert_eq!(notified_users(&social), vec!["fine"]);
    let fired: Vec<String> = engine
        .firings(invocation.flow)
        .unwrap()
        .iter()
        .map(|f| f.rule.to_string())
        .collect();
    assert_eq!(fired, vec!["Fine"]);
}

#[tokio::test]
async fn step_limit_aborts_runaway_flow() {
    let social = social();
    let engine = engine_with(
        &social,
        vec![ping_forever()],
        EngineConfig::default().with_max_steps_per_flow(50),
    );

    let err = engine.invoke("Social.ping", record! {}).await.unwrap_err();
    match err.kind {
        ErrorKind::LimitExceeded(SemanticLimit::MaxSteps { limit, context }) => {
            assert_eq!(limit, 50);
            assert_eq!(context.as_deref(), Some("Social.ping"));
        }
        other => panic!("expected step limit, got {other:?}"),
    }
}

// =============================================================================
// Flows
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_flows_stay_isolated() {
    vars!(author);
    let social = social();
    let engine = Arc::new(engine(
        &social,
        vec![
            Rule::new("Echo")
                .when("Social.post", pattern! { author: &author }, pattern! {})
                .then("Social.notify", pattern! { user: &author }),
        ],
    ));

    let tasks = (0..20).map(|i| {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            engine
                .invoke("Social.post", record! { author: format!("user{i}") })
                .await
        })
    });
    let invocations: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(social.notified().len(), 20);
    for invocation in &invocations {
        let history = engine.history(invocation.flow).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].input.get("author"), history[1].input.get("user"));
    }
    assert_eq!(engine.flow_count(), 20);
}

#[tokio::test]
async fn retired_flow_is_forgotten() {
    let social = social();
    let engine = engine(&social, vec![]);
    let invocation = engine.invoke("Social.ping", record! {}).await.unwrap();

    assert!(engine.retire(invocation.flow));
    assert!(!engine.retire(invocation.flow));
    let err = engine.history(invocation.flow).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnknownFlow(_)));
    let err = engine
        .invoke_in(invocation.flow, "Social.ping", record! {})
        .await
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnknownFlow(_)));
}
