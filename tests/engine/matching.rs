//! Trigger matching across the occurrences of a flow.

use concord_engine::{EngineConfig, Rule, Value, pattern, vars};
use concord_foundation::record;

use crate::support::{engine, engine_with, notified_users, social};

fn post_then_ping() -> Rule {
    vars!(author);
    Rule::new("PostThenPing")
        .when("Social.post", pattern! { author: &author }, pattern! {})
        .when("Social.ping", pattern! {}, pattern! {})
        .then("Social.notify", pattern! { user: &author })
}

// =============================================================================
// Multi-slot Rules
// =============================================================================

#[tokio::test]
async fn waits_for_every_slot() {
    let social = social();
    let engine = engine(&social, vec![post_then_ping()]);

    let first = engine
        .invoke("Social.post", record! { author: "alice", text: "hi" })
        .await
        .unwrap();
    assert!(social.notified().is_empty());

    let explanation = engine.explain(first.flow, "PostThenPing").await.unwrap();
    assert!(!explanation.has_fired());
    assert_eq!(explanation.satisfied.len(), 1);
    assert_eq!(explanation.missing, vec![std::sync::Arc::<str>::from("Social.ping")]);

    engine
        .invoke_in(first.flow, "Social.ping", record! {})
        .await
        .unwrap();
    assert_eq!(notified_users(&social), vec!["alice"]);

    let explanation = engine.explain(first.flow, "PostThenPing").await.unwrap();
    assert_eq!(explanation.fired, 1);
}

#[tokio::test]
async fn slot_order_is_not_temporal_order() {
    let social = social();
    let engine = engine(&social, vec![post_then_ping()]);

    let first = engine.invoke("Social.ping", record! {}).await.unwrap();
    engine
        .invoke_in(first.flow, "Social.post", record! { author: "bob" })
        .await
        .unwrap();
    assert_eq!(notified_users(&social), vec!["bob"]);
}

#[tokio::test]
async fn flows_do_not_share_occurrences() {
    let social = social();
    let engine = engine(&social, vec![post_then_ping()]);

    engine
        .invoke("Social.post", record! { author: "alice" })
        .await
        .unwrap();
    engine.invoke("Social.ping", record! {}).await.unwrap();
    assert!(social.notified().is_empty());
}

#[tokio::test]
async fn each_completed_set_fires_once() {
    let social = social();
    let engine = engine(&social, vec![post_then_ping()]);

    let first = engine
        .invoke("Social.post", record! { author: "alice" })
        .await
        .unwrap();
    engine
        .invoke_in(first.flow, "Social.ping", record! {})
        .await
        .unwrap();
    // A second ping is a new occurrence, so it completes a new set.
    engine
        .invoke_in(first.flow, "Social.ping", record! {})
        .await
        .unwrap();

    assert_eq!(notified_users(&social), vec!["alice", "alice"]);
    let firings = engine.firings(first.flow).unwrap();
    assert_eq!(firings.len(), 2);
    assert_ne!(firings[0].trigger, firings[1].trigger);
}

// =============================================================================
// Unification
// =============================================================================

#[tokio::test]
async fn literal_fields_must_match() {
    vars!(text);
    let social = social();
    let engine = engine(
        &social,
        vec![
            Rule::new("AliceOnly")
                .when("Social.post", pattern! { author: "alice", text: &text }, pattern! {})
                .then("Social.notify", pattern! { user: "moderator", text: &text }),
        ],
    );

    engine
        .invoke("Social.post", record! { author: "bob", text: "nope" })
        .await
        .unwrap();
    engine
        .invoke("Social.post", record! { author: "alice", text: "yes" })
        .await
        .unwrap();

    let notified = social.notified();
    assert_eq!(notified.len(), 1);
    assert_eq!(notified[0].get("text"), Some(&Value::from("yes")));
}

#[tokio::test]
async fn outcome_pattern_binds_error() {
    vars!(error);
    let social = social();
    let engine = engine(
        &social,
        vec![
            Rule::new("ReportFailure")
                .when("Social.fail", pattern! {}, pattern! { error: &error })
                .then("Social.notify", pattern! { user: &error }),
        ],
    );

    let invocation = engine.invoke("Social.fail", record! {}).await.unwrap();
    assert!(invocation.outcome.is_error());
    assert_eq!(notified_users(&social), vec!["boom"]);
}

#[tokio::test]
async fn effects_chain_through_outcomes() {
    vars!(author, post);
    let social = social();
    let engine = engine(
        &social,
        vec![
            Rule::new("Announce")
                .when(
                    "Social.post",
                    pattern! { author: &author },
                    pattern! { post: &post },
                )
                .then("Social.notify", pattern! { user: &author, post: &post }),
        ],
    );

    let invocation = engine
        .invoke("Social.post", record! { author: "carol", text: "news" })
        .await
        .unwrap();

    let history = engine.history(invocation.flow).unwrap();
    let actions: Vec<&str> = history.iter().map(|o| &*o.action).collect();
    assert_eq!(actions, vec!["Social.post", "Social.notify"]);
    assert_eq!(
        history[1].input,
        record! { user: "carol", post: "news" }
    );
    assert!(history.windows(2).all(|w| w[0].seq < w[1].seq));
}

// =============================================================================
// Partial Store
// =============================================================================

#[tokio::test]
async fn stale_partials_do_not_block_a_live_match() {
    vars!(user);
    let social = social();
    let engine = engine_with(
        &social,
        vec![
            Rule::new("PostThenNotify")
                .when("Social.post", pattern! { author: &user }, pattern! {})
                .when("Social.notify", pattern! { user: &user }, pattern! {})
                .then("Social.ping", pattern! {}),
        ],
        EngineConfig::default().with_max_partials_per_rule(4),
    );

    let first = engine
        .invoke("Social.post", record! { author: "ghost" })
        .await
        .unwrap();
    for _ in 0..3 {
        engine
            .invoke_in(first.flow, "Social.post", record! { author: "ghost" })
            .await
            .unwrap();
    }
    engine
        .invoke_in(first.flow, "Social.post", record! { author: "erin" })
        .await
        .unwrap();
    engine
        .invoke_in(first.flow, "Social.notify", record! { user: "erin" })
        .await
        .unwrap();

    let pings = engine
        .history(first.flow)
        .unwrap()
        .iter()
        .filter(|o| &*o.action == "Social.ping")
        .count();
    assert_eq!(pings, 1);
    assert_eq!(engine.firings(first.flow).unwrap().len(), 1);
}
