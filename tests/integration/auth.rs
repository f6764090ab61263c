//! Registration, login, logout and lookups.

use concord_concepts::GatewayError;
use concord_concepts::concepts::{RequestingError, scheduling};
use concord_foundation::{Value, record};
use serde_json::json;

use crate::support::{call, gateway, id, login, register, retaining_gateway, sign_up};

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn register_answers_with_user() {
    let gateway = gateway();
    let body = call(
        &gateway,
        "/UserAuthentication/register",
        record! { username: "alice", password: "secret" },
    )
    .await;
    assert!(!body.is_error());
    assert!(body.get("user").and_then(Value::as_id).is_some());
}

#[tokio::test]
async fn register_creates_schedule() {
    let gateway = gateway();
    let alice = register(&gateway, "alice").await;

    let invocation = gateway
        .engine()
        .invoke(scheduling::SCHEDULE_EVENT, record! { user: alice, event: "party" })
        .await
        .unwrap();
    assert!(!invocation.outcome.is_error());
}

#[tokio::test]
async fn duplicate_username_is_an_error() {
    let gateway = gateway();
    register(&gateway, "alice").await;
    let body = call(
        &gateway,
        "/UserAuthentication/register",
        record! { username: "alice", password: "other" },
    )
    .await;
    assert_eq!(body.error(), Some("Username already taken"));
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test]
async fn login_answers_with_session_and_user() {
    let gateway = retaining_gateway();
    let alice = register(&gateway, "alice").await;

    let reply = gateway
        .call("/login", record! { username: "alice", password: "pw-alice" })
        .await
        .unwrap();
    assert_eq!(id(&reply.body, "user"), alice);
    let session = id(&reply.body, "session");

    let actions: Vec<String> = gateway
        .engine()
        .history(reply.flow)
        .unwrap()
        .iter()
        .map(|o| o.action.to_string())
        .collect();
    assert_eq!(
        actions,
        vec![
            "Requesting.request",
            "UserAuthentication.login",
            "Sessioning.create",
            "Requesting.respond",
        ]
    );

    let json = serde_json::to_value(&reply.body).unwrap();
    assert_eq!(
        json,
        json!({ "session": session.as_str(), "user": alice.as_str() })
    );
}

#[tokio::test]
async fn wrong_password_is_an_error() {
    let gateway = gateway();
    register(&gateway, "alice").await;
    let body = call(
        &gateway,
        "/login",
        record! { username: "alice", password: "wrong" },
    )
    .await;
    assert_eq!(body.error(), Some("Invalid username or password"));
}

#[tokio::test]
async fn session_resolves_to_user_until_logout() {
    let gateway = gateway();
    let (alice, session) = sign_up(&gateway, "alice").await;

    let body = call(
        &gateway,
        "/Sessioning/_getUser",
        record! { session: session.clone() },
    )
    .await;
    assert_eq!(id(&body, "user"), alice);

    let body = call(&gateway, "/logout", record! { session: session.clone() }).await;
    assert_eq!(body, record! { status: "logged_out" });

    let body = call(&gateway, "/Sessioning/_getUser", record! { session: session.clone() }).await;
    assert_eq!(body.error(), Some("Invalid session"));
    let body = call(&gateway, "/logout", record! { session: session }).await;
    assert_eq!(body.error(), Some("Invalid session"));
}

#[tokio::test]
async fn sessions_are_per_login() {
    let gateway = gateway();
    register(&gateway, "alice").await;
    let first = login(&gateway, "alice").await;
    let second = login(&gateway, "alice").await;
    assert_ne!(first, second);
}

#[tokio::test]
async fn username_lookup() {
    let gateway = gateway();
    let alice = register(&gateway, "alice").await;

    let body = call(
        &gateway,
        "/UserAuthentication/_getUsername",
        record! { user: alice.as_str() },
    )
    .await;
    assert_eq!(body, record! { username: "alice" });

    let body = call(
        &gateway,
        "/UserAuthentication/_getUsername",
        record! { user: "nobody" },
    )
    .await;
    assert_eq!(body.error(), Some("User not found"));
}

// =============================================================================
// Unrouted Requests
// =============================================================================

#[tokio::test]
async fn unknown_path_times_out() {
    let gateway = gateway();
    let err = gateway
        .call("/nowhere", record! {})
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Requesting(RequestingError::Timeout(_))
    ));
}

// =============================================================================
// Retention
// =============================================================================

#[tokio::test]
async fn completed_calls_leave_no_state_behind() {
    let gateway = gateway();
    for _ in 0..20 {
        let body = call(
            &gateway,
            "/Sessioning/_getUser",
            record! { session: "stale" },
        )
        .await;
        assert_eq!(body.error(), Some("Invalid session"));
    }
    let _ = gateway.call("/nowhere", record! {}).await.unwrap_err();

    assert_eq!(gateway.engine().flow_count(), 0);
    assert_eq!(gateway.requesting().request_count(), 0);
}

#[tokio::test]
async fn retaining_gateway_keeps_flows() {
    let gateway = retaining_gateway();
    let reply = gateway
        .call("/Sessioning/_getUser", record! { session: "stale" })
        .await
        .unwrap();

    assert_eq!(gateway.engine().flow_count(), 1);
    assert_eq!(gateway.requesting().request_count(), 1);
    assert!(!gateway.engine().history(reply.flow).unwrap().is_empty());
}
