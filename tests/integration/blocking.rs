//! Blocking through the request API.

use concord_foundation::{Array, Value, record};

use crate::support::{call, gateway, retaining_gateway, sign_up};

#[tokio::test]
async fn block_list_and_unblock() {
    let gateway = gateway();
    let (_, session) = sign_up(&gateway, "alice").await;
    let (bob, _) = sign_up(&gateway, "bob").await;

    let body = call(
        &gateway,
        "/blocking/block",
        record! { session: session.clone(), targetUsername: "bob" },
    )
    .await;
    assert_eq!(body, record! { status: "blocked" });

    let body = call(
        &gateway,
        "/Blocking/_blockedUsers",
        record! { session: session.clone() },
    )
    .await;
    let expected: Array = std::iter::once(Value::from(bob)).collect();
    assert_eq!(body, record! { blockedUsers: expected });

    let body = call(
        &gateway,
        "/Blocking/_isUserBlocked",
        record! { session: session.clone(), targetUsername: "bob" },
    )
    .await;
    assert_eq!(body, record! { isBlocked: true });

    let body = call(
        &gateway,
        "/blocking/unblock",
        record! { session: session.clone(), targetUsername: "bob" },
    )
    .await;
    assert_eq!(body, record! { status: "unblocked" });

    let body = call(
        &gateway,
        "/Blocking/_isUserBlocked",
        record! { session: session.clone(), targetUsername: "bob" },
    )
    .await;
    assert_eq!(body, record! { isBlocked: false });

    let body = call(&gateway, "/Blocking/_blockedUsers", record! { session: session }).await;
    assert_eq!(body, record! { blockedUsers: Array::new() });
}

#[tokio::test]
async fn blocking_yourself_reports_the_action_error() {
    let gateway = retaining_gateway();
    let (_, session) = sign_up(&gateway, "alice").await;

    let reply = gateway
        .call(
            "/blocking/block",
            record! { session: session, targetUsername: "alice" },
        )
        .await
        .unwrap();
    assert_eq!(reply.body.error(), Some("A user cannot block themselves."));

    // The success rule also matched the error outcome; its late answer is refused.
    let history = gateway.engine().history(reply.flow).unwrap();
    let refused = history
        .iter()
        .filter(|o| &*o.action == "Requesting.respond" && o.is_error())
        .count();
    assert_eq!(refused, 1);
}

#[tokio::test]
async fn lookup_failures_answer_with_query_error() {
    let gateway = gateway();
    let (_, session) = sign_up(&gateway, "alice").await;

    let body = call(
        &gateway,
        "/blocking/block",
        record! { session: "stale", targetUsername: "bob" },
    )
    .await;
    assert_eq!(body.error(), Some("Invalid session"));

    let body = call(
        &gateway,
        "/blocking/block",
        record! { session: session.clone(), targetUsername: "ghost" },
    )
    .await;
    assert_eq!(body.error(), Some("User not found"));

    let body = call(
        &gateway,
        "/Blocking/_isUserBlocked",
        record! { session: session, targetUsername: "ghost" },
    )
    .await;
    assert_eq!(body.error(), Some("User not found"));

    let body = call(&gateway, "/Blocking/_blockedUsers", record! { session: "stale" }).await;
    assert_eq!(body.error(), Some("Invalid session"));
}
