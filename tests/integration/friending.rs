//! Friend requests through the request API.

use concord_concepts::concepts::friending;
use concord_foundation::{Value, record};

use crate::support::{call, gateway, sign_up};

#[tokio::test]
async fn request_then_accept() {
    let gateway = gateway();
    let (alice, alice_session) = sign_up(&gateway, "alice").await;
    let (bob, bob_session) = sign_up(&gateway, "bob").await;

    let body = call(
        &gateway,
        "/friending/request",
        record! { session: alice_session, targetUsername: "bob" },
    )
    .await;
    assert_eq!(body, record! { status: "sent" });

    let body = call(
        &gateway,
        "/friending/accept",
        record! { session: bob_session, requesterUsername: "alice" },
    )
    .await;
    assert_eq!(body, record! { status: "accepted" });

    let friends = gateway
        .engine()
        .registry()
        .query(friending::GET_ALL_FRIENDS)
        .unwrap()
        .call(record! { user: alice })
        .await;
    assert_eq!(friends, vec![record! { friend: Value::from(bob) }]);
}

#[tokio::test]
async fn reject_clears_the_request() {
    let gateway = gateway();
    let (_, alice_session) = sign_up(&gateway, "alice").await;
    let (_, bob_session) = sign_up(&gateway, "bob").await;

    call(
        &gateway,
        "/friending/request",
        record! { session: alice_session, targetUsername: "bob" },
    )
    .await;
    let body = call(
        &gateway,
        "/friending/reject",
        record! { session: bob_session.clone(), requesterUsername: "alice" },
    )
    .await;
    assert_eq!(body, record! { status: "rejected" });

    let body = call(
        &gateway,
        "/friending/accept",
        record! { session: bob_session, requesterUsername: "alice" },
    )
    .await;
    assert_eq!(body.error(), Some("No pending friend request"));
}

#[tokio::test]
async fn duplicate_request_reports_the_action_error() {
    let gateway = gateway();
    let (_, session) = sign_up(&gateway, "alice").await;
    sign_up(&gateway, "bob").await;

    let params = record! { session: session, targetUsername: "bob" };
    call(&gateway, "/friending/request", params.clone()).await;
    let body = call(&gateway, "/friending/request", params).await;
    assert_eq!(body.error(), Some("Friend request already pending"));
}

#[tokio::test]
async fn unknown_requester_is_reported() {
    let gateway = gateway();
    let (_, session) = sign_up(&gateway, "bob").await;
    let body = call(
        &gateway,
        "/friending/accept",
        record! { session: session, requesterUsername: "ghost" },
    )
    .await;
    assert_eq!(body.error(), Some("User not found"));
}
