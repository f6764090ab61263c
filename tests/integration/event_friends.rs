//! Which friends attend which events.

use concord_concepts::Gateway;
use concord_concepts::concepts::scheduling;
use concord_foundation::{Id, record};
use serde_json::json;

use crate::support::{call, gateway, login, sign_up};

struct Crowd {
    gateway: Gateway,
    bob: Id,
    carol: Id,
}

/// `requester` sends a friend request to `target`, who accepts it.
async fn befriend(gateway: &Gateway, requester: (&str, &Id), target: (&str, &Id)) {
    call(
        gateway,
        "/friending/request",
        record! { session: requester.1.clone(), targetUsername: target.0 },
    )
    .await;
    let body = call(
        gateway,
        "/friending/accept",
        record! { session: target.1.clone(), requesterUsername: requester.0 },
    )
    .await;
    assert_eq!(body, record! { status: "accepted" });
}

async fn attend(gateway: &Gateway, user: &Id, event: &str) {
    let invocation = gateway
        .engine()
        .invoke(scheduling::SCHEDULE_EVENT, record! { user: user.clone(), event: event })
        .await
        .unwrap();
    assert!(!invocation.outcome.is_error());
}

/// alice is friends with bob and carol; bob attends e1 and e2, carol attends e1.
/// Returns alice's session.
async fn crowd() -> (Crowd, Id) {
    let gateway = gateway();
    let (_, alice_session) = sign_up(&gateway, "alice").await;
    let (bob, bob_session) = sign_up(&gateway, "bob").await;
    let (carol, carol_session) = sign_up(&gateway, "carol").await;

    befriend(&gateway, ("alice", &alice_session), ("bob", &bob_session)).await;
    befriend(&gateway, ("alice", &alice_session), ("carol", &carol_session)).await;

    attend(&gateway, &bob, "e1").await;
    attend(&gateway, &bob, "e2").await;
    attend(&gateway, &carol, "e1").await;

    (
        Crowd {
            gateway,
            bob,
            carol,
        },
        alice_session,
    )
}

#[tokio::test]
async fn friends_events_groups_by_event() {
    let (crowd, session) = crowd().await;
    let body = call(
        &crowd.gateway,
        "/getFriendsEvents",
        record! { session: session },
    )
    .await;

    assert_eq!(
        serde_json::to_value(&body).unwrap(),
        json!({
            "results": [
                {
                    "event": "e1",
                    "friends": [
                        { "friend": crowd.bob.as_str(), "username": "bob" },
                        { "friend": crowd.carol.as_str(), "username": "carol" },
                    ],
                },
                {
                    "event": "e2",
                    "friends": [{ "friend": crowd.bob.as_str(), "username": "bob" }],
                },
            ]
        })
    );
}

#[tokio::test]
async fn event_friends_keeps_only_requested_events() {
    let (crowd, session) = crowd().await;
    let body = call(
        &crowd.gateway,
        "/getEventFriends",
        record! { session: session, events: vec!["e2", "e9"] },
    )
    .await;

    assert_eq!(
        serde_json::to_value(&body).unwrap(),
        json!({
            "results": [{
                "event": "e2",
                "friends": [{ "friend": crowd.bob.as_str(), "username": "bob" }],
            }]
        })
    );
}

#[tokio::test]
async fn no_matching_events_answers_empty_results() {
    let (crowd, session) = crowd().await;
    let body = call(
        &crowd.gateway,
        "/getEventFriends",
        record! { session: session, events: vec!["e9"] },
    )
    .await;
    assert_eq!(serde_json::to_value(&body).unwrap(), json!({ "results": [] }));

    // alice attends nothing, so bob's view of his friends' events is empty.
    let bob_session = login(&crowd.gateway, "bob").await;
    let body = call(
        &crowd.gateway,
        "/getFriendsEvents",
        record! { session: bob_session },
    )
    .await;
    assert_eq!(serde_json::to_value(&body).unwrap(), json!({ "results": [] }));
}

#[tokio::test]
async fn invalid_session_is_reported() {
    let gateway = gateway();
    let body = call(&gateway, "/getFriendsEvents", record! { session: "stale" }).await;
    assert_eq!(body.error(), Some("Invalid session"));
    let body = call(
        &gateway,
        "/getEventFriends",
        record! { session: "stale", events: vec!["e1"] },
    )
    .await;
    assert_eq!(body.error(), Some("Invalid session"));
}
