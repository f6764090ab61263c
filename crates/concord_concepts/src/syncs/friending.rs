//! Sending, accepting and rejecting friend requests.
//!
//! The caller is the session's user; the other party is named by username.
//! A request answers with its status only once the Friending action
//! succeeded, and with the action's error otherwise.

use concord_engine::{ConceptRegistry, Rule};
use concord_foundation::Result;

use super::Command;
use crate::concepts::{friending, sessioning, user_authentication};

/// `/friending/request { session, targetUsername }`
const SEND: Command = Command {
    name: "SendFriendRequest",
    path: "/friending/request",
    username_param: "targetUsername",
    action: friending::REQUEST_FRIEND,
    actor_field: "requester",
    target_field: "requestee",
    status: "sent",
};

/// `/friending/accept { session, requesterUsername }`
const ACCEPT: Command = Command {
    name: "AcceptFriendRequest",
    path: "/friending/accept",
    username_param: "requesterUsername",
    action: friending::ACCEPT_FRIEND,
    actor_field: "requestee",
    target_field: "requester",
    status: "accepted",
};

/// `/friending/reject { session, requesterUsername }`
const REJECT: Command = Command {
    name: "RejectFriendRequest",
    path: "/friending/reject",
    username_param: "requesterUsername",
    action: friending::REJECT_FRIEND,
    actor_field: "requestee",
    target_field: "requester",
    status: "rejected",
};

/// All friending rules.
///
/// # Errors
/// Returns an error if the Sessioning or UserAuthentication queries are missing.
pub fn rules(registry: &ConceptRegistry) -> Result<Vec<Rule>> {
    let get_user = registry.query(sessioning::GET_USER)?;
    let by_username = registry.query(user_authentication::GET_USER_BY_USERNAME)?;
    Ok([SEND, ACCEPT, REJECT]
        .iter()
        .flat_map(|command| command.rules(&get_user, &by_username))
        .collect())
}
