//! Blocking and unblocking users, and the two blocking lookups.

use std::sync::Arc;

use concord_engine::rule::with_context;
use concord_engine::{ConceptRegistry, Frames, QueryRef, Rule, pattern, vars};
use concord_foundation::{Array, Result, Value};

use super::{Command, Lookup, first_failure, resolve};
use crate::concepts::{blocking, requesting, sessioning, user_authentication};

/// `/blocking/block { session, targetUsername }`
const BLOCK: Command = Command {
    name: "BlockUser",
    path: "/blocking/block",
    username_param: "targetUsername",
    action: blocking::BLOCK_USER,
    actor_field: "blocker",
    target_field: "userToBlock",
    status: "blocked",
};

/// `/blocking/unblock { session, targetUsername }`
const UNBLOCK: Command = Command {
    name: "UnblockUser",
    path: "/blocking/unblock",
    username_param: "targetUsername",
    action: blocking::UNBLOCK_USER,
    actor_field: "blocker",
    target_field: "userToUnblock",
    status: "unblocked",
};

/// All blocking rules.
///
/// # Errors
/// Returns an error if a Sessioning, UserAuthentication or Blocking query
/// is missing.
pub fn rules(registry: &ConceptRegistry) -> Result<Vec<Rule>> {
    let get_user = registry.query(sessioning::GET_USER)?;
    let by_username = registry.query(user_authentication::GET_USER_BY_USERNAME)?;
    let blocked_users = registry.query(blocking::BLOCKED_USERS)?;
    let is_user_blocked = registry.query(blocking::IS_USER_BLOCKED)?;

    let mut rules = BLOCK.rules(&get_user, &by_username);
    rules.extend(UNBLOCK.rules(&get_user, &by_username));
    rules.push(blocked_users_success(&get_user, &blocked_users));
    rules.push(blocked_users_error(&get_user));
    rules.push(is_user_blocked_success(&get_user, &by_username, &is_user_blocked));
    rules.push(is_user_blocked_error(&get_user, &by_username));
    Ok(rules)
}

/// `/Blocking/_blockedUsers` answers with every user the caller blocked,
/// or an empty list.
#[must_use]
pub fn blocked_users_success(get_user: &QueryRef, blocked_users: &QueryRef) -> Rule {
    vars!(request, session, user, blocked_user, list);
    let lookups: Arc<[Lookup]> = Arc::from([Lookup::session_user(get_user, &session, &user)]);
    Rule::new("GetBlockedUsersResponseSuccess")
        .when(
            requesting::REQUEST,
            pattern! { path: "/Blocking/_blockedUsers", session: &session },
            pattern! { request: &request },
        )
        .where_(with_context(
            (lookups, blocked_users.clone(), user, blocked_user, list.clone()),
            |(lookups, blocked_users, user, blocked_user, list), frames: Frames| async move {
                let authenticated = resolve(frames, &lookups).await?;
                let found = authenticated
                    .query(
                        &blocked_users,
                        &pattern! { user: &user },
                        &pattern! { user: &blocked_user },
                    )
                    .await?;
                if found.is_empty() {
                    return Ok(authenticated.map(|f| f.with(list.clone(), Array::new())));
                }
                Ok(found.collect_as(&[blocked_user], &list))
            },
        ))
        .then(
            requesting::RESPOND,
            pattern! { request: &request, blockedUsers: &list },
        )
}

/// `/Blocking/_blockedUsers` with an unknown session answers with an error.
#[must_use]
pub fn blocked_users_error(get_user: &QueryRef) -> Rule {
    vars!(request, session, user, query_error);
    let lookups: Arc<[Lookup]> = Arc::from([Lookup::session_user(get_user, &session, &user)]);
    Rule::new("GetBlockedUsersResponseError")
        .when(
            requesting::REQUEST,
            pattern! { path: "/Blocking/_blockedUsers", session: &session },
            pattern! { request: &request },
        )
        .where_(with_context(
            (lookups, query_error.clone()),
            |(lookups, query_error), frames: Frames| async move {
                first_failure(frames, &lookups, &query_error).await
            },
        ))
        .then(
            requesting::RESPOND,
            pattern! { request: &request, error: &query_error },
        )
}

/// `/Blocking/_isUserBlocked` answers whether the caller blocked the named user.
#[must_use]
pub fn is_user_blocked_success(
    get_user: &QueryRef,
    by_username: &QueryRef,
    is_user_blocked: &QueryRef,
) -> Rule {
    vars!(request, session, target_username, primary_user, secondary_user, result, is_blocked);
    let lookups: Arc<[Lookup]> = Arc::from([
        Lookup::session_user(get_user, &session, &primary_user),
        Lookup::user_by_name(by_username, &target_username, &secondary_user),
    ]);
    Rule::new("IsUserBlockedResponseSuccess")
        .when(
            requesting::REQUEST,
            pattern! {
                path: "/Blocking/_isUserBlocked",
                session: &session,
                targetUsername: &target_username,
            },
            pattern! { request: &request },
        )
        .where_(with_context(
            (
                lookups,
                is_user_blocked.clone(),
                primary_user,
                secondary_user,
                result,
                is_blocked.clone(),
            ),
            |(lookups, is_user_blocked, primary_user, secondary_user, result, is_blocked),
             frames: Frames| async move {
                let authenticated = resolve(frames, &lookups).await?;
                let found = authenticated
                    .query(
                        &is_user_blocked,
                        &pattern! { primaryUser: &primary_user, secondaryUser: &secondary_user },
                        &pattern! { result: &result },
                    )
                    .await?;
                if found.is_empty() {
                    return Ok(authenticated.map(|f| f.with(is_blocked.clone(), false)));
                }
                Ok(found.map(|f| {
                    let blocked = f.get(&result).cloned().unwrap_or(Value::Bool(false));
                    f.with(is_blocked.clone(), blocked)
                }))
            },
        ))
        .then(
            requesting::RESPOND,
            pattern! { request: &request, isBlocked: &is_blocked },
        )
}

/// `/Blocking/_isUserBlocked` with an unknown session or username answers
/// with an error.
#[must_use]
pub fn is_user_blocked_error(get_user: &QueryRef, by_username: &QueryRef) -> Rule {
    vars!(request, session, target_username, primary_user, secondary_user, query_error);
    let lookups: Arc<[Lookup]> = Arc::from([
        Lookup::session_user(get_user, &session, &primary_user),
        Lookup::user_by_name(by_username, &target_username, &secondary_user),
    ]);
    Rule::new("IsUserBlockedResponseError")
        .when(
            requesting::REQUEST,
            pattern! {
                path: "/Blocking/_isUserBlocked",
                session: &session,
                targetUsername: &target_username,
            },
            pattern! { request: &request },
        )
        .where_(with_context(
            (lookups, query_error.clone()),
            |(lookups, query_error), frames: Frames| async move {
                first_failure(frames, &lookups, &query_error).await
            },
        ))
        .then(
            requesting::RESPOND,
            pattern! { request: &request, error: &query_error },
        )
}
