//! Registration, login, logout and session lookups.

use concord_engine::rule::with_context;
use concord_engine::{ConceptRegistry, Frames, QueryRef, Rule, pattern, vars};
use concord_foundation::Result;

use super::absent;
use crate::concepts::{requesting, scheduling, sessioning, user_authentication};

/// All authentication rules, error responses ahead of success responses.
///
/// # Errors
/// Returns an error if the Sessioning or UserAuthentication queries are missing.
pub fn rules(registry: &ConceptRegistry) -> Result<Vec<Rule>> {
    let get_user = registry.query(sessioning::GET_USER)?;
    let get_username = registry.query(user_authentication::GET_USERNAME)?;
    Ok(vec![
        register_request(),
        register_response_error(),
        register_response_success(),
        login_request(),
        login_success_creates_session(),
        login_response_error(),
        login_response_success(),
        logout_request(&get_user),
        logout_response(),
        logout_response_error(&get_user),
        get_user_from_session_success(&get_user),
        get_user_from_session_error(&get_user),
        get_username_success(&get_username),
        get_username_error(&get_username),
    ])
}

// =============================================================================
// Registration
// =============================================================================

/// `/UserAuthentication/register` registers the account.
#[must_use]
pub fn register_request() -> Rule {
    vars!(request, username, password);
    Rule::new("RegisterRequest")
        .when(
            requesting::REQUEST,
            pattern! { path: "/UserAuthentication/register", username: &username, password: &password },
            pattern! { request: &request },
        )
        .then(
            user_authentication::REGISTER,
            pattern! { username: &username, password: &password },
        )
}

/// A successful registration answers with the user and creates their schedule.
#[must_use]
pub fn register_response_success() -> Rule {
    vars!(request, user);
    Rule::new("RegisterResponseSuccess")
        .when(
            requesting::REQUEST,
            pattern! { path: "/UserAuthentication/register" },
            pattern! { request: &request },
        )
        .when(user_authentication::REGISTER, pattern! {}, pattern! { user: &user })
        .then(requesting::RESPOND, pattern! { request: &request, user: &user })
        .then(scheduling::CREATE_SCHEDULE, pattern! { user: &user })
}

/// A failed registration answers with the error.
#[must_use]
pub fn register_response_error() -> Rule {
    vars!(request, error);
    Rule::new("RegisterResponseError")
        .when(
            requesting::REQUEST,
            pattern! { path: "/UserAuthentication/register" },
            pattern! { request: &request },
        )
        .when(user_authentication::REGISTER, pattern! {}, pattern! { error: &error })
        .then(requesting::RESPOND, pattern! { request: &request, error: &error })
}

// =============================================================================
// Login
// =============================================================================

/// `/login` checks the credentials.
#[must_use]
pub fn login_request() -> Rule {
    vars!(request, username, password);
    Rule::new("LoginRequest")
        .when(
            requesting::REQUEST,
            pattern! { path: "/login", username: &username, password: &password },
            pattern! { request: &request },
        )
        .then(
            user_authentication::LOGIN,
            pattern! { username: &username, password: &password },
        )
}

/// Every successful login opens a session.
#[must_use]
pub fn login_success_creates_session() -> Rule {
    vars!(user);
    Rule::new("LoginSuccessCreatesSession")
        .when(user_authentication::LOGIN, pattern! {}, pattern! { user: &user })
        .then(sessioning::CREATE, pattern! { user: &user })
}

/// Once the session exists, answer with it.
#[must_use]
pub fn login_response_success() -> Rule {
    vars!(request, user, session);
    Rule::new("LoginResponseSuccess")
        .when(
            requesting::REQUEST,
            pattern! { path: "/login" },
            pattern! { request: &request },
        )
        .when(user_authentication::LOGIN, pattern! {}, pattern! { user: &user })
        .when(
            sessioning::CREATE,
            pattern! { user: &user },
            pattern! { session: &session },
        )
        .then(
            requesting::RESPOND,
            pattern! { request: &request, session: &session, user: &user },
        )
}

/// A failed login answers with the error.
#[must_use]
pub fn login_response_error() -> Rule {
    vars!(request, error);
    Rule::new("LoginResponseError")
        .when(
            requesting::REQUEST,
            pattern! { path: "/login" },
            pattern! { request: &request },
        )
        .when(user_authentication::LOGIN, pattern! {}, pattern! { error: &error })
        .then(requesting::RESPOND, pattern! { request: &request, error: &error })
}

// =============================================================================
// Logout
// =============================================================================

/// `/logout` deletes a valid session.
#[must_use]
pub fn logout_request(get_user: &QueryRef) -> Rule {
    vars!(request, session, user);
    Rule::new("LogoutRequest")
        .when(
            requesting::REQUEST,
            pattern! { path: "/logout", session: &session },
            pattern! { request: &request },
        )
        .where_(with_context(
            (get_user.clone(), session.clone(), user),
            |(get_user, session, user), frames: Frames| async move {
                frames
                    .query(&get_user, &pattern! { session: &session }, &pattern! { user: &user })
                    .await
            },
        ))
        .then(sessioning::DELETE, pattern! { session: &session })
}

/// Answers once the session is gone.
#[must_use]
pub fn logout_response() -> Rule {
    vars!(request);
    Rule::new("LogoutResponse")
        .when(
            requesting::REQUEST,
            pattern! { path: "/logout" },
            pattern! { request: &request },
        )
        .when(sessioning::DELETE, pattern! {}, pattern! {})
        .then(
            requesting::RESPOND,
            pattern! { request: &request, status: "logged_out" },
        )
}

/// `/logout` with an unknown session answers with an error.
#[must_use]
pub fn logout_response_error(get_user: &QueryRef) -> Rule {
    vars!(request, session, user);
    Rule::new("LogoutResponseError")
        .when(
            requesting::REQUEST,
            pattern! { path: "/logout", session: &session },
            pattern! { request: &request },
        )
        .where_(with_context(
            (get_user.clone(), session, user),
            |(get_user, session, user), frames: Frames| async move {
                let found = frames
                    .query(&get_user, &pattern! { session: &session }, &pattern! { user: &user })
                    .await?;
                Ok(absent(&found, frames))
            },
        ))
        .then(
            requesting::RESPOND,
            pattern! { request: &request, error: "Invalid session" },
        )
}

// =============================================================================
// Lookups
// =============================================================================

/// `/Sessioning/_getUser` answers with the session's user.
#[must_use]
pub fn get_user_from_session_success(get_user: &QueryRef) -> Rule {
    vars!(request, session, user);
    Rule::new("GetUserFromSessionResponseSuccess")
        .when(
            requesting::REQUEST,
            pattern! { path: "/Sessioning/_getUser", session: &session },
            pattern! { request: &request },
        )
        .where_(with_context(
            (get_user.clone(), session, user.clone()),
            |(get_user, session, user), frames: Frames| async move {
                frames
                    .query(&get_user, &pattern! { session: &session }, &pattern! { user: &user })
                    .await
            },
        ))
        .then(requesting::RESPOND, pattern! { request: &request, user: &user })
}

/// `/Sessioning/_getUser` with an unknown session answers with an error.
#[must_use]
pub fn get_user_from_session_error(get_user: &QueryRef) -> Rule {
    vars!(request, session, user);
    Rule::new("GetUserFromSessionResponseError")
        .when(
            requesting::REQUEST,
            pattern! { path: "/Sessioning/_getUser", session: &session },
            pattern! { request: &request },
        )
        .where_(with_context(
            (get_user.clone(), session, user),
            |(get_user, session, user), frames: Frames| async move {
                let found = frames
                    .query(&get_user, &pattern! { session: &session }, &pattern! { user: &user })
                    .await?;
                Ok(absent(&found, frames))
            },
        ))
        .then(
            requesting::RESPOND,
            pattern! { request: &request, error: "Invalid session" },
        )
}

/// `/UserAuthentication/_getUsername` answers with the user's name.
#[must_use]
pub fn get_username_success(get_username: &QueryRef) -> Rule {
    vars!(request, user, username);
    Rule::new("GetUsernameResponseSuccess")
        .when(
            requesting::REQUEST,
            pattern! { path: "/UserAuthentication/_getUsername", user: &user },
            pattern! { request: &request },
        )
        .where_(with_context(
            (get_username.clone(), user, username.clone()),
            |(get_username, user, username), frames: Frames| async move {
                frames
                    .query(
                        &get_username,
                        &pattern! { user: &user },
                        &pattern! { username: &username },
                    )
                    .await
            },
        ))
        .then(
            requesting::RESPOND,
            pattern! { request: &request, username: &username },
        )
}

/// `/UserAuthentication/_getUsername` for an unknown user answers with an error.
#[must_use]
pub fn get_username_error(get_username: &QueryRef) -> Rule {
    vars!(request, user, username);
    Rule::new("GetUsernameResponseError")
        .when(
            requesting::REQUEST,
            pattern! { path: "/UserAuthentication/_getUsername", user: &user },
            pattern! { request: &request },
        )
        .where_(with_context(
            (get_username.clone(), user, username),
            |(get_username, user, username), frames: Frames| async move {
                let found = frames
                    .query(
                        &get_username,
                        &pattern! { user: &user },
                        &pattern! { username: &username },
                    )
                    .await?;
                Ok(absent(&found, frames))
            },
        ))
        .then(
            requesting::RESPOND,
            pattern! { request: &request, error: "User not found" },
        )
}
