//! Synchronizations wiring the reference concepts into an HTTP-style API.
//!
//! Every request enters as `Requesting.request { path, ... }`. Rules
//! authenticate it, call the concepts it needs and finally dispatch
//! `Requesting.respond`. Each constructor resolves the queries it uses from
//! the registry up front, so a missing concept fails at startup.
//!
//! A trigger slot with an empty outcome pattern also matches error outcomes.
//! The error-response rule for such an action is listed before its success
//! rule so it responds first; `Requesting.respond` only accepts one answer.

pub mod auth;
pub mod blocking;
pub mod event_friends;
pub mod friending;

use std::sync::Arc;

use concord_engine::rule::with_context;
use concord_engine::{ConceptRegistry, Frames, QueryRef, RecordPattern, Rule, Var, pattern, vars};
use concord_foundation::Result;

use crate::concepts::requesting;

/// Every rule in this module, in registration order.
///
/// # Errors
/// Returns an error if a query the rules need is not registered.
pub fn all(registry: &ConceptRegistry) -> Result<Vec<Rule>> {
    let mut rules = auth::rules(registry)?;
    rules.extend(blocking::rules(registry)?);
    rules.extend(friending::rules(registry)?);
    rules.extend(event_friends::rules(registry)?);
    Ok(rules)
}

/// The frames of `frames` that no frame in `found` extends.
///
/// `found` is the result of a query-join over `frames`; what remains are the
/// frames the query had no rows for.
pub(crate) fn absent(found: &Frames, frames: Frames) -> Frames {
    frames.filter(|frame| !found.iter().any(|joined| frame.is_subset_of(joined)))
}

// =============================================================================
// Lookups
// =============================================================================

/// One query-join step of a request's `where` stage, with the error a
/// client sees when it finds nothing.
#[derive(Clone)]
pub(crate) struct Lookup {
    query: QueryRef,
    input: RecordPattern,
    output: RecordPattern,
    error: &'static str,
}

impl Lookup {
    /// `Sessioning._getUser { session } -> { user }`, failing with "Invalid session".
    pub(crate) fn session_user(get_user: &QueryRef, session: &Var, user: &Var) -> Self {
        Self {
            query: get_user.clone(),
            input: pattern! { session: session },
            output: pattern! { user: user },
            error: "Invalid session",
        }
    }

    /// `UserAuthentication._getUserByUsername { username } -> { user }`,
    /// failing with "User not found".
    pub(crate) fn user_by_name(by_username: &QueryRef, username: &Var, user: &Var) -> Self {
        Self {
            query: by_username.clone(),
            input: pattern! { username: username },
            output: pattern! { user: user },
            error: "User not found",
        }
    }
}

/// Runs every lookup in order; frames a lookup finds nothing for are dropped.
pub(crate) async fn resolve(mut frames: Frames, lookups: &[Lookup]) -> Result<Frames> {
    for lookup in lookups {
        frames = frames
            .query(&lookup.query, &lookup.input, &lookup.output)
            .await?;
    }
    Ok(frames)
}

/// The mirror of [`resolve`]: keeps only frames some lookup found nothing
/// for, with `query_error` bound to the first failing lookup's error.
pub(crate) async fn first_failure(
    mut frames: Frames,
    lookups: &[Lookup],
    query_error: &Var,
) -> Result<Frames> {
    let mut failed = Vec::new();
    for lookup in lookups {
        let found = frames
            .query(&lookup.query, &lookup.input, &lookup.output)
            .await?;
        failed.extend(
            absent(&found, frames).map(|frame| frame.with(query_error.clone(), lookup.error)),
        );
        frames = found;
    }
    Ok(failed.into_iter().collect())
}

// =============================================================================
// Commands
// =============================================================================

/// A session-authenticated request naming another user by username, which
/// runs one action between the two users and answers with a status.
///
/// Produces four rules: the request itself, a response for an error outcome,
/// a success response and a response for a failed lookup.
pub(crate) struct Command {
    pub(crate) name: &'static str,
    pub(crate) path: &'static str,
    /// Request parameter holding the other user's username.
    pub(crate) username_param: &'static str,
    pub(crate) action: &'static str,
    /// Action input field that receives the session's user.
    pub(crate) actor_field: &'static str,
    /// Action input field that receives the named user.
    pub(crate) target_field: &'static str,
    pub(crate) status: &'static str,
}

impl Command {
    pub(crate) fn rules(&self, get_user: &QueryRef, by_username: &QueryRef) -> Vec<Rule> {
        vec![
            self.request(get_user, by_username),
            self.error_response(),
            self.response(),
            self.query_error_response(get_user, by_username),
        ]
    }

    fn trigger(&self, session: &Var, username: &Var, request: &Var) -> (RecordPattern, RecordPattern) {
        (
            pattern! { path: self.path, session: session }.with(self.username_param, username),
            pattern! { request: request },
        )
    }

    fn request(&self, get_user: &QueryRef, by_username: &QueryRef) -> Rule {
        vars!(request, session, username, actor, target);
        let (input, output) = self.trigger(&session, &username, &request);
        let lookups: Arc<[Lookup]> = Arc::from([
            Lookup::session_user(get_user, &session, &actor),
            Lookup::user_by_name(by_username, &username, &target),
        ]);
        Rule::new(format!("{}Request", self.name))
            .when(requesting::REQUEST, input, output)
            .where_(with_context(lookups, |lookups, frames: Frames| async move {
                resolve(frames, &lookups).await
            }))
            .then(
                self.action,
                RecordPattern::new()
                    .with(self.actor_field, &actor)
                    .with(self.target_field, &target),
            )
    }

    fn error_response(&self) -> Rule {
        vars!(request, error);
        Rule::new(format!("{}ErrorResponse", self.name))
            .when(
                requesting::REQUEST,
                pattern! { path: self.path },
                pattern! { request: &request },
            )
            .when(self.action, pattern! {}, pattern! { error: &error })
            .then(requesting::RESPOND, pattern! { request: &request, error: &error })
    }

    fn response(&self) -> Rule {
        vars!(request);
        Rule::new(format!("{}Response", self.name))
            .when(
                requesting::REQUEST,
                pattern! { path: self.path },
                pattern! { request: &request },
            )
            .when(self.action, pattern! {}, pattern! {})
            .then(
                requesting::RESPOND,
                pattern! { request: &request, status: self.status },
            )
    }

    fn query_error_response(&self, get_user: &QueryRef, by_username: &QueryRef) -> Rule {
        vars!(request, session, username, actor, target, query_error);
        let (input, output) = self.trigger(&session, &username, &request);
        let lookups: Arc<[Lookup]> = Arc::from([
            Lookup::session_user(get_user, &session, &actor),
            Lookup::user_by_name(by_username, &username, &target),
        ]);
        Rule::new(format!("{}QueryErrorResponse", self.name))
            .when(requesting::REQUEST, input, output)
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
}
