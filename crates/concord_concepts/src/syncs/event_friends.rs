//! Which friends attend which events.
//!
//! Both endpoints join session -> user -> friends -> username -> schedule and
//! answer with `results: [{ event, friends: [{ friend, username }] }]`, one
//! entry per event. `/getEventFriends` keeps only the events listed in the
//! request's `events` array.

use std::sync::Arc;

use concord_engine::rule::with_context;
use concord_engine::{ConceptRegistry, Frame, Frames, QueryRef, Rule, Var, pattern, vars};
use concord_foundation::{Array, Result, Value};

use super::{Lookup, absent, first_failure, resolve};
use crate::concepts::{friending, requesting, scheduling, sessioning, user_authentication};

/// Both event-friends endpoints.
///
/// # Errors
/// Returns an error if a Sessioning, Friending, UserAuthentication or
/// Scheduling query is missing.
pub fn rules(registry: &ConceptRegistry) -> Result<Vec<Rule>> {
    let queries = Queries {
        get_user: registry.query(sessioning::GET_USER)?,
        all_friends: registry.query(friending::GET_ALL_FRIENDS)?,
        get_username: registry.query(user_authentication::GET_USERNAME)?,
        schedule: registry.query(scheduling::GET_USER_SCHEDULE)?,
    };
    Ok(vec![
        get_event_friends(&queries),
        invalid_session("GetEventFriendsResponseError", "/getEventFriends", &queries),
        get_friends_events(&queries),
        invalid_session("GetFriendsEventsResponseError", "/getFriendsEvents", &queries),
    ])
}

struct Queries {
    get_user: QueryRef,
    all_friends: QueryRef,
    get_username: QueryRef,
    schedule: QueryRef,
}

/// The shared `where` stage.
#[derive(Clone)]
struct FriendsEvents {
    queries: Arc<[QueryRef; 3]>,
    lookups: Arc<[Lookup]>,
    user: Var,
    friend: Var,
    username: Var,
    event: Var,
    friends: Var,
    results: Var,
    /// Set for `/getEventFriends`: the request's list of wanted events.
    wanted: Option<Var>,
}

impl FriendsEvents {
    fn new(queries: &Queries, session: &Var, results: &Var, wanted: Option<Var>) -> Self {
        let user = Var::new("user");
        Self {
            queries: Arc::new([
                queries.all_friends.clone(),
                queries.get_username.clone(),
                queries.schedule.clone(),
            ]),
            lookups: Arc::from([Lookup::session_user(&queries.get_user, session, &user)]),
            user,
            friend: Var::new("friend"),
            username: Var::new("username"),
            event: Var::new("event"),
            friends: Var::new("friends"),
            results: results.clone(),
            wanted,
        }
    }

    async fn run(self, frames: Frames) -> Result<Frames> {
        let [all_friends, get_username, schedule] = &*self.queries;
        let authenticated = resolve(frames, &self.lookups).await?;

        let joined = authenticated
            .query(all_friends, &pattern! { user: &self.user }, &pattern! { friend: &self.friend })
            .await?
            .query(
                get_username,
                &pattern! { user: &self.friend },
                &pattern! { username: &self.username },
            )
            .await?
            .query(schedule, &pattern! { user: &self.friend }, &pattern! { event: &self.event })
            .await?;
        let joined = match &self.wanted {
            Some(wanted) => joined.filter(|frame| self.is_wanted(frame, wanted)),
            None => joined,
        };

        let mut answered: Vec<Frame> = joined
            .collect_as(&[self.friend.clone(), self.username.clone()], &self.friends)
            .collect_as(&[self.friends.clone(), self.event.clone()], &self.results)
            .into_iter()
            .collect();
        answered.extend(
            absent(&joined, authenticated).map(|frame| frame.with(self.results.clone(), Array::new())),
        );
        Ok(answered.into_iter().collect())
    }

    fn is_wanted(&self, frame: &Frame, wanted: &Var) -> bool {
        let Some(event) = frame.get(&self.event).and_then(Value::as_id_str) else {
            return false;
        };
        frame
            .get(wanted)
            .and_then(Value::as_array)
            .is_some_and(|list| list.iter().any(|v| v.as_id_str() == Some(event)))
    }
}

/// `/getEventFriends { session, events }`: for each listed event the caller's
/// friends attend, which friends they are.
fn get_event_friends(queries: &Queries) -> Rule {
    vars!(request, session, events, results);
    let stage = FriendsEvents::new(queries, &session, &results, Some(events.clone()));
    Rule::new("GetEventFriends")
        .when(
            requesting::REQUEST,
            pattern! { path: "/getEventFriends", session: &session, events: &events },
            pattern! { request: &request },
        )
        .where_(with_context(stage, FriendsEvents::run))
        .then(
            requesting::RESPOND,
            pattern! { request: &request, results: &results },
        )
}

/// `/getFriendsEvents { session }`: every event the caller's friends attend.
fn get_friends_events(queries: &Queries) -> Rule {
    vars!(request, session, results);
    let stage = FriendsEvents::new(queries, &session, &results, None);
    Rule::new("GetFriendsEvents")
        .when(
            requesting::REQUEST,
            pattern! { path: "/getFriendsEvents", session: &session },
            pattern! { request: &request },
        )
        .where_(with_context(stage, FriendsEvents::run))
        .then(
            requesting::RESPOND,
            pattern! { request: &request, results: &results },
        )
}

fn invalid_session(name: &'static str, path: &'static str, queries: &Queries) -> Rule {
    vars!(request, session, user, query_error);
    let lookups: Arc<[Lookup]> =
        Arc::from([Lookup::session_user(&queries.get_user, &session, &user)]);
    Rule::new(name)
        .when(
            requesting::REQUEST,
            pattern! { path: path, session: &session },
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
