//! Sessioning: maps opaque session tokens to users.

use async_trait::async_trait;
use concord_engine::Concept;
use concord_foundation::{Id, Record, record};
use tracing::{debug, warn};

use super::{Store, id_field, missing, unknown_action};

/// `Sessioning.create { user } -> { session }`
pub const CREATE: &str = "Sessioning.create";
/// `Sessioning.delete { session } -> {}`
pub const DELETE: &str = "Sessioning.delete";
/// `Sessioning._getUser { session } -> [{ user }]`
pub const GET_USER: &str = "Sessioning._getUser";

/// Active sessions.
#[derive(Debug, Default)]
pub struct Sessioning {
    sessions: Store<im::HashMap<Id, Id>>,
}

impl Sessioning {
    /// Creates an empty concept.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn create(&self, input: &Record) -> Record {
        let Some(user) = id_field(input, "user") else {
            return missing("user");
        };
        let session = Id::generate();
        self.sessions.write().insert(session.clone(), user.clone());
        debug!(user = %user, "session created");
        record! { session: session }
    }

    fn delete(&self, input: &Record) -> Record {
        let Some(session) = id_field(input, "session") else {
            return missing("session");
        };
        match self.sessions.write().remove(&session) {
            Some(_) => Record::new(),
            None => Record::from_error("Session not found"),
        }
    }

    fn get_user(&self, input: &Record) -> Vec<Record> {
        id_field(input, "session")
            .and_then(|session| self.sessions.read().get(&session).cloned())
            .map(|user| vec![record! { user: user }])
            .unwrap_or_default()
    }
}

#[async_trait]
impl Concept for Sessioning {
    fn name(&self) -> &'static str {
        "Sessioning"
    }

    fn actions(&self) -> &[&'static str] {
        &["create", "delete"]
    }

    fn queries(&self) -> &[&'static str] {
        &["_getUser"]
    }

    async fn perform(&self, action: &str, input: Record) -> Record {
        match action {
            "create" => self.create(&input),
            "delete" => self.delete(&input),
            _ => unknown_action(self.name(), action),
        }
    }

    async fn query(&self, query: &str, input: Record) -> Vec<Record> {
        if query == "_getUser" {
            self.get_user(&input)
        } else {
            warn!(concept = self.name(), query, "unknown query");
            Vec::new()
        }
    }
}
