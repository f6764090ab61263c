//! Blocking: lets a user hide from specific other users.

use async_trait::async_trait;
use concord_engine::Concept;
use concord_foundation::{Id, Record, record};
use tracing::{debug, warn};

use super::{Store, id_field, missing, unknown_action};

/// `Blocking.blockUser { blocker, userToBlock } -> {}`
pub const BLOCK_USER: &str = "Blocking.blockUser";
/// `Blocking.unblockUser { blocker, userToUnblock } -> {}`
pub const UNBLOCK_USER: &str = "Blocking.unblockUser";
/// `Blocking._isUserBlocked { primaryUser, secondaryUser } -> [{ result }]`
pub const IS_USER_BLOCKED: &str = "Blocking._isUserBlocked";
/// `Blocking._blockedUsers { user } -> [{ user }]`
pub const BLOCKED_USERS: &str = "Blocking._blockedUsers";

/// Per-user block lists, in the order users were blocked.
#[derive(Debug, Default)]
pub struct Blocking {
    lists: Store<im::HashMap<Id, im::Vector<Id>>>,
}

impl Blocking {
    /// Creates an empty concept.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn block_user(&self, input: &Record) -> Record {
        let Some(blocker) = id_field(input, "blocker") else {
            return missing("blocker");
        };
        let Some(target) = id_field(input, "userToBlock") else {
            return missing("userToBlock");
        };
        if blocker == target {
            return Record::from_error("A user cannot block themselves.");
        }

        let mut lists = self.lists.write();
        let list = lists.entry(blocker.clone()).or_default();
        if !list.contains(&target) {
            list.push_back(target.clone());
        }
        debug!(blocker = %blocker, blocked = %target, "user blocked");
        Record::new()
    }

    fn unblock_user(&self, input: &Record) -> Record {
        let Some(blocker) = id_field(input, "blocker") else {
            return missing("blocker");
        };
        let Some(target) = id_field(input, "userToUnblock") else {
            return missing("userToUnblock");
        };

        // Unblocking someone who was never blocked already has the desired end state.
        let mut lists = self.lists.write();
        if let Some(list) = lists.get_mut(&blocker) {
            list.retain(|id| *id != target);
        }
        Record::new()
    }

    fn is_user_blocked(&self, input: &Record) -> Vec<Record> {
        let (Some(primary), Some(secondary)) = (
            id_field(input, "primaryUser"),
            id_field(input, "secondaryUser"),
        ) else {
            return Vec::new();
        };
        let blocked = self
            .lists
            .read()
            .get(&primary)
            .is_some_and(|list| list.contains(&secondary));
        vec![record! { result: blocked }]
    }

    fn blocked_users(&self, input: &Record) -> Vec<Record> {
        let Some(user) = id_field(input, "user") else {
            return Vec::new();
        };
        self.lists
            .read()
            .get(&user)
            .map(|list| list.iter().map(|id| record! { user: id }).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Concept for Blocking {
    fn name(&self) -> &'static str {
        "Blocking"
    }

    fn actions(&self) -> &[&'static str] {
        &["blockUser", "unblockUser"]
    }

    fn queries(&self) -> &[&'static str] {
        &["_isUserBlocked", "_blockedUsers"]
    }

    async fn perform(&self, action: &str, input: Record) -> Record {
        match action {
            "blockUser" => self.block_user(&input),
            "unblockUser" => self.unblock_user(&input),
            _ => unknown_action(self.name(), action),
        }
    }

    async fn query(&self, query: &str, input: Record) -> Vec<Record> {
        match query {
            "_isUserBlocked" => self.is_user_blocked(&input),
            "_blockedUsers" => self.blocked_users(&input),
            _ => {
                warn!(concept = self.name(), query, "unknown query");
                Vec::new()
            }
        }
    }
}
