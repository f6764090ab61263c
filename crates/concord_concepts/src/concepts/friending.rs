//! Friending: mutual friendships established through requests.

use async_trait::async_trait;
use concord_engine::Concept;
use concord_foundation::{Id, Record, record};
use tracing::{debug, warn};

use super::{Store, id_field, missing, unknown_action};

/// `Friending.requestFriend { requester, requestee } -> {}`
pub const REQUEST_FRIEND: &str = "Friending.requestFriend";
/// `Friending.acceptFriend { requester, requestee } -> {}`
pub const ACCEPT_FRIEND: &str = "Friending.acceptFriend";
/// `Friending.rejectFriend { requester, requestee } -> {}`
pub const REJECT_FRIEND: &str = "Friending.rejectFriend";
/// `Friending.removeFriend { user, friend } -> {}`
pub const REMOVE_FRIEND: &str = "Friending.removeFriend";
/// `Friending._getAllFriends { user } -> [{ friend }]`
pub const GET_ALL_FRIENDS: &str = "Friending._getAllFriends";
/// `Friending._areTheyFriends { user1, user2 } -> [{ result }]`
pub const ARE_THEY_FRIENDS: &str = "Friending._areTheyFriends";
/// `Friending._getAllIncomingFriendRequests { user } -> [{ requester }]`
pub const GET_INCOMING: &str = "Friending._getAllIncomingFriendRequests";
/// `Friending._getAllOutgoingFriendRequests { user } -> [{ requestee }]`
pub const GET_OUTGOING: &str = "Friending._getAllOutgoingFriendRequests";

#[derive(Clone, Debug, Default)]
struct Graph {
    /// Symmetric adjacency, in the order friendships formed.
    friends: im::HashMap<Id, im::Vector<Id>>,
    /// Pending `(requester, requestee)` pairs, oldest first.
    pending: im::Vector<(Id, Id)>,
}

impl Graph {
    fn are_friends(&self, a: &Id, b: &Id) -> bool {
        self.friends.get(a).is_some_and(|list| list.contains(b))
    }

    fn pending_index(&self, requester: &Id, requestee: &Id) -> Option<usize> {
        self.pending
            .iter()
            .position(|(from, to)| from == requester && to == requestee)
    }

    fn link(&mut self, a: &Id, b: &Id) {
        self.friends.entry(a.clone()).or_default().push_back(b.clone());
        self.friends.entry(b.clone()).or_default().push_back(a.clone());
    }

    fn unlink(&mut self, a: &Id, b: &Id) {
        if let Some(list) = self.friends.get_mut(a) {
            list.retain(|id| id != b);
        }
        if let Some(list) = self.friends.get_mut(b) {
            list.retain(|id| id != a);
        }
    }
}

/// Friendships and pending friend requests.
#[derive(Debug, Default)]
pub struct Friending {
    graph: Store<Graph>,
}

fn pair(input: &Record, a: &str, b: &str) -> Result<(Id, Id), Record> {
    let first = id_field(input, a).ok_or_else(|| missing(a))?;
    let second = id_field(input, b).ok_or_else(|| missing(b))?;
    Ok((first, second))
}

impl Friending {
    /// Creates an empty concept.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn request_friend(&self, requester: &Id, requestee: &Id) -> Record {
        if requester == requestee {
            return Record::from_error("Cannot send a friend request to yourself");
        }
        let mut graph = self.graph.write();
        if graph.are_friends(requester, requestee) {
            return Record::from_error("Users are already friends");
        }
        if graph.pending_index(requester, requestee).is_some()
            || graph.pending_index(requestee, requester).is_some()
        {
            return Record::from_error("Friend request already pending");
        }
        graph.pending.push_back((requester.clone(), requestee.clone()));
        debug!(requester = %requester, requestee = %requestee, "friend request sent");
        Record::new()
    }

    fn answer_request(&self, requester: &Id, requestee: &Id, accept: bool) -> Record {
        let mut graph = self.graph.write();
        let Some(index) = graph.pending_index(requester, requestee) else {
            return Record::from_error("No pending friend request");
        };
        graph.pending.remove(index);
        if accept {
            graph.link(requester, requestee);
        }
        debug!(requester = %requester, requestee = %requestee, accept, "friend request answered");
        Record::new()
    }

    fn remove_friend(&self, user: &Id, friend: &Id) -> Record {
        let mut graph = self.graph.write();
        if !graph.are_friends(user, friend) {
            return Record::from_error("Users are not friends");
        }
        graph.unlink(user, friend);
        Record::new()
    }

    fn rows(&self, input: &Record, query: &str) -> Vec<Record> {
        let graph = self.graph.read();
        match query {
            "_getAllFriends" => id_field(input, "user")
                .and_then(|user| graph.friends.get(&user).cloned())
                .map(|list| list.iter().map(|f| record! { friend: f }).collect())
                .unwrap_or_default(),
            "_areTheyFriends" => match pair(input, "user1", "user2") {
                Ok((a, b)) => vec![record! { result: graph.are_friends(&a, &b) }],
                Err(_) => Vec::new(),
            },
            "_getAllIncomingFriendRequests" => id_field(input, "user")
                .map(|user| {
                    graph
                        .pending
                        .iter()
                        .filter(|(_, to)| *to == user)
                        .map(|(from, _)| record! { requester: from })
                        .collect()
                })
                .unwrap_or_default(),
            "_getAllOutgoingFriendRequests" => id_field(input, "user")
                .map(|user| {
                    graph
                        .pending
                        .iter()
                        .filter(|(from, _)| *from == user)
                        .map(|(_, to)| record! { requestee: to })
                        .collect()
                })
                .unwrap_or_default(),
            _ => {
                warn!(concept = "Friending", query, "unknown query");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Concept for Friending {
    fn name(&self) -> &'static str {
        "Friending"
    }

    fn actions(&self) -> &[&'static str] {
        &["requestFriend", "acceptFriend", "rejectFriend", "removeFriend"]
    }

    fn queries(&self) -> &[&'static str] {
        &[
            "_getAllFriends",
            "_areTheyFriends",
            "_getAllIncomingFriendRequests",
            "_getAllOutgoingFriendRequests",
        ]
    }

    async fn perform(&self, action: &str, input: Record) -> Record {
        let outcome = match action {
            "requestFriend" => pair(&input, "requester", "requestee")
                .map(|(from, to)| self.request_friend(&from, &to)),
            "acceptFriend" => pair(&input, "requester", "requestee")
                .map(|(from, to)| self.answer_request(&from, &to, true)),
            "rejectFriend" => pair(&input, "requester", "requestee")
                .map(|(from, to)| self.answer_request(&from, &to, false)),
            "removeFriend" => {
                pair(&input, "user", "friend").map(|(user, friend)| self.remove_friend(&user, &friend))
            }
            _ => Err(unknown_action(self.name(), action)),
        };
        match outcome {
            Ok(record) | Err(record) => record,
        }
    }

    async fn query(&self, query: &str, input: Record) -> Vec<Record> {
        self.rows(&input, query)
    }
}
