//! UserAuthentication: username/password accounts.

use std::sync::Arc;

use async_trait::async_trait;
use concord_engine::Concept;
use concord_foundation::{Id, Record, record};
use tracing::{debug, warn};

use super::{Store, id_field, missing, str_field, unknown_action};

/// `UserAuthentication.register { username, password } -> { user }`
pub const REGISTER: &str = "UserAuthentication.register";
/// `UserAuthentication.login { username, password } -> { user }`
pub const LOGIN: &str = "UserAuthentication.login";
/// `UserAuthentication._getUsername { user } -> [{ username }]`
pub const GET_USERNAME: &str = "UserAuthentication._getUsername";
/// `UserAuthentication._getUserByUsername { username } -> [{ user }]`
pub const GET_USER_BY_USERNAME: &str = "UserAuthentication._getUserByUsername";
/// `UserAuthentication._getAllUsers {} -> [{ user, username }]`
pub const GET_ALL_USERS: &str = "UserAuthentication._getAllUsers";

#[derive(Clone, Debug)]
struct Account {
    username: Arc<str>,
    password: Arc<str>,
}

#[derive(Clone, Debug, Default)]
struct Accounts {
    by_id: im::HashMap<Id, Account>,
    by_username: im::OrdMap<Arc<str>, Id>,
}

/// Registered accounts.
#[derive(Debug, Default)]
pub struct UserAuthentication {
    accounts: Store<Accounts>,
}

impl UserAuthentication {
    /// Creates an empty concept.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, input: &Record) -> Record {
        let Some(username) = str_field(input, "username") else {
            return missing("username");
        };
        let Some(password) = str_field(input, "password") else {
            return missing("password");
        };

        let mut accounts = self.accounts.write();
        if accounts.by_username.contains_key(username) {
            return Record::from_error("Username already taken");
        }
        let user = Id::generate();
        let username: Arc<str> = username.into();
        accounts.by_username.insert(Arc::clone(&username), user.clone());
        accounts.by_id.insert(
            user.clone(),
            Account {
                username,
                password: password.into(),
            },
        );
        debug!(user = %user, "user registered");
        record! { user: user }
    }

    fn login(&self, input: &Record) -> Record {
        let (Some(username), Some(password)) =
            (str_field(input, "username"), str_field(input, "password"))
        else {
            return Record::from_error("Invalid username or password");
        };

        let accounts = self.accounts.read();
        let found = accounts
            .by_username
            .get(username)
            .and_then(|user| accounts.by_id.get(user).map(|account| (user, account)));
        match found {
            Some((user, account)) if &*account.password == password => {
                record! { user: user }
            }
            _ => Record::from_error("Invalid username or password"),
        }
    }

    fn get_username(&self, input: &Record) -> Vec<Record> {
        let Some(user) = id_field(input, "user") else {
            return Vec::new();
        };
        self.accounts
            .read()
            .by_id
            .get(&user)
            .map(|account| vec![record! { username: Arc::clone(&account.username) }])
            .unwrap_or_default()
    }

    fn get_user_by_username(&self, input: &Record) -> Vec<Record> {
        let Some(username) = str_field(input, "username") else {
            return Vec::new();
        };
        self.accounts
            .read()
            .by_username
            .get(username)
            .map(|user| vec![record! { user: user }])
            .unwrap_or_default()
    }

    fn get_all_users(&self) -> Vec<Record> {
        self.accounts
            .read()
            .by_username
            .iter()
            .map(|(username, user)| record! { user: user, username: Arc::clone(username) })
            .collect()
    }
}

#[async_trait]
impl Concept for UserAuthentication {
    fn name(&self) -> &'static str {
        "UserAuthentication"
    }

    fn actions(&self) -> &[&'static str] {
        &["register", "login"]
    }

    fn queries(&self) -> &[&'static str] {
        &["_getUsername", "_getUserByUsername", "_getAllUsers"]
    }

    async fn perform(&self, action: &str, input: Record) -> Record {
        match action {
            "register" => self.register(&input),
            "login" => self.login(&input),
            _ => unknown_action(self.name(), action),
        }
    }

    async fn query(&self, query: &str, input: Record) -> Vec<Record> {
        match query {
            "_getUsername" => self.get_username(&input),
            "_getUserByUsername" => self.get_user_by_username(&input),
            "_getAllUsers" => self.get_all_users(),
            _ => {
                warn!(concept = self.name(), query, "unknown query");
                Vec::new()
            }
        }
    }
}
