//! Helpers for driving requests through a reference gateway.

use std::time::Duration;

use concord_concepts::Gateway;
use concord_concepts::concepts::RequestingConfig;
use concord_engine::EngineConfig;
use concord_foundation::{Id, Record, Value, record};

pub fn gateway() -> Gateway {
    gateway_with(RequestingConfig::default())
}

/// A gateway that keeps every flow so tests can read its history.
pub fn retaining_gateway() -> Gateway {
    gateway_with(RequestingConfig::default().with_retain_completed(true))
}

fn gateway_with(requesting: RequestingConfig) -> Gateway {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    Gateway::reference(
        EngineConfig::development(),
        requesting.with_timeout(Duration::from_millis(250)),
    )
    .unwrap()
}

/// Makes a request and returns the response body.
pub async fn call(gateway: &Gateway, path: &str, params: Record) -> Record {
    gateway.call(path, params).await.unwrap().body
}

pub fn id(body: &Record, field: &str) -> Id {
    body.get(field)
        .and_then(Value::as_id)
        .cloned()
        .unwrap_or_else(|| panic!("no id in {field}: {body}"))
}

/// Registers `username` (password `pw-<username>`) and returns the user id.
pub async fn register(gateway: &Gateway, username: &str) -> Id {
    let body = call(
        gateway,
        "/UserAuthentication/register",
        record! { username: username, password: format!("pw-{username}") },
    )
    .await;
    id(&body, "user")
}

/// Logs `username` in and returns the session id.
pub async fn login(gateway: &Gateway, username: &str) -> Id {
    let body = call(
        gateway,
        "/login",
        record! { username: username, password: format!("pw-{username}") },
    )
    .await;
    id(&body, "session")
}

/// Registers and logs in `username`, returning `(user, session)`.
pub async fn sign_up(gateway: &Gateway, username: &str) -> (Id, Id) {
    let user = register(gateway, username).await;
    let session = login(gateway, username).await;
    (user, session)
}
