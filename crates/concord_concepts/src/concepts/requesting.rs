//! Requesting: the bridge between a transport and the engine.
//!
//! A transport turns an inbound call into `Requesting.request` with the call's
//! path and parameters, then waits on [`Requesting::await_response`] until
//! some rule dispatches `Requesting.respond` for that request.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use concord_engine::Concept;
use concord_foundation::{Id, Record, record};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::{Store, id_field, missing, unknown_action};

/// `Requesting.request { path, ... } -> { request }`
pub const REQUEST: &str = "Requesting.request";
/// `Requesting.respond { request, ... } -> { request }`
pub const RESPOND: &str = "Requesting.respond";
/// `Requesting._getRequest { request } -> [{ path, ... }]`
pub const GET_REQUEST: &str = "Requesting._getRequest";

/// Configuration for the Requesting concept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestingConfig {
    /// How long [`Requesting::await_response`] waits before giving up.
    pub timeout: Duration,
    /// Keep answered requests (and, in a gateway, their flows) after the
    /// caller has collected the response.
    pub retain_completed: bool,
}

impl Default for RequestingConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retain_completed: false,
        }
    }
}

impl RequestingConfig {
    /// Builder method to set the response timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder method to keep completed requests for later inspection.
    #[must_use]
    pub fn with_retain_completed(mut self, retain: bool) -> Self {
        self.retain_completed = retain;
        self
    }
}

/// Transport-facing failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestingError {
    /// No request with this id was ever made.
    #[error("request not found: {0}")]
    NotFound(Id),

    /// No rule responded within the configured timeout.
    #[error("timed out waiting for a response to request {0}")]
    Timeout(Id),
}

#[derive(Clone, Debug)]
struct PendingRequest {
    input: Record,
    response: Arc<watch::Sender<Option<Record>>>,
}

/// Open and answered requests.
#[derive(Debug, Default)]
pub struct Requesting {
    config: RequestingConfig,
    requests: Store<im::HashMap<Id, PendingRequest>>,
}

impl Requesting {
    /// Creates a concept with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a concept with the given configuration.
    #[must_use]
    pub fn with_config(config: RequestingConfig) -> Self {
        Self {
            config,
            requests: Store::default(),
        }
    }

    /// The configuration this concept was built with.
    #[must_use]
    pub fn config(&self) -> &RequestingConfig {
        &self.config
    }

    /// Number of requests still held, answered or not.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.read().len()
    }

    /// Drops a request and its response. Returns false if it was not held.
    pub fn forget(&self, request: &Id) -> bool {
        let forgotten = self.requests.write().remove(request).is_some();
        if forgotten {
            debug!(request = %request, "request forgotten");
        }
        forgotten
    }

    fn request(&self, input: Record) -> Record {
        let request = Id::generate();
        let response = Arc::new(watch::channel(None).0);
        debug!(request = %request, path = ?input.get("path"), "request received");
        self.requests
            .write()
            .insert(request.clone(), PendingRequest { input, response });
        record! { request: request }
    }

    fn respond(&self, input: &Record) -> Record {
        let Some(request) = id_field(input, "request") else {
            return missing("request");
        };
        let requests = self.requests.read();
        let Some(pending) = requests.get(&request) else {
            return Record::from_error("Request not found");
        };
        let answered = pending.response.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(input.without("request"));
            true
        });
        if !answered {
            return Record::from_error("Request already answered");
        }
        debug!(request = %request, "request answered");
        record! { request: request }
    }

    fn get_request(&self, input: &Record) -> Vec<Record> {
        id_field(input, "request")
            .and_then(|request| {
                self.requests
                    .read()
                    .get(&request)
                    .map(|pending| pending.input.clone())
            })
            .into_iter()
            .collect()
    }

    /// Waits until `request` has been answered and returns the response body.
    ///
    /// Returns immediately if the response is already in.
    ///
    /// # Errors
    /// Returns [`RequestingError::NotFound`] for an unknown request and
    /// [`RequestingError::Timeout`] if no response arrives in time.
    pub async fn await_response(&self, request: &Id) -> Result<Record, RequestingError> {
        let mut receiver = self
            .requests
            .read()
            .get(request)
            .map(|pending| pending.response.subscribe())
            .ok_or_else(|| RequestingError::NotFound(request.clone()))?;

        let waited = tokio::time::timeout(self.config.timeout, async {
            receiver
                .wait_for(Option::is_some)
                .await
                .map(|response| response.clone().unwrap_or_default())
        })
        .await;

        match waited {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(RequestingError::NotFound(request.clone())),
            Err(_) => {
                warn!(request = %request, timeout = ?self.config.timeout, "request timed out");
                Err(RequestingError::Timeout(request.clone()))
            }
        }
    }
}

#[async_trait]
impl Concept for Requesting {
    fn name(&self) -> &'static str {
        "Requesting"
    }

    fn actions(&self) -> &[&'static str] {
        &["request", "respond"]
    }

    fn queries(&self) -> &[&'static str] {
        &["_getRequest"]
    }

    async fn perform(&self, action: &str, input: Record) -> Record {
        match action {
            "request" => self.request(input),
            "respond" => self.respond(&input),
            _ => unknown_action(self.name(), action),
        }
    }

    async fn query(&self, query: &str, input: Record) -> Vec<Record> {
        if query == "_getRequest" {
            self.get_request(&input)
        } else {
            warn!(concept = self.name(), query, "unknown query");
            Vec::new()
        }
    }
}
