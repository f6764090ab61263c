//! The transport-side entry point.
//!
//! A transport (HTTP server, CLI, test) hands the gateway a path and its
//! parameters. The gateway invokes `Requesting.request` in a fresh flow, lets
//! the engine run it to quiescence, and returns whatever a rule responded.

use std::sync::Arc;

use concord_engine::{ConceptRegistry, EngineConfig, FlowId, SyncEngine};
use concord_foundation::{Error, Id, Record, Value};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::concepts::{
    Blocking, Friending, Requesting, RequestingConfig, RequestingError, Scheduling, Sessioning,
    UserAuthentication, requesting,
};
use crate::syncs;

/// Why a call produced no response body.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The engine rejected the request or aborted its flow.
    #[error(transparent)]
    Engine(#[from] Error),

    /// No rule answered the request.
    #[error(transparent)]
    Requesting(#[from] RequestingError),

    /// `Requesting.request` returned an outcome without a request id.
    #[error("request outcome carries no request id: {0}")]
    MissingRequestId(Record),
}

/// A response together with the flow that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    /// The flow opened for the request.
    pub flow: FlowId,
    /// The fields passed to `Requesting.respond`, minus the request id.
    pub body: Record,
}

/// An engine paired with the Requesting concept registered in it.
#[derive(Clone)]
pub struct Gateway {
    engine: Arc<SyncEngine>,
    requesting: Arc<Requesting>,
}

impl Gateway {
    /// Wraps an engine whose registry holds `requesting`.
    #[must_use]
    pub fn new(engine: Arc<SyncEngine>, requesting: Arc<Requesting>) -> Self {
        Self { engine, requesting }
    }

    /// Registers the six reference concepts, loads every reference rule and
    /// builds an engine around them.
    ///
    /// # Errors
    /// Returns an error if a rule fails validation.
    pub fn reference(
        engine_config: EngineConfig,
        requesting_config: RequestingConfig,
    ) -> concord_foundation::Result<Self> {
        let requesting = Arc::new(Requesting::with_config(requesting_config));
        let mut registry = ConceptRegistry::new();
        registry.register(requesting.clone())?;
        registry.register(Arc::new(Sessioning::new()))?;
        registry.register(Arc::new(UserAuthentication::new()))?;
        registry.register(Arc::new(Blocking::new()))?;
        registry.register(Arc::new(Friending::new()))?;
        registry.register(Arc::new(Scheduling::new()))?;

        let rules = syncs::all(&registry)?;
        let engine = SyncEngine::builder(registry)
            .rules(rules)
            .config(engine_config)
            .build()?;
        Ok(Self::new(Arc::new(engine), requesting))
    }

    /// The wrapped engine.
    #[must_use]
    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// The Requesting concept answers arrive through.
    #[must_use]
    pub fn requesting(&self) -> &Requesting {
        &self.requesting
    }

    /// Makes a request for `path` and waits for its response.
    ///
    /// Unless the Requesting concept retains completed requests, the flow and
    /// the request are forgotten once the call returns, whether it succeeded
    /// or not. [`Reply::flow`] then only identifies the flow in logs.
    ///
    /// # Errors
    /// Returns [`GatewayError::Engine`] if the flow fails and
    /// [`GatewayError::Requesting`] if nothing responds in time.
    #[instrument(skip(self, params))]
    pub async fn call(&self, path: &str, params: Record) -> Result<Reply, GatewayError> {
        let flow = self.engine.open_flow()?;
        let mut request = None;
        let body = self.exchange(flow, params.with("path", path), &mut request).await;

        if !self.requesting.config().retain_completed {
            if let Some(request) = &request {
                self.requesting.forget(request);
            }
            self.engine.retire(flow);
        }
        Ok(Reply { flow, body: body? })
    }

    async fn exchange(
        &self,
        flow: FlowId,
        input: Record,
        request: &mut Option<Id>,
    ) -> Result<Record, GatewayError> {
        let invocation = self.engine.invoke_in(flow, requesting::REQUEST, input).await?;
        let id = invocation
            .outcome
            .get("request")
            .and_then(Value::as_id)
            .cloned()
            .ok_or_else(|| GatewayError::MissingRequestId(invocation.outcome.clone()))?;
        *request = Some(id.clone());

        let body = self.requesting.await_response(&id).await?;
        debug!(flow = %flow, request = %id, "request completed");
        Ok(body)
    }
}
