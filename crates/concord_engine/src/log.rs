//! The per-flow occurrence log.
//!
//! Every completed action is appended here with its input and outcome,
//! tagged with the flow that caused it. Rule firings are recorded alongside
//! so a flow's history can be replayed or explained after the fact.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use concord_foundation::{Error, Record, Result};

use crate::frame::Frames;

/// Identifies one causal chain of actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowId(pub u64);

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "flow#{}", self.0)
    }
}

/// One completed action invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct Occurrence {
    /// The flow this invocation belongs to.
    pub flow: FlowId,
    /// Position in the global log; strictly increasing.
    pub seq: u64,
    /// Fully qualified action name.
    pub action: Arc<str>,
    /// The input record the action was called with.
    pub input: Record,
    /// The record the action returned.
    pub outcome: Record,
}

impl Occurrence {
    /// Returns true if the outcome carries an `error` field.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.outcome.is_error()
    }
}

/// One firing of a rule.
#[derive(Clone, Debug)]
pub struct FiringRecord {
    /// The rule that fired.
    pub rule: Arc<str>,
    /// The flow it fired in.
    pub flow: FlowId,
    /// Sequence numbers of the occurrences that completed the match, in slot order.
    pub trigger: Vec<u64>,
    /// Frames produced by the rule's extension.
    pub frames: Frames,
    /// Number of effects dispatched.
    pub dispatched: usize,
}

#[derive(Debug, Default)]
struct ChainLog {
    occurrences: Vec<Arc<Occurrence>>,
    firings: Vec<FiringRecord>,
}

/// Append-only log of occurrences grouped by flow.
#[derive(Debug, Default)]
pub struct OccurrenceLog {
    chains: HashMap<FlowId, ChainLog>,
    next_seq: u64,
}

impl OccurrenceLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new, empty chain for `flow`.
    pub fn open(&mut self, flow: FlowId) {
        self.chains.entry(flow).or_default();
    }

    /// Returns true if `flow` is known.
    #[must_use]
    pub fn contains(&self, flow: FlowId) -> bool {
        self.chains.contains_key(&flow)
    }

    /// Appends an occurrence and returns it with its assigned sequence number.
    ///
    /// # Errors
    /// Returns an error if the flow was never opened or has been retired.
    pub fn append(
        &mut self,
        flow: FlowId,
        action: Arc<str>,
        input: Record,
        outcome: Record,
    ) -> Result<Arc<Occurrence>> {
        let chain = self
            .chains
            .get_mut(&flow)
            .ok_or_else(|| Error::unknown_flow(flow.0))?;
        let occurrence = Arc::new(Occurrence {
            flow,
            seq: self.next_seq,
            action,
            input,
            outcome,
        });
        self.next_seq += 1;
        chain.occurrences.push(Arc::clone(&occurrence));
        Ok(occurrence)
    }

    /// Records a rule firing.
    ///
    /// # Errors
    /// Returns an error if the flow is unknown.
    pub fn record_firing(&mut self, firing: FiringRecord) -> Result<()> {
        let chain = self
            .chains
            .get_mut(&firing.flow)
            .ok_or_else(|| Error::unknown_flow(firing.flow.0))?;
        chain.firings.push(firing);
        Ok(())
    }

    /// Returns the occurrences of a flow in append order.
    #[must_use]
    pub fn history(&self, flow: FlowId) -> Option<&[Arc<Occurrence>]> {
        self.chains.get(&flow).map(|c| c.occurrences.as_slice())
    }

    /// Returns the rule firings of a flow in firing order.
    #[must_use]
    pub fn firings(&self, flow: FlowId) -> Option<&[FiringRecord]> {
        self.chains.get(&flow).map(|c| c.firings.as_slice())
    }

    /// Drops a flow and everything recorded for it.
    pub fn retire(&mut self, flow: FlowId) -> bool {
        self.chains.remove(&flow).is_some()
    }

    /// Number of live flows.
    #[must_use]
    pub fn flow_count(&self) -> usize {
        self.chains.len()
    }
}
