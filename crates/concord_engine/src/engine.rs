//! The synchronization engine.
//!
//! Invoke → append → match → extend → dispatch → repeat until the flow's
//! work queue is empty. Every action a rule dispatches joins the flow of the
//! occurrence that triggered it, so a whole request/response exchange shares
//! one [`FlowId`].

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use concord_foundation::{Error, ErrorKind, Record, Result, SemanticLimit};
use tracing::{debug, error, instrument, trace, warn};

use crate::concept::{ActionRef, ConceptRegistry};
use crate::config::EngineConfig;
use crate::frame::Frames;
use crate::log::{FiringRecord, FlowId, Occurrence, OccurrenceLog};
use crate::matcher::{ChainMatcher, Explanation};
use crate::rule::Rule;

type Queue = VecDeque<(ActionRef, Record)>;

#[derive(Debug, Default)]
struct FlowState {
    matcher: ChainMatcher,
    steps: usize,
}

/// Result of running an action to quiescence.
#[derive(Clone, Debug)]
pub struct Invocation {
    /// The flow the action ran in.
    pub flow: FlowId,
    /// The outcome of the action itself (not of anything it triggered).
    pub outcome: Record,
}

// =============================================================================
// Builder
// =============================================================================

/// Collects rules and configuration, then validates them into an engine.
pub struct EngineBuilder {
    registry: ConceptRegistry,
    rules: Vec<Rule>,
    config: EngineConfig,
}

impl EngineBuilder {
    /// Adds one rule.
    #[must_use]
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Adds several rules, keeping their order.
    #[must_use]
    pub fn rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Sets the engine configuration.
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates every rule and builds the engine.
    ///
    /// # Errors
    /// Returns an error on duplicate rule names, rules without triggers, or
    /// rules naming unknown actions.
    pub fn build(self) -> Result<SyncEngine> {
        let mut names = HashSet::new();
        for rule in &self.rules {
            if !names.insert(rule.name()) {
                return Err(Error::duplicate_rule(rule.name()));
            }
            rule.validate(&self.registry)?;
        }
        debug!(
            rules = self.rules.len(),
            max_steps = self.config.max_steps_per_flow,
            "engine built"
        );
        Ok(SyncEngine {
            registry: self.registry,
            rules: self.rules.into_iter().map(Arc::new).collect(),
            config: self.config,
            log: RwLock::new(OccurrenceLog::new()),
            flows: Mutex::new(HashMap::new()),
            next_flow: AtomicU64::new(1),
        })
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Matches action occurrences against rules and dispatches their effects.
///
/// Flows are independent: each has its own matcher state behind an async
/// mutex, so one flow is processed strictly in sequence while different
/// flows run concurrently. Share the engine with `Arc`.
pub struct SyncEngine {
    registry: ConceptRegistry,
    rules: Vec<Arc<Rule>>,
    config: EngineConfig,
    log: RwLock<OccurrenceLog>,
    flows: Mutex<HashMap<FlowId, Arc<tokio::sync::Mutex<FlowState>>>>,
    next_flow: AtomicU64,
}

impl SyncEngine {
    /// Starts building an engine over `registry`.
    #[must_use]
    pub fn builder(registry: ConceptRegistry) -> EngineBuilder {
        EngineBuilder {
            registry,
            rules: Vec::new(),
            config: EngineConfig::default(),
        }
    }

    /// The concept registry.
    #[must_use]
    pub fn registry(&self) -> &ConceptRegistry {
        &self.registry
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Registered rules in registration order.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().map(|rule| &**rule)
    }

    /// Starts a new flow with `action` and runs it to quiescence.
    ///
    /// # Errors
    /// Returns an error if `action` is unknown or the flow exceeds its step limit.
    pub async fn invoke(&self, action: &str, input: Record) -> Result<Invocation> {
        self.registry.action(action)?;
        let flow = self.open_flow()?;
        self.invoke_in(flow, action, input).await
    }

    /// Opens an empty flow for later [`invoke_in`](Self::invoke_in) calls.
    ///
    /// A caller that opens its own flow can retire it even when the first
    /// invocation aborts.
    ///
    /// # Errors
    /// Returns an error if the engine's state lock is poisoned.
    pub fn open_flow(&self) -> Result<FlowId> {
        let flow = FlowId(self.next_flow.fetch_add(1, Ordering::Relaxed));
        self.write_log()?.open(flow);
        self.lock_flows()?
            .insert(flow, Arc::new(tokio::sync::Mutex::new(FlowState::default())));
        Ok(flow)
    }

    /// Invokes `action` inside an existing flow and runs it to quiescence.
    ///
    /// The new occurrence can complete rules together with earlier
    /// occurrences of the same flow.
    ///
    /// # Errors
    /// Returns an error if the flow or action is unknown, or the flow exceeds
    /// its step limit.
    #[instrument(skip(self, input))]
    pub async fn invoke_in(&self, flow: FlowId, action: &str, input: Record) -> Result<Invocation> {
        let action = self.registry.action(action)?;
        let state = self.flow_state(flow)?;
        let mut state = state.lock().await;

        let mut queue = Queue::new();
        let outcome = self.step(flow, &mut state, action, input, &mut queue).await?;
        while let Some((action, input)) = queue.pop_front() {
            self.step(flow, &mut state, action, input, &mut queue).await?;
        }
        Ok(Invocation { flow, outcome })
    }

    /// Performs one action, appends it, and enqueues whatever it triggers.
    async fn step(
        &self,
        flow: FlowId,
        state: &mut FlowState,
        action: ActionRef,
        input: Record,
        queue: &mut Queue,
    ) -> Result<Record> {
        state.steps += 1;
        if state.steps > self.config.max_steps_per_flow {
            warn!(flow = %flow, action = action.name(), "step limit reached, aborting flow");
            return Err(Error::limit_exceeded(SemanticLimit::MaxSteps {
                limit: self.config.max_steps_per_flow,
                context: Some(action.name().to_string()),
            }));
        }

        let outcome = action.invoke(input.clone()).await;
        let occurrence = self
            .write_log()?
            .append(flow, Arc::from(action.name()), input, outcome)?;
        debug!(
            flow = %flow,
            action = action.name(),
            seq = occurrence.seq,
            error = occurrence.outcome.error(),
            "action invoked"
        );

        self.react(flow, &mut state.matcher, &occurrence, queue).await?;
        Ok(occurrence.outcome.clone())
    }

    /// Runs every rule completed by `occurrence` and enqueues its effects.
    async fn react(
        &self,
        flow: FlowId,
        matcher: &mut ChainMatcher,
        occurrence: &Occurrence,
        queue: &mut Queue,
    ) -> Result<()> {
        let completions =
            matcher.on_occurrence(&self.rules, occurrence, self.config.max_partials_per_rule);

        for completion in completions {
            let Some(rule) = self.rules.get(completion.rule) else {
                continue;
            };
            debug!(rule = rule.name(), flow = %flow, "rule matched");

            let frames = match rule.extend(Frames::single(completion.frame)).await {
                Ok(frames) => frames,
                Err(err) => {
                    error!(rule = rule.name(), flow = %flow, error = %err, "extension failed");
                    continue;
                }
            };
            if frames.is_empty() {
                trace!(rule = rule.name(), flow = %flow, "no frames after extension");
                continue;
            }

            let mut dispatched = 0;
            for frame in &frames {
                let effects = match rule.resolve_effects(frame) {
                    Ok(effects) => effects,
                    Err(err) => {
                        error!(rule = rule.name(), flow = %flow, error = %err, "skipping frame");
                        continue;
                    }
                };
                for (action, input) in effects {
                    queue.push_back((self.registry.action(&action)?, input));
                    dispatched += 1;
                }
            }

            if self.config.log_frames {
                debug!(rule = rule.name(), frames = ?frames, "frames");
            }
            debug!(
                rule = rule.name(),
                flow = %flow,
                frames = frames.len(),
                dispatched,
                "rule fired"
            );
            self.write_log()?.record_firing(FiringRecord {
                rule: rule.name_arc(),
                flow,
                trigger: completion.occurrences,
                frames,
                dispatched,
            })?;
        }
        Ok(())
    }

    /// Returns a snapshot of a flow's occurrences.
    ///
    /// # Errors
    /// Returns an error if the flow is unknown.
    pub fn history(&self, flow: FlowId) -> Result<Vec<Arc<Occurrence>>> {
        self.read_log()?
            .history(flow)
            .map(<[_]>::to_vec)
            .ok_or_else(|| Error::unknown_flow(flow.0))
    }

    /// Returns a snapshot of a flow's rule firings.
    ///
    /// # Errors
    /// Returns an error if the flow is unknown.
    pub fn firings(&self, flow: FlowId) -> Result<Vec<FiringRecord>> {
        self.read_log()?
            .firings(flow)
            .map(<[_]>::to_vec)
            .ok_or_else(|| Error::unknown_flow(flow.0))
    }

    /// Explains why `rule` has or has not fired in `flow`.
    ///
    /// # Errors
    /// Returns an error if the flow or rule is unknown.
    pub async fn explain(&self, flow: FlowId, rule: &str) -> Result<Explanation> {
        let (index, rule) = self
            .rules
            .iter()
            .enumerate()
            .find(|(_, r)| r.name() == rule)
            .ok_or_else(|| Error::invalid_rule(rule, "no rule with this name"))?;
        let state = self.flow_state(flow)?;
        let state = state.lock().await;
        Ok(state.matcher.explain(index, rule))
    }

    /// Forgets a flow: its occurrences, firings and partial matches.
    ///
    /// Returns false if the flow was not known.
    pub fn retire(&self, flow: FlowId) -> bool {
        let dropped_state = self
            .flows
            .lock()
            .map(|mut flows| flows.remove(&flow).is_some())
            .unwrap_or(false);
        let dropped_log = self
            .log
            .write()
            .map(|mut log| log.retire(flow))
            .unwrap_or(false);
        debug!(flow = %flow, "flow retired");
        dropped_state || dropped_log
    }

    /// Number of flows currently tracked.
    #[must_use]
    pub fn flow_count(&self) -> usize {
        self.read_log().map(|log| log.flow_count()).unwrap_or(0)
    }

    fn flow_state(&self, flow: FlowId) -> Result<Arc<tokio::sync::Mutex<FlowState>>> {
        self.lock_flows()?
            .get(&flow)
            .cloned()
            .ok_or_else(|| Error::unknown_flow(flow.0))
    }

    fn lock_flows(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<FlowId, Arc<tokio::sync::Mutex<FlowState>>>>> {
        self.flows
            .lock()
            .map_err(|_| Error::new(ErrorKind::Internal("flow table poisoned".into())))
    }

    fn read_log(&self) -> Result<RwLockReadGuard<'_, OccurrenceLog>> {
        self.log
            .read()
            .map_err(|_| Error::new(ErrorKind::Internal("occurrence log poisoned".into())))
    }

    fn write_log(&self) -> Result<RwLockWriteGuard<'_, OccurrenceLog>> {
        self.log
            .write()
            .map_err(|_| Error::new(ErrorKind::Internal("occurrence log poisoned".into())))
    }
}
