//! Configuration for the synchronization engine.

/// Configuration for the synchronization engine.
///
/// Controls the per-flow kill switch, partial-match retention and frame logging.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum action invocations in one flow before it is aborted.
    pub max_steps_per_flow: usize,

    /// Maximum stored partial matches per rule per flow. The oldest is
    /// evicted when a new one arrives at the cap.
    pub max_partials_per_rule: usize,

    /// Log full frame sets at `debug` when a rule fires.
    pub log_frames: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps_per_flow: 10_000,
            max_partials_per_rule: 4_096,
            log_frames: false,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration for development with frame logging on.
    #[must_use]
    pub fn development() -> Self {
        Self {
            log_frames: true,
            ..Self::default()
        }
    }

    /// Builder method to set the per-flow step limit.
    #[must_use]
    pub fn with_max_steps_per_flow(mut self, steps: usize) -> Self {
        self.max_steps_per_flow = steps;
        self
    }

    /// Builder method to set the partial-match cap.
    #[must_use]
    pub fn with_max_partials_per_rule(mut self, partials: usize) -> Self {
        self.max_partials_per_rule = partials;
        self
    }

    /// Builder method to enable/disable frame logging.
    #[must_use]
    pub fn with_log_frames(mut self, log: bool) -> Self {
        self.log_frames = log;
        self
    }
}
