//! Error types for the Concord system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.
//! Domain failures reported by concepts are *not* errors; they are records
//! with an `error` field. This type covers programming errors in rule
//! registration and engine-level limits.

use std::fmt;

use thiserror::Error;

/// The main error type for Concord operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates an unknown action error.
    #[must_use]
    pub fn unknown_action(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownAction(name.into()))
    }

    /// Creates an unknown query error.
    #[must_use]
    pub fn unknown_query(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownQuery(name.into()))
    }

    /// Creates a duplicate concept error.
    #[must_use]
    pub fn duplicate_concept(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateConcept(name.into()))
    }

    /// Creates a duplicate rule error.
    #[must_use]
    pub fn duplicate_rule(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateRule(name.into()))
    }

    /// Creates an invalid rule error.
    #[must_use]
    pub fn invalid_rule(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRule {
            rule: rule.into(),
            reason: reason.into(),
        })
    }

    /// Creates an unbound variable error.
    #[must_use]
    pub fn unbound_variable(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnboundVariable(name.into()))
    }

    /// Creates an unknown flow error.
    #[must_use]
    pub fn unknown_flow(flow: u64) -> Self {
        Self::new(ErrorKind::UnknownFlow(flow))
    }

    /// Creates a semantic limit exceeded error.
    #[must_use]
    pub fn limit_exceeded(limit: SemanticLimit) -> Self {
        Self::new(ErrorKind::LimitExceeded(limit))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// An action name was not registered by any concept.
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// A query name was not registered by any concept.
    #[error("unknown query: {0}")]
    UnknownQuery(String),

    /// Two concepts were registered under the same name.
    #[error("duplicate concept: {0}")]
    DuplicateConcept(String),

    /// Two rules were registered under the same name.
    #[error("duplicate rule: {0}")]
    DuplicateRule(String),

    /// A rule declaration is malformed.
    #[error("invalid rule {rule}: {reason}")]
    InvalidRule {
        /// The offending rule.
        rule: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A pattern referenced a variable with no binding in the current frame.
    #[error("unbound variable: {0}")]
    UnboundVariable(String),

    /// No flow with this id is known to the engine.
    #[error("unknown flow: {0}")]
    UnknownFlow(u64),

    /// Semantic limit exceeded (kill switch triggered).
    #[error("limit exceeded: {0}")]
    LimitExceeded(SemanticLimit),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Semantic limits (kill switches) that can be exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticLimit {
    /// Maximum action invocations within one flow exceeded.
    MaxSteps {
        /// The configured limit.
        limit: usize,
        /// The action that crossed the limit.
        context: Option<String>,
    },
}

impl fmt::Display for SemanticLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxSteps { limit, context } => {
                write!(f, "max steps per flow ({limit}) exceeded")?;
                if let Some(ctx) = context {
                    write!(f, ": {ctx}")?;
                }
                Ok(())
            }
        }
    }
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Rule being evaluated.
    pub rule: Option<String>,
    /// Action being matched or dispatched.
    pub action: Option<String>,
    /// Chain of rule/action names leading here.
    pub stack: Vec<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rule name.
    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    /// Sets the action name.
    #[must_use]
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Adds a stack frame.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack.push(frame.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(rule) = &self.rule {
            write!(f, "in rule {rule}")?;
        }
        if let Some(action) = &self.action {
            write!(f, " at {action}")?;
        }
        if !self.stack.is_empty() {
            writeln!(f)?;
            for frame in &self.stack {
                writeln!(f, "  via {frame}")?;
            }
        }
        Ok(())
    }
}
