//! Synchronization rules.
//!
//! A rule has three parts:
//! - `when`: trigger slots, each an action name with input/outcome patterns
//! - `where`: an optional extension that reshapes the frame set with
//!   query-joins, filters and collects
//! - `then`: effects, each an action name with an input pattern
//!
//! Rules are built with a small builder and are immutable once registered.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use concord_foundation::{Error, ErrorContext, Record, Result};

use crate::concept::ConceptRegistry;
use crate::frame::{Frame, Frames};
use crate::pattern::{ActionPattern, RecordPattern};
use crate::var::Var;

// =============================================================================
// Extension
// =============================================================================

/// The `where` stage of a rule.
///
/// Implemented for any `Fn(Frames) -> impl Future<Output = Result<Frames>>`,
/// so most rules pass an `async move` closure.
#[async_trait]
pub trait Extension: Send + Sync {
    /// Maps the matched frames to the frames that should fire.
    async fn extend(&self, frames: Frames) -> Result<Frames>;
}

#[async_trait]
impl<F, Fut> Extension for F
where
    F: Fn(Frames) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Frames>> + Send + 'static,
{
    async fn extend(&self, frames: Frames) -> Result<Frames> {
        (self)(frames).await
    }
}

/// Builds an extension from shared context and an async function.
///
/// The context is cloned into every call, so the function can take owned
/// query handles and variables into its `async move` block.
///
/// ```
/// use concord_engine::{Frames, Var, rule::with_context};
///
/// let user = Var::new("user");
/// let only_bound = with_context(user, |user, frames: Frames| async move {
///     Ok(frames.filter(|f| f.is_bound(&user)))
/// });
/// # let _ = only_bound;
/// ```
pub fn with_context<C, F, Fut>(context: C, f: F) -> impl Extension
where
    C: Clone + Send + Sync + 'static,
    F: Fn(C, Frames) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Frames>> + Send + 'static,
{
    move |frames: Frames| f(context.clone(), frames)
}

// =============================================================================
// Effect
// =============================================================================

/// One action a rule dispatches per surviving frame.
#[derive(Clone, Debug)]
pub struct Effect {
    /// Fully qualified action name.
    pub action: Arc<str>,
    /// Input pattern, resolved against the frame.
    pub input: RecordPattern,
}

// =============================================================================
// Rule
// =============================================================================

/// A named synchronization rule.
#[derive(Clone)]
pub struct Rule {
    name: Arc<str>,
    when: Vec<ActionPattern>,
    extension: Option<Arc<dyn Extension>>,
    then: Vec<Effect>,
}

impl Rule {
    /// Starts a rule with no slots, no extension and no effects.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            when: Vec::new(),
            extension: None,
            then: Vec::new(),
        }
    }

    /// Adds a trigger slot.
    #[must_use]
    pub fn when(
        mut self,
        action: impl Into<Arc<str>>,
        input: RecordPattern,
        output: RecordPattern,
    ) -> Self {
        self.when.push(ActionPattern::new(action, input, output));
        self
    }

    /// Sets the extension run once per completed match.
    #[must_use]
    pub fn where_(mut self, extension: impl Extension + 'static) -> Self {
        self.extension = Some(Arc::new(extension));
        self
    }

    /// Adds an effect.
    #[must_use]
    pub fn then(mut self, action: impl Into<Arc<str>>, input: RecordPattern) -> Self {
        self.then.push(Effect {
            action: action.into(),
            input,
        });
        self
    }

    /// The rule's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The rule's name as a shared string.
    #[must_use]
    pub fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// Trigger slots in declaration order.
    #[must_use]
    pub fn slots(&self) -> &[ActionPattern] {
        &self.when
    }

    /// Effects in declaration order.
    #[must_use]
    pub fn effects(&self) -> &[Effect] {
        &self.then
    }

    /// Returns true if any slot listens for `action`.
    #[must_use]
    pub fn listens_to(&self, action: &str) -> bool {
        self.when.iter().any(|slot| &*slot.action == action)
    }

    /// Runs the extension, or passes the frames through if there is none.
    ///
    /// # Errors
    /// Propagates errors from the extension.
    pub async fn extend(&self, frames: Frames) -> Result<Frames> {
        match &self.extension {
            Some(extension) => extension.extend(frames).await,
            None => Ok(frames),
        }
    }

    /// Resolves every effect's input against `frame`.
    ///
    /// Either all effects resolve or none do.
    ///
    /// # Errors
    /// Returns an error naming the first unbound variable.
    pub fn resolve_effects(&self, frame: &Frame) -> Result<Vec<(Arc<str>, Record)>> {
        self.then
            .iter()
            .map(|effect| {
                let input = effect.input.substitute(frame).map_err(|e| {
                    e.with_context(
                        ErrorContext::new()
                            .with_rule(self.name())
                            .with_action(&*effect.action),
                    )
                })?;
                Ok((Arc::clone(&effect.action), input))
            })
            .collect()
    }

    /// Checks the rule against a registry.
    ///
    /// # Errors
    /// Returns an error if the rule has no trigger slots, names an action
    /// the registry does not know, or (when it has no extension) an effect
    /// uses a variable no slot binds.
    pub fn validate(&self, registry: &ConceptRegistry) -> Result<()> {
        if self.when.is_empty() {
            return Err(Error::invalid_rule(self.name(), "no trigger patterns"));
        }
        let actions = self
            .when
            .iter()
            .map(|slot| &slot.action)
            .chain(self.then.iter().map(|effect| &effect.action));
        for action in actions {
            registry
                .action(action)
                .map_err(|e| e.with_context(ErrorContext::new().with_rule(self.name())))?;
        }

        if self.extension.is_none() {
            let bound: HashSet<&Var> = self.when.iter().flat_map(|slot| slot.vars()).collect();
            let unbound = self
                .then
                .iter()
                .flat_map(|effect| effect.input.vars())
                .find(|var| !bound.contains(var));
            if let Some(var) = unbound {
                return Err(Error::invalid_rule(
                    self.name(),
                    format!("effect uses {var}, which no trigger binds"),
                ));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("when", &self.when)
            .field("extension", &self.extension.is_some())
            .field("then", &self.then)
            .finish()
    }
}
