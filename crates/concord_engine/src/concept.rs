//! Concepts and the registry that names their actions and queries.
//!
//! A concept is an independent unit of state. It exposes actions, which take
//! an input record and return an outcome record, and queries, which return
//! zero or more rows. Concepts never call one another; rules do the wiring.
//!
//! Every member is addressed by its fully qualified name, `Concept.member`.
//! Queries start with an underscore by convention.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use concord_foundation::{Error, Record, Result};
use tracing::debug;

/// A self-contained unit of state exposing actions and queries.
///
/// Domain failures are reported through the outcome record (an `error`
/// field), never by panicking.
#[async_trait]
pub trait Concept: Send + Sync {
    /// The concept's name, used as the prefix of its members.
    fn name(&self) -> &'static str;

    /// Bare names of the actions this concept performs.
    fn actions(&self) -> &[&'static str];

    /// Bare names of the queries this concept answers.
    fn queries(&self) -> &[&'static str];

    /// Performs an action. `action` is the bare name.
    async fn perform(&self, action: &str, input: Record) -> Record;

    /// Answers a query. `query` is the bare name.
    async fn query(&self, query: &str, input: Record) -> Vec<Record>;
}

/// Splits `Concept.member` into its parts.
fn split_name(name: &str) -> Option<(&str, &str)> {
    name.split_once('.')
}

/// Directory of registered concepts.
#[derive(Clone, Default)]
pub struct ConceptRegistry {
    concepts: HashMap<&'static str, Arc<dyn Concept>>,
}

impl ConceptRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a concept.
    ///
    /// # Errors
    /// Returns an error if a concept with the same name is already registered.
    pub fn register(&mut self, concept: Arc<dyn Concept>) -> Result<()> {
        let name = concept.name();
        if self.concepts.contains_key(name) {
            return Err(Error::duplicate_concept(name));
        }
        debug!(
            concept = name,
            actions = concept.actions().len(),
            queries = concept.queries().len(),
            "registered concept"
        );
        self.concepts.insert(name, concept);
        Ok(())
    }

    /// Looks up a concept by name.
    #[must_use]
    pub fn concept(&self, name: &str) -> Option<&Arc<dyn Concept>> {
        self.concepts.get(name)
    }

    /// Iterates the registered concept names.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.concepts.keys().copied()
    }

    /// Returns true if `name` is a registered action.
    #[must_use]
    pub fn has_action(&self, name: &str) -> bool {
        self.action(name).is_ok()
    }

    /// Resolves a fully qualified action name.
    ///
    /// # Errors
    /// Returns an error if no registered concept declares the action.
    pub fn action(&self, name: &str) -> Result<ActionRef> {
        let resolved = split_name(name).and_then(|(concept, member)| {
            let concept = self.concepts.get(concept)?;
            let member = concept.actions().iter().copied().find(|a| *a == member)?;
            Some(ActionRef {
                name: Arc::from(name),
                member,
                concept: Arc::clone(concept),
            })
        });
        resolved.ok_or_else(|| Error::unknown_action(name))
    }

    /// Resolves a fully qualified query name.
    ///
    /// # Errors
    /// Returns an error if no registered concept declares the query.
    pub fn query(&self, name: &str) -> Result<QueryRef> {
        let resolved = split_name(name).and_then(|(concept, member)| {
            let concept = self.concepts.get(concept)?;
            let member = concept.queries().iter().copied().find(|q| *q == member)?;
            Some(QueryRef {
                name: Arc::from(name),
                member,
                concept: Arc::clone(concept),
            })
        });
        resolved.ok_or_else(|| Error::unknown_query(name))
    }
}

impl fmt::Debug for ConceptRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("ConceptRegistry")
            .field("concepts", &names)
            .finish()
    }
}

/// A resolved handle to one action.
#[derive(Clone)]
pub struct ActionRef {
    name: Arc<str>,
    member: &'static str,
    concept: Arc<dyn Concept>,
}

impl ActionRef {
    /// Fully qualified name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Performs the action.
    pub async fn invoke(&self, input: Record) -> Record {
        self.concept.perform(self.member, input).await
    }
}

impl fmt::Debug for ActionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActionRef({})", self.name)
    }
}

/// A resolved handle to one query.
#[derive(Clone)]
pub struct QueryRef {
    name: Arc<str>,
    member: &'static str,
    concept: Arc<dyn Concept>,
}

impl QueryRef {
    /// Fully qualified name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the query.
    pub async fn call(&self, input: Record) -> Vec<Record> {
        self.concept.query(self.member, input).await
    }
}

impl fmt::Debug for QueryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QueryRef({})", self.name)
    }
}
