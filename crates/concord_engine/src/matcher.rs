//! Incremental trigger matching within one flow.
//!
//! For every rule the matcher keeps the partial matches seen so far: which
//! slots are filled (by occurrence sequence number) and the frame built up
//! by unifying them. Each new occurrence extends the empty partial and every
//! stored partial it fits into. A partial with every slot filled completes,
//! once; the refraction set keys completions by rule and slot assignment.
//!
//! The store per rule is bounded. When it is full the oldest partial is
//! evicted, so occurrences that can never complete do not crowd out newer
//! ones that still can.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tracing::{trace, warn};

use crate::frame::Frame;
use crate::log::Occurrence;
use crate::rule::Rule;

#[derive(Clone, Debug)]
struct PartialMatch {
    /// Sequence number per slot, `None` while unfilled.
    slots: Vec<Option<u64>>,
    frame: Frame,
}

impl PartialMatch {
    fn empty(width: usize) -> Self {
        Self {
            slots: vec![None; width],
            frame: Frame::new(),
        }
    }

    fn filled(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    fn assignment(&self) -> Option<Vec<u64>> {
        self.slots.iter().copied().collect()
    }
}

/// A rule whose trigger pattern was fully satisfied.
#[derive(Clone, Debug)]
pub struct Completion {
    /// Index of the rule in registration order.
    pub rule: usize,
    /// The initial frame produced by unifying every slot.
    pub frame: Frame,
    /// Sequence numbers filling each slot, in slot order.
    pub occurrences: Vec<u64>,
}

/// Why a rule has or has not fired in a flow.
#[derive(Clone, Debug)]
pub struct Explanation {
    /// The rule being explained.
    pub rule: Arc<str>,
    /// Slots filled by the most complete partial match: `(action, seq)`.
    pub satisfied: Vec<(Arc<str>, u64)>,
    /// Actions of the slots still unfilled in that partial.
    pub missing: Vec<Arc<str>>,
    /// How many times the rule has fired in this flow.
    pub fired: usize,
    /// Bindings accumulated by that partial.
    pub bindings: Frame,
}

impl Explanation {
    /// Returns true if the rule has fired at least once.
    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.fired > 0
    }
}

/// Partial-match state for one flow.
#[derive(Debug, Default)]
pub struct ChainMatcher {
    partials: HashMap<usize, VecDeque<PartialMatch>>,
    refracted: HashSet<(usize, Vec<u64>)>,
}

impl ChainMatcher {
    /// Creates an empty matcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one occurrence and returns the completions it causes.
    ///
    /// Completions come out in rule registration order. A rule keeps at most
    /// `max_partials` incomplete partials, evicting its oldest to make room.
    pub fn on_occurrence(
        &mut self,
        rules: &[Arc<Rule>],
        occurrence: &Occurrence,
        max_partials: usize,
    ) -> Vec<Completion> {
        let mut completions = Vec::new();

        for (index, rule) in rules.iter().enumerate() {
            if !rule.listens_to(&occurrence.action) {
                continue;
            }
            let slots = rule.slots();
            let stored = self.partials.entry(index).or_default();

            let seeds = std::iter::once(PartialMatch::empty(slots.len()))
                .chain(stored.iter().cloned())
                .collect::<Vec<_>>();

            let mut grown = Vec::new();
            for seed in &seeds {
                for (position, slot) in slots.iter().enumerate() {
                    if seed.slots[position].is_some() {
                        continue;
                    }
                    let Some(frame) = slot.unify(occurrence, &seed.frame) else {
                        continue;
                    };
                    trace!(
                        rule = rule.name(),
                        slot = position,
                        seq = occurrence.seq,
                        "slot unified"
                    );
                    let mut next = seed.clone();
                    next.slots[position] = Some(occurrence.seq);
                    next.frame = frame;
                    grown.push(next);
                }
            }

            for partial in grown {
                match partial.assignment() {
                    Some(assignment) => {
                        if self.refracted.insert((index, assignment.clone())) {
                            completions.push(Completion {
                                rule: index,
                                frame: partial.frame,
                                occurrences: assignment,
                            });
                        }
                    }
                    None if max_partials == 0 => {}
                    None => {
                        if stored.len() >= max_partials {
                            stored.pop_front();
                            warn!(
                                rule = rule.name(),
                                limit = max_partials,
                                "partial match store full, evicting oldest partial"
                            );
                        }
                        stored.push_back(partial);
                    }
                }
            }
        }

        completions
    }

    /// Explains a rule's progress in this flow.
    #[must_use]
    pub fn explain(&self, index: usize, rule: &Rule) -> Explanation {
        let best = self
            .partials
            .get(&index)
            .and_then(|stored| stored.iter().max_by_key(|p| p.filled()));

        let fired = self.refracted.iter().filter(|(r, _)| *r == index).count();

        let mut satisfied = Vec::new();
        let mut missing = Vec::new();
        for (position, slot) in rule.slots().iter().enumerate() {
            match best.and_then(|p| p.slots[position]) {
                Some(seq) => satisfied.push((Arc::clone(&slot.action), seq)),
                None => missing.push(Arc::clone(&slot.action)),
            }
        }

        Explanation {
            rule: rule.name_arc(),
            satisfied,
            missing,
            fired,
            bindings: best.map(|p| p.frame.clone()).unwrap_or_default(),
        }
    }

    /// Total stored partial matches across all rules.
    #[must_use]
    pub fn partial_count(&self) -> usize {
        self.partials.values().map(VecDeque::len).sum()
    }
}
