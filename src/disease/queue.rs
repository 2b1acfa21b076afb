use chrono::NaiveDate;
use rustc_hash::FxHashMap;

use crate::PersonId;
use crate::disease::DiseaseState;

/// A pending disease-state transition: who changes state and into what.
/// The scheduled date is the queue bucket the transition lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTransition {
    pub person: PersonId,
    pub state: DiseaseState,
}

/// Date-bucketed queue of pending state transitions.
///
/// `put` appends under a date bucket in O(1); `drain` removes exactly one
/// bucket and yields its elements once. Only exact-date buckets are ever
/// visited, so insertion must never target a date the driving loop has
/// already passed — the driver rounds fractional offsets to whole days and
/// clamps them to at least one day ahead. Not safe for concurrent access.
#[derive(Debug, Default)]
pub struct TransitionQueue {
    buckets: FxHashMap<NaiveDate, Vec<PendingTransition>>,
    live: usize,
}

impl TransitionQueue {
    #[must_use]
    pub fn new() -> TransitionQueue {
        TransitionQueue::default()
    }

    /// Schedules `transition` for `date`.
    pub fn put(&mut self, date: NaiveDate, transition: PendingTransition) {
        self.live += 1;
        self.buckets.entry(date).or_default().push(transition);
    }

    /// Removes the bucket for `date` and yields its elements in insertion
    /// order. Draining a date with no scheduled events yields nothing and
    /// leaves the live count untouched.
    pub fn drain(&mut self, date: NaiveDate) -> impl Iterator<Item = PendingTransition> + use<> {
        let bucket = self.buckets.remove(&date).unwrap_or_default();
        self.live -= bucket.len();
        bucket.into_iter()
    }

    /// Current number of scheduled transitions, O(1).
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}
