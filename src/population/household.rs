use rustc_hash::FxHashMap;

use crate::disease::DiseaseState;
use crate::population::{Individual, Sex};
use crate::{HouseholdId, PersonId};

/// A household and its cached per-day aggregate metrics.
///
/// The household owns the ordered membership list; members refer back to it
/// by id only. The cached counts are consistent with the membership only
/// immediately after [`Household::compute_metrics`] — they go stale the
/// moment membership or disease states change and must be recomputed before
/// the next read.
#[derive(Debug)]
pub struct Household {
    id: HouseholdId,
    members: Vec<PersonId>,
    num_children: usize,
    num_infectious: usize,
    // One (household age-group, sex) -> count map per infectious state,
    // indexed by `DiseaseState::infectious_index`.
    counts: [FxHashMap<(u8, Sex), usize>; 3],
}

impl Household {
    #[must_use]
    pub fn new(id: HouseholdId) -> Household {
        Household {
            id,
            members: Vec::new(),
            num_children: 0,
            num_infectious: 0,
            counts: [
                FxHashMap::default(),
                FxHashMap::default(),
                FxHashMap::default(),
            ],
        }
    }

    #[must_use]
    pub fn id(&self) -> HouseholdId {
        self.id
    }

    #[must_use]
    pub fn members(&self) -> &[PersonId] {
        &self.members
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub(crate) fn add_member(&mut self, person: PersonId) {
        self.members.push(person);
    }

    pub(crate) fn remove_member(&mut self, person: PersonId) {
        self.members.retain(|&member| member != person);
    }

    #[must_use]
    pub fn has_children(&self) -> bool {
        self.num_children > 0
    }

    /// Number of infectious members counted at the last recomputation.
    #[must_use]
    pub fn num_infectious(&self) -> usize {
        self.num_infectious
    }

    /// Recomputes the cached aggregate metrics from current membership.
    ///
    /// # Panics
    ///
    /// Panics if a member id is missing from the population store; the
    /// membership list and the store are maintained transactionally, so a
    /// dangling id is a programming error.
    pub fn compute_metrics(
        &mut self,
        individuals: &FxHashMap<PersonId, Individual>,
        date: chrono::NaiveDate,
        age_child_limit: u32,
    ) {
        self.num_children = 0;
        self.num_infectious = 0;
        for map in &mut self.counts {
            map.clear();
        }

        for &member in &self.members {
            let individual = individuals
                .get(&member)
                .expect("household member missing from population store");

            if let Some(index) = individual.disease_state().infectious_index() {
                self.num_infectious += 1;
                *self.counts[index]
                    .entry((individual.household_age_group(), individual.sex()))
                    .or_insert(0) += 1;
            }

            if individual.is_child(date, age_child_limit) {
                self.num_children += 1;
            }
        }
    }

    /// Counts of members in `state`, per (household age-group, sex) stratum.
    /// Empty strata are not yielded.
    pub fn strata_for_state(&self, state: DiseaseState) -> impl Iterator<Item = (u8, Sex, usize)> {
        let index = state
            .infectious_index()
            .expect("household strata are cached for infectious states only");
        self.counts[index]
            .iter()
            .map(|(&(age_group, sex), &count)| (age_group, sex, count))
    }
}
