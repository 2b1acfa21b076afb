/*!

Population bookkeeping: the individual store, the household index and the
per-day population summary.

Households own their membership lists; individuals carry a non-owning
household id. Add/remove operations keep the two sides consistent
transactionally, and a household disappears when its last member leaves.

*/

mod household;
mod individual;
mod summary;

pub use household::Household;
pub use individual::{Individual, Sex};
pub use summary::PopulationSummary;

use chrono::NaiveDate;
use rustc_hash::FxHashMap;

use crate::random::SimRng;
use crate::{HouseholdId, PersonId, SimError};

pub struct Population {
    individuals: FxHashMap<PersonId, Individual>,
    households: FxHashMap<HouseholdId, Household>,
    num_age_groups_pop: usize,
    num_age_groups_hh: usize,
    age_child_limit: u32,
    base_distribution: Vec<u64>,
}

impl Population {
    #[must_use]
    pub fn new(
        num_age_groups_pop: usize,
        num_age_groups_hh: usize,
        age_child_limit: u32,
    ) -> Population {
        Population {
            individuals: FxHashMap::default(),
            households: FxHashMap::default(),
            num_age_groups_pop,
            num_age_groups_hh,
            age_child_limit,
            base_distribution: Vec::new(),
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.individuals.len()
    }

    #[must_use]
    pub fn num_age_groups_pop(&self) -> usize {
        self.num_age_groups_pop
    }

    #[must_use]
    pub fn num_age_groups_hh(&self) -> usize {
        self.num_age_groups_hh
    }

    #[must_use]
    pub fn age_child_limit(&self) -> u32 {
        self.age_child_limit
    }

    /// Adds an individual and files it under `household`, creating the
    /// household if needed. Duplicate ids are rejected.
    pub fn add(&mut self, individual: Individual, household: HouseholdId) -> Result<(), SimError> {
        let person = individual.id();
        if self.individuals.contains_key(&person) {
            return Err(SimError::ConfigError(format!(
                "individual {person} is already in the population"
            )));
        }
        self.individuals.insert(person, individual);
        self.add_to_household(person, household)
    }

    /// Removes an individual from the population and from its household.
    pub fn remove(&mut self, person: PersonId) -> Result<Individual, SimError> {
        self.remove_from_household(person)?;
        self.individuals
            .remove(&person)
            .ok_or_else(|| SimError::NotFound(format!("individual {person}")))
    }

    /// Files an existing individual under `household`, creating the
    /// household if needed. The individual must not currently belong to a
    /// household.
    pub fn add_to_household(
        &mut self,
        person: PersonId,
        household: HouseholdId,
    ) -> Result<(), SimError> {
        let individual = self
            .individuals
            .get_mut(&person)
            .ok_or_else(|| SimError::NotFound(format!("individual {person}")))?;
        individual.set_household(Some(household));
        self.households
            .entry(household)
            .or_insert_with(|| Household::new(household))
            .add_member(person);
        Ok(())
    }

    /// Detaches an individual from its household, dropping the household if
    /// it becomes empty. A no-op for individuals without a household.
    pub fn remove_from_household(&mut self, person: PersonId) -> Result<(), SimError> {
        let individual = self
            .individuals
            .get_mut(&person)
            .ok_or_else(|| SimError::NotFound(format!("individual {person}")))?;
        let Some(household_id) = individual.household() else {
            return Ok(());
        };
        individual.set_household(None);

        let household = self
            .households
            .get_mut(&household_id)
            .ok_or_else(|| SimError::NotFound(format!("household {household_id}")))?;
        household.remove_member(person);
        if household.size() == 0 {
            self.households.remove(&household_id);
        }
        Ok(())
    }

    pub fn individual(&self, person: PersonId) -> Result<&Individual, SimError> {
        self.individuals
            .get(&person)
            .ok_or_else(|| SimError::NotFound(format!("individual {person}")))
    }

    pub fn individual_mut(&mut self, person: PersonId) -> Result<&mut Individual, SimError> {
        self.individuals
            .get_mut(&person)
            .ok_or_else(|| SimError::NotFound(format!("individual {person}")))
    }

    pub fn household(&self, household: HouseholdId) -> Result<&Household, SimError> {
        self.households
            .get(&household)
            .ok_or_else(|| SimError::NotFound(format!("household {household}")))
    }

    pub fn individuals(&self) -> impl Iterator<Item = &Individual> {
        self.individuals.values()
    }

    pub fn households(&self) -> impl Iterator<Item = &Household> {
        self.households.values()
    }

    /// Samples `amount` distinct individuals without replacement.
    #[must_use]
    pub fn sample(&self, amount: usize, rng: &mut SimRng) -> Vec<PersonId> {
        let ids: Vec<PersonId> = self.individuals.keys().copied().collect();
        rng.sample_indices(ids.len(), amount)
            .into_iter()
            .map(|index| ids[index])
            .collect()
    }

    /// Recomputes every household's cached metrics for `date`, invalidating
    /// the previous day's counts.
    pub fn recompute_household_metrics(&mut self, date: NaiveDate) {
        let age_child_limit = self.age_child_limit;
        let individuals = &self.individuals;
        for household in self.households.values_mut() {
            household.compute_metrics(individuals, date, age_child_limit);
        }
    }

    /// Freezes the current per-age-group totals as the baseline
    /// distribution for size adjustment. Called once, after the initial
    /// population load and before any infections.
    pub fn freeze_base_distribution(&mut self) {
        let mut totals = vec![0u64; self.num_age_groups_pop];
        for individual in self.individuals.values() {
            totals[usize::from(individual.population_age_group()) - 1] += 1;
        }
        self.base_distribution = totals;
    }

    /// Per-age-group totals frozen at the start of the run; empty until
    /// [`Population::freeze_base_distribution`] has been called.
    #[must_use]
    pub fn base_distribution(&self) -> &[u64] {
        &self.base_distribution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn individual(id: u64) -> Individual {
        Individual::new(
            PersonId(id),
            date("1990-05-01"),
            Sex::Female,
            2,
            3,
            "member".to_string(),
            false,
        )
    }

    #[test]
    fn add_files_individual_under_household() {
        let mut population = Population::new(4, 4, 18);
        population.add(individual(1), HouseholdId(10)).unwrap();
        population.add(individual(2), HouseholdId(10)).unwrap();

        assert_eq!(population.size(), 2);
        assert_eq!(population.household(HouseholdId(10)).unwrap().size(), 2);
        assert_eq!(
            population.individual(PersonId(1)).unwrap().household(),
            Some(HouseholdId(10))
        );
    }

    #[test]
    fn duplicate_id_rejected() {
        let mut population = Population::new(4, 4, 18);
        population.add(individual(1), HouseholdId(10)).unwrap();
        assert!(population.add(individual(1), HouseholdId(11)).is_err());
        assert_eq!(population.size(), 1);
    }

    #[test]
    fn remove_drops_empty_household() {
        let mut population = Population::new(4, 4, 18);
        population.add(individual(1), HouseholdId(10)).unwrap();
        population.remove(PersonId(1)).unwrap();

        assert_eq!(population.size(), 0);
        assert!(population.household(HouseholdId(10)).is_err());
    }

    #[test]
    fn household_move_is_transactional() {
        let mut population = Population::new(4, 4, 18);
        population.add(individual(1), HouseholdId(10)).unwrap();
        population.add(individual(2), HouseholdId(10)).unwrap();

        population.remove_from_household(PersonId(1)).unwrap();
        population
            .add_to_household(PersonId(1), HouseholdId(20))
            .unwrap();

        assert_eq!(population.household(HouseholdId(10)).unwrap().size(), 1);
        assert_eq!(population.household(HouseholdId(20)).unwrap().size(), 1);
        assert_eq!(
            population.individual(PersonId(1)).unwrap().household(),
            Some(HouseholdId(20))
        );
    }

    #[test]
    fn missing_lookups_are_not_found() {
        let population = Population::new(4, 4, 18);
        assert!(matches!(
            population.individual(PersonId(99)),
            Err(SimError::NotFound(_))
        ));
        assert!(matches!(
            population.household(HouseholdId(99)),
            Err(SimError::NotFound(_))
        ));
    }

    #[test]
    fn sample_returns_distinct_members() {
        let mut population = Population::new(4, 4, 18);
        for id in 0..50 {
            population.add(individual(id), HouseholdId(id / 5)).unwrap();
        }
        let mut rng = SimRng::from_seed(3);
        let mut sampled = population.sample(10, &mut rng);
        assert_eq!(sampled.len(), 10);
        sampled.sort();
        sampled.dedup();
        assert_eq!(sampled.len(), 10);
    }
}
