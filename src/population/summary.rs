use crate::disease::DiseaseState;
use crate::population::Population;

/// Immutable per-day snapshot of disease-state counts by population
/// age-group.
///
/// Taken once per simulated day, after the transition queue has been
/// drained, and used both for reporting and as the population-level
/// infection-pressure input. The baseline distribution frozen at the start
/// of the run rides along so the transmission model can renormalize for
/// population drift.
#[derive(Debug, Clone)]
pub struct PopulationSummary {
    totals: Vec<u64>,
    counts: Vec<[u64; DiseaseState::COUNT]>,
    baseline: Vec<u64>,
}

impl PopulationSummary {
    #[must_use]
    pub fn new(population: &Population) -> PopulationSummary {
        let num_age_groups = population.num_age_groups_pop();
        let mut totals = vec![0u64; num_age_groups];
        let mut counts = vec![[0u64; DiseaseState::COUNT]; num_age_groups];

        for individual in population.individuals() {
            let index = usize::from(individual.population_age_group()) - 1;
            totals[index] += 1;
            counts[index][individual.disease_state().index()] += 1;
        }

        PopulationSummary {
            totals,
            counts,
            baseline: population.base_distribution().to_vec(),
        }
    }

    #[must_use]
    pub fn num_age_groups(&self) -> usize {
        self.totals.len()
    }

    /// Count of individuals in `state` within the 1-based age group.
    #[must_use]
    pub fn count(&self, state: DiseaseState, age_group: u8) -> u64 {
        self.counts[usize::from(age_group) - 1][state.index()]
    }

    /// Non-empty (1-based age group, count) pairs for `state`, in ascending
    /// age-group order.
    #[allow(clippy::cast_possible_truncation)]
    pub fn state_counts(&self, state: DiseaseState) -> impl Iterator<Item = (u8, u64)> {
        self.counts
            .iter()
            .enumerate()
            .filter_map(move |(index, row)| {
                let count = row[state.index()];
                (count > 0).then(|| (index as u8 + 1, count))
            })
    }

    #[must_use]
    pub fn state_total(&self, state: DiseaseState) -> u64 {
        self.counts.iter().map(|row| row[state.index()]).sum()
    }

    #[must_use]
    pub fn total(&self, age_group: u8) -> u64 {
        self.totals[usize::from(age_group) - 1]
    }

    #[must_use]
    pub fn total_population(&self) -> u64 {
        self.totals.iter().sum()
    }

    /// Size-adjustment factor for the 1-based age group: the baseline count
    /// divided by the current count, floored at one to avoid division by
    /// zero. Without a frozen baseline the factor is 1.
    #[must_use]
    pub fn adjustment(&self, age_group: u8) -> f64 {
        let index = usize::from(age_group) - 1;
        match self.baseline.get(index) {
            #[allow(clippy::cast_precision_loss)]
            Some(&baseline) => baseline as f64 / self.totals[index].max(1) as f64,
            None => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::{Individual, Sex};
    use crate::{HouseholdId, PersonId};
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn populate(states: &[(u64, u8, DiseaseState)]) -> Population {
        let mut population = Population::new(4, 2, 18);
        for &(id, age_group, state) in states {
            let individual = Individual::new(
                PersonId(id),
                date("1980-01-01"),
                Sex::Male,
                age_group,
                1,
                "member".to_string(),
                false,
            );
            population
                .add(individual, HouseholdId(id))
                .expect("fresh id");
            population
                .individual_mut(PersonId(id))
                .unwrap()
                .set_disease_state(state);
        }
        population
    }

    #[test]
    fn totals_match_population_size() {
        let population = populate(&[
            (1, 1, DiseaseState::Susceptible),
            (2, 1, DiseaseState::Infected),
            (3, 2, DiseaseState::Recovered),
            (4, 4, DiseaseState::Died),
        ]);
        let summary = PopulationSummary::new(&population);

        assert_eq!(summary.total_population(), population.size() as u64);
        let per_group: u64 = (1..=4).map(|ag| summary.total(ag)).sum();
        assert_eq!(per_group, population.size() as u64);
    }

    #[test]
    fn state_counts_skip_empty_groups() {
        let population = populate(&[
            (1, 1, DiseaseState::Symptomatic),
            (2, 3, DiseaseState::Symptomatic),
            (3, 3, DiseaseState::Symptomatic),
        ]);
        let summary = PopulationSummary::new(&population);

        let counts: Vec<_> = summary.state_counts(DiseaseState::Symptomatic).collect();
        assert_eq!(counts, vec![(1, 1), (3, 2)]);
        assert_eq!(summary.state_total(DiseaseState::Symptomatic), 3);
        assert_eq!(summary.count(DiseaseState::Symptomatic, 2), 0);
    }

    #[test]
    fn adjustment_tracks_population_drift() {
        let mut population = populate(&[
            (1, 1, DiseaseState::Susceptible),
            (2, 1, DiseaseState::Susceptible),
        ]);
        population.freeze_base_distribution();

        // Baseline 2 in group 1; removing one individual doubles the factor.
        population.remove(PersonId(2)).unwrap();
        let summary = PopulationSummary::new(&population);
        assert!((summary.adjustment(1) - 2.0).abs() < 1e-12);

        // Empty group: the divisor floors at one.
        population.remove(PersonId(1)).unwrap();
        let summary = PopulationSummary::new(&population);
        assert!((summary.adjustment(1) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn adjustment_without_baseline_is_neutral() {
        let population = populate(&[(1, 2, DiseaseState::Susceptible)]);
        let summary = PopulationSummary::new(&population);
        assert!((summary.adjustment(2) - 1.0).abs() < f64::EPSILON);
    }
}
