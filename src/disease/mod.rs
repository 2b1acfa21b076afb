/*!

The disease-progression core: the state machine, the transmission model,
the date-bucketed transition queue and the daily driver that ties them
together.

The daily step is strictly ordered: drain due transitions, snapshot the
population, recompute household metrics, evaluate transmission for every
susceptible individual, then commit the new infections through the same
transition mechanism. Reordering any of these changes the semantics — a
newly recovered individual, for example, must not be eligible for infection
evaluation on the same day.

*/

mod queue;
mod state;
mod state_machine;
mod transmission;

pub use queue::{PendingTransition, TransitionQueue};
pub use state::DiseaseState;
pub use state_machine::{DiseaseFsm, mortality_probability, symptomatic_probability};
pub use transmission::{
    HouseholdContactMatrix, PopulationContactMatrix, Transmission, TransmissionOutcome,
};

use chrono::{Days, NaiveDate};

use crate::config::DiseaseConfig;
use crate::population::{Population, PopulationSummary};
use crate::random::SimRng;
use crate::report::{Reporter, TransmissionEvent};
use crate::{PersonId, SimError};

/// Rounds a fractional day offset to its scheduling date: nearest whole day,
/// at least one day ahead, so the target bucket is never one the loop has
/// already passed.
fn schedule_date(date: NaiveDate, days: f64) -> NaiveDate {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let offset = days.round().max(1.0) as u64;
    date + Days::new(offset)
}

pub struct Disease {
    fsm: DiseaseFsm,
    transmission: Transmission,
    queue: TransitionQueue,
    remove_deceased: bool,
}

impl Disease {
    pub fn new(
        config: &DiseaseConfig,
        num_age_groups_pop: usize,
        num_age_groups_hh: usize,
    ) -> Result<Disease, SimError> {
        Ok(Disease {
            fsm: DiseaseFsm::new(&config.pre_symptomatic)?,
            transmission: Transmission::new(config, num_age_groups_pop, num_age_groups_hh)?,
            queue: TransitionQueue::new(),
            remove_deceased: config.remove_deceased_from_household,
        })
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        fsm: DiseaseFsm,
        transmission: Transmission,
        remove_deceased: bool,
    ) -> Disease {
        Disease {
            fsm,
            transmission,
            queue: TransitionQueue::new(),
            remove_deceased,
        }
    }

    /// Number of pending transitions; zero means no non-terminal infected
    /// individuals remain.
    #[must_use]
    pub fn pending_transitions(&self) -> usize {
        self.queue.len()
    }

    /// Runs one simulated day of the disease model and reports whether
    /// infections are still outstanding afterwards.
    pub fn apply_daily_step(
        &mut self,
        population: &mut Population,
        reporter: &mut Reporter,
        date: NaiveDate,
        rng: &mut SimRng,
    ) -> Result<bool, SimError> {
        // 1. Due transitions for today.
        for PendingTransition { person, state } in self.queue.drain(date) {
            self.apply_transition(population, reporter, person, state, date, rng)?;
        }

        // 2. Post-drain snapshot.
        let summary = PopulationSummary::new(population);
        reporter.daily_summary(date, &summary);

        // 3. Fresh household metrics for today.
        population.recompute_household_metrics(date);

        // 4. Transmission for every susceptible individual.
        let age_child_limit = population.age_child_limit();
        let mut infections: Vec<TransmissionEvent> = Vec::new();
        for household in population.households() {
            for &member in household.members() {
                let individual = population.individual(member)?;
                if individual.disease_state() != DiseaseState::Susceptible {
                    continue;
                }
                let outcome = self.transmission.evaluate(
                    individual,
                    household,
                    &summary,
                    date,
                    age_child_limit,
                    rng,
                );
                if outcome.occurred {
                    infections.push(TransmissionEvent {
                        person: member,
                        age: individual.age(date),
                        sex: individual.sex(),
                        household: household.id(),
                        household_size: household.size(),
                        infectious_members: household.num_infectious(),
                        household_escape: outcome.household_escape,
                        population_escape: outcome.population_escape,
                    });
                }
            }
        }

        // Commit the collected infections.
        for event in infections {
            reporter.record_transmission(date, &event);
            self.infect(population, reporter, event.person, date, rng)?;
        }

        Ok(!self.queue.is_empty())
    }

    /// Moves a susceptible individual into the state machine's entry state
    /// and schedules its first sampled transition. Used both by the
    /// transmission step and by external influx.
    pub fn infect(
        &mut self,
        population: &mut Population,
        reporter: &mut Reporter,
        person: PersonId,
        date: NaiveDate,
        rng: &mut SimRng,
    ) -> Result<(), SimError> {
        self.apply_transition(population, reporter, person, DiseaseFsm::entry_state(), date, rng)
    }

    /// Applies one state change: updates the individual, logs it, and —
    /// unless the new state is terminal — samples and enqueues the
    /// successor transition.
    fn apply_transition(
        &mut self,
        population: &mut Population,
        reporter: &mut Reporter,
        person: PersonId,
        state: DiseaseState,
        date: NaiveDate,
        rng: &mut SimRng,
    ) -> Result<(), SimError> {
        let individual = population.individual_mut(person)?;
        individual.set_disease_state(state);
        if !state.is_terminal() {
            let (next, days) = self.fsm.next_state(individual, date, rng);
            self.queue.put(
                schedule_date(date, days),
                PendingTransition {
                    person,
                    state: next,
                },
            );
        }

        reporter.record_state_change(date, person, state);

        if state == DiseaseState::Died && self.remove_deceased {
            population.remove_from_household(person)?;
        }
        Ok(())
    }
}
