/*!

The disease-progression state machine.

Each non-terminal, non-susceptible state has a sampling rule that, given the
individual and the current date, produces the successor state and the number
of days until it takes effect. Durations and branch outcomes are sampled
once, at state entry — never re-evaluated daily — so every non-terminal
individual has exactly one pending transition and a run is fully
reproducible for a fixed random stream.

*/

use chrono::NaiveDate;
use rand::distr::weighted::WeightedIndex;
use rand_distr::{Gamma, LogNormal, Normal};

use crate::SimError;
use crate::config::PreSymptomaticConfig;
use crate::disease::DiseaseState;
use crate::population::{Individual, Sex};
use crate::random::SimRng;

// Incubation time: log-normal, floored at two days.
const INCUBATION_LOCATION: f64 = 1.43;
const INCUBATION_SCALE: f64 = 0.66;
const INCUBATION_MIN_DAYS: f64 = 2.0;

// Total infectious time before the pre-symptomatic share is subtracted.
const INFECTIOUS_MEAN: f64 = 6.0;
const INFECTIOUS_SD: f64 = 1.0;

// Days from the symptomatic/asymptomatic stage to demise, when death occurs.
const DEATH_DELAY_LOCATION: f64 = 2.453_109_3;
const DEATH_DELAY_SCALE: f64 = 0.837_109_9;

// Probability of developing symptoms, by age band:
// <20, 20-29, 30-39, 40-49, 50-59, 60+.
const SYMPTOMATIC_PROBABILITY: [f64; 6] = [0.07, 0.17, 0.42, 0.54, 0.83, 0.94];

// Mortality probability per (age band, sex) for the general population,
// age bands <25, 25-44, 45-64, 65-74, 75-84, 85+; female first.
const MORTALITY_GENERAL: [[f64; 2]; 6] = [
    [0.00001, 0.00002],
    [0.00021, 0.00048],
    [0.00322, 0.00785],
    [0.02130, 0.04680],
    [0.06500, 0.12280],
    [0.17800, 0.26520],
];

// Mortality probability per (age band, sex) for nursing-home residents,
// defined for the four oldest bands (45-64, 65-74, 75-84, 85+).
const MORTALITY_NURSING_HOME: [[f64; 2]; 4] = [
    [0.05110, 0.09870],
    [0.12160, 0.19970],
    [0.23860, 0.36210],
    [0.46230, 0.65000],
];

/// Probability that an individual of the given age develops symptoms.
#[must_use]
pub fn symptomatic_probability(age: u32) -> f64 {
    let band = match age {
        0..=19 => 0,
        20..=29 => 1,
        30..=39 => 2,
        40..=49 => 3,
        50..=59 => 4,
        _ => 5,
    };
    SYMPTOMATIC_PROBABILITY[band]
}

/// Mortality probability for the (age band, sex, nursing-home residency)
/// stratum. Nursing-home residents below 45 fall back to the general table.
#[must_use]
pub fn mortality_probability(age: u32, sex: Sex, nursing_home: bool) -> f64 {
    let band = match age {
        0..=24 => 0,
        25..=44 => 1,
        45..=64 => 2,
        65..=74 => 3,
        75..=84 => 4,
        _ => 5,
    };
    if nursing_home && band >= 2 {
        MORTALITY_NURSING_HOME[band - 2][sex.index()]
    } else {
        MORTALITY_GENERAL[band][sex.index()]
    }
}

/// Sampler for the pre-symptomatic duration, built from configuration.
enum PreSymptomaticSampler {
    Categorical {
        values: Vec<f64>,
        index: WeightedIndex<f64>,
    },
    Gamma(Gamma<f64>),
}

impl PreSymptomaticSampler {
    fn sample(&self, rng: &mut SimRng) -> f64 {
        match self {
            PreSymptomaticSampler::Categorical { values, index } => values[rng.sample(index)],
            PreSymptomaticSampler::Gamma(gamma) => rng.sample(gamma),
        }
    }
}

/// The disease state machine: a map from state tag to transition-sampling
/// rule.
pub struct DiseaseFsm {
    incubation: LogNormal<f64>,
    infectious_period: Normal<f64>,
    death_delay: LogNormal<f64>,
    pre_symptomatic: PreSymptomaticSampler,
}

impl DiseaseFsm {
    pub fn new(pre_symptomatic: &PreSymptomaticConfig) -> Result<DiseaseFsm, SimError> {
        let pre_symptomatic = match pre_symptomatic {
            PreSymptomaticConfig::Categorical { values, weights } => {
                let index = WeightedIndex::new(weights).map_err(|err| {
                    SimError::ConfigError(format!(
                        "invalid pre_symptomatic categorical weights: {err}"
                    ))
                })?;
                PreSymptomaticSampler::Categorical {
                    values: values.clone(),
                    index,
                }
            }
            PreSymptomaticConfig::Gamma { shape, scale } => {
                let gamma = Gamma::new(*shape, *scale).map_err(|err| {
                    SimError::ConfigError(format!("invalid pre_symptomatic gamma: {err}"))
                })?;
                PreSymptomaticSampler::Gamma(gamma)
            }
        };

        // The remaining distributions have fixed, known-good parameters.
        Ok(DiseaseFsm {
            incubation: LogNormal::new(INCUBATION_LOCATION, INCUBATION_SCALE)
                .expect("incubation parameters are valid"),
            infectious_period: Normal::new(INFECTIOUS_MEAN, INFECTIOUS_SD)
                .expect("infectious-period parameters are valid"),
            death_delay: LogNormal::new(DEATH_DELAY_LOCATION, DEATH_DELAY_SCALE)
                .expect("death-delay parameters are valid"),
            pre_symptomatic,
        })
    }

    /// The state entered when transmission occurs.
    #[must_use]
    pub fn entry_state() -> DiseaseState {
        DiseaseState::Exposed
    }

    /// Samples the successor of the individual's current state and the
    /// number of days until it takes effect, updating the individual's
    /// disease-model scratch attributes.
    ///
    /// # Panics
    ///
    /// Panics when called for `Susceptible` (entered via transmission only)
    /// or a terminal state — both indicate a driver bug.
    pub fn next_state(
        &self,
        individual: &mut Individual,
        date: NaiveDate,
        rng: &mut SimRng,
    ) -> (DiseaseState, f64) {
        match individual.disease_state() {
            DiseaseState::Exposed => self.from_exposed(individual, rng),
            DiseaseState::Infected => Self::from_infected(individual, date, rng),
            DiseaseState::Asymptomatic | DiseaseState::Symptomatic => {
                self.from_infectious(individual, date, rng)
            }
            DiseaseState::Hospitalized => {
                let duration = individual
                    .hospitalized_duration
                    .expect("hospitalized duration set on entry to Hospitalized");
                (DiseaseState::Died, duration)
            }
            state @ (DiseaseState::Susceptible | DiseaseState::Recovered | DiseaseState::Died) => {
                panic!("no outgoing transition from disease state {state}")
            }
        }
    }

    /// Exposed -> Infected after `incubation - pre_symptomatic` days.
    ///
    /// Samples the full incubation time, the pre-symptomatic share (capped
    /// at the incubation time) and the remaining infectious time, and stores
    /// the latter two on the individual for the downstream states.
    fn from_exposed(&self, individual: &mut Individual, rng: &mut SimRng) -> (DiseaseState, f64) {
        let incubation = rng.sample(&self.incubation).max(INCUBATION_MIN_DAYS);
        let pre_symptomatic = self.pre_symptomatic.sample(rng).min(incubation);
        let infectious = (rng.sample(&self.infectious_period) - pre_symptomatic).max(0.0);

        individual.pre_symptomatic_duration = Some(pre_symptomatic);
        individual.infectious_duration = Some(infectious);

        (DiseaseState::Infected, incubation - pre_symptomatic)
    }

    /// Infected -> Symptomatic | Asymptomatic after the pre-symptomatic
    /// share, branching on the age-dependent symptom probability. An
    /// individual whose infectious time is already spent goes straight to
    /// Recovered.
    fn from_infected(
        individual: &mut Individual,
        date: NaiveDate,
        rng: &mut SimRng,
    ) -> (DiseaseState, f64) {
        let pre_symptomatic = individual
            .pre_symptomatic_duration
            .expect("pre-symptomatic duration set on entry to Infected");
        let infectious = individual
            .infectious_duration
            .expect("infectious duration set on entry to Infected");

        if infectious <= 0.0 {
            return (DiseaseState::Recovered, pre_symptomatic);
        }

        if rng.uniform() < symptomatic_probability(individual.age(date)) {
            (DiseaseState::Symptomatic, pre_symptomatic)
        } else {
            (DiseaseState::Asymptomatic, pre_symptomatic)
        }
    }

    /// Symptomatic | Asymptomatic -> Recovered | Hospitalized | Died.
    ///
    /// Death is decided by the stratified mortality table. When the sampled
    /// time to demise outlasts the remaining infectious time, the individual
    /// passes through Hospitalized for the residual; otherwise they die
    /// directly. Survivors recover after the remaining infectious time.
    fn from_infectious(
        &self,
        individual: &mut Individual,
        date: NaiveDate,
        rng: &mut SimRng,
    ) -> (DiseaseState, f64) {
        let remaining = individual
            .infectious_duration
            .expect("infectious duration set before the infectious stage");
        let p_death = mortality_probability(
            individual.age(date),
            individual.sex(),
            individual.is_nursing_home_resident(),
        );

        if rng.uniform() < p_death {
            let delay = rng.sample(&self.death_delay);
            if delay > remaining {
                individual.hospitalized_duration = Some(delay - remaining);
                (DiseaseState::Hospitalized, remaining)
            } else {
                (DiseaseState::Died, delay)
            }
        } else {
            (DiseaseState::Recovered, remaining)
        }
    }
}
