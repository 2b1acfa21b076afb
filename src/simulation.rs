/*!

Bootstrap and the day-by-day run loop.

Each simulated day, in order: periodic influx (when due), the disease step
(drain → snapshot → household metrics → transmission), then the external
event-log fast-forward, then the date advances. The run ends at the end
date, or earlier when configured to stop once no infected individuals
remain.

*/

use chrono::{Days, NaiveDate};
use log::info;

use crate::config::Config;
use crate::disease::{Disease, DiseaseState};
use crate::events::EventLogPlayer;
use crate::population::Population;
use crate::random::SimRng;
use crate::report::Reporter;
use crate::{PersonId, SimError};

pub struct Simulation {
    start: NaiveDate,
    end: NaiveDate,
    initial_influx: usize,
    influx_per_period: usize,
    influx_period: i64,
    terminate_on_zero_infected: bool,
    population: Population,
    disease: Disease,
    player: EventLogPlayer,
    reporter: Reporter,
    rng: SimRng,
}

impl Simulation {
    pub fn new(config: &Config) -> Result<Simulation, SimError> {
        let date_format = &config.simulation.date_format;
        let start = NaiveDate::parse_from_str(&config.simulation.start_date, date_format)
            .map_err(|err| {
                SimError::ConfigError(format!(
                    "bad start_date '{}': {err}",
                    config.simulation.start_date
                ))
            })?;
        let end = NaiveDate::parse_from_str(&config.simulation.end_date, date_format).map_err(
            |err| {
                SimError::ConfigError(format!(
                    "bad end_date '{}': {err}",
                    config.simulation.end_date
                ))
            },
        )?;
        if end < start {
            return Err(SimError::ConfigError(format!(
                "end_date {end} precedes start_date {start}"
            )));
        }

        let mut population = Population::new(
            config.population.num_age_groups_pop,
            config.population.num_age_groups_hh,
            config.population.age_child_limit,
        );
        let mut reporter = Reporter::new(
            &config.reporter,
            date_format,
            config.population.num_age_groups_pop,
        );
        let player =
            EventLogPlayer::new(&config.population, date_format, &mut population, &mut reporter)?;

        // The baseline for population-drift adjustment is the freshly
        // loaded, pre-infection population.
        population.freeze_base_distribution();

        let disease = Disease::new(
            &config.disease,
            config.population.num_age_groups_pop,
            config.population.num_age_groups_hh,
        )?;

        Ok(Simulation {
            start,
            end,
            initial_influx: config.simulation.initial_influx,
            influx_per_period: config.simulation.num_influx_per_period,
            influx_period: i64::try_from(config.simulation.influx_period_in_days.max(1))
                .unwrap_or(i64::MAX),
            terminate_on_zero_infected: config.simulation.terminate_on_zero_infected,
            population,
            disease,
            player,
            reporter,
            rng: SimRng::from_seed(config.simulation.seed),
        })
    }

    #[must_use]
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Number of individuals still progressing through the disease.
    #[must_use]
    pub fn pending_infections(&self) -> usize {
        self.disease.pending_transitions()
    }

    pub fn run(&mut self) -> Result<(), SimError> {
        let mut current = self.start;
        self.reporter.init(current);

        self.influx(self.initial_influx, current)?;
        info!("seeded initial influx of {} individuals", self.initial_influx);

        while current <= self.end {
            self.reporter.set_iteration(current);

            // Periodic influx; the initial influx already covered day zero.
            let day_index = (current - self.start).num_days();
            if self.influx_per_period > 0 && day_index > 0 && day_index % self.influx_period == 0 {
                self.influx(self.influx_per_period, current)?;
            }

            let infections_outstanding = self.disease.apply_daily_step(
                &mut self.population,
                &mut self.reporter,
                current,
                &mut self.rng,
            )?;
            if self.terminate_on_zero_infected && !infections_outstanding {
                self.reporter
                    .info("Terminating early, number of infected individuals reached zero.");
                break;
            }

            self.player
                .fast_forward(current, &mut self.population, &mut self.reporter);

            current = current + Days::new(1);
        }

        self.reporter.final_report();
        self.reporter.teardown();
        Ok(())
    }

    /// Infects `amount` randomly sampled, still-susceptible individuals.
    fn influx(&mut self, amount: usize, date: NaiveDate) -> Result<(), SimError> {
        if amount == 0 {
            return Ok(());
        }
        let sampled: Vec<PersonId> = self.population.sample(amount, &mut self.rng);
        for person in sampled {
            if self.population.individual(person)?.disease_state() == DiseaseState::Susceptible {
                self.disease.infect(
                    &mut self.population,
                    &mut self.reporter,
                    person,
                    date,
                    &mut self.rng,
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        DiseaseConfig, PopulationConfig, PreSymptomaticConfig, ReporterConfig, SimulationConfig,
        StateWeights,
    };
    use std::fs::{self, File};
    use std::io::Write;
    use std::path::{Path, PathBuf};

    const HEADER: &str = "event_type,event_date,ID,birth_date,sex,age_group_pop,age_group_hh,\
                          HH_ID,hh_position,NH,HH_ID_target,hh_position_target";

    /// 100 adults in 20 households of 5, ages ~26..45 in 2021.
    fn write_population(dir: &Path) -> PathBuf {
        let path = dir.join("initial.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "{HEADER}").unwrap();
        for id in 0..100u64 {
            let birth_year = 1976 + (id % 20);
            let sex = if id % 2 == 0 { "F" } else { "M" };
            let household = id / 5;
            writeln!(
                file,
                ",,{id},{birth_year}-06-15,{sex},1,1,{household},member,,,"
            )
            .unwrap();
        }
        path
    }

    fn write_empty_events(dir: &Path) -> PathBuf {
        let path = dir.join("events.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "{HEADER}").unwrap();
        path
    }

    fn write_matrix(dir: &Path, name: &str, value: f64) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        writeln!(file, "{value}").unwrap();
        path
    }

    fn config_in(dir: &Path, contact: f64, beta: f64) -> Config {
        Config {
            simulation: SimulationConfig {
                start_date: "2021-01-01".to_string(),
                end_date: "2021-01-31".to_string(),
                date_format: "%Y-%m-%d".to_string(),
                seed: 42,
                initial_influx: 5,
                num_influx_per_period: 0,
                influx_period_in_days: 1,
                terminate_on_zero_infected: false,
            },
            population: PopulationConfig {
                initial_population: write_population(dir),
                event_log: write_empty_events(dir),
                num_age_groups_pop: 1,
                num_age_groups_hh: 1,
                age_child_limit: 18,
            },
            disease: DiseaseConfig {
                pre_symptomatic: PreSymptomaticConfig::Categorical {
                    values: vec![2.0],
                    weights: vec![1.0],
                },
                beta_household: StateWeights {
                    infected: beta,
                    asymptomatic: beta,
                    symptomatic: beta,
                },
                beta_population: StateWeights {
                    infected: beta,
                    asymptomatic: beta,
                    symptomatic: beta,
                },
                pop_matrix: write_matrix(dir, "pop_matrix.csv", contact),
                hh_matrix: write_matrix(dir, "hh_matrix.csv", contact),
                hh_matrix_children: write_matrix(dir, "hh_matrix_children.csv", contact),
                child_susceptibility: 0.5,
                remove_deceased_from_household: false,
            },
            reporter: ReporterConfig {
                enabled: false,
                ..ReporterConfig::default()
            },
        }
    }

    #[test]
    fn zero_contact_outbreak_stays_with_seeded_individuals() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path(), 0.0, 0.9);
        let mut simulation = Simulation::new(&config).unwrap();
        simulation.run().unwrap();

        // Exactly the five seeded individuals ever left Susceptible, and
        // thirty days is enough for all of them to reach a terminal state.
        let population = simulation.population();
        let touched: Vec<_> = population
            .individuals()
            .filter(|ind| ind.disease_state() != DiseaseState::Susceptible)
            .collect();
        assert_eq!(touched.len(), 5);
        for individual in &touched {
            assert!(
                individual.disease_state().is_terminal(),
                "individual {} still in {}",
                individual.id(),
                individual.disease_state()
            );
        }
        assert_eq!(simulation.pending_infections(), 0);
    }

    #[test]
    fn premature_termination_on_zero_infected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path(), 0.0, 0.9);
        config.simulation.end_date = "2022-12-31".to_string();
        config.simulation.terminate_on_zero_infected = true;
        let mut simulation = Simulation::new(&config).unwrap();
        // Terminates long before the far-away end date.
        simulation.run().unwrap();
        assert_eq!(simulation.pending_infections(), 0);
    }

    #[test]
    fn fixed_seed_runs_are_reproducible() {
        let logs = |label: &str| -> (String, String) {
            let dir = tempfile::tempdir().unwrap();
            let mut config = config_in(dir.path(), 0.05, 0.4);
            config.reporter = ReporterConfig {
                enabled: false,
                state_change_log: Some(dir.path().join(format!("{label}_states.csv"))),
                transmission_log: Some(dir.path().join(format!("{label}_transmissions.csv"))),
                ..ReporterConfig::default()
            };
            let mut simulation = Simulation::new(&config).unwrap();
            simulation.run().unwrap();
            (
                fs::read_to_string(
                    config.reporter.state_change_log.as_ref().unwrap(),
                )
                .unwrap(),
                fs::read_to_string(
                    config.reporter.transmission_log.as_ref().unwrap(),
                )
                .unwrap(),
            )
        };

        let (states_a, transmissions_a) = logs("a");
        let (states_b, transmissions_b) = logs("b");
        assert_eq!(states_a, states_b);
        assert_eq!(transmissions_a, transmissions_b);
        // With these contact rates the outbreak actually spreads, so the
        // comparison is not vacuous.
        assert!(transmissions_a.lines().count() > 1);
    }
}
