/*!

Replay of external demographic events.

The event log is a CSV stream of dated records — births, deaths,
immigration, emigration, household moves and age-group transitions —
produced outside the simulation. After the disease step of each day the
player fast-forwards through every event up to and including that date.
A malformed or failing event is logged with the offending individual id and
counted; replay continues with the next event.

*/

use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use log::error;
use serde::Deserialize;

use crate::config::PopulationConfig;
use crate::population::{Individual, Population, Sex};
use crate::report::Reporter;
use crate::{HouseholdId, PersonId, SimError};

/// One row of the event log. The initial-population file shares the
/// individual columns, so the same record type reads both.
#[derive(Debug, Clone, Deserialize)]
pub struct EventRecord {
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub event_date: String,
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub age_group_pop: Option<u8>,
    #[serde(default)]
    pub age_group_hh: Option<u8>,
    #[serde(default, rename = "HH_ID")]
    pub hh_id: Option<u64>,
    #[serde(default)]
    pub hh_position: Option<String>,
    #[serde(default, rename = "NH")]
    pub nursing_home: Option<String>,
    #[serde(default, rename = "HH_ID_target")]
    pub hh_id_target: Option<String>,
    #[serde(default)]
    pub hh_position_target: Option<String>,
}

fn require<T>(value: Option<T>, id: u64, field: &str) -> Result<T, SimError> {
    value.ok_or_else(|| SimError::EventError(format!("record for individual {id} lacks {field}")))
}

fn check_age_group(age_group: u8, count: usize, id: u64, scheme: &str) -> Result<u8, SimError> {
    if age_group == 0 || usize::from(age_group) > count {
        return Err(SimError::EventError(format!(
            "individual {id} has {scheme} age group {age_group}, expected 1..={count}"
        )));
    }
    Ok(age_group)
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(str::trim),
        Some("1" | "T" | "TRUE" | "true" | "Y" | "yes")
    )
}

/// Builds an individual from the record's individual columns.
fn individual_from_record(
    record: &EventRecord,
    date_format: &str,
    num_age_groups_pop: usize,
    num_age_groups_hh: usize,
) -> Result<Individual, SimError> {
    let birth_date = require(record.birth_date.as_deref(), record.id, "birth_date")?;
    let birth_date = NaiveDate::parse_from_str(birth_date, date_format).map_err(|err| {
        SimError::EventError(format!(
            "individual {} has unparseable birth_date '{birth_date}': {err}",
            record.id
        ))
    })?;
    let sex = Sex::from_code(require(record.sex.as_deref(), record.id, "sex")?);
    let age_group_pop = check_age_group(
        require(record.age_group_pop, record.id, "age_group_pop")?,
        num_age_groups_pop,
        record.id,
        "population",
    )?;
    let age_group_hh = check_age_group(
        require(record.age_group_hh, record.id, "age_group_hh")?,
        num_age_groups_hh,
        record.id,
        "household",
    )?;

    Ok(Individual::new(
        PersonId(record.id),
        birth_date,
        sex,
        age_group_pop,
        age_group_hh,
        record.hh_position.clone().unwrap_or_default(),
        parse_flag(record.nursing_home.as_deref()),
    ))
}

/// Loads the initial population CSV. Any failure here is fatal — a partial
/// initial population is not worth running on.
fn load_initial(
    path: &Path,
    population: &mut Population,
    date_format: &str,
) -> Result<usize, SimError> {
    let mut reader = csv::Reader::from_path(path).map_err(|err| {
        SimError::ConfigError(format!(
            "cannot read initial population '{}': {err}",
            path.display()
        ))
    })?;
    let mut loaded = 0usize;
    for result in reader.deserialize::<EventRecord>() {
        let record = result?;
        let household = require(record.hh_id, record.id, "HH_ID")?;
        let individual = individual_from_record(
            &record,
            date_format,
            population.num_age_groups_pop(),
            population.num_age_groups_hh(),
        )?;
        population.add(individual, HouseholdId(household))?;
        loaded += 1;
    }
    Ok(loaded)
}

pub struct EventLogPlayer {
    events: csv::DeserializeRecordsIntoIter<File, EventRecord>,
    next_event: Option<EventRecord>,
    date_format: String,
}

impl EventLogPlayer {
    /// Loads the initial population and opens the event log for replay.
    pub fn new(
        config: &PopulationConfig,
        date_format: &str,
        population: &mut Population,
        reporter: &mut Reporter,
    ) -> Result<EventLogPlayer, SimError> {
        let loaded = load_initial(&config.initial_population, population, date_format)?;
        reporter.info(&format!("Pre-loaded population with {loaded} individuals."));

        let reader = csv::Reader::from_path(&config.event_log).map_err(|err| {
            SimError::ConfigError(format!(
                "cannot read event log '{}': {err}",
                config.event_log.display()
            ))
        })?;
        let mut player = EventLogPlayer {
            events: reader.into_deserialize(),
            next_event: None,
            date_format: date_format.to_string(),
        };
        player.advance(reporter);
        Ok(player)
    }

    /// Replays every event dated on or before `max_date`.
    pub fn fast_forward(
        &mut self,
        max_date: NaiveDate,
        population: &mut Population,
        reporter: &mut Reporter,
    ) {
        while let Some(event) = self.next_event.take() {
            let event_date = match NaiveDate::parse_from_str(&event.event_date, &self.date_format) {
                Ok(date) => date,
                Err(err) => {
                    error!(
                        "skipping '{}' event with bad date '{}' (individual id: {}): {err}",
                        event.event_type, event.event_date, event.id
                    );
                    reporter.count_error(&event.event_type);
                    self.advance(reporter);
                    continue;
                }
            };
            if event_date > max_date {
                self.next_event = Some(event);
                break;
            }

            match self.process(population, &event) {
                Ok(()) => reporter.count_event(&event.event_type),
                Err(err) => {
                    error!(
                        "'{}' event failed (individual id: {}): {err}",
                        event.event_type, event.id
                    );
                    reporter.count_error(&event.event_type);
                }
            }
            self.advance(reporter);
        }
    }

    fn process(&self, population: &mut Population, event: &EventRecord) -> Result<(), SimError> {
        match event.event_type.as_str() {
            "birth" | "immigration" => {
                let household = require(event.hh_id, event.id, "HH_ID")?;
                let individual = individual_from_record(
                    event,
                    &self.date_format,
                    population.num_age_groups_pop(),
                    population.num_age_groups_hh(),
                )?;
                population.add(individual, HouseholdId(household))
            }
            "death" | "emigration" => population.remove(PersonId(event.id)).map(|_| ()),
            "hh_transition" => {
                let person = PersonId(event.id);
                match event.hh_id_target.as_deref().map(str::trim) {
                    // 'NA' marks a position change within the household.
                    None | Some("NA") => {}
                    Some(target) => {
                        let household: u64 = target.parse().map_err(|err| {
                            SimError::EventError(format!(
                                "individual {} has bad HH_ID_target '{target}': {err}",
                                event.id
                            ))
                        })?;
                        population.remove_from_household(person)?;
                        population.add_to_household(person, HouseholdId(household))?;
                    }
                }
                if let Some(position) = &event.hh_position_target {
                    population
                        .individual_mut(person)?
                        .set_household_position(position.clone());
                }
                Ok(())
            }
            "age_group_transition" => {
                let num_pop = population.num_age_groups_pop();
                let num_hh = population.num_age_groups_hh();
                let individual = population.individual_mut(PersonId(event.id))?;
                if let Some(age_group) = event.age_group_pop {
                    individual.set_population_age_group(check_age_group(
                        age_group,
                        num_pop,
                        event.id,
                        "population",
                    )?);
                }
                if let Some(age_group) = event.age_group_hh {
                    individual.set_household_age_group(check_age_group(
                        age_group,
                        num_hh,
                        event.id,
                        "household",
                    )?);
                }
                Ok(())
            }
            other => Err(SimError::EventError(format!(
                "invalid event type '{other}'"
            ))),
        }
    }

    /// Pulls the next well-formed record, logging and counting rows the CSV
    /// layer rejects.
    fn advance(&mut self, reporter: &mut Reporter) {
        self.next_event = None;
        for result in self.events.by_ref() {
            match result {
                Ok(record) => {
                    self.next_event = Some(record);
                    break;
                }
                Err(err) => {
                    error!("skipping malformed event record: {err}");
                    reporter.count_error("malformed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReporterConfig;
    use std::io::Write;
    use std::path::PathBuf;

    const HEADER: &str = "event_type,event_date,ID,birth_date,sex,age_group_pop,age_group_hh,\
                          HH_ID,hh_position,NH,HH_ID_target,hh_position_target";

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn quiet_reporter() -> Reporter {
        Reporter::new(
            &ReporterConfig {
                enabled: false,
                ..ReporterConfig::default()
            },
            "%Y-%m-%d",
            4,
        )
    }

    fn write_csv(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        writeln!(file, "{HEADER}").unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        path
    }

    fn player_with(
        dir: &Path,
        initial: &[&str],
        events: &[&str],
        population: &mut Population,
        reporter: &mut Reporter,
    ) -> EventLogPlayer {
        let config = PopulationConfig {
            initial_population: write_csv(dir, "initial.csv", initial),
            event_log: write_csv(dir, "events.csv", events),
            num_age_groups_pop: 4,
            num_age_groups_hh: 4,
            age_child_limit: 18,
        };
        EventLogPlayer::new(&config, "%Y-%m-%d", population, reporter).unwrap()
    }

    #[test]
    fn initial_population_loads_into_households() {
        let dir = tempfile::tempdir().unwrap();
        let mut population = Population::new(4, 4, 18);
        let mut reporter = quiet_reporter();
        let _player = player_with(
            dir.path(),
            &[
                ",,1,1980-04-02,M,2,3,10,head,,,",
                ",,2,1985-11-20,F,2,3,10,partner,1,,",
                ",,3,2012-01-05,M,1,1,11,child,,,",
            ],
            &[],
            &mut population,
            &mut reporter,
        );

        assert_eq!(population.size(), 3);
        assert_eq!(population.household(HouseholdId(10)).unwrap().size(), 2);
        let partner = population.individual(PersonId(2)).unwrap();
        assert_eq!(partner.sex(), Sex::Female);
        assert!(partner.is_nursing_home_resident());
        assert_eq!(partner.household_position(), "partner");
    }

    #[test]
    fn replay_applies_events_in_date_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut population = Population::new(4, 4, 18);
        let mut reporter = quiet_reporter();
        let mut player = player_with(
            dir.path(),
            &[",,1,1980-04-02,M,2,3,10,head,,,"],
            &[
                "birth,2021-01-02,5,2021-01-02,F,1,1,10,child,,,",
                "age_group_transition,2021-01-03,1,,,3,4,,,,,",
                "hh_transition,2021-01-04,1,,,,,,,,20,head",
                "death,2021-01-05,5,,,,,,,,,",
            ],
            &mut population,
            &mut reporter,
        );

        // Only the events up to the 3rd are applied.
        player.fast_forward(date("2021-01-03"), &mut population, &mut reporter);
        assert_eq!(population.size(), 2);
        let head = population.individual(PersonId(1)).unwrap();
        assert_eq!(head.population_age_group(), 3);
        assert_eq!(head.household_age_group(), 4);
        assert_eq!(head.household(), Some(HouseholdId(10)));

        // The rest follow on later days.
        player.fast_forward(date("2021-01-05"), &mut population, &mut reporter);
        assert_eq!(population.size(), 1);
        let head = population.individual(PersonId(1)).unwrap();
        assert_eq!(head.household(), Some(HouseholdId(20)));
        assert!(population.household(HouseholdId(10)).is_err());
    }

    #[test]
    fn failing_events_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let mut population = Population::new(4, 4, 18);
        let mut reporter = quiet_reporter();
        let mut player = player_with(
            dir.path(),
            &[",,1,1980-04-02,M,2,3,10,head,,,"],
            &[
                // Unknown type, death of a non-existent individual, and a
                // birth with an out-of-range age group.
                "apocalypse,2021-01-02,1,,,,,,,,,",
                "death,2021-01-02,99,,,,,,,,,",
                "birth,2021-01-02,6,2021-01-02,F,9,1,10,child,,,",
                // A good event after the bad ones still applies.
                "birth,2021-01-03,7,2021-01-03,F,1,1,10,child,,,",
            ],
            &mut population,
            &mut reporter,
        );

        player.fast_forward(date("2021-01-04"), &mut population, &mut reporter);
        assert_eq!(population.size(), 2);
        assert!(population.individual(PersonId(7)).is_ok());
        assert!(population.individual(PersonId(6)).is_err());
    }

    #[test]
    fn position_only_household_transition() {
        let dir = tempfile::tempdir().unwrap();
        let mut population = Population::new(4, 4, 18);
        let mut reporter = quiet_reporter();
        let mut player = player_with(
            dir.path(),
            &[",,1,1980-04-02,M,2,3,10,head,,,"],
            &["hh_transition,2021-01-02,1,,,,,,,,NA,partner"],
            &mut population,
            &mut reporter,
        );

        player.fast_forward(date("2021-01-02"), &mut population, &mut reporter);
        let individual = population.individual(PersonId(1)).unwrap();
        assert_eq!(individual.household(), Some(HouseholdId(10)));
        assert_eq!(individual.household_position(), "partner");
    }
}
