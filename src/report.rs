/*!

Reporting: the periodic population table, info/error lines, and the CSV
record logs (state changes, transmissions, daily summaries).

The reporter is a collaborator, not part of core correctness: a sink or CSV
writer that cannot open (or fails mid-run) disables itself with a warning
and the simulation carries on.

*/

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use chrono::NaiveDate;
use log::warn;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::config::{ReporterConfig, SinkConfig};
use crate::disease::DiseaseState;
use crate::population::{PopulationSummary, Sex};
use crate::{HouseholdId, PersonId};

const LINE_LENGTH: usize = 100;

/// Destination for the human-readable report text.
pub trait Sink {
    fn write_message(&mut self, message: &str);
    fn flush(&mut self) {}
}

pub struct ConsoleSink;

impl Sink for ConsoleSink {
    fn write_message(&mut self, message: &str) {
        println!("{message}");
    }
}

/// File-backed sink. Disables itself if the file cannot be opened or a
/// write fails.
pub struct FileSink {
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    #[must_use]
    pub fn open(path: &Path) -> FileSink {
        let writer = match File::create(path) {
            Ok(file) => Some(BufWriter::new(file)),
            Err(err) => {
                warn!("report sink disabled: cannot open '{}': {err}", path.display());
                None
            }
        };
        FileSink { writer }
    }
}

impl Sink for FileSink {
    fn write_message(&mut self, message: &str) {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(err) = writeln!(writer, "{message}") {
                warn!("report sink disabled: {err}");
                self.writer = None;
            }
        }
    }

    fn flush(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            let _ = writer.flush();
        }
    }
}

/// A transmission that occurred, with the household composition at the time
/// of infection and both escape probabilities.
#[derive(Debug, Clone, Copy)]
pub struct TransmissionEvent {
    pub person: PersonId,
    pub age: u32,
    pub sex: Sex,
    pub household: HouseholdId,
    pub household_size: usize,
    pub infectious_members: usize,
    pub household_escape: f64,
    pub population_escape: f64,
}

#[derive(Serialize)]
struct StateChangeRecord {
    date: String,
    individual: u64,
    state: &'static str,
}

#[derive(Serialize)]
struct TransmissionRecord {
    date: String,
    individual: u64,
    age: u32,
    sex: &'static str,
    household: u64,
    household_size: usize,
    infectious_members: usize,
    household_escape: f64,
    population_escape: f64,
}

#[derive(Serialize)]
struct SummaryRecord {
    date: String,
    susceptible: u64,
    exposed: u64,
    infected: u64,
    asymptomatic: u64,
    symptomatic: u64,
    hospitalized: u64,
    recovered: u64,
    died: u64,
}

pub struct Reporter {
    enabled: bool,
    report_period: i64,
    log_info: bool,
    log_error: bool,
    sink: Box<dyn Sink>,
    date_format: String,
    num_age_groups: usize,

    start_date: Option<NaiveDate>,
    current: Option<NaiveDate>,
    started_at: Instant,
    event_count: u64,
    error_count: u64,
    events_per_type: FxHashMap<String, u64>,
    errors_per_type: FxHashMap<String, u64>,
    last_summary: Option<PopulationSummary>,

    state_changes: Option<csv::Writer<File>>,
    transmissions: Option<csv::Writer<File>>,
    summaries: Option<csv::Writer<File>>,
}

impl Reporter {
    #[must_use]
    pub fn new(config: &ReporterConfig, date_format: &str, num_age_groups: usize) -> Reporter {
        let sink: Box<dyn Sink> = match &config.sink {
            SinkConfig::Console => Box::new(ConsoleSink),
            SinkConfig::File { path } => Box::new(FileSink::open(path)),
        };

        let report_period = i64::try_from(config.report_period_in_days.max(1)).unwrap_or(i64::MAX);

        Reporter {
            enabled: config.enabled,
            report_period,
            log_info: config.log_level.iter().any(|level| level == "info"),
            log_error: config.log_level.iter().any(|level| level == "error"),
            sink,
            date_format: date_format.to_string(),
            num_age_groups,
            start_date: None,
            current: None,
            started_at: Instant::now(),
            event_count: 0,
            error_count: 0,
            events_per_type: FxHashMap::default(),
            errors_per_type: FxHashMap::default(),
            last_summary: None,
            state_changes: open_record_log(config.state_change_log.as_deref(), "state-change"),
            transmissions: open_record_log(config.transmission_log.as_deref(), "transmission"),
            summaries: open_record_log(config.summary_log.as_deref(), "summary"),
        }
    }

    pub fn init(&mut self, start: NaiveDate) {
        self.start_date = Some(start);
        self.current = Some(start);
        self.started_at = Instant::now();
    }

    /// Advances the reporter to the day and emits the periodic report when
    /// one is due.
    pub fn set_iteration(&mut self, date: NaiveDate) {
        self.current = Some(date);
        if let Some(start) = self.start_date {
            if date != start && (date - start).num_days() % self.report_period == 0 {
                self.report(false);
            }
        }
    }

    pub fn info(&mut self, message: &str) {
        if self.log_info {
            self.sink.write_message(&format!("[INFO] {message}"));
        }
    }

    pub fn error(&mut self, message: &str) {
        if self.log_error {
            self.sink.write_message(&format!("[ERROR] {message}"));
        }
    }

    pub fn count_event(&mut self, event_type: &str) {
        self.event_count += 1;
        *self
            .events_per_type
            .entry(event_type.to_string())
            .or_insert(0) += 1;
    }

    pub fn count_error(&mut self, event_type: &str) {
        self.error_count += 1;
        *self
            .errors_per_type
            .entry(event_type.to_string())
            .or_insert(0) += 1;
    }

    /// Stores the day's population summary and appends it to the summary
    /// log.
    pub fn daily_summary(&mut self, date: NaiveDate, summary: &PopulationSummary) {
        let record = SummaryRecord {
            date: self.format_date(date),
            susceptible: summary.state_total(DiseaseState::Susceptible),
            exposed: summary.state_total(DiseaseState::Exposed),
            infected: summary.state_total(DiseaseState::Infected),
            asymptomatic: summary.state_total(DiseaseState::Asymptomatic),
            symptomatic: summary.state_total(DiseaseState::Symptomatic),
            hospitalized: summary.state_total(DiseaseState::Hospitalized),
            recovered: summary.state_total(DiseaseState::Recovered),
            died: summary.state_total(DiseaseState::Died),
        };
        write_record(&mut self.summaries, &record, "summary");
        self.last_summary = Some(summary.clone());
    }

    pub fn record_state_change(&mut self, date: NaiveDate, person: PersonId, state: DiseaseState) {
        let record = StateChangeRecord {
            date: self.format_date(date),
            individual: person.0,
            state: state.label(),
        };
        write_record(&mut self.state_changes, &record, "state-change");
    }

    pub fn record_transmission(&mut self, date: NaiveDate, event: &TransmissionEvent) {
        let record = TransmissionRecord {
            date: self.format_date(date),
            individual: event.person.0,
            age: event.age,
            sex: event.sex.code(),
            household: event.household.0,
            household_size: event.household_size,
            infectious_members: event.infectious_members,
            household_escape: event.household_escape,
            population_escape: event.population_escape,
        };
        write_record(&mut self.transmissions, &record, "transmission");
    }

    pub fn final_report(&mut self) {
        self.report(true);
    }

    pub fn teardown(&mut self) {
        for writer in [
            &mut self.state_changes,
            &mut self.transmissions,
            &mut self.summaries,
        ] {
            if let Some(w) = writer.as_mut() {
                if let Err(err) = w.flush() {
                    warn!("flushing record log failed: {err}");
                }
            }
        }
        self.sink.flush();
    }

    fn report(&mut self, force: bool) {
        if !force && !self.enabled {
            return;
        }
        let Some(summary) = self.last_summary.take() else {
            return;
        };

        let iteration = self
            .current
            .map_or_else(|| "-".to_string(), |date| self.format_date(date));
        let elapsed = self.started_at.elapsed().as_secs_f64();

        let mut msg = String::new();
        msg.push('\n');
        msg.push_str(&"=".repeat(LINE_LENGTH));
        msg.push_str(&format!("\nIteration: {iteration}\n"));
        msg.push_str(&"=".repeat(LINE_LENGTH));
        msg.push_str("\nPopulation: current distribution\n");
        msg.push_str(&"-".repeat(LINE_LENGTH));
        msg.push('\n');

        msg.push_str(&format!("{:<12}", "Age group"));
        for state in DiseaseState::ALL {
            msg.push_str(&format!("{:>10}", state.label()));
        }
        msg.push('\n');
        msg.push_str(&"-".repeat(LINE_LENGTH));
        msg.push('\n');

        #[allow(clippy::cast_possible_truncation)]
        for age_group in 1..=self.num_age_groups as u8 {
            msg.push_str(&format!("{age_group:<12}"));
            for state in DiseaseState::ALL {
                msg.push_str(&format!("{:>10}", summary.count(state, age_group)));
            }
            msg.push('\n');
        }

        msg.push_str(&"-".repeat(LINE_LENGTH));
        msg.push('\n');
        msg.push_str(&format!("{:<12}", "total"));
        for state in DiseaseState::ALL {
            msg.push_str(&format!("{:>10}", summary.state_total(state)));
        }
        msg.push('\n');
        msg.push_str(&"=".repeat(LINE_LENGTH));
        msg.push_str(&format!(
            "\nLog: processed {} events ({} errors) in {elapsed:.1}s\n",
            self.event_count, self.error_count
        ));
        for (event_type, count) in &self.events_per_type {
            msg.push_str(&format!("\t{count} {event_type} events\n"));
        }
        for (event_type, count) in &self.errors_per_type {
            msg.push_str(&format!("\t{count} errors in {event_type} events\n"));
        }
        msg.push_str(&"=".repeat(LINE_LENGTH));

        self.sink.write_message(&msg);
        self.last_summary = Some(summary);
    }

    fn format_date(&self, date: NaiveDate) -> String {
        date.format(&self.date_format).to_string()
    }
}

fn open_record_log(path: Option<&Path>, what: &str) -> Option<csv::Writer<File>> {
    let path = path?;
    match csv::Writer::from_path(path) {
        Ok(writer) => Some(writer),
        Err(err) => {
            warn!("{what} log disabled: cannot open '{}': {err}", path.display());
            None
        }
    }
}

fn write_record<S: Serialize>(writer: &mut Option<csv::Writer<File>>, record: &S, what: &str) {
    if let Some(w) = writer.as_mut() {
        if let Err(err) = w.serialize(record) {
            warn!("{what} log disabled: {err}");
            *writer = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::{Individual, Population};
    use std::fs;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn config_with(dir: &Path) -> ReporterConfig {
        ReporterConfig {
            enabled: false,
            state_change_log: Some(dir.join("state_changes.csv")),
            transmission_log: Some(dir.join("transmissions.csv")),
            summary_log: Some(dir.join("summaries.csv")),
            ..ReporterConfig::default()
        }
    }

    fn summary_of(size: u64) -> PopulationSummary {
        let mut population = Population::new(2, 2, 18);
        for id in 0..size {
            population
                .add(
                    Individual::new(
                        PersonId(id),
                        date("1980-01-01"),
                        Sex::Female,
                        1,
                        1,
                        "member".to_string(),
                        false,
                    ),
                    HouseholdId(id),
                )
                .unwrap();
        }
        PopulationSummary::new(&population)
    }

    #[test]
    fn records_land_in_csv_logs() {
        let dir = tempfile::tempdir().unwrap();
        let mut reporter = Reporter::new(&config_with(dir.path()), "%Y-%m-%d", 2);
        reporter.init(date("2021-01-01"));

        reporter.record_state_change(date("2021-01-02"), PersonId(7), DiseaseState::Exposed);
        reporter.record_transmission(
            date("2021-01-02"),
            &TransmissionEvent {
                person: PersonId(7),
                age: 34,
                sex: Sex::Male,
                household: HouseholdId(3),
                household_size: 4,
                infectious_members: 1,
                household_escape: 0.25,
                population_escape: 0.75,
            },
        );
        reporter.daily_summary(date("2021-01-02"), &summary_of(3));
        reporter.teardown();

        let state_changes = fs::read_to_string(dir.path().join("state_changes.csv")).unwrap();
        assert!(state_changes.starts_with("date,individual,state"));
        assert!(state_changes.contains("2021-01-02,7,EXP"));

        let transmissions = fs::read_to_string(dir.path().join("transmissions.csv")).unwrap();
        assert!(transmissions.contains("2021-01-02,7,34,M,3,4,1,0.25,0.75"));

        let summaries = fs::read_to_string(dir.path().join("summaries.csv")).unwrap();
        assert!(summaries.contains("2021-01-02,3,0,0,0,0,0,0,0"));
    }

    #[test]
    fn unopenable_log_degrades_quietly() {
        let config = ReporterConfig {
            enabled: false,
            state_change_log: Some(Path::new("/nonexistent/dir/log.csv").to_path_buf()),
            ..ReporterConfig::default()
        };
        let mut reporter = Reporter::new(&config, "%Y-%m-%d", 2);
        reporter.init(date("2021-01-01"));
        // Must not panic or abort; the writer is simply disabled.
        reporter.record_state_change(date("2021-01-01"), PersonId(1), DiseaseState::Exposed);
        reporter.teardown();
    }

    #[test]
    fn event_counters_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let mut reporter = Reporter::new(&config_with(dir.path()), "%Y-%m-%d", 2);
        reporter.count_event("birth");
        reporter.count_event("birth");
        reporter.count_event("death");
        reporter.count_error("death");
        assert_eq!(reporter.event_count, 3);
        assert_eq!(reporter.error_count, 1);
        assert_eq!(reporter.events_per_type["birth"], 2);
        assert_eq!(reporter.errors_per_type["death"], 1);
    }
}
