/*!

Typed configuration, deserialized from a JSON document.

The document is hierarchical: a `simulation` section (dates, seed, influx),
a `population` section (input files and age-group layout), a `disease`
section (state-machine and transmission parameters, contact-matrix paths)
and a `reporter` section (sinks and record-log paths). Missing optional
fields fall back to serde defaults; a missing file or malformed document is
fatal at startup.

*/

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::SimError;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub population: PopulationConfig,
    pub disease: DiseaseConfig,
    #[serde(default)]
    pub reporter: ReporterConfig,
}

impl Config {
    /// Loads and parses the configuration file at `path`.
    pub fn from_file(path: &Path) -> Result<Config, SimError> {
        let file = File::open(path).map_err(|err| {
            SimError::ConfigError(format!("cannot open '{}': {err}", path.display()))
        })?;
        let config: Config = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), SimError> {
        if self.population.num_age_groups_pop == 0 {
            return Err(SimError::ConfigError(
                "num_age_groups_pop must be positive".to_string(),
            ));
        }
        if self.population.num_age_groups_hh == 0 {
            return Err(SimError::ConfigError(
                "num_age_groups_hh must be positive".to_string(),
            ));
        }
        if self.simulation.influx_period_in_days == 0 {
            return Err(SimError::ConfigError(
                "influx_period_in_days must be positive".to_string(),
            ));
        }
        if let PreSymptomaticConfig::Categorical { values, weights } = &self.disease.pre_symptomatic
        {
            if values.len() != weights.len() || values.is_empty() {
                return Err(SimError::ConfigError(
                    "categorical pre_symptomatic distribution needs matching, non-empty \
                     values and weights"
                        .to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    pub start_date: String,
    pub end_date: String,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub initial_influx: usize,
    #[serde(default)]
    pub num_influx_per_period: usize,
    #[serde(default = "default_influx_period")]
    pub influx_period_in_days: u64,
    #[serde(default)]
    pub terminate_on_zero_infected: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PopulationConfig {
    pub initial_population: PathBuf,
    pub event_log: PathBuf,
    pub num_age_groups_pop: usize,
    pub num_age_groups_hh: usize,
    #[serde(default = "default_age_child_limit")]
    pub age_child_limit: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiseaseConfig {
    pub pre_symptomatic: PreSymptomaticConfig,
    pub beta_household: StateWeights,
    pub beta_population: StateWeights,
    pub pop_matrix: PathBuf,
    pub hh_matrix: PathBuf,
    pub hh_matrix_children: PathBuf,
    #[serde(default = "default_child_susceptibility")]
    pub child_susceptibility: f64,
    #[serde(default)]
    pub remove_deceased_from_household: bool,
}

/// Per-infectious-state transmissibility weights.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StateWeights {
    pub infected: f64,
    pub asymptomatic: f64,
    pub symptomatic: f64,
}

/// Distribution of the pre-symptomatic duration, in days.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PreSymptomaticConfig {
    Categorical { values: Vec<f64>, weights: Vec<f64> },
    Gamma { shape: f64, scale: f64 },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    pub enabled: bool,
    pub report_period_in_days: u64,
    pub log_level: Vec<String>,
    pub sink: SinkConfig,
    pub state_change_log: Option<PathBuf>,
    pub transmission_log: Option<PathBuf>,
    pub summary_log: Option<PathBuf>,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        ReporterConfig {
            enabled: true,
            report_period_in_days: 7,
            log_level: vec!["info".to_string(), "error".to_string()],
            sink: SinkConfig::Console,
            state_change_log: None,
            transmission_log: None,
            summary_log: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkConfig {
    Console,
    File { path: PathBuf },
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_influx_period() -> u64 {
    1
}

fn default_age_child_limit() -> u32 {
    18
}

fn default_child_susceptibility() -> f64 {
    0.5
}
