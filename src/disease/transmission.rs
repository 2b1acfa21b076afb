/*!

The two-tier transmission model.

For every susceptible individual, every day, two escape probabilities are
computed: escaping infection from infectious household members (weighted by
the household contact matrices) and escaping infection pressure from the
population at large (weighted by the population contact matrix and the
per-state transmissibility weights). Infection occurs when a uniform draw
falls below the combined probability.

Contact matrices are loaded once at startup and are immutable for the run.

*/

use std::path::Path;

use chrono::NaiveDate;

use crate::SimError;
use crate::config::{DiseaseConfig, StateWeights};
use crate::disease::DiseaseState;
use crate::population::{Household, Individual, PopulationSummary, Sex};
use crate::random::SimRng;

/// Population-level contact matrix: a plain numeric grid over population
/// age-groups.
#[derive(Debug)]
pub struct PopulationContactMatrix {
    values: Vec<Vec<f64>>,
}

impl PopulationContactMatrix {
    /// Loads a comma-delimited numeric grid and checks it against the
    /// configured age-group count.
    pub fn from_file(path: &Path, dimension: usize) -> Result<PopulationContactMatrix, SimError> {
        let mut reader = open_matrix(path)?;
        let mut values = Vec::with_capacity(dimension);
        for record in reader.records() {
            let record = record?;
            let row: Vec<f64> = record
                .iter()
                .map(|field| parse_value(field, path))
                .collect::<Result<_, _>>()?;
            values.push(row);
        }
        check_dimensions(values.len(), values.iter().map(Vec::len), dimension, path)?;
        Ok(PopulationContactMatrix { values })
    }

    /// Contact intensity between the 1-based target and source age-groups.
    #[must_use]
    pub fn get(&self, target_age_group: u8, source_age_group: u8) -> f64 {
        self.values[usize::from(target_age_group) - 1][usize::from(source_age_group) - 1]
    }

    #[cfg(test)]
    pub(crate) fn uniform(dimension: usize, value: f64) -> PopulationContactMatrix {
        PopulationContactMatrix {
            values: vec![vec![value; dimension]; dimension],
        }
    }
}

/// Household contact matrix: household age-group × household age-group, with
/// a 2×2 sex block per cell (female first).
#[derive(Debug)]
pub struct HouseholdContactMatrix {
    cells: Vec<Vec<[[f64; 2]; 2]>>,
}

impl HouseholdContactMatrix {
    /// Loads the compact household encoding: a cell is either a single value
    /// broadcast to all four sex pairs, or four colon-separated values in
    /// female-female, female-male, male-female, male-male order.
    pub fn from_file(path: &Path, dimension: usize) -> Result<HouseholdContactMatrix, SimError> {
        let mut reader = open_matrix(path)?;
        let mut cells = Vec::with_capacity(dimension);
        for record in reader.records() {
            let record = record?;
            let row: Vec<[[f64; 2]; 2]> = record
                .iter()
                .map(|field| parse_cell(field, path))
                .collect::<Result<_, _>>()?;
            cells.push(row);
        }
        check_dimensions(cells.len(), cells.iter().map(Vec::len), dimension, path)?;
        Ok(HouseholdContactMatrix { cells })
    }

    /// Contact intensity between the 1-based target and source household
    /// age-groups for the given sex pair.
    #[must_use]
    pub fn get(
        &self,
        target_age_group: u8,
        source_age_group: u8,
        target_sex: Sex,
        source_sex: Sex,
    ) -> f64 {
        self.cells[usize::from(target_age_group) - 1][usize::from(source_age_group) - 1]
            [target_sex.index()][source_sex.index()]
    }

    #[cfg(test)]
    pub(crate) fn uniform(dimension: usize, value: f64) -> HouseholdContactMatrix {
        HouseholdContactMatrix {
            cells: vec![vec![[[value; 2]; 2]; dimension]; dimension],
        }
    }
}

fn open_matrix(path: &Path) -> Result<csv::Reader<std::fs::File>, SimError> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|err| {
            SimError::ConfigError(format!("cannot read matrix '{}': {err}", path.display()))
        })
}

fn parse_value(field: &str, path: &Path) -> Result<f64, SimError> {
    field.parse::<f64>().map_err(|err| {
        SimError::ConfigError(format!(
            "invalid matrix value '{field}' in '{}': {err}",
            path.display()
        ))
    })
}

fn parse_cell(field: &str, path: &Path) -> Result<[[f64; 2]; 2], SimError> {
    let parts: Vec<&str> = field.split(':').collect();
    let values: Vec<f64> = match parts.len() {
        1 => vec![parse_value(parts[0], path)?; 4],
        4 => parts
            .iter()
            .map(|part| parse_value(part, path))
            .collect::<Result<_, _>>()?,
        n => {
            return Err(SimError::ConfigError(format!(
                "matrix cell '{field}' in '{}' has {n} values, expected 1 or 4",
                path.display()
            )));
        }
    };
    Ok([[values[0], values[1]], [values[2], values[3]]])
}

fn check_dimensions(
    rows: usize,
    row_lengths: impl Iterator<Item = usize>,
    dimension: usize,
    path: &Path,
) -> Result<(), SimError> {
    if rows != dimension {
        return Err(SimError::ConfigError(format!(
            "matrix '{}' has {rows} rows, expected {dimension}",
            path.display()
        )));
    }
    for (index, length) in row_lengths.enumerate() {
        if length != dimension {
            return Err(SimError::ConfigError(format!(
                "matrix '{}' row {index} has {length} columns, expected {dimension}",
                path.display()
            )));
        }
    }
    Ok(())
}

/// Result of a single transmission evaluation. The escape probabilities are
/// carried along for the transmission log.
#[derive(Debug, Clone, Copy)]
pub struct TransmissionOutcome {
    pub occurred: bool,
    pub household_escape: f64,
    pub population_escape: f64,
}

pub struct Transmission {
    beta_household: StateWeights,
    beta_population: StateWeights,
    pop_contact: PopulationContactMatrix,
    hh_contact: HouseholdContactMatrix,
    hh_contact_children: HouseholdContactMatrix,
    child_susceptibility: f64,
}

impl Transmission {
    pub fn new(
        config: &DiseaseConfig,
        num_age_groups_pop: usize,
        num_age_groups_hh: usize,
    ) -> Result<Transmission, SimError> {
        Ok(Transmission {
            beta_household: config.beta_household,
            beta_population: config.beta_population,
            pop_contact: PopulationContactMatrix::from_file(
                &config.pop_matrix,
                num_age_groups_pop,
            )?,
            hh_contact: HouseholdContactMatrix::from_file(&config.hh_matrix, num_age_groups_hh)?,
            hh_contact_children: HouseholdContactMatrix::from_file(
                &config.hh_matrix_children,
                num_age_groups_hh,
            )?,
            child_susceptibility: config.child_susceptibility,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_matrices(
        beta_household: StateWeights,
        beta_population: StateWeights,
        pop_contact: PopulationContactMatrix,
        hh_contact: HouseholdContactMatrix,
        hh_contact_children: HouseholdContactMatrix,
        child_susceptibility: f64,
    ) -> Transmission {
        Transmission {
            beta_household,
            beta_population,
            pop_contact,
            hh_contact,
            hh_contact_children,
            child_susceptibility,
        }
    }

    /// Decides whether transmission reaches the susceptible individual
    /// today. One uniform draw per evaluation; infection occurs iff the draw
    /// is strictly below the infection probability.
    pub fn evaluate(
        &self,
        individual: &Individual,
        household: &Household,
        summary: &PopulationSummary,
        date: NaiveDate,
        age_child_limit: u32,
        rng: &mut SimRng,
    ) -> TransmissionOutcome {
        let draw = rng.uniform();
        let (probability, household_escape, population_escape) =
            self.infection_probability(individual, household, summary, date, age_child_limit);
        TransmissionOutcome {
            occurred: draw < probability,
            household_escape,
            population_escape,
        }
    }

    /// The infection probability and both escape probabilities, without
    /// consuming randomness.
    #[must_use]
    pub fn infection_probability(
        &self,
        individual: &Individual,
        household: &Household,
        summary: &PopulationSummary,
        date: NaiveDate,
        age_child_limit: u32,
    ) -> (f64, f64, f64) {
        let household_escape = self.household_escape(individual, household);
        let population_escape = self.population_escape(individual, summary);
        let susceptibility = if individual.is_child(date, age_child_limit) {
            self.child_susceptibility
        } else {
            1.0
        };
        let probability = susceptibility * (1.0 - household_escape * population_escape);
        (probability, household_escape, population_escape)
    }

    /// Probability of escaping infection from infectious household members:
    /// `∏ (1 - β_state)^contacts_state` over the three infectious states,
    /// with contacts weighted by the matrix entry for the (age-group, sex)
    /// pair. Households with children use the children variant of the
    /// matrix.
    #[must_use]
    pub fn household_escape(&self, individual: &Individual, household: &Household) -> f64 {
        let matrix = if household.has_children() {
            &self.hh_contact_children
        } else {
            &self.hh_contact
        };

        let mut escape = 1.0;
        for state in DiseaseState::INFECTIOUS {
            let mut contacts = 0.0;
            for (age_group, sex, count) in household.strata_for_state(state) {
                #[allow(clippy::cast_precision_loss)]
                let count = count as f64;
                contacts += count
                    * matrix.get(
                        individual.household_age_group(),
                        age_group,
                        individual.sex(),
                        sex,
                    );
            }
            escape *= (1.0 - weight_for(&self.beta_household, state)).powf(contacts);
        }
        escape
    }

    /// Probability of escaping infection pressure from outside the
    /// household, renormalized for population drift via the per-age-group
    /// size adjustment.
    #[must_use]
    pub fn population_escape(
        &self,
        individual: &Individual,
        summary: &PopulationSummary,
    ) -> f64 {
        let mut escape = 1.0;
        for state in DiseaseState::INFECTIOUS {
            for (age_group, count) in summary.state_counts(state) {
                let beta = self
                    .pop_contact
                    .get(individual.population_age_group(), age_group)
                    * weight_for(&self.beta_population, state)
                    * summary.adjustment(age_group);
                #[allow(clippy::cast_precision_loss)]
                let count = count as f64;
                escape *= (1.0 - beta).powf(count);
            }
        }
        escape
    }
}

fn weight_for(weights: &StateWeights, state: DiseaseState) -> f64 {
    match state {
        DiseaseState::Infected => weights.infected,
        DiseaseState::Asymptomatic => weights.asymptomatic,
        DiseaseState::Symptomatic => weights.symptomatic,
        other => panic!("no transmissibility weight for disease state {other}"),
    }
}
