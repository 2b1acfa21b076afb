use chrono::NaiveDate;

use crate::disease::DiseaseState;
use crate::{HouseholdId, PersonId};

/// Binary sex, as recorded in the population data.
///
/// Indexing into the sex dimension of household contact matrices follows the
/// data file layout: female first, male second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sex {
    Female,
    Male,
}

impl Sex {
    /// Parses the single-letter code used by the population files.
    /// Anything other than `M` is read as female, mirroring the event data.
    #[must_use]
    pub fn from_code(code: &str) -> Sex {
        if code.trim() == "M" { Sex::Male } else { Sex::Female }
    }

    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Sex::Female => 0,
            Sex::Male => 1,
        }
    }

    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Sex::Female => "F",
            Sex::Male => "M",
        }
    }
}

/// An individual in the population.
///
/// Age groups are the 1-based bracket indices carried by the population
/// files; the population-wide and household-internal grouping schemes are
/// distinct and both are kept. The `household` field is a non-owning
/// back-reference — the household owns the membership list.
#[derive(Debug, Clone)]
pub struct Individual {
    id: PersonId,
    birth_date: NaiveDate,
    sex: Sex,
    disease_state: DiseaseState,
    population_age_group: u8,
    household_age_group: u8,
    household: Option<HouseholdId>,
    household_position: String,
    nursing_home: bool,

    // Scratch attributes owned by the disease model, set on state entry.
    pub(crate) pre_symptomatic_duration: Option<f64>,
    pub(crate) infectious_duration: Option<f64>,
    pub(crate) hospitalized_duration: Option<f64>,
}

impl Individual {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: PersonId,
        birth_date: NaiveDate,
        sex: Sex,
        population_age_group: u8,
        household_age_group: u8,
        household_position: String,
        nursing_home: bool,
    ) -> Individual {
        Individual {
            id,
            birth_date,
            sex,
            disease_state: DiseaseState::Susceptible,
            population_age_group,
            household_age_group,
            household: None,
            household_position,
            nursing_home,
            pre_symptomatic_duration: None,
            infectious_duration: None,
            hospitalized_duration: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> PersonId {
        self.id
    }

    #[must_use]
    pub fn birth_date(&self) -> NaiveDate {
        self.birth_date
    }

    #[must_use]
    pub fn sex(&self) -> Sex {
        self.sex
    }

    #[must_use]
    pub fn disease_state(&self) -> DiseaseState {
        self.disease_state
    }

    pub fn set_disease_state(&mut self, state: DiseaseState) {
        self.disease_state = state;
    }

    #[must_use]
    pub fn population_age_group(&self) -> u8 {
        self.population_age_group
    }

    #[must_use]
    pub fn household_age_group(&self) -> u8 {
        self.household_age_group
    }

    pub fn set_population_age_group(&mut self, age_group: u8) {
        self.population_age_group = age_group;
    }

    pub fn set_household_age_group(&mut self, age_group: u8) {
        self.household_age_group = age_group;
    }

    #[must_use]
    pub fn household(&self) -> Option<HouseholdId> {
        self.household
    }

    pub(crate) fn set_household(&mut self, household: Option<HouseholdId>) {
        self.household = household;
    }

    #[must_use]
    pub fn household_position(&self) -> &str {
        &self.household_position
    }

    pub fn set_household_position(&mut self, position: String) {
        self.household_position = position;
    }

    #[must_use]
    pub fn is_nursing_home_resident(&self) -> bool {
        self.nursing_home
    }

    /// Age in completed years on the given date.
    #[must_use]
    pub fn age(&self, on: NaiveDate) -> u32 {
        on.years_since(self.birth_date).unwrap_or(0)
    }

    #[must_use]
    pub fn is_child(&self, on: NaiveDate, age_child_limit: u32) -> bool {
        self.age(on) < age_child_limit
    }
}
