use std::fmt;

/// Disease state of an individual.
///
/// `Infected` is the pre-symptomatic stage between incubation and the
/// symptomatic/asymptomatic branch. Susceptible individuals only leave the
/// state via transmission; `Recovered` and `Died` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiseaseState {
    Susceptible,
    Exposed,
    Infected,
    Asymptomatic,
    Symptomatic,
    Hospitalized,
    Recovered,
    Died,
}

impl DiseaseState {
    pub const COUNT: usize = 8;

    pub const ALL: [DiseaseState; DiseaseState::COUNT] = [
        DiseaseState::Susceptible,
        DiseaseState::Exposed,
        DiseaseState::Infected,
        DiseaseState::Asymptomatic,
        DiseaseState::Symptomatic,
        DiseaseState::Hospitalized,
        DiseaseState::Recovered,
        DiseaseState::Died,
    ];

    /// The three states that exert infection pressure.
    pub const INFECTIOUS: [DiseaseState; 3] = [
        DiseaseState::Infected,
        DiseaseState::Asymptomatic,
        DiseaseState::Symptomatic,
    ];

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Position of an infectious state within [`DiseaseState::INFECTIOUS`];
    /// `None` for non-infectious states.
    #[must_use]
    pub fn infectious_index(self) -> Option<usize> {
        match self {
            DiseaseState::Infected => Some(0),
            DiseaseState::Asymptomatic => Some(1),
            DiseaseState::Symptomatic => Some(2),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_infectious(self) -> bool {
        self.infectious_index().is_some()
    }

    /// Terminal states never schedule a further transition.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, DiseaseState::Recovered | DiseaseState::Died)
    }

    /// Short label used in reports and CSV records.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            DiseaseState::Susceptible => "SUS",
            DiseaseState::Exposed => "EXP",
            DiseaseState::Infected => "INF",
            DiseaseState::Asymptomatic => "ASY",
            DiseaseState::Symptomatic => "SYM",
            DiseaseState::Hospitalized => "HOS",
            DiseaseState::Recovered => "REC",
            DiseaseState::Died => "DIE",
        }
    }
}

impl fmt::Display for DiseaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
