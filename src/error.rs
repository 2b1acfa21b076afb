use std::fmt;
use std::fmt::Display;

/// Crate-wide error type.
///
/// Configuration problems (missing files, malformed matrices, unparseable
/// dates) are fatal and surface at startup through this type. Per-event
/// replay failures are also represented here but are caught and counted by
/// the caller instead of aborting the run.
#[derive(Debug)]
pub enum SimError {
    IoError(std::io::Error),
    JsonError(serde_json::Error),
    CsvError(csv::Error),
    DateError(chrono::ParseError),
    ConfigError(String),
    EventError(String),
    NotFound(String),
}

impl Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::IoError(err) => write!(f, "IO error: {err}"),
            SimError::JsonError(err) => write!(f, "JSON error: {err}"),
            SimError::CsvError(err) => write!(f, "CSV error: {err}"),
            SimError::DateError(err) => write!(f, "date parse error: {err}"),
            SimError::ConfigError(msg) => write!(f, "configuration error: {msg}"),
            SimError::EventError(msg) => write!(f, "event error: {msg}"),
            SimError::NotFound(msg) => write!(f, "not found: {msg}"),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimError::IoError(err) => Some(err),
            SimError::JsonError(err) => Some(err),
            SimError::CsvError(err) => Some(err),
            SimError::DateError(err) => Some(err),
            SimError::ConfigError(_) | SimError::EventError(_) | SimError::NotFound(_) => None,
        }
    }
}

impl From<std::io::Error> for SimError {
    fn from(err: std::io::Error) -> Self {
        SimError::IoError(err)
    }
}

impl From<serde_json::Error> for SimError {
    fn from(err: serde_json::Error) -> Self {
        SimError::JsonError(err)
    }
}

impl From<csv::Error> for SimError {
    fn from(err: csv::Error) -> Self {
        SimError::CsvError(err)
    }
}

impl From<chrono::ParseError> for SimError {
    fn from(err: chrono::ParseError) -> Self {
        SimError::DateError(err)
    }
}
