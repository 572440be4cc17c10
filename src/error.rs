use thiserror::Error;

/// Errors raised by the simulation engine and its store adapters.
///
/// None of these stop the process: a failing intersection is skipped for the
/// current tick and a failing lifecycle callback is dropped.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrafficError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Lane id `{0}` does not name exactly one of the NS/EW axes")]
    InvalidLaneIdentifier(String),

    #[error("Unknown intersection `{0}`")]
    UnknownIntersection(String),

    #[error("Seed file error: {0}")]
    SeedFile(String),
}

impl From<csv::Error> for TrafficError {
    fn from(err: csv::Error) -> Self {
        TrafficError::SeedFile(err.to_string())
    }
}

impl From<std::io::Error> for TrafficError {
    fn from(err: std::io::Error) -> Self {
        TrafficError::SeedFile(err.to_string())
    }
}
