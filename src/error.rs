use thiserror::Error;

use crate::models::Stream;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The data source has no table for a required stream.
    #[error("missing stream: {0}")]
    MissingStream(Stream),

    /// The table exists but holds no records.
    #[error("stream {0} has no records")]
    EmptyStream(Stream),

    /// A reading that cannot be scored (zero denominator, negative count,
    /// physically impossible value).
    #[error("invalid indicator {field}: {reason}")]
    InvalidIndicator { field: &'static str, reason: String },

    /// Synthetic data generation could not be configured.
    #[error("generator error: {0}")]
    Generator(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidIndicator {
            field,
            reason: reason.into(),
        }
    }
}
