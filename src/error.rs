use thiserror::Error;

/// Errors that can occur while loading an event log or driving a replay.
#[derive(Error, Debug)]
pub enum ReplayError {
    /// A required column was missing from the header, or a value in it could
    /// not be parsed to its semantic type.
    #[error("malformed input at row {row}, column `{column}`: {reason}")]
    MalformedInput {
        row: usize,
        column: String,
        reason: String,
    },

    /// The event log parsed successfully but contained zero events.
    #[error("event log is empty")]
    EmptyLog,

    /// `ReplayDriver::run` was called more than once on the same instance.
    #[error("replay has already been run")]
    AlreadyRun,

    /// Underlying CSV/IO failure while reading the source.
    #[error("failed to read event log: {0}")]
    Io(#[from] csv::Error),

    /// A configuration parameter (frequency, Dual Thrust coefficients,
    /// trading window) violated its validity constraint.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
