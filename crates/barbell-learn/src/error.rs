use thiserror::Error;

/// Errors raised by the training and evaluation harness.
#[derive(Debug, Error)]
pub enum LearnError {
    #[error("Unknown feature \"{0}\"")]
    UnknownFeature(String),

    #[error("The {0} split is empty")]
    EmptySplit(&'static str),

    #[error("Participant \"{0}\" does not occur in the table")]
    UnknownParticipant(String),

    #[error("Test fraction must lie strictly between 0 and 1, got {0}")]
    InvalidTestFraction(f64),

    #[error("Length mismatch: expected {expected} values, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Learner failed: {0}")]
    Learner(String),
}

pub type Result<T> = std::result::Result<T, LearnError>;
