//! Error types for touch-sentinel.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by framing, model loading, enrollment and training.
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed input data: {0}")]
    DataFormat(String),

    #[error("no reference session enrolled for identity `{identity}`")]
    MissingReference { identity: String },

    #[error("reference session for identity `{identity}` is unusable: {reason}")]
    InvalidReference { identity: String, reason: String },

    #[error("model shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: String, found: String },

    /// `requested` is the number of sampler draws, or 0 when no draw count applies.
    #[error("insufficient pair data: {}", pair_shortfall(.requested, .yielded))]
    InsufficientPairData { requested: usize, yielded: usize },

    #[error("model artifact rejected: {0}")]
    Artifact(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

fn pair_shortfall(requested: &usize, yielded: &usize) -> String {
    if *requested == 0 {
        format!("no training pairs supplied ({} yielded)", yielded)
    } else {
        format!("requested {} draws, yielded {} pairs", requested, yielded)
    }
}

/// Coarse classification used at a serving boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller sent something unusable.
    BadInput,
    /// Identity is not (or not properly) enrolled.
    Enrollment,
    /// Model, config or filesystem is broken on the service side.
    Misconfigured,
    /// Too few sessions to train or evaluate on.
    TrainingData,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::BadInput => "bad_input",
            ErrorKind::Enrollment => "enrollment",
            ErrorKind::Misconfigured => "misconfigured",
            ErrorKind::TrainingData => "training_data",
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DataFormat(_) | Error::Json(_) => ErrorKind::BadInput,
            Error::MissingReference { .. } | Error::InvalidReference { .. } => {
                ErrorKind::Enrollment
            }
            Error::ShapeMismatch { .. } | Error::Artifact(_) | Error::Config(_) | Error::Io(_) => {
                ErrorKind::Misconfigured
            }
            Error::InsufficientPairData { .. } => ErrorKind::TrainingData,
        }
    }

    /// True when the failure is attributable to the request rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::BadInput | ErrorKind::Enrollment)
    }

    pub(crate) fn data(msg: impl Into<String>) -> Self {
        Error::DataFormat(msg.into())
    }

    pub(crate) fn shape(expected: impl std::fmt::Display, found: impl std::fmt::Display) -> Self {
        Error::ShapeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}
