//! Error types for the plangraph crate

use thiserror::Error;

/// Main error type for the plangraph crate
///
/// Keys are rendered with their `Debug` representation so the error type stays
/// independent of the concrete key types a graph is instantiated with.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("state {state} is already present in the plan graph")]
    DuplicateState { state: String },

    #[error("action {action} is already recorded for state {state}")]
    DuplicateAction { state: String, action: String },

    #[error("transition {state} --{action}--> {result} is already recorded")]
    DuplicateTransition {
        state: String,
        action: String,
        result: String,
    },

    #[error("state {state} is missing from the plan graph")]
    MissingState { state: String },

    #[error("action {action} is missing for state {state}")]
    MissingAction { state: String, action: String },

    #[error("transition {state} --{action}--> {result} is missing")]
    MissingTransition {
        state: String,
        action: String,
        result: String,
    },

    #[error("state {state} is not complete but every one of its actions is complete")]
    NoSelectableAction { state: String },

    #[error("action {action} of state {state} is not complete but every successor is complete")]
    AllSuccessorsComplete { state: String, action: String },

    #[error("root state {state} is not present in the plan graph")]
    UnknownRoot { state: String },

    #[error("transition probability {value} must lie in (0, 1]")]
    InvalidProbability { value: f64 },

    #[error("{collaborator} failed: {message}")]
    Collaborator {
        collaborator: String,
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("failed to {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("progress bar template error: {message}")]
    ProgressBarTemplate { message: String },

    #[error("failed to build worker pool: {message}")]
    ThreadPool { message: String },
}

/// Convenience type alias for Results using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a collaborator failure for the named external component.
    pub fn collaborator(collaborator: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Collaborator {
            collaborator: collaborator.into(),
            message: message.into(),
        }
    }

    /// Whether this error reports a broken graph invariant rather than an
    /// external or configuration failure.
    pub fn is_consistency_violation(&self) -> bool {
        matches!(
            self,
            Error::DuplicateState { .. }
                | Error::DuplicateAction { .. }
                | Error::DuplicateTransition { .. }
                | Error::MissingState { .. }
                | Error::MissingAction { .. }
                | Error::MissingTransition { .. }
                | Error::NoSelectableAction { .. }
                | Error::AllSuccessorsComplete { .. }
                | Error::UnknownRoot { .. }
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io {
            operation: "IO operation".to_string(),
            source,
        }
    }
}

pub(crate) fn key_string<K: std::fmt::Debug>(key: &K) -> String {
    format!("{key:?}")
}
