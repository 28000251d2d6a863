use thiserror::Error;

/// Errors raised by the grid environment.
///
/// None of these are retried: they signal a construction-time mistake or a
/// mismatch between the configured topology and what the simulator reports.
#[derive(Error, Debug)]
pub enum GridEnvError {
    /// Missing or out-of-range parameter at construction.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A topology label (edge or node) that does not belong to the grid.
    #[error("invalid edge '{label}': {reason}")]
    InvalidEdge { label: String, reason: String },

    /// A phase change the state machine does not allow.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Relative node lookups only know top, bottom, left and right.
    #[error("unsupported direction '{0}'")]
    UnsupportedDirection(String),

    /// An action outside the declared action space.
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// Failure reported by the external simulator.
    #[error("simulator error: {0}")]
    Simulator(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GridEnvError {
    pub fn config(message: impl Into<String>) -> Self {
        GridEnvError::Configuration(message.into())
    }

    pub fn invalid_edge(label: impl Into<String>, reason: impl Into<String>) -> Self {
        GridEnvError::InvalidEdge {
            label: label.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        GridEnvError::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GridEnvError>;
