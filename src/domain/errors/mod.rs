// Domain errors - Error types shared by the domain and the port contracts

use thiserror::Error;

/// Invalid ladder or pipeline configuration
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ConfigError {
    pub message: String,
}

impl ConfigError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure reported by an external engine behind a port
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The engine process could not be started
    #[error("Failed to start {program}: {message}")]
    Spawn { program: String, message: String },

    /// The engine ran and reported an error
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    /// The engine cannot honor the request
    #[error("Unsupported request: {0}")]
    Unsupported(String),

    /// The engine output could not be interpreted
    #[error("Malformed engine output: {0}")]
    Malformed(String),
}
