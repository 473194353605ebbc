//! Error types for the simulation harness.

use refuge_core::EngineError;
use refuge_env::EnvError;
use thiserror::Error;

/// Errors that abort a simulation run.
#[derive(Debug, Error)]
pub enum SimError {
    /// The engine reported an unrecoverable error
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// The environment model failed
    #[error("Environment error: {0}")]
    Env(#[from] EnvError),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Config file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// File I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
