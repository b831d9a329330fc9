use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // State machine errors
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // Display layout errors
    #[error("Invalid display line {line} (max {max})")]
    InvalidLine { line: usize, max: usize },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing configuration key: {0}")]
    MissingConfig(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
