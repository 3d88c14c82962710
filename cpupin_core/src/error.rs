//! Unified error handling for cpupin
//!
//! One error type shared by the engine, the preload library and the monitor,
//! so every surface reports failures consistently.

use thiserror::Error;

/// Main error type for cpupin operations
#[derive(Debug, Error)]
pub enum PinError {
    /// I/O related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors (bad specification, table construction failure)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Parse errors (malformed tokens, malformed stat content)
    #[error("Parse error: {0}")]
    Parse(String),

    /// A genuine primitive could not be resolved at load time
    #[error("Unresolved symbol: {0}")]
    Symbol(String),
}

/// Convenience type alias for Results using PinError
pub type PinResult<T> = std::result::Result<T, PinError>;

impl From<std::num::ParseIntError> for PinError {
    fn from(err: std::num::ParseIntError) -> Self {
        PinError::Parse(format!("Integer parse error: {}", err))
    }
}

// Helper methods
impl PinError {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(msg: S) -> Self {
        PinError::Config(msg.into())
    }

    /// Create a parse error with a custom message
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        PinError::Parse(msg.into())
    }

    /// Create an unresolved-symbol error
    pub fn symbol<S: Into<String>>(name: S) -> Self {
        PinError::Symbol(name.into())
    }
}
