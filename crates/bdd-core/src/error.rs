//! Error types for the step library

use std::fmt::Debug;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BddError>;

#[derive(Error, Debug)]
pub enum BddError {
    #[error("{message}")]
    Assertion { message: String },

    #[error("Unsupported HTTP verb: {verb}")]
    UnsupportedVerb { verb: String },

    #[error("Request failed: {reason}")]
    Transport { reason: String },

    #[error("{what}")]
    NotFound { what: String },

    #[error("Command failed: {reason}")]
    Command { reason: String },

    #[error("jq failed: {reason}")]
    JsonQuery { reason: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl BddError {
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion {
            message: message.into(),
        }
    }
}

/// Fail with an assertion error unless `condition` holds.
pub fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(BddError::assertion(message()))
    }
}

/// Fail unless both values are equal. The message, when non-empty, is
/// printed above the expected/actual pair.
pub fn ensure_eq<T>(expected: T, actual: T, message: impl AsRef<str>) -> Result<()>
where
    T: PartialEq + Debug,
{
    if expected == actual {
        return Ok(());
    }
    let message = message.as_ref();
    let prefix = if message.is_empty() {
        String::new()
    } else {
        format!("{message}\n")
    };
    Err(BddError::assertion(format!(
        "{prefix}Failed asserting that two values are equal.\n--- Expected\n{expected:?}\n+++ Actual\n{actual:?}"
    )))
}
