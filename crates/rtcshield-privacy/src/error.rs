//! Privacy error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrivacyError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unknown value: {0}")]
    UnknownValue(String),
}
