//! Error handling for the Take It client

use std::fmt;
use thiserror::Error;

use crate::models::Field;

/// Unified error type for the Take It client
#[derive(Error, Debug)]
pub enum Error {
    /// Network or HTTP related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Access token could not be read
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A non-success response from the backend
    #[error("API error: {message} (Status: {status})")]
    Api {
        status: reqwest::StatusCode,
        message: String,
    },

    /// Object storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// A required form field is missing or malformed; nothing was written
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A conditional write matched no row in the expected state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The addressed row does not exist or is not visible to the caller
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new authentication error
    pub fn auth<T: fmt::Display>(msg: T) -> Self {
        Error::Auth(msg.to_string())
    }

    /// Create a new storage error
    pub fn storage<T: fmt::Display>(msg: T) -> Self {
        Error::Storage(msg.to_string())
    }

    /// Create a new conflict error
    pub fn conflict<T: fmt::Display>(msg: T) -> Self {
        Error::Conflict(msg.to_string())
    }

    /// Create a new not-found error
    pub fn not_found<T: fmt::Display>(msg: T) -> Self {
        Error::NotFound(msg.to_string())
    }

    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// Message suitable for inline display next to the failed action
    pub fn user_message(&self) -> String {
        match self {
            Error::Api { message, .. } => message.clone(),
            Error::Validation(err) => err.to_string(),
            Error::Conflict(msg) | Error::NotFound(msg) | Error::Auth(msg) | Error::Storage(msg) => {
                msg.clone()
            }
            other => other.to_string(),
        }
    }
}

/// Submit-time validation failure of the request form
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(Field),

    #[error("price must be a non-negative number, got {0:?}")]
    InvalidPrice(String),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
