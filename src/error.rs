//! Error taxonomy for the Salesforce data service.
//!
//! "Not found" is an expected outcome for lookups and carries its own
//! variant so callers can tell it apart from a remote outage.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// No usable credential path, or the handshake with Salesforce failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Network or serialization failure before a remote status was known.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Salesforce rejected the call after authentication.
    #[error("salesforce error {status}: {code} {message}")]
    Remote {
        status: u16,
        code: String,
        message: String,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    /// Schema mutations are permanently unsupported against Salesforce.
    #[error("{0}")]
    NotImplemented(String),
}

impl Error {
    pub fn remote(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Remote {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Status code of the remote rejection, if this error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Transport(format!("invalid JSON payload: {}", err))
    }
}
