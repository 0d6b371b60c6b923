//! Library error types
//!
//! Every failure the streaming display controller can report. Each variant
//! halts the call that produced it; none of them poison the render pass or
//! the process.

use crate::identity::SlotIdentity;

/// Result alias used throughout the library
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while resolving, accumulating or dispatching slot updates
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Another slot already claimed this user key during the current pass
    #[error("duplicate key '{key}': another element in this render pass already uses it")]
    DuplicateKey { key: String },

    /// Two different slots hashed to the same identity in one pass
    #[error("duplicate identity for component '{component}': pass a unique `key` to tell the elements apart")]
    DuplicateIdentity { component: String },

    /// A fragment could not be turned into text
    ///
    /// `accumulated` holds everything appended before the offending fragment.
    #[error("unsupported fragment {offending}: fragments must be UTF-8 text")]
    InvalidFragment {
        offending: String,
        accumulated: String,
    },

    /// A component argument could not be represented as JSON
    #[error("could not convert component argument '{argument}' to JSON")]
    Serialization {
        argument: String,
        #[source]
        source: serde_json::Error,
    },

    /// A multi-fragment stream was started without a stable key
    #[error("streaming into '{component}' requires a stable `key`")]
    MissingKey { component: String },

    /// A submission would have shown content going backward
    #[error("update for {slot} would shrink content from {previous} to {next} bytes")]
    ContentRegressed {
        slot: SlotIdentity,
        previous: usize,
        next: usize,
    },

    /// The upstream fragment transport failed
    #[error("fragment transport failed: {0}")]
    Transport(String),
}

impl Error {
    /// Content accumulated before a stream failed, if the failure carries any
    pub fn partial_content(&self) -> Option<&str> {
        match self {
            Error::InvalidFragment { accumulated, .. } => Some(accumulated),
            _ => None,
        }
    }
}
