//! # Error Handling
//!
//! Failure types surfaced by the integration core. Remote calls produce a
//! [`TransportError`]; form checks produce a [`ValidationError`]; the initial
//! data load collapses to [`LoadError`]. Flows catch all of these at their
//! boundary and fold them into notices and form state; nothing escapes to a
//! global handler, and nothing is retried.

use thiserror::Error;

/// A remote call that did not produce a decoded success body.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request never completed (DNS, connect, TLS, body I/O).
    #[error("{operation} request failed: {source}")]
    Request {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("{operation} returned status {status}")]
    Status {
        operation: &'static str,
        status: u16,
        /// Structured `message` from the error body, when one was present
        message: Option<String>,
    },

    /// The success body could not be decoded into the expected shape.
    #[error("{operation} returned an undecodable body: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl TransportError {
    /// Operation label the failure was recorded under.
    pub fn operation(&self) -> &'static str {
        match self {
            TransportError::Request { operation, .. }
            | TransportError::Status { operation, .. }
            | TransportError::Decode { operation, .. } => operation,
        }
    }

    /// Message supplied by the service, if the error body carried one.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            TransportError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Text fit for a notice: the remote message when present, otherwise
    /// `fallback`. Call sites must prefer this over their own wording so the
    /// backend's explanation is never dropped.
    pub fn user_message(&self, fallback: &str) -> String {
        match self.remote_message() {
            Some(message) => message.to_string(),
            None => fallback.to_string(),
        }
    }
}

/// Form input rejected before any network call was made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Collapse a list of findings into the single combined message shown to
    /// the user.
    pub fn from_issues(issues: Vec<String>) -> Self {
        Self {
            message: issues.join("; "),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The initial data load failed. The user sees one generic line; the
/// underlying cause goes to the log only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Failed to load integration data")]
pub struct LoadError;

/// Sum of the failure kinds a flow boundary can produce.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Load(#[from] LoadError),
}
