//! Error types for submission, polling and single backend calls.

use std::time::Duration;

use thiserror::Error;

/// Failure of one request against the backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// Connection, timeout or body read failures.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-2xx status.
    #[error("HTTP error with status {status}: {body}")]
    Status { status: u16, body: String },

    /// A 2xx body that did not match the expected shape.
    #[error("Decoding error: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn from_reqwest(source: reqwest::Error) -> Self {
        if let Some(status) = source.status() {
            return BackendError::Status { status: status.as_u16(), body: source.to_string() };
        }
        if source.is_decode() {
            return BackendError::Decode(source.to_string());
        }
        let message = if source.is_timeout() {
            "request timed out".to_string()
        } else if source.is_connect() {
            format!("connection failed: {source}")
        } else {
            source.to_string()
        };
        BackendError::Transport(message)
    }
}

pub const PAYMENT_REQUIRED: u16 = 402;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmissionError {
    /// Rejected client-side; no request was sent.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Transport error: {0}")]
    Transport(String),

    /// Subscription inactive or credits exhausted.
    #[error("Subscription required or insufficient credits: {body}")]
    PaymentRequired { body: String },

    #[error("Server rejected request with status {status}: {body}")]
    ServerRejected { status: u16, body: String },

    #[error("Decoding error: {0}")]
    Decode(String),
}

impl SubmissionError {
    pub fn is_payment_required(&self) -> bool {
        matches!(self, SubmissionError::PaymentRequired { .. })
    }
}

impl From<BackendError> for SubmissionError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Transport(msg) => SubmissionError::Transport(msg),
            BackendError::Status { status: PAYMENT_REQUIRED, body } => {
                SubmissionError::PaymentRequired { body }
            }
            BackendError::Status { status, body } => SubmissionError::ServerRejected { status, body },
            BackendError::Decode(msg) => SubmissionError::Decode(msg),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PollError {
    /// The deadline passed before any status could be read.
    #[error("Polling timed out after {after:?} without a status")]
    TimedOut { after: Duration, last_error: Option<String> },

    #[error("Polling cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum PollConfigError {
    #[error("poll interval must be greater than zero")]
    ZeroInterval,

    #[error("poll deadline must be greater than zero")]
    ZeroDeadline,
}

/// Either half of a submit-then-poll run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RunError {
    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    Poll(#[from] PollError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_402_is_payment_required() {
        let e: SubmissionError =
            BackendError::Status { status: 402, body: "{\"error\":\"no credits\"}".into() }.into();
        assert!(e.is_payment_required());
    }

    #[test]
    fn test_other_status_is_server_rejected() {
        let e: SubmissionError = BackendError::Status { status: 422, body: "bad".into() }.into();
        assert_eq!(e, SubmissionError::ServerRejected { status: 422, body: "bad".into() });
    }

    #[test]
    fn test_transport_maps_through() {
        let e: SubmissionError = BackendError::Transport("reset".into()).into();
        assert_eq!(e, SubmissionError::Transport("reset".into()));
    }
}
