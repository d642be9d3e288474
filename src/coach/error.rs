//! Classified failures of a coach request

use thiserror::Error;

/// Why a question did not produce an answer.
///
/// The session treats every kind the same way; the distinction only matters
/// for logs and tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AskError {
    /// Rejected locally, nothing was sent
    #[error("invalid question: {0}")]
    InvalidInput(String),
    /// Transport failure, timeout or non-success status
    #[error("coach endpoint unreachable: {0}")]
    Unreachable(String),
    /// The exchange succeeded but the body carried no usable answer
    #[error("malformed coach response: {0}")]
    MalformedResponse(String),
}

impl AskError {
    /// Short label for structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            AskError::InvalidInput(_) => "invalid_input",
            AskError::Unreachable(_) => "unreachable",
            AskError::MalformedResponse(_) => "malformed_response",
        }
    }
}
