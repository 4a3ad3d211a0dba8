//! Error types for the schedule request function.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Message returned when the extraction output cannot be decoded.
pub const RESPONSE_FORMAT_MESSAGE: &str =
    "Sorry, I had trouble understanding the format of the response.";

/// Message returned when an understood event is missing details.
pub const INCOMPLETE_EXTRACTION_MESSAGE: &str =
    "I understood the event, but was missing some details. Please specify a full date and time.";

/// Message returned for every server-side failure.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "An unexpected error occurred. Please check the server logs.";

/// Errors that can occur while handling a schedule request.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed request body
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Extraction service call failed or timed out
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// Extraction output was not valid JSON
    #[error("Response format error: {0}")]
    ResponseFormat(String),

    /// Extraction understood an event but left required fields out
    #[error("Incomplete extraction: missing {0:?}")]
    IncompleteExtraction(Vec<&'static str>),

    /// Extraction service reported it could not understand the request
    #[error("Request not understood: {0}")]
    Understood(String),

    /// Calendar service call failed
    #[error("Calendar insert failed: {0}")]
    CalendarInsert(String),

    /// AWS SDK error
    #[error("AWS error: {0}")]
    Aws(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get HTTP status code for this error.
    ///
    /// Soft failures (the request was understood but underspecified) are 200.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidInput(_) => 400,
            Error::IncompleteExtraction(_) | Error::Understood(_) => 200,
            _ => 500,
        }
    }

    /// Message safe to show the caller. Low-level causes never leave the process.
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidInput(message) | Error::Understood(message) => message.clone(),
            Error::IncompleteExtraction(_) => INCOMPLETE_EXTRACTION_MESSAGE.to_string(),
            Error::ResponseFormat(_) => RESPONSE_FORMAT_MESSAGE.to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    /// Whether this is a server-side failure that should be logged as an error.
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::InvalidInput("x".into()).status_code(), 400);
        assert_eq!(Error::IncompleteExtraction(vec!["date"]).status_code(), 200);
        assert_eq!(Error::Understood("x".into()).status_code(), 200);
        assert_eq!(Error::Extraction("x".into()).status_code(), 500);
        assert_eq!(Error::ResponseFormat("x".into()).status_code(), 500);
        assert_eq!(Error::CalendarInsert("x".into()).status_code(), 500);
    }

    #[test]
    fn test_calendar_failure_does_not_leak_cause() {
        let err = Error::CalendarInsert("403 Forbidden: token for sa@project.iam".into());
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
        assert!(err.is_server_error());
    }

    #[test]
    fn test_understood_message_passes_through() {
        let err = Error::Understood("Please be more specific.".into());
        assert_eq!(err.user_message(), "Please be more specific.");
        assert!(!err.is_server_error());
    }
}
