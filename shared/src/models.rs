//! Shared data models.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Inbound schedule request payload.
#[derive(Debug, Deserialize, Validate)]
pub struct ScheduleRequest {
    #[validate(custom(function = "not_blank"))]
    pub text: String,
}

fn not_blank(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Outcome reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Response body returned for every non-preflight request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleResponse {
    pub status: ResponseStatus,
    pub message: String,
}

impl ScheduleResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: message.into(),
        }
    }
}

/// Start or end of a calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    /// Local date-time without offset, e.g. `2025-06-02T15:00:00`
    pub date_time: String,
    /// IANA time zone name
    pub time_zone: String,
}

/// Event body sent to the calendar service's insert operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEventPayload {
    pub summary: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
}

/// Subset of the calendar service's insert reply.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertedEvent {
    pub id: String,
    pub html_link: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_text_fails_validation() {
        let request: ScheduleRequest = serde_json::from_str(r#"{"text": "   "}"#).unwrap();
        assert!(request.validate().is_err());

        let request: ScheduleRequest = serde_json::from_str(r#"{"text": "lunch at noon"}"#).unwrap();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_payload_serializes_with_calendar_field_names() {
        let payload = CalendarEventPayload {
            summary: "meeting".to_string(),
            start: EventDateTime {
                date_time: "2025-06-02T15:00:00".to_string(),
                time_zone: "America/Phoenix".to_string(),
            },
            end: EventDateTime {
                date_time: "2025-06-02T16:00:00".to_string(),
                time_zone: "America/Phoenix".to_string(),
            },
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["start"]["dateTime"], "2025-06-02T15:00:00");
        assert_eq!(value["end"]["timeZone"], "America/Phoenix");
    }

    #[test]
    fn test_response_status_lowercase() {
        let json = serde_json::to_string(&ScheduleResponse::success("done")).unwrap();
        assert_eq!(json, r#"{"status":"success","message":"done"}"#);
    }
}
