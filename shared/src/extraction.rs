//! Event extraction: prompt construction and decoding of the model's reply.
//!
//! The text-generation service is untrusted. Its reply is decoded into an
//! [`ExtractedEvent`] and an `add` result only becomes an [`EventDetails`]
//! once every required field is present and well formed.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use serde_json::Value;
use tracing::debug;

use crate::config::ScheduleConfig;
use crate::models::{CalendarEventPayload, EventDateTime};
use crate::{Error, Result};

/// Message used when the reply carries neither a known action nor a message.
pub const UNRECOGNIZED_MESSAGE: &str = "I couldn't understand that request. Please try rephrasing it.";

const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A text-generation service that answers a prompt with free text.
#[async_trait]
pub trait EventExtractor: Send + Sync {
    /// Send the prompt and return the raw reply text.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Decoded reply from the extraction service.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedEvent {
    /// The model found a scheduling intent.
    Add(EventFields),
    /// The model reported that it could not parse the request.
    Error { message: String },
    /// Valid JSON that matches neither shape.
    Unrecognized { message: Option<String> },
}

/// Fields of an `add` reply as returned by the model, not yet validated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFields {
    pub event_name: Option<String>,
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

/// A fully validated event, ready to be sent to the calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDetails {
    pub event_name: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl ExtractedEvent {
    /// Classify a decoded JSON value by its `action` field.
    pub fn from_value(value: &Value) -> Self {
        match value.get("action").and_then(Value::as_str) {
            Some("add") => ExtractedEvent::Add(EventFields {
                event_name: string_field(value, "event_name"),
                date: string_field(value, "date"),
                start_time: string_field(value, "start_time"),
                end_time: string_field(value, "end_time"),
            }),
            // The model's own message goes back to the caller untouched
            Some("error") => match value.get("message").and_then(Value::as_str) {
                Some(message) => ExtractedEvent::Error {
                    message: message.to_string(),
                },
                None => ExtractedEvent::Unrecognized { message: None },
            },
            _ => ExtractedEvent::Unrecognized {
                message: string_field(value, "message"),
            },
        }
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

impl EventFields {
    /// Validate the fields and resolve start and end instants.
    ///
    /// A missing end time falls back to `default_duration` when one is set.
    /// An explicit end earlier than the start is taken to be on the next day.
    pub fn into_details(self, default_duration: Option<Duration>) -> Result<EventDetails> {
        let mut missing = Vec::new();

        if self.event_name.is_none() {
            missing.push("event_name");
        }
        let date = self.date.as_deref().and_then(parse_date);
        if date.is_none() {
            missing.push("date");
        }
        let start_time = self.start_time.as_deref().and_then(parse_time);
        if start_time.is_none() {
            missing.push("start_time");
        }
        let end_time = match self.end_time.as_deref() {
            Some(raw) => {
                let parsed = parse_time(raw);
                if parsed.is_none() {
                    missing.push("end_time");
                }
                parsed
            }
            None => {
                if default_duration.is_none() {
                    missing.push("end_time");
                }
                None
            }
        };

        let (Some(event_name), Some(date), Some(start_time)) = (self.event_name, date, start_time)
        else {
            return Err(Error::IncompleteExtraction(missing));
        };
        if !missing.is_empty() {
            return Err(Error::IncompleteExtraction(missing));
        }

        let start = date.and_time(start_time);
        let end = match (end_time, default_duration) {
            (Some(end_time), _) => {
                let end = date.and_time(end_time);
                if end < start {
                    end.checked_add_signed(Duration::days(1))
                } else {
                    Some(end)
                }
            }
            (None, Some(duration)) => start.checked_add_signed(duration),
            (None, None) => None,
        };
        let Some(end) = end else {
            return Err(Error::IncompleteExtraction(vec!["end_time"]));
        };

        Ok(EventDetails {
            event_name,
            start,
            end,
        })
    }
}

impl EventDetails {
    /// Build the calendar insert body in the given time zone.
    pub fn to_payload(&self, time_zone: Tz) -> CalendarEventPayload {
        let at = |instant: &NaiveDateTime| EventDateTime {
            date_time: instant.format(DATE_TIME_FORMAT).to_string(),
            time_zone: time_zone.name().to_string(),
        };
        CalendarEventPayload {
            summary: self.event_name.clone(),
            start: at(&self.start),
            end: at(&self.end),
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

/// Remove markdown code fences the model may wrap around its JSON.
pub fn strip_code_fences(raw: &str) -> &str {
    let text = raw.trim();
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    let inner = match inner.split_once('\n') {
        // Opening fence line: nothing or a language tag
        Some((first, rest)) if first.trim().chars().all(|c| c.is_ascii_alphanumeric()) => rest,
        _ => inner
            .strip_prefix("json")
            .or_else(|| inner.strip_prefix("JSON"))
            .unwrap_or(inner),
    };
    inner.trim()
}

/// Decode the model's reply.
///
/// When the cleaned text is not JSON, the outermost `{...}` span is tried
/// before giving up with [`Error::ResponseFormat`].
pub fn parse_extraction(raw: &str) -> Result<ExtractedEvent> {
    let cleaned = strip_code_fences(raw);
    let value: Value = match serde_json::from_str(cleaned) {
        Ok(value) => value,
        Err(e) => {
            let embedded = match (cleaned.find('{'), cleaned.rfind('}')) {
                (Some(start), Some(end)) if start < end => {
                    serde_json::from_str(&cleaned[start..=end]).ok()
                }
                _ => None,
            };
            match embedded {
                Some(value) => {
                    debug!("Recovered JSON object embedded in extraction reply");
                    value
                }
                None => return Err(Error::ResponseFormat(e.to_string())),
            }
        }
    };
    Ok(ExtractedEvent::from_value(&value))
}

/// Build the instruction sent to the extraction service.
pub fn build_prompt(user_input: &str, now: DateTime<Tz>, policy: &ScheduleConfig) -> String {
    let duration_rule = match policy.default_event_duration {
        Some(duration) => format!(
            "- If the user does not specify an end time, assume a default event duration of {} minutes.",
            duration.num_minutes()
        ),
        None => "- If the user does not specify an end time, respond with the 'error' action JSON asking for one."
            .to_string(),
    };

    format!(
        r#"You are a highly intelligent scheduling assistant. Your task is to extract event details from user commands.
The user is in the '{tz}' timezone. All dates and times should be interpreted from this context.
The current date and time is: {now}

User command: "{input}"

Your goal is to extract the event name, date, start time, and end time.
{duration_rule}
- Dates use the format YYYY-MM-DD and times use the 24-hour format HH:MM:SS.
- If you can extract all necessary information, respond with a JSON object.
- If you cannot understand the request, respond with the 'error' action JSON.

Example 1: "Add a meeting tomorrow at 3pm"
Result: {{ "action": "add", "event_name": "meeting", "date": "YYYY-MM-DD", "start_time": "15:00:00", "end_time": "16:00:00" }}

Example 2: "Schedule a dentist appointment on September 10th from 10 AM to 10:30 AM"
Result: {{ "action": "add", "event_name": "dentist appointment", "date": "2025-09-10", "start_time": "10:00:00", "end_time": "10:30:00" }}

Example 3: "i need to buy some milk"
Result: {{ "action": "error", "message": "I couldn't understand the date and time for your event. Please be more specific." }}

Provide ONLY the JSON object in your response.

Your Response:
"#,
        tz = policy.time_zone.name(),
        now = now.format("%Y-%m-%dT%H:%M:%S%:z (%A)"),
        input = user_input,
        duration_rule = duration_rule,
    )
}
