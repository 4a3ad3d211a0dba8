//! The schedule request handler.
//!
//! One request runs strictly in order: validate the body, ask the extraction
//! service for structured event data, validate that, then insert the event.
//! Every failure is converted to a single [`ScheduleResponse`] here.
//!
//! Inserts carry no deduplication key, so the same text sent twice creates
//! two events.

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use validator::Validate;

use crate::calendar::CalendarService;
use crate::config::ScheduleConfig;
use crate::extraction::{
    build_prompt, parse_extraction, EventExtractor, ExtractedEvent, UNRECOGNIZED_MESSAGE,
};
use crate::models::{ScheduleRequest, ScheduleResponse};
use crate::{Error, Result};

/// Message for an absent body or a body without a string `text` field.
pub const MISSING_TEXT_MESSAGE: &str = "Invalid JSON or missing text field.";

/// Message for an empty `text` field.
pub const EMPTY_TEXT_MESSAGE: &str = "No input text provided.";

/// Status code and body produced for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleOutcome {
    pub status: u16,
    pub response: ScheduleResponse,
}

/// Turns free-text requests into calendar events.
pub struct ScheduleHandler<E, C> {
    extractor: E,
    calendar: C,
    calendar_id: String,
    policy: ScheduleConfig,
}

impl<E, C> ScheduleHandler<E, C>
where
    E: EventExtractor,
    C: CalendarService,
{
    pub fn new(extractor: E, calendar: C, calendar_id: String, policy: ScheduleConfig) -> Self {
        Self {
            extractor,
            calendar,
            calendar_id,
            policy,
        }
    }

    /// Handle a raw request body.
    pub async fn handle(&self, body: &[u8]) -> ScheduleOutcome {
        self.handle_at(body, Utc::now()).await
    }

    /// Handle a raw request body as if the current time were `now`.
    pub async fn handle_at(&self, body: &[u8], now: DateTime<Utc>) -> ScheduleOutcome {
        match self.process(body, now).await {
            Ok(event_name) => ScheduleOutcome {
                status: 200,
                response: ScheduleResponse::success(format!(
                    "✅ Success! I've added \"{}\" to your calendar.",
                    event_name
                )),
            },
            Err(e) => {
                if e.is_server_error() {
                    error!("Schedule request failed: {}", e);
                } else if e.status_code() == 400 {
                    warn!("Rejected schedule request: {}", e);
                } else {
                    info!("Schedule request not actionable: {}", e);
                }
                ScheduleOutcome {
                    status: e.status_code(),
                    response: ScheduleResponse::error(e.user_message()),
                }
            }
        }
    }

    async fn process(&self, body: &[u8], now: DateTime<Utc>) -> Result<String> {
        let request = parse_request(body)?;

        let prompt = build_prompt(
            &request.text,
            now.with_timezone(&self.policy.time_zone),
            &self.policy,
        );
        let reply = self.extractor.generate(&prompt).await?;

        let fields = match parse_extraction(&reply)? {
            ExtractedEvent::Add(fields) => fields,
            ExtractedEvent::Error { message } => return Err(Error::Understood(message)),
            ExtractedEvent::Unrecognized { message } => {
                return Err(Error::Understood(
                    message.unwrap_or_else(|| UNRECOGNIZED_MESSAGE.to_string()),
                ))
            }
        };

        let details = fields.into_details(self.policy.default_event_duration)?;
        let payload = details.to_payload(self.policy.time_zone);
        info!(
            summary = %payload.summary,
            start = %payload.start.date_time,
            end = %payload.end.date_time,
            "Creating calendar event"
        );

        self.calendar
            .insert_event(&self.calendar_id, &payload)
            .await?;

        Ok(details.event_name)
    }
}

/// Decode and validate the inbound body.
pub fn parse_request(body: &[u8]) -> Result<ScheduleRequest> {
    let request: ScheduleRequest = serde_json::from_slice(body)
        .map_err(|_| Error::InvalidInput(MISSING_TEXT_MESSAGE.to_string()))?;

    request
        .validate()
        .map_err(|_| Error::InvalidInput(EMPTY_TEXT_MESSAGE.to_string()))?;

    Ok(request)
}
