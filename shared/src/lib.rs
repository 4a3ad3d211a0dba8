//! Shared library for the schedule request Lambda function.
//!
//! This crate turns a free-text scheduling request into a calendar event:
//! a text-generation service extracts the event fields and a calendar
//! service stores the result.

pub mod calendar;
pub mod config;
pub mod error;
pub mod extraction;
pub mod gemini;
pub mod google_auth;
pub mod http;
pub mod models;
pub mod schedule;
pub mod secrets;

pub use calendar::{CalendarService, GoogleCalendarClient};
pub use config::Config;
pub use error::{Error, Result};
pub use extraction::{EventExtractor, ExtractedEvent};
pub use gemini::GeminiClient;
pub use google_auth::ServiceAccountKey;
pub use models::{CalendarEventPayload, ScheduleRequest, ScheduleResponse};
pub use schedule::{ScheduleHandler, ScheduleOutcome};
pub use secrets::{get_secret, load_service_account_key, resolve_secret};
