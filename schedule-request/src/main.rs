//! Schedule Request Lambda - Handles free-text scheduling requests.
//!
//! This Lambda accepts `{"text": "..."}` from a browser front end, asks Gemini
//! to extract the event details, and inserts the event into Google Calendar
//! using a service account.

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::{
    load_service_account_key, resolve_secret, Config, GeminiClient, GoogleCalendarClient,
    ScheduleHandler,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across requests.
struct AppState {
    handler: ScheduleHandler<GeminiClient, GoogleCalendarClient>,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let secrets_client = aws_sdk_secretsmanager::Client::new(&aws_config);

        let api_key = resolve_secret(&secrets_client, &config.gemini.api_key).await?;
        let service_account =
            load_service_account_key(&secrets_client, &config.calendar.credentials).await?;

        info!(
            model = %config.gemini.model,
            calendar_id = %config.calendar.calendar_id,
            time_zone = %config.schedule.time_zone.name(),
            service_account = %service_account.client_email,
            "Schedule request function configured"
        );

        let extractor = GeminiClient::new(&config.gemini, api_key)?;
        let calendar = GoogleCalendarClient::new(&config.calendar, service_account)?;

        Ok(Self {
            handler: ScheduleHandler::new(
                extractor,
                calendar,
                config.calendar.calendar_id,
                config.schedule,
            ),
        })
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    shared::http::respond(&state.handler, event).await
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
