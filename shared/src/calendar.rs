//! Google Calendar v3 client.

use async_trait::async_trait;
use tracing::info;

use crate::config::CalendarConfig;
use crate::google_auth::{ServiceAccountAuth, ServiceAccountKey};
use crate::models::{CalendarEventPayload, InsertedEvent};
use crate::{Error, Result};

/// A calendar that events can be inserted into.
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Insert one event into `calendar_id`.
    async fn insert_event(
        &self,
        calendar_id: &str,
        event: &CalendarEventPayload,
    ) -> Result<InsertedEvent>;
}

/// Calendar client authenticated as a service account.
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    auth: ServiceAccountAuth,
    base_url: String,
}

impl GoogleCalendarClient {
    /// Create a client. The same timeout applies to token exchange and insert.
    pub fn new(config: &CalendarConfig, key: ServiceAccountKey) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build calendar HTTP client: {}", e)))?;

        Ok(Self {
            auth: ServiceAccountAuth::new(key, http_client.clone())?,
            http_client,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl CalendarService for GoogleCalendarClient {
    async fn insert_event(
        &self,
        calendar_id: &str,
        event: &CalendarEventPayload,
    ) -> Result<InsertedEvent> {
        let access_token = self.auth.access_token().await?;

        let url = format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&access_token)
            .json(event)
            .send()
            .await
            .map_err(|e| Error::CalendarInsert(format!("Insert request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::CalendarInsert(format!(
                "Insert failed with {}: {}",
                status, error_text
            )));
        }

        let inserted: InsertedEvent = response
            .json()
            .await
            .map_err(|e| Error::CalendarInsert(format!("Failed to parse insert response: {}", e)))?;

        info!(
            event_id = %inserted.id,
            service_account = %self.auth.client_email(),
            "Inserted calendar event"
        );
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CredentialSource;
    use crate::models::EventDateTime;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_KEY_JSON: &str = include_str!("../testdata/service_account.json");

    fn token_reply() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "ya29.test",
            "expires_in": 3599,
            "token_type": "Bearer"
        }))
    }

    async fn setup(server: &MockServer) -> GoogleCalendarClient {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(token_reply())
            .mount(server)
            .await;

        client_for(server)
    }

    fn client_for(server: &MockServer) -> GoogleCalendarClient {
        let mut key = ServiceAccountKey::from_json(TEST_KEY_JSON).unwrap();
        key.token_uri = format!("{}/token", server.uri());
        let config = CalendarConfig {
            calendar_id: "someone@example.com".to_string(),
            credentials: CredentialSource::File("credentials.json".into()),
            base_url: server.uri(),
            timeout: Duration::from_millis(500),
        };
        GoogleCalendarClient::new(&config, key).unwrap()
    }

    fn payload() -> CalendarEventPayload {
        CalendarEventPayload {
            summary: "dentist appointment".to_string(),
            start: EventDateTime {
                date_time: "2025-09-10T10:00:00".to_string(),
                time_zone: "America/Phoenix".to_string(),
            },
            end: EventDateTime {
                date_time: "2025-09-10T10:30:00".to_string(),
                time_zone: "America/Phoenix".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_insert_event() {
        let server = MockServer::start().await;
        let client = setup(&server).await;

        Mock::given(method("POST"))
            .and(path("/calendars/someone%40example.com/events"))
            .and(header("authorization", "Bearer ya29.test"))
            .and(body_json(serde_json::json!({
                "summary": "dentist appointment",
                "start": {"dateTime": "2025-09-10T10:00:00", "timeZone": "America/Phoenix"},
                "end": {"dateTime": "2025-09-10T10:30:00", "timeZone": "America/Phoenix"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "evt123",
                "htmlLink": "https://www.google.com/calendar/event?eid=evt123",
                "status": "confirmed"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let inserted = client
            .insert_event("someone@example.com", &payload())
            .await
            .unwrap();
        assert_eq!(inserted.id, "evt123");
        assert!(inserted.html_link.is_some());
    }

    #[tokio::test]
    async fn test_insert_rejected() {
        let server = MockServer::start().await;
        let client = setup(&server).await;

        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client.insert_event("primary", &payload()).await.unwrap_err();
        assert!(matches!(err, Error::CalendarInsert(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_insert_timeout_is_calendar_failure() {
        let server = MockServer::start().await;
        let client = setup(&server).await;

        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "late"}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let err = client.insert_event("primary", &payload()).await.unwrap_err();
        assert!(matches!(err, Error::CalendarInsert(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_token_timeout_is_calendar_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(token_reply().set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .insert_event("primary", &payload())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CalendarInsert(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_token_rejected_skips_insert() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .insert_event("primary", &payload())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CalendarInsert(ref m) if m.contains("invalid_grant")));
        assert_eq!(err.status_code(), 500);
    }
}
