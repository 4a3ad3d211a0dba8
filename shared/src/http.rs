//! HTTP helpers for the Lambda binding.

use lambda_http::http::{Method, StatusCode};
use lambda_http::{Body, Request, Response};
use serde::Serialize;
use tracing::info;

use crate::calendar::CalendarService;
use crate::extraction::EventExtractor;
use crate::models::ScheduleResponse;
use crate::schedule::ScheduleHandler;

/// Create a JSON response with the given status code and data.
pub fn json_response<T: Serialize>(
    status: u16,
    data: &T,
) -> Result<Response<Body>, lambda_http::Error> {
    Ok(Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Body::from(serde_json::to_string(data)?))?)
}

/// Empty 204 answer to a CORS preflight.
pub fn preflight_response() -> Result<Response<Body>, lambda_http::Error> {
    Ok(Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "POST")
        .header("Access-Control-Allow-Headers", "Content-Type")
        .header("Access-Control-Max-Age", "3600")
        .body(Body::Empty)?)
}

fn method_not_allowed(method: &Method) -> Result<Response<Body>, lambda_http::Error> {
    let mut response = json_response(
        405,
        &ScheduleResponse::error(format!("Method {} not allowed.", method)),
    )?;
    response
        .headers_mut()
        .insert("Allow", "POST, OPTIONS".parse()?);
    Ok(response)
}

/// Route one HTTP request to the schedule handler.
pub async fn respond<E, C>(
    handler: &ScheduleHandler<E, C>,
    request: Request,
) -> Result<Response<Body>, lambda_http::Error>
where
    E: EventExtractor,
    C: CalendarService,
{
    match *request.method() {
        Method::OPTIONS => preflight_response(),
        Method::POST => {
            let outcome = handler.handle(request.body().as_ref()).await;
            info!(status = outcome.status, "Schedule request handled");
            json_response(outcome.status, &outcome.response)
        }
        ref other => method_not_allowed(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResponseStatus;
    use crate::schedule::tests::{handler, FakeCalendar, FakeExtractor};

    fn request(method: &str, body: Body) -> Request {
        lambda_http::http::Request::builder()
            .method(method)
            .uri("https://example.lambda-url.us-west-1.on.aws/")
            .header("content-type", "application/json")
            .body(body)
            .unwrap()
    }

    fn body_json(response: &Response<Body>) -> ScheduleResponse {
        serde_json::from_slice(response.body().as_ref()).unwrap()
    }

    #[tokio::test]
    async fn test_preflight() {
        let extractor = FakeExtractor::replying("{}");
        let calendar = FakeCalendar::default();

        let response = respond(&handler(&extractor, &calendar), request("OPTIONS", Body::Empty))
            .await
            .unwrap();

        assert_eq!(response.status(), 204);
        assert!(response.body().as_ref().is_empty());
        let headers = response.headers();
        assert_eq!(headers["Access-Control-Allow-Origin"], "*");
        assert_eq!(headers["Access-Control-Allow-Methods"], "POST");
        assert_eq!(headers["Access-Control-Allow-Headers"], "Content-Type");
        assert_eq!(headers["Access-Control-Max-Age"], "3600");
        assert_eq!(extractor.calls(), 0);
    }

    #[tokio::test]
    async fn test_post_success_has_cors_header() {
        let extractor = FakeExtractor::replying(
            r#"{"action": "add", "event_name": "meeting", "date": "2025-06-02", "start_time": "15:00:00", "end_time": "16:00:00"}"#,
        );
        let calendar = FakeCalendar::default();

        let response = respond(
            &handler(&extractor, &calendar),
            request("POST", Body::from(r#"{"text": "Add a meeting tomorrow at 3pm"}"#)),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()["Access-Control-Allow-Origin"], "*");
        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(body_json(&response).status, ResponseStatus::Success);
        assert_eq!(calendar.calls(), 1);
    }

    #[tokio::test]
    async fn test_post_empty_body_is_bad_request() {
        let extractor = FakeExtractor::replying("{}");
        let calendar = FakeCalendar::default();

        let response = respond(&handler(&extractor, &calendar), request("POST", Body::Empty))
            .await
            .unwrap();

        assert_eq!(response.status(), 400);
        assert_eq!(body_json(&response).status, ResponseStatus::Error);
        assert_eq!(extractor.calls(), 0);
    }

    #[tokio::test]
    async fn test_other_methods_rejected() {
        let extractor = FakeExtractor::replying("{}");
        let calendar = FakeCalendar::default();

        let response = respond(&handler(&extractor, &calendar), request("GET", Body::Empty))
            .await
            .unwrap();

        assert_eq!(response.status(), 405);
        assert_eq!(response.headers()["Allow"], "POST, OPTIONS");
        assert_eq!(extractor.calls(), 0);
    }
}
