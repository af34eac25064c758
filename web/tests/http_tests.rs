//! End-to-end HTTP tests over the in-memory ledger.
//!
//! Each request goes through the full router, including the correlation
//! layer and bearer-token resolution.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::Router;
use axum::body::{Body, to_bytes};
use chrono::Duration;
use http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;
use voloconnect_core::environment::Clock;
use voloconnect_core::types::UserId;
use voloconnect_testing::{InMemoryLedger, ManualClock, sample_event};
use voloconnect_testing::mocks::test_epoch;
use voloconnect_web::{AppState, CORRELATION_ID_HEADER, build_router};

struct TestApp {
    router: Router,
    ledger: Arc<InMemoryLedger>,
    clock: Arc<ManualClock>,
}

impl TestApp {
    fn new() -> Self {
        let ledger = Arc::new(InMemoryLedger::new());
        let clock = Arc::new(ManualClock::new(test_epoch()));
        let state = AppState::from_ledger(ledger.clone(), clock.clone());
        Self {
            router: build_router(state),
            ledger,
            clock,
        }
    }

    /// Create a session valid for one hour and return its bearer token.
    fn login(&self, user_id: UserId) -> Uuid {
        let token = Uuid::new_v4();
        self.ledger
            .insert_session(token, user_id, self.clock.now() + Duration::hours(1));
        token
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<Uuid>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create_event(&self, token: Uuid, capacity: u32) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/events",
                Some(token),
                Some(serde_json::to_value(sample_event(capacity)).unwrap()),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health_and_readiness() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.send(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);

    app.ledger.set_unavailable(true);
    let (status, body) = app.send(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["database"], false);
}

#[tokio::test]
async fn test_correlation_id_echoed() {
    let app = TestApp::new();
    let id = Uuid::new_v4();
    let request = Request::builder()
        .uri("/health")
        .header(CORRELATION_ID_HEADER, id.to_string())
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()[CORRELATION_ID_HEADER].to_str().unwrap(),
        id.to_string()
    );
}

#[tokio::test]
async fn test_mutations_require_live_session() {
    let app = TestApp::new();

    let (status, body) = app
        .send(
            Method::POST,
            "/api/events",
            None,
            Some(serde_json::to_value(sample_event(2)).unwrap()),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app
        .send(Method::GET, "/api/me/events", Some(Uuid::new_v4()), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.login(UserId::new());
    app.clock.advance(Duration::hours(2));
    let (status, _) = app
        .send(Method::GET, "/api/me/events", Some(token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_join_leave_flow_over_http() {
    let app = TestApp::new();
    let organizer = app.login(UserId::new());
    let (a, b, c) = (
        app.login(UserId::new()),
        app.login(UserId::new()),
        app.login(UserId::new()),
    );
    let event_id = app.create_event(organizer, 2).await;
    let participants = format!("/api/events/{event_id}/participants");
    let me = format!("/api/events/{event_id}/participants/me");

    let (status, _) = app.send(Method::POST, &participants, Some(a), None).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = app.send(Method::POST, &participants, Some(a), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (status, _) = app.send(Method::POST, &participants, Some(b), None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.send(Method::POST, &participants, Some(c), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "CAPACITY_EXCEEDED");

    let (_, event) = app
        .send(Method::GET, &format!("/api/events/{event_id}"), None, None)
        .await;
    assert_eq!(event["current_volunteers"], 2);
    assert_eq!(event["status"], "full");

    let (_, joined) = app.send(Method::GET, &me, Some(a), None).await;
    assert_eq!(joined, json!({ "joined": true }));

    let (status, _) = app.send(Method::DELETE, &me, Some(a), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.send(Method::DELETE, &me, Some(a), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "NOT_JOINED");

    let (status, roster) = app.send(Method::GET, &participants, Some(organizer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(roster.as_array().unwrap().len(), 1);

    let (status, _) = app.send(Method::GET, &participants, Some(b), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, mine) = app.send(Method::GET, "/api/me/events", Some(b), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine[0]["id"], event_id.as_str());
}

#[tokio::test]
async fn test_unknown_event_is_not_found() {
    let app = TestApp::new();
    let token = app.login(UserId::new());
    let missing = Uuid::new_v4();

    let (status, body) = app
        .send(Method::GET, &format!("/api/events/{missing}"), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/events/{missing}/participants"),
            Some(token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_event_validation_and_ownership() {
    let app = TestApp::new();
    let organizer = app.login(UserId::new());
    let stranger = app.login(UserId::new());

    let mut invalid = serde_json::to_value(sample_event(0)).unwrap();
    let (status, body) = app
        .send(Method::POST, "/api/events", Some(organizer), Some(invalid.clone()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    invalid["capacity"] = json!(3);
    invalid["title"] = json!("   ");
    let (status, _) = app
        .send(Method::POST, "/api/events", Some(organizer), Some(invalid))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let event_id = app.create_event(organizer, 3).await;
    let uri = format!("/api/events/{event_id}");

    let (status, _) = app
        .send(Method::PUT, &uri, Some(stranger), Some(json!({ "title": "Mine now" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app
        .send(Method::PUT, &uri, Some(organizer), Some(json!({ "title": "Beach cleanup" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Beach cleanup");

    let (status, _) = app
        .send(Method::PUT, &uri, Some(organizer), Some(json!({ "status": "full" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.send(Method::DELETE, &uri, Some(stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app.send(Method::DELETE, &uri, Some(organizer), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
    let (status, _) = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_input_is_validation_error() {
    let app = TestApp::new();
    let organizer = app.login(UserId::new());
    let event_id = app.create_event(organizer, 3).await;

    let mut negative = serde_json::to_value(sample_event(1)).unwrap();
    negative["capacity"] = json!(-1);
    let (status, body) = app
        .send(Method::POST, "/api/events", Some(organizer), Some(negative))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["message"].is_string());

    let (status, body) = app
        .send(Method::POST, "/api/events", Some(organizer), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/events/{event_id}/queries"),
            Some(organizer),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = app
        .send(Method::GET, "/api/events/not-a-uuid", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = app
        .send(Method::GET, "/api/events?status=bogus", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_list_events_filters() {
    let app = TestApp::new();
    let organizer_id = UserId::new();
    let organizer = app.login(organizer_id);
    let other = app.login(UserId::new());
    app.create_event(organizer, 2).await;
    app.create_event(organizer, 2).await;
    app.create_event(other, 2).await;

    let (status, page) = app.send(Method::GET, "/api/events", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["events"].as_array().unwrap().len(), 3);
    assert_eq!(page["page_size"], 20);

    let (_, page) = app
        .send(
            Method::GET,
            &format!("/api/events?organizer_id={organizer_id}&page_size=1"),
            None,
            None,
        )
        .await;
    assert_eq!(page["events"].as_array().unwrap().len(), 1);
    assert_eq!(page["events"][0]["organizer_id"], organizer_id.to_string());
}

#[tokio::test]
async fn test_query_answer_flow_over_http() {
    let app = TestApp::new();
    let organizer = app.login(UserId::new());
    let asker = app.login(UserId::new());
    let event_id = app.create_event(organizer, 5).await;

    let (status, query) = app
        .send(
            Method::POST,
            &format!("/api/events/{event_id}/queries"),
            Some(asker),
            Some(json!({ "message": "  Is parking available?  " })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(query["message"], "Is parking available?");
    assert_eq!(query["response"], Value::Null);
    let query_id = query["id"].as_str().unwrap().to_string();
    let respond = format!("/api/queries/{query_id}/response");

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/events/{event_id}/queries"),
            Some(asker),
            Some(json!({ "message": "   " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = app
        .send(Method::PUT, &respond, Some(asker), Some(json!({ "response": "Yes" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, answered) = app
        .send(Method::PUT, &respond, Some(organizer), Some(json!({ "response": "Yes, lot B" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(answered["response"], "Yes, lot B");

    let (status, _) = app
        .send(Method::PUT, &respond, Some(organizer), Some(json!({ "response": "No" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, inbox) = app
        .send(Method::GET, "/api/me/organizer/queries", Some(organizer), None)
        .await;
    assert_eq!(inbox[0]["event_title"], "Community garden planting");
    assert_eq!(inbox[0]["response"], "Yes, lot B");

    let (_, mine) = app.send(Method::GET, "/api/me/queries", Some(asker), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (_, for_event) = app
        .send(
            Method::GET,
            &format!("/api/events/{event_id}/queries"),
            Some(organizer),
            None,
        )
        .await;
    assert_eq!(for_event.as_array().unwrap().len(), 1);

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/queries/{query_id}"), Some(organizer), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .send(Method::DELETE, &format!("/api/queries/{query_id}"), Some(asker), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .send(Method::DELETE, &format!("/api/queries/{query_id}"), Some(asker), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_storage_outage_maps_to_service_unavailable() {
    let app = TestApp::new();
    let organizer = app.login(UserId::new());
    let event_id = app.create_event(organizer, 2).await;

    app.ledger.set_unavailable(true);
    let (status, body) = app
        .send(Method::GET, &format!("/api/events/{event_id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
}
