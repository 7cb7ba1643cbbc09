use std::sync::Arc;

use axum::{
    body::Body,
    http::Request,
    routing::{get, post},
    Router,
};
use shiftlog_core::config::ShiftlogConfig;
use shiftlog_core::{Clock, UserId};
use shiftlog_store::WorkStore;
use shiftlog_timer::{RequestCache, Tracker};
use tower_http::trace::TraceLayer;

use crate::auth::IdentityProvider;

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: ShiftlogConfig,
    pub store: WorkStore,
    pub clock: Arc<dyn Clock>,
    pub identity: Box<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(
        config: ShiftlogConfig,
        store: WorkStore,
        clock: Arc<dyn Clock>,
        identity: Box<dyn IdentityProvider>,
    ) -> Self {
        Self {
            config,
            store,
            clock,
            identity,
        }
    }

    /// A tracker with a fresh cache, scoped to one request.
    pub fn tracker(&self, user: UserId) -> Tracker<'_> {
        let ttl = chrono::Duration::milliseconds(self.config.cache.ttl_ms);
        let cache = RequestCache::with_ttl(self.clock.clone(), ttl);
        Tracker::with_cache(&self.store, self.clock.clone(), user, cache)
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    use crate::http::{health, logs, settings, timer};

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/start", post(timer::start))
        .route("/api/pause", post(timer::pause))
        .route("/api/resume", post(timer::resume))
        .route("/api/end-day", post(timer::end_day))
        .route("/api/complete-task", post(timer::complete_task))
        .route("/api/state", get(timer::get_state))
        .route("/api/delete-log", post(logs::delete_log))
        .route("/api/delete-day", post(logs::delete_day))
        .route("/api/edit-day", post(logs::edit_day))
        .route("/api/logs", get(logs::list_logs))
        .route("/api/summary", get(logs::summary))
        .route(
            "/api/settings",
            get(settings::get_settings).post(settings::update_settings),
        )
        .with_state(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    request_id = %uuid::Uuid::new_v4(),
                    method = %req.method(),
                    uri = %req.uri(),
                )
            }),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::{header, StatusCode};
    use chrono::{TimeZone, Utc};
    use serde_json::Value;
    use shiftlog_core::ManualClock;
    use tower::ServiceExt;

    use crate::auth::TokenTable;

    const ALICE: &str = "tok-alice";
    const BOB: &str = "tok-bob";

    fn setup() -> (Router, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 8, 3, 9, 0, 0).unwrap(),
        ));
        let identity = Box::new(TokenTable::new([
            (ALICE.to_string(), UserId::from("alice")),
            (BOB.to_string(), UserId::from("bob")),
        ]));
        let state = AppState::new(
            ShiftlogConfig::default(),
            WorkStore::open_in_memory().unwrap(),
            clock.clone(),
            identity,
        );
        (build_router(Arc::new(state)), clock)
    }

    fn request(method: &str, uri: &str, token: Option<&str>, form: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        match form {
            Some(form) => builder
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    struct Reply {
        status: StatusCode,
        location: Option<String>,
        json: Value,
    }

    async fn call(router: &Router, req: Request<Body>) -> Reply {
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let location = resp
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        Reply {
            status,
            location,
            json,
        }
    }

    async fn post(router: &Router, uri: &str, form: Option<&str>) -> Reply {
        call(router, request("POST", uri, Some(ALICE), form)).await
    }

    async fn get(router: &Router, uri: &str) -> Reply {
        call(router, request("GET", uri, Some(ALICE), None)).await
    }

    #[tokio::test]
    async fn health_needs_no_identity() {
        let (router, _) = setup();
        let reply = call(&router, request("GET", "/health", None, None)).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.json["status"], "ok");
    }

    #[tokio::test]
    async fn api_rejects_unknown_callers() {
        let (router, _) = setup();
        for (method, uri) in [("GET", "/api/state"), ("POST", "/api/start"), ("POST", "/api/end-day")] {
            let reply = call(&router, request(method, uri, None, None)).await;
            assert_eq!(reply.status, StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(reply.json, serde_json::json!({ "error": "Unauthorized" }));
        }
        let reply = call(&router, request("GET", "/api/state", Some("forged"), None)).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn timer_session_over_http() {
        let (router, clock) = setup();

        let reply = post(&router, "/api/start", None).await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        assert_eq!(reply.location.as_deref(), Some("/"));

        clock.advance_secs(125);
        let reply = post(&router, "/api/pause", None).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.json["log"]["total_seconds"], 125);
        assert!(reply.json["log"]["pause_time"].is_string());

        let reply = post(&router, "/api/pause", None).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.json["error"], "Already paused");

        clock.advance_secs(375);
        let reply = post(&router, "/api/resume", None).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.json["log"]["pause_time"].is_null());

        clock.advance_secs(60);
        let reply = post(&router, "/api/complete-task", Some("description=write+report")).await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        assert_eq!(reply.location.as_deref(), Some("/"));

        let reply = get(&router, "/api/state").await;
        assert_eq!(reply.json["log"]["total_seconds"], 125);
        assert_eq!(reply.json["tasks"][0]["description"], "write report");
        assert_eq!(reply.json["tasks"][0]["duration"], 60);

        let reply = post(&router, "/api/end-day", None).await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        let reply = get(&router, "/api/state").await;
        assert!(reply.json["log"].is_null());
        assert_eq!(reply.json["tasks"], serde_json::json!([]));

        let reply = get(&router, "/api/logs").await;
        assert_eq!(reply.json["logs"][0]["total_seconds"], 185);

        // ending again is still a redirect
        let reply = post(&router, "/api/end-day", None).await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn start_answers_json_clients_and_rejects_second_start() {
        let (router, _) = setup();
        let mut req = request("POST", "/api/start", Some(ALICE), None);
        req.headers_mut()
            .insert(header::ACCEPT, "application/json".parse().unwrap());
        let reply = call(&router, req).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.json["log"]["total_seconds"], 0);
        assert!(reply.json["log"]["end_time"].is_null());

        let reply = post(&router, "/api/start", None).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.json["error"], "Work log already active");

        // bob has his own timer
        let reply = call(&router, request("POST", "/api/start", Some(BOB), None)).await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn complete_task_requires_description_and_open_log() {
        let (router, _) = setup();
        let reply = post(&router, "/api/complete-task", Some("description=+++")).await;
        assert_eq!(reply.json["error"], "Description required");
        let reply = post(&router, "/api/complete-task", None).await;
        assert_eq!(reply.json["error"], "Description required");
        let reply = post(&router, "/api/complete-task", Some("description=x")).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.json["error"], "No active work log");
    }

    #[tokio::test]
    async fn edit_and_delete_day() {
        let (router, _) = setup();

        let reply = post(&router, "/api/edit-day", Some("date=2026-08-01&hours=7.5")).await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        assert_eq!(reply.location.as_deref(), Some("/weekly"));

        let reply = get(&router, "/api/logs?start=2026-08-01&end=2026-08-01").await;
        let logs = reply.json["logs"].as_array().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0]["total_seconds"], 27_000);
        assert_eq!(logs[0]["description"], "Adjusted (manual)");

        let reply = get(&router, "/api/summary?start=2026-08-01").await;
        assert_eq!(reply.json["total_seconds"], 27_000);
        assert_eq!(reply.json["earnings"], 75.0);
        assert_eq!(reply.json["currency"], "GBP");

        for form in ["date=2026-08-01&hours=", "date=2026-08-01", "date=01-08-2026&hours=1", "date=2026-08-01&hours=-2"] {
            let reply = post(&router, "/api/edit-day", Some(form)).await;
            assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{form}");
            assert_eq!(reply.json["error"], "Invalid input", "{form}");
        }

        let reply = post(&router, "/api/delete-day", None).await;
        assert_eq!(reply.json["error"], "Missing date");
        let reply = post(&router, "/api/delete-day", Some("date=someday")).await;
        assert_eq!(reply.json["error"], "Invalid date");

        let reply = post(&router, "/api/delete-day", Some("date=2026-08-01")).await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        assert_eq!(reply.location.as_deref(), Some("/weekly"));
        let reply = get(&router, "/api/logs").await;
        assert_eq!(reply.json["logs"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn delete_log_is_scoped_to_caller() {
        let (router, _) = setup();
        let reply = post(&router, "/api/delete-log", None).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.json["error"], "Missing log ID");

        post(&router, "/api/edit-day", Some("date=2026-08-01&hours=1")).await;
        let id = get(&router, "/api/logs").await.json["logs"][0]["id"]
            .as_i64()
            .unwrap();

        let reply = call(
            &router,
            request("POST", &format!("/api/delete-log?id={id}"), Some(BOB), None),
        )
        .await;
        assert_eq!(reply.location.as_deref(), Some("/history"));
        assert_eq!(get(&router, "/api/logs").await.json["logs"].as_array().unwrap().len(), 1);

        let reply = post(&router, &format!("/api/delete-log?id={id}"), None).await;
        assert_eq!(reply.location.as_deref(), Some("/history"));
        assert_eq!(get(&router, "/api/logs").await.json["logs"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn settings_round_trip_through_api() {
        let (router, _) = setup();
        let reply = get(&router, "/api/settings").await;
        assert_eq!(reply.json, serde_json::json!({ "currency": "GBP", "hourly_rate": 10.0 }));

        let reply = post(&router, "/api/settings", Some("currency=usd&hourly_rate=25")).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.json["currency"], "USD");

        let reply = post(&router, "/api/settings", Some("currency=usd&hourly_rate=lots")).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.json["error"], "Invalid settings");

        let reply = get(&router, "/api/settings").await;
        assert_eq!(reply.json["hourly_rate"], 25.0);
    }

    #[tokio::test]
    async fn bad_range_is_rejected() {
        let (router, _) = setup();
        let reply = get(&router, "/api/logs?start=tomorrow").await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.json["error"], "Invalid range");
    }

    #[tokio::test]
    async fn undecodable_queries_keep_the_json_error_shape() {
        let (router, _) = setup();
        for uri in [
            "/api/logs?start=2026-08-01&start=2026-08-02",
            "/api/summary?end=2026-08-01&end=2026-08-02",
        ] {
            let reply = get(&router, uri).await;
            assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(reply.json["error"], "Invalid range", "{uri}");
        }
        let reply = post(&router, "/api/delete-log?id=1&id=2", None).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.json["error"], "Missing log ID");
    }
}
