//! HTTP tests driving the router over the in-memory store

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tower::ServiceExt;

use catering_slots_server::{
    api,
    config::AppConfig,
    models::user::{Role, UserClaims},
    repository::Repository,
    services::Services,
    timeutil::FixedClock,
    AppState,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 6, 1).unwrap()
}

fn app() -> Router {
    let config = AppConfig::default();
    let services = Services::new(Repository::in_memory(), Arc::new(FixedClock(today())));
    api::router(AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    })
}

fn token(role: Role) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = UserClaims {
        sub: "tester".to_string(),
        user_id: 7,
        role,
        exp: now + 3600,
        iat: now,
    };
    claims
        .create_token(&AppConfig::default().auth.jwt_secret)
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post(path: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(path: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_and_ready() {
    let app = app();

    let (status, body) = send(&app, get("/api/v1/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, get("/api/v1/ready", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_admin_routes_require_token() {
    let app = app();
    let (status, body) = send(
        &app,
        post(
            "/api/v1/delivery-slots/block-date",
            None,
            json!({ "date": "2030-06-10", "reason": "Holiday" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "NotAuthorized");

    let (status, _) = send(&app, get("/api/v1/delivery-slots/all", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_reject_plain_user() {
    let app = app();
    let user = token(Role::User);
    let (status, body) = send(
        &app,
        post(
            "/api/v1/delivery-slots/block-date",
            Some(&user),
            json!({ "date": "2030-06-10", "reason": "Holiday" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 2);
}

#[tokio::test]
async fn test_block_date_then_public_views() {
    let app = app();
    let admin = token(Role::Admin);

    let (status, body) = send(
        &app,
        post(
            "/api/v1/delivery-slots/block-date",
            Some(&admin),
            json!({ "date": "2030-06-10", "reason": "Holiday" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["date"], "2030-06-10");
    assert_eq!(body["is_full_day_blocked"], true);
    assert_eq!(body["created_by"], 7);
    assert_eq!(body["time_slots"].as_array().unwrap().len(), 12);

    let (status, body) = send(
        &app,
        get(
            "/api/v1/delivery-slots/blocked-dates?start_date=2030-06-01&end_date=2030-06-30",
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{ "date": "2030-06-10", "blocked_reason": "Holiday" }]));

    let (status, body) = send(
        &app,
        get("/api/v1/delivery-slots/available-time-slots?date=2030-06-10", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_full_day_blocked"], true);
    assert!(body["time_slots"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_block_time_slots_filters_availability() {
    let app = app();
    let admin = token(Role::SuperAdmin);

    let (status, body) = send(
        &app,
        post(
            "/api/v1/delivery-slots/block-time-slots",
            Some(&admin),
            json!({
                "date": "2030-06-12",
                "time_slots": [{ "start_time": "12:00", "end_time": "14:00", "reason": "Lunch rush" }]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_full_day_blocked"], false);

    let (_, body) = send(
        &app,
        get("/api/v1/delivery-slots/available-time-slots?date=2030-06-12", None),
    )
    .await;
    let starts: Vec<&str> = body["time_slots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["start_time"].as_str().unwrap())
        .collect();
    assert_eq!(starts.len(), 10);
    assert!(!starts.contains(&"12:00"));
    assert!(!starts.contains(&"13:00"));
}

#[tokio::test]
async fn test_block_time_slots_rejects_overlapping_input() {
    let app = app();
    let admin = token(Role::Admin);
    let (status, body) = send(
        &app,
        post(
            "/api/v1/delivery-slots/block-time-slots",
            Some(&admin),
            json!({
                "date": "2030-06-12",
                "time_slots": [
                    { "start_time": "10:00", "end_time": "12:00" },
                    { "start_time": "11:00", "end_time": "13:00" }
                ]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Duplicate");
}

#[tokio::test]
async fn test_past_date_is_rejected() {
    let app = app();
    let admin = token(Role::Admin);
    let (status, body) = send(
        &app,
        post(
            "/api/v1/delivery-slots/block-date",
            Some(&admin),
            json!({ "date": "2030-05-31", "reason": "Holiday" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "PastDate");
}

#[tokio::test]
async fn test_bulk_block_with_past_date_writes_nothing() {
    let app = app();
    let admin = token(Role::Admin);
    let (status, body) = send(
        &app,
        post(
            "/api/v1/delivery-slots/bulk-block",
            Some(&admin),
            json!({ "dates": ["2030-06-20", "2030-05-01"], "reason": "Closed" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "PastDate");

    let (_, body) = send(
        &app,
        get(
            "/api/v1/delivery-slots/blocked-dates?start_date=2030-06-01&end_date=2030-06-30",
            None,
        ),
    )
    .await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_bulk_block_reports_count() {
    let app = app();
    let admin = token(Role::Admin);
    let (status, body) = send(
        &app,
        post(
            "/api/v1/delivery-slots/bulk-block",
            Some(&admin),
            json!({ "dates": ["2030-06-20", "2030-06-21"], "reason": "Closed" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_create_default_twice_conflicts() {
    let app = app();
    let admin = token(Role::Admin);
    let request = || {
        post(
            "/api/v1/delivery-slots/create-default",
            Some(&admin),
            json!({ "date": "2030-06-15" }),
        )
    };

    let (status, body) = send(&app, request()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["time_slots"][0]["start_time"], "09:00");
    assert_eq!(body["time_slots"][11]["end_time"], "21:00");

    let (status, body) = send(&app, request()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Duplicate");
}

#[tokio::test]
async fn test_unblock_unknown_date_is_not_found() {
    let app = app();
    let admin = token(Role::Admin);
    let (status, body) = send(
        &app,
        post(
            "/api/v1/delivery-slots/unblock-date",
            Some(&admin),
            json!({ "date": "2030-07-01" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchSchedule");
}

#[tokio::test]
async fn test_available_slots_requires_date_or_range() {
    let app = app();
    let (status, body) = send(&app, get("/api/v1/delivery-slots/available-time-slots", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");

    let (status, _) = send(
        &app,
        get(
            "/api/v1/delivery-slots/available-time-slots?start_date=2030-06-01",
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_date_string_is_bad_value() {
    let app = app();
    let (status, body) = send(
        &app,
        get("/api/v1/delivery-slots/available-time-slots?date=not-a-date", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
}

#[tokio::test]
async fn test_list_all_paginates() {
    let app = app();
    let admin = token(Role::Admin);
    for day in ["2030-06-02", "2030-06-03", "2030-06-04"] {
        let (status, _) = send(
            &app,
            post(
                "/api/v1/delivery-slots/create-default",
                Some(&admin),
                json!({ "date": day }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(
        &app,
        get(
            "/api/v1/delivery-slots/all?page=1&limit=2&sort_by=date&sort_order=asc",
            Some(&admin),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 3);
    assert_eq!(body["meta"]["limit"], 2);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["date"], "2030-06-02");

    let (status, body) = send(
        &app,
        get("/api/v1/delivery-slots/all?sort_by=bogus", Some(&admin)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
}

#[tokio::test]
async fn test_list_all_huge_page_is_empty() {
    let app = app();
    let admin = token(Role::Admin);
    let (status, _) = send(
        &app,
        post(
            "/api/v1/delivery-slots/create-default",
            Some(&admin),
            json!({ "date": "2030-06-02" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        get(
            "/api/v1/delivery-slots/all?page=9223372036854775807",
            Some(&admin),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);
    assert!(body["data"].as_array().unwrap().is_empty());
}
