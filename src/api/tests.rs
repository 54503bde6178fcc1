//! HTTP-level tests for the router

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use super::{build_router, AppState};
use crate::config::{Config, SelectionStrategy};
use crate::db::{create_test_pool, migrations};

async fn setup_server(admin_token: Option<&str>) -> TestServer {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let mut config = Config::default();
    config.parking.selection = SelectionStrategy::LowestId;
    config.admin.token = admin_token.map(str::to_string);

    let state = AppState::build(pool, &config);
    state.rates.ensure_initialized().await.expect("Failed to seed rates");
    state
        .inventory
        .seed_defaults(&config.parking.initial_spots.counts())
        .await
        .expect("Failed to seed spots");

    let app = build_router(state, &config.server.cors_origin).expect("Failed to build router");
    TestServer::new(app).expect("Failed to start test server")
}

#[tokio::test]
async fn test_entry_assigns_spot() {
    let server = setup_server(None).await;

    let response = server
        .post("/api/v1/entry")
        .json(&json!({ "plate_number": "ka01", "category": "disability", "plan_hours": 4 }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    assert_eq!(body["spot"]["id"], "D-1");
    assert_eq!(body["session"]["plate_number"], "KA01");
    assert_eq!(body["upfront_amount"], 160.0);
}

#[tokio::test]
async fn test_entry_category_defaults_to_regular() {
    let server = setup_server(None).await;

    let response = server
        .post("/api/v1/entry")
        .json(&json!({ "plate_number": "MH02", "plan_hours": 8 }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    assert_eq!(body["spot"]["id"], "A-1");
    assert_eq!(body["spot"]["category"], "regular");
}

#[tokio::test]
async fn test_entry_errors_map_to_statuses() {
    let server = setup_server(None).await;

    let entry = json!({ "plate_number": "KA01", "plan_hours": 4 });
    server.post("/api/v1/entry").json(&entry).await.assert_status(StatusCode::CREATED);

    let response = server.post("/api/v1/entry").json(&entry).await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "DUPLICATE_PLATE");

    let response = server
        .post("/api/v1/entry")
        .json(&json!({ "plate_number": "KA02", "plan_hours": 3 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    server
        .post("/api/v1/entry")
        .json(&json!({ "plate_number": "KA03", "plan_hours": 4 }))
        .await
        .assert_status(StatusCode::CREATED);
    let response = server
        .post("/api/v1/entry")
        .json(&json!({ "plate_number": "KA04", "plan_hours": 4 }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "NO_SPOTS_AVAILABLE");
    assert_eq!(body["error"]["details"]["category"], "regular");
}

#[tokio::test]
async fn test_exit_flow() {
    let server = setup_server(None).await;

    server
        .post("/api/v1/entry")
        .json(&json!({ "plate_number": "KA01", "plan_hours": 4 }))
        .await
        .assert_status(StatusCode::CREATED);

    let quote = server.get("/api/v1/exit/KA01/quote").await;
    quote.assert_status_ok();
    let body: Value = quote.json();
    assert_eq!(body["status"], "charged");
    assert_eq!(body["paid_amount"], 160.0);

    let response = server
        .post("/api/v1/exit")
        .json(&json!({ "plate_number": "KA01" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "charged");
    assert_eq!(body["spot_id"], "A-1");
    // A stay well inside the plan owes nothing more
    assert_eq!(body["additional_due"], 0.0);

    let spots: Value = server.get("/api/v1/spots?free=true").await.json();
    assert_eq!(spots["total"], 3);
}

#[tokio::test]
async fn test_unknown_vehicle_exits_free() {
    let server = setup_server(None).await;

    let response = server
        .post("/api/v1/exit")
        .json(&json!({ "plate_number": "ZZ99" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "unknown_vehicle");
    assert_eq!(body["plate_number"], "ZZ99");
}

#[tokio::test]
async fn test_spot_listing_filters() {
    let server = setup_server(None).await;

    let body: Value = server.get("/api/v1/spots").await.json();
    assert_eq!(body["total"], 3);

    let body: Value = server.get("/api/v1/spots?category=disability").await.json();
    assert_eq!(body["total"], 1);
    assert_eq!(body["spots"][0]["id"], "D-1");
}

#[tokio::test]
async fn test_rates_and_dashboard() {
    let server = setup_server(None).await;

    let rates: Value = server.get("/api/v1/rates").await.json();
    assert_eq!(rates["base_hourly_rate"], 40.0);
    assert_eq!(rates["overtime_hourly_rate"], 60.0);
    assert_eq!(rates["plan_hours"], json!([4, 8]));

    server
        .post("/api/v1/entry")
        .json(&json!({ "plate_number": "KA01", "plan_hours": 8 }))
        .await
        .assert_status(StatusCode::CREATED);

    let dashboard: Value = server.get("/api/v1/dashboard").await.json();
    assert_eq!(dashboard["active_sessions"], 1);
    assert_eq!(dashboard["revenue"]["prepaid"], 320.0);
    assert_eq!(dashboard["revenue"]["total"], 320.0);
    assert_eq!(dashboard["occupancy"][0]["category"], "regular");
    assert_eq!(dashboard["occupancy"][0]["occupied"], 1);
    assert!(dashboard["stats"]["total_requests"].as_u64().unwrap() >= 2);
}

#[tokio::test]
async fn test_health() {
    let server = setup_server(None).await;
    let response = server.get("/api/v1/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "sqlite");
}

#[tokio::test]
async fn test_admin_token_gate() {
    let server = setup_server(Some("s3cret")).await;

    let response = server.get("/api/v1/admin/sessions").await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = server
        .get("/api/v1/admin/sessions")
        .authorization_bearer("wrong")
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = server
        .get("/api/v1/admin/sessions")
        .authorization_bearer("s3cret")
        .await;
    response.assert_status_ok();

    // Public routes stay open
    server.get("/api/v1/spots").await.assert_status_ok();
}

#[tokio::test]
async fn test_admin_spot_management() {
    let server = setup_server(None).await;

    let response = server
        .post("/api/v1/admin/spots")
        .json(&json!({ "category": "electric" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["id"], "E-1");

    let response = server
        .post("/api/v1/admin/spots")
        .json(&json!({ "id": "E-1", "category": "electric" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);

    server
        .delete("/api/v1/admin/spots/E-1")
        .await
        .assert_status(StatusCode::NO_CONTENT);
    server
        .delete("/api/v1/admin/spots/E-1")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_rates() {
    let server = setup_server(None).await;

    let response = server
        .put("/api/v1/admin/rates")
        .json(&json!({ "base_hourly_rate": 50.0, "overtime_hourly_rate": 75.5 }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["base_hourly_rate"], 50.0);

    let response = server
        .put("/api/v1/admin/rates")
        .json(&json!({ "base_hourly_rate": -5.0, "overtime_hourly_rate": 75.5 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "INVALID_RATE");

    let body: Value = server.post("/api/v1/admin/rates/reset").await.json();
    assert_eq!(body["base_hourly_rate"], 40.0);
}

#[tokio::test]
async fn test_admin_session_overrides() {
    let server = setup_server(None).await;

    let response = server
        .post("/api/v1/admin/sessions")
        .json(&json!({
            "plate_number": "KA01",
            "spot_id": "D-1",
            "plan_hours": 4,
            "entry_time": 0
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let sessions: Value = server.get("/api/v1/admin/sessions").await.json();
    assert_eq!(sessions["total"], 1);

    // 4h30m after the backdated entry
    let response = server
        .delete("/api/v1/admin/sessions/KA01")
        .add_query_param("exit_time", 16_200_000)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["total_amount"], 190.0);
    assert_eq!(body["additional_due"], 30.0);

    server
        .delete("/api/v1/admin/sessions/KA01")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let history: Value = server.get("/api/v1/admin/history?limit=10").await.json();
    assert_eq!(history["total"], 1);
    assert_eq!(history["sessions"][0]["exit"]["total_amount"], 190.0);
}
