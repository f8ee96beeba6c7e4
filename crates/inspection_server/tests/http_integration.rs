//! HTTP-level tests for the inspection server contract: JWT authentication,
//! envelope shapes, and parameter validation.
//!
//! The router is built over a lazy pool, so everything that fails before
//! touching Postgres runs without a database. End-to-end flows against a
//! real database are marked `#[ignore]`; run them with:
//! DATABASE_URL="postgresql:///inspection" cargo test -p inspection_server --test http_integration -- --ignored

use std::sync::Arc;

use axum::body::Body;
use http_body_util::BodyExt;
use hyper::{Request, StatusCode};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

use inspection_core::ports::{AnswerStore, DirectoryStore, ImageIndex, InspectionStore};
use inspection_core::service::InspectionService;
use inspection_postgres::PgStores;
use inspection_server::middleware::jwt::JwtConfig;
use inspection_server::router::build_router;
use inspection_server::state::AppState;
use inspection_server::storage::FileStore;

// ── Test JWT helpers ───────────────────────────────────────────

const TEST_JWT_SECRET: &[u8] = b"test-secret-for-http-tests";

#[derive(Debug, Serialize)]
struct TestClaims {
    sub: String,
    org: String,
    name: String,
    role: String,
}

fn make_jwt(user_id: Uuid, org_id: Uuid, role: &str) -> String {
    let claims = TestClaims {
        sub: user_id.to_string(),
        org: org_id.to_string(),
        name: "Test Inspector".into(),
        role: role.into(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET),
    )
    .expect("failed to encode test JWT")
}

// ── Test app builder ───────────────────────────────────────────

fn build_test_app(database_url: &str) -> (axum::Router, tempfile::TempDir) {
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect_lazy(database_url)
        .expect("connect_lazy never fails on a well-formed url");

    let stores = PgStores::new(pool);
    let service = InspectionService::new(
        Arc::new(stores.inspections) as Arc<dyn InspectionStore>,
        Arc::new(stores.answers) as Arc<dyn AnswerStore>,
        Arc::new(stores.images) as Arc<dyn ImageIndex>,
        Arc::new(stores.directory) as Arc<dyn DirectoryStore>,
    );

    let tmp = tempfile::tempdir().expect("tempdir");
    let storage = FileStore::new(
        tmp.path().to_path_buf(),
        "http://localhost:4000".into(),
        "uploads".into(),
    );

    let state = Arc::new(AppState {
        service,
        storage,
        mailer: None,
        template_path: tmp.path().join("missing_template.docx"),
        report_image_box: (150, 200),
    });
    let app = build_router(state, JwtConfig::from_secret(TEST_JWT_SECRET));
    (app, tmp)
}

fn offline_app() -> (axum::Router, tempfile::TempDir) {
    // port 1 is never a postgres; only no-DB paths may run against this app
    build_test_app("postgresql://127.0.0.1:1/unreachable")
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ── No-database tests ──────────────────────────────────────────

#[tokio::test]
async fn health_is_public() {
    let (app, _tmp) = offline_app();
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let (app, _tmp) = offline_app();
    let response = app
        .oneshot(
            Request::post("/inspections/section-answers")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn garbage_token_is_unauthorized() {
    let (app, _tmp) = offline_app();
    let response = app
        .oneshot(
            Request::get("/inspections")
                .header("authorization", "Bearer not.a.jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_claims_are_unauthorized() {
    let (app, _tmp) = offline_app();
    // sub is not a uuid
    let claims = serde_json::json!({"sub": "42", "org": Uuid::new_v4().to_string()});
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET),
    )
    .unwrap();
    let response = app
        .oneshot(
            Request::get("/inspections")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_schedule_type_is_rejected_before_the_store() {
    let (app, _tmp) = offline_app();
    let token = make_jwt(Uuid::new_v4(), Uuid::new_v4(), "inspector");
    let response = app
        .oneshot(
            Request::get("/inspections/by-schedule-type/WEEKLY")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert!(body["message"].as_str().unwrap().contains("Хүсэлтийн"));
}

#[tokio::test]
async fn bad_section_status_is_rejected_before_the_store() {
    let (app, _tmp) = offline_app();
    let token = make_jwt(Uuid::new_v4(), Uuid::new_v4(), "inspector");
    let body = serde_json::json!({
        "inspectionId": Uuid::new_v4().to_string(),
        "section": "exterior",
        "answers": {},
        "sectionStatus": "HALF_DONE",
    });
    let response = app
        .oneshot(
            Request::post("/inspections/section-answers")
                .header("authorization", format!("Bearer {token}"))
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ── Database-backed flow (opt-in) ──────────────────────────────

#[tokio::test]
#[ignore = "requires a migrated postgres database via DATABASE_URL"]
async fn six_section_flow_end_to_end() {
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for ignored tests");
    let (app, _tmp) = build_test_app(&database_url);

    // The fixture organization/user/inspection must exist; see
    // inspection_postgres/migrations for the schema.
    let user_id: Uuid = std::env::var("TEST_USER_ID")
        .expect("TEST_USER_ID")
        .parse()
        .unwrap();
    let org_id: Uuid = std::env::var("TEST_ORG_ID")
        .expect("TEST_ORG_ID")
        .parse()
        .unwrap();
    let inspection_id: Uuid = std::env::var("TEST_INSPECTION_ID")
        .expect("TEST_INSPECTION_ID")
        .parse()
        .unwrap();
    let token = make_jwt(user_id, org_id, "inspector");

    let sections = ["exterior", "indicator", "jbox", "sensor", "foundation", "cleanliness"];
    for (i, section) in sections.iter().enumerate() {
        let mut body = serde_json::json!({
            "inspectionId": inspection_id.to_string(),
            "section": section,
            "answers": { "some_field": { "status": "ok" } },
            "isFirstSection": i == 0,
        });
        if i == 0 {
            body["answers"]["date"] = "2024-06-01".into();
        }
        if i + 1 == sections.len() {
            body["sectionStatus"] = "COMPLETED".into();
        }
        let response = app
            .clone()
            .oneshot(
                Request::post("/inspections/section-answers")
                    .header("authorization", format!("Bearer {token}"))
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "section {section}");
        let json = body_json(response).await;
        if i + 1 == sections.len() {
            assert_eq!(json["data"]["status"], "SUBMITTED");
            assert_eq!(json["data"]["progress"], 100);
            assert_eq!(json["data"]["isCompletion"], true);
        }
    }
}
