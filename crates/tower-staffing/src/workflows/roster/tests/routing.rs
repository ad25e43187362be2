use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::roster::domain::Category;
use crate::workflows::roster::router::{remove_shop_handler, run_blocking};
use crate::workflows::roster::store::{MemoryRosterStore, RosterStore, StoreError};
use crate::workflows::roster::{RosterService, RosterServiceError};

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("encode body")))
        .expect("request")
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn add_resident_returns_created_with_defaults() {
    let (service, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/residents",
            json!({ "name": "Perry Mitchell", "skills": { "Food": 7 }, "dream_job": "Mechanic" }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["id"], 1);
    assert_eq!(body["skills"]["Food"], 7);
    assert_eq!(body["skills"]["Retail"], 5);
    assert_eq!(body["dream_job"], "Mechanic");
}

#[tokio::test]
async fn duplicate_shop_returns_conflict() {
    let (service, _) = seeded_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/shops",
            json!({ "name": "diner", "category": "Food", "capacity": 3 }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json_body(response).await;
    assert!(body["error"].as_str().expect("message").contains("already exists"));
}

#[tokio::test]
async fn zero_capacity_shop_is_unprocessable() {
    let (service, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/shops",
            json!({ "name": "Arcade", "category": "Recreation", "capacity": 0 }),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn remove_shop_handler_returns_not_found_for_unknown_id() {
    let (service, _) = build_service();
    let response = remove_shop_handler(State(Arc::new(service)), Path(42)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn optimize_route_returns_staffing_report() {
    let (service, _) = seeded_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request("POST", "/api/v1/optimize", json!({ "lock_existing": false })))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["metrics"]["total_skill"], 16);
    assert_eq!(body["metrics"]["efficiency_pct"], 89);
    assert_eq!(body["shops"][0]["workers"][0]["name"], "Ada");
    assert_eq!(body["unplaced_residents"], json!(["Bo"]));
}

#[tokio::test]
async fn optimize_without_body_defaults_to_unlocked() {
    let (service, _) = seeded_service();
    let service = Arc::new(service);
    let router = crate::workflows::roster::roster_router(service.clone());

    let response = router
        .oneshot(empty_request("POST", "/api/v1/optimize"))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(service.roster().expect("roster").assignments().filled_slots(), 2);
}

#[tokio::test]
async fn optimize_with_empty_roster_is_unprocessable() {
    let (service, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request("POST", "/api/v1/optimize", json!({ "lock_existing": true })))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn import_preview_then_import() {
    let (service, _) = seeded_service();
    let service = Arc::new(service);
    let payload = json!([
        { "name": "ADA", "skills": { "Food": 2 } },
        { "name": "Dee", "skills": { "Retail": "6" }, "fav": "Boutique" }
    ]);

    let preview = crate::workflows::roster::roster_router(service.clone())
        .oneshot(json_request("POST", "/api/v1/import/preview", payload.clone()))
        .await
        .expect("router responds");
    assert_eq!(preview.status(), StatusCode::OK);
    let rows = read_json_body(preview).await;
    assert_eq!(rows[0]["action"], "update");
    assert_eq!(rows[0]["existing_id"], 2);
    assert_eq!(rows[1]["action"], "create");
    assert_eq!(service.roster().expect("roster").residents().len(), 3);

    let imported = crate::workflows::roster::roster_router(service.clone())
        .oneshot(json_request("POST", "/api/v1/import", payload))
        .await
        .expect("router responds");
    assert_eq!(imported.status(), StatusCode::OK);
    let summary = read_json_body(imported).await;
    assert_eq!(summary, json!({ "created": 1, "updated": 1 }));
}

#[tokio::test]
async fn malformed_import_is_unprocessable() {
    let (service, _) = seeded_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request("POST", "/api/v1/import", json!({ "residents": [] })))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert!(body["error"].as_str().expect("message").contains("scan again"));
}

#[tokio::test]
async fn roster_route_lists_everything() {
    let (service, _) = seeded_service();
    let service = Arc::new(service);
    service
        .add_shop(shop("Arcade", Category::Recreation, 1))
        .expect("shop");

    let response = crate::workflows::roster::roster_router(service)
        .oneshot(empty_request("GET", "/api/v1/roster"))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["shops"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["residents"].as_array().map(Vec::len), Some(3));
    assert_eq!(body["metrics"]["unplaced"], 3);
}

#[tokio::test]
async fn update_and_delete_resident_routes() {
    let (service, _) = seeded_service();
    let service: Arc<RosterService<_>> = Arc::new(service);

    let updated = crate::workflows::roster::roster_router(service.clone())
        .oneshot(json_request(
            "PUT",
            "/api/v1/residents/3",
            json!({ "skills": { "Service": 9 }, "dream_job": "" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(updated.status(), StatusCode::OK);
    let body = read_json_body(updated).await;
    assert_eq!(body["skills"]["Service"], 9);
    assert!(body.get("dream_job").is_none());

    let deleted = crate::workflows::roster::roster_router(service.clone())
        .oneshot(empty_request("DELETE", "/api/v1/residents/3"))
        .await
        .expect("router responds");
    assert_eq!(deleted.status(), StatusCode::OK);

    let missing = crate::workflows::roster::roster_router(service)
        .oneshot(empty_request("DELETE", "/api/v1/residents/3"))
        .await
        .expect("router responds");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn route_mutations_are_saved_through_the_store() {
    let (service, store) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/shops",
            json!({ "name": "Diner", "category": "Food", "capacity": 2 }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);

    let saved = store.load().expect("load").expect("snapshot saved");
    assert_eq!(saved.shops.len(), 1);
    assert_eq!(saved.shops[0].name, "Diner");
}

#[tokio::test]
async fn a_crashed_roster_task_is_reported_as_a_store_failure() {
    let (service, _) = build_service();
    let result = run_blocking(
        Arc::new(service),
        |_: &RosterService<MemoryRosterStore>| -> Result<(), RosterServiceError> {
            panic!("disk vanished")
        },
    )
    .await;

    match result {
        Err(RosterServiceError::Store(StoreError::Unavailable(message))) => {
            assert!(message.contains("roster task failed"));
        }
        other => panic!("expected store failure, got {other:?}"),
    }
}
