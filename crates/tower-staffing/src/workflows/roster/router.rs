use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use super::domain::EntityId;
use super::roster::{NewResident, NewShop, ResidentUpdate, ShopUpdate};
use super::service::{RosterService, RosterServiceError};
use super::store::{RosterStore, StoreError};
use crate::error::AppError;
use crate::workflows::import;

/// Router builder exposing roster editing, optimization, and import endpoints.
pub fn roster_router<S>(service: Arc<RosterService<S>>) -> Router
where
    S: RosterStore + 'static,
{
    Router::new()
        .route("/api/v1/roster", get(roster_handler::<S>))
        .route("/api/v1/residents", post(add_resident_handler::<S>))
        .route(
            "/api/v1/residents/:id",
            put(update_resident_handler::<S>).delete(remove_resident_handler::<S>),
        )
        .route("/api/v1/shops", post(add_shop_handler::<S>))
        .route(
            "/api/v1/shops/:id",
            put(update_shop_handler::<S>).delete(remove_shop_handler::<S>),
        )
        .route("/api/v1/optimize", post(optimize_handler::<S>))
        .route("/api/v1/staffing", get(staffing_handler::<S>))
        .route("/api/v1/import", post(import_handler::<S>))
        .route("/api/v1/import/preview", post(preview_handler::<S>))
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OptimizeRequest {
    #[serde(default)]
    lock_existing: bool,
}

fn respond<T: serde::Serialize, E: Into<AppError>>(status: StatusCode, result: Result<T, E>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(err) => err.into().into_response(),
    }
}

/// Runs a roster mutation on the blocking pool, since commits write the snapshot synchronously.
pub(crate) async fn run_blocking<S, T, F>(
    service: Arc<RosterService<S>>,
    operation: F,
) -> Result<T, RosterServiceError>
where
    S: RosterStore + 'static,
    T: Send + 'static,
    F: FnOnce(&RosterService<S>) -> Result<T, RosterServiceError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || operation(&service))
        .await
        .map_err(|err| StoreError::Unavailable(format!("roster task failed: {err}")))?
}

pub(crate) async fn roster_handler<S>(State(service): State<Arc<RosterService<S>>>) -> Response
where
    S: RosterStore + 'static,
{
    respond(StatusCode::OK, service.view())
}

pub(crate) async fn add_resident_handler<S>(
    State(service): State<Arc<RosterService<S>>>,
    Json(resident): Json<NewResident>,
) -> Response
where
    S: RosterStore + 'static,
{
    let result = run_blocking(service, move |service| service.add_resident(resident)).await;
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn update_resident_handler<S>(
    State(service): State<Arc<RosterService<S>>>,
    Path(id): Path<u64>,
    Json(update): Json<ResidentUpdate>,
) -> Response
where
    S: RosterStore + 'static,
{
    let result =
        run_blocking(service, move |service| service.update_resident(EntityId(id), update)).await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn remove_resident_handler<S>(
    State(service): State<Arc<RosterService<S>>>,
    Path(id): Path<u64>,
) -> Response
where
    S: RosterStore + 'static,
{
    let result = run_blocking(service, move |service| service.remove_resident(EntityId(id))).await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn add_shop_handler<S>(
    State(service): State<Arc<RosterService<S>>>,
    Json(shop): Json<NewShop>,
) -> Response
where
    S: RosterStore + 'static,
{
    let result = run_blocking(service, move |service| service.add_shop(shop)).await;
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn update_shop_handler<S>(
    State(service): State<Arc<RosterService<S>>>,
    Path(id): Path<u64>,
    Json(update): Json<ShopUpdate>,
) -> Response
where
    S: RosterStore + 'static,
{
    let result = run_blocking(service, move |service| service.update_shop(EntityId(id), update)).await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn remove_shop_handler<S>(
    State(service): State<Arc<RosterService<S>>>,
    Path(id): Path<u64>,
) -> Response
where
    S: RosterStore + 'static,
{
    let result = run_blocking(service, move |service| service.remove_shop(EntityId(id))).await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn optimize_handler<S>(
    State(service): State<Arc<RosterService<S>>>,
    request: Option<Json<OptimizeRequest>>,
) -> Response
where
    S: RosterStore + 'static,
{
    let Json(request) = request.unwrap_or_default();
    let lock_existing = request.lock_existing;
    let result = run_blocking(service, move |service| service.optimize(lock_existing)).await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn staffing_handler<S>(State(service): State<Arc<RosterService<S>>>) -> Response
where
    S: RosterStore + 'static,
{
    respond(StatusCode::OK, service.staffing())
}

pub(crate) async fn import_handler<S>(
    State(service): State<Arc<RosterService<S>>>,
    Json(payload): Json<Value>,
) -> Response
where
    S: RosterStore + 'static,
{
    let result = run_blocking(service, move |service| service.import(&payload)).await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn preview_handler<S>(
    State(service): State<Arc<RosterService<S>>>,
    Json(payload): Json<Value>,
) -> Response
where
    S: RosterStore + 'static,
{
    match import::validate_candidates(&payload) {
        Ok(batch) => respond(StatusCode::OK, service.preview(&batch)),
        Err(err) => AppError::from(err).into_response(),
    }
}
