use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use hearth_core::room_service::PendingCharges;
use hearth_folio::{ChargePatch, NewCharge, RoomServiceCharge};
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/room-service/charge", post(create_charge))
        .route("/room-service/pending-charges/{booking_id}", get(pending_charges))
        .route("/room-service/booking/{booking_id}", get(booking_charges))
        .route("/room-service/{id}/status", patch(update_status))
}

async fn create_charge(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NewCharge>,
) -> Result<(StatusCode, Json<RoomServiceCharge>), AppError> {
    let charge = state.services.room_service.create_charge(req).await?;
    state.metrics.room_service_charges.inc();
    Ok((StatusCode::CREATED, Json(charge)))
}

async fn pending_charges(
    State(state): State<AppState>,
    ApiPath(booking_id): ApiPath<Uuid>,
) -> Result<Json<PendingCharges>, AppError> {
    Ok(Json(state.services.room_service.pending_charges(booking_id).await?))
}

async fn booking_charges(
    State(state): State<AppState>,
    ApiPath(booking_id): ApiPath<Uuid>,
) -> Result<Json<Vec<RoomServiceCharge>>, AppError> {
    Ok(Json(state.services.room_service.list_charges(booking_id).await?))
}

async fn update_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<ChargePatch>,
) -> Result<Json<RoomServiceCharge>, AppError> {
    Ok(Json(state.services.room_service.update_status(id, patch).await?))
}
