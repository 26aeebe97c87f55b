use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::NaiveDate;
use hearth_core::repository::RoomFilter;
use hearth_property::room::RevenueReport;
use hearth_property::{NewRoom, Room, RoomPatch, RoomStatus, RoomType};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomQuery {
    pub hotel_id: Uuid,
    pub status: Option<RoomStatus>,
    pub room_type: Option<RoomType>,
    pub floor: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: RoomStatus,
}

#[derive(Debug, Deserialize)]
pub struct RevenueQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rooms", post(create_room).get(list_rooms))
        .route("/rooms/{id}", get(get_room).patch(update_room).delete(delete_room))
        .route("/rooms/{id}/status", patch(update_status))
        .route("/rooms/{id}/clean", post(mark_cleaned))
        .route("/rooms/{id}/revenue", get(room_revenue))
}

async fn create_room(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NewRoom>,
) -> Result<(StatusCode, Json<Room>), AppError> {
    let room = state.services.rooms.create_room(req).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

async fn list_rooms(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RoomQuery>,
) -> Result<Json<Vec<Room>>, AppError> {
    let filter = RoomFilter {
        status: query.status,
        room_type: query.room_type,
        floor: query.floor,
    };
    Ok(Json(state.services.rooms.list_rooms(query.hotel_id, filter).await?))
}

async fn get_room(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Room>, AppError> {
    Ok(Json(state.services.rooms.get_room(id).await?))
}

async fn update_room(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<RoomPatch>,
) -> Result<Json<Room>, AppError> {
    Ok(Json(state.services.rooms.update_room(id, patch).await?))
}

async fn delete_room(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, AppError> {
    state.services.rooms.delete_room(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<StatusUpdate>,
) -> Result<Json<Room>, AppError> {
    Ok(Json(state.services.rooms.update_room_status(id, req.status).await?))
}

async fn mark_cleaned(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Room>, AppError> {
    Ok(Json(state.services.rooms.mark_cleaned(id).await?))
}

async fn room_revenue(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<RevenueQuery>,
) -> Result<Json<RevenueReport>, AppError> {
    Ok(Json(state.services.rooms.room_revenue(id, query.from, query.to).await?))
}
