use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use hearth_property::{Guest, GuestPatch, NewGuest};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelQuery {
    pub hotel_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub hotel_id: Uuid,
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub text: String,
    #[serde(default)]
    pub author: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/guests", post(create_guest).get(list_guests))
        .route("/guests/search", get(search_guests))
        .route("/guests/{id}", get(get_guest).patch(update_guest).delete(delete_guest))
        .route("/guests/{id}/notes", post(add_note))
}

/// POST /guests
/// Registers a guest, or returns the existing record (200) when the email,
/// phone or ID number is already known in the hotel.
async fn create_guest(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NewGuest>,
) -> Result<(StatusCode, Json<Guest>), AppError> {
    let (guest, created) = state.services.guests.create_guest(req).await?;
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(guest)))
}

async fn list_guests(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<HotelQuery>,
) -> Result<Json<Vec<Guest>>, AppError> {
    Ok(Json(state.services.guests.list_guests(query.hotel_id).await?))
}

async fn search_guests(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<Vec<Guest>>, AppError> {
    Ok(Json(state.services.guests.search_guests(query.hotel_id, &query.q).await?))
}

async fn get_guest(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Guest>, AppError> {
    Ok(Json(state.services.guests.get_guest(id).await?))
}

async fn update_guest(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<GuestPatch>,
) -> Result<Json<Guest>, AppError> {
    Ok(Json(state.services.guests.update_guest(id, patch).await?))
}

async fn delete_guest(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, AppError> {
    state.services.guests.delete_guest(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_note(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<NoteRequest>,
) -> Result<Json<Guest>, AppError> {
    Ok(Json(state.services.guests.add_note(id, req.text, req.author).await?))
}
