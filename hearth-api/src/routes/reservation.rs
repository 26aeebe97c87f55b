use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use hearth_property::{Room, RoomType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::ApiQuery;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub hotel_id: Uuid,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub room_type: Option<RoomType>,
}

#[derive(Debug, Serialize)]
pub struct AvailableRooms {
    pub count: usize,
    pub data: Vec<Room>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/reservation/getAvailableRooms", get(get_available_rooms))
}

/// GET /reservation/getAvailableRooms
/// Rooms that are available now and free for the whole requested stay.
async fn get_available_rooms(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AvailabilityQuery>,
) -> Result<Json<AvailableRooms>, AppError> {
    let rooms = state
        .services
        .rooms
        .find_available_rooms(query.hotel_id, query.check_in, query.check_out, query.room_type)
        .await?;
    Ok(Json(AvailableRooms {
        count: rooms.len(),
        data: rooms,
    }))
}
