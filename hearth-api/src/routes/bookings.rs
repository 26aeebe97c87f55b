use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use hearth_core::bookings::{BookingView, CheckInRequest};
use hearth_core::repository::BookingFilter;
use hearth_folio::{Booking, BookingPatch, BookingStatus, Invoice, NewBooking};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BookingCreated {
    pub booking: Booking,
}

#[derive(Debug, Serialize)]
pub struct GuestCheckedIn {
    pub booking: Booking,
    pub invoice: Invoice,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BookingQuery {
    pub hotel_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
    pub guest_id: Option<Uuid>,
    pub room_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub active_only: bool,
}

impl From<BookingQuery> for BookingFilter {
    fn from(q: BookingQuery) -> Self {
        BookingFilter {
            hotel_id: q.hotel_id,
            status: q.status,
            active_only: q.active_only,
            guest_id: q.guest_id,
            room_id: q.room_id,
            from: q.from,
            to: q.to,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/booking", get(list_bookings))
        .route("/booking/create", post(create_booking))
        .route("/booking/checkInGuest", post(check_in_guest))
        .route("/booking/guest/{guest_id}", get(guest_bookings))
        .route(
            "/booking/{id}",
            get(get_booking).patch(update_booking).delete(delete_booking),
        )
        .route("/booking/{id}/cancel", post(cancel_booking))
}

async fn create_booking(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NewBooking>,
) -> Result<(StatusCode, Json<BookingCreated>), AppError> {
    let booking = state.services.bookings.create_booking(req).await?;
    state.metrics.bookings_created.inc();
    Ok((StatusCode::CREATED, Json(BookingCreated { booking })))
}

/// POST /booking/checkInGuest
/// Walk-in: creates a checked-in booking and its stay invoice.
async fn check_in_guest(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CheckInRequest>,
) -> Result<(StatusCode, Json<GuestCheckedIn>), AppError> {
    let (booking, invoice) = state.services.bookings.check_in_guest(req).await?;
    state.metrics.bookings_created.inc();
    state.metrics.check_ins.inc();
    Ok((StatusCode::CREATED, Json(GuestCheckedIn { booking, invoice })))
}

async fn get_booking(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<BookingView>, AppError> {
    Ok(Json(state.services.bookings.get_booking(id).await?))
}

async fn list_bookings(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<BookingQuery>,
) -> Result<Json<Vec<BookingView>>, AppError> {
    Ok(Json(state.services.bookings.list_bookings(query.into()).await?))
}

async fn guest_bookings(
    State(state): State<AppState>,
    ApiPath(guest_id): ApiPath<Uuid>,
) -> Result<Json<Vec<BookingView>>, AppError> {
    Ok(Json(state.services.bookings.guest_bookings(guest_id).await?))
}

async fn update_booking(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<BookingPatch>,
) -> Result<Json<Booking>, AppError> {
    let checking_in = patch.status == Some(BookingStatus::CheckedIn);
    let booking = state.services.bookings.update_booking(id, patch).await?;
    if checking_in {
        state.metrics.check_ins.inc();
    }
    Ok(Json(booking))
}

async fn cancel_booking(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.services.bookings.cancel_booking(id).await?))
}

async fn delete_booking(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, AppError> {
    state.services.bookings.delete_booking(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
