use axum::Router;

use crate::state::AppState;

pub mod analytics;
pub mod bookings;
pub mod checkout;
pub mod events;
pub mod guests;
pub mod invoices;
pub mod reservation;
pub mod room_service;
pub mod rooms;
pub mod system;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(bookings::routes())
        .merge(reservation::routes())
        .merge(checkout::routes())
        .merge(invoices::routes())
        .merge(room_service::routes())
        .merge(rooms::routes())
        .merge(guests::routes())
        .merge(analytics::routes())
        .merge(events::routes())
        .merge(system::routes())
}
