use axum::{extract::State, routing::get, Json, Router};
use hearth_folio::Invoice;
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::ApiPath;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/invoices/{id}", get(get_invoice))
        .route("/invoices/booking/{booking_id}", get(booking_invoices))
}

async fn get_invoice(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Invoice>, AppError> {
    Ok(Json(state.services.checkout.get_invoice(id).await?))
}

async fn booking_invoices(
    State(state): State<AppState>,
    ApiPath(booking_id): ApiPath<Uuid>,
) -> Result<Json<Vec<Invoice>>, AppError> {
    Ok(Json(state.services.checkout.list_invoices(booking_id).await?))
}
