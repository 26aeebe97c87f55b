use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use hearth_core::checkout::{CheckoutDetails, CheckoutReceipt, CheckoutRequest};
use hearth_core::CoreError;
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/checkout/process", post(process_checkout))
        .route("/checkout/guest/{user_id}", get(checkout_details))
}

/// POST /checkout/process
/// Settles the balance and closes a checked-in stay.
async fn process_checkout(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CheckoutRequest>,
) -> Result<Json<CheckoutReceipt>, AppError> {
    match state.services.checkout.process_checkout(req).await {
        Ok(receipt) => {
            state.metrics.checkouts.with_label_values(&["paid"]).inc();
            Ok(Json(receipt))
        }
        Err(err) => {
            state.metrics.checkouts.with_label_values(&["failed"]).inc();
            if matches!(err, CoreError::Payment(_)) {
                state.metrics.payment_failures.inc();
            }
            Err(err.into())
        }
    }
}

/// GET /checkout/guest/:userId
/// Preview of the bill for the guest's current stay.
async fn checkout_details(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Json<CheckoutDetails>, AppError> {
    Ok(Json(state.services.checkout.checkout_details(user_id).await?))
}
