use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use hearth_core::reporting::Dashboard;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::ApiQuery;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    pub hotel_id: Uuid,
    pub year: Option<i32>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/analytics/dashboard", get(dashboard))
}

async fn dashboard(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DashboardQuery>,
) -> Result<Json<Dashboard>, AppError> {
    let dashboard = state
        .services
        .reporting
        .dashboard(query.hotel_id, query.year, Utc::now())
        .await?;
    Ok(Json(dashboard))
}
