use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures_util::stream::{Stream, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::ApiQuery;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQuery {
    pub hotel_id: Option<Uuid>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/events", get(event_stream))
}

/// GET /events
/// Live dashboard feed. Lagged subscribers skip the missed events.
async fn event_stream(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<EventQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    let hotel_id = query.hotel_id;
    let rx = state.events.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(event) if hotel_id.map_or(true, |id| event.hotel_id() == id) => {
                Some(Event::default().event(event.name()).json_data(&event))
            }
            Ok(_) => None,
            Err(e) => {
                tracing::debug!("Event subscriber lagged: {}", e);
                None
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
