//! HTTP handlers for the submit and list commands.
//!
//! Handlers receive the rectangle log through router state. Every failure is
//! turned into a response for the request that caused it.

use crate::{
    error::ServerError,
    geometry::{batch_timestamp, filter_intersecting, FilterRequest},
    storage::RectangleLog,
};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{debug, info};

/// Body returned by the list command before anything has been stored.
pub const NO_DATA_MESSAGE: &str = "Data file not found.";

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<dyn RectangleLog>,
}

/// `POST /`: keep the candidates that intersect the main rectangle and append
/// them to the log.
///
/// The body is decoded from raw bytes so that a missing or unusual
/// `Content-Type` header does not matter; only the JSON shape does.
pub async fn submit(State(state): State<AppState>, body: Bytes) -> Result<StatusCode, ServerError> {
    let captured_at = batch_timestamp();
    let request: FilterRequest = serde_json::from_slice(&body)?;
    debug!(?request, "Decoded filter request");

    let matches = filter_intersecting(&request.main, &request.input, &captured_at);
    info!(
        "{} of {} candidate(s) intersect the main rectangle",
        matches.len(),
        request.input.len()
    );

    state.store.append(&matches).await?;
    Ok(StatusCode::OK)
}

/// `GET /`: list every stored rectangle in the order it was appended.
pub async fn list(State(state): State<AppState>) -> Result<Response, ServerError> {
    match state.store.read_all().await? {
        Some(rectangles) => Ok(Json(rectangles).into_response()),
        None => {
            info!("{}", NO_DATA_MESSAGE);
            let body = serde_json::Value::from(NO_DATA_MESSAGE).to_string();
            Ok((
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                body,
            )
                .into_response())
        }
    }
}

/// `GET /health`
pub async fn health() -> StatusCode {
    StatusCode::OK
}
