//! Request handlers

use super::state::AppState;
use crate::wire::EventEncoder;
use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{HeaderName, StatusCode, header},
    response::{IntoResponse, Response},
};
use ensemble_application::{EventSink, RunEnsembleError};
use ensemble_domain::{EnsembleEvent, EnsembleRequest};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

/// `POST /api/consensus`
///
/// Validates the request, then answers with an event stream while the run
/// proceeds in its own task. Dropping the response body cancels the run.
pub async fn consensus(
    State(state): State<AppState>,
    payload: Result<Json<EnsembleRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!("Rejected request body: {}", rejection.body_text());
            return error_response(rejection.status(), rejection.body_text());
        }
    };

    let run = match state.use_case.prepare(request) {
        Ok(run) => run,
        Err(RunEnsembleError::InvalidRequest(e)) => {
            info!("Invalid ensemble request: {}", e);
            return error_response(StatusCode::BAD_REQUEST, e.to_string());
        }
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let (sink, rx) = EventSink::channel(state.use_case.params().event_buffer);
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();

    let use_case = Arc::clone(&state.use_case);
    tokio::spawn(async move {
        match use_case.execute(run, sink, cancel).await {
            Ok(_) => debug!("Event stream finished"),
            Err(RunEnsembleError::Cancelled) => info!("Client disconnected, run abandoned"),
            Err(e) => warn!("Ensemble run failed: {}", e),
        }
    });

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/event-stream; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache, no-transform"),
            (header::CONNECTION, "keep-alive"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        event_body(rx, guard),
    )
        .into_response()
}

/// `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Stream every event from `rx` as one encoded frame.
///
/// The body owns `guard`: when the client goes away the body is dropped and
/// the run is cancelled.
fn event_body(rx: mpsc::Receiver<EnsembleEvent>, guard: DropGuard) -> Body {
    let frames = futures::stream::unfold((rx, guard), |(mut rx, guard)| async move {
        loop {
            let event = rx.recv().await?;
            match EventEncoder.encode(&event) {
                Ok(frame) => return Some((Ok::<_, Infallible>(frame), (rx, guard))),
                Err(e) => warn!(kind = event.kind(), "Dropping unencodable event: {}", e),
            }
        }
    });
    Body::from_stream(frames)
}
