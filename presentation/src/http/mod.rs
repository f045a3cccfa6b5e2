//! HTTP surface
//!
//! | route | handler |
//! |---|---|
//! | `POST /api/consensus` | [`handlers::consensus`] |
//! | `GET /health` | [`handlers::health`] |

pub mod handlers;
pub mod state;

pub use state::AppState;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Request bodies may carry pre-supplied responses, so allow more than
/// axum's 2MB default.
const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Build the application router.
pub fn router(state: AppState, cors_permissive: bool) -> Router {
    let cors = if cors_permissive {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/api/consensus", post(handlers::consensus))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serve `app` on `listener` until `shutdown` resolves.
///
/// In-flight streams are allowed to finish once shutdown begins.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
