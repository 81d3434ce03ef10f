//! Web chat server
//!
//! Serves the single-page chat UI and the JSON API behind it. All session
//! state is held in memory by [`AppState`].

mod error;
mod routes;
mod state;

pub use error::ApiError;
pub use state::{AppState, GeneratorFactory, RetrieverLoader};

use std::net::SocketAddr;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::error::{MedibotError, Result};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health_check))
        .route(
            "/api/questionnaires",
            get(routes::questionnaires::list_questionnaires),
        )
        .route(
            "/api/questionnaires/{id}",
            get(routes::questionnaires::get_questionnaire),
        )
        .route(
            "/api/screenings",
            post(routes::questionnaires::submit_screening),
        )
        .route("/api/sessions", post(routes::sessions::create_session))
        .route(
            "/api/sessions/{id}",
            get(routes::sessions::get_session).delete(routes::sessions::end_session),
        )
        .route(
            "/api/sessions/{id}/messages",
            post(routes::sessions::post_message),
        )
        .route(
            "/api/sessions/{id}/moods",
            get(routes::sessions::mood_summary).post(routes::sessions::log_mood),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(state: AppState, addr: &str) -> Result<()> {
    let addr: SocketAddr = addr.parse().map_err(|e| MedibotError::InvalidConfigValue {
        path: "server.bind_addr".to_string(),
        message: format!("'{}': {}", addr, e),
    })?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| MedibotError::Io {
            source: e,
            context: format!("Failed to bind {}", addr),
        })?;

    tracing::info!("MediBot listening on http://{}", addr);

    tokio::spawn(sweep_idle_sessions(state.clone()));

    axum::serve(listener, router(state))
        .await
        .map_err(|e| MedibotError::Io {
            source: e,
            context: "Server stopped".to_string(),
        })
}

/// Periodically drop sessions whose tab went away without ending them
async fn sweep_idle_sessions(state: AppState) {
    let period = Duration::from_secs((state.config.server.session_ttl_secs / 4).clamp(1, 60));
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        state
            .sessions
            .lock()
            .await
            .expire_idle(chrono::Utc::now());
    }
}
