//! Multi-session HTTP API.
//!
//! ## Routes
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/health` | liveness |
//! | POST   | `/session/start` | create a session |
//! | GET    | `/session/{id}` | session info |
//! | DELETE | `/session/{id}` | destroy a session (idempotent) |
//! | POST   | `/session/{id}/upload` | multipart PDF upload into `input/` |
//! | POST   | `/session/{id}/ocr` | OCR |
//! | POST   | `/session/{id}/to-markdown` | PDF → Markdown |
//! | POST   | `/session/{id}/split-pages` | split |
//! | POST   | `/session/{id}/merge` | merge |
//! | GET    | `/session/{id}/download` | zip-all, or `?name=` best match |
//! | GET    | `/session/{id}/download/{*path}` | file by relative path |
//!
//! Every document operation runs on the shared [`WorkerPool`]; handlers
//! only await it, so session management and uploads stay responsive while
//! conversions are queued.

mod error;
mod handlers;

pub use error::ApiError;

use crate::config::WorkbenchConfig;
use crate::pool::WorkerPool;
use crate::session::{SessionId, SessionStore};
use crate::toolkit::{Collaborators, Toolkit};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Default request body limit: 200 MiB.
pub const DEFAULT_BODY_LIMIT: usize = 200 * 1024 * 1024;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SessionStore>,
    pub pool: WorkerPool,
    pub collaborators: Collaborators,
    pub config: Arc<WorkbenchConfig>,
}

impl AppState {
    /// Pool size comes from `config.workers`.
    pub fn new(
        store: Arc<dyn SessionStore>,
        collaborators: Collaborators,
        config: Arc<WorkbenchConfig>,
    ) -> Self {
        Self {
            store,
            pool: WorkerPool::new(config.workers),
            collaborators,
            config,
        }
    }

    /// Toolkit over the session's confined workspace.
    fn toolkit(&self, raw_id: &str) -> Result<Toolkit, ApiError> {
        let id: SessionId = raw_id.parse()?;
        let (_, workspace) = self.store.open_workspace(&id)?;
        Ok(Toolkit::new(
            workspace,
            self.collaborators.clone(),
            Arc::clone(&self.config),
        ))
    }
}

/// Build the router with CORS, request tracing and the body limit applied.
pub fn router(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/session/start", post(handlers::start_session))
        .route(
            "/session/{id}",
            get(handlers::session_info).delete(handlers::destroy_session),
        )
        .route("/session/{id}/upload", post(handlers::upload))
        .route("/session/{id}/ocr", post(handlers::ocr))
        .route("/session/{id}/to-markdown", post(handlers::to_markdown))
        .route("/session/{id}/split-pages", post(handlers::split_pages))
        .route("/session/{id}/merge", post(handlers::merge))
        .route("/session/{id}/download", get(handlers::download))
        .route("/session/{id}/download/{*path}", get(handlers::download_path))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
