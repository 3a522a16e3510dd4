//! formfill-web library - certification form filling service
//!
//! Accepts an attendee roster upload and a form type selection, fills the
//! matching certification templates in batches and returns the filled copies
//! as one zip archive.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use formfill_common::config::Settings;
use formfill_common::FormCatalog;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;

pub use error::{ApiError, ApiResult};

/// Largest accepted upload (rosters are small text files)
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Validated form catalog, read-only after startup
    pub catalog: Arc<FormCatalog>,
    /// Resolved directories and options
    pub settings: Arc<Settings>,
    /// Server start time, reported by the health endpoint
    pub startup_time: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(catalog: FormCatalog, settings: Settings) -> Self {
        Self {
            catalog: Arc::new(catalog),
            settings: Arc::new(settings),
            startup_time: Instant::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/", get(api::serve_index).post(api::generate_forms))
        .route("/api/generate", post(api::generate_forms))
        .route("/api/forms", get(api::list_forms))
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
