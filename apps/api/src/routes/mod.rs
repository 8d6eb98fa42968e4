pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::analysis::handlers as analysis;
use crate::documents::handlers as documents;
use crate::settings::handlers as settings;
use crate::state::AppState;

/// Résumés can be scanned PDFs; axum's 2 MB default is too small.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Documents
        .route("/api/v1/files/parse", post(documents::handle_parse_file))
        .route("/api/v1/files/upload", post(documents::handle_upload_file))
        .route("/api/v1/files/types", get(documents::handle_file_types))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        // Settings
        .route(
            "/api/v1/settings",
            get(settings::handle_get_settings)
                .put(settings::handle_save_settings)
                .delete(settings::handle_reset_settings),
        )
        .route("/api/v1/providers", get(settings::handle_list_providers))
        .route(
            "/api/v1/providers/status",
            get(settings::handle_provider_status),
        )
        .route(
            "/api/v1/providers/:provider/test",
            post(settings::handle_test_provider),
        )
        .route("/api/v1/models/local", get(settings::handle_local_models))
        // Completions
        .route("/api/v1/completions", post(analysis::handle_completion))
        .route("/api/v1/analyze", post(analysis::handle_analyze))
        .with_state(state)
}
