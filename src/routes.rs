use crate::{
    handlers, // Import handlers module
    AppState,
};
use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Creates the Axum router and associates routes with handlers.
/// `max_upload_bytes` bounds every request body, uploads included.
pub fn create_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/memes", get(handlers::list_memes).post(handlers::upload_meme))
        .route(
            "/memes/{id}",
            get(handlers::get_meme)
                .patch(handlers::rename_meme)
                .delete(handlers::delete_meme),
        )
        .route("/memes/{id}/link", get(handlers::meme_link))
        .route("/memes/{id}/image", get(handlers::meme_image))
        .route("/images/{key}", get(handlers::get_image))
        // Middleware Layers
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state) // Pass the application state
}
