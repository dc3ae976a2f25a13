use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;

use crate::state::AppState;

pub mod pages;
pub mod posts;

/// Upper bound for avatar uploads.
pub const UPLOAD_LIMIT: usize = 8 * 1024 * 1024;

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Build the full application router: JSON API, HTML pages and static files.
pub fn build_router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.static_dir);

    let api = Router::new()
        .route("/posts/all", get(posts::list_posts))
        .route("/posts", post(posts::create_post))
        .route("/posts/:id", put(posts::update_post).delete(posts::delete_post));

    let pages = Router::new()
        .route("/", get(pages::index))
        .route("/add-post", get(pages::add_post_form).post(pages::add_post))
        .route(
            "/add-user",
            get(pages::add_user_form).post(pages::add_user).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        );

    Router::new()
        .merge(api)
        .merge(pages)
        .route("/health", get(health))
        .nest_service("/static", static_files)
        .with_state(state)
        .layer(CorsLayer::very_permissive())
        .layer(
            TraceLayer::new_for_http()
                // one span per request with method and path
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                // status code and latency
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
