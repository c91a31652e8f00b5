use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use crate::app_state::SharedState;
use crate::{handlers, notes, stream, upload};

pub fn create_router(state: SharedState) -> Router {
    let body_limit = state.config.media.body_limit();

    Router::new()
        .route("/ws", get(handlers::ws_handler))
        .route(
            "/upload",
            post(upload::upload).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/uploads/:filename", get(stream::serve_upload))
        .route("/notes", get(notes::list_notes))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<SharedState>) -> String {
    let names = state.peer_names();
    format!("ok ({} peers: {})", names.len(), names.join(", "))
}
