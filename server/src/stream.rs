use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use crate::app_state::SharedState;
use crate::upload::secure_filename;
use tower_http::services::ServeFile;
use tower::ServiceExt; // for oneshot

/// Serve an uploaded video with range support so players can seek.
pub async fn serve_upload(
    State(state): State<SharedState>,
    Path(filename): Path<String>,
    req: Request,
) -> Response {
    // Only names the upload endpoint could have produced
    if filename.is_empty() || secure_filename(&filename) != filename {
        return (StatusCode::NOT_FOUND, "No such video").into_response();
    }

    let path = state.config.media.upload_dir.join(&filename);
    match ServeFile::new(path).oneshot(req).await {
        Ok(res) => res.into_response(),
        Err(err) => {
            tracing::error!("Failed to serve file: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to serve file").into_response()
        }
    }
}
