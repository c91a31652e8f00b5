use axum::{
    extract::{multipart::Field, Multipart, State},
    Json,
};
use lockstep_core::{NewVideo, ServerMessage, UploadResponse};
use std::path::Path;
use tokio::io::AsyncWriteExt;

use crate::app_state::SharedState;
use crate::error::AppError;

/// Multipart field carrying the media file.
pub const UPLOAD_FIELD: &str = "video";

pub async fn upload(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let _guard = state.upload_lock.lock().await;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let raw_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(AppError::MissingFile),
        };
        let filename = secure_filename(&raw_name);
        if filename.is_empty() {
            return Err(AppError::InvalidFilename);
        }

        let path = state.config.media.upload_dir.join(&filename);
        if let Err(e) = write_field(field, &path).await {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e);
        }

        let url = format!("/uploads/{}", filename);
        tracing::info!("Stored upload {} as {}", raw_name, url);
        state.broadcast(ServerMessage::NewVideo(NewVideo { url: url.clone() }));

        return Ok(Json(UploadResponse {
            url: Some(url),
            error: None,
        }));
    }

    Err(AppError::MissingFile)
}

async fn write_field(mut field: Field<'_>, path: &Path) -> Result<(), AppError> {
    let mut file = tokio::fs::File::create(path).await?;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(())
}

/// Reduce a client-supplied name to a flat ASCII filename: path separators
/// and whitespace become `_`, anything outside `[A-Za-z0-9._-]` is dropped,
/// and leading/trailing dots and underscores are trimmed. May return "".
pub fn secure_filename(name: &str) -> String {
    let spaced: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}
