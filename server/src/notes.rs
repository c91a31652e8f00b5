use axum::{extract::State, Json};
use lockstep_core::ChatNote;

use crate::app_state::SharedState;

/// Chat history, oldest first, for clients replaying it on load.
pub async fn list_notes(State(state): State<SharedState>) -> Json<Vec<ChatNote>> {
    Json(state.notes())
}
