use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ProtocolError;

/// Playback action carried by a `video_event`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Play,
    Pause,
    Seek,
}

/// A single playback change, stated as an absolute target time in seconds.
///
/// A missing, `null` or non-numeric `time` decodes as NaN so the receiver can
/// skip the seek and still perform the action.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SyncEvent {
    pub action: SyncAction,
    #[serde(default = "nan", deserialize_with = "lenient_time")]
    pub time: f64,
}

impl SyncEvent {
    pub fn new(action: SyncAction, time: f64) -> Self {
        Self { action, time }
    }
}

fn nan() -> f64 {
    f64::NAN
}

fn lenient_time<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64().unwrap_or(f64::NAN))
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NewVideo {
    pub url: String,
}

/// One line of chat history as served by `GET /notes`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatNote {
    pub author: String,
    pub content: String,
}

/// Body of a `POST /upload` response. Failure is any shape without `url`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    VideoEvent(SyncEvent),
    ChatMessage(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome { session_id: String },
    VideoEvent(SyncEvent),
    NewVideo(NewVideo),
    ChatMessage(String),
}

impl ClientMessage {
    pub fn to_text(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_text(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

impl ServerMessage {
    pub fn to_text(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_text(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}
