//! HTTP side of the relay: chat history and uploads.

use anyhow::Context;
use lockstep_core::{ChatNote, UploadResponse};
use reqwest::multipart::{Form, Part};
use std::path::Path;
use url::Url;

/// Field name the relay expects the media file under.
const UPLOAD_FIELD: &str = "video";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Stored by the relay and announced to the room.
    Stored(String),
    /// The relay answered without a URL.
    Rejected(Option<String>),
    /// The request never completed.
    Failed(String),
}

#[derive(Clone)]
pub struct RelayApi {
    http: reqwest::Client,
    base: Url,
}

impl RelayApi {
    pub fn new(base: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            base,
        }
    }

    /// WebSocket endpoint for this relay, carrying the chat name.
    pub fn ws_url(&self, name: &str) -> anyhow::Result<Url> {
        let mut url = self.base.join("/ws")?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|_| anyhow::anyhow!("cannot derive a websocket url from {}", self.base))?;
        url.query_pairs_mut().clear().append_pair("name", name);
        Ok(url)
    }

    /// Absolute form of a media URL announced by the relay.
    pub fn resolve(&self, url: &str) -> String {
        self.base
            .join(url)
            .map(String::from)
            .unwrap_or_else(|_| url.to_string())
    }

    pub async fn notes(&self) -> anyhow::Result<Vec<ChatNote>> {
        let url = self.base.join("/notes")?;
        let notes = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(notes)
    }

    pub async fn upload(&self, path: &Path) -> UploadOutcome {
        match self.try_upload(path).await {
            Ok(UploadResponse { url: Some(url), .. }) => UploadOutcome::Stored(url),
            Ok(UploadResponse { error, .. }) => UploadOutcome::Rejected(error),
            Err(e) => UploadOutcome::Failed(format!("{:#}", e)),
        }
    }

    async fn try_upload(&self, path: &Path) -> anyhow::Result<UploadResponse> {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video.mp4".to_string());

        let form = Form::new().part(UPLOAD_FIELD, Part::bytes(data).file_name(filename));
        let response = self
            .http
            .post(self.base.join("/upload")?)
            .multipart(form)
            .send()
            .await?;

        // Any body that is not the success shape counts as a rejection.
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body).unwrap_or_default())
    }
}
