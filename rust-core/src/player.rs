//! Local media element abstraction.
//!
//! The sync controller never owns playback itself; it reads and mutates a
//! [`MediaPlayer`] and reports user-visible feedback through a [`Presenter`].

use std::fmt;

use crate::error::PlayerError;

/// How much of the media the player has loaded. Ordered so that
/// `ready_state() >= ReadyState::HasMetadata` reads naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    NoMetadata,
    HasMetadata,
}

/// Play/pause transition, either requested or observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    Play,
    Pause,
}

impl PlayerAction {
    pub fn symbol(self) -> &'static str {
        match self {
            PlayerAction::Play => "▶",
            PlayerAction::Pause => "❚❚",
        }
    }
}

/// Observable state of the local player at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    pub current_time: f64,
    pub paused: bool,
    pub ready_state: ReadyState,
}

pub trait MediaPlayer {
    fn current_time(&self) -> f64;

    fn set_current_time(&mut self, time: f64) -> Result<(), PlayerError>;

    fn is_paused(&self) -> bool;

    fn ready_state(&self) -> ReadyState;

    fn play(&mut self) -> Result<(), PlayerError>;

    fn pause(&mut self) -> Result<(), PlayerError>;

    fn source(&self) -> Option<&str>;

    /// Replace the media. The player starts over at time 0 without metadata.
    fn set_source(&mut self, url: &str);

    fn snapshot(&self) -> PlaybackState {
        PlaybackState {
            current_time: self.current_time(),
            paused: self.is_paused(),
            ready_state: self.ready_state(),
        }
    }
}

/// Status line owned by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Connected,
    Disconnected,
    Uploading,
    MediaReady,
    UploadFailed,
    ConnectionError,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Status::Connected => "connected",
            Status::Disconnected => "disconnected",
            Status::Uploading => "uploading video…",
            Status::MediaReady => "video ready to watch together",
            Status::UploadFailed => "upload failed",
            Status::ConnectionError => "connection error",
        };
        f.write_str(text)
    }
}

/// User-facing side effects the controller triggers but does not own.
pub trait Presenter {
    /// Visual acknowledgement of a local play/pause control.
    fn acknowledge(&mut self, action: PlayerAction);

    fn set_status(&mut self, status: Status);
}
