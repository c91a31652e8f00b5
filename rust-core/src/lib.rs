//! Shared core for lockstep watch parties.
//!
//! - [`messages`]: JSON wire protocol spoken between clients and the relay
//! - [`player`]: the local media element and UI feedback traits
//! - [`sync`]: the playback sync controller (echo suppression, seek debounce)

pub mod error;
pub mod messages;
pub mod player;
pub mod sync;

pub use error::{PlayerError, ProtocolError};
pub use messages::{ChatNote, ClientMessage, NewVideo, ServerMessage, SyncAction, SyncEvent, UploadResponse};
pub use player::{MediaPlayer, PlaybackState, PlayerAction, Presenter, ReadyState, Status};
pub use sync::{AfterApply, SyncController, ECHO_GUARD, SEEK_DEBOUNCE};
