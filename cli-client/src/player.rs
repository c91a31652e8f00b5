//! A media element without pixels.
//!
//! Tracks position against the tokio clock and reports its transitions
//! asynchronously, the way a browser video element fires `play`, `pause`,
//! `seeking` and `loadedmetadata` events after the call that caused them.

use lockstep_core::{MediaPlayer, PlayerError, ReadyState};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerNotification {
    Play,
    Pause,
    Seeking,
    /// Metadata for the source loaded under `generation` is available.
    LoadedMetadata { generation: u64 },
}

pub struct VirtualPlayer {
    source: Option<String>,
    ready: ReadyState,
    paused: bool,
    // Position at `anchor` while playing, the frozen position while paused.
    position: f64,
    anchor: Instant,
    generation: u64,
    metadata_delay: Duration,
    notify: mpsc::UnboundedSender<PlayerNotification>,
}

impl VirtualPlayer {
    pub fn new(notify: mpsc::UnboundedSender<PlayerNotification>, metadata_delay: Duration) -> Self {
        Self {
            source: None,
            ready: ReadyState::NoMetadata,
            paused: true,
            position: 0.0,
            anchor: Instant::now(),
            generation: 0,
            metadata_delay,
            notify,
        }
    }

    /// Apply a metadata signal. Signals for a replaced source are ignored.
    pub fn mark_metadata_loaded(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.source.is_none() {
            return false;
        }
        self.ready = ReadyState::HasMetadata;
        true
    }

    fn fire(&self, notification: PlayerNotification) {
        let _ = self.notify.send(notification);
    }
}

impl MediaPlayer for VirtualPlayer {
    fn current_time(&self) -> f64 {
        if self.paused {
            self.position
        } else {
            self.position + self.anchor.elapsed().as_secs_f64()
        }
    }

    fn set_current_time(&mut self, time: f64) -> Result<(), PlayerError> {
        if self.ready < ReadyState::HasMetadata {
            return Err(PlayerError::NotReady);
        }
        if !time.is_finite() || time < 0.0 {
            return Err(PlayerError::OutOfRange(time));
        }
        self.position = time;
        self.anchor = Instant::now();
        self.fire(PlayerNotification::Seeking);
        Ok(())
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn ready_state(&self) -> ReadyState {
        self.ready
    }

    fn play(&mut self) -> Result<(), PlayerError> {
        if self.source.is_none() {
            return Err(PlayerError::NoSource);
        }
        if self.paused {
            self.anchor = Instant::now();
            self.paused = false;
            self.fire(PlayerNotification::Play);
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PlayerError> {
        if !self.paused {
            self.position = self.current_time();
            self.paused = true;
            self.fire(PlayerNotification::Pause);
        }
        Ok(())
    }

    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn set_source(&mut self, url: &str) {
        self.source = Some(url.to_string());
        self.ready = ReadyState::NoMetadata;
        self.paused = true;
        self.position = 0.0;
        self.anchor = Instant::now();
        self.generation += 1;

        let generation = self.generation;
        let delay = self.metadata_delay;
        let notify = self.notify.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = notify.send(PlayerNotification::LoadedMetadata { generation });
        });
    }
}
