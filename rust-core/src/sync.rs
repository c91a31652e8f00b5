//! Playback sync controller.
//!
//! One controller runs per connected client. It sits between the local
//! [`MediaPlayer`] and the relay channel and decides which local changes are
//! broadcast as [`SyncEvent`]s and how incoming ones are applied.
//!
//! The controller is driven by a single event loop: every entry point is a
//! plain `&mut self` method and the two timers (seek debounce and echo guard)
//! are deadlines the driver sleeps on via [`SyncController::next_deadline`]
//! and then hands back through [`SyncController::fire_due_timers`]. Dropping
//! the controller or calling [`SyncController::shutdown`] cancels both.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::messages::{ClientMessage, SyncAction, SyncEvent};
use crate::player::{MediaPlayer, PlayerAction, Presenter, ReadyState, Status};

/// Quiet period after the last seek notification before a seek is sent.
pub const SEEK_DEBOUNCE: Duration = Duration::from_millis(150);

/// How long echo suppression stays engaged after a remote event arrives.
pub const ECHO_GUARD: Duration = Duration::from_millis(250);

/// What to do once a time value has been applied to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterApply {
    Nothing,
    Play,
    Pause,
}

#[derive(Debug, Clone, Copy)]
struct PendingApply {
    time: f64,
    then: AfterApply,
}

impl From<PlayerAction> for SyncAction {
    fn from(action: PlayerAction) -> Self {
        match action {
            PlayerAction::Play => SyncAction::Play,
            PlayerAction::Pause => SyncAction::Pause,
        }
    }
}

pub struct SyncController<P, U> {
    player: P,
    presenter: U,
    outbound: mpsc::UnboundedSender<ClientMessage>,
    // Echo suppression is engaged while this is `Some`.
    suppressed_until: Option<Instant>,
    seek_deadline: Option<Instant>,
    awaiting_metadata: Vec<PendingApply>,
    // Transitions caused by an explicit request that were already broadcast.
    expected_transitions: VecDeque<PlayerAction>,
}

impl<P: MediaPlayer, U: Presenter> SyncController<P, U> {
    pub fn new(player: P, presenter: U, outbound: mpsc::UnboundedSender<ClientMessage>) -> Self {
        Self {
            player,
            presenter,
            outbound,
            suppressed_until: None,
            seek_deadline: None,
            awaiting_metadata: Vec::new(),
            expected_transitions: VecDeque::new(),
        }
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    pub fn presenter(&self) -> &U {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut U {
        &mut self.presenter
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed_until.is_some()
    }

    /// Local play control.
    pub fn request_play(&mut self) {
        self.request(PlayerAction::Play);
    }

    /// Local pause control.
    pub fn request_pause(&mut self) {
        self.request(PlayerAction::Pause);
    }

    fn request(&mut self, action: PlayerAction) {
        if !self.is_suppressed() {
            self.emit(action.into(), self.player.current_time());
        }
        self.presenter.acknowledge(action);

        let transitions = match action {
            PlayerAction::Play => self.player.is_paused(),
            PlayerAction::Pause => !self.player.is_paused(),
        };
        match self.perform(action) {
            // The player will report this transition; it has been broadcast already.
            Ok(()) if transitions => self.expected_transitions.push_back(action),
            Ok(()) => {}
            Err(e) => debug!(?action, error = %e, "local player refused request"),
        }
    }

    /// The player reported a play/pause transition, from native controls or
    /// as a side effect of an earlier mutation.
    ///
    /// Transitions are reported in the order the player performed them, so
    /// only the oldest outstanding request can account for this one.
    pub fn on_local_state_change(&mut self, kind: PlayerAction) {
        if self.expected_transitions.front() == Some(&kind) {
            self.expected_transitions.pop_front();
            trace!(?kind, "transition already broadcast by request");
            return;
        }
        if self.is_suppressed() {
            trace!(?kind, "suppressed echo of remote event");
            return;
        }
        self.emit(kind.into(), self.player.current_time());
    }

    /// The player reported a seek. Restarts the debounce window.
    pub fn on_local_seek(&mut self) {
        self.seek_deadline = Some(Instant::now() + SEEK_DEBOUNCE);
    }

    /// Apply an event received from the relay without re-broadcasting it.
    pub fn on_remote_event(&mut self, evt: SyncEvent) {
        self.suppress();
        let then = match evt.action {
            SyncAction::Play => AfterApply::Play,
            SyncAction::Pause => AfterApply::Pause,
            SyncAction::Seek => AfterApply::Nothing,
        };
        debug!(action = ?evt.action, time = evt.time, "applying remote event");
        self.apply_time(evt.time, then);
    }

    /// Seek to `time` once the player can accept it, then run `then`.
    ///
    /// NaN skips the seek but still runs `then` immediately. Before metadata
    /// has loaded the whole step waits for [`Self::on_metadata_loaded`].
    pub fn apply_time(&mut self, time: f64, then: AfterApply) {
        if time.is_nan() {
            self.run(then);
            return;
        }
        if self.player.ready_state() >= ReadyState::HasMetadata {
            self.assign_time(time);
            self.run(then);
        } else {
            self.awaiting_metadata.push(PendingApply { time, then });
        }
    }

    /// The player finished loading metadata for the current source.
    pub fn on_metadata_loaded(&mut self) {
        let pending = std::mem::take(&mut self.awaiting_metadata);
        if pending.is_empty() {
            return;
        }
        // Still applying remote events, so their side effects must not echo.
        self.suppress();
        for PendingApply { time, then } in pending {
            self.assign_time(time);
            self.run(then);
        }
    }

    /// Someone announced new media. Returns whether the source changed.
    pub fn on_new_video(&mut self, url: &str) -> bool {
        if url.is_empty() || self.player.source() == Some(url) {
            return false;
        }
        // Deferred applies targeted the old media.
        self.awaiting_metadata.clear();
        self.player.set_source(url);
        self.presenter.set_status(Status::MediaReady);
        debug!(%url, "loaded announced media");
        true
    }

    /// Earliest pending timer, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.seek_deadline, self.suppressed_until) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Run every timer whose deadline has passed, in deadline order.
    pub fn fire_due_timers(&mut self) {
        let now = Instant::now();
        loop {
            let seek_due = self.seek_deadline.filter(|d| *d <= now);
            let guard_due = self.suppressed_until.filter(|d| *d <= now);
            match (seek_due, guard_due) {
                (Some(seek), Some(guard)) if seek <= guard => self.fire_seek(),
                (Some(_), Some(_)) | (None, Some(_)) => {
                    self.suppressed_until = None;
                    trace!("echo guard released");
                }
                (Some(_), None) => self.fire_seek(),
                (None, None) => break,
            }
        }
    }

    /// Cancel every pending timer and wait. Nothing is emitted afterwards
    /// until new events arrive.
    pub fn shutdown(&mut self) {
        self.seek_deadline = None;
        self.suppressed_until = None;
        self.awaiting_metadata.clear();
        self.expected_transitions.clear();
        debug!("sync controller shut down");
    }

    fn fire_seek(&mut self) {
        self.seek_deadline = None;
        if self.is_suppressed() {
            trace!("suppressed seek echo");
            return;
        }
        self.emit(SyncAction::Seek, self.player.current_time());
    }

    fn suppress(&mut self) {
        let until = Instant::now() + ECHO_GUARD;
        self.suppressed_until = Some(match self.suppressed_until {
            Some(current) => current.max(until),
            None => until,
        });
    }

    fn assign_time(&mut self, time: f64) {
        if let Err(e) = self.player.set_current_time(time) {
            debug!(time, error = %e, "ignoring rejected seek");
        }
    }

    fn run(&mut self, then: AfterApply) {
        let action = match then {
            AfterApply::Nothing => return,
            AfterApply::Play => PlayerAction::Play,
            AfterApply::Pause => PlayerAction::Pause,
        };
        if let Err(e) = self.perform(action) {
            debug!(?action, error = %e, "ignoring rejected playback change");
        }
    }

    fn perform(&mut self, action: PlayerAction) -> Result<(), crate::PlayerError> {
        match action {
            PlayerAction::Play => self.player.play(),
            PlayerAction::Pause => self.player.pause(),
        }
    }

    fn emit(&self, action: SyncAction, time: f64) {
        let msg = ClientMessage::VideoEvent(SyncEvent::new(action, time));
        if self.outbound.send(msg).is_err() {
            debug!(?action, "outbound channel closed, dropping event");
        }
    }
}
