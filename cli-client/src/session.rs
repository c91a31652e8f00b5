//! The client event loop.
//!
//! Everything that touches the controller runs here, one event at a time:
//! console lines, relay frames, player notifications, upload outcomes and
//! controller timers.

use futures::{SinkExt, StreamExt};
use lockstep_core::{ClientMessage, MediaPlayer, PlayerAction, Presenter, ServerMessage, Status, SyncController};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::{tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::api::{RelayApi, UploadOutcome};
use crate::console::{Command, ConsolePresenter, HELP};
use crate::player::{PlayerNotification, VirtualPlayer};

pub type Controller = SyncController<VirtualPlayer, ConsolePresenter>;

enum Flow {
    Continue,
    Quit,
}

pub struct Session {
    api: RelayApi,
    controller: Controller,
    outbound: mpsc::UnboundedSender<ClientMessage>,
    outbound_rx: mpsc::UnboundedReceiver<ClientMessage>,
    notifications: mpsc::UnboundedReceiver<PlayerNotification>,
    uploads_tx: mpsc::UnboundedSender<UploadOutcome>,
    uploads: mpsc::UnboundedReceiver<UploadOutcome>,
}

impl Session {
    pub fn new(api: RelayApi, metadata_delay: Duration) -> Self {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (notify, notifications) = mpsc::unbounded_channel();
        let (uploads_tx, uploads) = mpsc::unbounded_channel();

        let player = VirtualPlayer::new(notify, metadata_delay);
        let controller = SyncController::new(player, ConsolePresenter::default(), outbound.clone());

        Self {
            api,
            controller,
            outbound,
            outbound_rx,
            notifications,
            uploads_tx,
            uploads,
        }
    }

    /// Drive the session until the user quits, input ends or the relay goes away.
    pub async fn run<R>(
        mut self,
        ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
        input: R,
    ) -> anyhow::Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let (mut write, mut read) = ws.split();
        let mut lines = BufReader::new(input).lines();

        loop {
            let deadline = self.controller.next_deadline();
            tokio::select! {
                _ = wait_until(deadline) => self.controller.fire_due_timers(),

                Some(msg) = self.outbound_rx.recv() => {
                    let text = msg.to_text()?;
                    if let Err(e) = write.send(Message::Text(text)).await {
                        warn!("Failed to send to relay: {}", e);
                        self.controller.presenter_mut().set_status(Status::Disconnected);
                        break;
                    }
                }

                Some(notification) = self.notifications.recv() => self.on_notification(notification),

                Some(outcome) = self.uploads.recv() => self.on_upload(outcome),

                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.on_frame(&text),
                    Some(Ok(Message::Close(_))) | None => {
                        self.controller.presenter_mut().set_status(Status::Disconnected);
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("Relay connection failed: {}", e);
                        self.controller.presenter_mut().set_status(Status::Disconnected);
                        break;
                    }
                },

                line = lines.next_line() => match line? {
                    Some(line) => {
                        if let Flow::Quit = self.on_line(&line) {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }

        self.controller.shutdown();
        let _ = write.close().await;
        Ok(())
    }

    fn on_frame(&mut self, text: &str) {
        let msg = match ServerMessage::from_text(text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Dropping undecodable frame: {}", e);
                return;
            }
        };
        self.on_server_message(msg);
    }

    fn on_server_message(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::Welcome { session_id } => {
                debug!("Joined as session {}", session_id);
                self.controller.presenter_mut().set_status(Status::Connected);
            }
            ServerMessage::VideoEvent(evt) => self.controller.on_remote_event(evt),
            ServerMessage::NewVideo(video) => {
                let url = self.api.resolve(&video.url);
                self.controller.on_new_video(&url);
            }
            ServerMessage::ChatMessage(content) => self.controller.presenter().chat(&content),
        }
    }

    fn on_notification(&mut self, notification: PlayerNotification) {
        match notification {
            PlayerNotification::Play => self.controller.on_local_state_change(PlayerAction::Play),
            PlayerNotification::Pause => self.controller.on_local_state_change(PlayerAction::Pause),
            PlayerNotification::Seeking => self.controller.on_local_seek(),
            PlayerNotification::LoadedMetadata { generation } => {
                if self.controller.player_mut().mark_metadata_loaded(generation) {
                    self.controller.on_metadata_loaded();
                }
            }
        }
    }

    fn on_upload(&mut self, outcome: UploadOutcome) {
        match outcome {
            UploadOutcome::Stored(url) => {
                let url = self.api.resolve(&url);
                // The relay's own announcement may already have loaded it.
                if !self.controller.on_new_video(&url) {
                    self.controller.presenter_mut().set_status(Status::MediaReady);
                }
            }
            UploadOutcome::Rejected(reason) => {
                debug!("Upload rejected: {:?}", reason);
                self.controller.presenter_mut().set_status(Status::UploadFailed);
            }
            UploadOutcome::Failed(reason) => {
                warn!("Upload failed: {}", reason);
                self.controller.presenter_mut().set_status(Status::ConnectionError);
            }
        }
    }

    fn on_line(&mut self, line: &str) -> Flow {
        if line.trim().is_empty() {
            return Flow::Continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                return Flow::Continue;
            }
        };

        match command {
            Command::Play => self.controller.request_play(),
            Command::Pause => self.controller.request_pause(),
            Command::Toggle => {
                let player = self.controller.player_mut();
                let result = if player.is_paused() { player.play() } else { player.pause() };
                if let Err(e) = result {
                    println!("player: {}", e);
                }
            }
            Command::Seek(time) => {
                if let Err(e) = self.controller.player_mut().set_current_time(time) {
                    println!("player: {}", e);
                }
            }
            Command::Load(url) => {
                let url = self.api.resolve(&url);
                self.controller.on_new_video(&url);
            }
            Command::Upload(path) => {
                self.controller.presenter_mut().set_status(Status::Uploading);
                let api = self.api.clone();
                let tx = self.uploads_tx.clone();
                tokio::spawn(async move {
                    let outcome = api.upload(&path).await;
                    let _ = tx.send(outcome);
                });
            }
            Command::Say(text) => {
                let _ = self.outbound.send(ClientMessage::ChatMessage(text));
            }
            Command::Status => {
                let player = self.controller.player();
                let presenter = self.controller.presenter();
                if let Some(status) = presenter.last_status() {
                    println!("[{}]", status);
                }
                presenter.playback(
                    player.source(),
                    &player.snapshot(),
                    self.controller.is_suppressed(),
                );
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
