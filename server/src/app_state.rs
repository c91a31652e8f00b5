use dashmap::DashMap;
use lockstep_core::{ChatNote, ServerMessage};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{broadcast, Mutex};

use crate::config::Config;

pub type SharedState = Arc<AppState>;

pub struct Peer {
    pub addr: SocketAddr,
    pub name: String,
}

/// A message on the fan-out bus, optionally withheld from its sender.
#[derive(Debug, Clone)]
pub struct Relayed {
    pub message: ServerMessage,
    pub exclude: Option<String>,
}

pub struct AppState {
    // Map of active peer sessions
    pub peers: DashMap<String, Arc<Peer>>,
    // Pub/Sub for broadcasting messages to all connected clients
    pub tx: broadcast::Sender<Relayed>,
    pub notes: RwLock<VecDeque<ChatNote>>,
    // One upload written at a time
    pub upload_lock: Mutex<()>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> SharedState {
        let (tx, _) = broadcast::channel(config.server.broadcast_capacity.max(1));

        Arc::new(Self {
            peers: DashMap::new(),
            tx,
            notes: RwLock::new(VecDeque::new()),
            upload_lock: Mutex::new(()),
            config,
        })
    }

    /// Send to every connected peer.
    pub fn broadcast(&self, message: ServerMessage) {
        let _ = self.tx.send(Relayed {
            message,
            exclude: None,
        });
    }

    /// Send to every connected peer except `session_id`.
    pub fn broadcast_except(&self, session_id: &str, message: ServerMessage) {
        let _ = self.tx.send(Relayed {
            message,
            exclude: Some(session_id.to_string()),
        });
    }

    pub fn record_note(&self, note: ChatNote) {
        let limit = self.config.chat.history_limit;
        let mut notes = self.notes.write().unwrap_or_else(PoisonError::into_inner);
        notes.push_back(note);
        while notes.len() > limit {
            notes.pop_front();
        }
    }

    /// Names of connected peers, sorted.
    pub fn peer_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.peers.iter().map(|p| p.name.clone()).collect();
        names.sort();
        names
    }

    pub fn notes(&self) -> Vec<ChatNote> {
        let notes = self.notes.read().unwrap_or_else(PoisonError::into_inner);
        notes.iter().cloned().collect()
    }
}
