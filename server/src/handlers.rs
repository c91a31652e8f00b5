use crate::app_state::{Peer, SharedState};
use axum::{
    extract::{ws::{Message, WebSocket, WebSocketUpgrade}, ConnectInfo, Query, State},
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::{SplitSink, StreamExt}};
use lockstep_core::{ChatNote, ClientMessage, ServerMessage};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

const DEFAULT_PEER_NAME: &str = "guest";

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<SharedState>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let name = query
        .get("name")
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_PEER_NAME.to_string());
    tracing::info!("Client connecting: {} ({})", addr, name);
    ws.on_upgrade(move |socket| handle_socket(socket, addr, state, name))
}

pub async fn handle_socket(socket: WebSocket, addr: SocketAddr, state: SharedState, name: String) {
    let session_id = Uuid::new_v4().to_string();

    // Register peer
    let peer = Arc::new(Peer { addr, name });
    state.peers.insert(session_id.clone(), peer.clone());

    let (mut sender, mut receiver) = socket.split();

    // Subscribe before the welcome so nothing relayed after it is missed
    let mut rx = state.tx.subscribe();

    let welcome = ServerMessage::Welcome { session_id: session_id.clone() };
    if send_message(&mut sender, &welcome).await.is_ok() {
        loop {
            tokio::select! {
                // 1. Messages relayed from other peers or the upload endpoint
                relayed = rx.recv() => match relayed {
                    Ok(relayed) => {
                        if relayed.exclude.as_deref() == Some(session_id.as_str()) {
                            continue;
                        }
                        if send_message(&mut sender, &relayed.message).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Session {} lagged, skipped {} messages", session_id, skipped);
                    }
                    Err(RecvError::Closed) => break,
                },

                // 2. Incoming messages from this client
                incoming = receiver.next() => match incoming {
                    Some(Ok(Message::Text(text))) => match ClientMessage::from_text(&text) {
                        Ok(msg) => handle_client_message(msg, &state, &session_id, &peer),
                        Err(e) => tracing::warn!("Dropping undecodable frame from {}: {}", session_id, e),
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!("Socket error for {}: {}", session_id, e);
                        break;
                    }
                },
            }
        }
    }

    state.peers.remove(&session_id);
    tracing::info!("Client disconnected: {} ({} at {})", session_id, peer.name, peer.addr);
}

fn handle_client_message(msg: ClientMessage, state: &SharedState, session_id: &str, peer: &Peer) {
    match msg {
        ClientMessage::VideoEvent(evt) => {
            tracing::debug!("video_event {:?} at {} from {}", evt.action, evt.time, session_id);
            state.broadcast_except(session_id, ServerMessage::VideoEvent(evt));
        }
        ClientMessage::ChatMessage(content) => {
            state.record_note(ChatNote {
                author: peer.name.clone(),
                content: content.clone(),
            });
            state.broadcast(ServerMessage::ChatMessage(content));
        }
    }
}

async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> anyhow::Result<()> {
    let text = msg.to_text()?;
    sender.send(Message::Text(text)).await?;
    Ok(())
}
