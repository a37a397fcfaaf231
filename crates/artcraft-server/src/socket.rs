//! Per-connection WebSocket loop.

use crate::state::{AppState, RoomMessage};
use artcraft_core::sync::{ClientMessage, ServerMessage};
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Serialize and send one message. Returns false once the socket is gone.
async fn send_message(sender: &mut SplitSink<WebSocket, Message>, msg: &ServerMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!("Failed to serialize server message: {}", e);
            true
        }
    }
}

/// Handle a WebSocket connection
pub async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let peer_id = Uuid::new_v4().to_string();
    info!("New connection: {}", peer_id);

    let (mut sender, mut receiver) = socket.split();
    let mut current_scope: Option<String> = None;
    let mut room_rx: Option<broadcast::Receiver<RoomMessage>> = None;

    loop {
        tokio::select! {
            // Handle incoming messages from client
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let client_msg = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => client_msg,
                            Err(e) => {
                                warn!("Invalid message from {}: {}", peer_id, e);
                                let err = ServerMessage::Error {
                                    request_id: None,
                                    message: format!("Invalid message: {}", e),
                                };
                                if !send_message(&mut sender, &err).await {
                                    break;
                                }
                                continue;
                            }
                        };

                        match client_msg {
                            ClientMessage::Join { scope } => {
                                if let Some(old_scope) = current_scope.take() {
                                    leave(&state, &old_scope, &peer_id);
                                }

                                let (rx, peer_count) = state.join_room(&scope, &peer_id);
                                room_rx = Some(rx);
                                current_scope = Some(scope.clone());

                                let joined = ServerMessage::Joined {
                                    scope: scope.clone(),
                                    peer_count,
                                };
                                if !send_message(&mut sender, &joined).await {
                                    break;
                                }

                                state.broadcast(&scope, &peer_id, ServerMessage::PeerJoined {
                                    peer_id: peer_id.clone(),
                                });
                                info!("Peer {} joined {}", peer_id, scope);
                            }
                            ClientMessage::Leave => {
                                if let Some(scope) = current_scope.take() {
                                    leave(&state, &scope, &peer_id);
                                }
                                room_rx = None;
                            }
                            ClientMessage::Broadcast { payload } => match &current_scope {
                                Some(scope) => state.broadcast(scope, &peer_id, ServerMessage::Broadcast {
                                    from: peer_id.clone(),
                                    payload,
                                }),
                                None => debug!("Peer {} broadcast without joining a scope", peer_id),
                            },
                            ClientMessage::FetchSnapshot { request_id, scope } => {
                                let reply = state.fetch_snapshot(request_id, &scope).await;
                                if !send_message(&mut sender, &reply).await {
                                    break;
                                }
                            }
                            ClientMessage::SaveSnapshot { request_id, scope, image_data } => {
                                let reply = state.save_snapshot(request_id, &scope, &image_data).await;
                                if !send_message(&mut sender, &reply).await {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Ok(_)) => {} // Ignore binary and ping/pong
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", peer_id, e);
                        break;
                    }
                }
            }

            // Handle broadcast messages from room
            msg = async {
                match &mut room_rx {
                    Some(rx) => rx.recv().await,
                    None => std::future::pending().await,
                }
            } => {
                match msg {
                    // Don't echo back to sender
                    Ok((from, server_msg)) if from != peer_id => {
                        if !send_message(&mut sender, &server_msg).await {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Peer {} lagged, {} messages dropped", peer_id, skipped);
                    }
                    Err(RecvError::Closed) => {
                        room_rx = None;
                    }
                }
            }
        }
    }

    // Cleanup on disconnect
    if let Some(scope) = current_scope {
        leave(&state, &scope, &peer_id);
    }
    info!("Connection closed: {}", peer_id);
}

fn leave(state: &AppState, scope: &str, peer_id: &str) {
    state.leave_room(scope, peer_id);
    state.broadcast(scope, peer_id, ServerMessage::PeerLeft {
        peer_id: peer_id.to_string(),
    });
    info!("Peer {} left {}", peer_id, scope);
}
