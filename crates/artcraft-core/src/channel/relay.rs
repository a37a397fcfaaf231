//! WebSocket client for `artcraft-server`.
//!
//! One connection carries both the scope's broadcast channel and snapshot
//! requests. The socket lives on a background thread; callers talk to it
//! through `std::sync::mpsc` channels and `futures` oneshots.

use super::{Channel, ChannelError, ChannelResult, Subscription};
use crate::storage::{BoxFuture, SnapshotRecord, SnapshotStore, StorageError, StorageResult};
use crate::sync::{ClientMessage, ConnectionState, RemoteOperation, ServerMessage, SyncEvent};
use futures::channel::oneshot;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tungstenite::{Message, connect};
use url::Url;

/// Commands sent to the WebSocket thread.
enum WsCommand {
    Send(String),
    Close,
}

/// A snapshot request waiting for its reply.
enum PendingReply {
    Fetch(oneshot::Sender<StorageResult<Option<SnapshotRecord>>>),
    Save {
        scope: String,
        image_data: String,
        reply: oneshot::Sender<StorageResult<SnapshotRecord>>,
    },
}

impl PendingReply {
    fn fail(self, error: StorageError) {
        match self {
            PendingReply::Fetch(reply) => {
                let _ = reply.send(Err(error));
            }
            PendingReply::Save { reply, .. } => {
                let _ = reply.send(Err(error));
            }
        }
    }
}

#[derive(Default)]
struct Pending {
    /// Set once the socket thread is gone; no new requests are accepted.
    closed: bool,
    replies: HashMap<u64, PendingReply>,
}

struct ActiveSubscription {
    generation: u64,
    scope: String,
    tx: Sender<String>,
}

/// State shared between the client handle and the socket thread.
#[derive(Default)]
struct Shared {
    subscription: Mutex<Option<ActiveSubscription>>,
    pending: Mutex<Pending>,
}

impl Shared {
    fn close(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.closed = true;
        for (_, reply) in pending.replies.drain() {
            reply.fail(StorageError::Io("Relay connection closed".to_string()));
        }
    }

    fn take_reply(&self, request_id: u64) -> Option<PendingReply> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replies
            .remove(&request_id)
    }

    /// Route one server message; connection-level ones become events.
    fn dispatch(&self, msg: ServerMessage) -> Option<SyncEvent> {
        match msg {
            ServerMessage::Joined { scope, peer_count } => Some(SyncEvent::Joined { scope, peer_count }),
            ServerMessage::PeerJoined { peer_id } => Some(SyncEvent::PeerJoined { peer_id }),
            ServerMessage::PeerLeft { peer_id } => Some(SyncEvent::PeerLeft { peer_id }),
            ServerMessage::Broadcast { from, payload } => {
                let subscription = self.subscription.lock().unwrap_or_else(PoisonError::into_inner);
                match subscription.as_ref() {
                    Some(active) => {
                        let _ = active.tx.send(payload.to_string());
                    }
                    None => log::debug!("Dropping broadcast from {} with no subscription", from),
                }
                None
            }
            ServerMessage::Snapshot { request_id, record } => {
                match self.take_reply(request_id) {
                    Some(PendingReply::Fetch(reply)) => {
                        let _ = reply.send(Ok(record));
                    }
                    Some(other) => other.fail(StorageError::Other("Unexpected snapshot reply".to_string())),
                    None => log::warn!("Snapshot reply for unknown request {}", request_id),
                }
                None
            }
            ServerMessage::SnapshotSaved { request_id, id, updated_at } => {
                match self.take_reply(request_id) {
                    Some(PendingReply::Save { scope, image_data, reply }) => {
                        let _ = reply.send(Ok(SnapshotRecord {
                            id,
                            scope_id: scope,
                            image_data,
                            updated_at,
                        }));
                    }
                    Some(other) => other.fail(StorageError::Other("Unexpected save reply".to_string())),
                    None => log::warn!("Save reply for unknown request {}", request_id),
                }
                None
            }
            ServerMessage::Error { request_id: Some(id), message } => {
                if let Some(reply) = self.take_reply(id) {
                    reply.fail(StorageError::Other(message));
                }
                None
            }
            ServerMessage::Error { request_id: None, message } => Some(SyncEvent::Error { message }),
        }
    }
}

/// WebSocket client for the relay server.
///
/// Implements [`Channel`] for the joined scope and [`SnapshotStore`] for
/// snapshot requests. Only one scope is joined at a time; subscribing to a
/// new scope moves the connection there.
pub struct RelayClient {
    state: Mutex<ConnectionState>,
    /// Channel to send commands to the WebSocket thread.
    cmd_tx: Sender<WsCommand>,
    /// Channel to receive events from the WebSocket thread.
    event_rx: Mutex<Receiver<SyncEvent>>,
    shared: Arc<Shared>,
    next_id: AtomicU64,
    _thread: JoinHandle<()>,
}

impl RelayClient {
    /// Connect to a relay server, e.g. `ws://localhost:3030/ws`.
    ///
    /// Returns once the socket thread is started; the handshake completes in
    /// the background and is reported through [`RelayClient::poll_events`].
    pub fn connect(url: &str) -> ChannelResult<Self> {
        let parsed_url = Url::parse(url).map_err(|e| ChannelError::Connection(format!("Invalid URL: {}", e)))?;
        if parsed_url.scheme() != "ws" && parsed_url.scheme() != "wss" {
            return Err(ChannelError::Connection(format!(
                "Invalid WebSocket URL scheme: {}",
                parsed_url.scheme()
            )));
        }

        let (cmd_tx, cmd_rx) = channel::<WsCommand>();
        let (event_tx, event_rx) = channel::<SyncEvent>();
        let shared = Arc::new(Shared::default());

        let url = url.to_string();
        let thread_shared = shared.clone();
        let handle = thread::spawn(move || {
            run_socket(&url, cmd_rx, event_tx, &thread_shared);
            thread_shared.close();
        });

        Ok(Self {
            state: Mutex::new(ConnectionState::Connecting),
            cmd_tx,
            event_rx: Mutex::new(event_rx),
            shared,
            next_id: AtomicU64::new(1),
            _thread: handle,
        })
    }

    /// Close the connection. Pending snapshot requests fail.
    pub fn disconnect(&self) {
        let _ = self.cmd_tx.send(WsCommand::Close);
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = ConnectionState::Disconnected;
    }

    /// Poll for pending connection events (non-blocking).
    pub fn poll_events(&self) -> Vec<SyncEvent> {
        let events: Vec<SyncEvent> = self
            .event_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_iter()
            .collect();

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        for event in &events {
            match event {
                SyncEvent::Connected => *state = ConnectionState::Connected,
                SyncEvent::Disconnected => *state = ConnectionState::Disconnected,
                SyncEvent::Error { .. } => *state = ConnectionState::Error,
                _ => {}
            }
        }
        events
    }

    /// Connection state as of the last [`RelayClient::poll_events`].
    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    fn send(&self, msg: &ClientMessage) -> ChannelResult<()> {
        let json = serde_json::to_string(msg)?;
        self.cmd_tx
            .send(WsCommand::Send(json))
            .map_err(|_| ChannelError::NotConnected)
    }

    /// Register a pending reply and send its request, failing the reply
    /// immediately if the connection is gone.
    fn request(&self, request_id: u64, reply: PendingReply, msg: ClientMessage) {
        {
            let mut pending = self.shared.pending.lock().unwrap_or_else(PoisonError::into_inner);
            if pending.closed {
                drop(pending);
                reply.fail(StorageError::Io("Relay connection closed".to_string()));
                return;
            }
            pending.replies.insert(request_id, reply);
        }
        if let Err(e) = self.send(&msg) {
            if let Some(reply) = self.shared.take_reply(request_id) {
                reply.fail(StorageError::Io(e.to_string()));
            }
        }
    }
}

impl Drop for RelayClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl Channel for RelayClient {
    fn subscribe(&self, scope: &str) -> ChannelResult<Subscription> {
        let (tx, rx) = channel();
        let generation = self.next_id.fetch_add(1, Ordering::Relaxed);
        *self.shared.subscription.lock().unwrap_or_else(PoisonError::into_inner) = Some(ActiveSubscription {
            generation,
            scope: scope.to_string(),
            tx,
        });
        self.send(&ClientMessage::Join {
            scope: scope.to_string(),
        })?;

        let shared = self.shared.clone();
        let cmd_tx = self.cmd_tx.clone();
        Ok(Subscription::new(scope, rx, move || {
            let mut subscription = shared.subscription.lock().unwrap_or_else(PoisonError::into_inner);
            // A newer subscription may have replaced this one.
            if subscription.as_ref().is_some_and(|s| s.generation == generation) {
                *subscription = None;
                if let Ok(json) = serde_json::to_string(&ClientMessage::Leave) {
                    let _ = cmd_tx.send(WsCommand::Send(json));
                }
            }
        }))
    }

    fn publish(&self, scope: &str, operation: &RemoteOperation) -> ChannelResult<()> {
        let joined = self
            .shared
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|s| s.scope == scope);
        if !joined {
            return Err(ChannelError::Send(format!("Not joined to scope {}", scope)));
        }
        let payload = serde_json::to_value(operation)?;
        self.send(&ClientMessage::Broadcast { payload })
    }
}

impl SnapshotStore for RelayClient {
    fn get_latest(&self, scope_id: &str) -> BoxFuture<'_, StorageResult<Option<SnapshotRecord>>> {
        let request_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply, rx) = oneshot::channel();
        self.request(
            request_id,
            PendingReply::Fetch(reply),
            ClientMessage::FetchSnapshot {
                request_id,
                scope: scope_id.to_string(),
            },
        );
        Box::pin(async move {
            rx.await
                .map_err(|_| StorageError::Io("Relay request dropped".to_string()))?
        })
    }

    fn insert(&self, scope_id: &str, image_data: &str) -> BoxFuture<'_, StorageResult<SnapshotRecord>> {
        let request_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply, rx) = oneshot::channel();
        self.request(
            request_id,
            PendingReply::Save {
                scope: scope_id.to_string(),
                image_data: image_data.to_string(),
                reply,
            },
            ClientMessage::SaveSnapshot {
                request_id,
                scope: scope_id.to_string(),
                image_data: image_data.to_string(),
            },
        );
        Box::pin(async move {
            rx.await
                .map_err(|_| StorageError::Io("Relay request dropped".to_string()))?
        })
    }
}

/// At most `max_chars` characters of `msg`, cut on a character boundary.
fn log_preview(msg: &str, max_chars: usize) -> &str {
    match msg.char_indices().nth(max_chars) {
        Some((end, _)) => &msg[..end],
        None => msg,
    }
}

/// Socket thread body: connect, then pump commands out and messages in.
fn run_socket(url: &str, cmd_rx: Receiver<WsCommand>, event_tx: Sender<SyncEvent>, shared: &Shared) {
    log::info!("Relay thread: connecting to {}", url);

    let (mut socket, response) = match connect(url) {
        Ok(connected) => connected,
        Err(e) => {
            log::error!("Relay connection failed: {}", e);
            let _ = event_tx.send(SyncEvent::Error {
                message: format!("Connection failed: {}", e),
            });
            return;
        }
    };

    log::info!("Relay connected, status: {}", response.status());
    let _ = event_tx.send(SyncEvent::Connected);

    // Short read timeout so the loop can interleave outgoing commands.
    match socket.get_mut() {
        tungstenite::stream::MaybeTlsStream::Plain(tcp) => {
            let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
            let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
        }
        #[allow(unreachable_patterns)]
        _ => log::debug!("TLS or other stream - using default timeout handling"),
    }

    'pump: loop {
        // Flush every queued command before blocking on a read, so outgoing
        // segments keep pace with pointer input.
        loop {
            match cmd_rx.try_recv() {
                Ok(WsCommand::Send(msg)) => {
                    log::debug!("Relay sending: {}", log_preview(&msg, 100));
                    if let Err(e) = socket.send(Message::Text(msg)) {
                        log::error!("Relay send error: {}", e);
                        break 'pump;
                    }
                }
                Ok(WsCommand::Close) => {
                    log::info!("Relay close requested");
                    let _ = socket.close(None);
                    break 'pump;
                }
                Err(TryRecvError::Disconnected) => {
                    log::info!("Relay command channel disconnected");
                    break 'pump;
                }
                Err(TryRecvError::Empty) => break,
            }
        }

        match socket.read() {
            Ok(Message::Text(txt)) => match serde_json::from_str::<ServerMessage>(&txt) {
                Ok(msg) => {
                    if let Some(event) = shared.dispatch(msg) {
                        let _ = event_tx.send(event);
                    }
                }
                Err(e) => log::warn!("Failed to parse server message: {}", e),
            },
            Ok(Message::Ping(data)) => {
                let _ = socket.send(Message::Pong(data));
            }
            Ok(Message::Close(_)) => {
                log::info!("Relay received close frame");
                break;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => {
                log::error!("Relay read error: {}", e);
                break;
            }
        }
    }

    log::info!("Relay thread exiting");
    let _ = event_tx.send(SyncEvent::Disconnected);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{Operation, OriginatorId};
    use futures::executor::block_on;
    use std::net::TcpListener;
    use std::time::Instant;

    #[test]
    fn test_rejects_non_websocket_url() {
        assert!(matches!(
            RelayClient::connect("http://localhost:3030/ws"),
            Err(ChannelError::Connection(_))
        ));
        assert!(RelayClient::connect("not a url").is_err());
    }

    #[test]
    fn test_requests_fail_when_server_unreachable() {
        // Port 1 is reserved and refuses connections.
        let client = RelayClient::connect("ws://127.0.0.1:1/ws").unwrap();
        assert!(block_on(client.get_latest("community-42")).is_err());
        assert!(block_on(client.insert("community-42", "data:")).is_err());
    }

    #[test]
    fn test_publish_requires_joined_scope() {
        let client = RelayClient::connect("ws://127.0.0.1:1/ws").unwrap();
        let op = RemoteOperation::new(Operation::Clear, OriginatorId::from("u1"));
        assert!(client.publish("community-42", &op).is_err());
    }

    #[test]
    fn test_dispatch_routes_broadcast_to_subscription() {
        let shared = Shared::default();
        let (tx, rx) = channel();
        *shared.subscription.lock().unwrap() = Some(ActiveSubscription {
            generation: 1,
            scope: "room".to_string(),
            tx,
        });

        let payload = serde_json::json!({"type": "clear", "originatorId": "u9"});
        let event = shared.dispatch(ServerMessage::Broadcast {
            from: "peer".to_string(),
            payload: payload.clone(),
        });
        assert!(event.is_none());
        let received: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(received, payload);
    }

    #[test]
    fn test_dispatch_completes_pending_fetch() {
        let shared = Shared::default();
        let (reply, rx) = oneshot::channel();
        shared
            .pending
            .lock()
            .unwrap()
            .replies
            .insert(3, PendingReply::Fetch(reply));

        shared.dispatch(ServerMessage::Snapshot {
            request_id: 3,
            record: None,
        });
        assert!(block_on(rx).unwrap().unwrap().is_none());
    }

    #[test]
    fn test_close_fails_pending_requests() {
        let shared = Shared::default();
        let (reply, rx) = oneshot::channel();
        shared.pending.lock().unwrap().replies.insert(
            5,
            PendingReply::Save {
                scope: "s".to_string(),
                image_data: "data:".to_string(),
                reply,
            },
        );
        shared.close();
        assert!(matches!(block_on(rx).unwrap(), Err(StorageError::Io(_))));
    }

    #[test]
    fn test_log_preview_respects_char_boundaries() {
        // Byte 100 of this message falls inside a two-byte character.
        let scope = format!("a{}", "é".repeat(120));
        let json = serde_json::to_string(&ClientMessage::Join { scope }).unwrap();
        assert!(!json.is_char_boundary(100));
        let preview = log_preview(&json, 100);
        assert!(json.starts_with(preview));
        assert_eq!(preview.chars().count(), 100);

        assert_eq!(log_preview("héllo", 100), "héllo");
        assert_eq!(log_preview("", 10), "");
    }

    #[test]
    fn test_queued_broadcasts_flush_together() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut socket = tungstenite::accept(stream).unwrap();
            let mut texts = Vec::new();
            while texts.len() < 61 {
                if let Message::Text(text) = socket.read().unwrap() {
                    texts.push(text);
                }
            }
            texts
        });

        let started = Instant::now();
        let client = RelayClient::connect(&format!("ws://{}/ws", addr)).unwrap();
        let scope = format!("a{}", "é".repeat(50));
        let _subscription = client.subscribe(&scope).unwrap();
        let op = RemoteOperation::new(Operation::Clear, OriginatorId::from("ü1"));
        // One second of pointer moves at 60 Hz.
        for _ in 0..60 {
            client.publish(&scope, &op).unwrap();
        }

        let texts = server.join().unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));
        match serde_json::from_str::<ClientMessage>(&texts[0]).unwrap() {
            ClientMessage::Join { scope: joined } => assert_eq!(joined, scope),
            other => panic!("Wrong message type: {:?}", other),
        }
        assert!(texts[1..]
            .iter()
            .all(|t| matches!(serde_json::from_str(t).unwrap(), ClientMessage::Broadcast { .. })));
    }
}
