//! Rooms and snapshot storage shared by every connection.

use artcraft_core::codec::{self, CodecError};
use artcraft_core::storage::{SnapshotRecord, SnapshotStore, StorageError, StorageResult};
use artcraft_core::sync::ServerMessage;
use dashmap::DashMap;
use futures::executor::block_on;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// A message fanned out to a room, tagged with the sending peer.
pub type RoomMessage = (String, ServerMessage);

/// Room state
struct Room {
    /// Broadcast channel for this room
    tx: broadcast::Sender<RoomMessage>,
    /// Connected peer IDs
    peers: HashSet<String>,
}

impl Room {
    fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            peers: HashSet::new(),
        }
    }
}

/// Shared application state
pub struct AppState {
    /// Active rooms, keyed by scope
    rooms: DashMap<String, Room>,
    store: Arc<dyn SnapshotStore>,
    channel_capacity: usize,
}

impl AppState {
    pub fn new(store: Arc<dyn SnapshotStore>, channel_capacity: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            store,
            channel_capacity,
        }
    }

    /// Add peer to room, creating it on first join. Returns the room
    /// receiver and the peer count including the new peer.
    pub fn join_room(&self, scope: &str, peer_id: &str) -> (broadcast::Receiver<RoomMessage>, usize) {
        let mut room = self
            .rooms
            .entry(scope.to_string())
            .or_insert_with(|| Room::new(self.channel_capacity));
        room.peers.insert(peer_id.to_string());
        (room.tx.subscribe(), room.peers.len())
    }

    /// Remove peer from room; empty rooms are dropped.
    pub fn leave_room(&self, scope: &str, peer_id: &str) {
        if let Some(mut room) = self.rooms.get_mut(scope) {
            room.peers.remove(peer_id);
        }
        self.rooms.remove_if(scope, |_, room| room.peers.is_empty());
    }

    /// Broadcast message to room
    pub fn broadcast(&self, scope: &str, from: &str, msg: ServerMessage) {
        if let Some(room) = self.rooms.get(scope) {
            let _ = room.tx.send((from.to_string(), msg));
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn peer_count(&self, scope: &str) -> usize {
        self.rooms.get(scope).map_or(0, |room| room.peers.len())
    }

    /// Run a store call on the blocking pool. File-backed stores do their
    /// IO synchronously inside the returned future.
    async fn with_store<T, F>(&self, call: F) -> StorageResult<T>
    where
        F: FnOnce(&dyn SnapshotStore) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || call(store.as_ref()))
            .await
            .map_err(|e| StorageError::Other(format!("Store task failed: {}", e)))?
    }

    /// Latest snapshot of `scope`.
    pub async fn latest(&self, scope: &str) -> StorageResult<Option<SnapshotRecord>> {
        let scope = scope.to_string();
        self.with_store(move |store| block_on(store.get_latest(&scope))).await
    }

    async fn insert(&self, scope: &str, image_data: &str) -> StorageResult<SnapshotRecord> {
        let scope = scope.to_string();
        let image_data = image_data.to_string();
        self.with_store(move |store| block_on(store.insert(&scope, &image_data)))
            .await
    }

    /// Answer a `fetch_snapshot` request.
    pub async fn fetch_snapshot(&self, request_id: u64, scope: &str) -> ServerMessage {
        match self.latest(scope).await {
            Ok(record) => ServerMessage::Snapshot { request_id, record },
            Err(e) => {
                warn!("Failed to read snapshot for {}: {}", scope, e);
                ServerMessage::Error {
                    request_id: Some(request_id),
                    message: e.to_string(),
                }
            }
        }
    }

    /// Answer a `save_snapshot` request. The image must be a decodable PNG
    /// data URL.
    pub async fn save_snapshot(&self, request_id: u64, scope: &str, image_data: &str) -> ServerMessage {
        if let Err(e) = validate_image_data(image_data) {
            warn!("Rejected snapshot for {}: {}", scope, e);
            return ServerMessage::Error {
                request_id: Some(request_id),
                message: format!("Invalid image data: {}", e),
            };
        }

        match self.insert(scope, image_data).await {
            Ok(record) => {
                info!("Stored snapshot {} for {}", record.id, scope);
                ServerMessage::SnapshotSaved {
                    request_id,
                    id: record.id,
                    updated_at: record.updated_at,
                }
            }
            Err(e) => {
                warn!("Failed to store snapshot for {}: {}", scope, e);
                ServerMessage::Error {
                    request_id: Some(request_id),
                    message: e.to_string(),
                }
            }
        }
    }
}

/// Check that `image_data` is a PNG data URL that decodes.
pub fn validate_image_data(image_data: &str) -> Result<(), CodecError> {
    let png = codec::from_data_url(image_data)?;
    codec::decode_png(&png)?;
    Ok(())
}
