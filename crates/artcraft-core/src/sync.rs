//! Wire formats: canvas operations broadcast between peers, and the relay
//! protocol spoken with `artcraft-server`.

use crate::brush::{BrushSettings, Tool};
use crate::color::Rgb;
use crate::render::Segment;
use crate::storage::SnapshotRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Errors decoding peer messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid message: {0}")]
    Invalid(String),
}

/// Opaque identity of a participant, used to filter our own broadcasts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OriginatorId(String);

impl OriginatorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OriginatorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for OriginatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stroke segment as sent to peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineOp {
    pub from_x: i32,
    pub from_y: i32,
    pub to_x: i32,
    pub to_y: i32,
    pub color: Rgb,
    pub brush_size: u32,
    pub tool: Tool,
}

impl LineOp {
    pub fn from_segment(segment: &Segment) -> Self {
        Self {
            from_x: segment.from_x,
            from_y: segment.from_y,
            to_x: segment.to_x,
            to_y: segment.to_y,
            color: segment.brush.color,
            brush_size: segment.brush.brush_size,
            tool: segment.brush.tool,
        }
    }

    pub fn to_segment(&self) -> Segment {
        Segment::new(
            (self.from_x, self.from_y),
            (self.to_x, self.to_y),
            BrushSettings::new(self.color, self.brush_size, self.tool),
        )
    }
}

/// A canvas operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    Line(LineOp),
    Clear,
}

/// An operation tagged with the participant that produced it.
///
/// ```json
/// {"type":"line","fromX":10,"fromY":10,"toX":50,"toY":10,
///  "color":"#FF0000","brushSize":5,"tool":"brush","originatorId":"u1"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteOperation {
    #[serde(flatten)]
    pub operation: Operation,
    #[serde(alias = "userId")]
    pub originator_id: OriginatorId,
}

impl RemoteOperation {
    pub fn new(operation: Operation, originator_id: OriginatorId) -> Self {
        Self {
            operation,
            originator_id,
        }
    }

    /// Decode and validate a message received from the channel.
    pub fn decode(json: &str) -> Result<Self, ProtocolError> {
        let op: RemoteOperation = serde_json::from_str(json)?;
        op.validate()?;
        Ok(op)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    fn validate(&self) -> Result<(), ProtocolError> {
        if self.originator_id.as_str().is_empty() {
            return Err(ProtocolError::Invalid("empty originator id".to_string()));
        }
        if let Operation::Line(line) = &self.operation {
            if line.brush_size == 0 {
                return Err(ProtocolError::Invalid("brush size must be positive".to_string()));
            }
        }
        Ok(())
    }
}

/// Messages sent to the relay server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join a scope's channel
    Join { scope: String },
    /// Leave the current scope
    Leave,
    /// Broadcast a payload to the other peers in the scope
    Broadcast { payload: serde_json::Value },
    /// Ask for the latest snapshot of a scope
    FetchSnapshot { request_id: u64, scope: String },
    /// Store a new snapshot for a scope
    SaveSnapshot {
        request_id: u64,
        scope: String,
        image_data: String,
    },
}

/// Messages received from the relay server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirm scope join
    Joined { scope: String, peer_count: usize },
    /// Peer joined the scope
    PeerJoined { peer_id: String },
    /// Peer left the scope
    PeerLeft { peer_id: String },
    /// Payload broadcast by another peer
    Broadcast { from: String, payload: serde_json::Value },
    /// Reply to `FetchSnapshot`
    Snapshot {
        request_id: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        record: Option<SnapshotRecord>,
    },
    /// Reply to `SaveSnapshot`
    SnapshotSaved {
        request_id: u64,
        id: Uuid,
        updated_at: u64,
    },
    /// Error message, tied to a request when there is one
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<u64>,
        message: String,
    },
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Connection-level events from the relay client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Connected to server
    Connected,
    /// Disconnected from server
    Disconnected,
    /// Joined a scope
    Joined { scope: String, peer_count: usize },
    /// A peer joined the scope
    PeerJoined { peer_id: String },
    /// A peer left the scope
    PeerLeft { peer_id: String },
    /// Error occurred
    Error { message: String },
}
