//! ArtCraft Core Library
//!
//! Raster drawing, undo history and real-time canvas sharing for the
//! ArtCraft community canvas.

pub mod brush;
pub mod channel;
pub mod codec;
pub mod collaboration;
pub mod color;
pub mod history;
pub mod input;
pub mod notice;
pub mod render;
pub mod session;
pub mod storage;
pub mod surface;
pub mod sync;

pub use brush::{BrushSettings, Tool};
pub use channel::{Channel, ChannelError, MemoryChannel, RelayClient, Subscription};
pub use collaboration::{Anonymous, CollaborativeSession, IdentityProvider, SessionState};
pub use color::Rgb;
pub use history::History;
pub use input::{EventDisposition, MouseButton, PointerEvent, PointerKind, PointerTracker};
pub use notice::{Notice, NoticeLevel};
pub use render::{Segment, clear_surface, draw_segment};
pub use session::{DrawingSession, ExportedImage, SessionConfig};
pub use storage::{SnapshotRecord, SnapshotStore, StorageError};
pub use surface::Surface;
pub use sync::{ConnectionState, Operation, OriginatorId, RemoteOperation, SyncEvent};
