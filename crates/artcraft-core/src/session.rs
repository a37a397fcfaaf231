//! Single-user drawing session: surface, pointer tracking, brush and history.

use crate::brush::{BrushSettings, Tool};
use crate::codec::{self, CodecError};
use crate::color::Rgb;
use crate::history::History;
use crate::input::{EventDisposition, PointerEvent, PointerKind, PointerResponse, PointerTracker};
use crate::notice::{Notice, Notices};
use crate::render::clear_surface;
use crate::storage::{DEFAULT_AUTOSAVE_INTERVAL_SECS, SnapshotRecord, SnapshotStore, StorageError, StorageResult};
use crate::surface::Surface;
use crate::sync::Operation;
use kurbo::{Point, Rect};
use std::time::Duration;

/// Default surface width in pixels.
pub const DEFAULT_WIDTH: u32 = 800;
/// Default surface height in pixels.
pub const DEFAULT_HEIGHT: u32 = 600;

/// Filename suggested when exporting a personal drawing.
pub const EXPORT_FILENAME: &str = "artcraft-creation.png";

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub width: u32,
    pub height: u32,
    /// Brush in effect when the session mounts.
    pub brush: BrushSettings,
    /// Maximum number of history entries, `None` for unbounded.
    pub history_limit: Option<usize>,
    /// Auto-save interval for collaborative sessions, `None` to disable.
    pub autosave_interval: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            brush: BrushSettings::default(),
            history_limit: None,
            autosave_interval: Some(Duration::from_secs(DEFAULT_AUTOSAVE_INTERVAL_SECS)),
        }
    }
}

/// PNG image ready to be handed to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedImage {
    pub png: Vec<u8>,
    pub filename: String,
}

/// A mounted drawing surface with its tools.
///
/// Once [`DrawingSession::unmount`] is called the surface is gone and every
/// operation quietly does nothing.
pub struct DrawingSession {
    surface: Option<Surface>,
    tracker: PointerTracker,
    history: History,
    brush: BrushSettings,
    notices: Notices,
}

impl DrawingSession {
    /// Mount a blank white surface and record it as the first history entry.
    pub fn new(config: &SessionConfig) -> Self {
        let mut session = Self::blank(config);
        session.checkpoint();
        session
    }

    /// Mount a blank surface with empty history. The owner decides what the
    /// first entry is.
    pub(crate) fn blank(config: &SessionConfig) -> Self {
        Self {
            surface: Some(Surface::new(config.width, config.height)),
            tracker: PointerTracker::new(config.width, config.height),
            history: History::with_limit(config.history_limit),
            brush: config.brush,
            notices: Notices::new(),
        }
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    pub fn is_mounted(&self) -> bool {
        self.surface.is_some()
    }

    pub fn brush(&self) -> BrushSettings {
        self.brush
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Handle to the notice queue, shared with async completions.
    pub fn notices(&self) -> Notices {
        self.notices.clone()
    }

    /// Take every pending notice.
    pub fn take_notices(&self) -> Vec<Notice> {
        self.notices.drain()
    }

    /// Where the canvas is laid out on screen, for coordinate scaling.
    pub fn set_display_rect(&mut self, display: Rect) {
        self.tracker.set_display_rect(display);
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.brush.tool = tool;
    }

    pub fn set_color(&mut self, color: Rgb) {
        self.brush.color = color;
    }

    /// Set the brush diameter. Zero is clamped to one.
    pub fn set_brush_size(&mut self, size: u32) {
        self.brush.brush_size = size.max(1);
    }

    /// Feed one pointer event: draws emitted segments and checkpoints
    /// history when a stroke ends.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> PointerResponse {
        let Some(surface) = self.surface.as_mut() else {
            self.tracker.cancel();
            return PointerResponse::default();
        };

        let response = self.tracker.handle(event, &self.brush);
        if let Some(segment) = &response.segment {
            segment.draw(surface);
        }
        if response.stroke_ended {
            self.checkpoint();
        }
        response
    }

    pub fn on_pointer_down(&mut self, position: Point, kind: PointerKind) -> EventDisposition {
        self.handle_pointer(PointerEvent::Down { position, kind }).disposition
    }

    pub fn on_pointer_move(&mut self, position: Point, kind: PointerKind) -> EventDisposition {
        self.handle_pointer(PointerEvent::Move { position, kind }).disposition
    }

    pub fn on_pointer_up(&mut self, position: Point, kind: PointerKind) -> EventDisposition {
        self.handle_pointer(PointerEvent::Up { position, kind }).disposition
    }

    pub fn on_pointer_leave(&mut self) -> EventDisposition {
        self.handle_pointer(PointerEvent::Leave).disposition
    }

    /// Wipe the surface to white. Returns whether anything happened.
    pub fn clear(&mut self) -> bool {
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        clear_surface(surface);
        self.checkpoint();
        self.notices.success("Canvas cleared");
        true
    }

    /// Apply an operation received from a peer. History is not touched.
    pub fn apply_operation(&mut self, operation: &Operation) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        match operation {
            Operation::Line(line) => line.to_segment().draw(surface),
            Operation::Clear => clear_surface(surface),
        }
    }

    pub fn undo(&mut self) -> bool {
        self.step_history(true)
    }

    pub fn redo(&mut self) -> bool {
        self.step_history(false)
    }

    fn step_history(&mut self, back: bool) -> bool {
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        let result = if back {
            self.history.undo(surface)
        } else {
            self.history.redo(surface)
        };
        match result {
            Ok(true) => {
                self.notices.info(if back { "Undo" } else { "Redo" });
                true
            }
            Ok(false) => false,
            Err(e) => {
                log::error!("Failed to restore history entry: {}", e);
                self.notices.error("Failed to restore canvas");
                false
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        self.is_mounted() && self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.is_mounted() && self.history.can_redo()
    }

    /// Push the current surface onto history.
    pub(crate) fn checkpoint(&mut self) {
        let Some(surface) = self.surface.as_ref() else {
            return;
        };
        if let Err(e) = self.history.push_snapshot(surface) {
            log::error!("Failed to record history snapshot: {}", e);
        }
    }

    /// Replace the surface with a snapshot data URL and checkpoint it.
    ///
    /// Returns `Ok(false)` when unmounted. On error the surface is unchanged.
    pub(crate) fn restore_data_url(&mut self, data_url: &str) -> Result<bool, CodecError> {
        let Some(surface) = self.surface.as_mut() else {
            return Ok(false);
        };
        let png = codec::from_data_url(data_url)?;
        codec::restore_png(surface, &png)?;
        self.checkpoint();
        Ok(true)
    }

    /// Encode the surface as a data URL, if mounted.
    pub(crate) fn encode_data_url(&self) -> Option<Result<String, CodecError>> {
        self.surface.as_ref().map(codec::surface_to_data_url)
    }

    /// Save the drawing under `key`.
    pub async fn save(&self, store: &dyn SnapshotStore, key: &str) -> StorageResult<Option<SnapshotRecord>> {
        let data_url = match self.encode_data_url() {
            None => return Ok(None),
            Some(Ok(data_url)) => data_url,
            Some(Err(e)) => {
                log::error!("Failed to encode artwork: {}", e);
                self.notices.error("Failed to save artwork");
                return Err(StorageError::Serialization(e.to_string()));
            }
        };

        match store.insert(key, &data_url).await {
            Ok(record) => {
                log::info!("Saved artwork {} under {}", record.id, key);
                self.notices.success("Artwork saved locally");
                Ok(Some(record))
            }
            Err(e) => {
                log::error!("Failed to save artwork: {}", e);
                self.notices.error("Failed to save artwork");
                Err(e)
            }
        }
    }

    /// Load the latest drawing saved under `key`. Returns whether the
    /// surface was replaced.
    pub async fn load(&mut self, store: &dyn SnapshotStore, key: &str) -> bool {
        if !self.is_mounted() {
            return false;
        }
        match store.get_latest(key).await {
            Ok(Some(record)) => match self.restore_data_url(&record.image_data) {
                Ok(true) => {
                    self.notices.success("Artwork loaded");
                    true
                }
                Ok(false) => false,
                Err(e) => {
                    log::error!("Failed to decode artwork {}: {}", record.id, e);
                    self.notices.error("Failed to load artwork");
                    false
                }
            },
            Ok(None) => {
                self.notices.info("No saved artwork found");
                false
            }
            Err(e) => {
                log::error!("Failed to load artwork: {}", e);
                self.notices.error("Failed to load artwork");
                false
            }
        }
    }

    /// PNG of the surface with the default download name.
    pub fn export(&self) -> Option<ExportedImage> {
        self.export_as(EXPORT_FILENAME)
    }

    pub(crate) fn export_as(&self, filename: &str) -> Option<ExportedImage> {
        let surface = self.surface.as_ref()?;
        match codec::encode_png(surface) {
            Ok(png) => {
                self.notices.success("Image downloaded");
                Some(ExportedImage {
                    png,
                    filename: filename.to_string(),
                })
            }
            Err(e) => {
                log::error!("Failed to export image: {}", e);
                self.notices.error("Failed to export image");
                None
            }
        }
    }

    /// Release the surface. Later calls become no-ops.
    pub fn unmount(&mut self) {
        self.tracker.cancel();
        self.surface = None;
    }
}
