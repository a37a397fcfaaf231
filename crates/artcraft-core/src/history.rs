//! Linear undo/redo over full-surface PNG snapshots.

use crate::codec::{self, CodecError};
use crate::surface::Surface;
use thiserror::Error;

/// History errors.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Snapshot codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Per-client snapshot history with a cursor.
///
/// Once at least one entry exists, `0 <= index < len` holds. Pushing after
/// an undo discards everything beyond the cursor.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<Vec<u8>>,
    index: usize,
    /// Maximum number of entries kept, oldest dropped first.
    limit: Option<usize>,
}

impl History {
    /// Create an empty, unbounded history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty history keeping at most `limit` entries.
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            limit: limit.map(|l| l.max(1)),
            ..Self::default()
        }
    }

    /// Serialize the surface and append it as the new current entry.
    pub fn push_snapshot(&mut self, surface: &Surface) -> Result<(), HistoryError> {
        let snapshot = codec::encode_png(surface)?;
        self.push_encoded(snapshot);
        Ok(())
    }

    /// Append already-encoded PNG bytes as the new current entry.
    pub fn push_encoded(&mut self, snapshot: Vec<u8>) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.index + 1);
        }
        self.entries.push(snapshot);

        if let Some(limit) = self.limit {
            if self.entries.len() > limit {
                let excess = self.entries.len() - limit;
                self.entries.drain(..excess);
            }
        }
        self.index = self.entries.len() - 1;
    }

    /// Step back one entry, restoring it onto `surface`.
    ///
    /// Returns `Ok(false)` when already at the oldest entry. The cursor only
    /// moves once the snapshot decoded successfully.
    pub fn undo(&mut self, surface: &mut Surface) -> Result<bool, HistoryError> {
        if !self.can_undo() {
            return Ok(false);
        }
        self.restore(self.index - 1, surface)?;
        Ok(true)
    }

    /// Step forward one entry, restoring it onto `surface`.
    pub fn redo(&mut self, surface: &mut Surface) -> Result<bool, HistoryError> {
        if !self.can_redo() {
            return Ok(false);
        }
        self.restore(self.index + 1, surface)?;
        Ok(true)
    }

    fn restore(&mut self, target: usize, surface: &mut Surface) -> Result<(), HistoryError> {
        codec::restore_png(surface, &self.entries[target])?;
        self.index = target;
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        !self.entries.is_empty() && self.index < self.entries.len() - 1
    }

    /// The entry under the cursor.
    pub fn current(&self) -> Option<&[u8]> {
        self.entries.get(self.index).map(Vec::as_slice)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brush::{BrushSettings, Tool};
    use crate::color::Rgb;
    use crate::render::draw_segment;

    fn stroke(surface: &mut Surface, y: i32) {
        let brush = BrushSettings::new(Rgb::new(0, 0, 255), 3, Tool::Brush);
        draw_segment(surface, 1, y, 30, y, &brush);
    }

    #[test]
    fn test_empty_history() {
        let mut history = History::new();
        let mut surface = Surface::new(8, 8);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert!(!history.undo(&mut surface).unwrap());
        assert!(!history.redo(&mut surface).unwrap());
        assert!(history.current().is_none());
    }

    #[test]
    fn test_undo_all_returns_to_initial_bytes() {
        let mut history = History::new();
        let mut surface = Surface::new(32, 32);
        history.push_snapshot(&surface).unwrap();
        let initial = history.current().unwrap().to_vec();

        for y in [4, 10, 16, 22] {
            stroke(&mut surface, y);
            history.push_snapshot(&surface).unwrap();
        }
        for _ in 0..4 {
            assert!(history.undo(&mut surface).unwrap());
        }

        assert!(!history.can_undo());
        assert_eq!(codec::encode_png(&surface).unwrap(), initial);
        assert_eq!(surface.count(Rgb::WHITE), 32 * 32);
    }

    #[test]
    fn test_redo_restores_stroke() {
        let mut history = History::new();
        let mut surface = Surface::new(32, 32);
        history.push_snapshot(&surface).unwrap();
        stroke(&mut surface, 8);
        history.push_snapshot(&surface).unwrap();
        let drawn = surface.clone();

        history.undo(&mut surface).unwrap();
        assert!(history.can_redo());
        assert!(history.redo(&mut surface).unwrap());
        assert_eq!(surface, drawn);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_push_after_undo_truncates_redo() {
        let mut history = History::new();
        let mut surface = Surface::new(32, 32);
        history.push_snapshot(&surface).unwrap();
        stroke(&mut surface, 8);
        history.push_snapshot(&surface).unwrap();

        history.undo(&mut surface).unwrap();
        stroke(&mut surface, 20);
        history.push_snapshot(&surface).unwrap();

        assert_eq!(history.len(), 2);
        assert!(!history.can_redo());
        let after = surface.clone();
        assert!(!history.redo(&mut surface).unwrap());
        assert_eq!(surface, after);
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = History::with_limit(Some(3));
        let mut surface = Surface::new(32, 32);
        for y in [2, 8, 14, 20, 26] {
            stroke(&mut surface, y);
            history.push_snapshot(&surface).unwrap();
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.index(), 2);
    }

    #[test]
    fn test_corrupt_entry_keeps_cursor() {
        let mut history = History::new();
        let mut surface = Surface::new(8, 8);
        history.push_encoded(b"garbage".to_vec());
        history.push_snapshot(&surface).unwrap();

        stroke(&mut surface, 4);
        let before = surface.clone();
        assert!(history.undo(&mut surface).is_err());
        assert_eq!(history.index(), 1);
        assert_eq!(surface, before);
    }
}
