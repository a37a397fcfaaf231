//! Periodic snapshot policy.

use std::time::{Duration, Instant};

/// Default auto-save interval in seconds.
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 30;

/// Tracks unsaved changes and decides when a periodic save is due.
#[derive(Debug, Clone)]
pub struct AutoSave {
    interval: Duration,
    last_save: Option<Instant>,
    dirty: bool,
}

impl Default for AutoSave {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_AUTOSAVE_INTERVAL_SECS))
    }
}

impl AutoSave {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_save: None,
            dirty: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Mark the surface as having unsaved changes.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Record that a save just started.
    pub fn mark_saved(&mut self) {
        self.dirty = false;
        self.last_save = Some(Instant::now());
    }

    /// Dirty and the interval has elapsed since the last save.
    pub fn should_save(&self) -> bool {
        if !self.dirty {
            return false;
        }

        match self.last_save {
            Some(last) => last.elapsed() >= self.interval,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_never_saves() {
        let autosave = AutoSave::default();
        assert!(!autosave.is_dirty());
        assert!(!autosave.should_save());
    }

    #[test]
    fn test_first_dirty_saves_immediately() {
        let mut autosave = AutoSave::default();
        autosave.mark_dirty();
        assert!(autosave.should_save());
    }

    #[test]
    fn test_interval_gates_following_saves() {
        let mut autosave = AutoSave::new(Duration::from_secs(3600));
        autosave.mark_dirty();
        autosave.mark_saved();
        assert!(!autosave.is_dirty());

        autosave.mark_dirty();
        assert!(!autosave.should_save());

        autosave.set_interval(Duration::ZERO);
        assert!(autosave.should_save());
    }
}
