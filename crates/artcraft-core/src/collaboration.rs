//! Shared drawing on a scope.
//!
//! A [`CollaborativeSession`] wraps a [`DrawingSession`], broadcasts every
//! locally drawn segment over a [`Channel`], applies segments drawn by peers,
//! and persists full-surface snapshots to a [`SnapshotStore`]. There is no
//! ordering or merge: peers converge only when they reload a snapshot.

use crate::brush::Tool;
use crate::channel::{Channel, Subscription};
use crate::color::Rgb;
use crate::input::{EventDisposition, PointerEvent, PointerKind, PointerResponse};
use crate::notice::{Notice, Notices};
use crate::session::{DrawingSession, ExportedImage, SessionConfig};
use crate::storage::{AutoSave, BoxFuture, SnapshotRecord, SnapshotStore, StorageError, StorageResult};
use crate::surface::Surface;
use crate::sync::{LineOp, Operation, OriginatorId, RemoteOperation};
use kurbo::{Point, Rect};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Supplies the local participant's identity.
pub trait IdentityProvider: Send + Sync {
    /// `None` for anonymous participants, who can draw but not broadcast or save.
    fn originator_id(&self) -> Option<OriginatorId>;
}

impl IdentityProvider for OriginatorId {
    fn originator_id(&self) -> Option<OriginatorId> {
        Some(self.clone())
    }
}

/// A participant that is not signed in.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl IdentityProvider for Anonymous {
    fn originator_id(&self) -> Option<OriginatorId> {
        None
    }
}

/// Lifecycle of a collaborative session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the initial snapshot. Pointer input is dropped and peer
    /// messages stay queued.
    Loading,
    Ready,
}

/// A drawing session shared with every participant of a scope.
pub struct CollaborativeSession {
    scope_id: String,
    channel: Arc<dyn Channel>,
    store: Arc<dyn SnapshotStore>,
    originator: Option<OriginatorId>,
    subscription: Option<Subscription>,
    state: SessionState,
    session: DrawingSession,
    notices: Notices,
    /// Cleared on unmount; async completions check it before reporting.
    alive: Arc<AtomicBool>,
    autosave: Option<AutoSave>,
}

impl CollaborativeSession {
    /// Subscribe to the scope and enter [`SessionState::Loading`].
    ///
    /// The caller then drives the initial load, either with [`Self::join`]
    /// or by awaiting [`Self::fetch_latest`] and passing the result to
    /// [`Self::finish_loading`].
    pub fn mount(
        scope_id: &str,
        channel: Arc<dyn Channel>,
        store: Arc<dyn SnapshotStore>,
        identity: &dyn IdentityProvider,
        config: &SessionConfig,
    ) -> Self {
        let session = DrawingSession::blank(config);
        let notices = session.notices();

        let subscription = match channel.subscribe(scope_id) {
            Ok(subscription) => Some(subscription),
            Err(e) => {
                log::warn!("Failed to subscribe to {}: {}", scope_id, e);
                None
            }
        };
        log::info!("Mounted collaborative session on {}", scope_id);

        Self {
            scope_id: scope_id.to_string(),
            channel,
            store,
            originator: identity.originator_id(),
            subscription,
            state: SessionState::Loading,
            session,
            notices,
            alive: Arc::new(AtomicBool::new(true)),
            autosave: config.autosave_interval.map(AutoSave::new),
        }
    }

    pub fn scope_id(&self) -> &str {
        &self.scope_id
    }

    pub fn originator_id(&self) -> Option<&OriginatorId> {
        self.originator.as_ref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == SessionState::Loading
    }

    pub fn is_mounted(&self) -> bool {
        self.session.is_mounted()
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.session.surface()
    }

    pub fn session(&self) -> &DrawingSession {
        &self.session
    }

    pub fn take_notices(&self) -> Vec<Notice> {
        self.notices.drain()
    }

    /// Fetch the scope's latest snapshot. Owns everything it needs, so it can
    /// be spawned or awaited while the session keeps handling input.
    pub fn fetch_latest(&self) -> BoxFuture<'static, StorageResult<Option<SnapshotRecord>>> {
        let store = self.store.clone();
        let scope_id = self.scope_id.clone();
        Box::pin(async move { store.get_latest(&scope_id).await })
    }

    /// Apply the initial fetch result and become ready.
    ///
    /// Whatever happens, the surface gets a first history entry: the loaded
    /// snapshot, or blank white when there is none or it failed to load.
    pub fn finish_loading(&mut self, result: StorageResult<Option<SnapshotRecord>>) {
        if !self.alive.load(Ordering::Acquire) {
            return;
        }
        let reload = self.state == SessionState::Ready;
        self.apply_fetched(result, reload);
        self.state = SessionState::Ready;
    }

    /// Fetch and apply the initial snapshot.
    pub async fn join(&mut self) {
        let result = self.fetch_latest().await;
        self.finish_loading(result);
    }

    /// Re-fetch the latest snapshot and replace the surface with it.
    ///
    /// Ignored while the initial load is still in flight.
    pub async fn load(&mut self) {
        if self.is_loading() {
            return;
        }
        self.join().await;
    }

    fn apply_fetched(&mut self, result: StorageResult<Option<SnapshotRecord>>, reload: bool) {
        match result {
            Ok(Some(record)) => match self.session.restore_data_url(&record.image_data) {
                Ok(_) => {
                    log::info!("Loaded snapshot {} for {}", record.id, self.scope_id);
                    self.notices.success(if reload {
                        "Reloaded community canvas"
                    } else {
                        "Loaded community canvas"
                    });
                }
                Err(e) => {
                    log::error!("Failed to decode snapshot {} for {}: {}", record.id, self.scope_id, e);
                    if !reload {
                        self.session.checkpoint();
                    }
                    self.notices.error("Failed to load community canvas");
                }
            },
            Ok(None) => {
                if reload {
                    self.notices.info("No saved community canvas yet");
                } else {
                    self.session.checkpoint();
                }
            }
            Err(e) => {
                log::error!("Failed to fetch snapshot for {}: {}", self.scope_id, e);
                if !reload {
                    self.session.checkpoint();
                }
                self.notices.error("Failed to load community canvas");
            }
        }
    }

    /// Feed one pointer event. Segments drawn while ready are broadcast.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> PointerResponse {
        if self.is_loading() {
            return PointerResponse::default();
        }

        let response = self.session.handle_pointer(event);
        if let Some(segment) = &response.segment {
            self.broadcast(Operation::Line(LineOp::from_segment(segment)));
            self.mark_dirty();
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

    pub fn set_display_rect(&mut self, display: Rect) {
        self.session.set_display_rect(display);
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.session.set_tool(tool);
    }

    pub fn set_color(&mut self, color: Rgb) {
        self.session.set_color(color);
    }

    pub fn set_brush_size(&mut self, size: u32) {
        self.session.set_brush_size(size);
    }

    /// Apply every queued peer operation. Returns how many were applied.
    ///
    /// Does nothing while loading, so early messages wait for the snapshot.
    pub fn poll_remote(&mut self) -> usize {
        if self.is_loading() || !self.is_mounted() {
            return 0;
        }
        let Some(subscription) = &self.subscription else {
            return 0;
        };

        let mut applied = 0;
        for raw in subscription.drain() {
            let remote = match RemoteOperation::decode(&raw) {
                Ok(remote) => remote,
                Err(e) => {
                    log::warn!("Dropping message on {}: {}", self.scope_id, e);
                    continue;
                }
            };
            if self.originator.as_ref() == Some(&remote.originator_id) {
                continue;
            }
            self.session.apply_operation(&remote.operation);
            applied += 1;
        }
        applied
    }

    /// Clear locally and tell every peer to clear.
    pub fn clear(&mut self) {
        if self.is_loading() {
            return;
        }
        if self.session.clear() {
            self.broadcast(Operation::Clear);
            self.mark_dirty();
        }
    }

    pub fn undo(&mut self) -> bool {
        !self.is_loading() && self.session.undo()
    }

    pub fn redo(&mut self) -> bool {
        !self.is_loading() && self.session.redo()
    }

    pub fn can_undo(&self) -> bool {
        self.session.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.session.can_redo()
    }

    /// PNG of the surface, named after the scope.
    pub fn export(&self) -> Option<ExportedImage> {
        if self.is_loading() {
            return None;
        }
        self.session
            .export_as(&format!("community-{}-canvas.png", self.scope_id))
    }

    /// Snapshot the surface now and return a future that stores it.
    ///
    /// Resolves to `Ok(None)` while loading or once unmounted, so a blank
    /// surface never shadows the scope's snapshot. Outcome notices are
    /// skipped if the session is unmounted before the store answers.
    pub fn save(&mut self) -> BoxFuture<'static, StorageResult<Option<SnapshotRecord>>> {
        if self.is_loading() {
            return Box::pin(async { Ok(None) });
        }
        if self.originator.is_none() {
            self.notices.error("Sign in to save");
            let scope_id = self.scope_id.clone();
            return Box::pin(async move { Err(StorageError::Unauthorized(scope_id)) });
        }

        let data_url = match self.session.encode_data_url() {
            None => return Box::pin(async { Ok(None) }),
            Some(Ok(data_url)) => data_url,
            Some(Err(e)) => {
                log::error!("Failed to encode canvas for {}: {}", self.scope_id, e);
                self.notices.error("Failed to save canvas");
                return Box::pin(async move { Err(StorageError::Serialization(e.to_string())) });
            }
        };
        if let Some(autosave) = &mut self.autosave {
            autosave.mark_saved();
        }

        let store = self.store.clone();
        let scope_id = self.scope_id.clone();
        let notices = self.notices.clone();
        let alive = self.alive.clone();
        Box::pin(async move {
            let result = store.insert(&scope_id, &data_url).await;
            if alive.load(Ordering::Acquire) {
                match &result {
                    Ok(record) => {
                        log::info!("Saved snapshot {} for {}", record.id, scope_id);
                        notices.success("Canvas saved to community");
                    }
                    Err(StorageError::Unauthorized(_)) => notices.error("Sign in to save"),
                    Err(e) => {
                        log::error!("Failed to save snapshot for {}: {}", scope_id, e);
                        notices.error("Failed to save canvas");
                    }
                }
            }
            result.map(Some)
        })
    }

    /// Save if auto-save is on, there are unsaved changes and the interval
    /// has elapsed.
    pub fn maybe_save(&mut self) -> Option<BoxFuture<'static, StorageResult<Option<SnapshotRecord>>>> {
        let due = self.autosave.as_ref().is_some_and(AutoSave::should_save);
        if !due || self.is_loading() || self.originator.is_none() || !self.is_mounted() {
            return None;
        }
        log::debug!("Auto-saving {}", self.scope_id);
        Some(self.save())
    }

    pub fn autosave(&self) -> Option<&AutoSave> {
        self.autosave.as_ref()
    }

    /// Leave the scope and release the surface.
    pub fn unmount(&mut self) {
        self.alive.store(false, Ordering::Release);
        self.subscription = None;
        self.session.unmount();
        log::info!("Unmounted collaborative session on {}", self.scope_id);
    }

    fn mark_dirty(&mut self) {
        if let Some(autosave) = &mut self.autosave {
            autosave.mark_dirty();
        }
    }

    fn broadcast(&self, operation: Operation) {
        let Some(originator) = &self.originator else {
            log::debug!("Anonymous participant, not broadcasting");
            return;
        };
        let remote = RemoteOperation::new(operation, originator.clone());
        if let Err(e) = self.channel.publish(&self.scope_id, &remote) {
            log::warn!("Failed to broadcast on {}: {}", self.scope_id, e);
        }
    }
}

impl Drop for CollaborativeSession {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MemoryChannel;
    use crate::input::MouseButton;
    use crate::notice::NoticeLevel;
    use crate::storage::MemorySnapshotStore;
    use futures::executor::block_on;
    use std::time::Duration;

    const LEFT: PointerKind = PointerKind::Mouse(MouseButton::Left);
    const SCOPE: &str = "community-42";

    struct Fixture {
        channel: MemoryChannel,
        store: Arc<MemorySnapshotStore>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                channel: MemoryChannel::new(),
                store: Arc::new(MemorySnapshotStore::new()),
            }
        }

        fn mount(&self, identity: &dyn IdentityProvider) -> CollaborativeSession {
            let config = SessionConfig {
                width: 80,
                height: 60,
                autosave_interval: None,
                ..SessionConfig::default()
            };
            CollaborativeSession::mount(
                SCOPE,
                Arc::new(self.channel.clone()),
                self.store.clone(),
                identity,
                &config,
            )
        }

        fn join(&self, id: &str) -> CollaborativeSession {
            let mut session = self.mount(&OriginatorId::from(id));
            block_on(session.join());
            session
        }
    }

    struct FailingStore;

    impl SnapshotStore for FailingStore {
        fn get_latest(&self, _scope_id: &str) -> BoxFuture<'_, StorageResult<Option<SnapshotRecord>>> {
            Box::pin(async { Err(StorageError::Io("offline".to_string())) })
        }

        fn insert(&self, scope_id: &str, _image_data: &str) -> BoxFuture<'_, StorageResult<SnapshotRecord>> {
            let scope_id = scope_id.to_string();
            Box::pin(async move { Err(StorageError::Unauthorized(scope_id)) })
        }
    }

    fn stroke(session: &mut CollaborativeSession, from: (f64, f64), to: (f64, f64)) {
        session.on_pointer_down(Point::new(from.0, from.1), LEFT);
        session.on_pointer_move(Point::new(to.0, to.1), LEFT);
        session.on_pointer_up(Point::new(to.0, to.1), LEFT);
    }

    fn pixel(session: &CollaborativeSession, x: i64, y: i64) -> Rgb {
        session.surface().unwrap().pixel(x, y).unwrap()
    }

    fn messages(session: &CollaborativeSession) -> Vec<String> {
        session.take_notices().into_iter().map(|n| n.message).collect()
    }

    #[test]
    fn test_mount_subscribes_and_starts_loading() {
        let fixture = Fixture::new();
        let session = fixture.mount(&OriginatorId::from("u1"));
        assert!(session.is_loading());
        assert_eq!(fixture.channel.subscriber_count(SCOPE), 1);
        assert!(session.session().history().is_empty());
    }

    #[test]
    fn test_join_without_snapshot_starts_blank() {
        let fixture = Fixture::new();
        let session = fixture.join("u1");
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.session().history().len(), 1);
        assert_eq!(session.surface().unwrap().count(Rgb::WHITE), 80 * 60);
        assert!(messages(&session).is_empty());
    }

    #[test]
    fn test_pointer_input_dropped_while_loading() {
        let fixture = Fixture::new();
        let observer = fixture.channel.subscribe(SCOPE).unwrap();
        let mut session = fixture.mount(&OriginatorId::from("u1"));

        stroke(&mut session, (10.0, 10.0), (50.0, 10.0));
        assert_eq!(session.surface().unwrap().count(Rgb::WHITE), 80 * 60);
        assert!(observer.drain().is_empty());

        session.finish_loading(Ok(None));
        stroke(&mut session, (10.0, 10.0), (50.0, 10.0));
        assert_eq!(pixel(&session, 30, 10), Rgb::BLACK);
        assert_eq!(observer.drain().len(), 1);
    }

    #[test]
    fn test_remote_messages_wait_for_loading() {
        let fixture = Fixture::new();
        let mut u1 = fixture.mount(&OriginatorId::from("u1"));
        let mut u2 = fixture.join("u2");

        stroke(&mut u2, (10.0, 20.0), (50.0, 20.0));
        assert_eq!(u1.poll_remote(), 0);

        block_on(u1.join());
        assert_eq!(u1.poll_remote(), 1);
        assert_eq!(pixel(&u1, 30, 20), Rgb::BLACK);
    }

    #[test]
    fn test_own_echo_is_ignored() {
        let fixture = Fixture::new();
        let mut u1 = fixture.join("u1");
        stroke(&mut u1, (10.0, 20.0), (50.0, 20.0));
        u1.undo();
        assert_eq!(u1.poll_remote(), 0);
        assert_eq!(u1.surface().unwrap().count(Rgb::WHITE), 80 * 60);
    }

    #[test]
    fn test_malformed_messages_are_dropped() {
        let fixture = Fixture::new();
        let mut u1 = fixture.join("u1");
        fixture.channel.publish_raw(SCOPE, "not json");
        fixture.channel.publish_raw(SCOPE, r#"{"type":"fill","originatorId":"u2"}"#);
        fixture.channel.publish_raw(SCOPE, r#"{"type":"clear","originatorId":"u2"}"#);
        assert_eq!(u1.poll_remote(), 1);
    }

    #[test]
    fn test_remote_line_bypasses_history() {
        let fixture = Fixture::new();
        let mut u1 = fixture.join("u1");
        let mut u2 = fixture.join("u2");
        u2.set_color(Rgb::new(255, 0, 0));
        stroke(&mut u2, (10.0, 10.0), (50.0, 10.0));

        assert_eq!(u1.poll_remote(), 1);
        assert_eq!(pixel(&u1, 30, 10), Rgb::new(255, 0, 0));
        assert_eq!(u1.session().history().len(), 1);
        assert!(!u1.can_undo());
    }

    #[test]
    fn test_clear_propagates() {
        let fixture = Fixture::new();
        let mut u1 = fixture.join("u1");
        let mut u2 = fixture.join("u2");
        stroke(&mut u1, (10.0, 10.0), (50.0, 10.0));
        u1.poll_remote();

        u2.clear();
        assert_eq!(u1.poll_remote(), 1);
        assert_eq!(u1.surface().unwrap().count(Rgb::WHITE), 80 * 60);
        // u1 can still undo its own stroke locally
        assert!(u1.can_undo());
        assert!(messages(&u2).contains(&"Canvas cleared".to_string()));
    }

    #[test]
    fn test_save_then_join_sees_snapshot() {
        let fixture = Fixture::new();
        let mut u1 = fixture.join("u1");
        u1.set_color(Rgb::new(0, 0, 255));
        stroke(&mut u1, (10.0, 30.0), (70.0, 30.0));

        let record = block_on(u1.save()).unwrap().unwrap();
        assert_eq!(record.scope_id, SCOPE);
        assert_eq!(messages(&u1), vec!["Canvas saved to community"]);

        let u3 = fixture.join("u3");
        assert_eq!(pixel(&u3, 40, 30), Rgb::new(0, 0, 255));
        assert_eq!(u3.session().history().len(), 1);
        assert_eq!(messages(&u3), vec!["Loaded community canvas"]);
    }

    #[test]
    fn test_reload_stays_ready() {
        let fixture = Fixture::new();
        let mut u1 = fixture.join("u1");
        let mut u2 = fixture.join("u2");
        stroke(&mut u2, (10.0, 30.0), (70.0, 30.0));
        block_on(u2.save()).unwrap();

        block_on(u1.load());
        assert_eq!(u1.state(), SessionState::Ready);
        assert_eq!(pixel(&u1, 40, 30), Rgb::BLACK);
        assert_eq!(messages(&u1), vec!["Reloaded community canvas"]);
        assert_eq!(u1.session().history().len(), 2);
    }

    #[test]
    fn test_anonymous_draws_but_cannot_share() {
        let fixture = Fixture::new();
        let observer = fixture.channel.subscribe(SCOPE).unwrap();
        let mut anon = fixture.mount(&Anonymous);
        block_on(anon.join());

        stroke(&mut anon, (10.0, 10.0), (50.0, 10.0));
        assert_eq!(pixel(&anon, 30, 10), Rgb::BLACK);
        assert!(observer.drain().is_empty());

        assert!(matches!(block_on(anon.save()), Err(StorageError::Unauthorized(_))));
        assert_eq!(messages(&anon), vec!["Sign in to save"]);
        assert_eq!(fixture.store.record_count(SCOPE), 0);
    }

    #[test]
    fn test_failed_fetch_still_becomes_ready() {
        let channel = MemoryChannel::new();
        let mut session = CollaborativeSession::mount(
            SCOPE,
            Arc::new(channel),
            Arc::new(FailingStore),
            &OriginatorId::from("u1"),
            &SessionConfig::default(),
        );
        block_on(session.join());

        assert!(!session.is_loading());
        assert_eq!(session.session().history().len(), 1);
        let notices = session.take_notices();
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert_eq!(notices[0].message, "Failed to load community canvas");
    }

    #[test]
    fn test_unauthorized_store_maps_to_sign_in() {
        let mut session = CollaborativeSession::mount(
            SCOPE,
            Arc::new(MemoryChannel::new()),
            Arc::new(FailingStore),
            &OriginatorId::from("u1"),
            &SessionConfig::default(),
        );
        session.finish_loading(Ok(None));
        assert!(block_on(session.save()).is_err());
        assert_eq!(messages(&session), vec!["Sign in to save"]);
    }

    #[test]
    fn test_corrupt_snapshot_keeps_white() {
        let fixture = Fixture::new();
        block_on(fixture.store.insert(SCOPE, "data:image/png;base64,AAAA")).unwrap();
        let session = fixture.join("u1");
        assert_eq!(session.surface().unwrap().count(Rgb::WHITE), 80 * 60);
        assert_eq!(session.session().history().len(), 1);
        assert_eq!(messages(&session), vec!["Failed to load community canvas"]);
    }

    #[test]
    fn test_unmount_ignores_late_completions() {
        let fixture = Fixture::new();
        let mut u1 = fixture.join("u1");
        stroke(&mut u1, (10.0, 10.0), (50.0, 10.0));

        let pending_save = u1.save();
        let pending_fetch = u1.fetch_latest();
        u1.unmount();
        assert_eq!(fixture.channel.subscriber_count(SCOPE), 0);

        assert!(block_on(pending_save).unwrap().is_some());
        u1.finish_loading(block_on(pending_fetch));
        assert!(u1.take_notices().is_empty());
        assert!(u1.surface().is_none());

        stroke(&mut u1, (10.0, 10.0), (50.0, 10.0));
        u1.clear();
        assert_eq!(u1.poll_remote(), 0);
        assert!(u1.export().is_none());
    }

    #[test]
    fn test_commands_ignored_while_loading() {
        let fixture = Fixture::new();
        let mut u1 = fixture.join("u1");
        stroke(&mut u1, (2.0, 10.0), (70.0, 10.0));
        block_on(u1.save()).unwrap();
        u1.poll_remote();
        messages(&u1);

        let mut u2 = fixture.mount(&OriginatorId::from("u2"));
        u2.clear();
        assert!(block_on(u2.save()).unwrap().is_none());
        assert!(!u2.undo());
        assert!(!u2.redo());
        assert!(u2.export().is_none());
        block_on(u2.load());
        assert!(u2.is_loading());

        // nothing reached the store or the peers
        assert_eq!(fixture.store.record_count(SCOPE), 1);
        assert_eq!(u1.poll_remote(), 0);
        assert_eq!(pixel(&u1, 30, 10), Rgb::BLACK);
        assert!(messages(&u2).is_empty());

        block_on(u2.join());
        assert_eq!(u2.session().history().len(), 1);
        assert_eq!(pixel(&u2, 30, 10), Rgb::BLACK);
    }

    #[test]
    fn test_export_filename() {
        let fixture = Fixture::new();
        let u1 = fixture.join("u1");
        let image = u1.export().unwrap();
        assert_eq!(image.filename, "community-community-42-canvas.png");
    }

    #[test]
    fn test_autosave_after_local_change() {
        let fixture = Fixture::new();
        let config = SessionConfig {
            width: 80,
            height: 60,
            autosave_interval: Some(Duration::from_secs(3600)),
            ..SessionConfig::default()
        };
        let mut u1 = CollaborativeSession::mount(
            SCOPE,
            Arc::new(fixture.channel.clone()),
            fixture.store.clone(),
            &OriginatorId::from("u1"),
            &config,
        );
        block_on(u1.join());
        assert!(u1.maybe_save().is_none());

        stroke(&mut u1, (10.0, 10.0), (50.0, 10.0));
        let save = u1.maybe_save().unwrap();
        block_on(save).unwrap();
        assert_eq!(fixture.store.record_count(SCOPE), 1);

        // interval has not elapsed yet
        stroke(&mut u1, (10.0, 20.0), (50.0, 20.0));
        assert!(u1.maybe_save().is_none());
        assert!(u1.autosave().unwrap().is_dirty());
    }
}
