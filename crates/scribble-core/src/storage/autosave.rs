//! Auto-save of the current session.

use crate::canvas::{Canvas, SessionSnapshot};
use crate::storage::{FileStorage, Storage, StorageResult};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default auto-save interval in seconds.
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 30;

/// Key under which the most recently saved session is mirrored.
pub const LAST_SESSION_KEY: &str = "__last_session__";

/// Saves a session periodically while it has unsaved changes.
pub struct AutoSaveManager<S: Storage> {
    storage: Arc<S>,
    interval: Duration,
    last_save: Option<Instant>,
    dirty: bool,
    /// Canvas content revision seen at the last save or load.
    saved_revision: Option<u64>,
}

impl<S: Storage> AutoSaveManager<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            interval: Duration::from_secs(DEFAULT_AUTOSAVE_INTERVAL_SECS),
            last_save: None,
            dirty: false,
            saved_revision: None,
        }
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether the session is dirty and the interval has elapsed.
    pub fn should_save(&self, now: Instant) -> bool {
        if !self.dirty {
            return false;
        }
        match self.last_save {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }

    /// Save `session` immediately and mirror it as the last session.
    pub async fn save(&mut self, session: &SessionSnapshot) -> StorageResult<()> {
        self.save_at(session, Instant::now()).await
    }

    /// Like [`save`](Self::save), recording `now` as the save time.
    pub async fn save_at(&mut self, session: &SessionSnapshot, now: Instant) -> StorageResult<()> {
        self.storage.save(&session.session_id, session).await?;
        self.storage.save(LAST_SESSION_KEY, session).await?;
        self.last_save = Some(now);
        self.dirty = false;
        log::debug!("Saved session {}", session.session_id);
        Ok(())
    }

    /// Save the canvas if its content changed and the interval has elapsed.
    ///
    /// A failed save leaves the canvas untouched, posts a notice on it and
    /// keeps the session dirty so the next tick retries. Returns true if a
    /// save happened.
    pub async fn tick(&mut self, canvas: &mut Canvas, now: Instant) -> bool {
        if self.saved_revision != Some(canvas.content_revision()) {
            self.dirty = true;
        }
        if !self.should_save(now) {
            return false;
        }
        let revision = canvas.content_revision();
        match self.save_at(&canvas.session_snapshot(), now).await {
            Ok(()) => {
                self.saved_revision = Some(revision);
                true
            }
            Err(e) => {
                // Back off for a full interval before retrying
                self.last_save = Some(now);
                canvas.report_storage_error("save", &e);
                false
            }
        }
    }

    pub async fn load(&mut self, id: &str) -> StorageResult<SessionSnapshot> {
        let session = self.storage.load(id).await?;
        self.loaded();
        Ok(session)
    }

    /// Load a session into `canvas`, posting a notice on failure.
    pub async fn load_into(&mut self, id: &str, canvas: &mut Canvas) -> bool {
        match self.load(id).await {
            Ok(session) => {
                canvas.load_session(session);
                self.saved_revision = Some(canvas.content_revision());
                true
            }
            Err(e) => {
                canvas.report_storage_error("load", &e);
                false
            }
        }
    }

    /// The most recently saved session, if any.
    pub async fn load_last(&mut self) -> Option<SessionSnapshot> {
        match self.storage.load(LAST_SESSION_KEY).await {
            Ok(session) => {
                self.loaded();
                Some(session)
            }
            Err(e) => {
                log::debug!("No last session to restore: {e}");
                None
            }
        }
    }

    pub async fn delete(&self, id: &str) -> StorageResult<()> {
        self.storage.delete(id).await
    }

    /// Saved session ids, without the last-session mirror.
    pub async fn list_sessions(&self) -> StorageResult<Vec<String>> {
        let mut ids = self.storage.list().await?;
        ids.retain(|id| id != LAST_SESSION_KEY);
        Ok(ids)
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    fn loaded(&mut self) {
        self.dirty = false;
        self.last_save = Some(Instant::now());
    }
}

/// File storage in the platform data directory.
pub fn create_default_storage() -> StorageResult<Arc<FileStorage>> {
    Ok(Arc::new(FileStorage::default_location()?))
}

/// An auto-save manager backed by [`create_default_storage`].
pub fn create_autosave_manager() -> StorageResult<AutoSaveManager<FileStorage>> {
    Ok(AutoSaveManager::new(create_default_storage()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaboration::UserIdentity;
    use crate::storage::{BoxFuture, MemoryStorage, StorageError, block_on};
    use crate::tools::ToolKind;
    use kurbo::Point;

    struct FailingStorage;

    impl Storage for FailingStorage {
        fn save(&self, _id: &str, _session: &SessionSnapshot) -> BoxFuture<'_, StorageResult<()>> {
            Box::pin(async { Err(StorageError::Io("read-only".into())) })
        }

        fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<SessionSnapshot>> {
            let id = id.to_string();
            Box::pin(async move { Err(StorageError::NotFound(id)) })
        }

        fn delete(&self, _id: &str) -> BoxFuture<'_, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
            Box::pin(async { Ok(vec![]) })
        }

        fn exists(&self, _id: &str) -> BoxFuture<'_, StorageResult<bool>> {
            Box::pin(async { Ok(false) })
        }
    }

    fn canvas_with_rect() -> Canvas {
        let mut canvas = Canvas::new(UserIdentity::new("me", "Me"));
        canvas.set_tool(ToolKind::Rectangle);
        canvas.pointer_down(Point::new(0.0, 0.0));
        canvas.pointer_move(Point::new(20.0, 20.0));
        canvas.pointer_up();
        canvas
    }

    #[test]
    fn test_dirty_and_interval() {
        let storage = Arc::new(MemoryStorage::new());
        let mut manager = AutoSaveManager::new(storage);
        let now = Instant::now();

        assert!(!manager.should_save(now));
        manager.mark_dirty();
        assert!(manager.should_save(now));

        block_on(manager.save(&SessionSnapshot::new())).unwrap();
        assert!(!manager.is_dirty());
        manager.mark_dirty();
        assert!(!manager.should_save(Instant::now()));
    }

    #[test]
    fn test_tick_saves_changed_canvas() {
        let storage = Arc::new(MemoryStorage::new());
        let mut manager = AutoSaveManager::new(storage.clone());
        let mut canvas = canvas_with_rect();

        assert!(block_on(manager.tick(&mut canvas, Instant::now())));
        let saved = block_on(storage.load(&canvas.session_id)).unwrap();
        assert_eq!(saved.elements.len(), 1);

        // Nothing changed since
        let later = Instant::now() + Duration::from_secs(DEFAULT_AUTOSAVE_INTERVAL_SECS + 1);
        assert!(!block_on(manager.tick(&mut canvas, later)));
    }

    #[test]
    fn test_tick_interval_follows_caller_clock() {
        let storage = Arc::new(MemoryStorage::new());
        let mut manager = AutoSaveManager::new(storage);
        let mut canvas = canvas_with_rect();
        let interval = Duration::from_secs(DEFAULT_AUTOSAVE_INTERVAL_SECS);
        // A caller clock well ahead of the wall clock
        let start = Instant::now() + Duration::from_secs(3600);

        assert!(block_on(manager.tick(&mut canvas, start)));

        canvas.set_tool(ToolKind::Circle);
        canvas.pointer_down(Point::new(50.0, 50.0));
        canvas.pointer_move(Point::new(80.0, 80.0));
        canvas.pointer_up();

        assert!(!block_on(manager.tick(&mut canvas, start + interval / 2)));
        assert!(manager.is_dirty());
        assert!(block_on(manager.tick(&mut canvas, start + interval)));
        assert!(!manager.is_dirty());
    }

    #[test]
    fn test_save_failure_becomes_notice() {
        let mut manager = AutoSaveManager::new(Arc::new(FailingStorage));
        let mut canvas = canvas_with_rect();

        assert!(!block_on(manager.tick(&mut canvas, Instant::now())));
        assert!(manager.is_dirty());
        assert_eq!(canvas.elements().len(), 1);
        assert_eq!(canvas.notices().len(), 1);
    }

    #[test]
    fn test_load_last_and_list() {
        let storage = Arc::new(MemoryStorage::new());
        let mut manager = AutoSaveManager::new(storage);
        assert!(block_on(manager.load_last()).is_none());

        let session = SessionSnapshot::new();
        block_on(manager.save(&session)).unwrap();

        assert_eq!(block_on(manager.load_last()), Some(session.clone()));
        assert_eq!(block_on(manager.list_sessions()).unwrap(), vec![session.session_id.clone()]);

        let mut canvas = Canvas::new(UserIdentity::new("me", "Me"));
        assert!(block_on(manager.load_into(&session.session_id, &mut canvas)));
        assert_eq!(canvas.session_id, session.session_id);
        assert!(!block_on(manager.load_into("missing", &mut canvas)));
        assert_eq!(canvas.notices().len(), 1);
    }
}
