//! In-memory storage implementation.

use super::{BoxFuture, Storage, StorageError, StorageResult};
use crate::canvas::SessionSnapshot;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for testing and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStorage {
    sessions: RwLock<HashMap<String, SessionSnapshot>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {e}"))
}

impl Storage for MemoryStorage {
    fn save(&self, id: &str, session: &SessionSnapshot) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        let session = session.clone();
        Box::pin(async move {
            self.sessions.write().map_err(lock_error)?.insert(id, session);
            Ok(())
        })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<SessionSnapshot>> {
        let id = id.to_string();
        Box::pin(async move {
            let sessions = self.sessions.read().map_err(lock_error)?;
            sessions.get(&id).cloned().ok_or(StorageError::NotFound(id))
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            self.sessions.write().map_err(lock_error)?.remove(&id);
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        Box::pin(async move {
            let sessions = self.sessions.read().map_err(lock_error)?;
            Ok(sessions.keys().cloned().collect())
        })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let id = id.to_string();
        Box::pin(async move { Ok(self.sessions.read().map_err(lock_error)?.contains_key(&id)) })
    }
}
