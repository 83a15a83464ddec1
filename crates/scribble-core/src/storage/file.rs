//! File-based storage: one JSON file per session.

use super::{BoxFuture, Storage, StorageError, StorageResult};
use crate::canvas::SessionSnapshot;
use std::fs;
use std::path::{Path, PathBuf};

/// Stores sessions as `<id>.json` files in a directory.
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a file storage rooted at `base_path`, creating the directory
    /// if needed.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .map_err(|e| StorageError::Io(format!("Failed to create storage directory: {e}")))?;
        }
        Ok(Self { base_path })
    }

    /// Create file storage in the platform data directory.
    ///
    /// On Linux: `~/.local/share/scribble/sessions/`
    /// On Windows: `%LOCALAPPDATA%\scribble\sessions\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
        Self::new(base.join("scribble").join("sessions"))
    }

    fn session_path(&self, id: &str) -> PathBuf {
        let safe_id: String = id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{safe_id}.json"))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl Storage for FileStorage {
    fn save(&self, id: &str, session: &SessionSnapshot) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.session_path(id);
        let json = session.to_json();
        Box::pin(async move {
            let json = json.map_err(|e| StorageError::Serialization(e.to_string()))?;
            fs::write(&path, json).map_err(|e| StorageError::Io(format!("Failed to write {}: {e}", path.display())))
        })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<SessionSnapshot>> {
        let path = self.session_path(id);
        let id = id.to_string();
        Box::pin(async move {
            if !path.exists() {
                return Err(StorageError::NotFound(id));
            }
            let json = fs::read_to_string(&path)
                .map_err(|e| StorageError::Io(format!("Failed to read {}: {e}", path.display())))?;
            SessionSnapshot::from_json(&json)
                .map_err(|e| StorageError::Serialization(format!("Failed to parse {}: {e}", path.display())))
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.session_path(id);
        Box::pin(async move {
            if path.exists() {
                fs::remove_file(&path)
                    .map_err(|e| StorageError::Io(format!("Failed to delete {}: {e}", path.display())))?;
            }
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        let base = self.base_path.clone();
        Box::pin(async move {
            if !base.exists() {
                return Ok(vec![]);
            }
            let entries = fs::read_dir(&base).map_err(|e| StorageError::Io(format!("Failed to read directory: {e}")))?;

            let ids = entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
                .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
                .collect();
            Ok(ids)
        })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let path = self.session_path(id);
        Box::pin(async move { Ok(path.exists()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{BoxSize, Element, ElementKind, ElementStyle};
    use crate::storage::block_on;
    use kurbo::Point;
    use tempfile::tempdir;

    #[test]
    fn test_file_storage_save_load() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        let mut session = SessionSnapshot::new();
        session.name = "Retro".to_string();
        session.elements.push(Element::new(
            Point::new(10.0, 10.0),
            ElementKind::Rectangle { size: BoxSize::new(100.0, 50.0) },
            ElementStyle::default(),
        ));

        block_on(storage.save(&session.session_id, &session)).unwrap();
        let loaded = block_on(storage.load(&session.session_id)).unwrap();

        assert_eq!(loaded, session);
    }

    #[test]
    fn test_file_storage_not_found() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        let result = block_on(storage.load("nonexistent"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_file_storage_corrupt_file() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        fs::write(dir.path().join("broken.json"), "{not json").unwrap();

        let result = block_on(storage.load("broken"));
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }

    #[test]
    fn test_file_storage_list_and_delete() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let session = SessionSnapshot::new();
        block_on(storage.save("one", &session)).unwrap();
        block_on(storage.save("two", &session)).unwrap();

        let mut list = block_on(storage.list()).unwrap();
        list.sort();
        assert_eq!(list, vec!["one".to_string(), "two".to_string()]);

        block_on(storage.delete("one")).unwrap();
        assert!(!block_on(storage.exists("one")).unwrap());
    }

    #[test]
    fn test_file_storage_sanitizes_id() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        let session = SessionSnapshot::new();
        block_on(storage.save("team/board:1", &session)).unwrap();

        let loaded = block_on(storage.load("team/board:1")).unwrap();
        assert_eq!(loaded.session_id, session.session_id);
    }
}
