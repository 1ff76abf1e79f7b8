//! Media storage interface.
//!
//! The editing core never touches storage; it works on byte streams. This
//! trait is what the surrounding application uses to fetch sources and save
//! artifacts. [`LocalStorage`] backs the command-line tool.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::error::{Result, ReelcutError};

/// Persistent media storage addressed by relative paths
pub trait MediaStorage: Send + Sync {
    /// Read the full payload stored at `path`
    fn get(&self, path: &str) -> Result<Vec<u8>>;

    /// Store `content` at `path`, returning where it can be reached
    fn put(&self, content: &[u8], path: &str) -> Result<String>;

    /// Location under which a project's media is published
    fn url_for_media(&self, project_id: &str) -> Result<String>;

    fn delete(&self, path: &str) -> Result<()>;
}

/// Filesystem storage rooted at a directory
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    base_url: String,
}

impl LocalStorage {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        fs::create_dir_all(&config.root).map_err(|e| {
            ReelcutError::Storage(format!(
                "Failed to create storage directory {}: {}",
                config.root.display(),
                e
            ))
        })?;

        Ok(Self {
            root: config.root.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a storage path, refusing anything that could escape the root
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative.components().any(|component| {
            !matches!(component, Component::Normal(_) | Component::CurDir)
        });
        if path.is_empty() || escapes {
            return Err(ReelcutError::Storage(format!(
                "Storage path must be relative and stay inside the storage root: {}",
                path
            )));
        }
        Ok(self.root.join(relative))
    }

    fn location(&self, path: &str) -> String {
        if self.base_url.is_empty() {
            self.root.join(path).display().to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches("./"))
        }
    }
}

impl MediaStorage for LocalStorage {
    fn get(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve(path)?;
        fs::read(&full_path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ReelcutError::FileNotFound(path.to_string()),
            _ => ReelcutError::Storage(format!("Failed to read {}: {}", full_path.display(), e)),
        })
    }

    fn put(&self, content: &[u8], path: &str) -> Result<String> {
        let full_path = self.resolve(path)?;
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full_path, content)
            .map_err(|e| ReelcutError::Storage(format!("Failed to write {}: {}", full_path.display(), e)))?;

        info!("Stored {} bytes at {}", content.len(), full_path.display());
        Ok(self.location(path))
    }

    fn url_for_media(&self, project_id: &str) -> Result<String> {
        self.resolve(project_id)?;
        Ok(self.location(project_id))
    }

    fn delete(&self, path: &str) -> Result<()> {
        let full_path = self.resolve(path)?;
        match fs::remove_file(&full_path) {
            Ok(()) => {
                debug!("Deleted {}", full_path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ReelcutError::FileNotFound(path.to_string())),
            Err(e) => Err(ReelcutError::Storage(format!("Failed to delete {}: {}", full_path.display(), e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(root: &Path, base_url: &str) -> LocalStorage {
        LocalStorage::new(&StorageConfig {
            root: root.to_path_buf(),
            base_url: base_url.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_put_get_delete() {
        let root = assert_fs::TempDir::new().unwrap();
        let storage = storage(root.path(), "https://media.example.com/");

        let location = storage.put(b"thumbnail", "project-1/thumbs/0.png").unwrap();
        assert_eq!(location, "https://media.example.com/project-1/thumbs/0.png");
        assert_eq!(storage.get("project-1/thumbs/0.png").unwrap(), b"thumbnail");

        storage.delete("project-1/thumbs/0.png").unwrap();
        assert!(matches!(
            storage.get("project-1/thumbs/0.png"),
            Err(ReelcutError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_rejects_paths_outside_root() {
        let root = assert_fs::TempDir::new().unwrap();
        let storage = storage(root.path(), "");

        for path in ["../secret.mp4", "/etc/passwd", "a/../../b.mp4", ""] {
            assert!(matches!(storage.resolve(path), Err(ReelcutError::Storage(_))), "{}", path);
        }
    }

    #[test]
    fn test_location_without_base_url_is_filesystem_path() {
        let root = assert_fs::TempDir::new().unwrap();
        let storage = storage(root.path(), "");

        let location = storage.url_for_media("project-7").unwrap();
        assert_eq!(location, root.path().join("project-7").display().to_string());
    }
}
