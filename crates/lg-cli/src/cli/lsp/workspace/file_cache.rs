//! Text of files that are imported but not open, keyed by modification time.

use dashmap::DashMap;
use lg_core::SourceError;
use lsp_types::Url;
use std::sync::Arc;
use std::time::SystemTime;

#[derive(Debug, Clone)]
struct CachedFile {
    modified: Option<SystemTime>,
    text: Arc<str>,
}

/// Disk reads shared by every analysis. An entry is reused while the file's
/// modification time is unchanged, and dropped on a watched-file event.
#[derive(Debug, Clone, Default)]
pub struct FileCache {
    entries: Arc<DashMap<Url, CachedFile>>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, uri: &Url) -> Result<Arc<str>, SourceError> {
        let path = uri.to_file_path().map_err(|_| SourceError::NotAFile(uri.clone()))?;
        let metadata = std::fs::metadata(&path).map_err(|err| io_error(uri, err))?;
        if !metadata.is_file() {
            return Err(SourceError::Unreadable {
                uri: uri.clone(),
                message: "not a regular file".to_string(),
            });
        }
        let modified = metadata.modified().ok();

        if let Some(cached) = self.entries.get(uri) {
            if modified.is_some() && cached.modified == modified {
                return Ok(cached.text.clone());
            }
        }

        let text: Arc<str> = std::fs::read_to_string(&path).map_err(|err| io_error(uri, err))?.into();
        tracing::trace!(%uri, "file cache miss");
        self.entries.insert(uri.clone(), CachedFile { modified, text: text.clone() });
        Ok(text)
    }

    pub fn invalidate(&self, uri: &Url) {
        self.entries.remove(uri);
    }

    pub fn contains(&self, uri: &Url) -> bool {
        self.entries.contains_key(uri)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

fn io_error(uri: &Url, err: std::io::Error) -> SourceError {
    match err.kind() {
        std::io::ErrorKind::NotFound => SourceError::NotFound(uri.clone()),
        _ => SourceError::Unreadable { uri: uri.clone(), message: err.to_string() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_caches_until_invalidated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("common.lg");
        std::fs::write(&path, "# Greet\n- hi").unwrap();
        let uri = Url::from_file_path(&path).unwrap();

        let cache = FileCache::new();
        assert_eq!(&*cache.read(&uri).unwrap(), "# Greet\n- hi");
        assert!(cache.contains(&uri));
        assert_eq!(cache.len(), 1);

        cache.invalidate(&uri);
        assert!(!cache.contains(&uri));
        std::fs::write(&path, "# Greet\n- hello").unwrap();
        assert_eq!(&*cache.read(&uri).unwrap(), "# Greet\n- hello");
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let uri = Url::from_file_path(dir.path().join("missing.lg")).unwrap();
        assert_eq!(FileCache::new().read(&uri), Err(SourceError::NotFound(uri)));
    }

    #[test]
    fn test_non_file_uri() {
        let uri = Url::parse("untitled:Untitled-1").unwrap();
        assert!(matches!(FileCache::new().read(&uri), Err(SourceError::NotAFile(_))));
    }
}
