use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::app::{FeedwatchError, Result};
use crate::domain::FeedItem;
use crate::store::Store;

pub const STATE_FILE_NAME: &str = "rss_feed_data.json";

/// Keeps the snapshot as an indented JSON array in `<dir>/rss_feed_data.json`.
///
/// Reads are tolerant per entry: objects without a usable guid are skipped
/// instead of invalidating the whole file.
pub struct JsonStore {
    dir: PathBuf,
    path: PathBuf,
}

impl JsonStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let path = dir.join(STATE_FILE_NAME);
        Self { dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<Option<Vec<Value>>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.read_error(e)),
        };

        serde_json::from_str::<Vec<Value>>(&content)
            .map(Some)
            .map_err(|e| self.read_error(e))
    }

    fn read_error(&self, reason: impl ToString) -> FeedwatchError {
        FeedwatchError::StorageRead {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    fn write_error(&self, reason: impl ToString) -> FeedwatchError {
        FeedwatchError::StorageWrite {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

impl Store for JsonStore {
    fn load_guids(&self) -> Result<HashSet<String>> {
        let Some(entries) = self.read_entries()? else {
            return Ok(HashSet::new());
        };

        Ok(entries
            .iter()
            .filter_map(|entry| entry.get("guid").and_then(Value::as_str))
            .filter(|guid| !guid.is_empty())
            .map(String::from)
            .collect())
    }

    fn load_items(&self) -> Result<Vec<FeedItem>> {
        let Some(entries) = self.read_entries()? else {
            return Ok(Vec::new());
        };

        Ok(entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value::<FeedItem>(entry).ok())
            .collect())
    }

    fn save_items(&self, items: &[FeedItem]) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| self.write_error(e))?;

        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        items
            .serialize(&mut serializer)
            .map_err(|e| self.write_error(e))?;

        fs::write(&self.path, out).map_err(|e| self.write_error(e))?;
        tracing::debug!("Saved {} items to {}", items.len(), self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FeedwatchError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn item(guid: &str) -> FeedItem {
        FeedItem {
            title: format!("Title {}", guid),
            link: format!("https://example.com/{}", guid),
            guid: guid.to_string(),
            published_at: None,
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path());
        assert!(store.load_guids().unwrap().is_empty());
        assert!(store.load_items().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path().join("nested"));
        let mut first = item("a");
        first.published_at = Some("2025-05-14 19:05:36".into());
        store.save_items(&[first.clone(), item("b")]).unwrap();

        let guids = store.load_guids().unwrap();
        assert_eq!(guids.len(), 2);
        assert!(guids.contains("a") && guids.contains("b"));
        assert_eq!(store.load_items().unwrap(), vec![first, item("b")]);
    }

    #[test]
    fn test_file_format() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path());
        let mut entry = item("a");
        entry.title = "福利".into();
        store.save_items(&[entry]).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.starts_with("[\n    {\n        \"title\": \"福利\""));
        assert!(!content.contains("pubDate"));
    }

    #[test]
    fn test_save_replaces_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path());
        store.save_items(&[item("a"), item("b")]).unwrap();
        store.save_items(&[item("c")]).unwrap();

        let guids = store.load_guids().unwrap();
        assert_eq!(guids.len(), 1);
        assert!(guids.contains("c"));
    }

    #[test]
    fn test_corrupt_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path());
        fs::write(store.path(), "{not json").unwrap();

        let err = store.load_guids().unwrap_err();
        assert!(matches!(err, FeedwatchError::StorageRead { .. }));
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path());
        fs::write(
            store.path(),
            r#"[{"guid": "ok", "title": "t", "link": "l"}, {"guid": ""}, {"title": "x"}, 42, {"guid": 7}]"#,
        )
        .unwrap();

        let guids = store.load_guids().unwrap();
        assert_eq!(guids.len(), 1);
        assert!(guids.contains("ok"));
        assert_eq!(store.load_items().unwrap().len(), 1);
    }

    #[test]
    fn test_unwritable_location_is_write_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let store = JsonStore::new(&blocker);

        let err = store.save_items(&[item("a")]).unwrap_err();
        assert!(matches!(err, FeedwatchError::StorageWrite { .. }));
    }

    #[test]
    fn test_clear() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path());
        assert!(!store.clear().unwrap());
        store.save_items(&[item("a")]).unwrap();
        assert!(store.clear().unwrap());
        assert!(store.load_guids().unwrap().is_empty());
    }
}
