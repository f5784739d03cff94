use crate::model::ClipEntry;
use anyhow::{Context, Result};
use log::{debug, warn};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

pub const STORE_FILE: &str = "clips.json";

/// Clip history on disk, keyed by content hash. Storing a hash again replaces the older entry.
pub struct ClipStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ClipStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::open(dir.join(STORE_FILE))
    }

    fn load(&self) -> Result<HashMap<String, ClipEntry>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {:?}", self.path))?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&content).with_context(|| format!("parsing {:?}", self.path))
    }

    /// Writes through a sibling temp file, removed again if anything fails.
    fn save(&self, clips: &HashMap<String, ClipEntry>) -> Result<()> {
        let content = serde_json::to_string_pretty(clips)?;
        let tmp = self.path.with_extension("json.tmp");
        let result = self.replace_with(&tmp, content.as_bytes());
        if result.is_err() && tmp.exists() {
            if let Err(e) = fs::remove_file(&tmp) {
                warn!("ClipStore: failed to remove {:?}: {}", tmp, e);
            }
        }
        result
    }

    fn replace_with(&self, tmp: &Path, content: &[u8]) -> Result<()> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(tmp).with_context(|| format!("creating {:?}", tmp))?;
        file.write_all(content)?;
        file.sync_all()?;
        fs::rename(tmp, &self.path).with_context(|| format!("replacing {:?}", self.path))?;
        Ok(())
    }

    pub fn put(&self, entry: ClipEntry) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut clips = self.load()?;
        debug!("ClipStore: storing {} ({} entries)", entry.content_hash, clips.len());
        clips.insert(entry.content_hash.clone(), entry);
        self.save(&clips)
    }

    /// Every stored clip, most recent first. Read failures yield an empty history.
    pub fn history(&self) -> Vec<ClipEntry> {
        let mut clips: Vec<ClipEntry> = match self.load() {
            Ok(clips) => clips.into_values().collect(),
            Err(e) => {
                warn!("ClipStore: failed to read history: {:#}", e);
                return Vec::new();
            }
        };
        clips.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        clips
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn history_is_most_recent_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = ClipStore::in_dir(dir.path());
        store.put(ClipEntry::new("first".into(), 10)).unwrap();
        store.put(ClipEntry::new("second".into(), 20)).unwrap();
        store.put(ClipEntry::new("third".into(), 15)).unwrap();

        let contents: Vec<_> = store.history().into_iter().map(|c| c.content).collect();
        assert_eq!(contents, vec!["second", "third", "first"]);
    }

    #[test]
    fn same_content_replaces_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = ClipStore::in_dir(dir.path());
        store.put(ClipEntry::new("a".into(), 1)).unwrap();
        store.put(ClipEntry::new("b".into(), 2)).unwrap();
        store.put(ClipEntry::new("a".into(), 3)).unwrap();

        let history = store.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "a");
        assert_eq!(history[0].timestamp, 3);
    }

    #[test]
    fn missing_or_corrupt_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ClipStore::in_dir(dir.path());
        assert!(store.history().is_empty());

        fs::write(dir.path().join(STORE_FILE), "{ not json").unwrap();
        assert!(store.history().is_empty());
        assert!(store.put(ClipEntry::new("x".into(), 1)).is_err());
    }

    #[test]
    fn reopened_store_sees_saved_entries() {
        let dir = tempfile::tempdir().unwrap();
        ClipStore::in_dir(dir.path()).put(ClipEntry::new("kept".into(), 5)).unwrap();
        let history = ClipStore::in_dir(dir.path()).history();
        assert_eq!(history, vec![ClipEntry::new("kept".into(), 5)]);
    }

    #[test]
    fn failed_replace_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join(STORE_FILE);
        fs::create_dir(&blocked).unwrap();
        fs::write(blocked.join("occupant"), "x").unwrap();

        let store = ClipStore::in_dir(dir.path());
        let clips = HashMap::from([("h".to_string(), ClipEntry::new("text".into(), 1))]);
        assert!(store.save(&clips).is_err());
        assert!(!dir.path().join("clips.json.tmp").exists());
        assert!(blocked.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn store_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let store = ClipStore::in_dir(dir.path());
        store.put(ClipEntry::new("secret".into(), 1)).unwrap();
        let mode = fs::metadata(dir.path().join(STORE_FILE)).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
