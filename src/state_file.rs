//! JSON state file backend
//!
//! The mapping lives in a single JSON file. A sibling `<file>.lock` holds an
//! advisory exclusive lock for the duration of a session so that two runs
//! cannot interleave.

use anyhow::{Context, Result};
use fs2::FileExt;
use reconcile::{StateBackend, StateData};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// `StateBackend` storing the mapping in a JSON file
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    lock: Option<File>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<file>.lock` next to the state file
    pub fn lock_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".lock");
        PathBuf::from(name)
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create state directory: {}", parent.display())
            })?;
        }
        Ok(())
    }
}

impl StateBackend for FileBackend {
    fn lock(&mut self) -> Result<()> {
        self.ensure_parent()?;

        let lock_path = self.lock_path();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;

        if file.try_lock_exclusive().is_err() {
            return Err(reconcile::Error::StateLocked {
                path: lock_path.display().to_string(),
            }
            .into());
        }

        log::debug!("Locked {}", lock_path.display());
        self.lock = Some(file);
        Ok(())
    }

    fn unlock(&mut self) -> Result<()> {
        // Closing the file releases the lock
        if self.lock.take().is_some() {
            log::debug!("Unlocked {}", self.lock_path().display());
        }
        Ok(())
    }

    fn load(&mut self) -> Result<StateData> {
        if !self.path.exists() {
            log::info!(
                "State file {} does not exist, starting empty",
                self.path.display()
            );
            return Ok(StateData::default());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state file: {}", self.path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", self.path.display()))
    }

    fn save(&mut self, data: &StateData) -> Result<()> {
        self.ensure_parent()?;

        let mut content =
            serde_json::to_string_pretty(data).context("Failed to serialize state to JSON")?;
        content.push('\n');

        let mut tmp = OsString::from(self.path.as_os_str());
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, &content)
            .with_context(|| format!("Failed to write state file: {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace state file: {}", self.path.display()))?;

        log::debug!("Saved state to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::{State, StateOptions};
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let mut backend = FileBackend::new(dir.path().join("state.json"));
        assert_eq!(backend.load().unwrap(), StateData::default());
    }

    #[test]
    fn test_save_writes_sorted_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/state.json");
        let mut backend = FileBackend::new(&path);

        let data = StateData::from_pairs([("Folder.b", "2"), ("Alert.a", "1")]);
        backend.save(&data).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "{\n  \"resources\": {\n    \"Alert.a\": \"1\",\n    \"Folder.b\": \"2\"\n  }\n}\n"
        );
        assert_eq!(backend.load().unwrap(), data);
    }

    #[test]
    fn test_corrupt_file_fails_to_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();
        assert!(FileBackend::new(&path).load().is_err());
    }

    #[test]
    fn test_second_lock_is_refused() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let mut first = FileBackend::new(&path);
        first.lock().unwrap();

        let mut second = FileBackend::new(&path);
        let err = second.lock().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<reconcile::Error>(),
            Some(reconcile::Error::StateLocked { .. })
        ));

        first.unlock().unwrap();
        second.lock().unwrap();
        second.unlock().unwrap();
    }

    #[test]
    fn test_session_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let mut state = State::new(FileBackend::new(&path), StateOptions::default());
        state
            .session(|state| {
                let id = reconcile::LocalId::new("Folder", "ops").unwrap();
                assert!(state.forget(&id).is_none());
                Ok(())
            })
            .unwrap();
        assert!(path.exists());

        let mut other = State::new(FileBackend::new(&path), StateOptions::default());
        let err = state.session(|_| other.session(|_| Ok(()))).unwrap_err();
        assert!(matches!(err, reconcile::Error::StateLocked { .. }));
    }
}
