//! State backends: a JSON file on disk and an in-memory slot.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;

use crate::traits::StateBackend;

/// Stores the state document in a single file.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateBackend for FileBackend {
    fn load(&self) -> anyhow::Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read state file {}", self.path.display()))?;
        Ok(Some(content))
    }

    fn save(&mut self, document: &str) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create state directory {}", parent.display())
                })?;
            }
        }
        // Atomic replace.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, document)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

/// Keeps the document in memory. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    slot: Arc<Mutex<Option<String>>>,
    fail_saves: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(document.into()))),
            fail_saves: false,
        }
    }

    /// A backend whose saves always fail, for exercising persistence errors.
    pub fn failing() -> Self {
        Self {
            slot: Arc::default(),
            fail_saves: true,
        }
    }

    pub fn document(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl StateBackend for MemoryBackend {
    fn load(&self) -> anyhow::Result<Option<String>> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("state slot poisoned"))?;
        Ok(slot.clone())
    }

    fn save(&mut self, document: &str) -> anyhow::Result<()> {
        if self.fail_saves {
            anyhow::bail!("storage unavailable");
        }
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("state slot poisoned"))?;
        *slot = Some(document.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_backend_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = FileBackend::new(dir.path().join("nested/state.json"));
        assert_eq!(backend.load().unwrap(), None);
        backend.save("{\"a\":1}").unwrap();
        assert_eq!(backend.load().unwrap().as_deref(), Some("{\"a\":1}"));
        backend.save("{}").unwrap();
        assert_eq!(backend.load().unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn memory_backend_clones_share_slot() {
        let backend = MemoryBackend::new();
        let mut writer = backend.clone();
        writer.save("doc").unwrap();
        assert_eq!(backend.document().as_deref(), Some("doc"));
        assert!(MemoryBackend::failing().save("x").is_err());
    }
}
