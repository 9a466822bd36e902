// =============================================================================
// Activation flag — persisted on/off switch for scheduled pushes
// =============================================================================
//
// Stored as `{"active": true}`. Written only by the /start and /stop commands,
// read by the scheduler before each cycle. Writes go through tmp + rename; a
// crash mid-write leaves the previous file intact. A missing or unreadable file means
// inactive.
// =============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Default, Serialize, Deserialize)]
struct ActivationFile {
    #[serde(default)]
    active: bool,
}

#[derive(Debug)]
pub struct ActivationStore {
    path: PathBuf,
    active: RwLock<bool>,
}

impl ActivationStore {
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();

        let active = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<ActivationFile>(&content) {
                Ok(file) => file.active,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "activation file unreadable, starting inactive"
                    );
                    false
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to read activation file, starting inactive"
                );
                false
            }
        };

        info!(path = %path.display(), active, "activation state loaded");
        Self {
            path,
            active: RwLock::new(active),
        }
    }

    pub fn is_active(&self) -> bool {
        *self.active.read()
    }

    /// Persist and apply a new state. The in-memory flag only changes once the
    /// file is on disk.
    pub fn set(&self, active: bool) -> Result<()> {
        let content = serde_json::to_string(&ActivationFile { active })
            .context("failed to serialise activation state")?;

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content)
            .with_context(|| format!("failed to write {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("failed to rename {} into place", tmp_path.display()))?;

        *self.active.write() = active;
        info!(active, "activation state saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_inactive() {
        let dir = tempfile::tempdir().unwrap();
        let store = ActivationStore::load(dir.path().join("bot_state.json"));
        assert!(!store.is_active());
    }

    #[test]
    fn set_persists_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot_state.json");

        let store = ActivationStore::load(&path);
        store.set(true).unwrap();
        assert!(store.is_active());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{"active":true}"#);
        assert!(!dir.path().join("bot_state.json.tmp").exists());

        let reloaded = ActivationStore::load(&path);
        assert!(reloaded.is_active());

        reloaded.set(false).unwrap();
        assert!(!ActivationStore::load(&path).is_active());
    }

    #[test]
    fn corrupt_file_is_inactive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot_state.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(!ActivationStore::load(&path).is_active());
    }

    #[test]
    fn failed_write_keeps_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = ActivationStore::load(dir.path().join("missing-dir").join("bot_state.json"));
        assert!(store.set(true).is_err());
        assert!(!store.is_active());
    }
}
