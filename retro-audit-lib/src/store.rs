//! Persistence of local ROM records and audited sets.
//!
//! The engine only talks to a [`RomSetStore`]; [`JsonRomSetStore`] is the
//! bundled implementation, keeping one JSON file per set next to its audit.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::audit::AuditedRomSet;
use crate::rom::LocalRomRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("JSON error in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Load and save operations for a ROM set.
pub trait RomSetStore {
    /// Load the local records. A set that was never saved loads as empty.
    fn load_roms(&self) -> Result<Vec<LocalRomRecord>, StoreError>;

    fn save_roms(&self, roms: &[LocalRomRecord]) -> Result<(), StoreError>;

    fn save_audit(&self, set: &AuditedRomSet) -> Result<(), StoreError>;
}

/// Stores `<dir>/<base>.json` (local records) and `<dir>/<base>_audit.json`.
#[derive(Debug, Clone)]
pub struct JsonRomSetStore {
    dir: PathBuf,
    base_name: String,
}

impl JsonRomSetStore {
    pub fn new(dir: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            base_name: base_name.into(),
        }
    }

    pub fn roms_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.base_name))
    }

    pub fn audit_path(&self) -> PathBuf {
        self.dir.join(format!("{}_audit.json", self.base_name))
    }
}

impl RomSetStore for JsonRomSetStore {
    fn load_roms(&self) -> Result<Vec<LocalRomRecord>, StoreError> {
        let path = self.roms_path();
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("ROM set file {} not found, starting empty", path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        serde_json::from_str(&contents).map_err(|e| StoreError::json(&path, e))
    }

    fn save_roms(&self, roms: &[LocalRomRecord]) -> Result<(), StoreError> {
        write_json_atomic(&self.roms_path(), roms)
    }

    fn save_audit(&self, set: &AuditedRomSet) -> Result<(), StoreError> {
        write_json_atomic(&self.audit_path(), set)
    }
}

/// Write through a temp file and rename, so readers never see a partial file.
fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }
    let serialized = serde_json::to_string_pretty(value).map_err(|e| StoreError::json(path, e))?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serialized).map_err(|e| StoreError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))?;
    log::debug!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::audit_without_catalog;

    #[test]
    fn test_missing_file_loads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonRomSetStore::new(tmp.path(), "snes");
        assert!(store.load_roms().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load_roms() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonRomSetStore::new(tmp.path().join("sets"), "snes");
        let roms = vec![
            LocalRomRecord::new("1", "Super Metroid (USA).sfc").with_checksum("d63ed5f8"),
            LocalRomRecord::new("2", "homebrew.sfc")
                .with_extra(serde_json::json!({"favourite": true})),
        ];
        store.save_roms(&roms).unwrap();
        assert_eq!(store.load_roms().unwrap(), roms);
        assert!(!tmp.path().join("sets").join("snes.json.tmp").exists());
    }

    #[test]
    fn test_save_audit_writes_separate_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonRomSetStore::new(tmp.path(), "snes");
        let set = audit_without_catalog(&[LocalRomRecord::new("1", "a.sfc")]);
        store.save_audit(&set).unwrap();

        let written = std::fs::read_to_string(tmp.path().join("snes_audit.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["summary"]["total"], 1);
        assert_eq!(value["roms"][0]["audit_status"], "none");
    }

    #[test]
    fn test_corrupt_file_is_json_error() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("snes.json"), "{not json").unwrap();
        let store = JsonRomSetStore::new(tmp.path(), "snes");
        assert!(matches!(store.load_roms(), Err(StoreError::Json { .. })));
    }
}
