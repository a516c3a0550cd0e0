//! JSON file persistence with an optional backup copy.

use crate::storage::{Persistence, StoreData, StoreError};
use std::path::{Path, PathBuf};

/// Writes the whole store to `path` on every save. With backups enabled the
/// same snapshot goes to `<stem>_backup.json` first.
#[derive(Clone, Debug)]
pub struct JsonFile {
    path: PathBuf,
    backup: bool,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>, backup: bool) -> Self {
        Self {
            path: path.into(),
            backup,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `user_data.json` -> `user_data_backup.json`, next to the main file.
    pub fn backup_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "data".to_string());
        self.path.with_file_name(format!("{}_backup.json", stem))
    }

    /// Read the file; a missing file is an empty store.
    pub fn load(&self) -> Result<StoreData, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => {
                let data = serde_json::from_str(&text)?;
                log::info!("loaded store data from {}", self.path.display());
                Ok(data)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!(
                    "no data file at {}, starting fresh",
                    self.path.display()
                );
                Ok(StoreData::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Persistence for JsonFile {
    fn save(&self, data: &StoreData) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(data)?;
        if self.backup {
            if let Err(e) = std::fs::write(self.backup_path(), &json) {
                log::warn!("could not write backup {}: {}", self.backup_path().display(), e);
            }
        }
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}
