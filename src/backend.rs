use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::SettingsError;
use crate::ini::IniDocument;

/// Handle on one INI-style settings file, grouped by namespace.
///
/// The handle is a thin path wrapper: every read re-parses the file and every
/// mutation re-parses, applies the change, and atomically rewrites (temp file
/// plus rename), so a store always observes the most recently committed
/// state. A missing file reads as empty and is created on first write.
#[derive(Debug, Clone)]
pub struct IniStore {
    path: PathBuf,
}

impl IniStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<IniDocument, SettingsError> {
        if !self.path.is_file() {
            debug!("settings file {:?} does not exist, reading as empty", self.path);
            return Ok(IniDocument::default());
        }
        let text = fs::read_to_string(&self.path)
            .map_err(|e| SettingsError::Storage(e.to_string()))?;
        IniDocument::parse(&text)
    }

    fn store(&self, doc: &IniDocument) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| SettingsError::Storage(e.to_string()))?;
        }
        let file_name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                SettingsError::Storage(format!("invalid settings path {:?}", self.path))
            })?;
        let tmp = self.path.with_file_name(format!(".{}.tmp", file_name));
        fs::write(&tmp, doc.serialize()).map_err(|e| SettingsError::Storage(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| SettingsError::Storage(e.to_string()))
    }

    pub fn get(&self, group: &str, key: &str) -> Result<Option<Vec<u8>>, SettingsError> {
        Ok(self.load()?.get(group, key).cloned())
    }

    pub fn set(&self, group: &str, key: &str, value: &[u8]) -> Result<(), SettingsError> {
        let mut doc = self.load()?;
        doc.set(group, key, value);
        self.store(&doc)
    }

    /// Remove a key. Removing an absent key is a no-op, but the file is
    /// still rewritten only when it already exists.
    pub fn remove(&self, group: &str, key: &str) -> Result<(), SettingsError> {
        if !self.path.is_file() {
            return Ok(());
        }
        let mut doc = self.load()?;
        doc.remove(group, key);
        self.store(&doc)
    }

    /// Drop every key under a group.
    pub fn remove_group(&self, group: &str) -> Result<(), SettingsError> {
        if !self.path.is_file() {
            return Ok(());
        }
        let mut doc = self.load()?;
        doc.remove_group(group);
        self.store(&doc)
    }

    /// Keys in one group, in the backend's own (sorted) order.
    pub fn keys(&self, group: &str) -> Result<Vec<String>, SettingsError> {
        Ok(self.load()?.keys(group))
    }

    /// All group names with at least one key — the namespace listing.
    pub fn groups(&self) -> Result<Vec<String>, SettingsError> {
        Ok(self.load()?.groups())
    }
}
