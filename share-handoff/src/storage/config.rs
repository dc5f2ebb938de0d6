use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, ShareError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareSettings {
    /// Directory materialized payloads are written into.
    pub cache_dir: PathBuf,
    pub file_prefix: String,
    pub file_extension: String,
    /// Delete the file of a payload that was overwritten or cleared before delivery.
    pub discard_superseded: bool,
    /// Age after which `sweep_stale` removes a materialized file.
    pub stale_after_secs: u64,
    /// Buffer size of the receiver handed out by `ShareHandoff::attach_channel`.
    pub notify_channel_capacity: usize,
}

impl Default for ShareSettings {
    fn default() -> Self {
        Self {
            cache_dir: get_default_cache_dir(),
            file_prefix: "shared_vcf_".to_string(),
            file_extension: "vcf".to_string(),
            discard_superseded: false,
            stale_after_secs: 60 * 60 * 24,
            notify_channel_capacity: 16,
        }
    }
}

impl ShareSettings {
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.file_extension.is_empty() || self.file_extension.contains(['/', '\\', '.']) {
            return Err(ShareError::Config(format!(
                "Invalid file extension: {:?}",
                self.file_extension
            )));
        }
        if self.file_prefix.contains(['/', '\\']) {
            return Err(ShareError::Config(format!(
                "Invalid file prefix: {:?}",
                self.file_prefix
            )));
        }
        if self.notify_channel_capacity == 0 {
            return Err(ShareError::Config(
                "notify_channel_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn get_default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("share-handoff")
}

/// Create the cache directory if needed and return its absolute form.
pub fn init_cache_dir(settings: &ShareSettings) -> Result<PathBuf> {
    std::fs::create_dir_all(&settings.cache_dir)?;
    let dir = std::fs::canonicalize(&settings.cache_dir)?;
    Ok(dir)
}

pub fn load_settings(path: &Path) -> Result<ShareSettings> {
    if !path.exists() {
        return Ok(ShareSettings::default());
    }

    let content = std::fs::read_to_string(path)?;
    let settings: ShareSettings = serde_json::from_str(&content)?;
    settings.validate()?;
    Ok(settings)
}

pub fn save_settings(path: &Path, settings: &ShareSettings) -> Result<()> {
    let content = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, content)?;
    Ok(())
}
