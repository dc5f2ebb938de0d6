//! Copies shared byte streams into files owned by this process.
//!
//! Every payload lands in the configured cache directory under a fresh name
//! (`<prefix><millis>_<uuid>.<extension>`). A failed copy never leaves a
//! partial file behind.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::event::ShareSource;
use crate::error::{Result, ShareError};
use crate::storage::{init_cache_dir, ShareSettings};

/// A shared file copied into the local cache, waiting to be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterializedPayload {
    pub local_path: PathBuf,
    pub created_at: DateTime<Utc>,
}

impl MaterializedPayload {
    pub fn created_at_millis(&self) -> i64 {
        self.created_at.timestamp_millis()
    }
}

pub struct PayloadMaterializer {
    cache_dir: PathBuf,
    file_prefix: String,
    file_extension: String,
}

impl PayloadMaterializer {
    pub fn new(settings: &ShareSettings) -> Result<Self> {
        settings.validate()?;
        let cache_dir = init_cache_dir(settings)?;
        debug!("Materializing shared payloads into {:?}", cache_dir);

        Ok(Self {
            cache_dir,
            file_prefix: settings.file_prefix.clone(),
            file_extension: settings.file_extension.clone(),
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Copy the full source stream into a new local file.
    pub fn materialize(&self, source: &dyn ShareSource) -> Result<MaterializedPayload> {
        let mut input = source.open().map_err(|e| {
            ShareError::SourceUnreadable(format!("{}: {}", source.describe(), e))
        })?;

        let created_at = Utc::now();
        let local_path = self.allocate_path(&created_at);

        let mut output = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&local_path)
            .map_err(|e| {
                ShareError::CopyFailed(format!("cannot create {:?}: {}", local_path, e))
            })?;

        match copy_stream(&mut *input, &mut output) {
            Ok(bytes) => {
                debug!(
                    "Copied {} bytes from {} to {:?}",
                    bytes,
                    source.describe(),
                    local_path
                );
                Ok(MaterializedPayload {
                    local_path,
                    created_at,
                })
            }
            Err(e) => {
                drop(output);
                remove_file_logged(&local_path);
                Err(ShareError::CopyFailed(format!(
                    "{} -> {:?}: {}",
                    source.describe(),
                    local_path,
                    e
                )))
            }
        }
    }

    /// Delete the file behind a payload that will never be delivered.
    pub fn discard(&self, payload: &MaterializedPayload) {
        if payload.local_path.starts_with(&self.cache_dir) {
            remove_file_logged(&payload.local_path);
        } else {
            warn!(
                "Refusing to discard {:?}: outside cache directory",
                payload.local_path
            );
        }
    }

    /// Remove materialized files older than `max_age`; returns how many went.
    ///
    /// Only files carrying this materializer's prefix and extension are
    /// considered, so unrelated cache contents are left alone. `keep` is never
    /// removed whatever its age; pass the still-undelivered payload here.
    pub fn sweep_stale(&self, max_age: Duration, keep: Option<&Path>) -> Result<usize> {
        let now = SystemTime::now();
        let mut removed = 0;

        for entry in std::fs::read_dir(&self.cache_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !self.is_materialized_file(&path) || keep == Some(path.as_path()) {
                continue;
            }

            let modified = match entry.metadata().and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    warn!("Cannot stat {:?}: {}", path, e);
                    continue;
                }
            };

            let age = now.duration_since(modified).unwrap_or_default();
            if age >= max_age {
                match std::fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) => warn!("Failed to remove stale payload {:?}: {}", path, e),
                }
            }
        }

        if removed > 0 {
            debug!("Swept {} stale payload(s) from {:?}", removed, self.cache_dir);
        }
        Ok(removed)
    }

    fn allocate_path(&self, created_at: &DateTime<Utc>) -> PathBuf {
        let name = format!(
            "{}{}_{}.{}",
            self.file_prefix,
            created_at.timestamp_millis(),
            Uuid::new_v4().simple(),
            self.file_extension
        );
        self.cache_dir.join(name)
    }

    fn is_materialized_file(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        path.is_file()
            && name.starts_with(&self.file_prefix)
            && path.extension().and_then(|e| e.to_str()) == Some(self.file_extension.as_str())
    }
}

fn copy_stream(input: &mut dyn Read, output: &mut File) -> std::io::Result<u64> {
    let bytes = std::io::copy(input, output)?;
    output.flush()?;
    output.sync_all()?;
    Ok(bytes)
}

fn remove_file_logged(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed {:?}", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {:?}: {}", path, e),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::share::event::{FileSource, MemorySource};

    /// Yields `good` bytes, then fails.
    pub(crate) struct BrokenSource {
        pub good: usize,
    }

    struct BrokenReader {
        remaining: usize,
    }

    impl Read for BrokenReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.remaining == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "provider went away",
                ));
            }
            let n = buf.len().min(self.remaining);
            buf[..n].fill(b'x');
            self.remaining -= n;
            Ok(n)
        }
    }

    impl ShareSource for BrokenSource {
        fn open(&self) -> std::io::Result<Box<dyn Read + Send>> {
            Ok(Box::new(BrokenReader {
                remaining: self.good,
            }))
        }

        fn describe(&self) -> String {
            "broken://source".to_string()
        }
    }

    fn materializer(dir: &Path) -> PayloadMaterializer {
        PayloadMaterializer::new(&ShareSettings::default().with_cache_dir(dir)).unwrap()
    }

    fn files_in(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_materialize_copies_bytes_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let m = materializer(dir.path());
        let bytes: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();

        let payload = m
            .materialize(&MemorySource::new("content://contacts/1", bytes.clone()))
            .unwrap();

        assert!(payload.local_path.is_absolute());
        assert_eq!(std::fs::read(&payload.local_path).unwrap(), bytes);
        let name = payload.local_path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("shared_vcf_"));
        assert!(name.ends_with(".vcf"));
    }

    #[test]
    fn test_materialize_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let m = materializer(dir.path());
        let source = MemorySource::new("content://x", b"same".to_vec());

        let a = m.materialize(&source).unwrap();
        let b = m.materialize(&source).unwrap();

        assert_ne!(a.local_path, b.local_path);
        assert_eq!(files_in(m.cache_dir()), 2);
    }

    #[test]
    fn test_unreadable_source() {
        let dir = tempfile::tempdir().unwrap();
        let m = materializer(dir.path());

        let err = m
            .materialize(&FileSource::new(dir.path().join("missing.vcf")))
            .unwrap_err();

        assert!(matches!(err, ShareError::SourceUnreadable(_)));
        assert_eq!(files_in(m.cache_dir()), 0);
    }

    #[test]
    fn test_broken_stream_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let m = materializer(dir.path());

        let err = m.materialize(&BrokenSource { good: 3000 }).unwrap_err();

        assert!(matches!(err, ShareError::CopyFailed(_)));
        assert_eq!(files_in(m.cache_dir()), 0);
    }

    #[test]
    fn test_discard_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let m = materializer(dir.path());
        let payload = m
            .materialize(&MemorySource::new("content://x", b"abc".to_vec()))
            .unwrap();

        m.discard(&payload);
        assert!(!payload.local_path.exists());
        // Second discard of a missing file is quiet.
        m.discard(&payload);
    }

    #[test]
    fn test_sweep_only_touches_own_files() {
        let dir = tempfile::tempdir().unwrap();
        let m = materializer(dir.path());
        m.materialize(&MemorySource::new("content://x", b"1".to_vec()))
            .unwrap();
        m.materialize(&MemorySource::new("content://y", b"2".to_vec()))
            .unwrap();
        let unrelated = m.cache_dir().join("notes.txt");
        std::fs::write(&unrelated, "keep me").unwrap();
        let other_ext = m.cache_dir().join("shared_vcf_1.json");
        std::fs::write(&other_ext, "{}").unwrap();

        assert_eq!(m.sweep_stale(Duration::from_secs(3600), None).unwrap(), 0);
        assert_eq!(m.sweep_stale(Duration::ZERO, None).unwrap(), 2);

        assert!(unrelated.exists());
        assert!(other_ext.exists());
        assert_eq!(files_in(m.cache_dir()), 2);
    }

    #[test]
    fn test_sweep_skips_kept_file() {
        let dir = tempfile::tempdir().unwrap();
        let m = materializer(dir.path());
        let delivered = m
            .materialize(&MemorySource::new("content://x", b"1".to_vec()))
            .unwrap();
        let pending = m
            .materialize(&MemorySource::new("content://y", b"2".to_vec()))
            .unwrap();

        let removed = m
            .sweep_stale(Duration::ZERO, Some(&pending.local_path))
            .unwrap();

        assert_eq!(removed, 1);
        assert!(!delivered.local_path.exists());
        assert_eq!(std::fs::read(&pending.local_path).unwrap(), b"2");
    }
}
