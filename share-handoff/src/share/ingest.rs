use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::event::{is_accepted_mime_type, ShareEvent};
use super::materializer::{MaterializedPayload, PayloadMaterializer};
use super::notify::NotificationChannel;
use super::slot::PendingDeliverySlot;
use crate::error::{Result, ShareError};

/// Turns inbound share events into pending payloads.
///
/// Ingestion is fire-and-forget for the host: [`EventIngestor::ingest`] never
/// reports failure, it only logs. Equivalent events may be ingested more than
/// once (the host can deliver its launch event through two lifecycle hooks);
/// each call copies again and overwrites the slot.
pub struct EventIngestor {
    materializer: Arc<PayloadMaterializer>,
    slot: Arc<PendingDeliverySlot>,
    channel: Arc<NotificationChannel>,
    discard_superseded: bool,
}

impl EventIngestor {
    pub fn new(
        materializer: Arc<PayloadMaterializer>,
        slot: Arc<PendingDeliverySlot>,
        channel: Arc<NotificationChannel>,
        discard_superseded: bool,
    ) -> Self {
        Self {
            materializer,
            slot,
            channel,
            discard_superseded,
        }
    }

    pub fn ingest(&self, event: &ShareEvent) {
        match self.try_ingest(event) {
            Ok(payload) => {
                info!("Shared file ready at {:?}", payload.local_path);
            }
            Err(ShareError::UnsupportedEvent(reason)) => {
                warn!("Ignoring share event: {}", reason);
            }
            Err(ShareError::MissingSource) => {
                debug!("Share event without a source reference, ignoring");
            }
            Err(e) => {
                error!("Failed to ingest shared file: {}", e);
            }
        }
    }

    /// Same pipeline as [`EventIngestor::ingest`], reporting why an event was dropped.
    pub fn try_ingest(&self, event: &ShareEvent) -> Result<MaterializedPayload> {
        debug!(
            "Share event received: action={}, mime_type={:?}",
            event.action, event.mime_type
        );

        if !event.is_send() {
            return Err(ShareError::UnsupportedEvent(format!(
                "unknown action {}",
                event.action
            )));
        }

        if !is_accepted_mime_type(event.mime_type.as_deref()) {
            return Err(ShareError::UnsupportedEvent(format!(
                "MIME type not supported: {}",
                event.mime_type.as_deref().unwrap_or_default()
            )));
        }

        let source = event.source.as_ref().ok_or(ShareError::MissingSource)?;
        let payload = self.materializer.materialize(&**source)?;

        if let Some(superseded) = self.slot.put(payload.clone()) {
            if self.discard_superseded {
                self.materializer.discard(&superseded);
            }
        }

        self.channel.notify(&payload);
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::share::event::{FileSource, MemorySource, ShareAction};
    use crate::share::materializer::tests::BrokenSource;
    use crate::share::models::ShareReceivedPayload;
    use crate::share::notify::ShareConsumer;
    use crate::storage::ShareSettings;
    use std::path::Path;
    use std::sync::Mutex;

    struct Fixture {
        _dir: tempfile::TempDir,
        slot: Arc<PendingDeliverySlot>,
        channel: Arc<NotificationChannel>,
        ingestor: EventIngestor,
        cache_dir: std::path::PathBuf,
    }

    fn fixture(discard_superseded: bool) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let settings = ShareSettings::default().with_cache_dir(dir.path().join("cache"));
        let materializer = Arc::new(PayloadMaterializer::new(&settings).unwrap());
        let cache_dir = materializer.cache_dir().to_path_buf();
        let slot = Arc::new(PendingDeliverySlot::new());
        let channel = Arc::new(NotificationChannel::new());
        let ingestor =
            EventIngestor::new(materializer, slot.clone(), channel.clone(), discard_superseded);
        Fixture {
            _dir: dir,
            slot,
            channel,
            ingestor,
            cache_dir,
        }
    }

    fn files_in(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    fn vcard(bytes: usize) -> Vec<u8> {
        b"BEGIN:VCARD\n".iter().copied().cycle().take(bytes).collect()
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl ShareConsumer for Recorder {
        fn on_payload_received(&self, payload: &ShareReceivedPayload) -> crate::Result<()> {
            self.seen.lock().unwrap().push(payload.path.clone());
            Ok(())
        }
    }

    #[test]
    fn test_vcard_share_roundtrip() {
        let f = fixture(false);
        let bytes = vcard(5000);
        let event = ShareEvent::send(
            Some("text/vcard"),
            MemorySource::new("content://contacts/7", bytes.clone()),
        );

        f.ingestor.ingest(&event);

        let payload = f.slot.take().unwrap();
        let copied = std::fs::read(&payload.local_path).unwrap();
        assert_eq!(copied.len(), 5000);
        assert_eq!(copied, bytes);
        assert!(f.slot.take().is_none());
    }

    #[test]
    fn test_accepted_mime_types_reach_slot() {
        for mime in [Some("text/vcard"), Some("application/octet-stream"), Some("*/*"), None] {
            let f = fixture(false);
            f.ingestor
                .ingest(&ShareEvent::send(mime, MemorySource::new("content://x", vec![1, 2, 3])));
            assert!(f.slot.has_pending(), "{:?} should be accepted", mime);
        }
    }

    #[test]
    fn test_rejected_mime_types_leave_slot_untouched() {
        for mime in ["application/json", "image/png"] {
            let f = fixture(false);
            let event = ShareEvent::send(Some(mime), MemorySource::new("content://x", vec![1]));

            assert!(matches!(
                f.ingestor.try_ingest(&event),
                Err(ShareError::UnsupportedEvent(_))
            ));
            f.ingestor.ingest(&event);
            assert!(!f.slot.has_pending());
            assert_eq!(files_in(&f.cache_dir), 0);
        }
    }

    #[test]
    fn test_non_send_action_ignored() {
        let f = fixture(false);
        let mut event = ShareEvent::send(Some("text/vcard"), MemorySource::new("content://x", vec![1]));
        event.action = ShareAction::Other("view".into());

        f.ingestor.ingest(&event);
        assert!(!f.slot.has_pending());
    }

    #[test]
    fn test_missing_source_ignored() {
        let f = fixture(false);
        let event = ShareEvent {
            action: ShareAction::Send,
            mime_type: Some("text/vcard".into()),
            source: None,
        };

        assert!(matches!(
            f.ingestor.try_ingest(&event),
            Err(ShareError::MissingSource)
        ));
        assert!(!f.slot.has_pending());
    }

    #[test]
    fn test_failures_leave_slot_and_cache_unchanged() {
        let f = fixture(false);
        f.ingestor.ingest(&ShareEvent::send(
            Some("text/vcard"),
            MemorySource::new("content://first", vcard(10)),
        ));
        let before = f.slot.take().unwrap();
        f.slot.put(before.clone());

        f.ingestor
            .ingest(&ShareEvent::send(Some("text/vcard"), BrokenSource { good: 4096 }));
        f.ingestor.ingest(&ShareEvent::send(
            Some("text/vcard"),
            FileSource::new("/no/such/contact.vcf"),
        ));

        assert_eq!(f.slot.take(), Some(before));
        assert_eq!(files_in(&f.cache_dir), 1);
    }

    #[test]
    fn test_duplicate_ingest_is_tolerated() {
        let f = fixture(false);
        let event = ShareEvent::send(Some("text/vcard"), MemorySource::new("content://x", vcard(64)));

        f.ingestor.ingest(&event);
        f.ingestor.ingest(&event.clone());

        let payload = f.slot.take().unwrap();
        assert_eq!(std::fs::read(&payload.local_path).unwrap(), vcard(64));
        assert!(f.slot.take().is_none());
        // Redundant copy, nothing deleted.
        assert_eq!(files_in(&f.cache_dir), 2);
    }

    #[test]
    fn test_duplicate_ingest_discards_superseded_copy() {
        let f = fixture(true);
        let event = ShareEvent::send(Some("text/vcard"), MemorySource::new("content://x", vcard(64)));

        let first = f.ingestor.try_ingest(&event).unwrap();
        let second = f.ingestor.try_ingest(&event).unwrap();

        assert!(!first.local_path.exists());
        assert_eq!(f.slot.take(), Some(second));
        assert_eq!(files_in(&f.cache_dir), 1);
    }

    #[test]
    fn test_last_write_wins_across_ingests() {
        let f = fixture(false);
        f.ingestor.ingest(&ShareEvent::send(None, MemorySource::new("content://a", b"A".to_vec())));
        f.ingestor.ingest(&ShareEvent::send(None, MemorySource::new("content://b", b"B".to_vec())));

        let payload = f.slot.take().unwrap();
        assert_eq!(std::fs::read(&payload.local_path).unwrap(), b"B");
        assert!(f.slot.take().is_none());
    }

    #[test]
    fn test_push_and_pull_both_deliver() {
        let f = fixture(false);
        let recorder = Arc::new(Recorder::default());
        f.channel.attach(&recorder);

        f.ingestor.ingest(&ShareEvent::send(
            Some("text/vcard"),
            MemorySource::new("content://x", vcard(32)),
        ));

        let pushed = recorder.seen.lock().unwrap().clone();
        let pulled = f.slot.take().unwrap();
        assert_eq!(pushed, vec![pulled.local_path.to_string_lossy().into_owned()]);
    }
}
