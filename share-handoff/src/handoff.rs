use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::Result;
use crate::share::{
    ChannelConsumer, EventIngestor, MaterializedPayload, NotificationChannel,
    PayloadMaterializer, PendingDeliverySlot, PendingShareResponse, ShareConsumer, ShareEvent,
    ShareReceivedPayload,
};
use crate::storage::ShareSettings;

/// One share hand-off session, built once per application run.
///
/// The host's event hooks call [`ShareHandoff::ingest`]; application logic
/// either attaches a [`ShareConsumer`] for push delivery or calls
/// [`ShareHandoff::request`] once it is ready. Both paths see a payload; the
/// pull hands each payload out exactly once.
pub struct ShareHandoff {
    settings: ShareSettings,
    materializer: Arc<PayloadMaterializer>,
    slot: Arc<PendingDeliverySlot>,
    channel: Arc<NotificationChannel>,
    ingestor: EventIngestor,
}

impl ShareHandoff {
    pub fn new(settings: ShareSettings) -> Result<Self> {
        let materializer = Arc::new(PayloadMaterializer::new(&settings)?);
        let slot = Arc::new(PendingDeliverySlot::new());
        let channel = Arc::new(NotificationChannel::new());
        let ingestor = EventIngestor::new(
            materializer.clone(),
            slot.clone(),
            channel.clone(),
            settings.discard_superseded,
        );

        info!(
            "Share hand-off ready, cache directory {:?}",
            materializer.cache_dir()
        );

        Ok(Self {
            settings,
            materializer,
            slot,
            channel,
            ingestor,
        })
    }

    pub fn settings(&self) -> &ShareSettings {
        &self.settings
    }

    pub fn cache_dir(&self) -> &Path {
        self.materializer.cache_dir()
    }

    /// Feed an inbound share event. Never fails; problems are logged.
    pub fn ingest(&self, event: &ShareEvent) {
        self.ingestor.ingest(event);
    }

    pub fn try_ingest(&self, event: &ShareEvent) -> Result<MaterializedPayload> {
        self.ingestor.try_ingest(event)
    }

    /// Pull the pending shared file, if any. A second call returns `None`.
    pub fn request(&self) -> Option<PathBuf> {
        let path = self.request_payload().map(|p| p.local_path);
        debug!("Pending share requested, returning {:?}", path);
        path
    }

    pub fn request_payload(&self) -> Option<MaterializedPayload> {
        self.slot.take()
    }

    pub fn request_response(&self) -> PendingShareResponse {
        PendingShareResponse::from(self.request_payload())
    }

    pub fn has_pending(&self) -> bool {
        self.slot.has_pending()
    }

    /// Drop the pending payload without delivering it. Returns whether one was pending.
    pub fn clear_pending(&self) -> bool {
        match self.slot.clear() {
            Some(payload) => {
                if self.settings.discard_superseded {
                    self.materializer.discard(&payload);
                }
                true
            }
            None => false,
        }
    }

    pub fn attach<C: ShareConsumer + 'static>(&self, consumer: &Arc<C>) {
        self.channel.attach(consumer);
    }

    /// Attach a [`ChannelConsumer`] sized by `notify_channel_capacity`.
    ///
    /// The channel only holds the consumer weakly: keep the returned `Arc`
    /// alive for as long as notifications should flow into the receiver.
    pub fn attach_channel(
        &self,
    ) -> (Arc<ChannelConsumer>, mpsc::Receiver<ShareReceivedPayload>) {
        let (consumer, rx) = ChannelConsumer::new(self.settings.notify_channel_capacity);
        self.channel.attach(&consumer);
        (consumer, rx)
    }

    pub fn detach(&self) {
        self.channel.detach();
    }

    pub fn is_consumer_attached(&self) -> bool {
        self.channel.is_attached()
    }

    /// Remove materialized files older than `stale_after_secs`.
    ///
    /// The pending payload's file survives whatever its age: the slot is held
    /// for the whole sweep, so a later `request()` still gets a readable path.
    pub fn sweep_stale(&self) -> Result<usize> {
        let max_age = Duration::from_secs(self.settings.stale_after_secs);
        self.slot.with_pending(|pending| {
            self.materializer
                .sweep_stale(max_age, pending.map(|p| p.local_path.as_path()))
        })
    }
}
