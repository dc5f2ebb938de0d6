pub mod event;
pub mod ingest;
pub mod materializer;
pub mod models;
pub mod notify;
pub mod slot;

pub use event::{
    is_accepted_mime_type, FileSource, MemorySource, ShareAction, ShareEvent, ShareSource,
    SourceReference,
};
pub use ingest::EventIngestor;
pub use materializer::{MaterializedPayload, PayloadMaterializer};
pub use models::{PendingShareResponse, ShareReceivedPayload};
pub use notify::{ChannelConsumer, NotificationChannel, ShareConsumer};
pub use slot::PendingDeliverySlot;
