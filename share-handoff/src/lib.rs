//! Exactly-once hand-off of files shared into an application by its host.
//!
//! The host platform turns its "share" events into [`ShareEvent`]s and feeds
//! them to a [`ShareHandoff`]. The payload is copied into a local cache file,
//! parked in a single pending slot and announced to an attached
//! [`ShareConsumer`], if any. Application logic pulls it with
//! [`ShareHandoff::request`], which hands each payload out once.

mod error;
pub mod handoff;
pub mod logging;
#[cfg(feature = "tauri")]
pub mod plugin;
pub mod share;
pub mod storage;

pub use error::{Result, ShareError};
pub use handoff::ShareHandoff;
pub use logging::init_tracing;
pub use share::{
    ChannelConsumer, FileSource, MaterializedPayload, MemorySource, PendingShareResponse,
    ShareAction, ShareConsumer, ShareEvent, ShareReceivedPayload, ShareSource, SourceReference,
};
pub use storage::{load_settings, save_settings, ShareSettings};
