//! Best-effort push of freshly materialized payloads to an attached consumer.
//!
//! The channel only ever holds a weak reference: a consumer whose execution
//! context went away without detaching simply stops being notified.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use super::materializer::MaterializedPayload;
use super::models::ShareReceivedPayload;
use crate::error::{Result, ShareError};

/// Application logic that wants to hear about shares as they arrive.
pub trait ShareConsumer: Send + Sync {
    fn on_payload_received(&self, payload: &ShareReceivedPayload) -> Result<()>;
}

#[derive(Default)]
pub struct NotificationChannel {
    consumer: Mutex<Option<Weak<dyn ShareConsumer>>>,
}

impl NotificationChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a consumer, replacing any previous one.
    pub fn attach<C: ShareConsumer + 'static>(&self, consumer: &Arc<C>) {
        let weak: Weak<C> = Arc::downgrade(consumer);
        let weak: Weak<dyn ShareConsumer> = weak;
        if self.lock().replace(weak).is_some() {
            debug!("Replaced previously attached share consumer");
        } else {
            debug!("Share consumer attached");
        }
    }

    pub fn detach(&self) {
        if self.lock().take().is_some() {
            debug!("Share consumer detached");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    /// Tell the attached consumer about `payload`. Returns whether it accepted it.
    ///
    /// Not queued: with no live consumer this is a no-op and the payload stays
    /// reachable through the slot only.
    pub fn notify(&self, payload: &MaterializedPayload) -> bool {
        let consumer = {
            let mut attached = self.lock();
            let upgraded = attached.as_ref().map(|weak| weak.upgrade());
            match upgraded {
                Some(Some(consumer)) => consumer,
                Some(None) => {
                    debug!("Attached share consumer is gone, dropping it");
                    *attached = None;
                    return false;
                }
                None => {
                    debug!("No share consumer attached, payload waits for a pull");
                    return false;
                }
            }
        };

        let message = ShareReceivedPayload::from(payload);
        let outcome = catch_unwind(AssertUnwindSafe(|| consumer.on_payload_received(&message)));

        match outcome {
            Ok(Ok(())) => {
                debug!("Notified consumer about {}", message.path);
                true
            }
            Ok(Err(e)) => {
                warn!("Failed to notify share consumer: {}", e);
                false
            }
            Err(_) => {
                error!("Share consumer panicked while handling {}", message.path);
                false
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Weak<dyn ShareConsumer>>> {
        self.consumer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Forwards notifications into a bounded channel for an async task to drain.
pub struct ChannelConsumer {
    tx: mpsc::Sender<ShareReceivedPayload>,
}

impl ChannelConsumer {
    pub fn new(capacity: usize) -> (Arc<Self>, mpsc::Receiver<ShareReceivedPayload>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Arc::new(Self { tx }), rx)
    }
}

impl ShareConsumer for ChannelConsumer {
    fn on_payload_received(&self, payload: &ShareReceivedPayload) -> Result<()> {
        self.tx.try_send(payload.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                ShareError::NotifyFailed("consumer channel full".into())
            }
            mpsc::error::TrySendError::Closed(_) => {
                ShareError::NotifyFailed("consumer channel closed".into())
            }
        })
    }
}
