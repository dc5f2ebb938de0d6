use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::materializer::MaterializedPayload;

/// Single-item mailbox with exactly-once, last-write-wins semantics.
///
/// Every operation is one short critical section; nothing here ever waits for
/// a payload to arrive.
#[derive(Debug, Default)]
pub struct PendingDeliverySlot {
    pending: Mutex<Option<MaterializedPayload>>,
}

impl PendingDeliverySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a payload, handing back whatever undelivered payload it replaced.
    pub fn put(&self, payload: MaterializedPayload) -> Option<MaterializedPayload> {
        let superseded = self.lock().replace(payload);
        if let Some(ref old) = superseded {
            debug!("Pending payload {:?} superseded", old.local_path);
        }
        superseded
    }

    /// Read and clear in one step. Two concurrent takes never see the same payload.
    pub fn take(&self) -> Option<MaterializedPayload> {
        self.lock().take()
    }

    pub fn has_pending(&self) -> bool {
        self.lock().is_some()
    }

    /// Drop the pending payload without delivering it.
    pub fn clear(&self) -> Option<MaterializedPayload> {
        let cleared = self.lock().take();
        if let Some(ref payload) = cleared {
            debug!("Pending payload {:?} cleared", payload.local_path);
        }
        cleared
    }

    /// Run `f` against the pending payload while holding the slot, so no put or
    /// take can interleave with it. `f` must not call back into the slot.
    pub fn with_pending<T>(&self, f: impl FnOnce(Option<&MaterializedPayload>) -> T) -> T {
        f(self.lock().as_ref())
    }

    // The guarded value is a plain Option, valid even if a holder panicked.
    fn lock(&self) -> MutexGuard<'_, Option<MaterializedPayload>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
