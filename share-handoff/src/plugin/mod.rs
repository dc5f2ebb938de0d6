//! Tauri plugin exposing the hand-off to a webview frontend.
//!
//! - `get_pending_share` pulls the pending file (consuming it)
//! - `has_pending_share` / `clear_pending_share` peek and discard
//! - a `share-received` event is emitted for every materialized share
//!
//! Native share hooks reach the session through [`ShareHandoffExt`].

use std::sync::Arc;

use tauri::{
    plugin::{Builder, TauriPlugin},
    AppHandle, Emitter, Manager, Runtime,
};
use tracing::{info, warn};

use crate::error::{Result, ShareError};
use crate::handoff::ShareHandoff;
use crate::share::{ShareConsumer, ShareReceivedPayload};
use crate::storage::ShareSettings;

mod commands;

/// Event name carrying a [`ShareReceivedPayload`].
pub const SHARE_RECEIVED_EVENT: &str = "share-received";

/// Pushes share notifications to the frontend as Tauri events.
struct EventEmitter<R: Runtime> {
    app: AppHandle<R>,
}

impl<R: Runtime> ShareConsumer for EventEmitter<R> {
    fn on_payload_received(&self, payload: &ShareReceivedPayload) -> Result<()> {
        self.app
            .emit(SHARE_RECEIVED_EVENT, payload)
            .map_err(|e| ShareError::NotifyFailed(e.to_string()))
    }
}

struct ShareHandoffState<R: Runtime> {
    handoff: ShareHandoff,
    // Keeps the channel's weak reference alive for the app's lifetime.
    _emitter: Arc<EventEmitter<R>>,
}

/// Extensions to [`tauri::App`], [`tauri::AppHandle`] and [`tauri::Window`] to reach the hand-off session.
pub trait ShareHandoffExt<R: Runtime> {
    fn share_handoff(&self) -> &ShareHandoff;
}

impl<R: Runtime, T: Manager<R>> ShareHandoffExt<R> for T {
    fn share_handoff(&self) -> &ShareHandoff {
        &self.state::<ShareHandoffState<R>>().inner().handoff
    }
}

/// Initializes the share-handoff plugin.
pub fn init<R: Runtime>(settings: ShareSettings) -> TauriPlugin<R> {
    Builder::new("share-handoff")
        .invoke_handler(tauri::generate_handler![
            commands::get_pending_share,
            commands::has_pending_share,
            commands::clear_pending_share,
        ])
        .setup(move |app, _api| {
            let handoff = ShareHandoff::new(settings)?;

            match handoff.sweep_stale() {
                Ok(0) => {}
                Ok(n) => info!("share-handoff: removed {} stale shared file(s)", n),
                Err(e) => warn!("share-handoff: stale sweep failed: {}", e),
            }

            let emitter = Arc::new(EventEmitter { app: app.clone() });
            handoff.attach(&emitter);

            app.manage(ShareHandoffState {
                handoff,
                _emitter: emitter,
            });
            Ok(())
        })
        .build()
}
