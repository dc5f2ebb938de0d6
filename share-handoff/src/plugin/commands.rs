use tauri::{command, AppHandle, Runtime};

use super::ShareHandoffExt;
use crate::error::Result;
use crate::share::PendingShareResponse;

/// Get and consume the pending shared file.
///
/// Called by the frontend once it is initialized, to pick up a share that
/// arrived before the webview was ready. Subsequent calls report nothing
/// pending until the next share.
#[command]
pub(crate) async fn get_pending_share<R: Runtime>(
    app: AppHandle<R>,
) -> Result<PendingShareResponse> {
    Ok(app.share_handoff().request_response())
}

/// Check for a pending shared file without consuming it.
#[command]
pub(crate) async fn has_pending_share<R: Runtime>(app: AppHandle<R>) -> Result<bool> {
    Ok(app.share_handoff().has_pending())
}

/// Discard the pending shared file without processing it.
#[command]
pub(crate) async fn clear_pending_share<R: Runtime>(app: AppHandle<R>) -> Result<bool> {
    Ok(app.share_handoff().clear_pending())
}
