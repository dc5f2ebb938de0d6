#[cfg(feature = "tauri")]
const COMMANDS: &[&str] = &["get_pending_share", "has_pending_share", "clear_pending_share"];

fn main() {
    // Core-only builds have no webview and nothing to generate.
    #[cfg(feature = "tauri")]
    tauri_plugin::Builder::new(COMMANDS).build();
}
