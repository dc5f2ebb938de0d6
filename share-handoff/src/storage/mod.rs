mod config;

pub use config::{init_cache_dir, load_settings, save_settings, ShareSettings};
