//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize logging with a fallback level used when `RUST_LOG` is unset
///
/// Returns `false` if a logger was already installed (tests and embedding
/// hosts may have set one up first).
pub fn init_with_level(default_level: &str) -> bool {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}
