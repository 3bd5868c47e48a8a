//! Internal helpers shared across modules.

pub mod env;

pub use env::{get_env_with_prefix, ENV_PREFIX};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix timestamp in seconds.
#[inline]
pub(crate) fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
