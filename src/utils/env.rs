/// Prefix applied to every environment variable the crate reads.
pub const ENV_PREFIX: &str = "COLLAB_";

/// Get environment variable with the `COLLAB_` prefix, falling back to the unprefixed name
///
/// # Examples
///
/// ```rust
/// use collab_access::utils::get_env_with_prefix;
///
/// // Checks COLLAB_LOG_LEVEL first, then LOG_LEVEL
/// let level = get_env_with_prefix("LOG_LEVEL");
/// ```
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{key}"))
        .or_else(|_| std::env::var(key))
        .ok()
}
