use serde::{Deserialize, Serialize};

use crate::error::{AccessError, Result};
use crate::roles::UserId;
use crate::utils::get_env_with_prefix;

/// Main configuration for the access-control engine
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub access: AccessConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_json")]
    pub json: bool,
}

/// Settings consumed by the membership services and the workspace coordinator
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccessConfig {
    /// Users holding the platform-level super-role.
    #[serde(default)]
    pub platform_admins: Vec<UserId>,
    /// Maximum chat message length in characters.
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
    /// Also notify the user whose membership changed, even when they are in
    /// neither the before nor the after audience (e.g. a fresh invitation).
    #[serde(default = "default_notify_subject")]
    pub notify_subject: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: default_json(),
        }
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            platform_admins: Vec::new(),
            max_message_length: default_max_message_length(),
            notify_subject: default_notify_subject(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json() -> bool {
    false
}

fn default_max_message_length() -> usize {
    4000
}

fn default_notify_subject() -> bool {
    true
}

/// Parse a comma-separated list of user ids, skipping entries that are not integers.
fn parse_user_ids(raw: &str) -> Vec<UserId> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse() {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::warn!(value = s, "Ignoring invalid platform admin id");
                None
            }
        })
        .collect()
}

/// Builder for [`Config`]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    pub fn with_platform_admins(mut self, admins: impl IntoIterator<Item = UserId>) -> Self {
        self.config.access.platform_admins = admins.into_iter().collect();
        self
    }

    pub fn with_max_message_length(mut self, max: usize) -> Self {
        self.config.access.max_message_length = max;
        self
    }

    pub fn with_notify_subject(mut self, enabled: bool) -> Self {
        self.config.access.notify_subject = enabled;
        self
    }

    /// Load configuration from environment variables with the `COLLAB_` prefix
    pub fn from_env(mut self) -> Self {
        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        if let Some(json) = get_env_with_prefix("LOG_JSON") {
            self.config.logging.json = json.parse().unwrap_or(false);
        }
        if let Some(admins) = get_env_with_prefix("PLATFORM_ADMINS") {
            self.config.access.platform_admins = parse_user_ids(&admins);
        }
        if let Some(max) = get_env_with_prefix("MAX_MESSAGE_LENGTH") {
            if let Ok(max) = max.parse() {
                self.config.access.max_message_length = max;
            }
        }
        if let Some(notify) = get_env_with_prefix("NOTIFY_SUBJECT") {
            self.config.access.notify_subject = notify.parse().unwrap_or(true);
        }

        self
    }

    /// Build the configuration, validating all settings
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Validation`] for an unknown log level or a zero
    /// message length.
    pub fn build(self) -> Result<Config> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.config.logging.level.to_lowercase().as_str()) {
            return Err(AccessError::validation(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.config.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        if self.config.access.max_message_length == 0 {
            return Err(AccessError::validation(
                "Maximum message length must be greater than 0",
            ));
        }

        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
