use brandhub_notifications::NotificationSettings;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub brand: BrandConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub notifications: NotificationSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(scope) = &self.brand.scope_id
            && scope.trim().is_empty()
        {
            return Err("brand.scope_id must not be blank when set".into());
        }

        let api = Url::parse(&self.api.base_url)
            .map_err(|e| format!("api.base_url is not a valid URL: {e}"))?;
        if !matches!(api.scheme(), "http" | "https") {
            return Err("api.base_url must use http or https".into());
        }
        if self.api.request_timeout_ms == Some(0) {
            return Err("api.request_timeout_ms must be > 0 when set".into());
        }

        let channel = Url::parse(&self.channel.url)
            .map_err(|e| format!("channel.url is not a valid URL: {e}"))?;
        if !matches!(channel.scheme(), "ws" | "wss") {
            return Err("channel.url must use ws or wss".into());
        }

        if self.audio.enabled && self.audio.command.trim().is_empty() {
            return Err("audio.enabled=true requires audio.command".into());
        }

        self.notifications.validate()?;

        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }
}

/// The signed-in brand. Without a scope the agent has nothing to follow.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BrandConfig {
    #[serde(default)]
    pub scope_id: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    /// Unset means no timeout: a hung call stays pending.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}
fn default_api_base_url() -> String {
    "http://localhost:3000/api".into()
}
impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            request_timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default = "default_channel_url")]
    pub url: String,
}
fn default_channel_url() -> String {
    "ws://localhost:3000/ws".into()
}
impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: default_channel_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_audio_command")]
    pub command: String,
    /// `{kind}` is replaced by the notification kind
    #[serde(default)]
    pub args: Vec<String>,
}
fn default_audio_command() -> String {
    "paplay".into()
}
impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: default_audio_command(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or("brandhub.toml"));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., BRANDHUB__BRAND__SCOPE_ID=brandA
        builder = builder.add_source(
            Environment::with_prefix("BRANDHUB")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
