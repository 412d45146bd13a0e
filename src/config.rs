//! Persistent application configuration model, defaults, and loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;

use crate::backends::igdb::IgdbCredentials;
use crate::backends::steam::SteamCredentials;
use crate::errors::ConfigError;
use crate::retry::RetryPolicy;

pub const CONFIG_FILE_NAME: &str = "game_cover_slideshow.toml";

/// Root configuration persisted to `game_cover_slideshow.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    #[serde(default)]
    /// Steam Web API credentials.
    pub steam: SteamConfig,
    #[serde(default)]
    /// IGDB (Twitch) application credentials.
    pub igdb: IgdbConfig,
    #[serde(default)]
    /// Slide timing.
    pub slideshow: SlideshowConfig,
    #[serde(default)]
    /// Run deadline and store-detail retry behavior.
    pub reconciliation: ReconciliationConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SteamConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub account_id: String,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct IgdbConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    /// Twitch OAuth token endpoint.
    #[serde(default = "default_igdb_token_url")]
    pub token_url: String,
    /// IGDB API root, e.g. a caching proxy in front of `api.igdb.com`.
    #[serde(default = "default_igdb_api_base_url")]
    pub api_base_url: String,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SlideshowConfig {
    /// Seconds each game stays on screen.
    #[serde(default = "default_image_time_seconds")]
    pub image_time_seconds: u64,
    /// Background images cycled behind the cover per game.
    #[serde(default = "default_background_transitions")]
    pub background_transitions: u32,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ReconciliationConfig {
    #[serde(default = "default_run_deadline_secs")]
    pub run_deadline_secs: u64,
    #[serde(default = "default_store_detail_attempts")]
    pub store_detail_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct StoreConfig {
    /// Overrides the default store file under the user data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for IgdbConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            token_url: default_igdb_token_url(),
            api_base_url: default_igdb_api_base_url(),
        }
    }
}

impl Default for SlideshowConfig {
    fn default() -> Self {
        Self {
            image_time_seconds: default_image_time_seconds(),
            background_transitions: default_background_transitions(),
        }
    }
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            run_deadline_secs: default_run_deadline_secs(),
            store_detail_attempts: default_store_detail_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

fn default_igdb_token_url() -> String {
    crate::backends::igdb::TOKEN_URL.to_string()
}

fn default_igdb_api_base_url() -> String {
    crate::backends::igdb::API_BASE_URL.to_string()
}

fn default_image_time_seconds() -> u64 {
    30
}

fn default_background_transitions() -> u32 {
    3
}

fn default_run_deadline_secs() -> u64 {
    30 * 60
}

fn default_store_detail_attempts() -> u32 {
    crate::retry::DEFAULT_MAX_ATTEMPTS
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    30_000
}

impl Config {
    /// Checks that every credential the pipeline needs is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("steam.api_key", &self.steam.api_key),
            ("steam.account_id", &self.steam.account_id),
            ("igdb.client_id", &self.igdb.client_id),
            ("igdb.client_secret", &self.igdb.client_secret),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingKey(key));
            }
        }
        Ok(())
    }

    pub fn steam_credentials(&self) -> SteamCredentials {
        SteamCredentials {
            api_key: self.steam.api_key.trim().to_string(),
            account_id: self.steam.account_id.trim().to_string(),
        }
    }

    pub fn igdb_credentials(&self) -> IgdbCredentials {
        IgdbCredentials {
            client_id: self.igdb.client_id.trim().to_string(),
            client_secret: self.igdb.client_secret.trim().to_string(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.reconciliation.store_detail_attempts,
            base_delay: Duration::from_millis(self.reconciliation.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.reconciliation.retry_max_delay_ms),
        }
    }

    pub fn run_deadline(&self) -> Duration {
        Duration::from_secs(self.reconciliation.run_deadline_secs)
    }
}

/// Clamps numeric settings into ranges the pipeline and slideshow accept.
pub fn sanitize_config(config: Config) -> Config {
    let retry_base_delay_ms = config.reconciliation.retry_base_delay_ms;
    Config {
        slideshow: SlideshowConfig {
            image_time_seconds: config.slideshow.image_time_seconds.max(1),
            background_transitions: config.slideshow.background_transitions.max(1),
        },
        reconciliation: ReconciliationConfig {
            run_deadline_secs: config.reconciliation.run_deadline_secs.max(1),
            store_detail_attempts: config.reconciliation.store_detail_attempts.clamp(1, 50),
            retry_base_delay_ms,
            retry_max_delay_ms: config
                .reconciliation
                .retry_max_delay_ms
                .max(retry_base_delay_ms),
        },
        ..config
    }
}

pub fn system_config_template_text() -> &'static str {
    include_str!("../config/config.system.toml")
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Reads, sanitizes, and validates the config at `path`. A missing file is
/// replaced by the bundled template and reported as an error, since the
/// template carries no credentials.
pub fn load_config_file(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, system_config_template_text())?;
        info!(
            "Config file not found. Created default config. path={}",
            path.display()
        );
        return Err(ConfigError::CreatedDefault(path.display().to_string()));
    }

    let config_content = std::fs::read_to_string(path)?;
    let config = sanitize_config(toml::from_str::<Config>(&config_content)?);
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::{load_config_file, sanitize_config, system_config_template_text, Config};
    use crate::errors::ConfigError;
    use std::time::Duration;

    const FILLED_CONFIG: &str = r#"
[steam]
api_key = "steam-key"
account_id = "76561198000000000"

[igdb]
client_id = "igdb-id"
client_secret = "igdb-secret"
"#;

    #[test]
    fn test_default_config_has_expected_values() {
        let config = Config::default();

        assert!(config.steam.api_key.is_empty());
        assert!(config.igdb.client_secret.is_empty());
        assert_eq!(config.slideshow.image_time_seconds, 30);
        assert_eq!(config.slideshow.background_transitions, 3);
        assert_eq!(config.reconciliation.run_deadline_secs, 1800);
        assert_eq!(config.reconciliation.store_detail_attempts, 15);
        assert_eq!(config.retry_policy().base_delay, Duration::from_millis(100));
        assert_eq!(config.store.path, None);
        assert_eq!(config.igdb.token_url, "https://id.twitch.tv/oauth2/token");
        assert_eq!(config.igdb.api_base_url, "https://api.igdb.com/v4");
    }

    #[test]
    fn test_igdb_endpoints_can_be_overridden() {
        let text = format!(
            "{FILLED_CONFIG}token_url = \"http://localhost:8080/token\"\napi_base_url = \"http://localhost:8080/igdb/\"\n"
        );
        let config: Config = toml::from_str(&text).expect("config should parse");
        assert_eq!(config.igdb.client_id, "igdb-id");
        assert_eq!(config.igdb.token_url, "http://localhost:8080/token");
        assert_eq!(config.igdb.api_base_url, "http://localhost:8080/igdb/");
    }

    #[test]
    fn test_system_template_parses_to_defaults() {
        let parsed: Config =
            toml::from_str(system_config_template_text()).expect("template should parse");
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_validate_reports_first_missing_key() {
        let mut config: Config = toml::from_str(FILLED_CONFIG).expect("config should parse");
        assert!(config.validate().is_ok());

        config.igdb.client_secret = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingKey("igdb.client_secret"))
        ));

        config.steam.api_key.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingKey("steam.api_key"))
        ));
    }

    #[test]
    fn test_sanitize_config_clamps_zero_values() {
        let mut config = Config::default();
        config.slideshow.image_time_seconds = 0;
        config.slideshow.background_transitions = 0;
        config.reconciliation.store_detail_attempts = 500;
        config.reconciliation.retry_base_delay_ms = 2_000;
        config.reconciliation.retry_max_delay_ms = 10;

        let sanitized = sanitize_config(config);
        assert_eq!(sanitized.slideshow.image_time_seconds, 1);
        assert_eq!(sanitized.slideshow.background_transitions, 1);
        assert_eq!(sanitized.reconciliation.store_detail_attempts, 50);
        assert_eq!(sanitized.reconciliation.retry_max_delay_ms, 2_000);
    }

    #[test]
    fn test_load_config_file_writes_template_when_missing() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("settings").join("game_cover_slideshow.toml");

        assert!(matches!(
            load_config_file(&path),
            Err(ConfigError::CreatedDefault(_))
        ));
        let written = std::fs::read_to_string(&path).expect("template should be written");
        assert_eq!(written, system_config_template_text());

        // The untouched template still lacks credentials.
        assert!(matches!(
            load_config_file(&path),
            Err(ConfigError::MissingKey("steam.api_key"))
        ));
    }

    #[test]
    fn test_load_config_file_reads_filled_config() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("game_cover_slideshow.toml");
        std::fs::write(&path, FILLED_CONFIG).expect("config should be written");

        let config = load_config_file(&path).expect("config should load");
        assert_eq!(config.steam_credentials().api_key, "steam-key");
        assert_eq!(config.igdb_credentials().client_id, "igdb-id");
    }
}
