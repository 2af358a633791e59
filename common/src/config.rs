use config::{Config, ConfigError, FileFormat};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub destination: DestinationKind,
    #[serde(default)]
    pub evocon: EvoconConfig,
    #[serde(default)]
    pub sources: Sources,
    pub snowflake: Option<SnowflakeConfig>,
}

/// Deployment environment. Staging runs land in a suffixed dataset so they
/// never touch production tables.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Dev,
    Prod,
}

impl Environment {
    pub fn dataset_name(&self) -> &'static str {
        match self {
            Environment::Dev => "evocon_staging",
            Environment::Prod => "evocon",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Dev => write!(f, "dev"),
            Environment::Prod => write!(f, "prod"),
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            other => Err(format!("unknown environment '{}', expected dev or prod", other)),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DestinationKind {
    #[default]
    Snowflake,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EvoconConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_overlap_days")]
    pub overlap_days: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

impl Default for EvoconConfig {
    fn default() -> Self {
        EvoconConfig {
            base_url: default_base_url(),
            overlap_days: default_overlap_days(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

/// Secret values, keyed so `SOURCES__EVOCON__API_KEY` style environment
/// variables land on `sources.evocon.api_key`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Sources {
    #[serde(default)]
    pub evocon: EvoconSecrets,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EvoconSecrets {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SnowflakeConfig {
    pub account: String,
    pub database: String,
    pub warehouse: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_statement_timeout_secs")]
    pub statement_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.evocon.com/api/reports/".to_string()
}

fn default_overlap_days() -> u32 {
    2
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_statement_timeout_secs() -> u64 {
    60
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(config::File::with_name(path))
            // Double-underscore separation keeps nested keys addressable from
            // the environment: SOURCES__EVOCON__API_KEY -> sources.evocon.api_key
            .add_source(config::Environment::default().separator("__"));

        // Build the configuration
        let config = builder.build()?;

        // Try to deserialize the entire configuration
        let settings: Settings = config.try_deserialize()?;

        debug!(
            environment = %settings.environment,
            destination = ?settings.destination,
            "Loaded pipeline settings"
        );

        Ok(settings)
    }

    /// Parse settings from a TOML string, without the environment layer.
    /// Test fixtures stay deterministic this way.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(config::File::from_str(toml, FileFormat::Toml))
            .build()?;

        config.try_deserialize()
    }

    pub fn dataset_name(&self) -> &'static str {
        self.environment.dataset_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_settings_fall_back_to_defaults() {
        let settings = Settings::from_toml_str("").unwrap();

        assert_eq!(settings.environment, Environment::Dev);
        assert_eq!(settings.destination, DestinationKind::Snowflake);
        assert_eq!(settings.evocon.base_url, "https://api.evocon.com/api/reports/");
        assert_eq!(settings.evocon.overlap_days, 2);
        assert!(settings.sources.evocon.api_key.is_empty());
        assert!(settings.snowflake.is_none());
    }

    #[test]
    fn environment_controls_dataset_name() {
        assert_eq!(Environment::Prod.dataset_name(), "evocon");
        assert_eq!(Environment::Dev.dataset_name(), "evocon_staging");
    }

    #[test]
    fn environment_parses_from_cli_strings() {
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Dev);
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Prod);
        assert!("production".parse::<Environment>().is_err());
    }

    #[test]
    fn full_settings_file_parses() {
        let toml = r#"
environment = "prod"
destination = "snowflake"

[evocon]
overlap_days = 1

[sources.evocon]
api_key = "key-12345678"
secret = "sec-12345678"

[snowflake]
account = "xy12345.eu-west-1"
database = "ANALYTICS"
warehouse = "LOAD_WH"
role = "LOADER"
token = "oauth-token"
"#;
        let settings = Settings::from_toml_str(toml).unwrap();

        assert_eq!(settings.environment, Environment::Prod);
        assert_eq!(settings.dataset_name(), "evocon");
        assert_eq!(settings.evocon.overlap_days, 1);
        assert_eq!(settings.sources.evocon.api_key, "key-12345678");

        let snowflake = settings.snowflake.unwrap();
        assert_eq!(snowflake.database, "ANALYTICS");
        assert_eq!(snowflake.role.as_deref(), Some("LOADER"));
        assert_eq!(snowflake.statement_timeout_secs, 60);
    }
}
