use std::env;
use std::env::current_dir;
use std::fmt::Display;
use std::time::Duration;

use config::Config;
use config::ConfigError;
use secrecy::Secret;
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

use crate::record_store::RecordStoreClient;
use crate::turnstile::TurnstileClient;

/// Global configuration, loaded from `configuration/*.yaml` and `APP_*` env
/// vars. See `get_configuration`.
#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub store: StoreSettings,
    pub turnstile: TurnstileSettings,
}

/// Server configuration
#[derive(Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    /// Should be localhost on dev machine, 0.0.0.0 on prod
    pub host: String,

    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,

    /// Public address of the site, used for the sitemap
    pub base_url: String,

    /// Gates challenge enforcement; see `RunMode`
    pub mode: RunMode,
}

/// Whether the relay enforces the bot check. Not to be confused with
/// `Environment`, which only selects the config file to load (although
/// `local.yaml` sets `development`, and `production.yaml` sets `production`).
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Challenge verification is skipped entirely
    Development,
    Production,
}

impl RunMode {
    pub fn is_development(&self) -> bool { matches!(self, Self::Development) }
}

/// Credentials for the external tabular store (Airtable). `base_id` and
/// `api_key` are optional at the deserialization level so that their absence
/// can be reported as `ConfigurationMissing` by `client`, rather than as an
/// opaque deserialization failure.
#[derive(Deserialize, Clone, Debug)]
pub struct StoreSettings {
    pub base_url: String,
    pub base_id: Option<Secret<String>>,
    pub api_key: Option<Secret<String>>,
    /// Name of the table records are created in
    pub table: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

/// Startup failure; the server does not start without a usable store client.
#[derive(thiserror::Error, Debug)]
pub enum StoreInitError {
    /// The store cannot be reached without both credentials
    #[error("Record store configuration is missing: {0} is not set")]
    ConfigurationMissing(&'static str),
    #[error("Failed to build the record store HTTP client")]
    HttpClient(#[from] reqwest::Error),
}

impl StoreSettings {
    pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_milliseconds) }

    /// Must be called once, before the relay is wired up; the server refuses to
    /// start if either credential is absent.
    pub fn client(&self) -> Result<RecordStoreClient, StoreInitError> {
        let base_id = self
            .base_id
            .clone()
            .ok_or(StoreInitError::ConfigurationMissing("store.base_id"))?;
        let api_key = self
            .api_key
            .clone()
            .ok_or(StoreInitError::ConfigurationMissing("store.api_key"))?;
        let client = RecordStoreClient::new(
            self.base_url.clone(),
            base_id,
            api_key,
            self.table.clone(),
            self.timeout(),
        )?;
        Ok(client)
    }
}

/// Cloudflare Turnstile configuration. Unlike the store credentials, a
/// missing `secret_key` does not prevent startup; the relay answers 500 in
/// production mode instead, and development mode never needs it.
#[derive(Deserialize, Clone, Debug)]
pub struct TurnstileSettings {
    pub verify_url: String,
    pub secret_key: Option<Secret<String>>,
    /// Public key, handed to the client-side widget
    pub site_key: Option<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

impl TurnstileSettings {
    pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_milliseconds) }

    pub fn client(&self) -> Result<TurnstileClient, reqwest::Error> {
        TurnstileClient::new(
            self.verify_url.clone(),
            self.secret_key.clone(),
            self.timeout(),
        )
    }
}

#[derive(Debug)]
pub enum Environment {
    Local,
    Production,
}

impl Display for Environment {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Environment::Local => "local",
                Environment::Production => "production",
            }
        )?;
        Ok(())
    }
}

impl TryFrom<String> for Environment {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            e => Err(format!(
                "Invalid environment: {e}; use either `local` or `production`"
            )),
        }
    }
}

/// Load yaml configuration files at `<project_root>/configuration`, then
/// layer `APP_*` env vars on top.
///
/// `APP_ENVIRONMENT` selects the second file (default `local`). Secrets are
/// expected to come from env vars, e.g.
///
/// ```sh
///     APP_STORE__BASE_ID=app123 APP_STORE__API_KEY=pat456 cargo run
/// ```
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let cfg_dir = current_dir()
        .map_err(|e| ConfigError::Message(format!("could not get current dir: {e}")))?
        .join("configuration");

    let env: Environment = env::var("APP_ENVIRONMENT")
        .unwrap_or("local".to_string())
        .try_into()
        .map_err(ConfigError::Message)?;

    let settings = Config::builder()
        .add_source(config::File::from(cfg_dir.join("base.yaml")))
        .add_source(config::File::from(cfg_dir.join(format!("{env}.yaml"))))
        .add_source(
            // env vars are -always- parsed as String, hence `serde-aux` for numbers
            //
            // `APP_APPLICATION__PORT=5001` -> `Settings.application.port`
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
