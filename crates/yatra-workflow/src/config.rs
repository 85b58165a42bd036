//! Configuration loaded from environment variables.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Workflow configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Identity provider configuration
    pub provider: ProviderConfig,

    /// Backend API configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// Phone number configuration
    #[serde(default)]
    pub phone: PhoneConfig,

    /// Device location configuration
    #[serde(default)]
    pub location: LocationConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Identity provider REST API URL
    #[serde(default = "default_provider_api_url")]
    pub api_url: String,

    /// Identity provider API key
    pub api_key: String,

    /// HTTP timeout for provider calls
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Yatra backend API URL
    #[serde(default = "default_backend_api_url")]
    pub api_url: String,

    /// HTTP timeout for backend calls
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhoneConfig {
    /// Country calling code prefixed to the entered mobile number
    #[serde(default = "default_country_code")]
    pub country_code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationConfig {
    /// Kiosk latitude
    #[serde(default = "default_latitude")]
    pub latitude: f64,

    /// Kiosk longitude
    #[serde(default = "default_longitude")]
    pub longitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default implementations
impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_url: default_backend_api_url(),
            timeout: default_timeout(),
        }
    }
}

impl Default for PhoneConfig {
    fn default() -> Self {
        Self {
            country_code: default_country_code(),
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            latitude: default_latitude(),
            longitude: default_longitude(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_provider_api_url() -> String {
    "https://identitytoolkit.googleapis.com".into()
}

fn default_backend_api_url() -> String {
    "http://localhost:8080".into()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_country_code() -> String {
    "+91".into()
}

// Registration kiosks default to the base camp coordinates.
fn default_latitude() -> f64 {
    34.2268
}

fn default_longitude() -> f64 {
    75.5008
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
