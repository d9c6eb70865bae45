//! Configuration management for `CityDash`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::DashboardError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure for the dashboard
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Air-quality provider settings
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Weather collaborator settings
    #[serde(default)]
    pub weather: WeatherConfig,
    /// Auto-refresh settings
    #[serde(default)]
    pub refresh: RefreshConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Default application settings
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// Air-quality provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// API-Ninjas key; the adapter is still tried without one
    pub api_ninjas_key: Option<String>,
    /// AQICN token
    #[serde(default = "default_aqicn_token")]
    pub aqicn_token: String,
    /// OpenAQ key, sent as `X-API-Key`
    pub openaq_api_key: Option<String>,
    /// Optional custom JSON feed placed before OpenAQ in the chain
    pub generic_url: Option<String>,
    /// Per-provider timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
    /// Retries for transient HTTP failures
    #[serde(default)]
    pub max_retries: u32,
}

/// Weather collaborator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeatherMap key; Open-Meteo is used when absent
    pub openweathermap_api_key: Option<String>,
    /// Hours of weather, traffic and energy shown
    #[serde(default = "default_forecast_hours")]
    pub forecast_hours: u32,
}

/// Auto-refresh settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_refresh_enabled")]
    pub enabled: bool,
    #[serde(default = "default_refresh_interval")]
    pub interval_seconds: u32,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Default application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// City loaded when none is given on the command line
    #[serde(default = "default_city")]
    pub city: String,
}

// Default value functions
fn default_aqicn_token() -> String {
    "demo".to_string()
}

fn default_timeout() -> u32 {
    10
}

fn default_forecast_hours() -> u32 {
    24
}

fn default_refresh_enabled() -> bool {
    true
}

fn default_refresh_interval() -> u32 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_city() -> String {
    "Delhi".to_string()
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            api_ninjas_key: None,
            aqicn_token: default_aqicn_token(),
            openaq_api_key: None,
            generic_url: None,
            timeout_seconds: default_timeout(),
            max_retries: 0,
        }
    }
}

impl ProvidersConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.into())
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            openweathermap_api_key: None,
            forecast_hours: default_forecast_hours(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            enabled: default_refresh_enabled(),
            interval_seconds: default_refresh_interval(),
        }
    }
}

impl RefreshConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds.into())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            city: default_city(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from `config_path`, or the default location, plus
    /// environment variables
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Add environment variable overrides with CITYDASH_ prefix
        builder = builder.add_source(
            Environment::with_prefix("CITYDASH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: DashboardConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        // Apply defaults for missing values
        config.apply_defaults();

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("citydash").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.providers.aqicn_token.is_empty() {
            self.providers.aqicn_token = default_aqicn_token();
        }
        if self.providers.timeout_seconds == 0 {
            self.providers.timeout_seconds = default_timeout();
        }
        if self.weather.forecast_hours == 0 {
            self.weather.forecast_hours = default_forecast_hours();
        }
        if self.refresh.interval_seconds == 0 {
            self.refresh.interval_seconds = default_refresh_interval();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.defaults.city.trim().is_empty() {
            self.defaults.city = default_city();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate API keys and credentials
    pub fn validate_api_keys(&self) -> Result<()> {
        let optional_keys = [
            ("API-Ninjas key", &self.providers.api_ninjas_key),
            ("OpenAQ API key", &self.providers.openaq_api_key),
            ("OpenWeatherMap API key", &self.weather.openweathermap_api_key),
        ];

        for (name, key) in optional_keys {
            if key.as_ref().is_some_and(|k| k.trim().is_empty()) {
                return Err(DashboardError::config(format!(
                    "{name} cannot be empty if provided. Either remove it or provide a valid key."
                ))
                .into());
            }
        }

        if self.providers.aqicn_token.trim().is_empty() {
            return Err(DashboardError::config("AQICN token cannot be empty").into());
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if !(1..=60).contains(&self.providers.timeout_seconds) {
            return Err(
                DashboardError::config("Provider timeout must be between 1 and 60 seconds").into(),
            );
        }

        if self.providers.max_retries > 5 {
            return Err(DashboardError::config("Provider max retries cannot exceed 5").into());
        }

        if !(1..=48).contains(&self.weather.forecast_hours) {
            return Err(
                DashboardError::config("Forecast hours must be between 1 and 48").into(),
            );
        }

        if !(10..=3600).contains(&self.refresh.interval_seconds) {
            return Err(DashboardError::config(
                "Refresh interval must be between 10 and 3600 seconds",
            )
            .into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(DashboardError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(DashboardError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if let Some(url) = &self.providers.generic_url
            && !url.starts_with("http://")
            && !url.starts_with("https://")
        {
            return Err(DashboardError::config(
                "Generic provider URL must be a valid HTTP or HTTPS URL",
            )
            .into());
        }

        if self.defaults.city.trim().is_empty() {
            return Err(DashboardError::config("Default city cannot be empty").into());
        }

        Ok(())
    }
}
