//! Error types and handling for the `CityDash` dashboard

use thiserror::Error;

/// Main error type for the dashboard library
#[derive(Error, Debug)]
pub enum DashboardError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The city name could not be resolved to coordinates
    #[error("City not found: {city}")]
    Geocode { city: String },

    /// Invalid input to the AQI formula
    #[error("AQI calculation error: {message}")]
    Calculation { message: String },

    /// API communication errors
    #[error("API error: {message}")]
    Api { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

}

impl DashboardError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new geocoding error for an unresolvable city
    pub fn geocode<S: Into<String>>(city: S) -> Self {
        Self::Geocode { city: city.into() }
    }

    /// Create a new calculation error
    pub fn calculation<S: Into<String>>(message: S) -> Self {
        Self::Calculation {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            DashboardError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            DashboardError::Geocode { city } => {
                format!("City '{city}' not found. Please try a different city name.")
            }
            DashboardError::Calculation { message } => {
                format!("Received invalid pollutant data: {message}")
            }
            DashboardError::Api { .. } => {
                "Unable to connect to external services. Please check your internet connection."
                    .to_string()
            }
            DashboardError::Validation { message } => {
                format!("Invalid input: {message}")
            }
        }
    }

    /// Get a short suggestion shown next to the error in the insights panel
    #[must_use]
    pub fn remediation_hint(&self) -> &'static str {
        match self {
            DashboardError::Geocode { .. } | DashboardError::Validation { .. } => {
                "Try entering a major city name (e.g., \"Delhi\", \"London\", \"New York\")"
            }
            DashboardError::Config { .. } => {
                "Check ~/.config/citydash/config.toml and the CITYDASH_* environment variables"
            }
            DashboardError::Api { .. } => "Check your internet connection and try again",
            DashboardError::Calculation { .. } => {
                "Try again in a minute; the data providers may be temporarily unavailable"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = DashboardError::config("missing API key");
        assert!(matches!(config_err, DashboardError::Config { .. }));

        let geocode_err = DashboardError::geocode("Atlantis");
        assert!(matches!(geocode_err, DashboardError::Geocode { .. }));

        let calc_err = DashboardError::calculation("negative concentration");
        assert!(matches!(calc_err, DashboardError::Calculation { .. }));
    }

    #[test]
    fn test_user_messages() {
        let geocode_err = DashboardError::geocode("Atlantis");
        assert!(geocode_err.user_message().contains("Atlantis"));

        let api_err = DashboardError::api("test");
        assert!(api_err.user_message().contains("Unable to connect"));

        let validation_err = DashboardError::validation("test input");
        assert!(validation_err.user_message().contains("test input"));
    }

    #[test]
    fn test_geocode_hint_suggests_major_city() {
        let err = DashboardError::geocode("Atlantis");
        assert!(err.remediation_hint().contains("major city"));
    }
}
