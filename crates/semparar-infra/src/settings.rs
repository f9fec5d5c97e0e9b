//! Environment settings loader.
//!
//! Read once at process startup. The bus credentials are required and
//! abort startup when missing; the browser settings all have defaults.

use semparar_types::config::{BrowserSettings, BusSettings};
use semparar_types::error::ConfigError;

pub const MQTT_ADDRESS: &str = "MQTT_ADDRESS";
pub const MQTT_USERNAME: &str = "MQTT_USERNAME";
pub const MQTT_PASSWORD: &str = "MQTT_PASSWORD";
pub const BROWSER_URL: &str = "BROWSER_URL";
pub const BROWSER_HEADLESS: &str = "BROWSER_HEADLESS";

/// Load the required bus settings from the environment.
pub fn load_bus_settings() -> Result<BusSettings, ConfigError> {
    Ok(BusSettings {
        address: require(MQTT_ADDRESS)?,
        username: require(MQTT_USERNAME)?,
        password: require(MQTT_PASSWORD)?,
    })
}

/// Load the browser settings from the environment. Headless defaults to
/// true; any value other than `"true"` disables it.
pub fn load_browser_settings() -> BrowserSettings {
    BrowserSettings {
        remote_url: std::env::var(BROWSER_URL).ok().filter(|v| !v.is_empty()),
        headless: headless_from(std::env::var(BROWSER_HEADLESS).ok().as_deref()),
    }
}

fn headless_from(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(v) => v == "true",
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_defaults_to_true_and_requires_exact_true() {
        assert!(headless_from(None));
        assert!(headless_from(Some("true")));
        assert!(!headless_from(Some("false")));
        assert!(!headless_from(Some("TRUE")));
        assert!(!headless_from(Some("1")));
    }

    #[test]
    fn missing_required_variable_is_a_config_error() {
        // Single test touching the process environment, to stay clear of
        // parallel-test interference on these names.
        unsafe {
            std::env::remove_var(MQTT_ADDRESS);
        }
        let err = load_bus_settings().unwrap_err();
        assert!(err.to_string().contains(MQTT_ADDRESS));
    }
}
