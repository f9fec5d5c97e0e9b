//! Report and runtime configuration types.
//!
//! `ReportConfig` is the payload of a trigger message; the settings structs
//! are read from the environment once at startup (loader lives in
//! `semparar-infra`).

use serde::{Deserialize, Serialize};

/// How many days back the report window reaches when the trigger does not
/// say otherwise.
pub const DEFAULT_PAST_DAYS: i64 = 30;

/// Immutable input to one report-export run, carried by the trigger message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportConfig {
    pub username: String,
    pub password: String,
    /// Recipient addresses, processed strictly in this order.
    pub emails: Vec<String>,
    /// Days back from today for the report date window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub past_days: Option<i64>,
}

impl ReportConfig {
    /// The effective window length, falling back to [`DEFAULT_PAST_DAYS`].
    pub fn past_days(&self) -> i64 {
        self.past_days.unwrap_or(DEFAULT_PAST_DAYS).max(0)
    }
}

/// Connection settings for the MQTT bus. All fields are required.
#[derive(Debug, Clone)]
pub struct BusSettings {
    pub address: String,
    pub username: String,
    pub password: String,
}

/// Browser-automation session settings.
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    /// Remote WebDriver endpoint; when set, the session runs against it.
    pub remote_url: Option<String>,
    /// Whether the browser runs headless. Defaults to true.
    pub headless: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            remote_url: None,
            headless: true,
        }
    }
}
