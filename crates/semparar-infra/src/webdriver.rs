//! WebDriver session adapter over fantoccini.
//!
//! Implements the core UI seam. A configured remote endpoint runs Firefox
//! against it (the deployment pairs the service with a remote geckodriver
//! container); without one, a local chromedriver on its default port is
//! assumed. Element-addressed operations go through a bounded wait; the
//! text/URL probes poll, mirroring WebDriver's wait-for-condition helpers.

use std::time::Duration;

use fantoccini::elements::Element;
use fantoccini::key::Key;
use fantoccini::{Client, ClientBuilder, Locator};
use semparar_core::ui::{Target, UiDriver, UiLauncher, ELEMENT_WAIT};
use semparar_types::config::BrowserSettings;
use semparar_types::error::UiError;
use tokio::time::Instant;

/// chromedriver's default endpoint, used when no remote URL is configured.
const LOCAL_WEBDRIVER_URL: &str = "http://localhost:9515";

/// Poll interval for the text/URL/presence probes.
const PROBE_INTERVAL: Duration = Duration::from_millis(250);

/// One live WebDriver session. Clones share the session; `quit` on any
/// clone ends it for all of them.
#[derive(Clone)]
pub struct WebSession {
    client: Client,
}

impl WebSession {
    /// CSS selector equivalent of a [`Target`]. The `Display` forms are
    /// already valid CSS (`#id`, raw css, `[name=..]`).
    fn selector(target: &Target) -> String {
        target.to_string()
    }

    async fn find_waiting(&self, target: &Target) -> Result<Element, UiError> {
        let selector = Self::selector(target);
        self.client
            .wait()
            .at_most(ELEMENT_WAIT)
            .for_element(Locator::Css(&selector))
            .await
            .map_err(|_| UiError::ElementWait {
                target: target.to_string(),
            })
    }

    async fn find_immediate(&self, target: &Target) -> Option<Element> {
        let selector = Self::selector(target);
        self.client.find(Locator::Css(&selector)).await.ok()
    }
}

fn session_error(err: fantoccini::error::CmdError) -> UiError {
    UiError::Session(err.to_string())
}

impl UiDriver for WebSession {
    async fn goto(&self, url: &str) -> Result<(), UiError> {
        self.client.goto(url).await.map_err(session_error)
    }

    async fn type_into(&self, target: Target, text: &str) -> Result<(), UiError> {
        let element = self.find_waiting(&target).await?;
        element.send_keys(text).await.map_err(session_error)
    }

    async fn type_and_submit(&self, target: Target, text: &str) -> Result<(), UiError> {
        let element = self.find_waiting(&target).await?;
        let keys = format!("{text}{}", char::from(Key::Return));
        element.send_keys(&keys).await.map_err(session_error)
    }

    async fn clear(&self, target: Target) -> Result<(), UiError> {
        let element = self.find_waiting(&target).await?;
        let _ = element.clear().await.map_err(session_error)?;
        Ok(())
    }

    async fn click(&self, target: Target) -> Result<(), UiError> {
        let element = self.find_waiting(&target).await?;
        let _ = element.click().await.map_err(session_error)?;
        Ok(())
    }

    async fn css_value(&self, target: Target, property: &str) -> Result<String, UiError> {
        let element = self.find_waiting(&target).await?;
        element.css_value(property).await.map_err(session_error)
    }

    async fn element_text(&self, target: Target) -> Result<String, UiError> {
        let element = self.find_waiting(&target).await?;
        element.text().await.map_err(session_error)
    }

    async fn is_present(&self, target: Target) -> Result<bool, UiError> {
        Ok(self.find_immediate(&target).await.is_some())
    }

    async fn wait_present(&self, target: Target, timeout: Duration) -> Result<bool, UiError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.find_immediate(&target).await.is_some() {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(PROBE_INTERVAL).await;
        }
    }

    async fn wait_for_text(
        &self,
        target: Target,
        needle: &str,
        timeout: Duration,
    ) -> Result<bool, UiError> {
        let deadline = Instant::now() + timeout;
        loop {
            // Lookup errors are swallowed here: the element may simply not
            // have rendered yet.
            if let Some(element) = self.find_immediate(&target).await {
                if let Ok(text) = element.text().await {
                    if text.contains(needle) {
                        return Ok(true);
                    }
                }
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(PROBE_INTERVAL).await;
        }
    }

    async fn wait_for_url(&self, needle: &str, timeout: Duration) -> Result<(), UiError> {
        let deadline = Instant::now() + timeout;
        loop {
            let url = self.client.current_url().await.map_err(session_error)?;
            if url.as_str().contains(needle) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(UiError::UrlWait {
                    needle: needle.to_string(),
                    detail: format!("timed out after {}s", timeout.as_secs()),
                });
            }
            tokio::time::sleep(PROBE_INTERVAL).await;
        }
    }

    async fn enter_frame(&self, target: Target) -> Result<(), UiError> {
        let element = self.find_waiting(&target).await?;
        let _ = element.enter_frame().await.map_err(session_error)?;
        Ok(())
    }

    async fn leave_frame(&self) -> Result<(), UiError> {
        let _ = self
            .client
            .clone()
            .enter_parent_frame()
            .await
            .map_err(session_error)?;
        Ok(())
    }

    async fn quit(self) -> Result<(), UiError> {
        self.client.close().await.map_err(session_error)
    }
}

/// Starts WebDriver sessions according to the browser settings.
#[derive(Clone, Default)]
pub struct WebLauncher;

impl UiLauncher for WebLauncher {
    type Driver = WebSession;

    async fn launch(&self, settings: &BrowserSettings) -> Result<WebSession, UiError> {
        let (endpoint, capabilities) = session_request(settings);
        let client = ClientBuilder::native()
            .capabilities(capabilities)
            .connect(&endpoint)
            .await
            .map_err(|e| UiError::Launch(e.to_string()))?;
        Ok(WebSession { client })
    }
}

/// Endpoint and capabilities for a new session: Firefox against a remote
/// endpoint when one is configured, local Chrome otherwise.
fn session_request(
    settings: &BrowserSettings,
) -> (String, serde_json::Map<String, serde_json::Value>) {
    let mut capabilities = serde_json::Map::new();

    match &settings.remote_url {
        Some(remote) => {
            let mut args = Vec::new();
            if settings.headless {
                args.push("-headless");
            }
            capabilities.insert(
                "moz:firefoxOptions".to_string(),
                serde_json::json!({ "args": args }),
            );
            (remote.clone(), capabilities)
        }
        None => {
            let mut args = Vec::new();
            if settings.headless {
                args.push("--headless");
            }
            capabilities.insert(
                "goog:chromeOptions".to_string(),
                serde_json::json!({ "args": args }),
            );
            (LOCAL_WEBDRIVER_URL.to_string(), capabilities)
        }
    }
}
