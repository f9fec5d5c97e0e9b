//! Browser-automation seam.
//!
//! The workflow is written against these traits; `semparar-infra` provides
//! the fantoccini implementation and the test suite provides scripted
//! fakes. The primitive set is exactly what the report workflow needs --
//! nothing more general.

use std::fmt;
use std::time::Duration;

use semparar_types::config::BrowserSettings;
use semparar_types::error::UiError;

/// How long a single element lookup may take before it fails the run.
pub const ELEMENT_WAIT: Duration = Duration::from_secs(10);

/// How an element is addressed on the page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    Id(&'static str),
    Css(&'static str),
    Name(&'static str),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Id(id) => write!(f, "#{id}"),
            Target::Css(css) => write!(f, "{css}"),
            Target::Name(name) => write!(f, "[name={name}]"),
        }
    }
}

/// One live browser-automation session.
///
/// Implementations are cheap handles: cloning shares the session, and
/// [`UiDriver::quit`] on any clone tears the session down for all of them.
/// Element-addressed operations wait up to [`ELEMENT_WAIT`] for the element
/// to appear; failing that is `UiError::ElementWait`, fatal to the run
/// everywhere except the captcha presence checks, which use the
/// `Ok(bool)`-returning probes below.
pub trait UiDriver: Clone + Send + Sync + 'static {
    /// Navigate to a URL.
    fn goto(&self, url: &str) -> impl std::future::Future<Output = Result<(), UiError>> + Send;

    /// Type text into an element.
    fn type_into(
        &self,
        target: Target,
        text: &str,
    ) -> impl std::future::Future<Output = Result<(), UiError>> + Send;

    /// Type text into an element and submit it with the Return key.
    fn type_and_submit(
        &self,
        target: Target,
        text: &str,
    ) -> impl std::future::Future<Output = Result<(), UiError>> + Send;

    /// Clear an input element.
    fn clear(&self, target: Target)
        -> impl std::future::Future<Output = Result<(), UiError>> + Send;

    /// Click an element.
    fn click(&self, target: Target)
        -> impl std::future::Future<Output = Result<(), UiError>> + Send;

    /// Read a computed CSS property of an element.
    fn css_value(
        &self,
        target: Target,
        property: &str,
    ) -> impl std::future::Future<Output = Result<String, UiError>> + Send;

    /// Read an element's visible text.
    fn element_text(
        &self,
        target: Target,
    ) -> impl std::future::Future<Output = Result<String, UiError>> + Send;

    /// Immediate presence check, no waiting. Used to detect the captcha
    /// iframe.
    fn is_present(
        &self,
        target: Target,
    ) -> impl std::future::Future<Output = Result<bool, UiError>> + Send;

    /// Wait up to `timeout` for an element to appear. Absence is
    /// `Ok(false)`, not an error.
    fn wait_present(
        &self,
        target: Target,
        timeout: Duration,
    ) -> impl std::future::Future<Output = Result<bool, UiError>> + Send;

    /// Wait up to `timeout` for an element's text to contain `needle`.
    /// Absence of the text (or of the element) is `Ok(false)`.
    fn wait_for_text(
        &self,
        target: Target,
        needle: &str,
        timeout: Duration,
    ) -> impl std::future::Future<Output = Result<bool, UiError>> + Send;

    /// Wait up to `timeout` for the page URL to contain `needle`.
    /// Failing the wait is `UiError::UrlWait`.
    fn wait_for_url(
        &self,
        needle: &str,
        timeout: Duration,
    ) -> impl std::future::Future<Output = Result<(), UiError>> + Send;

    /// Switch into an iframe.
    fn enter_frame(
        &self,
        target: Target,
    ) -> impl std::future::Future<Output = Result<(), UiError>> + Send;

    /// Switch back to the parent frame.
    fn leave_frame(&self) -> impl std::future::Future<Output = Result<(), UiError>> + Send;

    /// Tear the session down. Ends the session for every clone of this
    /// handle; callers guard against double release with an `Option` slot.
    fn quit(self) -> impl std::future::Future<Output = Result<(), UiError>> + Send;
}

/// Starts browser sessions. Owns the headless-flag / remote-endpoint
/// decision.
pub trait UiLauncher: Send + Sync {
    type Driver: UiDriver;

    fn launch(
        &self,
        settings: &BrowserSettings,
    ) -> impl std::future::Future<Output = Result<Self::Driver, UiError>> + Send;
}
