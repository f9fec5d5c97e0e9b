use thiserror::Error;

/// Errors raised while loading startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: {reason}")]
    InvalidVar { var: &'static str, reason: String },
}

/// Errors from the correlation channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// No correlated reply arrived within the wait bound.
    #[error("no reply received within {0} seconds")]
    Timeout(u64),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("bus connection failed: {0}")]
    Connect(String),

    #[error("inbound message stream closed")]
    Closed,

    #[error("malformed reply payload: {0}")]
    Decode(String),
}

/// Errors from the browser-automation session.
#[derive(Debug, Error)]
pub enum UiError {
    /// A required element did not turn up inside its wait bound.
    #[error("element '{target}' not found within the wait bound")]
    ElementWait { target: String },

    /// The page URL never reached the expected value.
    #[error("url never contained '{needle}': {detail}")]
    UrlWait { needle: String, detail: String },

    #[error("failed to launch browser session: {0}")]
    Launch(String),

    #[error("browser session error: {0}")]
    Session(String),
}

/// Errors from captcha challenge-image extraction.
#[derive(Debug, Error)]
pub enum CaptchaError {
    /// The CSS `background-image` value did not contain a base64 payload
    /// between a comma and a closing quote.
    #[error("no base64 payload in captcha background-image value '{0}'")]
    MalformedImage(String),
}

/// Umbrella error for one report-export run. Its `Display` rendering is
/// what ends up in the failure notification, so every variant reads as a
/// complete sentence.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Ui(#[from] UiError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Captcha(#[from] CaptchaError),

    /// The authenticated landing page never loaded after login.
    /// Message text is user-visible and stays in the portal's locale.
    #[error("Erro ao carregar a página inicial do portal: {0}")]
    PortalLoad(#[source] UiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_timeout_display_names_the_bound() {
        let err = ChannelError::Timeout(120);
        assert_eq!(err.to_string(), "no reply received within 120 seconds");
    }

    #[test]
    fn portal_load_wraps_the_underlying_wait_failure() {
        let err = WorkflowError::PortalLoad(UiError::UrlWait {
            needle: "Default.aspx".to_string(),
            detail: "timed out after 60s".to_string(),
        });
        let rendered = err.to_string();
        assert!(rendered.starts_with("Erro ao carregar a página inicial do portal"));
        assert!(rendered.contains("Default.aspx"));
    }

    #[test]
    fn ui_error_display_names_the_target() {
        let err = UiError::ElementWait {
            target: "#UserName".to_string(),
        };
        assert!(err.to_string().contains("#UserName"));
    }

    #[test]
    fn captcha_error_carries_the_offending_value() {
        let err = CaptchaError::MalformedImage("url(broken".to_string());
        assert!(err.to_string().contains("url(broken"));
    }
}
