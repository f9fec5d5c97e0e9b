//! Captcha challenge-image extraction.
//!
//! The portal embeds the challenge as a data URI in the CSS
//! `background-image` of the captcha element, e.g.
//! `url("data:image/png;base64,iVBORw0...")`. The base64 payload sits
//! between the first comma and the closing quote; anything that does not
//! match that grammar is a hard parse error, never a silent empty string.

use std::sync::LazyLock;

use regex::Regex;
use semparar_types::error::CaptchaError;

static IMAGE_PAYLOAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#",(.*?)""#).expect("static pattern"));

/// Pull the base64 image payload out of a CSS `background-image` value.
pub fn extract_image(css: &str) -> Result<String, CaptchaError> {
    let payload = IMAGE_PAYLOAD
        .captures(css)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| CaptchaError::MalformedImage(css.to_string()))?;

    if payload.is_empty() {
        return Err(CaptchaError::MalformedImage(css.to_string()));
    }

    Ok(payload.to_string())
}

#[cfg(test)]
mod tests {
    use base64::Engine;

    use super::*;

    #[test]
    fn extracts_payload_from_data_uri() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"challenge-bytes");
        let css = format!("url(\"data:image/png;base64,{encoded}\")");
        assert_eq!(extract_image(&css).unwrap(), encoded);
    }

    #[test]
    fn stops_at_the_closing_quote() {
        let css = "url(\"data:image/png;base64,AAAA\") url(\"data:image/png;base64,BBBB\")";
        assert_eq!(extract_image(css).unwrap(), "AAAA");
    }

    #[test]
    fn value_without_comma_is_malformed() {
        let err = extract_image("url(\"https://example.com/x.png\")").unwrap_err();
        assert!(matches!(err, CaptchaError::MalformedImage(_)));
    }

    #[test]
    fn value_without_closing_quote_is_malformed() {
        let err = extract_image("url(\"data:image/png;base64,AAAA").unwrap_err();
        assert!(matches!(err, CaptchaError::MalformedImage(_)));
    }

    #[test]
    fn empty_payload_is_malformed() {
        let err = extract_image("url(\"data:image/png;base64,\")").unwrap_err();
        assert!(matches!(err, CaptchaError::MalformedImage(_)));
    }

    #[test]
    fn none_background_is_malformed() {
        assert!(extract_image("none").is_err());
    }
}
