//! HTTP fetcher for the status page
//!
//! One GET per poll tick, bounded by a client-wide timeout. There is no retry
//! here: a failed fetch is reported and the next tick tries again.

use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE},
    Client, Response,
};
use std::time::Duration;
use url::Url;

use crate::config::SourceConfig;
use crate::utils::error::FetchError;

/// Default status page
pub const DEFAULT_STATUS_URL: &str = "https://esoserverstatus.net/";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default user agent identifying this client
pub fn default_user_agent() -> String {
    format!("ESOServerStatusDaemon/{}", env!("CARGO_PKG_VERSION"))
}

/// Anything that can produce the raw status document
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch the document body
    async fn fetch(&self) -> Result<String, FetchError>;
}

/// reqwest-backed status page fetcher
#[derive(Debug, Clone)]
pub struct StatusFetcher {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Page to fetch
    url: Url,
}

impl StatusFetcher {
    /// Create a fetcher for the default status page
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new() -> Result<Self, FetchError> {
        Self::with_config(DEFAULT_STATUS_URL, &default_user_agent(), DEFAULT_TIMEOUT)
    }

    /// Create a fetcher from the `[source]` config section
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidUrl` for a malformed URL and
    /// `FetchError::Http` if the HTTP client cannot be created
    pub fn from_config(config: &SourceConfig) -> Result<Self, FetchError> {
        Self::with_config(&config.url, &config.user_agent, config.request_timeout())
    }

    /// Create a fetcher with explicit settings
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidUrl` for a malformed URL and
    /// `FetchError::Http` if the HTTP client cannot be created
    pub fn with_config(url: &str, user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let url = crate::utils::parse_http_url(url)
            .map_err(|e| FetchError::InvalidUrl(format!("{e:#}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .gzip(true)
            .build()?;

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Decode a response body using the charset from its Content-Type
    async fn decode_response(response: Response) -> Result<String, FetchError> {
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_default();

        let bytes = response.bytes().await.map_err(map_reqwest_error)?;

        decode_bytes(&bytes, &content_type)
    }
}

#[async_trait]
impl StatusSource for StatusFetcher {
    async fn fetch(&self) -> Result<String, FetchError> {
        tracing::debug!(url = %self.url, "Fetching status page");

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::ServerError(status.as_u16()));
        }

        Self::decode_response(response).await
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Http(err)
    }
}

/// Extract the `charset=` parameter from a Content-Type value
fn charset_label(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

/// Decode bytes to a string, defaulting to UTF-8
///
/// # Errors
///
/// Returns `FetchError::Decode` if the declared charset produced malformed
/// output
pub fn decode_bytes(bytes: &[u8], content_type: &str) -> Result<String, FetchError> {
    let encoding = charset_label(content_type)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);

    let (text, actual, had_errors) = encoding.decode(bytes);
    if had_errors && actual != UTF_8 {
        return Err(FetchError::Decode(format!(
            "Body is not valid {}",
            actual.name()
        )));
    }
    if had_errors {
        tracing::debug!("Status page contained invalid UTF-8, replaced lossily");
    }

    Ok(text.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charset_label() {
        assert_eq!(charset_label("text/html; charset=UTF-8"), Some("UTF-8"));
        assert_eq!(charset_label("text/html;charset=\"iso-8859-1\""), Some("iso-8859-1"));
        assert_eq!(charset_label("text/html"), None);
    }

    #[test]
    fn test_decode_utf8_default() {
        let text = decode_bytes("PC EU Megaserver · Online".as_bytes(), "").unwrap();
        assert!(text.contains("Online"));
    }

    #[test]
    fn test_decode_latin1() {
        let bytes = [0x4f, 0x6e, 0x6c, 0x69, 0x6e, 0x65, 0x20, 0xe9];
        let text = decode_bytes(&bytes, "text/html; charset=iso-8859-1").unwrap();
        assert_eq!(text, "Online é");
    }

    #[test]
    fn test_invalid_url_rejected() {
        let err = StatusFetcher::with_config("not a url", "test", DEFAULT_TIMEOUT).unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[test]
    fn test_default_user_agent() {
        assert!(default_user_agent().starts_with("ESOServerStatusDaemon/"));
    }
}
