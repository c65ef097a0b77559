use thiserror::Error;
use url::Url;

/// Errors that can occur while validating a server or feed URL.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
    /// Server URLs carry credentials through config, never inline.
    #[error("Credentials must not be embedded in the server URL")]
    EmbeddedCredentials,
}

fn parse_http(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(url)
}

/// Validates the base URL of the download server.
///
/// Loopback and private addresses are accepted: the server usually runs on
/// the same machine or LAN. Inline `user:pass@` credentials are rejected so
/// they never end up in logs.
///
/// # Examples
///
/// ```
/// use nzbfeed::util::validate_server_url;
///
/// let url = validate_server_url("http://127.0.0.1:6789").unwrap();
/// assert_eq!(url.port(), Some(6789));
///
/// assert!(validate_server_url("ftp://example.com").is_err());
/// ```
pub fn validate_server_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = parse_http(url_str)?;
    if !url.username().is_empty() || url.password().is_some() {
        return Err(UrlValidationError::EmbeddedCredentials);
    }
    Ok(url)
}

/// Validates an ad hoc feed URL before asking the server to preview it.
///
/// The server performs the actual fetch, so only the shape is checked here.
pub fn validate_feed_url(url_str: &str) -> Result<Url, UrlValidationError> {
    parse_http(url_str)
}
