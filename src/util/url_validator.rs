use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors from validating a feed endpoint URL.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// Plain HTTP to a non-loopback host would expose the API key.
    #[error("Insecure endpoint: HTTPS required (except localhost for testing)")]
    InsecureEndpoint,
}

/// Validate the feed endpoint URL.
///
/// Requires `https`, except for loopback hosts (`localhost`, `127.0.0.1`,
/// `::1`) where plain `http` is allowed so local test servers work.
///
/// # Examples
///
/// ```
/// use briefing::util::validate_endpoint_url;
///
/// assert!(validate_endpoint_url("https://api.example.com/briefing").is_ok());
/// assert!(validate_endpoint_url("http://127.0.0.1:8788/api/briefing").is_ok());
/// assert!(validate_endpoint_url("http://api.example.com/briefing").is_err());
/// assert!(validate_endpoint_url("file:///etc/passwd").is_err());
/// ```
pub fn validate_endpoint_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "https" => Ok(url),
        "http" if is_loopback_host(&url) => {
            tracing::warn!(endpoint = %url, "Using non-HTTPS feed endpoint (localhost only)");
            Ok(url)
        }
        "http" => Err(UrlValidationError::InsecureEndpoint),
        scheme => Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }
}

fn is_loopback_host(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    if host == "localhost" {
        return true;
    }
    // Strip brackets from IPv6 addresses for parsing
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    host.parse::<IpAddr>().map(|ip| ip.is_loopback()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_accepted() {
        assert!(validate_endpoint_url("https://example.com/api/briefing").is_ok());
        assert!(validate_endpoint_url("https://example.com:443/api").is_ok());
    }

    #[test]
    fn test_http_loopback_accepted() {
        assert!(validate_endpoint_url("http://localhost:3000/api").is_ok());
        assert!(validate_endpoint_url("http://127.0.0.1:8788/api").is_ok());
        assert!(validate_endpoint_url("http://[::1]:8788/api").is_ok());
    }

    #[test]
    fn test_http_remote_rejected() {
        let err = validate_endpoint_url("http://example.com/api").unwrap_err();
        assert!(matches!(err, UrlValidationError::InsecureEndpoint));
    }

    #[test]
    fn test_http_private_ip_rejected() {
        assert!(validate_endpoint_url("http://192.168.1.1/api").is_err());
    }

    #[test]
    fn test_invalid_schemes() {
        assert!(matches!(
            validate_endpoint_url("ftp://example.com").unwrap_err(),
            UrlValidationError::UnsupportedScheme(_)
        ));
        assert!(validate_endpoint_url("file:///etc/passwd").is_err());
    }

    #[test]
    fn test_unparsable() {
        assert!(matches!(
            validate_endpoint_url("not a url").unwrap_err(),
            UrlValidationError::InvalidUrl(_)
        ));
    }
}
