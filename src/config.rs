use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

/// Per-request timeout applied when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Immutable description of one load run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    url: Url,
    total_requests: u64,
    request_timeout: Duration,
}

impl EngineConfig {
    pub fn new(url: &str, total_requests: u64) -> Result<Self, ConfigError> {
        if total_requests == 0 {
            return Err(ConfigError::ZeroRequests);
        }

        let url = Url::parse(url).map_err(|source| ConfigError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        }

        Ok(Self {
            url,
            total_requests,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Result<Self, ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        self.request_timeout = timeout;
        Ok(self)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Completions between intermediate progress reports, roughly 1% of the
    /// batch. Zero for batches under 100 requests.
    pub fn refresh_rate(&self) -> u64 {
        self.total_requests / 100
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        let config = EngineConfig::new("http://127.0.0.1:8080/health", 10).unwrap();
        assert_eq!(config.url().as_str(), "http://127.0.0.1:8080/health");
        assert_eq!(config.total_requests(), 10);
        assert_eq!(config.request_timeout(), DEFAULT_REQUEST_TIMEOUT);

        assert!(EngineConfig::new("https://example.com", 1).is_ok());
    }

    #[test]
    fn rejects_zero_requests() {
        let err = EngineConfig::new("http://localhost", 0).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroRequests));
    }

    #[test]
    fn rejects_bad_urls() {
        let err = EngineConfig::new("not a url", 5).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));

        let err = EngineConfig::new("ftp://example.com/file", 5).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedScheme(ref s) if s == "ftp"));
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = EngineConfig::new("http://localhost", 5)
            .unwrap()
            .with_request_timeout(Duration::ZERO)
            .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroTimeout));
    }

    #[test]
    fn refresh_rate_is_one_percent() {
        let rate = |n| EngineConfig::new("http://localhost", n).unwrap().refresh_rate();
        assert_eq!(rate(50), 0);
        assert_eq!(rate(99), 0);
        assert_eq!(rate(100), 1);
        assert_eq!(rate(500), 5);
        assert_eq!(rate(1_234), 12);
    }
}
