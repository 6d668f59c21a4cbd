//! Transport seam between the pipeline and the network
//!
//! The resolver and the router only talk to the network through
//! [`Transport`], so tests can swap in a canned implementation.

use std::future::Future;
use std::time::Duration;

use crate::error::Result;

/// A single GET request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,

    /// Extra headers, sent in addition to the transport defaults
    pub headers: Vec<(String, String)>,

    /// Upper bound for the whole exchange, redirects included
    pub timeout: Duration,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            timeout,
        }
    }

    /// Adds a header to the request
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Response to a [`FetchRequest`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,

    /// Body text; left empty for non-text content
    pub body: String,

    /// URL after following redirects
    pub final_url: String,

    /// Response headers, names as sent by the server
    pub headers: Vec<(String, String)>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Lowercase media type without parameters
    pub fn content_type(&self) -> Option<String> {
        let value = self.header("content-type")?;
        let media_type = value.split(';').next().unwrap_or(value).trim();
        (!media_type.is_empty()).then(|| media_type.to_ascii_lowercase())
    }
}

/// Performs GET requests on behalf of the pipeline
///
/// Implementations own retries, redirects, cookies and rate limiting.
pub trait Transport: Send + Sync {
    fn fetch(&self, request: FetchRequest) -> impl Future<Output = Result<FetchResponse>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(headers: &[(&str, &str)]) -> FetchResponse {
        FetchResponse {
            status: 200,
            body: String::new(),
            final_url: "https://cdn.example.com/v.mp4".to_string(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_fetch_request_builder() {
        let request = FetchRequest::new("https://example.com/", Duration::from_secs(5))
            .header("Referer", "https://example.com/watch/1");
        assert_eq!(request.url, "https://example.com/");
        assert_eq!(request.timeout, Duration::from_secs(5));
        assert_eq!(
            request.headers,
            vec![("Referer".to_string(), "https://example.com/watch/1".to_string())]
        );
    }

    #[test]
    fn test_response_is_success() {
        let mut r = response(&[]);
        assert!(r.is_success());
        r.status = 204;
        assert!(r.is_success());
        r.status = 302;
        assert!(!r.is_success());
        r.status = 404;
        assert!(!r.is_success());
    }

    #[test]
    fn test_response_header_lookup() {
        let r = response(&[("Content-Type", "Video/MP4; charset=binary")]);
        assert_eq!(r.header("content-type"), Some("Video/MP4; charset=binary"));
        assert_eq!(r.content_type().as_deref(), Some("video/mp4"));
        assert_eq!(r.header("location"), None);
    }

    #[test]
    fn test_response_content_type_missing() {
        assert_eq!(response(&[]).content_type(), None);
        assert_eq!(response(&[("content-type", " ")]).content_type(), None);
    }
}
