//! Secondary resolution of indirection URLs
//!
//! Some hosts hand out `/get_file/` links that only redirect to the real
//! file. The router follows each of those once and swaps in the final URL
//! when the response looks like media. It never drops a candidate.

use futures::stream::{self, StreamExt};
use std::time::Duration;
use tracing::{debug, warn};

use crate::transport::{FetchRequest, FetchResponse, Transport};
use crate::types::{Candidate, ContainerKind};
use crate::url::{is_absolute, is_media_extension, media_extension, url_path};

/// Path marker of URLs that need a confirmation request
pub const INDIRECTION_MARKER: &str = "/get_file/";

/// Manifest content types accepted besides `video/*`
const MANIFEST_CONTENT_TYPES: &[&str] = &[
    "application/vnd.apple.mpegurl",
    "application/x-mpegurl",
    "application/dash+xml",
    "audio/mpegurl",
];

/// Default per-confirmation timeout in seconds
pub const DEFAULT_CONFIRM_TIMEOUT_SECS: u64 = 10;

/// Default number of confirmations in flight
pub const DEFAULT_CONFIRM_CONCURRENCY: usize = 4;

/// Whether a candidate goes through a confirmation request
pub fn needs_confirmation(url: &str) -> bool {
    url_path(url).contains(INDIRECTION_MARKER)
}

/// Container announced by a response's content type
pub fn container_for(response: &FetchResponse) -> Option<ContainerKind> {
    let content_type = response.content_type()?;
    if MANIFEST_CONTENT_TYPES.contains(&content_type.as_str()) {
        Some(ContainerKind::Segmented)
    } else if content_type.starts_with("video/") {
        Some(ContainerKind::Progressive)
    } else {
        None
    }
}

/// Replacement for `original` built from an accepted response
///
/// An opaque final URL takes its container from the content type, and
/// quality hints missing from it carry over from the original.
fn confirmed(original: &Candidate, response: &FetchResponse) -> Candidate {
    let mut candidate = Candidate::new(response.final_url.clone());
    if !candidate.container.is_media() {
        let container = container_for(response).unwrap_or(original.container);
        candidate = candidate.with_container(container);
    }
    candidate.resolution = candidate.resolution.or(original.resolution);
    candidate.bitrate_kbps = candidate.bitrate_kbps.or(original.bitrate_kbps);
    candidate
}

/// Whether a confirmation response may replace the candidate
///
/// Requires a 2xx status and either a video-like content type or a final
/// URL with a media extension.
pub fn accepts(response: &FetchResponse) -> bool {
    if !response.is_success() || !is_absolute(&response.final_url) {
        return false;
    }

    container_for(response).is_some()
        || media_extension(&response.final_url).is_some_and(|ext| is_media_extension(&ext))
}

/// Confirms indirection candidates through a [`Transport`]
pub struct ResolutionRouter<'a, T: Transport> {
    transport: &'a T,
    timeout: Duration,
    concurrency: usize,
}

impl<'a, T: Transport> ResolutionRouter<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self {
            transport,
            timeout: Duration::from_secs(DEFAULT_CONFIRM_TIMEOUT_SECS),
            concurrency: DEFAULT_CONFIRM_CONCURRENCY,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the number of confirmations in flight (at least one)
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Confirms every indirection candidate
    ///
    /// Output has the same length and order as the input.
    pub async fn route(&self, candidates: Vec<Candidate>, page_url: &str) -> Vec<Candidate> {
        stream::iter(candidates)
            .map(|candidate| self.confirm(candidate, page_url))
            .buffered(self.concurrency)
            .collect()
            .await
    }

    async fn confirm(&self, candidate: Candidate, page_url: &str) -> Candidate {
        if !needs_confirmation(&candidate.url) {
            return candidate;
        }

        let request =
            FetchRequest::new(candidate.url.clone(), self.timeout).header("Referer", page_url);

        match tokio::time::timeout(self.timeout, self.transport.fetch(request)).await {
            Ok(Ok(response)) if accepts(&response) => {
                debug!(from = %candidate.url, to = %response.final_url, "indirection confirmed");
                confirmed(&candidate, &response)
            }
            Ok(Ok(response)) => {
                debug!(
                    url = %candidate.url,
                    status = response.status,
                    content_type = ?response.content_type(),
                    "indirection rejected"
                );
                candidate
            }
            Ok(Err(e)) => {
                warn!(url = %candidate.url, error = %e, "confirmation failed");
                candidate
            }
            Err(_) => {
                warn!(
                    url = %candidate.url,
                    timeout_secs = self.timeout.as_secs_f64(),
                    "confirmation timed out"
                );
                candidate
            }
        }
    }
}
