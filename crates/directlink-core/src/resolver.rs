//! High-level resolver API
//!
//! Provides the main entry point: fetch a page, reject challenge pages,
//! extract candidates, confirm indirection links and pick the best URL.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::client::{ClientConfig, MediaClient};
use crate::error::{DirectlinkError, Result};
use crate::parser::{
    detect_challenge, detect_challenge_headers, extract_title, normalize, normalize_references,
};
use crate::ranking::{RankingContext, select_best};
use crate::router::{DEFAULT_CONFIRM_CONCURRENCY, DEFAULT_CONFIRM_TIMEOUT_SECS, ResolutionRouter};
use crate::sites::{DEFAULT_PLAYER_SOURCE_HOSTS, SiteProfile, SiteRegistry};
use crate::transport::{FetchRequest, Transport};
use crate::types::{Candidate, MediaResolution, RawPage, ResolvedMedia};

/// Configuration for the resolver pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Transport settings for the default client
    pub client: ClientConfig,
    /// Hosts whose candidates rank above foreign ones (subdomains included)
    pub preferred_hosts: Vec<String>,
    /// Hosts handled by the player-sources profile
    pub player_source_hosts: Vec<String>,
    /// Per-confirmation timeout in seconds (default: 10)
    pub confirm_timeout_secs: u64,
    /// Confirmations in flight (default: 4)
    pub confirm_concurrency: usize,
    /// Follow `/get_file/` links before ranking (default: true)
    pub confirm_indirection: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            preferred_hosts: Vec::new(),
            player_source_hosts: DEFAULT_PLAYER_SOURCE_HOSTS
                .iter()
                .map(|h| h.to_string())
                .collect(),
            confirm_timeout_secs: DEFAULT_CONFIRM_TIMEOUT_SECS,
            confirm_concurrency: DEFAULT_CONFIRM_CONCURRENCY,
            confirm_indirection: true,
        }
    }
}

/// Main resolver interface
///
/// Provides a high-level async API for turning a page URL (or an already
/// fetched page) into the best direct media URL.
///
/// # Example
/// ```no_run
/// use directlink_core::MediaResolver;
///
/// #[tokio::main]
/// async fn main() -> directlink_core::Result<()> {
///     let resolver = MediaResolver::new()?;
///     let record = resolver.resolve("https://example.com/videos/1/clip/").await;
///     println!("{}", serde_json::to_string(&record).unwrap_or_default());
///     Ok(())
/// }
/// ```
pub struct MediaResolver<T: Transport = MediaClient> {
    transport: T,
    registry: SiteRegistry,
    config: ResolverConfig,
}

impl MediaResolver<MediaClient> {
    /// Create a new resolver with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ResolverConfig::default())
    }

    /// Create a new resolver with custom configuration
    ///
    /// # Errors
    /// Fails when the HTTP client cannot be built (e.g. unreadable cookie file).
    pub fn with_config(config: ResolverConfig) -> Result<Self> {
        let client = MediaClient::with_config(config.client.clone())?;
        Ok(Self::with_transport(client, config))
    }
}

impl<T: Transport> MediaResolver<T> {
    /// Create a resolver on top of any transport
    pub fn with_transport(transport: T, config: ResolverConfig) -> Self {
        Self {
            transport,
            registry: SiteRegistry::new(config.player_source_hosts.clone()),
            config,
        }
    }

    /// Adds a site profile ahead of the generic one
    pub fn register_profile(&mut self, profile: Box<dyn SiteProfile>) {
        self.registry.register(profile);
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves a page URL into a result record
    ///
    /// Never fails; errors end up in the record's `error` field.
    pub async fn resolve(&self, url: &str) -> MediaResolution {
        let result = self.try_resolve(url).await;
        if let Err(e) = &result {
            warn!(url, error = %e, "resolution failed");
        }
        result.into()
    }

    /// Resolves a page URL
    ///
    /// Watch pages that only link to a player embed are followed once.
    ///
    /// # Errors
    /// - `InvalidUrl` - Empty or non-http(s) URL
    /// - `HttpError` / `Transport` - The page could not be fetched
    /// - `ChallengePage` - A bot-mitigation page was served
    /// - `NoCandidateFound` - No candidate on the page
    pub async fn try_resolve(&self, url: &str) -> Result<ResolvedMedia> {
        let page = self.fetch_page(url).await?;
        detect_challenge(&page.text)?;

        let profile = self.registry.profile_for(&page.url);
        if let Some(embed_url) = profile.embed_url(&page) {
            info!(page = %page.url, embed = %embed_url, "following player embed");
            let fallback_title = self.page_title(&page);
            let embed_page = self.fetch_page(&embed_url).await?;
            return self.resolve_with_title(&embed_page, fallback_title).await;
        }

        self.resolve_with_title(&page, None).await
    }

    /// Resolves an already fetched page
    ///
    /// Only indirection confirmations touch the network.
    pub async fn resolve_page(&self, page: &RawPage) -> Result<ResolvedMedia> {
        self.resolve_with_title(page, None).await
    }

    /// Extracts normalized candidates from a page without any network access
    ///
    /// Candidates are in first-seen order, site profile references first.
    pub fn extract_candidates(&self, page: &RawPage) -> Vec<Candidate> {
        let profile = self.registry.profile_for(&page.url);
        let references = profile.extract(&page.text);
        let candidates = normalize_references(references, &page.url);
        debug!(
            profile = profile.name(),
            page = %page.url,
            count = candidates.len(),
            "candidates extracted"
        );
        candidates
    }

    async fn resolve_with_title(
        &self,
        page: &RawPage,
        fallback_title: Option<String>,
    ) -> Result<ResolvedMedia> {
        detect_challenge(&page.text)?;

        let title = self.page_title(page).or(fallback_title);
        let mut candidates = self.extract_candidates(page);

        // Routing keeps positions, so the pick is tracked by index
        let pick_index = self
            .registry
            .profile_for(&page.url)
            .pick(&page.text)
            .and_then(|raw| normalize(&raw, &page.url))
            .and_then(|url| candidates.iter().position(|c| c.url == url));

        if self.config.confirm_indirection && !candidates.is_empty() {
            candidates = ResolutionRouter::new(&self.transport)
                .timeout(Duration::from_secs(self.config.confirm_timeout_secs))
                .concurrency(self.config.confirm_concurrency)
                .route(candidates, &page.url)
                .await;
        }

        let site_pick = pick_index
            .and_then(|index| candidates.get(index))
            .map(|candidate| candidate.url.clone());
        let candidates = dedup(candidates);
        let context = RankingContext::new(page.host(), self.config.preferred_hosts.clone())
            .with_site_pick(site_pick);

        let Some(best) = select_best(&candidates, &context) else {
            info!(page = %page.url, "no candidate");
            return Err(DirectlinkError::NoCandidateFound { title });
        };

        info!(page = %page.url, best = %best.url, candidates = candidates.len(), "media url selected");

        Ok(ResolvedMedia {
            best_url: best.url.clone(),
            candidates: candidates.iter().map(|c| c.url.clone()).collect(),
            title,
        })
    }

    fn page_title(&self, page: &RawPage) -> Option<String> {
        let profile = self.registry.profile_for(&page.url);
        extract_title(&page.text).map(|title| profile.clean_title(title))
    }

    /// Fetches a page, turning transport failures into errors
    async fn fetch_page(&self, url: &str) -> Result<RawPage> {
        let url = validate_url(url)?;
        let request = FetchRequest::new(url.clone(), Duration::from_secs(self.config.client.timeout_secs));

        let response = self.transport.fetch(request).await?;
        detect_challenge_headers(&response.headers)?;

        if !response.is_success() {
            detect_challenge(&response.body)?;
            return Err(DirectlinkError::Transport {
                status: response.status,
                url,
            });
        }

        let final_url = if response.final_url.is_empty() {
            url
        } else {
            response.final_url
        };
        debug!(url = %final_url, bytes = response.body.len(), "page fetched");
        Ok(RawPage::new(final_url, response.body))
    }
}

/// Checks that a URL is a non-empty absolute http(s) URL
fn validate_url(url: &str) -> Result<String> {
    let url = url.trim();
    if url.is_empty() {
        return Err(DirectlinkError::InvalidUrl("URL is empty".to_string()));
    }

    let parsed = Url::parse(url).map_err(|e| DirectlinkError::InvalidUrl(format!("{}: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(url.to_string()),
        scheme => Err(DirectlinkError::InvalidUrl(format!(
            "{}: unsupported scheme {}",
            url, scheme
        ))),
    }
}

/// Drops repeated URLs, keeping first-seen order
fn dedup(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|candidate| seen.insert(candidate.url.clone()))
        .collect()
}
