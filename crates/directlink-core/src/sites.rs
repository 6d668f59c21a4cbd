//! Site profiles
//!
//! A [`SiteProfile`] knows how one family of pages declares its media.
//! The [`SiteRegistry`] picks the first profile matching the page URL and
//! always ends with [`GenericProfile`], which matches everything.

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::cmp::Reverse;
use std::sync::LazyLock;
use tracing::debug;

use crate::parser::{Matcher, extract_raw_references, first_match, normalize};
use crate::types::RawPage;
use crate::url::{host_matches, url_host};

/// Hosts served by [`PlayerSourcesProfile`] unless configured otherwise
pub const DEFAULT_PLAYER_SOURCE_HOSTS: &[&str] = &["pornoxo.com"];

static SOURCES_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)var\s+sources\s*=\s*(\[.*?\]);").ok());
static MULTI_SOURCE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"var\s+multiSource\s*=\s*'([^']*)'").ok());
static ABSOLUTE_EMBED_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"'<>/]+/embed/\d+/\d+/?"#).ok());
static ESCAPED_EMBED_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"embedUrl"\s*:\s*"(https?:\\/\\/[^"\s]+?\\/embed\\/\d+\\/\d+(?:\\/)?)""#).ok()
});
static RELATIVE_EMBED_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"/embed/\d+/\d+/?").ok());
static DESC_NUMBER_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\d+").ok());
static TITLE_PREFIX_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-z0-9-]+\.[a-z]{2,}\s+-\s+").ok());

/// Site-specific extraction rules
pub trait SiteProfile: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Whether this profile handles pages at `url`
    fn matches(&self, url: &str) -> bool;

    /// Raw references in priority order, not yet normalized
    fn extract(&self, page_text: &str) -> Vec<String>;

    /// Raw reference the page's player itself would play, if declared
    ///
    /// A pick wins ranking outright.
    fn pick(&self, _page_text: &str) -> Option<String> {
        None
    }

    /// Player page to fetch instead of `page`, if the page only links to it
    fn embed_url(&self, _page: &RawPage) -> Option<String> {
        None
    }

    /// Strips site boilerplate from a title
    fn clean_title(&self, title: String) -> String {
        title
    }
}

/// Catch-all profile running the plain candidate extractor
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericProfile;

impl SiteProfile for GenericProfile {
    fn name(&self) -> &str {
        "generic"
    }

    fn matches(&self, _url: &str) -> bool {
        true
    }

    fn extract(&self, page_text: &str) -> Vec<String> {
        extract_raw_references(page_text)
    }
}

/// One entry of a `var sources = [...]` declaration
#[derive(Debug, Deserialize)]
struct PlayerSource {
    src: String,
    #[serde(default)]
    desc: Option<Value>,
    #[serde(default)]
    active: Option<Value>,
}

impl PlayerSource {
    fn is_active(&self) -> bool {
        self.active
            .as_ref()
            .map(value_text)
            .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
    }

    /// First number in the description ("720p" is 720), 0 when absent
    fn quality(&self) -> u64 {
        let Some(desc) = self.desc.as_ref().map(value_text) else {
            return 0;
        };
        DESC_NUMBER_RE
            .as_ref()
            .and_then(|re| re.find(&desc))
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Embed players that declare their files in inline script variables
///
/// Understands `var multiSource = '...'` and
/// `var sources = [{"src": ..., "desc": ..., "active": ...}]`.
#[derive(Debug, Clone)]
pub struct PlayerSourcesProfile {
    hosts: Vec<String>,
}

impl PlayerSourcesProfile {
    pub fn new(hosts: Vec<String>) -> Self {
        Self { hosts }
    }

    fn multi_source(page_text: &str) -> Option<String> {
        let re = MULTI_SOURCE_RE.as_ref()?;
        let value = re.captures(page_text)?.get(1)?.as_str().trim();
        (!value.is_empty()).then(|| value.to_string())
    }

    /// Parsed player sources; malformed JSON counts as none
    fn sources(page_text: &str) -> Vec<PlayerSource> {
        let Some(raw) = SOURCES_RE
            .as_ref()
            .and_then(|re| re.captures(page_text))
            .and_then(|caps| caps.get(1))
        else {
            return Vec::new();
        };

        match serde_json::from_str::<Vec<Value>>(raw.as_str()) {
            Ok(entries) => entries
                .into_iter()
                .filter_map(|entry| serde_json::from_value(entry).ok())
                .collect(),
            Err(e) => {
                debug!(error = %e, "unparseable player sources");
                Vec::new()
            }
        }
    }

    fn declares_sources(page_text: &str) -> bool {
        Self::multi_source(page_text).is_some() || !Self::sources(page_text).is_empty()
    }

    /// Declared sources: multiSource, the active source, then by quality
    fn source_references(page_text: &str) -> Vec<String> {
        let mut references = Vec::new();

        if let Some(multi) = Self::multi_source(page_text) {
            references.push(multi);
        }

        let mut sources = Self::sources(page_text);
        if let Some(active) = sources.iter().find(|s| s.is_active()) {
            references.push(active.src.clone());
        }
        sources.sort_by_key(|s| Reverse(s.quality()));
        references.extend(sources.into_iter().map(|s| s.src));

        references
    }
}

impl Default for PlayerSourcesProfile {
    fn default() -> Self {
        Self::new(
            DEFAULT_PLAYER_SOURCE_HOSTS
                .iter()
                .map(|h| h.to_string())
                .collect(),
        )
    }
}

impl SiteProfile for PlayerSourcesProfile {
    fn name(&self) -> &str {
        "player-sources"
    }

    fn matches(&self, url: &str) -> bool {
        url_host(url).is_some_and(|host| self.hosts.iter().any(|h| host_matches(&host, h)))
    }

    fn extract(&self, page_text: &str) -> Vec<String> {
        let mut references = Self::source_references(page_text);
        debug!(count = references.len(), "player source references");
        references.extend(extract_raw_references(page_text));
        references
    }

    fn pick(&self, page_text: &str) -> Option<String> {
        Self::source_references(page_text).into_iter().next()
    }

    fn embed_url(&self, page: &RawPage) -> Option<String> {
        if page.url.contains("/embed/") || Self::declares_sources(&page.text) {
            return None;
        }

        let matchers: [Matcher<String>; 3] = [
            |text| Some(ABSOLUTE_EMBED_RE.as_ref()?.find(text)?.as_str().to_string()),
            |text| {
                let caps = ESCAPED_EMBED_RE.as_ref()?.captures(text)?;
                Some(caps.get(1)?.as_str().to_string())
            },
            |text| Some(RELATIVE_EMBED_RE.as_ref()?.find(text)?.as_str().to_string()),
        ];

        let raw = first_match(&matchers, &page.text)?;
        normalize(&raw, &page.url)
    }

    fn clean_title(&self, title: String) -> String {
        match TITLE_PREFIX_RE.as_ref() {
            Some(re) => {
                let cleaned = re.replace(&title, "").trim().to_string();
                if cleaned.is_empty() { title } else { cleaned }
            }
            None => title,
        }
    }
}

/// Ordered profile list, generic last
pub struct SiteRegistry {
    profiles: Vec<Box<dyn SiteProfile>>,
}

impl SiteRegistry {
    /// Registry with the built-in profiles
    pub fn new(player_source_hosts: Vec<String>) -> Self {
        Self {
            profiles: vec![
                Box::new(PlayerSourcesProfile::new(player_source_hosts)),
                Box::new(GenericProfile),
            ],
        }
    }

    /// Adds a profile ahead of the generic one
    pub fn register(&mut self, profile: Box<dyn SiteProfile>) {
        let position = self.profiles.len().saturating_sub(1);
        self.profiles.insert(position, profile);
    }

    /// First profile matching `url`
    pub fn profile_for(&self, url: &str) -> &dyn SiteProfile {
        self.profiles
            .iter()
            .find(|profile| profile.matches(url))
            .map(|profile| &**profile)
            .unwrap_or(&GenericProfile)
    }

    pub fn names(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.name()).collect()
    }
}

impl Default for SiteRegistry {
    fn default() -> Self {
        Self::new(
            DEFAULT_PLAYER_SOURCE_HOSTS
                .iter()
                .map(|h| h.to_string())
                .collect(),
        )
    }
}

impl std::fmt::Debug for SiteRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteRegistry")
            .field("profiles", &self.names())
            .finish()
    }
}
