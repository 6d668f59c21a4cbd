//! Core data types for the directlink resolver
//!
//! Contains the page input, the candidate model and the result record.

use serde::{Deserialize, Serialize};

use crate::error::{DirectlinkError, Result};
use crate::url::{
    IMAGE_EXTENSIONS, PROGRESSIVE_EXTENSIONS, SEGMENTED_EXTENSIONS, media_extension,
    parse_bitrate_kbps, parse_resolution, url_host,
};

/// An already fetched page together with its canonical URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    /// Canonical page URL, used as the base for relative references
    pub url: String,

    /// Page body as text
    pub text: String,
}

impl RawPage {
    pub fn new(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            text: text.into(),
        }
    }

    /// Lowercase host of the page URL
    pub fn host(&self) -> Option<String> {
        url_host(&self.url)
    }
}

/// Container type derived from the candidate's extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    /// Single downloadable file (mp4, webm, ...)
    Progressive,
    /// Segmented manifest (HLS, DASH)
    Segmented,
    /// Still image, usually a poster or thumbnail
    Image,
    /// No recognizable extension (embed pages, redirectors)
    Unknown,
}

impl ContainerKind {
    /// Classifies a lowercase extension
    pub fn from_extension(ext: Option<&str>) -> Self {
        match ext {
            Some(ext) if PROGRESSIVE_EXTENSIONS.contains(&ext) => ContainerKind::Progressive,
            Some(ext) if SEGMENTED_EXTENSIONS.contains(&ext) => ContainerKind::Segmented,
            Some(ext) if IMAGE_EXTENSIONS.contains(&ext) => ContainerKind::Image,
            _ => ContainerKind::Unknown,
        }
    }

    /// Whether the container is something a player can open
    pub fn is_media(self) -> bool {
        matches!(self, ContainerKind::Progressive | ContainerKind::Segmented)
    }
}

/// A normalized media URL candidate with its derived features
///
/// Built once from an absolute URL and never mutated afterwards.
/// Equality is by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    /// The candidate URL
    pub url: String,

    /// Container type from the extension (or `filename=` parameter)
    pub container: ContainerKind,

    /// Resolution hint from an "NNNp" label (e.g. 720)
    pub resolution: Option<u32>,

    /// Declared bitrate in kbps from the query string
    pub bitrate_kbps: Option<u32>,

    /// Lowercase host, absent for non-absolute references
    pub host: Option<String>,
}

impl Candidate {
    /// Builds a candidate and derives its features from the URL
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let extension = media_extension(&url);
        Self {
            container: ContainerKind::from_extension(extension.as_deref()),
            resolution: parse_resolution(&url),
            bitrate_kbps: parse_bitrate_kbps(&url),
            host: url_host(&url),
            url,
        }
    }

    /// Overrides the container derived from the URL
    ///
    /// Used when a response header says more than the URL does.
    pub fn with_container(mut self, container: ContainerKind) -> Self {
        self.container = container;
        self
    }
}

/// Successful pipeline output before it is flattened into a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
    /// Best ranked candidate
    pub best_url: String,

    /// Every candidate in first-seen order
    pub candidates: Vec<String>,

    /// Page title, if one was found
    pub title: Option<String>,
}

/// Result record returned to callers
///
/// `best_url` and `error` are mutually exclusive; `title` may accompany
/// an error. Absent fields are skipped when serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaResolution {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_url: Option<String>,

    #[serde(default)]
    pub all_candidates: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MediaResolution {
    /// Record for a failed resolution
    pub fn failed(error: &DirectlinkError) -> Self {
        Self {
            best_url: None,
            all_candidates: Vec::new(),
            title: error.title().map(str::to_string),
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.best_url.is_some()
    }
}

impl From<ResolvedMedia> for MediaResolution {
    fn from(media: ResolvedMedia) -> Self {
        Self {
            best_url: Some(media.best_url),
            all_candidates: media.candidates,
            title: media.title,
            error: None,
        }
    }
}

impl From<Result<ResolvedMedia>> for MediaResolution {
    fn from(result: Result<ResolvedMedia>) -> Self {
        match result {
            Ok(media) => media.into(),
            Err(error) => MediaResolution::failed(&error),
        }
    }
}
