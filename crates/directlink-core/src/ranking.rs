//! Candidate scoring and selection
//!
//! Every candidate gets a [`UrlFeatures`] value; features compare
//! lexicographically in field order, so the struct layout *is* the ranking
//! policy.

use serde::Serialize;

use crate::types::{Candidate, ContainerKind};
use crate::url::{host_matches, url_path};

/// Path markers of stills that happen to carry a media-looking name
const THUMBNAIL_MARKERS: &[&str] = &["thumb", "poster", "sprite"];

/// Ranking features of a candidate, higher is better
///
/// Field order is comparison priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct UrlFeatures {
    /// The site profile's own choice among the player's sources
    pub site_pick: bool,
    /// Known media container and not a thumbnail
    pub real_media: bool,
    /// Path does not mention `preview`
    pub not_preview: bool,
    /// Progressive file rather than a segmented manifest
    pub direct_file: bool,
    /// Served from the page's own host or a configured one
    pub preferred_host: bool,
    /// Vertical resolution from an "NNNp" label
    pub resolution: Option<u32>,
    /// Declared bitrate; any declared value beats none
    pub bitrate_kbps: Option<u32>,
}

/// Page-level inputs to scoring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankingContext {
    /// Host of the page the candidates came from
    pub page_host: Option<String>,
    /// Additional hosts to favor (subdomains included)
    pub preferred_hosts: Vec<String>,
    /// URL the site profile picked, outranking every other feature
    pub site_pick: Option<String>,
}

impl RankingContext {
    pub fn new(page_host: Option<String>, preferred_hosts: Vec<String>) -> Self {
        Self {
            page_host,
            preferred_hosts,
            site_pick: None,
        }
    }

    pub fn with_site_pick(mut self, site_pick: Option<String>) -> Self {
        self.site_pick = site_pick;
        self
    }

    fn is_preferred(&self, host: &str) -> bool {
        let page_match = self
            .page_host
            .as_deref()
            .is_some_and(|page| host_matches(host, page.trim_start_matches("www.")));

        page_match
            || self
                .preferred_hosts
                .iter()
                .any(|preferred| host_matches(host, preferred))
    }
}

/// Scores a URL or bare reference
pub fn score(url: &str, context: &RankingContext) -> UrlFeatures {
    score_candidate(&Candidate::new(url), context)
}

/// Scores an already built candidate
pub fn score_candidate(candidate: &Candidate, context: &RankingContext) -> UrlFeatures {
    let path = url_path(&candidate.url).to_ascii_lowercase();
    let is_thumbnail = THUMBNAIL_MARKERS.iter().any(|marker| path.contains(marker));

    UrlFeatures {
        site_pick: context.site_pick.as_deref() == Some(candidate.url.as_str()),
        real_media: candidate.container.is_media() && !is_thumbnail,
        not_preview: !path.contains("preview"),
        direct_file: candidate.container == ContainerKind::Progressive,
        preferred_host: candidate
            .host
            .as_deref()
            .is_some_and(|host| context.is_preferred(host)),
        resolution: candidate.resolution,
        bitrate_kbps: candidate.bitrate_kbps,
    }
}

/// Picks the highest scoring candidate
///
/// Ties go to the earliest candidate. Returns `None` for an empty slice.
///
/// # Example
/// ```
/// use directlink_core::ranking::{RankingContext, select_best};
/// use directlink_core::types::Candidate;
///
/// let candidates: Vec<Candidate> = ["a.jpg", "b_720p.mp4?br=1200", "c_480p.mp4?br=400"]
///     .into_iter()
///     .map(Candidate::new)
///     .collect();
/// let best = select_best(&candidates, &RankingContext::default()).unwrap();
/// assert_eq!(best.url, "b_720p.mp4?br=1200");
/// ```
pub fn select_best<'a>(
    candidates: &'a [Candidate],
    context: &RankingContext,
) -> Option<&'a Candidate> {
    let mut best: Option<(&Candidate, UrlFeatures)> = None;

    for candidate in candidates {
        let features = score_candidate(candidate, context);
        match best {
            Some((_, best_features)) if features <= best_features => {}
            _ => best = Some((candidate, features)),
        }
    }

    best.map(|(candidate, _)| candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn candidates(urls: &[&str]) -> Vec<Candidate> {
        urls.iter().map(|u| Candidate::new(*u)).collect()
    }

    fn best_of(urls: &[&str]) -> Option<String> {
        let list = candidates(urls);
        select_best(&list, &RankingContext::default()).map(|c| c.url.clone())
    }

    #[test]
    fn test_select_best_prefers_resolution() {
        assert_eq!(
            best_of(&["a.jpg", "b_720p.mp4?br=1200", "c_480p.mp4?br=400"]).as_deref(),
            Some("b_720p.mp4?br=1200")
        );
    }

    #[test]
    fn test_select_best_empty() {
        assert_eq!(best_of(&[]), None);
    }

    #[test]
    fn test_select_best_tie_keeps_first() {
        assert_eq!(
            best_of(&["https://a.com/x.mp4", "https://b.com/y.mp4"]).as_deref(),
            Some("https://a.com/x.mp4")
        );
    }

    #[test]
    fn test_real_media_beats_everything() {
        assert_eq!(
            best_of(&["https://h.com/poster_2160p.jpg", "https://h.com/embed/1", "https://h.com/low.m3u8"])
                .as_deref(),
            Some("https://h.com/low.m3u8")
        );
    }

    #[test]
    fn test_thumbnail_is_not_real_media() {
        let context = RankingContext::default();
        assert!(!score("https://h.com/thumbs/1_720p.mp4", &context).real_media);
        assert!(score("https://h.com/videos/1_720p.mp4", &context).real_media);
    }

    #[test]
    fn test_filename_parameter_counts_as_media() {
        let features = score("https://h.com/dl?id=9&filename=clip.mp4", &RankingContext::default());
        assert!(features.real_media);
        assert!(features.direct_file);
    }

    #[test]
    fn test_preview_loses_to_full_file() {
        assert_eq!(
            best_of(&["https://h.com/preview/clip_1080p.mp4", "https://h.com/clip_360p.mp4"]).as_deref(),
            Some("https://h.com/clip_360p.mp4")
        );
    }

    #[test]
    fn test_progressive_beats_manifest() {
        assert_eq!(
            best_of(&["https://h.com/master_1080p.m3u8", "https://h.com/clip_480p.mp4"]).as_deref(),
            Some("https://h.com/clip_480p.mp4")
        );
    }

    #[test]
    fn test_preferred_host_beats_quality() {
        let list = candidates(&[
            "https://mirror.other.net/clip_1080p.mp4",
            "https://cdn.example.com/clip_480p.mp4",
        ]);

        let context = RankingContext::new(Some("www.example.com".to_string()), vec![]);
        assert_eq!(
            select_best(&list, &context).map(|c| c.url.as_str()),
            Some("https://cdn.example.com/clip_480p.mp4")
        );

        let context = RankingContext::new(None, vec!["other.net".to_string()]);
        assert_eq!(
            select_best(&list, &context).map(|c| c.url.as_str()),
            Some("https://mirror.other.net/clip_1080p.mp4")
        );
    }

    #[test]
    fn test_site_pick_beats_quality() {
        let list = candidates(&[
            "https://cdn.example.com/v/master.m3u8",
            "https://cdn.example.com/v/clip_480p.mp4",
            "https://cdn.example.com/v/clip_1080p.mp4",
        ]);

        let context = RankingContext::default()
            .with_site_pick(Some("https://cdn.example.com/v/master.m3u8".to_string()));
        assert_eq!(
            select_best(&list, &context).map(|c| c.url.as_str()),
            Some("https://cdn.example.com/v/master.m3u8")
        );

        let context = RankingContext::default()
            .with_site_pick(Some("https://cdn.example.com/v/clip_480p.mp4".to_string()));
        assert_eq!(
            select_best(&list, &context).map(|c| c.url.as_str()),
            Some("https://cdn.example.com/v/clip_480p.mp4")
        );

        let context = RankingContext::default()
            .with_site_pick(Some("https://elsewhere.com/gone.mp4".to_string()));
        assert_eq!(
            select_best(&list, &context).map(|c| c.url.as_str()),
            Some("https://cdn.example.com/v/clip_1080p.mp4")
        );
    }

    #[test]
    fn test_bitrate_breaks_resolution_ties() {
        assert_eq!(
            best_of(&["https://h.com/a_720p.mp4", "https://h.com/b_720p.mp4?br=300", "https://h.com/c_720p.mp4?br=900"])
                .as_deref(),
            Some("https://h.com/c_720p.mp4?br=900")
        );
        assert_eq!(
            best_of(&["https://h.com/a.mp4", "https://h.com/b.mp4?br=1"]).as_deref(),
            Some("https://h.com/b.mp4?br=1")
        );
    }

    #[test]
    fn test_features_order_is_lexicographic() {
        let low = UrlFeatures {
            site_pick: false,
            real_media: true,
            not_preview: false,
            direct_file: true,
            preferred_host: true,
            resolution: Some(2160),
            bitrate_kbps: Some(99999),
        };
        let high = UrlFeatures {
            site_pick: false,
            real_media: true,
            not_preview: true,
            direct_file: false,
            preferred_host: false,
            resolution: None,
            bitrate_kbps: None,
        };
        assert!(high > low);
    }

    proptest! {
        #[test]
        fn prop_select_best_is_maximal(
            names in prop::collection::vec("[a-z]{1,6}(_[0-9]{3}p)?\\.(mp4|m3u8|jpg)(\\?br=[0-9]{1,4})?", 0..12)
        ) {
            let list: Vec<Candidate> = names.iter().map(|n| Candidate::new(n.as_str())).collect();
            let context = RankingContext::default();
            match select_best(&list, &context) {
                None => prop_assert!(list.is_empty()),
                Some(best) => {
                    let best_score = score_candidate(best, &context);
                    let first_index = list.iter().position(|c| score_candidate(c, &context) == best_score);
                    for candidate in &list {
                        prop_assert!(score_candidate(candidate, &context) <= best_score);
                    }
                    prop_assert_eq!(first_index.map(|i| &list[i]), Some(best));
                }
            }
        }
    }
}
