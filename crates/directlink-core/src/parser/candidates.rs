//! Candidate extraction for media pages
//!
//! Scans raw page text for URL-like references with regular expressions.
//! This is deliberately not a DOM parse: broken markup, inline scripts and
//! JSON blobs all go through the same textual patterns, and the ranker is
//! expected to absorb the false positives.

use regex::{Captures, Regex};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

use super::{Matcher, first_match};
use crate::cipher::{LicenseToken, OBFUSCATION_MARKER, apply_token, derive_token};
use crate::types::Candidate;
use crate::url::resolve_reference;

/// References containing one of these never become candidates
const BLOCKED_MARKERS: &[&str] = &[
    "doubleclick.net",
    "googlesyndication.com",
    "google-analytics.com",
    "adservice.",
    "/ads/",
    ".vtt",
    ".srt",
];

fn compile(pattern: &str) -> Option<Regex> {
    Regex::new(pattern).ok()
}

static META_PROPERTY_FIRST_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(
        r#"(?i)<meta[^>]+(?:property|name)\s*=\s*["'](?:og:video(?::secure_url|:url)?|twitter:player:stream)["'][^>]*?content\s*=\s*["']([^"']+)["']"#,
    )
});
static META_CONTENT_FIRST_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(
        r#"(?i)<meta[^>]+content\s*=\s*["']([^"']+)["'][^>]*?(?:property|name)\s*=\s*["'](?:og:video(?::secure_url|:url)?|twitter:player:stream)["']"#,
    )
});
static SOURCE_SRC_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r#"(?i)<source\b[^>]*?\ssrc\s*=\s*["']([^"']+)["']"#));
static VIDEO_SRC_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r#"(?i)<video\b[^>]*?\ssrc\s*=\s*["']([^"']+)["']"#));
static IFRAME_SRC_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r#"(?i)<iframe\b[^>]*?\ssrc\s*=\s*["']([^"']+)["']"#));
static PLAYER_VARIABLE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(r#"\b(?:video_url|video_alt_url[0-9]*)\s*:\s*["']([^"']+)["']"#)
});
static JSON_FIELD_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(
        r#"(?i)["']?\b(?:videoUrl|video_url|playback_url|stream_url|hlsUrl|hls_url|dash_url|contentUrl|hls|file|src|url)["']?\s*:\s*["']([^"'\s]+)["']"#,
    )
});
static BARE_MEDIA_URL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(
        r#"(?i)https?:(?:\\?/){2}[^\s"'<>]+?\.(?:mp4|m3u8|mpd|webm|mov|mkv|m4v|flv)\b[^\s"'<>]*"#,
    )
});
static LICENSE_CODE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r#"license_code["']?\s*[:=]\s*["']([^"']+)["']"#));
static JSON_UNICODE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"\\u([0-9a-fA-F]{4})"));

/// Reference matchers in priority order
const REFERENCE_MATCHERS: &[(&str, fn(&str) -> Vec<String>)] = &[
    ("meta-video", match_meta_video),
    ("media-element", match_media_elements),
    ("player-variable", match_player_variables),
    ("json-field", match_json_fields),
    ("bare-media-url", match_bare_media_urls),
];

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Finds the license code that keys obfuscated player URLs
///
/// Looks for `license_code: '...'` (or `=`, quoted key, either quote style).
pub fn extract_license_code(page_text: &str) -> Option<String> {
    let matchers: [Matcher<String>; 1] = [|text| {
        let re = LICENSE_CODE_RE.as_ref()?;
        let code = re.captures(text)?.get(1)?.as_str().trim();
        (!code.is_empty()).then(|| code.to_string())
    }];
    first_match(&matchers, page_text)
}

/// Collects raw URL-like references in priority order
///
/// Order: metadata video tags, `<source>`/`<video>`/`<iframe>` sources,
/// player variables (decoding obfuscated ones), JSON-like fields, then bare
/// media URLs. Values are returned as found, not yet normalized.
pub fn extract_raw_references(page_text: &str) -> Vec<String> {
    let mut references = Vec::new();

    for (name, matcher) in REFERENCE_MATCHERS {
        let found = matcher(page_text);
        debug!(pattern = *name, count = found.len(), "reference pattern matched");
        references.extend(found);
    }

    references
}

/// Normalizes a raw reference into an absolute URL
///
/// Unescapes JSON string escapes and HTML entities until nothing changes,
/// trims, resolves protocol-relative and root-relative forms against
/// `base_url`, and rejects anything that is not absolute afterwards.
/// Normalizing an already normalized URL returns it unchanged.
///
/// # Example
/// ```
/// use directlink_core::parser::normalize;
/// assert_eq!(
///     normalize("\\/path\\/to\\u0026x", "https://h/").as_deref(),
///     Some("https://h/path/to&x")
/// );
/// ```
pub fn normalize(raw: &str, base_url: &str) -> Option<String> {
    let decoded = unescape_fully(raw);
    let value = decoded.trim();
    if value.is_empty() {
        return None;
    }
    resolve_reference(value, base_url)
}

/// Normalizes, filters and deduplicates raw references
///
/// First-seen order is preserved.
pub fn normalize_references<I>(raw: I, base_url: &str) -> Vec<Candidate>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for reference in raw {
        let Some(url) = normalize(&reference, base_url) else {
            continue;
        };
        if is_blocked(&url) {
            continue;
        }
        if seen.insert(url.clone()) {
            candidates.push(Candidate::new(url));
        }
    }

    candidates
}

/// Extracts and normalizes every candidate on a page
///
/// Never fails; an empty or unrelated page yields an empty list.
pub fn collect_candidates(page_text: &str, base_url: &str) -> Vec<Candidate> {
    normalize_references(extract_raw_references(page_text), base_url)
}

// ---------------------------------------------------------------------------
// Reference matchers
// ---------------------------------------------------------------------------

fn captures_of(re: &LazyLock<Option<Regex>>, text: &str) -> Vec<String> {
    let Some(re) = re.as_ref() else {
        return Vec::new();
    };
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

fn match_meta_video(text: &str) -> Vec<String> {
    let mut found = captures_of(&META_PROPERTY_FIRST_RE, text);
    found.extend(captures_of(&META_CONTENT_FIRST_RE, text));
    found
}

fn match_media_elements(text: &str) -> Vec<String> {
    [&SOURCE_SRC_RE, &VIDEO_SRC_RE, &IFRAME_SRC_RE]
        .into_iter()
        .flat_map(|re| captures_of(re, text))
        .collect()
}

/// Player variables such as `video_url: 'function/0/https://...'`
///
/// Obfuscated values are decoded with the page's license token. Without a
/// usable license code only the obfuscated values are skipped.
fn match_player_variables(text: &str) -> Vec<String> {
    let values = captures_of(&PLAYER_VARIABLE_RE, text);
    if values.is_empty() {
        return values;
    }

    let mut token: Option<Option<LicenseToken>> = None;
    let mut found = Vec::with_capacity(values.len());

    for value in values {
        if !value.starts_with(OBFUSCATION_MARKER) {
            found.push(value);
            continue;
        }

        let token = token.get_or_insert_with(|| page_token(text));
        if let Some(token) = token {
            found.push(apply_token(&value, token));
        }
    }

    found
}

fn page_token(text: &str) -> Option<LicenseToken> {
    let Some(code) = extract_license_code(text) else {
        debug!("obfuscated player url without license code");
        return None;
    };

    match derive_token(&code) {
        Ok(token) => Some(token),
        Err(e) => {
            debug!(error = %e, "skipping obfuscated player urls");
            None
        }
    }
}

fn match_json_fields(text: &str) -> Vec<String> {
    captures_of(&JSON_FIELD_RE, text)
}

/// Bare media URLs anywhere in the text, JSON-escaped or not
///
/// URLs embedded right after the obfuscation marker are left to the player
/// variable matcher.
fn match_bare_media_urls(text: &str) -> Vec<String> {
    let Some(re) = BARE_MEDIA_URL_RE.as_ref() else {
        return Vec::new();
    };
    re.find_iter(text)
        .filter(|m| !text[..m.start()].ends_with(OBFUSCATION_MARKER))
        .map(|m| m.as_str().trim_end_matches('\\').to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Normalization helpers
// ---------------------------------------------------------------------------

/// Undoes JSON string escaping (`\/` and `\uXXXX`)
/// Applies JSON and HTML unescaping until the value is stable
///
/// Each round either shrinks the value or leaves it unchanged.
fn unescape_fully(raw: &str) -> String {
    let mut value = raw.to_string();
    loop {
        let unescaped = unescape_json(&value);
        let decoded = html_escape::decode_html_entities(&unescaped).into_owned();
        if decoded == value {
            return value;
        }
        value = decoded;
    }
}

fn unescape_json(value: &str) -> String {
    let value = value.replace("\\/", "/");
    let Some(re) = JSON_UNICODE_RE.as_ref() else {
        return value;
    };
    re.replace_all(&value, |caps: &Captures| {
        u32::from_str_radix(&caps[1], 16)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}

fn is_blocked(url: &str) -> bool {
    let lowered = url.to_ascii_lowercase();
    BLOCKED_MARKERS.iter().any(|marker| lowered.contains(marker))
}
