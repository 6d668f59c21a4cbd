//! URL helper functions
//!
//! Small string-level helpers shared by extraction, ranking and routing.
//! They work on absolute URLs as well as on bare relative references
//! (e.g. `clip_720p.mp4?br=1200`), which is why most of them avoid a full parse.

use regex::Regex;
use reqwest::Url;
use std::sync::LazyLock;

/// Progressive (single file) media extensions
pub const PROGRESSIVE_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "mkv", "m4v", "flv", "avi", "wmv"];

/// Segmented manifest extensions
pub const SEGMENTED_EXTENSIONS: &[&str] = &["m3u8", "mpd"];

/// Image extensions that never count as playable media
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "svg", "avif", "ico"];

static RESOLUTION_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|[^0-9])(\d{3,4})p(?:[^a-z]|$)").ok());

/// Checks whether a string is an absolute http(s) URL
pub fn is_absolute(url: &str) -> bool {
    let lowered = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lowered.starts_with("http://") || lowered.starts_with("https://")
}

/// Resolves a reference against the page URL
///
/// Protocol-relative references (`//host/x`) get `https:`, root-relative
/// references (`/x`) are joined onto `base_url`. Anything that does not end
/// up absolute is rejected.
///
/// # Example
/// ```
/// use directlink_core::url::resolve_reference;
/// assert_eq!(
///     resolve_reference("/v/a.mp4", "https://example.com/watch/1").as_deref(),
///     Some("https://example.com/v/a.mp4")
/// );
/// assert_eq!(resolve_reference("a.mp4", "https://example.com/"), None);
/// ```
pub fn resolve_reference(value: &str, base_url: &str) -> Option<String> {
    if let Some(rest) = value.strip_prefix("//") {
        return Some(format!("https://{}", rest));
    }

    if value.starts_with('/') {
        let base = Url::parse(base_url).ok()?;
        let joined = base.join(value).ok()?;
        return Some(joined.to_string());
    }

    if is_absolute(value) {
        return Some(value.to_string());
    }

    None
}

/// Returns the lowercase host of an absolute URL
pub fn url_host(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed.host_str().map(|h| h.to_ascii_lowercase())
}

/// Checks whether `host` equals `domain` or is one of its subdomains
pub fn host_matches(host: &str, domain: &str) -> bool {
    let domain = domain.trim_start_matches('.').to_ascii_lowercase();
    if domain.is_empty() {
        return false;
    }
    let host = host.to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{}", domain))
}

/// Returns the path portion of a URL or bare reference
///
/// Scheme, authority, query and fragment are stripped.
pub fn url_path(url: &str) -> &str {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let without_query = without_fragment.split('?').next().unwrap_or(without_fragment);

    match without_query.find("://") {
        Some(scheme_end) => {
            let after_scheme = &without_query[scheme_end + 3..];
            match after_scheme.find('/') {
                Some(path_start) => &after_scheme[path_start..],
                None => "",
            }
        }
        None => without_query,
    }
}

/// Returns the decoded value of a query parameter
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let query = without_fragment.split_once('?')?.1;

    for param in query.split('&') {
        let (key, value) = param.split_once('=').unwrap_or((param, ""));
        if key.eq_ignore_ascii_case(name) {
            let value = value.replace('+', " ");
            return Some(
                urlencoding::decode(&value)
                    .map(|v| v.into_owned())
                    .unwrap_or(value),
            );
        }
    }
    None
}

/// Extracts the lowercase media extension of a URL
///
/// The `filename=` query parameter wins over the path, since CDNs
/// often serve opaque paths with the real name in the query. Trailing
/// slashes on the path are ignored.
///
/// # Example
/// ```
/// use directlink_core::url::media_extension;
/// assert_eq!(media_extension("https://cdn.example.com/a/clip.MP4/").as_deref(), Some("mp4"));
/// assert_eq!(media_extension("https://cdn.example.com/f?filename=Movie.mkv").as_deref(), Some("mkv"));
/// assert_eq!(media_extension("https://cdn.example.com/watch"), None);
/// ```
pub fn media_extension(url: &str) -> Option<String> {
    if let Some(filename) = query_param(url, "filename")
        && let Some(ext) = extension_of(&filename)
    {
        return Some(ext);
    }

    let last_segment = url_path(url)
        .split('/')
        .rev()
        .find(|segment| !segment.is_empty())?;
    extension_of(last_segment)
}

fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > 5 {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Checks whether an extension is one of the known playable media types
pub fn is_media_extension(ext: &str) -> bool {
    PROGRESSIVE_EXTENSIONS.contains(&ext) || SEGMENTED_EXTENSIONS.contains(&ext)
}

/// Finds a resolution label like "720p" or "2160p" in freeform text
pub fn parse_resolution(text: &str) -> Option<u32> {
    let caps = RESOLUTION_RE.as_ref()?.captures(text)?;
    caps.get(1)?.as_str().parse::<u32>().ok()
}

/// Parses a declared bitrate in kbps from the `br` or `bitrate` query parameter
pub fn parse_bitrate_kbps(url: &str) -> Option<u32> {
    ["br", "bitrate"]
        .iter()
        .filter_map(|name| query_param(url, name))
        .find_map(|value| {
            let digits: String = value.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse::<u32>().ok()
        })
}
