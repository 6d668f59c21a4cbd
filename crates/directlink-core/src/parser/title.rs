//! Page title parser
//!
//! Pulls a human readable title out of the page head.

use scraper::{Html, Selector};

/// Title sources in priority order, with the attribute holding the value
/// (`None` means the element text)
const TITLE_SOURCES: &[(&str, Option<&str>)] = &[
    (r#"meta[property="og:title"]"#, Some("content")),
    (r#"meta[name="twitter:title"]"#, Some("content")),
    ("title", None),
];

/// Extracts the page title
///
/// Tries `og:title`, then `twitter:title`, then `<title>`. Whitespace is
/// collapsed; an empty title counts as absent.
///
/// # Example
/// ```
/// use directlink_core::parser::extract_title;
/// let html = r#"<html><head><title>  My   Clip </title></head></html>"#;
/// assert_eq!(extract_title(html).as_deref(), Some("My Clip"));
/// ```
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    TITLE_SOURCES.iter().find_map(|(selector, attr)| {
        let selector = Selector::parse(selector).ok()?;
        document.select(&selector).find_map(|element| {
            let raw = match attr {
                Some(attr) => element.value().attr(attr)?.to_string(),
                None => element.text().collect::<String>(),
            };
            let title = collapse_whitespace(&raw);
            (!title.is_empty()).then_some(title)
        })
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_title_prefers_og_title() {
        let html = r#"
            <html><head>
                <title>Fallback | Site</title>
                <meta name="twitter:title" content="Twitter Title">
                <meta property="og:title" content="Open Graph Title">
            </head></html>
        "#;
        assert_eq!(extract_title(html).as_deref(), Some("Open Graph Title"));
    }

    #[test]
    fn test_extract_title_twitter_fallback() {
        let html = r#"
            <html><head>
                <title>Fallback</title>
                <meta name="twitter:title" content="Twitter Title">
            </head></html>
        "#;
        assert_eq!(extract_title(html).as_deref(), Some("Twitter Title"));
    }

    #[test]
    fn test_extract_title_skips_empty_meta() {
        let html = r#"
            <html><head>
                <meta property="og:title" content="   ">
                <title>
                    Real
                    Title
                </title>
            </head></html>
        "#;
        assert_eq!(extract_title(html).as_deref(), Some("Real Title"));
    }

    #[test]
    fn test_extract_title_absent() {
        assert_eq!(extract_title("<html><head></head><body></body></html>"), None);
        assert_eq!(extract_title("<title></title>"), None);
        assert_eq!(extract_title(""), None);
    }

    #[test]
    fn test_extract_title_decodes_entities() {
        let html = r#"<meta property="og:title" content="Tom &amp; Jerry">"#;
        assert_eq!(extract_title(html).as_deref(), Some("Tom & Jerry"));
    }
}
