//! Textual page parsers
//!
//! Contains modules for the different things pulled out of a page body.

pub mod candidates;
pub mod challenge;
pub mod title;

pub use candidates::{
    collect_candidates, extract_license_code, extract_raw_references, normalize,
    normalize_references,
};
pub use challenge::{detect_challenge, detect_challenge_headers};
pub use title::extract_title;

/// A pure matcher over page text
pub type Matcher<T> = fn(&str) -> Option<T>;

/// Runs matchers in priority order and returns the first hit
///
/// A matcher returning `None` simply hands over to the next one.
pub fn first_match<T>(matchers: &[Matcher<T>], text: &str) -> Option<T> {
    matchers.iter().find_map(|matcher| matcher(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn never(_: &str) -> Option<String> {
        None
    }

    fn shout(text: &str) -> Option<String> {
        Some(text.to_uppercase())
    }

    fn echo(text: &str) -> Option<String> {
        Some(text.to_string())
    }

    #[test]
    fn test_first_match_short_circuits() {
        let matchers: [Matcher<String>; 3] = [never, shout, echo];
        assert_eq!(first_match(&matchers, "abc").as_deref(), Some("ABC"));
    }

    #[test]
    fn test_first_match_none() {
        let matchers: [Matcher<String>; 1] = [never];
        assert_eq!(first_match(&matchers, "abc"), None);
        assert_eq!(first_match::<String>(&[], "abc"), None);
    }
}
