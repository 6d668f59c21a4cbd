//! Bot-mitigation page detection

use crate::error::{DirectlinkError, Result};

/// Body markers of an interstitial challenge page
pub const CHALLENGE_MARKERS: &[&str] = &["cf-mitigated", "Just a moment..."];

/// Response header set by the mitigation layer
pub const CHALLENGE_HEADER: &str = "cf-mitigated";

/// Fails with `ChallengePage` when the body is a challenge interstitial
pub fn detect_challenge(page_text: &str) -> Result<()> {
    match CHALLENGE_MARKERS
        .iter()
        .find(|marker| page_text.contains(*marker))
    {
        Some(marker) => Err(DirectlinkError::ChallengePage(marker.to_string())),
        None => Ok(()),
    }
}

/// Fails with `ChallengePage` when the response headers flag a challenge
pub fn detect_challenge_headers(headers: &[(String, String)]) -> Result<()> {
    match headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(CHALLENGE_HEADER))
    {
        Some((name, value)) => Err(DirectlinkError::ChallengePage(format!("{}: {}", name, value))),
        None => Ok(()),
    }
}
