//! License token cipher for obfuscated player URLs
//!
//! Some hosting players publish their file URLs as `function/0/<url>` and
//! scramble the 32-character hash segment of the path. The scramble is keyed
//! by a numeric license code embedded in the same page: the code is turned
//! into a digit token, the token drives a sequence of index swaps, and the
//! resulting permutation restores the real hash.
//!
//! The transform only runs in the decoding direction. It is not self-inverse.

use crate::error::{DirectlinkError, Result};

/// Prefix marking an obfuscated player URL
pub const OBFUSCATION_MARKER: &str = "function/0/";

/// Length of the scrambled hash segment
pub const HASH_LENGTH: usize = 32;

/// Index of the hash segment in `path.split('/')` (the leading empty segment counts)
const HASH_SEGMENT: usize = 3;

/// Digit token derived from a license code
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LicenseToken(Vec<u8>);

impl LicenseToken {
    /// Token digits, each in `0..=9`
    pub fn digits(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Digit at `index`, or 0 past the end of the token
    fn digit_or_zero(&self, index: usize) -> usize {
        self.0.get(index).copied().map(usize::from).unwrap_or(0)
    }
}

impl std::fmt::Display for LicenseToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for digit in &self.0 {
            write!(f, "{}", digit)?;
        }
        Ok(())
    }
}

/// Derives the digit token from a license code
///
/// Any `$` is ignored. Zeros are promoted to ones for the half split,
/// the halves overlap on the center digit, and the difference drives a
/// digit-wise offset of the original code.
///
/// # Errors
/// `InvalidLicenseCode` when the code is empty, has non-digit characters,
/// overflows, or is too short for the offsets the difference requires.
///
/// # Example
/// ```
/// use directlink_core::cipher::derive_token;
/// let token = derive_token("12345678").unwrap();
/// assert_eq!(token.to_string(), "34568901901201233456");
/// ```
pub fn derive_token(license_code: &str) -> Result<LicenseToken> {
    let code = license_code.trim().replace('$', "");
    if code.is_empty() {
        return Err(DirectlinkError::InvalidLicenseCode(
            "license code is empty".to_string(),
        ));
    }

    let digits: Vec<u8> = code
        .chars()
        .map(|c| c.to_digit(10).map(|d| d as u8))
        .collect::<Option<_>>()
        .ok_or_else(|| {
            DirectlinkError::InvalidLicenseCode(format!("non-digit character in {:?}", code))
        })?;

    let promoted = code.replace('0', "1");
    let center = promoted.len() / 2;
    let front = parse_half(&promoted[..=center])?;
    let back = parse_half(&promoted[center..])?;

    let diff = front
        .abs_diff(back)
        .checked_mul(4)
        .ok_or_else(|| DirectlinkError::InvalidLicenseCode("difference overflows".to_string()))?;
    let diff_digits = diff.to_string();
    let modlicense = &diff_digits[..diff_digits.len().min(center + 1)];

    let highest = modlicense.len() - 1 + 3;
    if highest >= digits.len() {
        return Err(DirectlinkError::InvalidLicenseCode(format!(
            "{} digits are too few, need at least {}",
            digits.len(),
            highest + 1
        )));
    }

    let mut token = Vec::with_capacity(modlicense.len() * 4);
    for (index, current) in modlicense.bytes().enumerate() {
        let current = current - b'0';
        for offset in 0..4 {
            token.push((digits[index + offset] + current) % 10);
        }
    }

    Ok(LicenseToken(token))
}

fn parse_half(half: &str) -> Result<u128> {
    half.parse::<u128>().map_err(|_| {
        DirectlinkError::InvalidLicenseCode(format!("{} digits overflow", half.len()))
    })
}

/// Builds the hash permutation driven by a token
///
/// Walks `src` from 31 down to 0, accumulating token digits and swapping
/// `src` with `(src + accumulator) % 32`. Token positions past its end add 0.
pub fn permutation(token: &LicenseToken) -> [usize; HASH_LENGTH] {
    let mut indices: [usize; HASH_LENGTH] = std::array::from_fn(|i| i);
    let mut accumulator = 0usize;

    for src in (0..HASH_LENGTH).rev() {
        accumulator += token.digit_or_zero(src);
        let dest = (src + accumulator) % HASH_LENGTH;
        indices.swap(src, dest);
    }

    indices
}

/// Restores the real URL behind an obfuscated player reference
///
/// URLs without the `function/0/` marker are returned unchanged. Marked URLs
/// lose the marker; when the path has a hash segment of at least 32
/// characters in fourth position, its first 32 characters are permuted and
/// the rest of the URL is kept verbatim. Malformed paths pass through
/// marker-stripped.
///
/// # Example
/// ```
/// use directlink_core::cipher::{apply_token, derive_token};
/// let token = derive_token("12345678").unwrap();
/// let url = apply_token(
///     "function/0/https://cdn.example.com/get_file/1/0123456789abcdefghijklmnopqrstuv/1/1.mp4/",
///     &token,
/// );
/// assert_eq!(
///     url,
///     "https://cdn.example.com/get_file/1/fdvgqp18hcb67e5420taklmnoj9rsiu3/1/1.mp4/"
/// );
/// ```
pub fn apply_token(url: &str, token: &LicenseToken) -> String {
    let Some(stripped) = url.strip_prefix(OBFUSCATION_MARKER) else {
        return url.to_string();
    };

    let (prefix, path, tail) = split_path(stripped);
    let mut segments: Vec<&str> = path.split('/').collect();
    let Some(segment) = segments.get(HASH_SEGMENT).copied() else {
        return stripped.to_string();
    };

    let chars: Vec<char> = segment.chars().collect();
    if chars.len() < HASH_LENGTH {
        return stripped.to_string();
    }

    let indices = permutation(token);
    let mut realized: String = indices.iter().map(|&i| chars[i]).collect();
    realized.extend(&chars[HASH_LENGTH..]);

    segments[HASH_SEGMENT] = &realized;
    format!("{}{}{}", prefix, segments.join("/"), tail)
}

/// Derives the token for `license_code` and applies it to `url`
///
/// Unmarked URLs are returned untouched without looking at the code.
pub fn decode_obfuscated(url: &str, license_code: &str) -> Result<String> {
    if !url.starts_with(OBFUSCATION_MARKER) {
        return Ok(url.to_string());
    }
    let token = derive_token(license_code)?;
    Ok(apply_token(url, &token))
}

/// Splits a URL into (scheme + authority, path, query + fragment)
fn split_path(url: &str) -> (&str, &str, &str) {
    let path_start = match url.find("://") {
        Some(scheme_end) => {
            let authority_start = scheme_end + 3;
            url[authority_start..]
                .find(['/', '?', '#'])
                .map(|i| authority_start + i)
                .unwrap_or(url.len())
        }
        None => 0,
    };

    let path_end = url[path_start..]
        .find(['?', '#'])
        .map(|i| path_start + i)
        .unwrap_or(url.len());

    (
        &url[..path_start],
        &url[path_start..path_end],
        &url[path_end..],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const HASH: &str = "0123456789abcdefghijklmnopqrstuv";

    // -----------------------------------------------------------------------
    // derive_token
    // -----------------------------------------------------------------------

    #[test]
    fn test_derive_token_short_code() {
        let token = derive_token("12345678").unwrap();
        assert_eq!(token.to_string(), "34568901901201233456");
        assert_eq!(token.len(), 20);
    }

    #[test]
    fn test_derive_token_full_length_code() {
        let token = derive_token("$520413513531335").unwrap();
        assert_eq!(token.to_string(), "63157596485785795795351351357919");
        assert_eq!(token.len(), 32);
    }

    #[test]
    fn test_derive_token_with_zeros() {
        let token = derive_token("1020304050607080").unwrap();
        assert_eq!(token.to_string(), "324246474252030485956061394938391626");
        // center = 8, so 4 * (8 + 1) digits
        assert_eq!(token.len(), 36);
    }

    #[test]
    fn test_derive_token_rejects_empty() {
        assert!(matches!(
            derive_token(""),
            Err(DirectlinkError::InvalidLicenseCode(_))
        ));
        assert!(matches!(
            derive_token("$"),
            Err(DirectlinkError::InvalidLicenseCode(_))
        ));
    }

    #[test]
    fn test_derive_token_ignores_every_dollar() {
        let plain = derive_token("520413513531335").unwrap();
        assert_eq!(derive_token("$520413513531335").unwrap(), plain);
        assert_eq!(derive_token("$5204135$1353133$5").unwrap(), plain);
    }

    #[test]
    fn test_derive_token_rejects_non_digits() {
        assert!(matches!(
            derive_token("12a45678"),
            Err(DirectlinkError::InvalidLicenseCode(_))
        ));
    }

    #[test]
    fn test_derive_token_rejects_too_short() {
        // "12": center 1, difference "40" needs digits up to index 4
        assert!(matches!(
            derive_token("12"),
            Err(DirectlinkError::InvalidLicenseCode(_))
        ));
        assert!(matches!(
            derive_token("7"),
            Err(DirectlinkError::InvalidLicenseCode(_))
        ));
    }

    #[test]
    fn test_derive_token_rejects_overflow() {
        let code = "9".repeat(90);
        assert!(matches!(
            derive_token(&code),
            Err(DirectlinkError::InvalidLicenseCode(_))
        ));
    }

    // -----------------------------------------------------------------------
    // permutation / apply_token
    // -----------------------------------------------------------------------

    #[test]
    fn test_permutation_golden() {
        let token = derive_token("12345678").unwrap();
        assert_eq!(
            permutation(&token),
            [
                15, 13, 31, 16, 26, 25, 1, 8, 17, 12, 11, 6, 7, 14, 5, 4, 2, 0, 29, 10, 20, 21,
                22, 23, 24, 19, 9, 27, 28, 18, 30, 3
            ]
        );
    }

    #[test]
    fn test_apply_token_golden_short_code() {
        let token = derive_token("12345678").unwrap();
        let url = format!(
            "function/0/https://cdn.example.com/get_file/1/{}/1000/1000_720p.mp4/?br=1200",
            HASH
        );
        assert_eq!(
            apply_token(&url, &token),
            "https://cdn.example.com/get_file/1/fdvgqp18hcb67e5420taklmnoj9rsiu3/1000/1000_720p.mp4/?br=1200"
        );
    }

    #[test]
    fn test_apply_token_golden_full_code() {
        let url = "function/0/https://cdn.example.com/get_file/3/9f8e7d6c5b4a39281706f5e4d3c2b1a0/12000/12345/12345.mp4/";
        assert_eq!(
            decode_obfuscated(url, "$520413513531335").unwrap(),
            "https://cdn.example.com/get_file/3/01e9b3794ffb8d65cea30642827cda15/12000/12345/12345.mp4/"
        );
    }

    #[test]
    fn test_apply_token_keeps_hash_suffix() {
        let token = derive_token("12345678").unwrap();
        let url = format!("function/0/https://h.com/get_file/1/{}XYZ/a.mp4", HASH);
        let decoded = apply_token(&url, &token);
        assert!(decoded.ends_with("taklmnoj9rsiu3XYZ/a.mp4"));
    }

    #[test]
    fn test_apply_token_without_marker_is_unchanged() {
        let token = derive_token("12345678").unwrap();
        let url = format!("https://h.com/get_file/1/{}/a.mp4", HASH);
        assert_eq!(apply_token(&url, &token), url);
    }

    #[test]
    fn test_apply_token_short_path_passthrough() {
        let token = derive_token("12345678").unwrap();
        assert_eq!(
            apply_token("function/0/https://h.com/a.mp4", &token),
            "https://h.com/a.mp4"
        );
    }

    #[test]
    fn test_apply_token_short_hash_passthrough() {
        let token = derive_token("12345678").unwrap();
        assert_eq!(
            apply_token("function/0/https://h.com/get_file/1/abc/a.mp4", &token),
            "https://h.com/get_file/1/abc/a.mp4"
        );
    }

    #[test]
    fn test_decode_obfuscated_skips_invalid_code_for_plain_url() {
        let url = "https://h.com/v.mp4";
        assert_eq!(decode_obfuscated(url, "").unwrap(), url);
    }

    #[test]
    fn test_decode_obfuscated_invalid_code() {
        let url = format!("function/0/https://h.com/get_file/1/{}/a.mp4", HASH);
        assert!(matches!(
            decode_obfuscated(&url, "12"),
            Err(DirectlinkError::InvalidLicenseCode(_))
        ));
    }

    #[test]
    fn test_split_path() {
        assert_eq!(
            split_path("https://h.com/a/b?x=1#f"),
            ("https://h.com", "/a/b", "?x=1#f")
        );
        assert_eq!(split_path("https://h.com"), ("https://h.com", "", ""));
        assert_eq!(split_path("/a/b"), ("", "/a/b", ""));
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    proptest! {
        #[test]
        fn prop_token_is_deterministic(code in "[1-9][0-9]{5,20}") {
            let first = derive_token(&code);
            let second = derive_token(&code);
            prop_assert_eq!(first.ok(), second.ok());
        }

        #[test]
        fn prop_token_length_follows_center(code in "[1-9][0-9]{5,20}") {
            if let Ok(token) = derive_token(&code) {
                let center = code.len() / 2;
                prop_assert!(token.len() <= 4 * (center + 1));
                prop_assert_eq!(token.len() % 4, 0);
                prop_assert!(token.digits().iter().all(|d| *d <= 9));
            }
        }

        #[test]
        fn prop_permutation_is_bijective(digits in proptest::collection::vec(0u8..10, 0..40)) {
            let indices = permutation(&LicenseToken(digits));
            let mut seen = [false; HASH_LENGTH];
            for index in indices {
                prop_assert!(index < HASH_LENGTH);
                prop_assert!(!seen[index]);
                seen[index] = true;
            }
        }

        #[test]
        fn prop_apply_token_preserves_characters(code in "[1-9][0-9]{14,15}", hash in "[0-9a-f]{32}") {
            if let Ok(token) = derive_token(&code) {
                let url = format!("function/0/https://h.com/get_file/1/{}/v.mp4/", hash);
                let decoded = apply_token(&url, &token);
                let segment = decoded.split('/').nth(5).unwrap_or_default().to_string();
                let mut expected: Vec<char> = hash.chars().collect();
                let mut actual: Vec<char> = segment.chars().collect();
                expected.sort_unstable();
                actual.sort_unstable();
                prop_assert_eq!(expected, actual);
            }
        }
    }
}
