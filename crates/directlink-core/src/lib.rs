//! Directlink Core Library
//!
//! Finds the direct, playable media URL behind a video hosting page.
//!
//! # Overview
//!
//! This crate provides the whole resolution pipeline:
//! - Rate-limited HTTP client with cookie file support
//! - Text-level candidate extraction (meta tags, media elements, player
//!   variables, JSON fields, bare media URLs)
//! - The license-token cipher that restores obfuscated player URLs
//! - Confirmation of `/get_file/` indirection links
//! - Feature-based ranking of the candidates
//!
//! # Example
//!
//! ```no_run
//! use directlink_core::{MediaResolver, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let resolver = MediaResolver::new()?;
//!
//!     let record = resolver.resolve("https://example.com/videos/1/clip/").await;
//!     if let Some(url) = &record.best_url {
//!         println!("Direct URL: {}", url);
//!     } else {
//!         eprintln!("Failed: {}", record.error.as_deref().unwrap_or("unknown error"));
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Offline use
//!
//! Pages fetched elsewhere can be fed in as a [`RawPage`]:
//!
//! ```
//! use directlink_core::{MediaResolver, RawPage};
//!
//! let resolver = MediaResolver::new().unwrap();
//! let page = RawPage::new(
//!     "https://example.com/watch/1",
//!     r#"<video src="/media/clip_720p.mp4"></video>"#,
//! );
//! let candidates = resolver.extract_candidates(&page);
//! assert_eq!(candidates[0].url, "https://example.com/media/clip_720p.mp4");
//! ```
//!
//! **Important:** resolved URLs usually carry expiring tokens. Do not cache
//! them long-term.

pub mod cipher;
mod client;
mod error;
pub mod parser;
pub mod ranking;
mod resolver;
pub mod router;
pub mod sites;
pub mod transport;
pub mod types;
pub mod url;

// Re-export client types
pub use client::{ClientConfig, MediaClient, RateLimiter, load_cookie_file};

// Re-export error types
pub use error::{DirectlinkError, Result};

// Re-export the cipher entry points
pub use cipher::{LicenseToken, apply_token, decode_obfuscated, derive_token};

// Re-export parser functions
pub use parser::{collect_candidates, detect_challenge, extract_title, normalize};

// Re-export ranking
pub use ranking::{RankingContext, UrlFeatures, score, select_best};

// Re-export main resolver API
pub use resolver::{MediaResolver, ResolverConfig};

// Re-export routing and transport seams
pub use router::ResolutionRouter;
pub use sites::{GenericProfile, PlayerSourcesProfile, SiteProfile, SiteRegistry};
pub use transport::{FetchRequest, FetchResponse, Transport};

// Re-export data types
pub use types::{Candidate, ContainerKind, MediaResolution, RawPage, ResolvedMedia};
