//! Tauri commands for the directlink resolver
//!
//! This module contains all Tauri command implementations.

use directlink_core::{Candidate, MediaResolution, RawPage};
use tauri::State;

use crate::ResolverState;

/// Fetch a page and resolve its direct media URL
///
/// # Arguments
/// * `state` - Managed ResolverState from Tauri
/// * `url` - Page URL to resolve
///
/// # Returns
/// The result record; failures are reported in its `error` field
#[tauri::command]
pub async fn resolve_media(
    state: State<'_, ResolverState>,
    url: String,
) -> Result<MediaResolution, String> {
    let resolver = state.resolver.clone();
    Ok(resolver.resolve(&url).await)
}

/// Resolve a page the frontend already loaded
///
/// Only indirection confirmations go over the network.
#[tauri::command]
pub async fn resolve_page(
    state: State<'_, ResolverState>,
    page_text: String,
    page_url: String,
) -> Result<MediaResolution, String> {
    let resolver = state.resolver.clone();
    let page = RawPage::new(page_url, page_text);
    Ok(resolver.resolve_page(&page).await.into())
}

/// Extract candidates from page text without any network access
///
/// # Arguments
/// * `page_text` - Page body
/// * `page_url` - Canonical page URL, used for relative references
#[tauri::command]
pub fn extract_candidates(
    state: State<'_, ResolverState>,
    page_text: String,
    page_url: String,
) -> Vec<Candidate> {
    state
        .resolver
        .extract_candidates(&RawPage::new(page_url, page_text))
}
