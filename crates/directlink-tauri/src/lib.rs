//! Directlink Tauri Integration
//!
//! Provides a Tauri plugin exposing the directlink resolver to the frontend.
//!
//! # Usage
//!
//! Register the plugin in your Tauri application:
//!
//! ```ignore
//! fn main() {
//!     tauri::Builder::default()
//!         .plugin(directlink_tauri::init())
//!         .run(tauri::generate_context!())
//!         .expect("error while running tauri application");
//! }
//! ```
//!
//! Then invoke commands from the frontend:
//!
//! ```javascript
//! import { invoke } from '@tauri-apps/api/core';
//!
//! // Fetch a page and resolve its media URL
//! const record = await invoke('plugin:directlink|resolve_media', {
//!   url: 'https://example.com/videos/1/clip/'
//! });
//! // { bestUrl: 'https://cdn.example.com/...', allCandidates: [...], title: 'Clip' }
//!
//! // Extract candidates from a page the webview already loaded
//! const candidates = await invoke('plugin:directlink|extract_candidates', {
//!   pageText: document.documentElement.outerHTML,
//!   pageUrl: location.href
//! });
//! ```

use std::sync::Arc;

use directlink_core::{MediaResolver, ResolverConfig};
use tauri::{
    Manager, Runtime,
    plugin::{Builder, TauriPlugin},
};

mod commands;

/// Shared resolver handed to every command
///
/// The resolver is immutable after construction and its client handles
/// its own locking, so an `Arc` is enough for concurrent commands.
pub struct ResolverState {
    pub(crate) resolver: Arc<MediaResolver>,
}

impl ResolverState {
    /// Create a new ResolverState with default configuration
    ///
    /// # Errors
    /// Returns error string if resolver initialization fails
    pub fn new() -> Result<Self, String> {
        Self::with_config(ResolverConfig::default())
    }

    /// Create a new ResolverState with custom configuration
    pub fn with_config(config: ResolverConfig) -> Result<Self, String> {
        let resolver = MediaResolver::with_config(config).map_err(|e| e.to_string())?;
        Ok(Self {
            resolver: Arc::new(resolver),
        })
    }
}

/// Initialize the directlink plugin with default configuration
///
/// # Example
/// ```ignore
/// tauri::Builder::default()
///     .plugin(directlink_tauri::init())
///     .run(tauri::generate_context!())
///     .expect("error while running tauri application");
/// ```
pub fn init<R: Runtime>() -> TauriPlugin<R> {
    init_with_config(ResolverConfig::default())
}

/// Initialize the directlink plugin with custom resolver configuration
pub fn init_with_config<R: Runtime>(config: ResolverConfig) -> TauriPlugin<R> {
    Builder::new("directlink")
        .invoke_handler(tauri::generate_handler![
            commands::resolve_media,
            commands::resolve_page,
            commands::extract_candidates
        ])
        .setup(move |app, _api| {
            let state =
                ResolverState::with_config(config.clone()).map_err(Box::<dyn std::error::Error>::from)?;
            app.manage(state);
            Ok(())
        })
        .build()
}

// Re-export types for convenience
pub use directlink_core::{Candidate, MediaResolution};
