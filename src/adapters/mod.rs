//! Adapter interfaces for external collaborators.
//!
//! The loader reads library payloads through two seams: an optional native
//! asset provider (bundled files) and a network fetcher.

pub mod bundle;
pub mod http;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

pub use bundle::DirectoryProvider;
pub use http::HttpFetcher;

/// Errors from the network fetcher
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Request/response fetch primitive
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url` and return the body as text. Non-2xx is an error.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Native source of bundled library assets
#[async_trait]
pub trait AssetProvider: Send + Sync {
    /// Human-readable provider name
    fn name(&self) -> &str;

    /// Read the asset at `asset_path`; `Ok(None)` when it is not bundled
    async fn load_library_asset(&self, asset_path: &str) -> Result<Option<String>>;
}
