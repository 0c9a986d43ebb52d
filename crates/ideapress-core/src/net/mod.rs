//! The network capability the pipeline needs: `fetch(url) -> bytes`.

pub mod http;

use crate::errors::Result;
use async_trait::async_trait;

pub use http::HttpFetcher;

/// Media type requested from the GitHub releases endpoint.
pub const GITHUB_JSON: &str = "application/vnd.github+json";

#[async_trait]
pub trait Fetch: Send + Sync {
    /// GET `url` and return the whole body.
    ///
    /// Transport failures and non-2xx responses are `ProviderUnavailable`.
    async fn fetch(&self, url: &str, accept: Option<&str>) -> Result<Vec<u8>>;
}
