//! Photo/asset resolution boundary.
//!
//! Transaction records may reference a photo by a relative path in a
//! storage bucket. Resolution to a fetchable URL is an external,
//! read-only concern: a failure yields [`ResolvedAsset::Unavailable`],
//! which the rendering layer shows as a placeholder. Nothing in the
//! acknowledgment flow waits on a photo.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of resolving a stored asset path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedAsset {
    /// A fetchable URL.
    Url(String),
    /// The asset could not be resolved; render a placeholder.
    Unavailable,
}

impl ResolvedAsset {
    /// Returns true when a URL was resolved.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Url(_))
    }

    /// Returns the URL, if resolved.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Url(url) => Some(url),
            Self::Unavailable => None,
        }
    }
}

/// External asset-resolution collaborator.
#[async_trait]
pub trait AssetResolver: Send + Sync {
    /// Resolves a stored relative path in a bucket to a fetchable URL.
    async fn resolve(&self, bucket: &str, path: &str) -> ResolvedAsset;
}

/// Resolver that joins paths onto a fixed base URL. Used by tests and
/// demos in place of the hosted storage service.
#[derive(Debug, Clone)]
pub struct StaticAssetResolver {
    base_url: String,
}

impl StaticAssetResolver {
    /// Creates a resolver rooted at the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl AssetResolver for StaticAssetResolver {
    async fn resolve(&self, bucket: &str, path: &str) -> ResolvedAsset {
        if bucket.is_empty() || path.is_empty() {
            return ResolvedAsset::Unavailable;
        }
        ResolvedAsset::Url(format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            bucket,
            path
        ))
    }
}
