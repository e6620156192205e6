//! Source abstraction for app catalogs.
//!
//! Every catalog speaks a different protocol (HTML search pages, a direct
//! binary endpoint, a JSON metadata API, a release API). The [`Source`] trait
//! hides that behind two operations: discover the latest release, and turn
//! its locator into a URL that serves the artifact bytes directly.

mod apkmirror;
mod apkpure;
mod aptoide;
mod github;
mod registry;

use async_trait::async_trait;
use std::fmt;

use crate::error::FetchError;

pub use apkmirror::ApkMirrorSource;
pub use apkpure::ApkPureSource;
pub use aptoide::AptoideSource;
pub use github::GitHubSource;
pub use registry::{LookupField, SelectedSource, SourceContext, SourceDefinition, SourceRegistry};

/// Latest release as reported by a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDescriptor {
    pub version: String,
    /// Provider-specific handle; only the owning source interprets it.
    pub locator: String,
    pub title: String,
}

/// Final artifact request: the URL plus the page it was linked from, for
/// catalogs that check where the download came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub referer: Option<String>,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            referer: None,
        }
    }
}

/// Source kind identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SourceKind {
    #[default]
    ApkMirror,
    ApkPure,
    Aptoide,
    GitHub,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::ApkMirror => write!(f, "apkmirror"),
            SourceKind::ApkPure => write!(f, "apkpure"),
            SourceKind::Aptoide => write!(f, "aptoide"),
            SourceKind::GitHub => write!(f, "github"),
        }
    }
}

/// Base URLs of every catalog. Overridable for tests and mirrors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub apkmirror: String,
    pub apkpure: String,
    pub aptoide: String,
    pub github: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            apkmirror: "https://www.apkmirror.com".to_string(),
            apkpure: "https://d.apkpure.com/b".to_string(),
            aptoide: "https://ws2.aptoide.com/api/7".to_string(),
            github: "https://api.github.com".to_string(),
        }
    }
}

impl Endpoints {
    /// Points every catalog at the same host, e.g. a local mock server.
    pub fn all(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            apkmirror: base.to_string(),
            apkpure: format!("{}/b", base),
            aptoide: format!("{}/api/7", base),
            github: base.to_string(),
        }
    }
}

/// Trait for app catalogs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Source: Send + Sync {
    /// Get the source kind.
    fn kind(&self) -> SourceKind;

    /// Discover the latest release for a package id or `owner/repo`.
    async fn get_latest_version(&self, identifier: &str) -> Result<ReleaseDescriptor, FetchError>;

    /// Resolve a release locator to a direct download URL.
    async fn get_download_url(&self, locator: &str) -> Result<String, FetchError>;

    /// Resolve a release locator to the request that fetches the artifact.
    async fn get_download_request(&self, locator: &str) -> Result<DownloadRequest, FetchError> {
        Ok(DownloadRequest::new(self.get_download_url(locator).await?))
    }
}
