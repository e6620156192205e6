//! GitHub source implementation.

use async_trait::async_trait;
use log::{debug, info};

use crate::error::FetchError;
use crate::http::HttpClient;

use super::{ReleaseDescriptor, Source, SourceKind};

/// Asset suffix picked when the app config names none.
pub const DEFAULT_ASSET_EXTENSION: &str = ".apk";

/// GitHub API response types (internal).
mod api {
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    pub struct Release {
        pub tag_name: String,
        pub name: Option<String>,
        #[serde(default)]
        pub assets: Vec<Asset>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Asset {
        pub name: String,
        pub browser_download_url: String,
    }
}

/// GitHub source implementation.
pub struct GitHubSource {
    http_client: HttpClient,
    api_url: String,
    asset_extension: String,
}

impl GitHubSource {
    /// Create from an existing HttpClient. Authorization, if any, is carried by the client.
    pub fn new(http_client: HttpClient, api_url: &str) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            asset_extension: DEFAULT_ASSET_EXTENSION.to_string(),
        }
    }

    /// Match assets ending in `extension` (case-insensitive, leading dot optional).
    pub fn with_asset_extension(mut self, extension: &str) -> Self {
        let extension = extension.trim().to_lowercase();
        self.asset_extension = if extension.starts_with('.') {
            extension
        } else {
            format!(".{}", extension)
        };
        self
    }

    async fn fetch_latest_release(&self, repo: &str) -> Result<api::Release, FetchError> {
        let url = format!("{}/repos/{}/releases/latest", self.api_url, repo);
        debug!("Fetching latest release from {}...", url);
        self.http_client
            .get_json(&url, &[])
            .await
            .map_err(|e| match e {
                FetchError::NotFound(_) => {
                    FetchError::NotFound(format!("No published release for {}", repo))
                }
                other => other,
            })
    }
}

/// Picks the first asset whose name ends with `extension`.
fn select_asset<'a>(assets: &'a [api::Asset], extension: &str) -> Option<&'a api::Asset> {
    assets
        .iter()
        .find(|a| a.name.to_lowercase().ends_with(extension))
}

#[async_trait]
impl Source for GitHubSource {
    fn kind(&self) -> SourceKind {
        SourceKind::GitHub
    }

    async fn get_latest_version(&self, repo: &str) -> Result<ReleaseDescriptor, FetchError> {
        info!("[GitHub] Checking latest release of: {}", repo);
        let release = self.fetch_latest_release(repo).await?;

        let asset = select_asset(&release.assets, &self.asset_extension).ok_or_else(|| {
            FetchError::NotFound(format!(
                "Release {} of {} has no {} asset",
                release.tag_name, repo, self.asset_extension
            ))
        })?;
        debug!("[GitHub] Selected asset {}", asset.name);

        Ok(ReleaseDescriptor {
            version: release.tag_name.clone(),
            locator: asset.browser_download_url.clone(),
            title: release
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or(release.tag_name),
        })
    }

    async fn get_download_url(&self, locator: &str) -> Result<String, FetchError> {
        Ok(locator.to_string())
    }
}
