//! Aptoide source: a JSON metadata API.

use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;

use super::{ReleaseDescriptor, Source, SourceKind};
use crate::error::FetchError;
use crate::http::HttpClient;

mod api {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct Info {
        #[serde(default)]
        pub status: String,
    }

    #[derive(Debug, Default, Deserialize)]
    pub struct File {
        pub vername: Option<String>,
        pub path: Option<String>,
        pub path_alt: Option<String>,
    }

    #[derive(Debug, Default, Deserialize)]
    pub struct Data {
        pub name: Option<String>,
        pub file: Option<File>,
    }
}

#[derive(Debug, Deserialize)]
struct MetaResponse {
    info: api::Info,
    data: Option<api::Data>,
}

/// Aptoide source implementation.
pub struct AptoideSource {
    http_client: HttpClient,
    api_url: String,
}

impl AptoideSource {
    pub fn new(http_client: HttpClient, api_url: &str) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Turns a metadata document into a release. The binary URL doubles as the locator.
fn parse_meta(meta: MetaResponse, package_name: &str) -> Result<ReleaseDescriptor, FetchError> {
    if meta.info.status != "OK" {
        return Err(FetchError::NotFound(format!(
            "Aptoide has no package {} (status {})",
            package_name, meta.info.status
        )));
    }

    let data = meta
        .data
        .ok_or_else(|| FetchError::mismatch("metadata", "response has no data object"))?;
    let file = data.file.unwrap_or_default();

    let version = file
        .vername
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| FetchError::mismatch("metadata", "missing data.file.vername"))?;
    let locator = file
        .path
        .filter(|p| !p.is_empty())
        .or(file.path_alt.filter(|p| !p.is_empty()))
        .ok_or_else(|| FetchError::mismatch("metadata", "missing data.file.path"))?;

    Ok(ReleaseDescriptor {
        version: version.trim().to_string(),
        locator,
        title: data.name.unwrap_or_else(|| package_name.to_string()),
    })
}

#[async_trait]
impl Source for AptoideSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Aptoide
    }

    async fn get_latest_version(&self, package_name: &str) -> Result<ReleaseDescriptor, FetchError> {
        info!("[Aptoide] Fetching metadata for: {}", package_name);
        let url = format!("{}/app/getMeta", self.api_url);
        let meta: MetaResponse = self
            .http_client
            .get_json(&url, &[("package_name", package_name), ("language", "en")])
            .await?;

        let release = parse_meta(meta, package_name)?;
        debug!("[Aptoide] {} -> {}", release.title, release.version);
        Ok(release)
    }

    async fn get_download_url(&self, locator: &str) -> Result<String, FetchError> {
        Ok(locator.to_string())
    }
}
