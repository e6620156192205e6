//! APKPure source: a direct endpoint that redirects to the package binary.

use std::sync::LazyLock;

use async_trait::async_trait;
use log::{debug, info};
use regex::Regex;
use reqwest::Url;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};

use super::{ReleaseDescriptor, Source, SourceKind};
use crate::error::FetchError;
use crate::http::HttpClient;
use crate::version::extract_version;

/// Version reported when neither the filename nor the URL carries one.
const FALLBACK_VERSION: &str = "latest";

static DISPOSITION_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"filename\*?=['"]?(?:UTF-8'')?([^'";\n]+)"#).expect("filename pattern is valid")
});

/// APKPure source implementation.
pub struct ApkPureSource {
    http_client: HttpClient,
    base_url: String,
    file_type: String,
    version: String,
}

impl ApkPureSource {
    /// `file_type` is e.g. `XAPK` or `APK`; `version` is a selector such as `latest`.
    pub fn new(http_client: HttpClient, base_url: &str, file_type: &str, version: &str) -> Self {
        Self {
            http_client,
            base_url: base_url.to_string(),
            file_type: file_type.to_uppercase(),
            version: version.to_string(),
        }
    }

    /// `{base}/{FILE_TYPE}/{package}?version={selector}`
    pub fn build_direct_url(&self, package_name: &str) -> Result<String, FetchError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            FetchError::transport(format!("Invalid base URL {}: {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| FetchError::transport(format!("Invalid base URL {}", self.base_url)))?
            .pop_if_empty()
            .push(&self.file_type)
            .push(package_name);
        url.query_pairs_mut().append_pair("version", &self.version);
        Ok(url.into())
    }
}

/// Extracts the filename from a `Content-Disposition` header value.
fn filename_from_disposition(value: &str) -> Option<String> {
    DISPOSITION_FILENAME
        .captures(value)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|f| !f.is_empty())
}

/// Path and query of the final URL. The host is left out so an IP address
/// is never taken for a version.
fn path_and_query(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

#[async_trait]
impl Source for ApkPureSource {
    fn kind(&self) -> SourceKind {
        SourceKind::ApkPure
    }

    async fn get_latest_version(&self, package_name: &str) -> Result<ReleaseDescriptor, FetchError> {
        let release_url = self.build_direct_url(package_name)?;
        info!("[APKPure] Resolving latest package for: {}", package_name);

        let response = self.http_client.open(&release_url).await?;
        let headers = response.headers();

        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_lowercase();
        if content_type.starts_with("text/html") {
            return Err(FetchError::mismatch(
                "direct endpoint",
                "received an HTML page instead of a package binary",
            ));
        }

        let filename = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition);

        let version = filename
            .as_deref()
            .and_then(extract_version)
            .or_else(|| extract_version(&path_and_query(response.url())))
            .unwrap_or_else(|| FALLBACK_VERSION.to_string());
        debug!(
            "[APKPure] Resolved {} (file {:?}) -> {}",
            response.url(),
            filename,
            version
        );

        // Release the connection without reading the body.
        drop(response);

        Ok(ReleaseDescriptor {
            version,
            locator: release_url,
            title: filename.unwrap_or_else(|| package_name.to_string()),
        })
    }

    /// The endpoint itself redirects to the CDN binary.
    async fn get_download_url(&self, release_url: &str) -> Result<String, FetchError> {
        Ok(release_url.to_string())
    }
}
