//! APKMirror source: HTML search results and a three-hop link walk.
//!
//! Every selector lives in this file. When the site layout drifts, the
//! failure surfaces as [`FetchError::ResolutionMismatch`] naming the hop.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use super::{DownloadRequest, ReleaseDescriptor, Source, SourceKind};
use crate::error::FetchError;
use crate::http::HttpClient;
use crate::version::version_from_title;

const DIRECT_LINK_MARKER: &str = "/wp-content/themes/APKMirror/download.php";

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {:?}: {}", css, e))
}

static APP_ROW: LazyLock<Selector> = LazyLock::new(|| selector("div.appRow"));
static APP_ROW_TITLE: LazyLock<Selector> = LazyLock::new(|| selector("h5.appRowTitle"));
static APP_ROW_LINK: LazyLock<Selector> = LazyLock::new(|| selector("a.downloadLink"));
static VARIANT_ROW: LazyLock<Selector> =
    LazyLock::new(|| selector("div.table-row, div.headerFont"));
static VARIANT_LINK: LazyLock<Selector> = LazyLock::new(|| selector("a.accent_color"));
static DOWNLOAD_BUTTON: LazyLock<Selector> = LazyLock::new(|| selector("a.downloadButton"));
static DIRECT_LINK: LazyLock<Selector> = LazyLock::new(|| {
    selector(&format!(
        r#"a[rel~="nofollow"][data-google-interstitial="false"][href*="{}"]"#,
        DIRECT_LINK_MARKER
    ))
});

/// Top search result: display title and release page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SearchHit {
    title: String,
    link: String,
}

/// APKMirror source implementation.
pub struct ApkMirrorSource {
    http_client: HttpClient,
    base_url: String,
    request_delay: Duration,
}

impl ApkMirrorSource {
    pub fn new(http_client: HttpClient, base_url: &str, request_delay: Duration) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_delay,
        }
    }

    /// Fixed pause before each request to stay under the site's throttling.
    async fn pace(&self) {
        if !self.request_delay.is_zero() {
            debug!("Waiting {:?} before next request", self.request_delay);
            tokio::time::sleep(self.request_delay).await;
        }
    }

    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        self.pace().await;
        self.http_client.get_text(url, &[]).await
    }
}

#[async_trait]
impl Source for ApkMirrorSource {
    fn kind(&self) -> SourceKind {
        SourceKind::ApkMirror
    }

    async fn get_latest_version(&self, package_name: &str) -> Result<ReleaseDescriptor, FetchError> {
        info!("[APKMirror] Searching for: {}", package_name);
        self.pace().await;

        let search_url = format!("{}/", self.base_url);
        let html = self
            .http_client
            .get_text(
                &search_url,
                &[
                    ("post_type", "app_release"),
                    ("searchtype", "apk"),
                    ("s", package_name),
                ],
            )
            .await?;

        let hit = parse_search_results(&html, &self.base_url)?;
        let version = version_from_title(&hit.title);
        debug!("[APKMirror] Top result '{}' -> {}", hit.title, version);

        Ok(ReleaseDescriptor {
            version,
            locator: hit.link,
            title: hit.title,
        })
    }

    async fn get_download_url(&self, release_url: &str) -> Result<String, FetchError> {
        Ok(self.get_download_request(release_url).await?.url)
    }

    /// The direct link only serves the file to requests coming from the
    /// download page, so that page is sent along as the referer.
    async fn get_download_request(&self, release_url: &str) -> Result<DownloadRequest, FetchError> {
        info!("[APKMirror] Getting variant details...");
        let html = self.fetch_page(release_url).await?;
        let variant_url = parse_variant_link(&html, &self.base_url)?;

        info!("[APKMirror] Getting download page...");
        let html = self.fetch_page(&variant_url).await?;
        let button_url = parse_download_button(&html, &self.base_url)?;

        info!("[APKMirror] Extracting direct link...");
        let html = self.fetch_page(&button_url).await?;
        let url = parse_direct_link(&html, &self.base_url)?;
        Ok(DownloadRequest {
            url,
            referer: Some(button_url),
        })
    }
}

fn absolute(base_url: &str, href: &str) -> Result<String, FetchError> {
    let base = Url::parse(base_url)
        .map_err(|e| FetchError::transport(format!("Invalid base URL {}: {}", base_url, e)))?;
    base.join(href)
        .map(String::from)
        .map_err(|e| FetchError::transport(format!("Invalid link {}: {}", href, e)))
}

fn href<'a>(element: ElementRef<'a>) -> Option<&'a str> {
    element.value().attr("href").filter(|h| !h.trim().is_empty())
}

fn parse_search_results(html: &str, base_url: &str) -> Result<SearchHit, FetchError> {
    let document = Html::parse_document(html);
    let row = document
        .select(&APP_ROW)
        .next()
        .ok_or_else(|| FetchError::NotFound("no search results on APKMirror".to_string()))?;

    let title = row
        .select(&APP_ROW_TITLE)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| FetchError::mismatch("search results", "result row has no h5.appRowTitle"))?;

    let link = row
        .select(&APP_ROW_LINK)
        .next()
        .and_then(href)
        .ok_or_else(|| FetchError::mismatch("search results", "result row has no a.downloadLink"))?;

    Ok(SearchHit {
        title,
        link: absolute(base_url, link)?,
    })
}

fn parse_variant_link(html: &str, base_url: &str) -> Result<String, FetchError> {
    let document = Html::parse_document(html);
    // The first matching row is the table header; the first variant follows it.
    let row = document
        .select(&VARIANT_ROW)
        .nth(1)
        .ok_or_else(|| FetchError::mismatch("release page", "no variant rows found"))?;

    let link = row
        .select(&VARIANT_LINK)
        .next()
        .and_then(href)
        .ok_or_else(|| FetchError::mismatch("release page", "variant row has no a.accent_color"))?;

    absolute(base_url, link)
}

fn parse_download_button(html: &str, base_url: &str) -> Result<String, FetchError> {
    let document = Html::parse_document(html);
    let link = document
        .select(&DOWNLOAD_BUTTON)
        .next()
        .and_then(href)
        .ok_or_else(|| FetchError::mismatch("variant page", "no a.downloadButton"))?;

    absolute(base_url, link)
}

fn parse_direct_link(html: &str, base_url: &str) -> Result<String, FetchError> {
    let document = Html::parse_document(html);
    let link = document
        .select(&DIRECT_LINK)
        .next()
        .and_then(href)
        .ok_or_else(|| FetchError::mismatch("download page", "no direct download link"))?;

    absolute(base_url, link)
}
