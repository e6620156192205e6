//! HTTP client shared by the catalog sources and the downloader.

use std::io::{BufWriter, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;
use reqwest::header::{AUTHORIZATION, HeaderValue, REFERER};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::status::check_status;
use crate::error::FetchError;

/// Size of the write buffer used while streaming an artifact to disk.
const CHUNK_SIZE: usize = 8192;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:122.0) Gecko/20100101 Firefox/122.0";

/// Transport settings applied when building an [`HttpClient`].
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub user_agent: String,
    /// Connect timeout and maximum idle time between body reads. Zero
    /// disables both. Transfers that keep making progress are never cut off.
    pub timeout: Duration,
    /// Fixed pause before every request made by the scraping source.
    pub request_delay: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(60),
            request_delay: Duration::from_secs(5),
        }
    }
}

/// Thin wrapper over a reqwest [`Client`] that reports failures as
/// [`FetchError`]. Clones share the underlying connection pool.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: Client,
    authorization: Option<HeaderValue>,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            authorization: None,
        }
    }

    /// Sends `Authorization: <value>` with every request made by this handle.
    pub fn with_authorization(mut self, value: HeaderValue) -> Self {
        self.authorization = Some(value);
        self
    }

    /// Builds a sensitive `Bearer` header value from an API token.
    pub fn bearer(token: &str) -> Result<HeaderValue> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
            .context("API token contains invalid header characters")?;
        value.set_sensitive(true);
        Ok(value)
    }

    /// Builds a client with the configured user agent and idle timeouts.
    pub fn from_settings(settings: &HttpSettings) -> Result<Self> {
        let mut builder = Client::builder().user_agent(settings.user_agent.as_str());
        if !settings.timeout.is_zero() {
            builder = builder
                .connect_timeout(settings.timeout)
                .read_timeout(settings.timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(Self::new(client))
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let request = self.client.get(url);
        match &self.authorization {
            Some(value) => request.header(AUTHORIZATION, value.clone()),
            None => request,
        }
    }

    /// Performs a GET request and returns the body as text.
    #[tracing::instrument(skip(self, query))]
    pub async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String, FetchError> {
        debug!("GET text from {} with query {:?}...", url, query);

        let response = self.get(url).query(query).send().await?;
        let response = check_status(response)?;
        Ok(response.text().await?)
    }

    /// Performs a GET request and deserializes the JSON response.
    #[tracing::instrument(skip(self, query))]
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        debug!("GET JSON from {} with query {:?}...", url, query);

        let response = self.get(url).query(query).send().await?;
        let response = check_status(response)?;
        response
            .json::<T>()
            .await
            .map_err(|e| FetchError::transport(format!("Failed to parse JSON response: {}", e)))
    }

    /// Opens a GET request without reading the body. Redirects are followed,
    /// so [`Response::url`] is the final resolved location.
    #[tracing::instrument(skip(self))]
    pub async fn open(&self, url: &str) -> Result<Response, FetchError> {
        debug!("Opening stream to {}...", url);

        let response = self.get(url).send().await?;
        check_status(response)
    }

    /// Streams the body of `url` into the writer returned by `create_writer`.
    ///
    /// `referer`, when given, is sent as the `Referer` header. Anything but
    /// HTTP 200 fails before the writer is created. Once the writer exists,
    /// every failure is reported as [`FetchError::PartialDownload`]. Returns
    /// the number of bytes written.
    #[tracing::instrument(skip(self, create_writer))]
    pub async fn download_file<W, F>(
        &self,
        url: &str,
        referer: Option<&str>,
        create_writer: F,
    ) -> Result<u64, FetchError>
    where
        W: Write,
        F: FnOnce() -> Result<W, FetchError>,
    {
        debug!("Downloading file from {}...", url);

        let mut request = self.get(url);
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }
        let mut response = request.send().await?;
        if response.status() != StatusCode::OK {
            return Err(FetchError::status(response.status().as_u16(), url));
        }

        let mut writer = BufWriter::with_capacity(CHUNK_SIZE, create_writer()?);
        let mut downloaded_bytes: u64 = 0;

        loop {
            let chunk = match response.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => return Err(interrupted(downloaded_bytes, e)),
            };
            if chunk.is_empty() {
                continue;
            }
            writer
                .write_all(&chunk)
                .map_err(|e| interrupted(downloaded_bytes, e))?;
            downloaded_bytes += chunk.len() as u64;
        }

        writer
            .flush()
            .map_err(|e| interrupted(downloaded_bytes, e))?;

        debug!(
            "Downloaded {:.2} MB",
            downloaded_bytes as f64 / (1024.0 * 1024.0)
        );

        Ok(downloaded_bytes)
    }
}

fn interrupted(bytes_written: u64, err: impl std::fmt::Display) -> FetchError {
    FetchError::PartialDownload {
        bytes_written,
        reason: err.to_string(),
    }
}
