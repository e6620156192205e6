use crate::error::FetchError;
use crate::http::HttpClient;
use crate::runtime::Runtime;
use log::info;
use std::path::Path;

/// Streams `url` into `output`, creating parent directories as needed.
///
/// `referer` is forwarded as the `Referer` header. The output file is only created once the server answers 200. Returns the
/// number of bytes written.
#[tracing::instrument(skip(runtime, output, http_client))]
pub async fn download_file<R: Runtime>(
    runtime: &R,
    url: &str,
    referer: Option<&str>,
    output: &Path,
    http_client: &HttpClient,
) -> Result<u64, FetchError> {
    info!("Downloading file from {}...", url);

    let bytes = http_client
        .download_file(url, referer, || {
            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                runtime
                    .create_dir_all(parent)
                    .map_err(FetchError::storage)?;
            }
            runtime.create_file(output).map_err(FetchError::storage)
        })
        .await?;

    info!("Download complete: {} bytes to {}", bytes, output.display());
    Ok(bytes)
}
