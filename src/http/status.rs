//! Mapping of HTTP responses onto [`FetchError`].

use reqwest::{Response, StatusCode};

use crate::error::FetchError;

/// Passes successful responses through and classifies the rest.
///
/// 404 becomes [`FetchError::NotFound`]; every other non-success status is a
/// [`FetchError::Transport`] carrying the code.
pub fn check_status(response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    match status {
        StatusCode::NOT_FOUND => Err(FetchError::NotFound(format!(
            "{} returned 404 Not Found",
            url
        ))),
        s => Err(FetchError::status(s.as_u16(), &url)),
    }
}
