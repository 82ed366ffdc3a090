//! Content length extraction utilities.
//!
//! Progress fractions need the total size of the file, which depends on how
//! the server answered: a full `200 OK` body announces it in `Content-Length`,
//! while a `206 Partial Content` answer to a resumed request carries it after
//! the slash of its `Content-Range` header.

use reqwest::header::CONTENT_RANGE;
use reqwest::{Response, StatusCode};

/// Total size of the file served by `response`, once `offset` bytes are
/// already on disk.
///
/// Returns `None` when the server does not announce a size; progress is then
/// unknown until the transfer finishes.
///
/// # Example
///
/// ```rust,no_run
/// use haul::utils::total_length;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let response = reqwest::get("https://httpbin.org/get").await?;
/// let total = total_length(&response, 0);
/// # Ok(())
/// # }
/// ```
pub fn total_length(response: &Response, offset: u64) -> Option<u64> {
    if response.status() == StatusCode::PARTIAL_CONTENT {
        let from_range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range_total);
        if from_range.is_some() {
            return from_range;
        }
        return response
            .content_length()
            .map(|remaining| remaining.saturating_add(offset));
    }
    response.content_length()
}

/// Parse Content-Range header to extract total size.
///
/// Content-Range header format: "bytes start-end/total". An unknown total
/// (`*`) yields `None`.
///
/// # Example
///
/// ```rust
/// use haul::utils::parse_content_range_total;
///
/// assert_eq!(parse_content_range_total("bytes 0-1023/2048"), Some(2048));
/// assert_eq!(parse_content_range_total("bytes 0-1023/*"), None);
/// ```
pub fn parse_content_range_total(content_range: &str) -> Option<u64> {
    let (_, total) = content_range.rsplit_once('/')?;
    total.trim().parse::<u64>().ok()
}

/// Fraction of `total` covered by `written` bytes, if the total is known.
///
/// ```rust
/// use haul::utils::progress_fraction;
///
/// assert_eq!(progress_fraction(512, Some(2048)), Some(0.25));
/// assert_eq!(progress_fraction(512, None), None);
/// ```
pub fn progress_fraction(written: u64, total: Option<u64>) -> Option<f64> {
    match total {
        Some(0) => Some(1.0),
        Some(total) => Some((written as f64 / total as f64).min(1.0)),
        None => None,
    }
}
