//! Clients for the external services the intent handlers call.

pub mod jokes;
pub mod mail;
pub mod media;
pub mod todo;
pub mod weather;
pub mod wikipedia;

use std::time::Duration;

/// Timeout applied to every outbound HTTP request.
pub(crate) const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .unwrap_or_default()
}
