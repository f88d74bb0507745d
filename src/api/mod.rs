use log::error;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{Error, Result};

pub mod dexscreener;
pub mod genai;
pub mod jupiter;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds the shared HTTP client. Every external call carries an explicit
/// timeout so a stalled transport cannot hang a panel past its next poll.
pub fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(Error::from)
}

/// GET a JSON document, mapping transport and status failures onto the
/// crate error taxonomy.
pub async fn get_json<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T> {
    let response = client.get(url).send().await.map_err(|e| {
        error!("Request to {} failed: {}", url, e);
        Error::ApiConnectionFailed(format!("Failed to connect to {}: {}", url, e))
    })?;

    let status = response.status();
    if !status.is_success() {
        let err = match status {
            StatusCode::TOO_MANY_REQUESTS => {
                Error::RateLimitExceeded(format!("{} rate limited", url))
            }
            StatusCode::UNAUTHORIZED => Error::ApiAuthFailed("Authentication failed".into()),
            StatusCode::SERVICE_UNAVAILABLE => {
                Error::ApiMaintenance("API is under maintenance".into())
            }
            _ => Error::ApiError(format!("Request failed with status: {}", status)),
        };
        error!("{} returned {}", url, status);
        return Err(err);
    }

    match response.json::<T>().await {
        Ok(body) => Ok(body),
        Err(e) => {
            error!("Failed to parse response from {}: {}", url, e);
            Err(Error::ApiInvalidFormat(format!(
                "Failed to parse response: {}",
                e
            )))
        }
    }
}
