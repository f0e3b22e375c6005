use crate::error::{Result, ScanError};
use crate::target::CrawlTarget;
use reqwest::{Client, Response};
use tracing::debug;

/// `GET` the target, treating anything but a 2xx status as a failure.
pub async fn get(client: &Client, target: &CrawlTarget) -> Result<Response> {
    let response = client.get(target.url().clone()).send().await?;
    let status = response.status();
    debug!(url = %target, status = status.as_u16(), "response received");
    if !status.is_success() {
        return Err(ScanError::Status {
            url: target.to_string(),
            status,
        });
    }
    Ok(response)
}
