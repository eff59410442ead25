use std::time::Duration;

use anyhow::Context as _;
use reqwest::{Client, Response};

/// One client per process; clones share its connection pool.
pub fn build_http_client(timeout: Duration) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("courier-notifications/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("build http client")
}

/// Status and body of a non-2xx response, for error reporting.
pub async fn rejection(response: Response) -> (u16, String) {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    (status, body)
}
