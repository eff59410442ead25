use anyhow::Context as _;
use reqwest::Client;
use url::Url;

use crate::domain::repository::WebhookSender;
use crate::error::WebhookError;
use crate::infra::http::rejection;

#[derive(Clone)]
pub struct ReqwestWebhookSender {
    pub client: Client,
}

impl WebhookSender for ReqwestWebhookSender {
    async fn post(&self, url: &Url, body: &serde_json::Value) -> Result<(), WebhookError> {
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {}", url.host_str().unwrap_or_default()))?;

        if !response.status().is_success() {
            let (status, body) = rejection(response).await;
            return Err(WebhookError::Rejected { status, body });
        }
        Ok(())
    }
}
