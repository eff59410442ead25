use anyhow::Context as _;
use reqwest::Client;

use courier_domain::id::FiscalCode;
use courier_domain::message::NewMessage;

use crate::domain::repository::MessageApiPort;
use crate::error::MessageApiError;
use crate::infra::http::rejection;

pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Client for the public message creation endpoint.
#[derive(Clone)]
pub struct HttpMessageApi {
    pub client: Client,
    pub base_url: String,
    pub api_key: String,
}

impl HttpMessageApi {
    fn message_url(&self, fiscal_code: &FiscalCode) -> String {
        format!(
            "{}/api/v1/messages/{fiscal_code}",
            self.base_url.trim_end_matches('/')
        )
    }
}

impl MessageApiPort for HttpMessageApi {
    async fn create_message(
        &self,
        fiscal_code: &FiscalCode,
        message: &NewMessage,
    ) -> Result<(), MessageApiError> {
        let response = self
            .client
            .post(self.message_url(fiscal_code))
            .header(SUBSCRIPTION_KEY_HEADER, &self.api_key)
            .json(message)
            .send()
            .await
            .context("POST /api/v1/messages")?;

        if !response.status().is_success() {
            let (status, body) = rejection(response).await;
            return Err(MessageApiError::Rejected { status, body });
        }
        Ok(())
    }
}
