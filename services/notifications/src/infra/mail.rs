use std::collections::BTreeMap;

use anyhow::Context as _;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::domain::repository::MailTransport;
use crate::domain::types::{OutgoingMail, SentInfo};
use crate::error::MailError;
use crate::infra::http::rejection;

const SEND_PATH: &str = "/v3/mail/send";
const PROVIDER_MESSAGE_ID_HEADER: &str = "x-message-id";

/// SendGrid v3 mail transport.
#[derive(Clone)]
pub struct SendGridTransport {
    pub client: Client,
    pub api_url: String,
    pub api_key: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    subject: &'a str,
    content: [Content<'a>; 2],
    headers: BTreeMap<&'a str, &'a str>,
    custom_args: BTreeMap<&'a str, &'a str>,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    value: &'a str,
}

fn send_request(mail: &OutgoingMail) -> SendRequest<'_> {
    SendRequest {
        personalizations: [Personalization {
            to: [Address { email: &mail.to }],
        }],
        from: Address { email: &mail.from },
        subject: &mail.subject,
        // text/plain must come first.
        content: [
            Content {
                kind: "text/plain",
                value: &mail.text,
            },
            Content {
                kind: "text/html",
                value: &mail.html,
            },
        ],
        headers: mail
            .headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect(),
        custom_args: BTreeMap::from([("messageId", mail.message_id.as_str())]),
    }
}

impl MailTransport for SendGridTransport {
    async fn send_mail(&self, mail: &OutgoingMail) -> Result<SentInfo, MailError> {
        let url = format!("{}{SEND_PATH}", self.api_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&send_request(mail))
            .send()
            .await
            .with_context(|| format!("POST {SEND_PATH}"))?;

        if !response.status().is_success() {
            let (status, body) = rejection(response).await;
            return Err(MailError::Rejected { status, body });
        }

        let provider_message_id = response
            .headers()
            .get(PROVIDER_MESSAGE_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        debug!(
            message_id = %mail.message_id,
            provider_message_id = provider_message_id.as_deref().unwrap_or(""),
            "mail accepted"
        );
        Ok(SentInfo {
            provider_message_id,
        })
    }
}
