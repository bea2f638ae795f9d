use std::time::Duration;

use reqwest::{header, Client, ClientBuilder, Url};
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::configuration::EmailSettings;
use crate::domain::SubscriberEmail;

/// HTTP transport for outgoing mail. Raises on hard failure; every caller in
/// the notification pipeline treats that as a soft, per-recipient failure.
pub struct EmailClient {
    http_client: Client,
    url: Url,
    sender: SubscriberEmail,
}

#[derive(Serialize)]
struct EmailAddress<'a> {
    email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailRequest<'a> {
    sender: EmailAddress<'a>,
    to: Vec<EmailAddress<'a>>,
    subject: &'a str,
    text_content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    html_content: Option<&'a str>,
}

impl EmailClient {
    pub fn new(config: EmailSettings) -> anyhow::Result<Self> {
        let url = Url::parse(&config.endpoint).map_err(|e| anyhow::anyhow!(e.to_string()))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            "api-key",
            config
                .api_key
                .expose_secret()
                .parse()
                .map_err(|e| anyhow::anyhow!("Failed to parse api_key: {e}"))?,
        );
        headers.insert(
            header::ACCEPT,
            "application/json"
                .parse()
                .map_err(|e| anyhow::anyhow!("Failed to parse accept header: {e}"))?,
        );

        let http_client = ClientBuilder::new()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.timeout_millis))
            .build()
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;

        Ok(Self {
            http_client,
            url,
            sender: config.sender,
        })
    }

    pub async fn send_email(
        &self,
        recipient: &SubscriberEmail,
        subject: &str,
        text_body: &str,
        html_body: Option<&str>,
    ) -> anyhow::Result<()> {
        let url = self
            .url
            .join("/v3/smtp/email")
            .map_err(|e| anyhow::anyhow!(e))?;
        let body = SendEmailRequest {
            sender: EmailAddress {
                email: self.sender.as_ref(),
            },
            to: vec![EmailAddress {
                email: recipient.as_ref(),
            }],
            subject,
            text_content: text_body,
            html_content: html_body,
        };

        let _ = self
            .http_client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send an email to {recipient}. {e}"))?
            .error_for_status()
            .map_err(|e| anyhow::anyhow!("Error while sending an email to {recipient}. {e}"))?;
        Ok(())
    }
}
