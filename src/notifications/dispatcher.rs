use std::sync::Arc;

use crate::domain::SubscriberEmail;
use crate::email_client::EmailClient;

/// A fully-rendered message, ready for the transport.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub recipient: SubscriberEmail,
    pub subject: String,
    pub text_body: String,
    pub html_body: Option<String>,
}

/// Hands messages to the transport without ever propagating a delivery
/// failure to the caller. In detached mode (the default) the send runs on a
/// fire-and-forget task and `true` only means the send was initiated; in
/// blocking mode `true` means the transport accepted the message.
pub struct Dispatcher {
    email_client: Arc<EmailClient>,
    detached: bool,
}

impl Dispatcher {
    pub fn new(email_client: Arc<EmailClient>, detached: bool) -> Self {
        Self {
            email_client,
            detached,
        }
    }

    #[tracing::instrument(
        name = "Dispatching email",
        skip(self, email),
        fields(recipient = %email.recipient, subject = %email.subject)
    )]
    pub async fn send(&self, email: OutgoingEmail) -> bool {
        if self.detached {
            let client = self.email_client.clone();
            tokio::spawn(async move {
                if let Err(e) = client
                    .send_email(
                        &email.recipient,
                        &email.subject,
                        &email.text_body,
                        email.html_body.as_deref(),
                    )
                    .await
                {
                    tracing::warn!("Failed to deliver email to {}: {e:#}", email.recipient);
                }
            });
            return true;
        }
        match self
            .email_client
            .send_email(
                &email.recipient,
                &email.subject,
                &email.text_body,
                email.html_body.as_deref(),
            )
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to deliver email to {}: {e:#}", email.recipient);
                false
            }
        }
    }
}
