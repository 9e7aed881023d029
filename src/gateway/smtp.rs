use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use mail_send::SmtpClientBuilder;
use mail_send::mail_builder::MessageBuilder;

use crate::domain::{DispatchOutcome, EmailPayload};
use crate::errors::Error;

use super::{Gateway, is_throttling_message};

/// SMTP gateway that leverages [`mail_send`].
///
/// The relay does not report its own message id back to the client, so the
/// Message-ID header assigned here is used as the provider id.
pub struct SmtpGateway {
    server: String,
    port: u16,
    login: String,
    password: String,
    sequence: AtomicU64,
}

impl SmtpGateway {
    pub fn new(server: &str, port: u16, login: &str, password: &str) -> Result<Self, Error> {
        if server.trim().is_empty() {
            return Err(Error::Config("Missed SMTP server address".to_owned()));
        }
        if port == 0 {
            return Err(Error::Config("Missed SMTP port".to_owned()));
        }
        Ok(Self {
            server: server.to_owned(),
            port,
            login: login.to_owned(),
            password: password.to_owned(),
            sequence: AtomicU64::new(0),
        })
    }

    fn next_message_id(&self, sender_email: &str) -> String {
        let domain = sender_email
            .rsplit_once('@')
            .map(|(_, domain)| domain)
            .filter(|domain| !domain.is_empty())
            .unwrap_or("localhost");
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("{}.{seq}@{domain}", Utc::now().timestamp_micros())
    }

    async fn deliver(&self, message: MessageBuilder<'_>) -> Result<(), mail_send::Error> {
        SmtpClientBuilder::new(self.server.as_str(), self.port)
            .implicit_tls(true)
            .credentials((self.login.as_str(), self.password.as_str()))
            .connect()
            .await?
            .send(message)
            .await
    }
}

/// Builds the MIME message for a payload.
pub fn build_message<'a>(payload: &'a EmailPayload, message_id: String) -> MessageBuilder<'a> {
    let sender_name = payload.sender_name.as_deref().unwrap_or_default();

    let mut message = MessageBuilder::new()
        .from((sender_name, payload.sender_email.as_str()))
        .to(vec![("", payload.recipient.as_str())])
        .subject(payload.subject.as_str())
        .html_body(payload.html_body.as_str())
        .message_id(message_id);

    if let Some(text) = payload.text_body.as_deref() {
        message = message.text_body(text);
    }

    message
}

#[async_trait]
impl Gateway for SmtpGateway {
    async fn send(&self, payload: &EmailPayload) -> Result<DispatchOutcome, Error> {
        let message_id = self.next_message_id(&payload.sender_email);
        let message = build_message(payload, message_id.clone());

        match self.deliver(message).await {
            Ok(()) => Ok(DispatchOutcome::delivered(Some(message_id))),
            Err(e) => {
                let reason = e.to_string();
                log::error!("Failed to send email to {}: {reason}", payload.recipient);
                if is_throttling_message(&reason) {
                    Ok(DispatchOutcome::throttled(reason))
                } else {
                    Ok(DispatchOutcome::failed(reason))
                }
            }
        }
    }
}
