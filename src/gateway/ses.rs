//! Amazon SES query-API gateway.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode};
use reqwest::header::CONTENT_TYPE;

use crate::domain::{DispatchOutcome, EmailPayload};
use crate::errors::Error;

use super::sigv4::RequestSigner;
use super::{Gateway, is_throttling_message};

static MESSAGE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<MessageId>(.*?)</MessageId>").unwrap());

const API_VERSION: &str = "2010-12-01";
const CHARSET: &str = "UTF-8";

/// Sends `SendEmail` actions to SES signed with Signature V4.
pub struct SesGateway {
    client: Client,
    signer: RequestSigner,
    host: String,
    endpoint: String,
}

impl SesGateway {
    pub fn new(region: &str, access_key_id: &str, secret_access_key: &str) -> Result<Self, Error> {
        if region.trim().is_empty()
            || access_key_id.trim().is_empty()
            || secret_access_key.trim().is_empty()
        {
            return Err(Error::Config("AWS credentials not configured".to_owned()));
        }

        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        let host = format!("email.{region}.amazonaws.com");
        Ok(Self {
            client,
            signer: RequestSigner::new(access_key_id, secret_access_key, region, "ses"),
            endpoint: format!("https://{host}/"),
            host,
        })
    }

    /// Posts to `endpoint` instead of the regional SES URL, e.g. a VPC
    /// endpoint or a local stub. Requests are still signed for the
    /// regional host.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Maps an SES HTTP response onto a delivery outcome.
pub fn outcome_from_response(status: StatusCode, body: &str) -> DispatchOutcome {
    if !status.is_success() {
        let reason = format!("SES API error: {}", status.as_u16());
        if is_throttling_message(body) {
            return DispatchOutcome::throttled(reason);
        }
        return DispatchOutcome::failed(reason);
    }
    DispatchOutcome::delivered(parse_message_id(body))
}

/// Form-encodes the `SendEmail` parameters for a payload.
pub fn form_body(payload: &EmailPayload) -> String {
    let source = payload.source();
    let mut params = vec![
        ("Action", "SendEmail"),
        ("Version", API_VERSION),
        ("Source", source.as_str()),
        ("Destination.ToAddresses.member.1", payload.recipient.as_str()),
        ("Message.Subject.Data", payload.subject.as_str()),
        ("Message.Subject.Charset", CHARSET),
        ("Message.Body.Html.Data", payload.html_body.as_str()),
        ("Message.Body.Html.Charset", CHARSET),
    ];
    if let Some(text) = payload.text_body.as_deref() {
        params.push(("Message.Body.Text.Data", text));
        params.push(("Message.Body.Text.Charset", CHARSET));
    }

    params
        .into_iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Extracts the message id from a `SendEmailResponse` document.
pub fn parse_message_id(response: &str) -> Option<String> {
    MESSAGE_ID_RE
        .captures(response)
        .map(|caps| caps[1].trim().to_string())
        .filter(|id| !id.is_empty())
}

#[async_trait]
impl Gateway for SesGateway {
    async fn send(&self, payload: &EmailPayload) -> Result<DispatchOutcome, Error> {
        let body = form_body(payload);
        let signed = self
            .signer
            .sign("POST", &self.host, "/", &body, Utc::now());

        let response = self
            .client
            .post(self.endpoint.as_str())
            .header("Authorization", signed.authorization)
            .header("X-Amz-Date", signed.amz_date)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                log::error!("Error sending email to {} with SES: {e}", payload.recipient);
                return Ok(DispatchOutcome::failed(e.to_string()));
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                log::error!("Cannot read SES response for {}: {e}", payload.recipient);
                String::new()
            }
        };

        let outcome = outcome_from_response(status, &text);
        if !outcome.succeeded {
            log::error!("SES API error for {}: {text}", payload.recipient);
        } else if outcome.provider_message_id.is_none() {
            log::warn!("SES accepted email to {} without a MessageId", payload.recipient);
        }
        Ok(outcome)
    }
}
