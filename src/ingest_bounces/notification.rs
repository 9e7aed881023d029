//! Provider notification payloads.
//!
//! SES publishes bounce, complaint and delivery notifications either bare
//! or wrapped in an SNS envelope whose `Message` field holds the
//! notification as a JSON string.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum NotificationType {
    Bounce,
    Complaint,
    Delivery,
    Other(String),
}

impl From<String> for NotificationType {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "bounce" => NotificationType::Bounce,
            "complaint" => NotificationType::Complaint,
            "delivery" => NotificationType::Delivery,
            _ => NotificationType::Other(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SesNotification {
    #[serde(alias = "notificationType")]
    pub event_type: NotificationType,
    pub mail: Mail,
    #[serde(default)]
    pub bounce: Option<Bounce>,
    #[serde(default)]
    pub complaint: Option<Complaint>,
    #[serde(default)]
    pub delivery: Option<Delivery>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mail {
    pub message_id: String,
    #[serde(default)]
    pub destination: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounce {
    pub bounce_type: String,
    #[serde(default)]
    pub bounce_sub_type: Option<String>,
    #[serde(default)]
    pub bounced_recipients: Vec<BouncedRecipient>,
}

impl Bounce {
    /// Hard bounces mean the address must not be mailed again.
    pub fn is_permanent(&self) -> bool {
        self.bounce_type.eq_ignore_ascii_case("permanent")
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BouncedRecipient {
    pub email_address: String,
    #[serde(default)]
    pub diagnostic_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    #[serde(default)]
    pub complaint_feedback_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    #[serde(default)]
    pub smtp_response: Option<String>,
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Notification(Box<SesNotification>),
    /// SNS asks the endpoint owner to confirm the subscription.
    SubscriptionConfirmation { subscribe_url: Option<String> },
    /// Any other SNS envelope type.
    Other(String),
}

/// Decodes a bare SES notification or one wrapped in an SNS envelope.
pub fn parse_inbound(raw: &[u8]) -> Result<Inbound, serde_json::Error> {
    let value: Value = serde_json::from_slice(raw)?;

    let Some(envelope_type) = value.get("Type").and_then(Value::as_str) else {
        return Ok(Inbound::Notification(Box::new(serde_json::from_value(value)?)));
    };

    match envelope_type {
        "Notification" => {
            let message = value
                .get("Message")
                .and_then(Value::as_str)
                .unwrap_or_default();
            Ok(Inbound::Notification(Box::new(serde_json::from_str(message)?)))
        }
        "SubscriptionConfirmation" => Ok(Inbound::SubscriptionConfirmation {
            subscribe_url: value
                .get("SubscribeURL")
                .and_then(Value::as_str)
                .map(str::to_string),
        }),
        other => Ok(Inbound::Other(other.to_string())),
    }
}
