//! Domain types shared by the dispatch pipeline, repositories and workers.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One email to send to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailPayload {
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: Option<String>,
    pub sender_email: String,
    pub sender_name: Option<String>,
}

impl EmailPayload {
    /// Formats the sender as `Name <email>` when a name is present.
    pub fn source(&self) -> String {
        match self.sender_name.as_deref() {
            Some(name) if !name.is_empty() => format!("{name} <{}>", self.sender_email),
            _ => self.sender_email.clone(),
        }
    }
}

/// Result of a single delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub provider_message_id: Option<String>,
    pub succeeded: bool,
    pub failure_reason: Option<String>,
    /// The provider signalled that the sending rate was exceeded.
    pub throttled: bool,
}

impl DispatchOutcome {
    pub fn delivered(message_id: Option<String>) -> Self {
        Self {
            provider_message_id: message_id,
            succeeded: true,
            failure_reason: None,
            throttled: false,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            provider_message_id: None,
            succeeded: false,
            failure_reason: Some(reason.into()),
            throttled: false,
        }
    }

    pub fn throttled(reason: impl Into<String>) -> Self {
        Self {
            throttled: true,
            ..Self::failed(reason)
        }
    }
}

/// Kind of a recorded campaign event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Sent,
    Delivered,
    Bounced,
    Complaint,
    Opened,
    Clicked,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Sent => "sent",
            EventKind::Delivered => "delivered",
            EventKind::Bounced => "bounced",
            EventKind::Complaint => "complaint",
            EventKind::Opened => "opened",
            EventKind::Clicked => "clicked",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(EventKind::Sent),
            "delivered" => Ok(EventKind::Delivered),
            "bounced" => Ok(EventKind::Bounced),
            "complaint" => Ok(EventKind::Complaint),
            "opened" => Ok(EventKind::Opened),
            "clicked" => Ok(EventKind::Clicked),
            other => Err(format!("unknown event kind: {other}")),
        }
    }
}

/// Free-form event payload, stored as a JSON object.
pub type EventData = Map<String, Value>;

/// A persisted campaign event. Events are append-only.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchEvent {
    pub id: i32,
    pub campaign_id: i32,
    pub subscriber_id: i32,
    pub kind: EventKind,
    pub data: EventData,
    pub created_at: NaiveDateTime,
}

impl DispatchEvent {
    /// Provider message id carried in the event data, if any.
    pub fn message_id(&self) -> Option<&str> {
        self.data.get("messageId").and_then(Value::as_str)
    }
}

/// An event to append to the log.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDispatchEvent {
    pub campaign_id: i32,
    pub subscriber_id: i32,
    pub kind: EventKind,
    pub data: EventData,
}

/// Summary returned by a bulk dispatch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregateResult {
    pub successful: usize,
    pub failed: usize,
    /// Payloads never attempted because the run was cancelled.
    pub skipped: usize,
}

impl AggregateResult {
    pub fn total(&self) -> usize {
        self.successful + self.failed + self.skipped
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignStatus {
    Draft,
    Sending,
    Sent,
    Failed,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Sending => "sending",
            CampaignStatus::Sent => "sent",
            CampaignStatus::Failed => "failed",
        }
    }
}

impl FromStr for CampaignStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(CampaignStatus::Draft),
            "sending" => Ok(CampaignStatus::Sending),
            "sent" => Ok(CampaignStatus::Sent),
            "failed" => Ok(CampaignStatus::Failed),
            other => Err(format!("unknown campaign status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberStatus {
    Active,
    Unsubscribed,
    Bounced,
}

impl SubscriberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriberStatus::Active => "active",
            SubscriberStatus::Unsubscribed => "unsubscribed",
            SubscriberStatus::Bounced => "bounced",
        }
    }
}

impl FromStr for SubscriberStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SubscriberStatus::Active),
            "unsubscribed" => Ok(SubscriberStatus::Unsubscribed),
            "bounced" => Ok(SubscriberStatus::Bounced),
            other => Err(format!("unknown subscriber status: {other}")),
        }
    }
}

/// A campaign targeting one subscriber list.
#[derive(Debug, Clone, PartialEq)]
pub struct Campaign {
    pub id: i32,
    pub email_list_id: i32,
    pub name: String,
    pub subject: String,
    pub content: String,
    pub template_id: Option<String>,
    pub status: CampaignStatus,
    pub sent_at: Option<NaiveDateTime>,
    pub recipient_count: i32,
}

/// A member of a subscriber list.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscriber {
    pub id: i32,
    pub email_list_id: i32,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub status: SubscriberStatus,
}

impl Subscriber {
    /// First and last name joined by a space, if either is set.
    pub fn display_name(&self) -> Option<String> {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        (!name.is_empty()).then_some(name)
    }
}

/// Per-kind event counts for one campaign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnalyticsSummary {
    pub sent: i64,
    pub delivered: i64,
    pub bounced: i64,
    pub complaints: i64,
    pub opened: i64,
    pub clicked: i64,
}

impl AnalyticsSummary {
    /// Adds `count` events of `kind` to the summary.
    pub fn record(&mut self, kind: EventKind, count: i64) {
        let slot = match kind {
            EventKind::Sent => &mut self.sent,
            EventKind::Delivered => &mut self.delivered,
            EventKind::Bounced => &mut self.bounced,
            EventKind::Complaint => &mut self.complaints,
            EventKind::Opened => &mut self.opened,
            EventKind::Clicked => &mut self.clicked,
        };
        *slot += count;
    }
}
