use chrono::Utc;
use serde_json::Value;

use crate::domain::{EventData, EventKind, NewDispatchEvent, SubscriberStatus};
use crate::errors::RepositoryResult;
use crate::repository::{EventReader, EventWriter, SubscriberWriter};

use super::notification::{NotificationType, SesNotification};

/// What happened to an inbound notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// An event of this kind was appended.
    Recorded(EventKind),
    /// No `sent` event carries the notification's message id.
    Unmatched,
    /// The notification type is not tracked.
    Ignored,
}

fn insert_if_some(data: &mut EventData, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        data.insert(key.into(), Value::from(value));
    }
}

/// Records a provider notification against the send it refers to.
///
/// Hard bounces also flag the subscriber as `bounced` so later campaigns
/// skip the address.
pub fn handle_notification<R>(
    repo: &R,
    notification: &SesNotification,
) -> RepositoryResult<IngestOutcome>
where
    R: EventReader + EventWriter + SubscriberWriter,
{
    let kind = match &notification.event_type {
        NotificationType::Bounce => EventKind::Bounced,
        NotificationType::Complaint => EventKind::Complaint,
        NotificationType::Delivery => EventKind::Delivered,
        NotificationType::Other(other) => {
            log::debug!("Ignoring {other} notification");
            return Ok(IngestOutcome::Ignored);
        }
    };

    let message_id = notification.mail.message_id.as_str();
    let Some(sent) = repo.find_sent_event_by_message_id(message_id)? else {
        log::warn!("No sent event matches {kind} notification for message {message_id}");
        return Ok(IngestOutcome::Unmatched);
    };

    let bounce = notification.bounce.as_ref();
    let mut data = EventData::new();
    insert_if_some(&mut data, "bounceType", bounce.map(|b| b.bounce_type.as_str()));
    insert_if_some(
        &mut data,
        "bounceSubType",
        bounce.and_then(|b| b.bounce_sub_type.as_deref()),
    );
    insert_if_some(
        &mut data,
        "complaintType",
        notification
            .complaint
            .as_ref()
            .and_then(|c| c.complaint_feedback_type.as_deref()),
    );
    insert_if_some(
        &mut data,
        "smtpResponse",
        notification
            .delivery
            .as_ref()
            .and_then(|d| d.smtp_response.as_deref()),
    );
    data.insert("timestamp".into(), Value::from(Utc::now().to_rfc3339()));
    data.insert("originalMessageId".into(), Value::from(message_id));

    repo.insert_event(&NewDispatchEvent {
        campaign_id: sent.campaign_id,
        subscriber_id: sent.subscriber_id,
        kind,
        data,
    })?;

    log::info!(
        "Recorded {kind} for subscriber#{} in campaign#{}",
        sent.subscriber_id,
        sent.campaign_id
    );

    if kind == EventKind::Bounced && bounce.is_some_and(|b| b.is_permanent()) {
        repo.set_subscriber_status(sent.subscriber_id, SubscriberStatus::Bounced)?;
        log::info!("Marked subscriber#{} as bounced", sent.subscriber_id);
    }

    Ok(IngestOutcome::Recorded(kind))
}
