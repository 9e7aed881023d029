//! Translates delivery outcomes into persisted campaign events.
//!
//! Logging never fails the caller: a missing campaign, an unknown
//! subscriber or a persistence error is reported through `log` and the
//! event is dropped.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::{DispatchEvent, EventData, EventKind, NewDispatchEvent};
use crate::errors::RepositoryResult;
use crate::repository::{CampaignReader, EventWriter, SubscriberReader};

/// Event data recorded for an accepted send.
pub fn sent_data(message_id: Option<&str>, at: DateTime<Utc>) -> EventData {
    let mut data = EventData::new();
    if let Some(message_id) = message_id {
        data.insert("messageId".into(), Value::from(message_id));
    }
    data.insert("timestamp".into(), Value::from(at.to_rfc3339()));
    data
}

/// Event data recorded for a failed send.
pub fn failure_data(error: &str, at: DateTime<Utc>) -> EventData {
    let mut data = EventData::new();
    data.insert("error".into(), Value::from(error));
    data.insert("timestamp".into(), Value::from(at.to_rfc3339()));
    data
}

/// Records one event for `email` in the campaign's list.
///
/// Returns the stored event, or `None` when nothing was written. Every call
/// resolves the campaign and subscriber afresh and writes its own row;
/// repeated calls produce repeated rows.
pub fn log_email_event<R>(
    repo: &R,
    campaign_id: i32,
    email: &str,
    kind: EventKind,
    data: EventData,
) -> Option<DispatchEvent>
where
    R: CampaignReader + SubscriberReader + EventWriter + ?Sized,
{
    match try_log_email_event(repo, campaign_id, email, kind, data) {
        Ok(event) => event,
        Err(e) => {
            log::error!("Error logging {kind} event for {email} in campaign#{campaign_id}: {e}");
            None
        }
    }
}

fn try_log_email_event<R>(
    repo: &R,
    campaign_id: i32,
    email: &str,
    kind: EventKind,
    data: EventData,
) -> RepositoryResult<Option<DispatchEvent>>
where
    R: CampaignReader + SubscriberReader + EventWriter + ?Sized,
{
    let Some(campaign) = repo.get_campaign_by_id(campaign_id)? else {
        log::error!("Campaign not found: {campaign_id}");
        return Ok(None);
    };

    let Some(subscriber) = repo.find_subscriber(email, campaign.email_list_id)? else {
        log::error!("Subscriber not found: {email} in list#{}", campaign.email_list_id);
        return Ok(None);
    };

    let event = repo.insert_event(&NewDispatchEvent {
        campaign_id,
        subscriber_id: subscriber.id,
        kind,
        data,
    })?;

    log::debug!("Logged {kind} event#{} for {email}", event.id);
    Ok(Some(event))
}
