mod common;

use chrono::Utc;
use serde_json::json;

use campaign_dispatch::domain::{
    AnalyticsSummary, CampaignStatus, EventData, EventKind, NewDispatchEvent, SubscriberStatus,
};
use campaign_dispatch::errors::RepositoryError;
use campaign_dispatch::repository::{
    CampaignReader, CampaignWriter, DieselRepository, EventReader, EventWriter, SubscriberReader,
    SubscriberWriter,
};

fn data(value: serde_json::Value) -> EventData {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn event(campaign_id: i32, subscriber_id: i32, kind: EventKind, data: EventData) -> NewDispatchEvent {
    NewDispatchEvent {
        campaign_id,
        subscriber_id,
        kind,
        data,
    }
}

#[test]
fn campaign_status_updates_are_persisted() {
    let test_db = common::TestDb::new("campaigns.db");
    test_db.insert_list(1);
    test_db.insert_campaign(1, 1, CampaignStatus::Draft);
    let repo = DieselRepository::new(test_db.pool());

    let campaign = repo.get_campaign_by_id(1).unwrap().unwrap();
    assert_eq!(campaign.status, CampaignStatus::Draft);
    assert_eq!(campaign.template_id.as_deref(), Some("newsletter"));
    assert!(campaign.sent_at.is_none());

    let sent_at = Utc::now().naive_utc();
    repo.update_campaign_status(1, CampaignStatus::Sending, Some(sent_at), Some(3))
        .unwrap();
    repo.update_campaign_status(1, CampaignStatus::Sent, None, None)
        .unwrap();

    let campaign = repo.get_campaign_by_id(1).unwrap().unwrap();
    assert_eq!(campaign.status, CampaignStatus::Sent);
    assert_eq!(campaign.recipient_count, 3);
    assert!(campaign.sent_at.is_some());

    assert!(repo.get_campaign_by_id(2).unwrap().is_none());
    assert!(matches!(
        repo.update_campaign_status(2, CampaignStatus::Failed, None, None),
        Err(RepositoryError::NotFound)
    ));
}

#[test]
fn subscribers_are_scoped_to_their_list() {
    let test_db = common::TestDb::new("subscribers.db");
    test_db.insert_list(1);
    test_db.insert_list(2);
    let ada = test_db.insert_subscriber(1, "ada@example.com", SubscriberStatus::Active);
    let gone = test_db.insert_subscriber(1, "gone@example.com", SubscriberStatus::Unsubscribed);
    let other = test_db.insert_subscriber(2, "ada@example.com", SubscriberStatus::Active);
    let repo = DieselRepository::new(test_db.pool());

    let found = repo.find_subscriber("ada@example.com", 1).unwrap().unwrap();
    assert_eq!(found.id, ada);
    assert_eq!(found.first_name.as_deref(), Some("Ada"));
    let found = repo.find_subscriber("ada@example.com", 2).unwrap().unwrap();
    assert_eq!(found.id, other);
    assert!(repo.find_subscriber("ada@example.com", 3).unwrap().is_none());

    let active: Vec<i32> = repo
        .list_active_subscribers(1)
        .unwrap()
        .iter()
        .map(|subscriber| subscriber.id)
        .collect();
    assert_eq!(active, vec![ada]);

    repo.set_subscriber_status(ada, SubscriberStatus::Bounced)
        .unwrap();
    assert!(repo.list_active_subscribers(1).unwrap().is_empty());
    let found = repo.find_subscriber("gone@example.com", 1).unwrap().unwrap();
    assert_eq!(found.id, gone);
    assert_eq!(found.status, SubscriberStatus::Unsubscribed);

    assert!(matches!(
        repo.set_subscriber_status(999, SubscriberStatus::Bounced),
        Err(RepositoryError::NotFound)
    ));
}

#[test]
fn events_are_matched_by_message_id() {
    let test_db = common::TestDb::new("events.db");
    test_db.insert_list(1);
    test_db.insert_campaign(1, 1, CampaignStatus::Sending);
    let ada = test_db.insert_subscriber(1, "ada@example.com", SubscriberStatus::Active);
    let repo = DieselRepository::new(test_db.pool());

    let sent = repo
        .insert_event(&event(
            1,
            ada,
            EventKind::Sent,
            data(json!({"messageId": "0100-abc", "timestamp": "2024-01-15T12:30:45+00:00"})),
        ))
        .unwrap();
    assert_eq!(sent.kind, EventKind::Sent);
    assert_eq!(sent.message_id(), Some("0100-abc"));

    // A later event with the same id must not shadow the original send.
    repo.insert_event(&event(
        1,
        ada,
        EventKind::Bounced,
        data(json!({"originalMessageId": "0100-abc", "messageId": "0100-abc"})),
    ))
    .unwrap();

    let found = repo
        .find_sent_event_by_message_id("0100-abc")
        .unwrap()
        .unwrap();
    assert_eq!(found.id, sent.id);
    assert_eq!(found.subscriber_id, ada);
    assert_eq!(found.data["timestamp"], "2024-01-15T12:30:45+00:00");

    assert!(
        repo.find_sent_event_by_message_id("unknown")
            .unwrap()
            .is_none()
    );
}

#[test]
fn campaign_summary_counts_events_per_kind() {
    let test_db = common::TestDb::new("summary.db");
    test_db.insert_list(1);
    test_db.insert_campaign(1, 1, CampaignStatus::Sent);
    test_db.insert_campaign(2, 1, CampaignStatus::Sent);
    let ada = test_db.insert_subscriber(1, "ada@example.com", SubscriberStatus::Active);
    let bob = test_db.insert_subscriber(1, "bob@example.com", SubscriberStatus::Active);
    let repo = DieselRepository::new(test_db.pool());

    for (campaign_id, subscriber_id, kind) in [
        (1, ada, EventKind::Sent),
        (1, bob, EventKind::Sent),
        (1, bob, EventKind::Bounced),
        (1, ada, EventKind::Opened),
        (1, ada, EventKind::Clicked),
        (2, ada, EventKind::Sent),
    ] {
        repo.insert_event(&event(campaign_id, subscriber_id, kind, EventData::new()))
            .unwrap();
    }

    let summary = repo.summarize_campaign(1).unwrap();
    assert_eq!(
        summary,
        AnalyticsSummary {
            sent: 2,
            delivered: 0,
            bounced: 1,
            complaints: 0,
            opened: 1,
            clicked: 1,
        }
    );
    assert_eq!(repo.summarize_campaign(3).unwrap(), AnalyticsSummary::default());
}
