//! Helpers for integration tests.

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use diesel::RunQueryDsl;
use tokio_util::sync::CancellationToken;

use campaign_dispatch::db::{DbPool, establish_connection_pool, init_schema};
use campaign_dispatch::domain::{
    AnalyticsSummary, Campaign, CampaignStatus, DispatchEvent, DispatchOutcome, EmailPayload,
    NewDispatchEvent, Subscriber, SubscriberStatus,
};
use campaign_dispatch::errors::{Error, RepositoryError, RepositoryResult};
use campaign_dispatch::gateway::Gateway;
use campaign_dispatch::models::{NewCampaign, NewEmailList, NewSubscriber};
use campaign_dispatch::repository::{
    CampaignReader, CampaignWriter, EventReader, EventWriter, SubscriberReader, SubscriberWriter,
};
use campaign_dispatch::schema::{campaigns, email_lists, subscribers};
use campaign_dispatch::settings::{DispatchSettings, GatewaySettings, SenderSettings, Settings};

/// Temporary database used in integration tests.
pub struct TestDb {
    _dir: tempfile::TempDir,
    pool: DbPool,
}

impl TestDb {
    pub fn new(filename: &str) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir.");
        let path = dir.path().join(filename);
        let pool = establish_connection_pool(path.to_str().expect("Non UTF-8 temp path."))
            .expect("Failed to establish SQLite connection.");
        init_schema(&pool).expect("Failed to create schema.");
        TestDb { _dir: dir, pool }
    }

    pub fn pool(&self) -> DbPool {
        self.pool.clone()
    }

    pub fn insert_list(&self, id: i32) {
        let mut conn = self.pool.get().unwrap();
        diesel::insert_into(email_lists::table)
            .values(NewEmailList {
                id,
                name: "Readers",
                description: None,
            })
            .execute(&mut conn)
            .unwrap();
    }

    pub fn insert_subscriber(&self, list_id: i32, email: &str, status: SubscriberStatus) -> i32 {
        let mut conn = self.pool.get().unwrap();
        diesel::insert_into(subscribers::table)
            .values(NewSubscriber {
                email_list_id: list_id,
                email,
                first_name: Some("Ada"),
                last_name: None,
                status: status.as_str(),
            })
            .returning(subscribers::id)
            .get_result(&mut conn)
            .unwrap()
    }

    pub fn insert_campaign(&self, id: i32, list_id: i32, status: CampaignStatus) {
        let mut conn = self.pool.get().unwrap();
        diesel::insert_into(campaigns::table)
            .values(NewCampaign {
                id,
                email_list_id: list_id,
                name: "March",
                subject: "March news",
                content: "<p>Hello {first_name}</p>",
                template_id: Some("newsletter"),
                status: status.as_str(),
            })
            .execute(&mut conn)
            .unwrap();
    }
}

pub fn payload(recipient: &str) -> EmailPayload {
    EmailPayload {
        recipient: recipient.to_string(),
        subject: "March news".into(),
        html_body: "<p>Hello</p>".into(),
        text_body: Some("Hello".into()),
        sender_email: "news@example.com".into(),
        sender_name: Some("News".into()),
    }
}

pub fn campaign(id: i32, list_id: i32, status: CampaignStatus) -> Campaign {
    Campaign {
        id,
        email_list_id: list_id,
        name: "March".into(),
        subject: "March news".into(),
        content: "<p>Hello {first_name}</p>".into(),
        template_id: None,
        status,
        sent_at: None,
        recipient_count: 0,
    }
}

pub fn subscriber(id: i32, list_id: i32, email: &str, status: SubscriberStatus) -> Subscriber {
    Subscriber {
        id,
        email_list_id: list_id,
        email: email.to_string(),
        first_name: None,
        last_name: None,
        status,
    }
}

pub fn settings(rate_per_second: f64) -> Settings {
    Settings {
        database_url: ":memory:".into(),
        zmq_campaigns_address: "tcp://127.0.0.1:5560".into(),
        zmq_notifications_address: "tcp://127.0.0.1:5561".into(),
        public_url: "https://mail.example.com".into(),
        sender: SenderSettings {
            email: "news@example.com".into(),
            name: Some("News".into()),
        },
        dispatch: DispatchSettings {
            rate_per_second,
            max_backoff_ms: 1_000,
        },
        gateway: GatewaySettings::Ses {
            region: "us-east-1".into(),
            access_key_id: "AKID".into(),
            secret_access_key: "secret".into(),
        },
    }
}

#[derive(Default)]
struct MemoryState {
    campaigns: Vec<Campaign>,
    subscribers: Vec<Subscriber>,
    events: Vec<DispatchEvent>,
    fail_inserts: bool,
}

/// In-memory repository with the same contracts as the Diesel one.
#[derive(Default)]
pub struct MemoryRepo {
    state: Mutex<MemoryState>,
}

impl MemoryRepo {
    pub fn new(campaigns: Vec<Campaign>, subscribers: Vec<Subscriber>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                campaigns,
                subscribers,
                ..MemoryState::default()
            }),
        }
    }

    /// Makes every event insert fail with a database error.
    pub fn failing_inserts(self) -> Self {
        self.state.lock().unwrap().fail_inserts = true;
        self
    }

    pub fn events(&self) -> Vec<DispatchEvent> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn campaign(&self, id: i32) -> Option<Campaign> {
        self.state
            .lock()
            .unwrap()
            .campaigns
            .iter()
            .find(|campaign| campaign.id == id)
            .cloned()
    }

    pub fn subscriber(&self, id: i32) -> Option<Subscriber> {
        self.state
            .lock()
            .unwrap()
            .subscribers
            .iter()
            .find(|subscriber| subscriber.id == id)
            .cloned()
    }
}

impl CampaignReader for MemoryRepo {
    fn get_campaign_by_id(&self, id: i32) -> RepositoryResult<Option<Campaign>> {
        Ok(self.campaign(id))
    }
}

impl CampaignWriter for MemoryRepo {
    fn update_campaign_status(
        &self,
        id: i32,
        status: CampaignStatus,
        sent_at: Option<NaiveDateTime>,
        recipient_count: Option<i32>,
    ) -> RepositoryResult<()> {
        let mut state = self.state.lock().unwrap();
        let campaign = state
            .campaigns
            .iter_mut()
            .find(|campaign| campaign.id == id)
            .ok_or(RepositoryError::NotFound)?;
        campaign.status = status;
        if sent_at.is_some() {
            campaign.sent_at = sent_at;
        }
        if let Some(count) = recipient_count {
            campaign.recipient_count = count;
        }
        Ok(())
    }
}

impl SubscriberReader for MemoryRepo {
    fn find_subscriber(
        &self,
        email: &str,
        email_list_id: i32,
    ) -> RepositoryResult<Option<Subscriber>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .subscribers
            .iter()
            .find(|s| s.email == email && s.email_list_id == email_list_id)
            .cloned())
    }

    fn list_active_subscribers(&self, email_list_id: i32) -> RepositoryResult<Vec<Subscriber>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .subscribers
            .iter()
            .filter(|s| s.email_list_id == email_list_id && s.status == SubscriberStatus::Active)
            .cloned()
            .collect())
    }
}

impl SubscriberWriter for MemoryRepo {
    fn set_subscriber_status(&self, id: i32, status: SubscriberStatus) -> RepositoryResult<()> {
        let mut state = self.state.lock().unwrap();
        let subscriber = state
            .subscribers
            .iter_mut()
            .find(|subscriber| subscriber.id == id)
            .ok_or(RepositoryError::NotFound)?;
        subscriber.status = status;
        Ok(())
    }
}

impl EventReader for MemoryRepo {
    fn find_sent_event_by_message_id(
        &self,
        message_id: &str,
    ) -> RepositoryResult<Option<DispatchEvent>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .events
            .iter()
            .find(|event| {
                event.kind == campaign_dispatch::domain::EventKind::Sent
                    && event.message_id() == Some(message_id)
            })
            .cloned())
    }

    fn summarize_campaign(&self, campaign_id: i32) -> RepositoryResult<AnalyticsSummary> {
        let mut summary = AnalyticsSummary::default();
        for event in self.state.lock().unwrap().events.iter() {
            if event.campaign_id == campaign_id {
                summary.record(event.kind, 1);
            }
        }
        Ok(summary)
    }
}

impl EventWriter for MemoryRepo {
    fn insert_event(&self, event: &NewDispatchEvent) -> RepositoryResult<DispatchEvent> {
        let mut state = self.state.lock().unwrap();
        if state.fail_inserts {
            return Err(RepositoryError::Database(
                diesel::result::Error::BrokenTransactionManager,
            ));
        }
        let stored = DispatchEvent {
            id: state.events.len() as i32 + 1,
            campaign_id: event.campaign_id,
            subscriber_id: event.subscriber_id,
            kind: event.kind,
            data: event.data.clone(),
            created_at: Utc::now().naive_utc(),
        };
        state.events.push(stored.clone());
        Ok(stored)
    }
}

/// What the scripted gateway does for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Deliver,
    Reject,
    Throttle,
    Explode,
}

/// Gateway that follows a fixed script and records every call.
pub struct ScriptedGateway {
    script: Vec<Step>,
    fallback: Step,
    calls: Mutex<Vec<String>>,
    cancel_on_call: Option<(usize, CancellationToken)>,
}

impl ScriptedGateway {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            script,
            fallback: Step::Deliver,
            calls: Mutex::new(Vec::new()),
            cancel_on_call: None,
        }
    }

    pub fn always(step: Step) -> Self {
        Self {
            fallback: step,
            ..Self::new(Vec::new())
        }
    }

    /// Cancels `token` while handling the `call`-th call (1-based).
    pub fn cancelling(mut self, call: usize, token: CancellationToken) -> Self {
        self.cancel_on_call = Some((call, token));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn send(&self, payload: &EmailPayload) -> Result<DispatchOutcome, Error> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(payload.recipient.clone());
            calls.len()
        };
        if let Some((at, token)) = &self.cancel_on_call {
            if *at == call {
                token.cancel();
            }
        }
        match self.script.get(call - 1).copied().unwrap_or(self.fallback) {
            Step::Deliver => Ok(DispatchOutcome::delivered(Some(format!("msg-{call}")))),
            Step::Reject => Ok(DispatchOutcome::failed("SES API error: 400")),
            Step::Throttle => Ok(DispatchOutcome::throttled("SES API error: 400")),
            Step::Explode => Err(Error::Config("gateway exploded".into())),
        }
    }
}
