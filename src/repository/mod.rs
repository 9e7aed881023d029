//! Repository interfaces and Diesel-backed implementation.
//!
//! This module defines traits for reading and writing campaigns,
//! subscribers and campaign events alongside [`DieselRepository`], a small
//! wrapper around a Diesel connection pool.

use chrono::NaiveDateTime;

use crate::db::{DbConnection, DbPool};
use crate::domain::{
    AnalyticsSummary, Campaign, CampaignStatus, DispatchEvent, NewDispatchEvent, Subscriber,
    SubscriberStatus,
};
use crate::errors::{RepositoryError, RepositoryResult};

pub mod campaign;
pub mod event;
pub mod subscriber;

/// Concrete repository backed by a Diesel connection pool.
#[derive(Clone)]
pub struct DieselRepository {
    pool: DbPool, // r2d2::Pool is cheap to clone
}

impl DieselRepository {
    /// Creates a new [`DieselRepository`] from the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> RepositoryResult<DbConnection> {
        Ok(self.pool.get()?)
    }
}

pub(crate) fn constraint_err(err: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::ValidationError(err.to_string())
}

/// Read-only operations for campaigns.
pub trait CampaignReader {
    /// Fetches a campaign by its identifier.
    fn get_campaign_by_id(&self, id: i32) -> RepositoryResult<Option<Campaign>>;
}

/// Write operations for campaigns.
pub trait CampaignWriter {
    /// Moves a campaign to `status`.
    ///
    /// `sent_at` and `recipient_count` are only written when provided.
    fn update_campaign_status(
        &self,
        id: i32,
        status: CampaignStatus,
        sent_at: Option<NaiveDateTime>,
        recipient_count: Option<i32>,
    ) -> RepositoryResult<()>;
}

/// Read-only operations for subscribers.
pub trait SubscriberReader {
    /// Finds the subscriber with `email` in the list `email_list_id`.
    fn find_subscriber(
        &self,
        email: &str,
        email_list_id: i32,
    ) -> RepositoryResult<Option<Subscriber>>;

    /// Lists the active subscribers of a list ordered by id.
    fn list_active_subscribers(&self, email_list_id: i32) -> RepositoryResult<Vec<Subscriber>>;
}

/// Write operations for subscribers.
pub trait SubscriberWriter {
    fn set_subscriber_status(&self, id: i32, status: SubscriberStatus) -> RepositoryResult<()>;
}

/// Read-only operations for the campaign event log.
pub trait EventReader {
    /// Finds the `sent` event recorded for a provider message id.
    fn find_sent_event_by_message_id(
        &self,
        message_id: &str,
    ) -> RepositoryResult<Option<DispatchEvent>>;

    /// Counts the events of a campaign per kind.
    fn summarize_campaign(&self, campaign_id: i32) -> RepositoryResult<AnalyticsSummary>;
}

/// Append-only writes to the campaign event log.
pub trait EventWriter {
    fn insert_event(&self, event: &NewDispatchEvent) -> RepositoryResult<DispatchEvent>;
}
