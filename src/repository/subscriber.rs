//! Subscriber repository implementation backed by Diesel.

use chrono::Utc;
use diesel::prelude::*;

use crate::domain::{Subscriber as DomainSubscriber, SubscriberStatus};
use crate::errors::{RepositoryError, RepositoryResult};
use crate::models::Subscriber as DbSubscriber;
use crate::repository::{DieselRepository, SubscriberReader, SubscriberWriter, constraint_err};

impl SubscriberReader for DieselRepository {
    fn find_subscriber(
        &self,
        email: &str,
        email_list_id: i32,
    ) -> RepositoryResult<Option<DomainSubscriber>> {
        use crate::schema::subscribers;
        let mut conn = self.conn()?;

        let subscriber = subscribers::table
            .filter(subscribers::email.eq(email))
            .filter(subscribers::email_list_id.eq(email_list_id))
            .select(DbSubscriber::as_select())
            .first::<DbSubscriber>(&mut conn)
            .optional()?;

        subscriber
            .map(|subscriber| subscriber.try_into().map_err(constraint_err))
            .transpose()
    }

    fn list_active_subscribers(
        &self,
        email_list_id: i32,
    ) -> RepositoryResult<Vec<DomainSubscriber>> {
        use crate::schema::subscribers;
        let mut conn = self.conn()?;

        let subscribers = subscribers::table
            .filter(subscribers::email_list_id.eq(email_list_id))
            .filter(subscribers::status.eq(SubscriberStatus::Active.as_str()))
            .order(subscribers::id.asc())
            .select(DbSubscriber::as_select())
            .load::<DbSubscriber>(&mut conn)?;

        subscribers
            .into_iter()
            .map(|subscriber| subscriber.try_into().map_err(constraint_err))
            .collect()
    }
}

impl SubscriberWriter for DieselRepository {
    fn set_subscriber_status(&self, id: i32, status: SubscriberStatus) -> RepositoryResult<()> {
        use crate::schema::subscribers;
        let mut conn = self.conn()?;

        let updated = diesel::update(subscribers::table.filter(subscribers::id.eq(id)))
            .set((
                subscribers::status.eq(status.as_str()),
                subscribers::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(&mut conn)?;

        match updated {
            0 => Err(RepositoryError::NotFound),
            _ => Ok(()),
        }
    }
}
