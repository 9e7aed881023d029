//! Campaign event log backed by Diesel.
//!
//! Events are only ever inserted. The provider message id is copied out of
//! the JSON payload into its own indexed column so bounce notifications can
//! be matched with a plain equality filter.

use chrono::Utc;
use diesel::dsl::count_star;
use diesel::prelude::*;
use serde_json::Value;

use crate::domain::{AnalyticsSummary, DispatchEvent, EventKind, NewDispatchEvent};
use crate::errors::{RepositoryError, RepositoryResult};
use crate::models::{CampaignEvent as DbCampaignEvent, NewCampaignEvent};
use crate::repository::{DieselRepository, EventReader, EventWriter, constraint_err};

impl EventReader for DieselRepository {
    fn find_sent_event_by_message_id(
        &self,
        message_id: &str,
    ) -> RepositoryResult<Option<DispatchEvent>> {
        use crate::schema::campaign_events;
        let mut conn = self.conn()?;

        let event = campaign_events::table
            .filter(campaign_events::message_id.eq(message_id))
            .filter(campaign_events::event_type.eq(EventKind::Sent.as_str()))
            .order(campaign_events::id.asc())
            .select(DbCampaignEvent::as_select())
            .first::<DbCampaignEvent>(&mut conn)
            .optional()?;

        event
            .map(|event| event.try_into().map_err(constraint_err))
            .transpose()
    }

    fn summarize_campaign(&self, campaign_id: i32) -> RepositoryResult<AnalyticsSummary> {
        use crate::schema::campaign_events;
        let mut conn = self.conn()?;

        let counts = campaign_events::table
            .filter(campaign_events::campaign_id.eq(campaign_id))
            .group_by(campaign_events::event_type)
            .select((campaign_events::event_type, count_star()))
            .load::<(String, i64)>(&mut conn)?;

        let mut summary = AnalyticsSummary::default();
        for (event_type, count) in counts {
            match event_type.parse::<EventKind>() {
                Ok(kind) => summary.record(kind, count),
                Err(e) => log::warn!("Skipping events of campaign#{campaign_id}: {e}"),
            }
        }
        Ok(summary)
    }
}

impl EventWriter for DieselRepository {
    fn insert_event(&self, event: &NewDispatchEvent) -> RepositoryResult<DispatchEvent> {
        use crate::schema::campaign_events;
        let mut conn = self.conn()?;

        let event_data = serde_json::to_string(&event.data)
            .map_err(|e| RepositoryError::ValidationError(format!("Invalid event JSON: {e}")))?;
        let message_id = event.data.get("messageId").and_then(Value::as_str);

        let inserted: DbCampaignEvent = diesel::insert_into(campaign_events::table)
            .values(NewCampaignEvent {
                campaign_id: event.campaign_id,
                subscriber_id: event.subscriber_id,
                event_type: event.kind.as_str(),
                event_data,
                message_id,
                created_at: Utc::now().naive_utc(),
            })
            .returning(DbCampaignEvent::as_returning())
            .get_result(&mut conn)?;

        inserted.try_into().map_err(constraint_err)
    }
}
