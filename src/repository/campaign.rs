//! Campaign repository implementation backed by Diesel.

use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;

use crate::domain::{Campaign as DomainCampaign, CampaignStatus};
use crate::errors::{RepositoryError, RepositoryResult};
use crate::models::{Campaign as DbCampaign, UpdateCampaignStatus};
use crate::repository::{CampaignReader, CampaignWriter, DieselRepository, constraint_err};

impl CampaignReader for DieselRepository {
    fn get_campaign_by_id(&self, id: i32) -> RepositoryResult<Option<DomainCampaign>> {
        use crate::schema::campaigns;
        let mut conn = self.conn()?;

        let campaign = campaigns::table
            .filter(campaigns::id.eq(id))
            .select(DbCampaign::as_select())
            .first::<DbCampaign>(&mut conn)
            .optional()?;

        campaign
            .map(|campaign| campaign.try_into().map_err(constraint_err))
            .transpose()
    }
}

impl CampaignWriter for DieselRepository {
    fn update_campaign_status(
        &self,
        id: i32,
        status: CampaignStatus,
        sent_at: Option<NaiveDateTime>,
        recipient_count: Option<i32>,
    ) -> RepositoryResult<()> {
        use crate::schema::campaigns;
        let mut conn = self.conn()?;

        let changeset = UpdateCampaignStatus {
            status: status.as_str(),
            sent_at,
            recipient_count,
            updated_at: Utc::now().naive_utc(),
        };

        let updated = diesel::update(campaigns::table.filter(campaigns::id.eq(id)))
            .set(changeset)
            .execute(&mut conn)?;

        match updated {
            0 => Err(RepositoryError::NotFound),
            _ => Ok(()),
        }
    }
}
