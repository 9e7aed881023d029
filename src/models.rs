//! Diesel row types and their conversions into domain types.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::{
    Campaign as DomainCampaign, DispatchEvent, EventData, Subscriber as DomainSubscriber,
};
use crate::schema::{campaign_events, campaigns, email_lists, subscribers};

#[derive(Insertable)]
#[diesel(table_name = email_lists)]
pub struct NewEmailList<'a> {
    pub id: i32,
    pub name: &'a str,
    pub description: Option<&'a str>,
}

#[derive(Debug, Queryable, Selectable, Identifiable)]
#[diesel(table_name = subscribers)]
pub struct Subscriber {
    pub id: i32,
    pub email_list_id: i32,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub status: String,
}

#[derive(Insertable)]
#[diesel(table_name = subscribers)]
pub struct NewSubscriber<'a> {
    pub email_list_id: i32,
    pub email: &'a str,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub status: &'a str,
}

impl TryFrom<Subscriber> for DomainSubscriber {
    type Error = String;

    fn try_from(row: Subscriber) -> Result<Self, Self::Error> {
        Ok(DomainSubscriber {
            id: row.id,
            email_list_id: row.email_list_id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            status: row.status.parse()?,
        })
    }
}

#[derive(Debug, Queryable, Selectable, Identifiable)]
#[diesel(table_name = campaigns)]
pub struct Campaign {
    pub id: i32,
    pub email_list_id: i32,
    pub name: String,
    pub subject: String,
    pub content: String,
    pub template_id: Option<String>,
    pub status: String,
    pub sent_at: Option<NaiveDateTime>,
    pub recipient_count: i32,
}

#[derive(Insertable)]
#[diesel(table_name = campaigns)]
pub struct NewCampaign<'a> {
    pub id: i32,
    pub email_list_id: i32,
    pub name: &'a str,
    pub subject: &'a str,
    pub content: &'a str,
    pub template_id: Option<&'a str>,
    pub status: &'a str,
}

impl TryFrom<Campaign> for DomainCampaign {
    type Error = String;

    fn try_from(row: Campaign) -> Result<Self, Self::Error> {
        Ok(DomainCampaign {
            id: row.id,
            email_list_id: row.email_list_id,
            name: row.name,
            subject: row.subject,
            content: row.content,
            template_id: row.template_id,
            status: row.status.parse()?,
            sent_at: row.sent_at,
            recipient_count: row.recipient_count,
        })
    }
}

/// Partial update applied when a campaign changes status.
#[derive(AsChangeset)]
#[diesel(table_name = campaigns)]
pub struct UpdateCampaignStatus<'a> {
    pub status: &'a str,
    pub sent_at: Option<NaiveDateTime>,
    pub recipient_count: Option<i32>,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Queryable, Selectable, Identifiable)]
#[diesel(table_name = campaign_events)]
pub struct CampaignEvent {
    pub id: i32,
    pub campaign_id: i32,
    pub subscriber_id: i32,
    pub event_type: String,
    pub event_data: String,
    pub message_id: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = campaign_events)]
pub struct NewCampaignEvent<'a> {
    pub campaign_id: i32,
    pub subscriber_id: i32,
    pub event_type: &'a str,
    pub event_data: String,
    pub message_id: Option<&'a str>,
    pub created_at: NaiveDateTime,
}

impl TryFrom<CampaignEvent> for DispatchEvent {
    type Error = String;

    fn try_from(row: CampaignEvent) -> Result<Self, Self::Error> {
        let data: EventData = serde_json::from_str(&row.event_data)
            .map_err(|e| format!("invalid event data for event#{}: {e}", row.id))?;
        Ok(DispatchEvent {
            id: row.id,
            campaign_id: row.campaign_id,
            subscriber_id: row.subscriber_id,
            kind: row.event_type.parse()?,
            data,
            created_at: row.created_at,
        })
    }
}
