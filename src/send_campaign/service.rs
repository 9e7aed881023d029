use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::dispatch::{DispatchOptions, ProgressFn, dispatch_bulk};
use crate::domain::{AggregateResult, CampaignStatus, EmailPayload};
use crate::errors::Error;
use crate::gateway::Gateway;
use crate::repository::{
    CampaignReader, CampaignWriter, EventReader, EventWriter, SubscriberReader,
};
use crate::settings::Settings;

use super::message_builder::build_payload;

/// Status a campaign ends in once its dispatch completes.
///
/// A run cancelled before anything was delivered counts as failed.
pub fn final_status(result: &AggregateResult) -> CampaignStatus {
    if result.successful > 0 || (result.failed == 0 && result.skipped == 0) {
        CampaignStatus::Sent
    } else {
        CampaignStatus::Failed
    }
}

/// Sends a draft campaign to every active subscriber of its list.
///
/// The campaign is marked `sending` before the first email goes out and
/// `sent` or `failed` afterwards. Errors raised after the campaign left the
/// draft state mark it `failed` before being returned.
pub async fn send_campaign<R, G>(
    campaign_id: i32,
    repo: &R,
    gateway: &G,
    settings: &Settings,
    cancel: CancellationToken,
) -> Result<AggregateResult, Error>
where
    R: CampaignReader + CampaignWriter + SubscriberReader + EventReader + EventWriter + Sync,
    G: Gateway + ?Sized,
{
    let campaign = match repo.get_campaign_by_id(campaign_id)? {
        Some(campaign) => campaign,
        None => {
            log::error!("Campaign not found for campaign_id: {campaign_id}");
            return Err(Error::Campaign("campaign not found".into()));
        }
    };

    if campaign.status != CampaignStatus::Draft {
        return Err(Error::Campaign(format!(
            "campaign#{campaign_id} is {}, not draft",
            campaign.status.as_str()
        )));
    }

    let subscribers = repo.list_active_subscribers(campaign.email_list_id)?;
    if subscribers.is_empty() {
        return Err(Error::Campaign(format!(
            "no active subscribers for campaign#{campaign_id}"
        )));
    }

    let options = DispatchOptions::from_settings(&settings.dispatch)?.with_cancellation(cancel);

    let recipient_count = i32::try_from(subscribers.len())
        .map_err(|_| Error::Campaign("too many recipients".into()))?;
    repo.update_campaign_status(
        campaign_id,
        CampaignStatus::Sending,
        Some(Utc::now().naive_utc()),
        Some(recipient_count),
    )?;

    log::info!(
        "Sending campaign#{campaign_id} to {} subscribers of list#{}",
        subscribers.len(),
        campaign.email_list_id
    );

    let payloads: Vec<EmailPayload> = subscribers
        .iter()
        .map(|subscriber| {
            build_payload(&campaign, subscriber, &settings.public_url, &settings.sender)
        })
        .collect();

    let progress: ProgressFn<'_> = &|processed: usize, total: usize| {
        log::info!("Campaign {campaign_id}: {processed}/{total} emails processed");
    };

    let result = dispatch_bulk(
        &payloads,
        campaign_id,
        gateway,
        repo,
        &options,
        Some(progress),
    )
    .await;

    let status = final_status(&result);
    if let Err(e) = repo.update_campaign_status(campaign_id, status, None, None) {
        log::error!("Failed to update status of campaign#{campaign_id}: {e}");
        mark_failed(repo, campaign_id);
        return Err(e.into());
    }

    match repo.summarize_campaign(campaign_id) {
        Ok(summary) => log::info!("Campaign#{campaign_id} analytics: {summary:?}"),
        Err(e) => log::warn!("Cannot summarize campaign#{campaign_id}: {e}"),
    }

    Ok(result)
}

fn mark_failed<R: CampaignWriter>(repo: &R, campaign_id: i32) {
    if let Err(e) = repo.update_campaign_status(campaign_id, CampaignStatus::Failed, None, None) {
        log::error!("Error updating campaign#{campaign_id} status to failed: {e}");
    }
}
