//! Paced bulk dispatch of campaign emails.
//!
//! [`dispatch_bulk`] attempts every payload exactly once, strictly in input
//! order, records one event per attempt and waits between consecutive sends
//! to stay under the provider's rate limit.

pub mod event_logger;
pub mod pacer;

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::domain::{AggregateResult, DispatchOutcome, EmailPayload, EventKind};
use crate::errors::Error;
use crate::gateway::Gateway;
use crate::repository::{CampaignReader, EventWriter, SubscriberReader};
use crate::settings::DispatchSettings;

use event_logger::{failure_data, log_email_event, sent_data};
use pacer::Pacer;

/// Progress notification: `(processed, total)`.
pub type ProgressFn<'a> = &'a (dyn Fn(usize, usize) + Send + Sync);

/// Pacing and cancellation for one run.
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub interval: Duration,
    pub max_backoff: Duration,
    pub cancel: CancellationToken,
}

impl DispatchOptions {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_backoff: interval,
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_settings(settings: &DispatchSettings) -> Result<Self, Error> {
        Ok(Self {
            interval: settings.interval()?,
            max_backoff: settings.max_backoff(),
            cancel: CancellationToken::new(),
        })
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Sends `payloads` one at a time and returns the aggregate counts.
///
/// Each payload gets a single attempt. Whatever the outcome, one event is
/// logged before the progress callback fires and before the pacing delay.
/// Gateway errors count as failures and never abort the run. Cancellation
/// is honoured before an attempt starts and during the pacing delay; an
/// attempt already in flight is completed and logged, and payloads never
/// attempted are reported as `skipped`.
pub async fn dispatch_bulk<G, R>(
    payloads: &[EmailPayload],
    campaign_id: i32,
    gateway: &G,
    repo: &R,
    options: &DispatchOptions,
    on_progress: Option<ProgressFn<'_>>,
) -> AggregateResult
where
    G: Gateway + ?Sized,
    R: CampaignReader + SubscriberReader + EventWriter + Sync + ?Sized,
{
    let total = payloads.len();
    let mut result = AggregateResult::default();
    let mut pacer = Pacer::new(options.interval, options.max_backoff);

    log::info!("Dispatching {total} emails for campaign#{campaign_id}");

    for (i, payload) in payloads.iter().enumerate() {
        if options.cancel.is_cancelled() {
            result.skipped = total - i;
            log::warn!(
                "Dispatch for campaign#{campaign_id} cancelled, skipping {} emails",
                result.skipped
            );
            break;
        }

        let outcome = match gateway.send(payload).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Failed to send email to {}: {e}", payload.recipient);
                DispatchOutcome::failed(e.to_string())
            }
        };

        let now = Utc::now();
        if outcome.succeeded {
            result.successful += 1;
            log::info!("Email sent successfully to {}", payload.recipient);
            log_email_event(
                repo,
                campaign_id,
                &payload.recipient,
                EventKind::Sent,
                sent_data(outcome.provider_message_id.as_deref(), now),
            );
        } else {
            result.failed += 1;
            let reason = outcome.failure_reason.as_deref().unwrap_or("Unknown error");
            log::warn!("Email to {} failed: {reason}", payload.recipient);
            log_email_event(
                repo,
                campaign_id,
                &payload.recipient,
                EventKind::Bounced,
                failure_data(reason, now),
            );
        }

        if let Some(on_progress) = on_progress {
            on_progress(result.successful + result.failed, total);
        }

        pacer.observe(outcome.throttled);

        if i + 1 < total {
            tokio::select! {
                _ = options.cancel.cancelled() => {}
                _ = tokio::time::sleep(pacer.delay()) => {}
            }
        }
    }

    log::info!(
        "Finished campaign#{campaign_id}: {} sent, {} failed, {} skipped",
        result.successful,
        result.failed,
        result.skipped
    );

    result
}
