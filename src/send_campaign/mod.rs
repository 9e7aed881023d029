pub mod message_builder;
pub mod service;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::db::{establish_connection_pool, init_schema};
use crate::errors::Error;
use crate::gateway::build_gateway;
use crate::repository::DieselRepository;
use crate::settings::Settings;

use service::send_campaign;

/// How long a blocking receive waits before the loop rechecks shutdown.
const RECV_TIMEOUT_MS: i32 = 500;

/// Queue message asking the worker to send a draft campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendCampaignMessage {
    pub campaign_id: i32,
}

/// Entry point for the campaign sending worker.
///
/// Each received message is handled on its own task. On shutdown the
/// running sends are cancelled at their next pause and awaited.
pub async fn run(settings: Settings, cancel: CancellationToken) -> Result<(), Error> {
    settings.validate()?;
    let gateway = build_gateway(&settings)?;

    let db_pool = establish_connection_pool(&settings.database_url)?;
    init_schema(&db_pool)?;
    let repo = DieselRepository::new(db_pool);

    let context = zmq::Context::new();
    let responder = context.socket(zmq::SUB)?;
    responder.connect(&settings.zmq_campaigns_address)?;
    responder.set_subscribe(b"")?;
    responder.set_rcvtimeo(RECV_TIMEOUT_MS)?;

    let settings = Arc::new(settings);
    let mut handles: Vec<JoinHandle<()>> = Vec::new();

    log::info!("Starting campaign sending worker");

    while !cancel.is_cancelled() {
        handles.retain(|handle| !handle.is_finished());

        let msg = match responder.recv_bytes(0) {
            Ok(msg) => msg,
            Err(zmq::Error::EAGAIN) => continue,
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<SendCampaignMessage>(&msg) {
            Ok(parsed) => {
                let repo = repo.clone();
                let gateway = Arc::clone(&gateway);
                let settings = Arc::clone(&settings);
                let cancel = cancel.child_token();
                handles.push(tokio::spawn(async move {
                    let campaign_id = parsed.campaign_id;
                    match send_campaign(campaign_id, &repo, gateway.as_ref(), &settings, cancel)
                        .await
                    {
                        Ok(result) => log::info!(
                            "Campaign#{campaign_id} done: {} successful, {} failed",
                            result.successful,
                            result.failed
                        ),
                        Err(e) => log::error!("Error sending campaign#{campaign_id}: {e}"),
                    }
                }));
            }
            Err(e) => {
                log::error!("Error receiving message: {e}");
            }
        }
    }

    log::info!("Waiting for {} running campaigns to stop", handles.len());
    for handle in handles {
        if let Err(e) = handle.await {
            log::error!("Task panicked: {e:?}");
        }
    }

    Ok(())
}
