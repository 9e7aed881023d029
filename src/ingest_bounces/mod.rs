pub mod notification;
pub mod service;

use tokio::task;
use tokio_util::sync::CancellationToken;

use crate::db::{establish_connection_pool, init_schema};
use crate::errors::Error;
use crate::repository::DieselRepository;
use crate::settings::Settings;

use notification::{Inbound, parse_inbound};
use service::handle_notification;

const RECV_TIMEOUT_MS: i32 = 500;

/// Decodes and records one raw notification, logging instead of failing.
pub fn process_message(repo: &DieselRepository, raw: &[u8]) {
    match parse_inbound(raw) {
        Ok(Inbound::Notification(notification)) => {
            if let Err(e) = handle_notification(repo, &notification) {
                log::error!(
                    "Error handling notification for message {}: {e}",
                    notification.mail.message_id
                );
            }
        }
        Ok(Inbound::SubscriptionConfirmation { subscribe_url }) => log::warn!(
            "SNS subscription needs confirmation: {}",
            subscribe_url.unwrap_or_default()
        ),
        Ok(Inbound::Other(kind)) => log::debug!("Ignoring SNS message of type {kind}"),
        Err(e) => log::error!("Cannot parse notification: {e}"),
    }
}

fn receive_loop(
    repo: DieselRepository,
    address: &str,
    cancel: CancellationToken,
) -> Result<(), Error> {
    let context = zmq::Context::new();
    let subscriber = context.socket(zmq::SUB)?;
    subscriber.connect(address)?;
    subscriber.set_subscribe(b"")?;
    subscriber.set_rcvtimeo(RECV_TIMEOUT_MS)?;

    log::info!("Starting notification ingestion worker");

    while !cancel.is_cancelled() {
        match subscriber.recv_bytes(0) {
            Ok(msg) => process_message(&repo, &msg),
            Err(zmq::Error::EAGAIN) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    log::info!("Notification ingestion worker stopped");
    Ok(())
}

/// Entry point for the notification ingestion worker.
pub async fn run(settings: Settings, cancel: CancellationToken) -> Result<(), Error> {
    let db_pool = establish_connection_pool(&settings.database_url)?;
    init_schema(&db_pool)?;
    let repo = DieselRepository::new(db_pool);
    let address = settings.zmq_notifications_address;

    task::spawn_blocking(move || receive_loop(repo, &address, cancel)).await?
}
