//! Throttled bulk dispatch of campaign emails.
//!
//! The crate ships two workers: `send_campaign` renders a draft campaign for
//! every active subscriber and pushes it through a mail [`gateway`] at a
//! bounded rate, and `ingest_bounces` records provider bounce, complaint and
//! delivery notifications against the sends they refer to.

pub mod db;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod gateway;
pub mod ingest_bounces;
pub mod models;
pub mod repository;
pub mod schema;
pub mod send_campaign;
pub mod settings;

use tokio_util::sync::CancellationToken;

/// Cancels `token` when the process receives Ctrl-C.
pub fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => log::info!("Shutdown requested"),
            Err(e) => log::error!("Cannot listen for shutdown signal: {e}"),
        }
        token.cancel();
    });
}
