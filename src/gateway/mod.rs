//! Mail gateway adapters.
//!
//! A [`Gateway`] makes exactly one delivery attempt per call. Provider-level
//! failures (rejected address, bad credentials, throttling) come back as a
//! failed [`DispatchOutcome`]; `Err` is reserved for conditions the adapter
//! could not classify.

pub mod ses;
pub mod sigv4;
pub mod smtp;

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{DispatchOutcome, EmailPayload};
use crate::errors::Error;
use crate::settings::{GatewaySettings, Settings};

pub use ses::SesGateway;
pub use smtp::SmtpGateway;

/// Abstraction over message delivery.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Attempts to deliver a single payload.
    async fn send(&self, payload: &EmailPayload) -> Result<DispatchOutcome, Error>;
}

/// Builds the gateway selected in `settings`.
///
/// Fails when credentials are missing so a misconfigured worker stops
/// before any payload is attempted.
pub fn build_gateway(settings: &Settings) -> Result<Arc<dyn Gateway>, Error> {
    let gateway: Arc<dyn Gateway> = match &settings.gateway {
        GatewaySettings::Smtp {
            server,
            port,
            login,
            password,
        } => Arc::new(SmtpGateway::new(server, *port, login, password)?),
        GatewaySettings::Ses {
            region,
            access_key_id,
            secret_access_key,
        } => Arc::new(SesGateway::new(region, access_key_id, secret_access_key)?),
    };
    Ok(gateway)
}

/// Whether a provider error message reports an exceeded sending rate.
pub(crate) fn is_throttling_message(message: &str) -> bool {
    message.contains("Throttling") || message.contains("Maximum sending rate exceeded")
}
