//! Worker configuration.
//!
//! Values are layered from `config/default.yaml`, `config/local.yaml` and
//! `DISPATCH__*` environment variables, later sources overriding earlier
//! ones. Nested keys use a double underscore, e.g.
//! `DISPATCH__GATEWAY__REGION=eu-west-1`.

use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::errors::Error;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_campaigns_address")]
    pub zmq_campaigns_address: String,
    #[serde(default = "default_notifications_address")]
    pub zmq_notifications_address: String,
    /// Base URL of the web app, used to build unsubscribe links.
    #[serde(default)]
    pub public_url: String,
    pub sender: SenderSettings,
    #[serde(default)]
    pub dispatch: DispatchSettings,
    pub gateway: GatewaySettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SenderSettings {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchSettings {
    #[serde(default = "default_rate_per_second")]
    pub rate_per_second: f64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            rate_per_second: default_rate_per_second(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl DispatchSettings {
    /// Delay between two consecutive sends.
    ///
    /// Fails for rates whose pause is not a representable [`Duration`],
    /// which covers zero, negative and vanishingly small rates.
    pub fn interval(&self) -> Result<Duration, Error> {
        Duration::try_from_secs_f64(1.0 / self.rate_per_second).map_err(|e| {
            Error::Config(format!(
                "dispatch.rate_per_second {} gives no usable interval: {e}",
                self.rate_per_second
            ))
        })
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

/// Which mail gateway to deliver through.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GatewaySettings {
    Smtp {
        server: String,
        #[serde(default = "default_smtp_port")]
        port: u16,
        login: String,
        password: String,
    },
    Ses {
        region: String,
        access_key_id: String,
        secret_access_key: String,
    },
}

fn default_database_url() -> String {
    "app.db".to_string()
}

fn default_campaigns_address() -> String {
    "tcp://127.0.0.1:5560".to_string()
}

fn default_notifications_address() -> String {
    "tcp://127.0.0.1:5561".to_string()
}

fn default_rate_per_second() -> f64 {
    12.0
}

fn default_max_backoff_ms() -> u64 {
    8_000
}

fn default_smtp_port() -> u16 {
    465
}

impl Settings {
    /// Loads settings from the config directory and the environment.
    pub fn load() -> Result<Self, Error> {
        let settings: Settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("DISPATCH").separator("__"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Rejects configurations that would make every send fail.
    ///
    /// Only the sending worker needs a usable gateway, so this is not part
    /// of [`Settings::load`].
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.dispatch.rate_per_second.is_finite() && self.dispatch.rate_per_second > 0.0) {
            return Err(Error::Config(format!(
                "dispatch.rate_per_second must be positive, got {}",
                self.dispatch.rate_per_second
            )));
        }
        self.dispatch.interval()?;
        if self.sender.email.trim().is_empty() {
            return Err(Error::Config("Missed sender email".to_owned()));
        }
        match &self.gateway {
            GatewaySettings::Smtp { server, login, .. } => {
                if server.trim().is_empty() {
                    return Err(Error::Config("Missed SMTP server address".to_owned()));
                }
                if login.trim().is_empty() {
                    return Err(Error::Config("Missed SMTP login".to_owned()));
                }
            }
            GatewaySettings::Ses {
                region,
                access_key_id,
                secret_access_key,
            } => {
                if region.trim().is_empty()
                    || access_key_id.trim().is_empty()
                    || secret_access_key.trim().is_empty()
                {
                    return Err(Error::Config("AWS credentials not configured".to_owned()));
                }
            }
        }
        Ok(())
    }
}
