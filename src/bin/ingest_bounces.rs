use campaign_dispatch::cancel_on_ctrl_c;
use campaign_dispatch::ingest_bounces::run;
use campaign_dispatch::settings::Settings;
use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;

/// Entry point for the bounce and complaint ingestion worker.
#[tokio::main]
async fn main() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    if let Err(e) = run(settings, cancel).await {
        log::error!("{e}");
        std::process::exit(1);
    }
}
