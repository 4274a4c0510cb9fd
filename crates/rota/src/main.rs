use std::sync::Arc;

use anyhow::Context;

use rota_core::{
    config::Config,
    dispatch::{self, Dispatcher},
    messaging::port::MessagingPort,
    registry::ChatRegistry,
    schedule::HttpScheduleClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rota_core::logging::init("rota");

    let cfg = Config::load().context("loading configuration")?;

    let registry =
        ChatRegistry::open(&cfg.registry_db_path).context("opening chat registry")?;

    let (messenger, source) = rota_telegram::connect(&cfg.telegram_bot_token);
    let transport: Arc<dyn MessagingPort> = Arc::new(messenger);

    let schedule = Arc::new(HttpScheduleClient::new(cfg.schedule_api_url.clone()));
    let dispatcher = Dispatcher::standard(registry, schedule);

    tracing::info!(alias = %cfg.bot_alias, "rota bot starting");

    // The single background worker; runs until the process is terminated.
    dispatch::run_loop(source, &dispatcher, transport).await;

    Ok(())
}
