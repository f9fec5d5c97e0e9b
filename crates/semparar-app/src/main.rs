//! Sem Parar report automation service entry point.
//!
//! Binary name: `semparar-reports`
//!
//! Loads environment settings, connects to the MQTT bus, and hands control
//! to the trigger dispatcher. Configuration is environment-only (optionally
//! via `.env`); there are no CLI flags.

use semparar_core::bus::InboundBus;
use semparar_core::channel::CorrelationChannel;
use semparar_core::dispatch;
use semparar_core::supervisor::Supervisor;
use semparar_infra::webdriver::WebLauncher;
use semparar_infra::{mqtt, settings};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // Missing bus credentials abort startup; browser settings have defaults.
    let bus_settings = settings::load_bus_settings()?;
    let browser_settings = settings::load_browser_settings();

    let bus = InboundBus::new(256);
    let (transport, _pump) = mqtt::connect(&bus_settings, bus.clone()).await?;

    let channel = CorrelationChannel::new(transport, bus.clone());
    let mut supervisor = Supervisor::new(channel, WebLauncher, browser_settings);

    tracing::info!("ready, waiting for report triggers");
    dispatch::run_dispatcher(&bus, &mut supervisor).await;

    supervisor.clear().await;
    Ok(())
}
