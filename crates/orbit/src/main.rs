//! Orbit host: runs the background coordinator against file-backed storage.

use std::sync::Arc;

use eyre::WrapErr;
use orbit_adapters::{
    spawn_relock_timer, FileStorageAdapter, MessageBus, OrbitConfig, RecordingSidePanel,
    SystemClockAdapter,
};
use orbit_core::BackgroundCoordinator;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = OrbitConfig::from_env();
    tracing::info!(storage = %config.storage_path.display(), "Starting Orbit");

    let storage = FileStorageAdapter::open(&config.storage_path)
        .wrap_err_with(|| format!("opening {}", config.storage_path.display()))?;
    let bus = MessageBus::new();
    let coordinator = Arc::new(
        BackgroundCoordinator::new(
            storage,
            RecordingSidePanel::default(),
            bus.tabs(),
            SystemClockAdapter,
        )
        .with_side_panel_path(config.side_panel_path.clone())
        .with_inactivity_timeout_ms(config.inactivity_timeout_ms),
    );

    coordinator.configure_action_behavior();
    coordinator.on_startup();
    let relock = spawn_relock_timer(Arc::clone(&coordinator), config.relock_check_interval());

    tokio::signal::ctrl_c()
        .await
        .wrap_err("waiting for shutdown signal")?;
    relock.abort();
    tracing::info!("Orbit stopped");
    Ok(())
}
