use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

mod config;
mod dbus_interface;
mod delivery;
mod engine;
mod snapshot;

use config::{BusKind, Config};
use dbus_interface::{VigilService, BUS_NAME, OBJECT_PATH};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("vigild starting");
    let config = Config::from_env();

    let log = delivery::AlertLog::new(config.alert_log.clone());
    let (queue, workers) = delivery::spawn_delivery_pool(config.delivery_workers, config.queue_capacity, log);

    let engine = engine::spawn_engine(&config, queue).context("failed to start engine")?;

    let service = VigilService {
        status: engine.status.clone(),
    };
    let builder = match config.bus {
        BusKind::Session => zbus::connection::Builder::session()?,
        BusKind::System => zbus::connection::Builder::system()?,
    };
    let _conn = builder
        .name(BUS_NAME)?
        .serve_at(OBJECT_PATH, service)?
        .build()
        .await
        .context("failed to register on D-Bus")?;

    tracing::info!(bus = ?config.bus, name = BUS_NAME, "vigild ready");

    let status = engine.status.clone();
    let mut done = tokio::spawn(engine.wait());
    let outcome = tokio::select! {
        result = &mut done => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received; stopping engine");
            status.stop();
            done.await?
        }
    };

    // The engine dropped its queue handle on exit; let workers drain it.
    for worker in workers {
        worker.await?;
    }

    match outcome {
        Ok(outcome) => {
            tracing::info!(?outcome, "vigild shutting down");
            Ok(())
        }
        Err(e) => Err(e).context("engine failed"),
    }
}
