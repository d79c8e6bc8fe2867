use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming};
use log::{error, info};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::watch;
use tokio::task;
use tunebridge::bridge::Bridge;
use tunebridge::channel::Channel;
use tunebridge::config::Config;
use tunebridge::dbus;
use tunebridge::error::App;
use tunebridge::navigation::History;
use tunebridge::observer;
use tunebridge::store::Store;

#[tokio::main]
async fn main() -> Result<(), App> {
    let config_dir = Config::config_dir()?;
    let config_path = config_dir.join("config.toml");
    let config = Config::load(&config_path).await?;

    let log_dir = config.log_dir(&config_dir);
    fs::create_dir_all(&log_dir).await?;

    // Logger setup
    Logger::try_with_str(&config.log_level)?
        .log_to_file(FileSpec::default().directory(&log_dir))
        .rotate(
            Criterion::Size(1_000_000),
            Naming::Timestamps,
            Cleanup::KeepLogFiles(3),
        )
        .duplicate_to_stderr(Duplicate::Warn)
        .start()?;

    if config_path.exists() {
        info!("Loaded configuration from {}", config_path.display());
    } else {
        info!("No configuration at {}, using defaults", config_path.display());
    }

    let store = Arc::new(Store::new(
        config.stream_providers.clone(),
        config.player.volume,
        config.player.playlists_file.clone(),
    ));
    let history = Arc::new(History::default());
    let bridge = Arc::new(Bridge::new(store.clone(), store.clone(), history));

    let (channel, outbound) = Channel::new();
    let (stop_sender, mut stop_receiver) = watch::channel(());

    let connection = dbus::run_dbus_server(&config.bus, channel.clone(), stop_sender).await?;
    let forwarder = task::spawn({
        let connection = connection.clone();
        let path = config.bus.path.clone();
        async move {
            if let Err(e) = dbus::forward_outbound(connection, path, outbound).await {
                error!("Outbound forwarder error: {}", e);
            }
        }
    });
    let track_observer = observer::spawn(store.subscribe(), channel.clone());

    let activation = bridge.activate(&channel)?;

    tokio::select! {
        _ = stop_receiver.changed() => {
            info!("Stop signal received, shutting down...");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down...");
        }
    }

    activation.deactivate();
    track_observer.abort();
    forwarder.abort();
    drop(connection);
    Ok(())
}
