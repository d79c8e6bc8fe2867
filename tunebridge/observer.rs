use crate::channel::Channel;
use crate::message::Outbound;
use crate::store::StoreEvent;
use log::{error, info, warn};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::{self, JoinHandle};

/// Mirrors store track changes to the host as `songchange` messages.
pub fn spawn(mut events: broadcast::Receiver<StoreEvent>, channel: Channel) -> JoinHandle<()> {
    task::spawn(async move {
        loop {
            match events.recv().await {
                Ok(StoreEvent::TrackChanged(item)) => {
                    if let Some(item) = &item {
                        info!("Now playing {} - {}", item.track.artist, item.track.name);
                    }
                    if let Err(e) = channel.send(Outbound::SongChange(item)) {
                        error!("Failed to forward track change: {}", e);
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Track observer lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
