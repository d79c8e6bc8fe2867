use crate::channel::Channel;
use crate::config::Bus;
use crate::error::App;
use crate::message::Outbound;
use log::{error, info, warn};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use zbus::{fdo, interface, Connection, ConnectionBuilder, SignalContext};

/// Session-bus face of the client: the host delivers messages through
/// `Deliver` and hears back through the `HostMessage` signal.
pub struct ClientDBus {
    channel: Channel,
    stop_signal: watch::Sender<()>,
}

fn parse_payload(payload: &str) -> Result<Value, serde_json::Error> {
    if payload.trim().is_empty() {
        Ok(Value::Null)
    } else {
        serde_json::from_str(payload)
    }
}

#[interface(name = "org.tunebridge.Client")]
impl ClientDBus {
    #[allow(clippy::unused_self)]
    fn test_connection(&self) {}

    fn deliver(&self, name: String, payload: String) -> fdo::Result<u32> {
        let payload = parse_payload(&payload)
            .map_err(|e| fdo::Error::InvalidArgs(format!("Invalid JSON payload: {e}")))?;
        match self.channel.emit(&name, &payload) {
            Ok(0) => {
                warn!("No listener for message {}", name);
                Ok(0)
            }
            Ok(count) => Ok(u32::try_from(count).unwrap_or(u32::MAX)),
            Err(e) => {
                error!("Handler for {} failed: {}", name, e);
                Err(fdo::Error::Failed(e.to_string()))
            }
        }
    }

    fn quit(&self) {
        if let Err(e) = self.stop_signal.send(()) {
            error!("ClientDBus: Failed to send stop signal: {}", e);
        }
    }

    #[zbus(signal)]
    async fn host_message(ctxt: &SignalContext<'_>, name: &str, payload: &str)
        -> zbus::Result<()>;
}

pub async fn run_dbus_server(
    bus: &Bus,
    channel: Channel,
    stop_signal: watch::Sender<()>,
) -> Result<Connection, App> {
    let client_dbus = ClientDBus {
        channel,
        stop_signal,
    };

    let connection = ConnectionBuilder::session()?
        .name(bus.name.as_str())?
        .serve_at(bus.path.as_str(), client_dbus)?
        .build()
        .await?;
    info!("Serving {} at {}", bus.name, bus.path);
    Ok(connection)
}

/// Emits every outbound message as a `HostMessage` signal until the channel
/// is closed.
pub async fn forward_outbound(
    connection: Connection,
    path: String,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) -> Result<(), App> {
    let ctxt = SignalContext::new(&connection, path)?;
    while let Some(message) = outbound.recv().await {
        let payload = match message.payload() {
            Ok(payload) => payload.to_string(),
            Err(e) => {
                error!("Failed to encode {}: {}", message.name(), e);
                continue;
            }
        };
        if let Err(e) = ClientDBus::host_message(&ctxt, message.name(), &payload).await {
            error!("Failed to emit {}: {}", message.name(), e);
        }
    }
    Ok(())
}
