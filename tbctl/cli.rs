mod error;

use clap::{Parser, Subcommand};
use error::App;
use futures_util::stream::StreamExt;
use serde_json::{json, Value};
use tokio::time::{timeout, Duration};
use zbus::{proxy, Connection};

type StdResult<T> = std::result::Result<T, App>;

const REPLY_TIMEOUT: Duration = Duration::from_secs(3);

#[proxy(
    interface = "org.tunebridge.Client",
    default_service = "org.tunebridge.Client",
    default_path = "/org/tunebridge/Client"
)]
trait Client {
    async fn test_connection(&self) -> zbus::Result<()>;
    async fn deliver(&self, name: &str, payload: &str) -> zbus::Result<u32>;
    async fn quit(&self) -> zbus::Result<()>;

    #[zbus(signal)]
    fn host_message(&self, name: &str, payload: &str) -> zbus::Result<()>;
}

#[derive(Parser)]
#[command(
    name = "tbctl",
    about = "Send host messages to a running tunebridge client.",
    version = "1.0.0"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Send a raw message with an optional JSON payload")]
    Send {
        name: String,
        payload: Option<String>,
    },

    #[command(about = "Resume playback")]
    Play,

    #[command(about = "Pause playback")]
    Pause,

    #[command(about = "Toggle between playing and paused")]
    PlayPause,

    #[command(about = "Stop playback")]
    Stop,

    #[command(about = "Play the next track")]
    Next,

    #[command(about = "Play the previous track")]
    Previous,

    #[command(about = "Toggle mute")]
    Mute,

    #[command(about = "Set the volume (0-100)")]
    Volume { value: f64 },

    #[command(about = "Seek to a position")]
    Seek { value: f64 },

    #[command(about = "Select a track in the queue by index")]
    Select { index: usize },

    #[command(about = "Clear the queue")]
    EmptyQueue,

    #[command(about = "Save the current queue as a playlist")]
    CreatePlaylist { name: String },

    #[command(about = "Replace the queue with a playlist and play it")]
    ActivatePlaylist { name: String },

    #[command(about = "Reload playlists")]
    RefreshPlaylists,

    #[command(about = "Show the current playing status")]
    Status,

    #[command(about = "Show the queue")]
    Queue,

    #[command(about = "Print every message the client sends")]
    Listen,

    #[command(about = "Shut the client down")]
    Quit,
}

#[tokio::main]
async fn main() -> StdResult<()> {
    let cli = Cli::parse();
    let connection = Connection::session().await?;
    let proxy = ClientProxy::new(&connection).await?;
    handle_command(cli, proxy).await
}

async fn handle_command(cli: Cli, proxy: ClientProxy<'_>) -> StdResult<()> {
    if !is_client_running(&proxy).await {
        eprintln!("tunebridge is not running");
        return Ok(());
    }
    match cli.command {
        Commands::Send { name, payload } => {
            let payload = match payload {
                Some(payload) => serde_json::from_str(&payload)?,
                None => Value::Null,
            };
            send(&proxy, &name, &payload).await
        }
        Commands::Play => send(&proxy, "play", &Value::Null).await,
        Commands::Pause => send(&proxy, "pause", &Value::Null).await,
        Commands::PlayPause => send(&proxy, "playpause", &Value::Null).await,
        Commands::Stop => send(&proxy, "stop", &Value::Null).await,
        Commands::Next => send(&proxy, "next", &Value::Null).await,
        Commands::Previous => send(&proxy, "previous", &Value::Null).await,
        Commands::Mute => send(&proxy, "mute", &Value::Null).await,
        Commands::Volume { value } => send(&proxy, "volume", &json!(value)).await,
        Commands::Seek { value } => send(&proxy, "seek", &json!(value)).await,
        Commands::Select { index } => send(&proxy, "select-track", &json!(index)).await,
        Commands::EmptyQueue => send(&proxy, "empty-queue", &Value::Null).await,
        Commands::CreatePlaylist { name } => send(&proxy, "create-playlist", &json!(name)).await,
        Commands::ActivatePlaylist { name } => {
            send(&proxy, "activate-playlist", &json!(name)).await
        }
        Commands::RefreshPlaylists => send(&proxy, "refresh-playlists", &Value::Null).await,
        Commands::Status => request(&proxy, "playing-status").await,
        Commands::Queue => request(&proxy, "queue").await,
        Commands::Listen => listen(&proxy).await,
        Commands::Quit => {
            proxy.quit().await?;
            println!("tunebridge stopped");
            Ok(())
        }
    }
}

async fn is_client_running(proxy: &ClientProxy<'_>) -> bool {
    proxy.test_connection().await.is_ok()
}

async fn send(proxy: &ClientProxy<'_>, name: &str, payload: &Value) -> StdResult<()> {
    let listeners = proxy.deliver(name, &payload.to_string()).await?;
    if listeners == 0 {
        eprintln!("No listener for '{name}'");
    }
    Ok(())
}

/// Sends a message the client answers with a message of the same name.
async fn request(proxy: &ClientProxy<'_>, name: &str) -> StdResult<()> {
    let mut replies = proxy.receive_host_message().await?;
    send(proxy, name, &Value::Null).await?;

    let reply = timeout(REPLY_TIMEOUT, async {
        let mut reply: StdResult<Option<String>> = Ok(None);
        while let Some(signal) = replies.next().await {
            match signal.args() {
                Ok(args) if *args.name() == name => {
                    reply = Ok(Some(args.payload().to_string()));
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    reply = Err(App::Zbus(e));
                    break;
                }
            }
        }
        reply
    })
    .await
    .map_err(|_| App::Timeout(name.to_string()))??;

    match reply {
        Some(payload) => {
            let value: Value = serde_json::from_str(&payload)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        None => eprintln!("tunebridge closed the connection"),
    }
    Ok(())
}

async fn listen(proxy: &ClientProxy<'_>) -> StdResult<()> {
    let mut messages = proxy.receive_host_message().await?;
    while let Some(signal) = messages.next().await {
        let args = signal.args()?;
        println!("{} {}", args.name(), args.payload());
    }
    Ok(())
}
