use crate::error::App;
use crate::store::state::{EqualizerValues, OptionValue, PlaybackStatus, QueueItem, State, Track};
use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Names the bridge listens for once activated.
pub const INBOUND: [&str; 27] = [
    "next",
    "previous",
    "pause",
    "playpause",
    "stop",
    "play",
    "settings",
    "mute",
    "volume",
    "seek",
    "playing-status",
    "empty-queue",
    "queue",
    "select-track",
    "create-playlist",
    "refresh-playlists",
    "activate-playlist",
    "update-equalizer",
    "set-equalizer",
    "local-files-progress",
    "local-files",
    "local-files-error",
    "play-startup-track",
    "download-started",
    "download-progress",
    "download-finished",
    "download-error",
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanProgress {
    pub scan_progress: u64,
    pub scan_total: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DownloadProgress {
    pub uuid: String,
    pub progress: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Next,
    Previous,
    Pause,
    PlayPause,
    Stop,
    Play,
    Settings(BTreeMap<String, OptionValue>),
    Mute,
    Volume(f64),
    Seek(f64),
    PlayingStatus,
    EmptyQueue,
    Queue,
    SelectTrack(usize),
    CreatePlaylist(String),
    RefreshPlaylists,
    ActivatePlaylist(String),
    UpdateEqualizer(EqualizerValues),
    SetEqualizer(String),
    LocalFilesProgress(ScanProgress),
    LocalFiles(BTreeMap<String, Track>),
    LocalFilesError(String),
    PlayStartupTrack(Track),
    DownloadStarted(Track),
    DownloadProgress(DownloadProgress),
    DownloadFinished(String),
    DownloadError(Value),
}

fn decode<T: DeserializeOwned>(message: &str, payload: &Value) -> Result<T, App> {
    T::deserialize(payload).map_err(|e| App::payload(message, e))
}

/// Keeps the scalar options of a settings object and skips the rest.
fn settings(payload: &Value) -> Result<BTreeMap<String, OptionValue>, App> {
    let entries: BTreeMap<String, Value> = decode("settings", payload)?;
    let options = entries
        .into_iter()
        .filter_map(|(key, value)| {
            let option = match value {
                Value::Bool(flag) => OptionValue::Bool(flag),
                Value::Number(number) => OptionValue::Number(number.as_f64()?),
                Value::String(text) => OptionValue::Text(text),
                other => {
                    warn!("Skipping setting {} with unsupported value {}", key, other);
                    return None;
                }
            };
            Some((key, option))
        })
        .collect();
    Ok(options)
}

fn describe(payload: &Value) -> String {
    match payload {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl Inbound {
    /// Decodes a named message and its JSON payload into a typed message.
    pub fn parse(name: &str, payload: &Value) -> Result<Self, App> {
        let message = match name {
            "next" => Inbound::Next,
            "previous" => Inbound::Previous,
            "pause" => Inbound::Pause,
            "playpause" => Inbound::PlayPause,
            "stop" => Inbound::Stop,
            "play" => Inbound::Play,
            "settings" => Inbound::Settings(settings(payload)?),
            "mute" => Inbound::Mute,
            "volume" => Inbound::Volume(decode(name, payload)?),
            "seek" => Inbound::Seek(decode(name, payload)?),
            "playing-status" => Inbound::PlayingStatus,
            "empty-queue" => Inbound::EmptyQueue,
            "queue" => Inbound::Queue,
            "select-track" => Inbound::SelectTrack(decode(name, payload)?),
            "create-playlist" => Inbound::CreatePlaylist(decode(name, payload)?),
            "refresh-playlists" => Inbound::RefreshPlaylists,
            "activate-playlist" => Inbound::ActivatePlaylist(decode(name, payload)?),
            "update-equalizer" => Inbound::UpdateEqualizer(decode(name, payload)?),
            "set-equalizer" => Inbound::SetEqualizer(decode(name, payload)?),
            "local-files-progress" => Inbound::LocalFilesProgress(decode(name, payload)?),
            "local-files" => Inbound::LocalFiles(decode(name, payload)?),
            "local-files-error" => Inbound::LocalFilesError(describe(payload)),
            "play-startup-track" => Inbound::PlayStartupTrack(decode(name, payload)?),
            "download-started" => Inbound::DownloadStarted(decode(name, payload)?),
            "download-progress" => Inbound::DownloadProgress(decode(name, payload)?),
            "download-finished" => Inbound::DownloadFinished(decode(name, payload)?),
            "download-error" => Inbound::DownloadError(payload.clone()),
            other => return Err(App::UnknownMessage(other.to_string())),
        };
        Ok(message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoopStatus {
    Playlist,
    None,
}

/// Player state merged with the current queue item, as reported to the host.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayingStatus {
    pub playback_status: PlaybackStatus,
    pub volume: f64,
    pub muted: bool,
    pub seek: f64,
    #[serde(flatten)]
    pub track: Option<QueueItem>,
    pub loop_status: LoopStatus,
    pub shuffle: bool,
}

impl PlayingStatus {
    pub fn from_state(state: &State) -> Self {
        Self {
            playback_status: state.player.playback_status,
            volume: state.player.volume,
            muted: state.player.muted,
            seek: state.player.seek,
            track: state.queue.current().map(|item| item.as_ref().clone()),
            loop_status: if state.settings.flag("loop") {
                LoopStatus::Playlist
            } else {
                LoopStatus::None
            },
            shuffle: state.settings.flag("shuffle"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Outbound {
    Started,
    RefreshLocalFolders,
    PlayingStatus(PlayingStatus),
    Queue(Vec<Arc<QueueItem>>),
    SongChange(Option<Arc<QueueItem>>),
}

impl Outbound {
    pub fn name(&self) -> &'static str {
        match self {
            Outbound::Started => "started",
            Outbound::RefreshLocalFolders => "refresh-localfolders",
            Outbound::PlayingStatus(_) => "playing-status",
            Outbound::Queue(_) => "queue",
            Outbound::SongChange(_) => "songchange",
        }
    }

    pub fn payload(&self) -> Result<Value, App> {
        let payload = match self {
            Outbound::Started | Outbound::RefreshLocalFolders => Value::Null,
            Outbound::PlayingStatus(status) => serde_json::to_value(status)?,
            Outbound::Queue(items) => {
                let items: Vec<&QueueItem> = items.iter().map(AsRef::as_ref).collect();
                serde_json::to_value(items)?
            }
            Outbound::SongChange(item) => serde_json::to_value(item.as_deref())?,
        };
        Ok(payload)
    }
}
