use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlaybackStatus {
    Playing,
    Paused,
    #[default]
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// A track placed in the queue together with the stream providers allowed
/// to resolve it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    #[serde(flatten)]
    pub track: Track,
    pub stream_providers: Vec<String>,
}

impl QueueItem {
    pub fn new(track: Track, providers: &[StreamProvider]) -> Self {
        Self {
            track,
            stream_providers: providers.iter().map(|p| p.source_name.clone()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamProvider {
    pub source_name: String,
    #[serde(default)]
    pub description: String,
}

impl StreamProvider {
    pub fn new(source_name: &str, description: &str) -> Self {
        Self {
            source_name: source_name.to_string(),
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlayerState {
    pub playback_status: PlaybackStatus,
    pub muted: bool,
    pub volume: f64,
    pub seek: f64,
}

#[derive(Debug, Clone, Default)]
pub struct QueueState {
    pub queue_items: Vec<Arc<QueueItem>>,
    pub current_song: usize,
}

impl QueueState {
    pub fn current(&self) -> Option<&Arc<QueueItem>> {
        self.queue_items.get(self.current_song)
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.queue_items.iter().map(|item| item.track.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub options: BTreeMap<String, OptionValue>,
}

impl Settings {
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.options.get(key), Some(OptionValue::Bool(true)))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Playlist {
    pub name: String,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EqualizerValues {
    pub values: Vec<f64>,
    #[serde(default)]
    pub pre_amp: f64,
}

pub const CUSTOM_PRESET: &str = "Custom";

#[derive(Debug, Clone)]
pub struct EqualizerState {
    pub selected: String,
    pub presets: BTreeMap<String, EqualizerValues>,
    pub custom: EqualizerValues,
}

impl Default for EqualizerState {
    fn default() -> Self {
        let preset = |values: [f64; 10]| EqualizerValues {
            values: values.to_vec(),
            pre_amp: 0.0,
        };
        let presets = BTreeMap::from([
            ("Default".to_string(), preset([0.0; 10])),
            (
                "Classical".to_string(),
                preset([0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -4.0, -4.0, -4.0, -6.0]),
            ),
            (
                "Rock".to_string(),
                preset([5.0, 3.0, -3.0, -5.0, -2.0, 2.0, 5.0, 6.0, 6.0, 6.0]),
            ),
            (
                "Pop".to_string(),
                preset([-1.0, 3.0, 4.0, 5.0, 3.0, 0.0, -1.0, -1.0, -1.0, -1.0]),
            ),
        ]);
        Self {
            selected: "Default".to_string(),
            presets,
            custom: preset([0.0; 10]),
        }
    }
}

impl EqualizerState {
    pub fn active_values(&self) -> &EqualizerValues {
        if self.selected == CUSTOM_PRESET {
            return &self.custom;
        }
        self.presets.get(&self.selected).unwrap_or(&self.custom)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LocalLibraryState {
    pub pending: bool,
    pub scan_progress: u64,
    pub scan_total: u64,
    pub tracks: BTreeMap<String, Track>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DownloadStatus {
    Started,
    Finished,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub uuid: String,
    pub track: Track,
    pub status: DownloadStatus,
    pub completion: f64,
}

/// Everything the bridge can read back out of the store.
#[derive(Debug, Clone, Default)]
pub struct State {
    pub player: PlayerState,
    pub queue: QueueState,
    pub settings: Settings,
    pub playlists: Vec<Playlist>,
    pub stream_providers: Vec<StreamProvider>,
    pub equalizer: EqualizerState,
    pub local: LocalLibraryState,
    pub downloads: Vec<Download>,
}

impl State {
    pub fn providers_named(&self, source_name: &str) -> Vec<StreamProvider> {
        self.stream_providers
            .iter()
            .filter(|provider| provider.source_name == source_name)
            .cloned()
            .collect()
    }
}
