pub mod queue;
pub mod state;

pub use queue::{track_changed, PlayMode};

use crate::actions::{Actions, StateSource};
use crate::error::App;
use log::{error, info, warn};
use serde::Deserialize;
use state::{
    Download, DownloadStatus, EqualizerValues, OptionValue, PlaybackStatus, Playlist, QueueItem,
    State, StreamProvider, Track, CUSTOM_PRESET,
};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub enum StoreEvent {
    TrackChanged(Option<Arc<QueueItem>>),
}

#[derive(Deserialize)]
struct PlaylistFile {
    #[serde(default)]
    playlists: Vec<Playlist>,
}

struct Shared {
    state: watch::Sender<State>,
    events: broadcast::Sender<StoreEvent>,
}

impl Shared {
    fn update(&self, mutate: impl FnOnce(&mut State)) {
        let mut changed = None;
        self.state.send_modify(|state| {
            let previous = state.queue.current().cloned();
            mutate(state);
            let current = state.queue.current();
            if track_changed(previous.as_ref(), current) {
                changed = Some(current.cloned());
            }
        });
        if let Some(current) = changed {
            // No receivers just means nobody is observing yet.
            let _ = self.events.send(StoreEvent::TrackChanged(current));
        }
    }
}

/// Observable client state. Every action goes through `update`, which
/// publishes the new snapshot and raises domain events.
pub struct Store {
    shared: Arc<Shared>,
    playlists_file: Option<PathBuf>,
}

impl Store {
    pub fn new(
        stream_providers: Vec<StreamProvider>,
        volume: f64,
        playlists_file: Option<PathBuf>,
    ) -> Self {
        let mut initial = State {
            stream_providers,
            ..State::default()
        };
        initial.player.volume = volume.clamp(0.0, 100.0);
        let (state, _) = watch::channel(initial);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared { state, events }),
            playlists_file,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.shared.events.subscribe()
    }

    fn update(&self, mutate: impl FnOnce(&mut State)) {
        self.shared.update(mutate);
    }

    /// Re-reads the playlists file on the runtime and merges it by name once
    /// read. Returns `None` when no file is configured.
    pub fn reload_playlists(&self) -> Result<Option<JoinHandle<()>>, App> {
        let Some(path) = self.playlists_file.clone() else {
            info!("No playlists file configured, keeping in-memory playlists");
            return Ok(None);
        };
        let runtime = Handle::try_current().map_err(|e| App::Runtime(e.to_string()))?;
        let shared = Arc::clone(&self.shared);
        let reload = runtime.spawn(async move {
            match read_playlists_file(&path).await {
                Ok(loaded) => shared.update(|state| {
                    for playlist in loaded {
                        upsert_playlist(&mut state.playlists, playlist);
                    }
                }),
                Err(e) => error!("Failed to load playlists from {}: {}", path.display(), e),
            }
        });
        Ok(Some(reload))
    }
}

pub async fn read_playlists_file(path: &Path) -> Result<Vec<Playlist>, App> {
    info!("Loading playlists from {}", path.display());
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("Playlists file {} does not exist", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };
    let file: PlaylistFile = toml::from_str(&content)?;
    Ok(file.playlists)
}

impl StateSource for Store {
    fn snapshot(&self) -> State {
        self.shared.state.borrow().clone()
    }
}

fn upsert_playlist(playlists: &mut Vec<Playlist>, playlist: Playlist) {
    match playlists.iter_mut().find(|p| p.name == playlist.name) {
        Some(existing) => *existing = playlist,
        None => playlists.push(playlist),
    }
}

impl Actions for Store {
    fn next_song(&self) {
        self.update(|state| {
            let play_mode = PlayMode::from_settings(&state.settings);
            if let Some(index) = state.queue.next_index(play_mode) {
                state.queue.current_song = index;
                state.player.seek = 0.0;
            }
        });
    }

    fn previous_song(&self) {
        self.update(|state| {
            let play_mode = PlayMode::from_settings(&state.settings);
            if let Some(index) = state.queue.previous_index(play_mode) {
                state.queue.current_song = index;
                state.player.seek = 0.0;
            }
        });
    }

    fn pause_playback(&self) {
        self.update(|state| state.player.playback_status = PlaybackStatus::Paused);
    }

    fn start_playback(&self) {
        self.update(|state| state.player.playback_status = PlaybackStatus::Playing);
    }

    fn stop_playback(&self) {
        self.update(|state| {
            state.player.playback_status = PlaybackStatus::Stopped;
            state.player.seek = 0.0;
        });
    }

    fn set_option(&self, key: &str, value: OptionValue) {
        self.update(|state| {
            state.settings.options.insert(key.to_string(), value);
        });
    }

    fn mute(&self) {
        self.update(|state| state.player.muted = true);
    }

    fn unmute(&self) {
        self.update(|state| state.player.muted = false);
    }

    fn update_volume(&self, volume: f64) {
        self.update(|state| state.player.volume = volume.clamp(0.0, 100.0));
    }

    fn update_seek(&self, seek: f64) {
        self.update(|state| state.player.seek = seek.max(0.0));
    }

    fn clear_queue(&self) {
        self.update(|state| state.queue.clear());
    }

    fn select_song(&self, index: usize) {
        self.update(|state| {
            if index < state.queue.queue_items.len() {
                state.queue.current_song = index;
            } else {
                warn!(
                    "Track index {} out of bounds for queue of {}",
                    index,
                    state.queue.queue_items.len()
                );
            }
        });
    }

    fn add_playlist_tracks_to_queue(&self, providers: &[StreamProvider], tracks: &[Track]) {
        self.update(|state| {
            for track in tracks {
                state.queue.push(QueueItem::new(track.clone(), providers));
            }
        });
    }

    fn play_track(&self, providers: &[StreamProvider], track: Track) {
        self.update(|state| {
            state.queue.clear();
            state.queue.push(QueueItem::new(track, providers));
            state.player.seek = 0.0;
            state.player.playback_status = PlaybackStatus::Playing;
        });
    }

    fn add_playlist(&self, tracks: Vec<Track>, name: &str) {
        info!("Creating playlist {} with {} tracks", name, tracks.len());
        let playlist = Playlist {
            name: name.to_string(),
            tracks,
        };
        self.update(|state| upsert_playlist(&mut state.playlists, playlist));
    }

    fn load_playlists(&self) -> Result<(), App> {
        self.reload_playlists().map(|_| ())
    }

    fn update_equalizer(&self, values: EqualizerValues) {
        self.update(|state| {
            state.equalizer.custom = values;
            state.equalizer.selected = CUSTOM_PRESET.to_string();
        });
    }

    fn set_equalizer(&self, preset: &str) {
        self.update(|state| {
            if preset == CUSTOM_PRESET || state.equalizer.presets.contains_key(preset) {
                state.equalizer.selected = preset.to_string();
            } else {
                warn!("Unknown equalizer preset {}", preset);
            }
        });
    }

    fn scan_local_folders_progress(&self, progress: u64, total: u64) {
        self.update(|state| {
            state.local.pending = true;
            state.local.scan_progress = progress;
            state.local.scan_total = total;
        });
    }

    fn scan_local_folders_success(&self, tracks: BTreeMap<String, Track>) {
        self.update(|state| {
            state.local.pending = false;
            state.local.error = None;
            state.local.tracks = tracks;
        });
    }

    fn scan_local_folders_failed(&self, error: &str) {
        self.update(|state| {
            state.local.pending = false;
            state.local.error = Some(error.to_string());
        });
    }

    fn on_download_started(&self, track: Track) {
        let Some(uuid) = track.uuid.clone() else {
            warn!("Download started for a track without uuid");
            return;
        };
        self.update(|state| {
            let download = Download {
                uuid,
                track,
                status: DownloadStatus::Started,
                completion: 0.0,
            };
            match state.downloads.iter_mut().find(|d| d.uuid == download.uuid) {
                Some(existing) => *existing = download,
                None => state.downloads.push(download),
            }
        });
    }

    fn on_download_progress(&self, uuid: &str, progress: f64) {
        self.update(|state| {
            match state.downloads.iter_mut().find(|d| d.uuid == uuid) {
                Some(download) => {
                    download.status = DownloadStatus::Started;
                    download.completion = progress.clamp(0.0, 1.0);
                }
                None => warn!("Progress for unknown download {}", uuid),
            }
        });
    }

    fn on_download_finished(&self, uuid: &str) {
        self.update(|state| {
            match state.downloads.iter_mut().find(|d| d.uuid == uuid) {
                Some(download) => {
                    download.status = DownloadStatus::Finished;
                    download.completion = 1.0;
                }
                None => warn!("Finished unknown download {}", uuid),
            }
        });
    }
}
