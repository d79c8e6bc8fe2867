//! Capabilities the bridge is handed at construction.

use crate::error::App;
use crate::store::state::{EqualizerValues, OptionValue, State, StreamProvider, Track};
use std::collections::BTreeMap;

/// Every store mutation an inbound message may trigger.
pub trait Actions: Send + Sync {
    fn next_song(&self);
    fn previous_song(&self);
    fn pause_playback(&self);
    fn start_playback(&self);
    fn stop_playback(&self);

    fn set_option(&self, key: &str, value: OptionValue);
    fn mute(&self);
    fn unmute(&self);
    fn update_volume(&self, volume: f64);
    fn update_seek(&self, seek: f64);

    fn clear_queue(&self);
    fn select_song(&self, index: usize);
    fn add_playlist_tracks_to_queue(&self, providers: &[StreamProvider], tracks: &[Track]);
    fn play_track(&self, providers: &[StreamProvider], track: Track);

    fn add_playlist(&self, tracks: Vec<Track>, name: &str);
    fn load_playlists(&self) -> Result<(), App>;

    fn update_equalizer(&self, values: EqualizerValues);
    fn set_equalizer(&self, preset: &str);

    fn scan_local_folders_progress(&self, progress: u64, total: u64);
    fn scan_local_folders_success(&self, tracks: BTreeMap<String, Track>);
    fn scan_local_folders_failed(&self, error: &str);

    fn on_download_started(&self, track: Track);
    fn on_download_progress(&self, uuid: &str, progress: f64);
    fn on_download_finished(&self, uuid: &str);
}

pub trait StateSource: Send + Sync {
    fn snapshot(&self) -> State;
}

pub trait Navigator: Send + Sync {
    fn push(&self, route: &str);
}
