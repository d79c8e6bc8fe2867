use crate::actions::{Actions, Navigator, StateSource};
use crate::channel::{Channel, Subscription};
use crate::error::App;
use crate::message::{Inbound, Outbound, PlayingStatus, INBOUND};
use crate::navigation::LIBRARY_ROUTE;
use crate::store::state::PlaybackStatus;
use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const LOCAL_PROVIDER: &str = "Local";

/// Adapter between the host message channel and the client store.
pub struct Bridge {
    actions: Arc<dyn Actions>,
    state: Arc<dyn StateSource>,
    navigator: Arc<dyn Navigator>,
    active: AtomicBool,
}

impl Bridge {
    pub fn new(
        actions: Arc<dyn Actions>,
        state: Arc<dyn StateSource>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            actions,
            state,
            navigator,
            active: AtomicBool::new(false),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Subscribes every inbound message and announces the client to the
    /// host. Fails if a previous activation is still alive.
    pub fn activate(self: &Arc<Self>, channel: &Channel) -> Result<Activation, App> {
        if self.active.swap(true, Ordering::SeqCst) {
            return Err(App::AlreadyActive);
        }

        let subscriptions = INBOUND
            .iter()
            .map(|&name| {
                let bridge = Arc::clone(self);
                let reply = channel.clone();
                channel.on(name, move |payload| {
                    let message = Inbound::parse(name, payload)?;
                    bridge.dispatch(&reply, message)
                })
            })
            .collect();
        let activation = Activation {
            subscriptions,
            bridge: Arc::clone(self),
        };

        channel.send(Outbound::Started)?;
        channel.send(Outbound::RefreshLocalFolders)?;
        info!("Bridge activated with {} listeners", activation.len());
        Ok(activation)
    }

    pub fn dispatch(&self, channel: &Channel, message: Inbound) -> Result<(), App> {
        let actions = self.actions.as_ref();
        match message {
            Inbound::Next => actions.next_song(),
            Inbound::Previous => actions.previous_song(),
            Inbound::Pause => actions.pause_playback(),
            Inbound::PlayPause => {
                if self.state.snapshot().player.playback_status == PlaybackStatus::Playing {
                    actions.pause_playback();
                } else {
                    actions.start_playback();
                }
            }
            Inbound::Stop => actions.stop_playback(),
            Inbound::Play => actions.start_playback(),
            Inbound::Settings(options) => {
                for (key, value) in options {
                    actions.set_option(&key, value);
                }
            }
            Inbound::Mute => {
                if self.state.snapshot().player.muted {
                    actions.unmute();
                } else {
                    actions.mute();
                }
            }
            Inbound::Volume(volume) => actions.update_volume(volume),
            Inbound::Seek(seek) => actions.update_seek(seek),
            Inbound::PlayingStatus => {
                let status = PlayingStatus::from_state(&self.state.snapshot());
                channel.send(Outbound::PlayingStatus(status))?;
            }
            Inbound::EmptyQueue => actions.clear_queue(),
            Inbound::Queue => {
                let items = self.state.snapshot().queue.queue_items;
                channel.send(Outbound::Queue(items))?;
            }
            Inbound::SelectTrack(index) => actions.select_song(index),
            Inbound::CreatePlaylist(name) => {
                let tracks = self.state.snapshot().queue.tracks();
                actions.add_playlist(tracks, &name);
            }
            Inbound::RefreshPlaylists => actions.load_playlists()?,
            Inbound::ActivatePlaylist(name) => self.activate_playlist(&name),
            Inbound::UpdateEqualizer(values) => actions.update_equalizer(values),
            Inbound::SetEqualizer(preset) => actions.set_equalizer(&preset),
            Inbound::LocalFilesProgress(progress) => {
                actions.scan_local_folders_progress(progress.scan_progress, progress.scan_total);
            }
            Inbound::LocalFiles(tracks) => actions.scan_local_folders_success(tracks),
            Inbound::LocalFilesError(err) => actions.scan_local_folders_failed(&err),
            Inbound::PlayStartupTrack(track) => {
                let providers = self.state.snapshot().providers_named(LOCAL_PROVIDER);
                actions.play_track(&providers, track);
                self.navigator.push(LIBRARY_ROUTE);
            }
            Inbound::DownloadStarted(track) => actions.on_download_started(track),
            Inbound::DownloadProgress(progress) => {
                actions.on_download_progress(&progress.uuid, progress.progress);
            }
            Inbound::DownloadFinished(uuid) => actions.on_download_finished(&uuid),
            Inbound::DownloadError(payload) => error!("{}", payload),
        }
        Ok(())
    }

    fn activate_playlist(&self, name: &str) {
        let state = self.state.snapshot();
        let Some(playlist) = state.playlists.iter().find(|p| p.name == name) else {
            warn!("Playlist {} not found", name);
            return;
        };
        let actions = self.actions.as_ref();
        actions.clear_queue();
        actions.add_playlist_tracks_to_queue(&state.stream_providers, &playlist.tracks);
        actions.select_song(0);
        actions.start_playback();
    }
}

/// Live registration of a bridge. Dropping it releases every listener.
pub struct Activation {
    subscriptions: Vec<Subscription>,
    bridge: Arc<Bridge>,
}

impl Activation {
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.subscriptions.iter().map(Subscription::name)
    }

    pub fn deactivate(self) {}
}

impl Drop for Activation {
    fn drop(&mut self) {
        self.subscriptions.clear();
        self.bridge.active.store(false, Ordering::SeqCst);
        info!("Bridge deactivated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::History;
    use crate::store::state::{
        EqualizerValues, OptionValue, Playlist, QueueItem, State, StreamProvider, Track,
    };
    use crate::store::Store;
    use serde_json::{json, Value};
    use std::collections::{BTreeMap, HashSet};
    use std::sync::{Mutex, Once};
    use tokio::sync::mpsc;

    struct CapturedLog {
        records: Mutex<Vec<(log::Level, String)>>,
    }

    impl log::Log for CapturedLog {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            self.records
                .lock()
                .unwrap()
                .push((record.level(), record.args().to_string()));
        }

        fn flush(&self) {}
    }

    static CAPTURED_LOG: CapturedLog = CapturedLog {
        records: Mutex::new(Vec::new()),
    };

    fn captured_log() -> &'static CapturedLog {
        static INSTALL: Once = Once::new();
        INSTALL.call_once(|| {
            log::set_logger(&CAPTURED_LOG).unwrap();
            log::set_max_level(log::LevelFilter::Trace);
        });
        &CAPTURED_LOG
    }

    impl CapturedLog {
        fn contains(&self, level: log::Level, needle: &str) -> bool {
            self.records
                .lock()
                .unwrap()
                .iter()
                .any(|(l, message)| *l == level && message.contains(needle))
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Next,
        Previous,
        Pause,
        Start,
        Stop,
        SetOption(String, OptionValue),
        Mute,
        Unmute,
        Volume(f64),
        Seek(f64),
        ClearQueue,
        SelectSong(usize),
        AddToQueue(Vec<String>, Vec<Track>),
        PlayTrack(Vec<String>, Track),
        AddPlaylist(Vec<Track>, String),
        LoadPlaylists,
        UpdateEqualizer(EqualizerValues),
        SetEqualizer(String),
        ScanProgress(u64, u64),
        ScanSuccess(BTreeMap<String, Track>),
        ScanFailed(String),
        DownloadStarted(Track),
        DownloadProgress(String, f64),
        DownloadFinished(String),
    }

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Call>>,
        state: Mutex<State>,
    }

    impl Recorder {
        fn with_state(state: State) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                state: Mutex::new(state),
            })
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn names(providers: &[StreamProvider]) -> Vec<String> {
        providers.iter().map(|p| p.source_name.clone()).collect()
    }

    impl Actions for Recorder {
        fn next_song(&self) {
            self.record(Call::Next);
        }
        fn previous_song(&self) {
            self.record(Call::Previous);
        }
        fn pause_playback(&self) {
            self.record(Call::Pause);
        }
        fn start_playback(&self) {
            self.record(Call::Start);
        }
        fn stop_playback(&self) {
            self.record(Call::Stop);
        }
        fn set_option(&self, key: &str, value: OptionValue) {
            self.record(Call::SetOption(key.to_string(), value));
        }
        fn mute(&self) {
            self.record(Call::Mute);
        }
        fn unmute(&self) {
            self.record(Call::Unmute);
        }
        fn update_volume(&self, volume: f64) {
            self.record(Call::Volume(volume));
        }
        fn update_seek(&self, seek: f64) {
            self.record(Call::Seek(seek));
        }
        fn clear_queue(&self) {
            self.record(Call::ClearQueue);
        }
        fn select_song(&self, index: usize) {
            self.record(Call::SelectSong(index));
        }
        fn add_playlist_tracks_to_queue(&self, providers: &[StreamProvider], tracks: &[Track]) {
            self.record(Call::AddToQueue(names(providers), tracks.to_vec()));
        }
        fn play_track(&self, providers: &[StreamProvider], track: Track) {
            self.record(Call::PlayTrack(names(providers), track));
        }
        fn add_playlist(&self, tracks: Vec<Track>, name: &str) {
            self.record(Call::AddPlaylist(tracks, name.to_string()));
        }
        fn load_playlists(&self) -> Result<(), App> {
            self.record(Call::LoadPlaylists);
            Ok(())
        }
        fn update_equalizer(&self, values: EqualizerValues) {
            self.record(Call::UpdateEqualizer(values));
        }
        fn set_equalizer(&self, preset: &str) {
            self.record(Call::SetEqualizer(preset.to_string()));
        }
        fn scan_local_folders_progress(&self, progress: u64, total: u64) {
            self.record(Call::ScanProgress(progress, total));
        }
        fn scan_local_folders_success(&self, tracks: BTreeMap<String, Track>) {
            self.record(Call::ScanSuccess(tracks));
        }
        fn scan_local_folders_failed(&self, error: &str) {
            self.record(Call::ScanFailed(error.to_string()));
        }
        fn on_download_started(&self, track: Track) {
            self.record(Call::DownloadStarted(track));
        }
        fn on_download_progress(&self, uuid: &str, progress: f64) {
            self.record(Call::DownloadProgress(uuid.to_string(), progress));
        }
        fn on_download_finished(&self, uuid: &str) {
            self.record(Call::DownloadFinished(uuid.to_string()));
        }
    }

    impl StateSource for Recorder {
        fn snapshot(&self) -> State {
            self.state.lock().unwrap().clone()
        }
    }

    struct Harness {
        recorder: Arc<Recorder>,
        history: Arc<History>,
        channel: Channel,
        outbound: mpsc::UnboundedReceiver<Outbound>,
        _activation: Activation,
    }

    impl Harness {
        fn new(state: State) -> Self {
            let recorder = Recorder::with_state(state);
            let history = Arc::new(History::default());
            let bridge = Arc::new(Bridge::new(
                recorder.clone(),
                recorder.clone(),
                history.clone(),
            ));
            let (channel, mut outbound) = Channel::new();
            let activation = bridge.activate(&channel).unwrap();
            // Skip the activation announcements.
            outbound.try_recv().unwrap();
            outbound.try_recv().unwrap();
            Self {
                recorder,
                history,
                channel,
                outbound,
                _activation: activation,
            }
        }

        fn deliver(&self, name: &str, payload: Value) -> Vec<Call> {
            assert_eq!(self.channel.emit(name, &payload).unwrap(), 1);
            self.recorder.calls()
        }
    }

    fn track(name: &str) -> Track {
        Track {
            artist: "artist".to_string(),
            name: name.to_string(),
            ..Track::default()
        }
    }

    fn queued(names: &[&str]) -> State {
        let mut state = State::default();
        for name in names {
            state.queue.push(QueueItem::new(track(name), &[]));
        }
        state
    }

    #[test]
    fn activation_registers_every_message_once_and_announces() {
        let recorder = Recorder::with_state(State::default());
        let bridge = Arc::new(Bridge::new(
            recorder.clone(),
            recorder.clone(),
            Arc::new(History::default()),
        ));
        let (channel, mut outbound) = Channel::new();

        let activation = bridge.activate(&channel).unwrap();

        assert_eq!(activation.len(), INBOUND.len());
        let unique: HashSet<&str> = activation.names().collect();
        assert_eq!(unique.len(), INBOUND.len());
        for name in INBOUND {
            assert_eq!(channel.listener_count(name), 1, "{name}");
        }
        assert_eq!(outbound.try_recv().unwrap().name(), "started");
        assert_eq!(outbound.try_recv().unwrap().name(), "refresh-localfolders");
        assert!(outbound.try_recv().is_err());
    }

    #[test]
    fn second_activation_is_refused_until_disposed() {
        let recorder = Recorder::with_state(State::default());
        let bridge = Arc::new(Bridge::new(
            recorder.clone(),
            recorder.clone(),
            Arc::new(History::default()),
        ));
        let (channel, _outbound) = Channel::new();

        let activation = bridge.activate(&channel).unwrap();
        assert!(matches!(bridge.activate(&channel), Err(App::AlreadyActive)));
        assert_eq!(channel.listener_count("next"), 1);

        activation.deactivate();
        assert!(!bridge.is_active());
        assert_eq!(channel.listener_count("next"), 0);
        assert_eq!(channel.emit("next", &Value::Null).unwrap(), 0);

        let _again = bridge.activate(&channel).unwrap();
        channel.emit("next", &Value::Null).unwrap();
        assert_eq!(recorder.calls(), vec![Call::Next]);
    }

    #[test]
    fn simple_messages_map_to_their_actions() {
        let harness = Harness::new(State::default());
        for name in ["next", "previous", "pause", "stop", "play", "empty-queue"] {
            harness.deliver(name, Value::Null);
        }
        assert_eq!(
            harness.recorder.calls(),
            vec![
                Call::Next,
                Call::Previous,
                Call::Pause,
                Call::Stop,
                Call::Start,
                Call::ClearQueue
            ]
        );
    }

    #[test]
    fn volume_and_seek_pass_their_value() {
        let harness = Harness::new(State::default());
        harness.deliver("volume", json!(50));
        let calls = harness.deliver("seek", json!(12.5));
        assert_eq!(calls, vec![Call::Volume(50.0), Call::Seek(12.5)]);
    }

    #[test]
    fn malformed_volume_dispatches_nothing() {
        let harness = Harness::new(State::default());
        assert!(harness.channel.emit("volume", &json!({"level": 5})).is_err());
        assert!(harness.recorder.calls().is_empty());
    }

    #[test]
    fn playpause_depends_on_playback_status() {
        let harness = Harness::new(State::default());
        assert_eq!(harness.deliver("playpause", Value::Null), vec![Call::Start]);

        let mut playing = State::default();
        playing.player.playback_status = PlaybackStatus::Playing;
        let harness = Harness::new(playing);
        assert_eq!(harness.deliver("playpause", Value::Null), vec![Call::Pause]);
    }

    #[test]
    fn mute_toggles() {
        let harness = Harness::new(State::default());
        assert_eq!(harness.deliver("mute", Value::Null), vec![Call::Mute]);

        let mut muted = State::default();
        muted.player.muted = true;
        let harness = Harness::new(muted);
        assert_eq!(harness.deliver("mute", Value::Null), vec![Call::Unmute]);
    }

    #[test]
    fn settings_set_each_option() {
        let harness = Harness::new(State::default());
        let calls = harness.deliver("settings", json!({"loop": true, "api.key": "abc"}));
        assert_eq!(
            calls,
            vec![
                Call::SetOption("api.key".to_string(), OptionValue::Text("abc".to_string())),
                Call::SetOption("loop".to_string(), OptionValue::Bool(true)),
            ]
        );
    }

    #[test]
    fn settings_with_unsupported_values_still_set_the_valid_ones() {
        let harness = Harness::new(State::default());
        let calls = harness.deliver(
            "settings",
            json!({"loop": true, "lastfm.session": null, "shuffle": false}),
        );
        assert_eq!(
            calls,
            vec![
                Call::SetOption("loop".to_string(), OptionValue::Bool(true)),
                Call::SetOption("shuffle".to_string(), OptionValue::Bool(false)),
            ]
        );
    }

    #[test]
    fn select_track_passes_index() {
        let harness = Harness::new(State::default());
        assert_eq!(
            harness.deliver("select-track", json!(3)),
            vec![Call::SelectSong(3)]
        );
    }

    #[test]
    fn create_playlist_uses_the_whole_queue() {
        let harness = Harness::new(queued(&["a", "b", "c"]));
        let calls = harness.deliver("create-playlist", json!("X"));
        assert_eq!(
            calls,
            vec![Call::AddPlaylist(
                vec![track("a"), track("b"), track("c")],
                "X".to_string()
            )]
        );
    }

    #[test]
    fn refresh_playlists_loads() {
        let harness = Harness::new(State::default());
        assert_eq!(
            harness.deliver("refresh-playlists", Value::Null),
            vec![Call::LoadPlaylists]
        );
    }

    #[test]
    fn activate_playlist_replaces_queue_and_plays() {
        let mut state = State::default();
        state.stream_providers = vec![StreamProvider::new("Local", "")];
        state.playlists = vec![Playlist {
            name: "mix".to_string(),
            tracks: vec![track("one"), track("two")],
        }];
        let harness = Harness::new(state);

        let calls = harness.deliver("activate-playlist", json!("mix"));

        assert_eq!(
            calls,
            vec![
                Call::ClearQueue,
                Call::AddToQueue(vec!["Local".to_string()], vec![track("one"), track("two")]),
                Call::SelectSong(0),
                Call::Start,
            ]
        );
    }

    #[test]
    fn activate_unknown_playlist_does_nothing() {
        let harness = Harness::new(State::default());
        assert!(harness.deliver("activate-playlist", json!("ghost")).is_empty());
    }

    #[test]
    fn play_startup_track_uses_local_providers_and_opens_library() {
        let mut state = State::default();
        state.stream_providers = vec![
            StreamProvider::new("YouTube", ""),
            StreamProvider::new("Local", "local files"),
            StreamProvider::new("SoundCloud", ""),
        ];
        let harness = Harness::new(state);

        let calls = harness.deliver("play-startup-track", json!({"name": "boot", "artist": "artist"}));

        assert_eq!(
            calls,
            vec![Call::PlayTrack(vec!["Local".to_string()], track("boot"))]
        );
        assert_eq!(harness.history.current().as_deref(), Some(LIBRARY_ROUTE));
    }

    #[test]
    fn equalizer_messages() {
        let harness = Harness::new(State::default());
        harness.deliver("update-equalizer", json!({"values": [1.0, 2.0], "preAmp": 3.0}));
        let calls = harness.deliver("set-equalizer", json!("Rock"));
        assert_eq!(
            calls,
            vec![
                Call::UpdateEqualizer(EqualizerValues {
                    values: vec![1.0, 2.0],
                    pre_amp: 3.0
                }),
                Call::SetEqualizer("Rock".to_string()),
            ]
        );
    }

    #[test]
    fn local_files_messages() {
        let harness = Harness::new(State::default());
        harness.deliver("local-files-progress", json!({"scanProgress": 4, "scanTotal": 9}));
        harness.deliver("local-files", json!({"id1": {"name": "a", "artist": "artist"}}));
        let calls = harness.deliver("local-files-error", json!("permission denied"));
        assert_eq!(
            calls,
            vec![
                Call::ScanProgress(4, 9),
                Call::ScanSuccess(BTreeMap::from([("id1".to_string(), track("a"))])),
                Call::ScanFailed("permission denied".to_string()),
            ]
        );
    }

    #[test]
    fn download_messages() {
        let harness = Harness::new(State::default());
        harness.deliver("download-started", json!({"uuid": "d", "name": "a", "artist": "artist"}));
        harness.deliver("download-progress", json!({"uuid": "d", "progress": 0.25}));
        harness.deliver("download-finished", json!("d"));
        let calls = harness.deliver("download-error", json!({"uuid": "d", "error": "boom"}));
        assert_eq!(
            calls,
            vec![
                Call::DownloadStarted(Track {
                    uuid: Some("d".to_string()),
                    ..track("a")
                }),
                Call::DownloadProgress("d".to_string(), 0.25),
                Call::DownloadFinished("d".to_string()),
            ]
        );
    }

    #[test]
    fn download_error_is_logged_at_error_level() {
        let captured = captured_log();
        let harness = Harness::new(State::default());

        let calls = harness.deliver(
            "download-error",
            json!({"uuid": "d9", "error": "disk full on d9"}),
        );

        assert!(calls.is_empty());
        assert!(captured.contains(log::Level::Error, "disk full on d9"));
    }

    #[test]
    fn playing_status_and_queue_reply_to_the_host() {
        let mut harness = Harness::new(queued(&["a", "b"]));

        harness.deliver("playing-status", Value::Null);
        harness.deliver("queue", Value::Null);

        let status = harness.outbound.try_recv().unwrap();
        assert_eq!(status.name(), "playing-status");
        assert_eq!(status.payload().unwrap()["name"], "a");

        let queue = harness.outbound.try_recv().unwrap();
        let Outbound::Queue(items) = queue else {
            panic!("expected the queue reply");
        };
        assert_eq!(items.len(), 2);
        assert!(harness.recorder.calls().is_empty());
    }

    #[test]
    fn bridge_drives_the_real_store() {
        let store = Arc::new(Store::new(
            vec![StreamProvider::new("Local", "")],
            100.0,
            None,
        ));
        let history = Arc::new(History::default());
        let bridge = Arc::new(Bridge::new(store.clone(), store.clone(), history));
        let (channel, _outbound) = Channel::new();
        let _activation = bridge.activate(&channel).unwrap();

        channel
            .emit("play-startup-track", &json!({"name": "boot"}))
            .unwrap();
        channel.emit("create-playlist", &json!("startup")).unwrap();
        channel.emit("volume", &json!(35)).unwrap();
        channel.emit("playpause", &Value::Null).unwrap();

        let state = store.snapshot();
        assert_eq!(state.playlists[0].name, "startup");
        assert_eq!(state.playlists[0].tracks[0].name, "boot");
        assert!((state.player.volume - 35.0).abs() < f64::EPSILON);
        assert_eq!(state.player.playback_status, PlaybackStatus::Paused);
    }
}
