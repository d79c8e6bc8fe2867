use crate::store::state::{QueueItem, QueueState, Settings};
use rand::Rng;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayMode {
    Sequential,
    Loop,
    Shuffle,
}

impl PlayMode {
    pub fn from_settings(settings: &Settings) -> Self {
        if settings.flag("shuffle") {
            PlayMode::Shuffle
        } else if settings.flag("loop") {
            PlayMode::Loop
        } else {
            PlayMode::Sequential
        }
    }
}

impl QueueState {
    /// Index the queue moves to on `next`, or `None` when it stays put.
    pub fn next_index(&self, play_mode: PlayMode) -> Option<usize> {
        let len = self.queue_items.len();
        if len == 0 {
            return None;
        }
        let current_index = self.current_song;
        match play_mode {
            PlayMode::Shuffle => Some(rand::thread_rng().gen_range(0..len)),
            PlayMode::Loop => Some((current_index + 1) % len),
            PlayMode::Sequential if current_index + 1 < len => Some(current_index + 1),
            PlayMode::Sequential => None,
        }
    }

    pub fn previous_index(&self, play_mode: PlayMode) -> Option<usize> {
        let len = self.queue_items.len();
        if len == 0 {
            return None;
        }
        let current_index = self.current_song;
        match play_mode {
            PlayMode::Shuffle => Some(rand::thread_rng().gen_range(0..len)),
            PlayMode::Loop if current_index == 0 => Some(len - 1),
            PlayMode::Loop | PlayMode::Sequential if current_index > 0 => Some(current_index - 1),
            PlayMode::Loop | PlayMode::Sequential => None,
        }
    }

    pub fn clear(&mut self) {
        self.queue_items.clear();
        self.current_song = 0;
    }

    pub fn push(&mut self, item: QueueItem) {
        self.queue_items.push(Arc::new(item));
    }
}

/// True when the currently playing item differs by identity between two
/// consecutive snapshots.
pub fn track_changed(previous: Option<&Arc<QueueItem>>, current: Option<&Arc<QueueItem>>) -> bool {
    match (previous, current) {
        (Some(previous), Some(current)) => !Arc::ptr_eq(previous, current),
        (None, None) => false,
        _ => true,
    }
}
