use serde::Serialize;

use super::model::{Playlist, Preset};

/// Cursor over a playlist being played.
///
/// Holds its own copy of the playlist, so deleting the stored playlist while
/// it plays does not disturb navigation.
#[derive(Debug, Clone)]
pub struct PlaylistPlayback {
    playlist: Playlist,
    cursor: usize,
}

/// Where playback stands, for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistPosition {
    pub playlist_id: u64,
    pub name: String,
    /// 0-based
    pub index: usize,
    pub len: usize,
    pub preset_id: u64,
}

impl PlaylistPlayback {
    /// `None` for a playlist without presets.
    pub fn start(playlist: Playlist) -> Option<Self> {
        if playlist.presets.is_empty() {
            return None;
        }
        Some(Self {
            playlist,
            cursor: 0,
        })
    }

    pub fn current(&self) -> &Preset {
        &self.playlist.presets[self.cursor]
    }

    pub fn has_next(&self) -> bool {
        self.cursor + 1 < self.playlist.presets.len()
    }

    pub fn has_previous(&self) -> bool {
        self.cursor > 0
    }

    /// Move forward. `None` at the last preset; the cursor stays put.
    pub fn advance(&mut self) -> Option<&Preset> {
        if !self.has_next() {
            return None;
        }
        self.cursor += 1;
        Some(self.current())
    }

    /// Move back. `None` at the first preset; the cursor stays put.
    pub fn retreat(&mut self) -> Option<&Preset> {
        if !self.has_previous() {
            return None;
        }
        self.cursor -= 1;
        Some(self.current())
    }

    pub fn position(&self) -> PlaylistPosition {
        PlaylistPosition {
            playlist_id: self.playlist.id,
            name: self.playlist.name.clone(),
            index: self.cursor,
            len: self.playlist.presets.len(),
            preset_id: self.current().id,
        }
    }
}
