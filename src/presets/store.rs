//! PresetStore - saved presets and playlists backed by a key-value store
//!
//! Both collections are read once when the store is loaded and written back
//! in full after every mutation. A failed write is reported, but the
//! in-memory collection keeps the change so the session carries on.

use std::sync::Arc;

use super::model::{Playlist, Preset, WallClock};
use crate::error::{log_preset_error, PresetError};
use crate::metronome::TempoConfig;
use crate::storage::{load_json, store_json, KeyValueStore, PLAYLISTS_KEY, PRESETS_KEY};

pub struct PresetStore {
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn WallClock>,
    presets: Vec<Preset>,
    playlists: Vec<Playlist>,
    last_id: u64,
}

fn valid_name(name: &str) -> Result<String, PresetError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(PresetError::InvalidName);
    }
    Ok(trimmed.to_string())
}

impl PresetStore {
    /// Read both collections. Missing or corrupt data loads as empty.
    pub fn load(storage: Arc<dyn KeyValueStore>, clock: Arc<dyn WallClock>) -> Self {
        let presets: Vec<Preset> = load_json(storage.as_ref(), PRESETS_KEY).unwrap_or_default();
        let playlists: Vec<Playlist> =
            load_json(storage.as_ref(), PLAYLISTS_KEY).unwrap_or_default();
        let last_id = presets
            .iter()
            .map(|p| p.id)
            .chain(playlists.iter().map(|p| p.id))
            .max()
            .unwrap_or(0);

        log::info!(
            "[PresetStore] Loaded {} presets and {} playlists",
            presets.len(),
            playlists.len()
        );
        Self {
            storage,
            clock,
            presets,
            playlists,
            last_id,
        }
    }

    /// Creation-time id, strictly increasing within this store.
    fn next_id(&mut self) -> (u64, u64) {
        let now = self.clock.now_ms();
        self.last_id = now.max(self.last_id + 1);
        (self.last_id, now)
    }

    fn persist_presets(&self) -> Result<(), PresetError> {
        store_json(self.storage.as_ref(), PRESETS_KEY, &self.presets).map_err(|err| {
            let err = PresetError::from(err);
            log_preset_error(&err, "PresetStore::persist_presets");
            err
        })
    }

    fn persist_playlists(&self) -> Result<(), PresetError> {
        store_json(self.storage.as_ref(), PLAYLISTS_KEY, &self.playlists).map_err(|err| {
            let err = PresetError::from(err);
            log_preset_error(&err, "PresetStore::persist_playlists");
            err
        })
    }

    /// Snapshot `tempo` under `name`.
    pub fn save_preset(&mut self, name: &str, tempo: &TempoConfig) -> Result<Preset, PresetError> {
        let name = valid_name(name)?;
        let (id, now) = self.next_id();
        let preset = Preset::from_tempo(id, name, tempo, now);
        self.presets.push(preset.clone());
        log::info!("[PresetStore] Saved preset {} '{}'", preset.id, preset.name);
        self.persist_presets()?;
        Ok(preset)
    }

    /// Playlists keep their own copies and are not touched.
    pub fn delete_preset(&mut self, id: u64) -> Result<(), PresetError> {
        let before = self.presets.len();
        self.presets.retain(|p| p.id != id);
        if self.presets.len() == before {
            return Err(PresetError::PresetNotFound { id });
        }
        self.persist_presets()
    }

    pub fn clear_presets(&mut self) -> Result<(), PresetError> {
        self.presets.clear();
        self.persist_presets()
    }

    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    pub fn preset(&self, id: u64) -> Option<&Preset> {
        self.presets.iter().find(|p| p.id == id)
    }

    /// Copy the presets named by `preset_ids`, in that order, into a new playlist.
    ///
    /// # Errors
    /// - `InvalidName` for a blank name
    /// - `EmptySelection` when `preset_ids` is empty
    /// - `PresetNotFound` for an unknown id; nothing is created
    pub fn create_playlist(
        &mut self,
        name: &str,
        preset_ids: &[u64],
    ) -> Result<Playlist, PresetError> {
        let name = valid_name(name)?;
        if preset_ids.is_empty() {
            let err = PresetError::EmptySelection;
            log_preset_error(&err, "PresetStore::create_playlist");
            return Err(err);
        }
        let presets = preset_ids
            .iter()
            .map(|&id| {
                self.preset(id)
                    .cloned()
                    .ok_or(PresetError::PresetNotFound { id })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let (id, now) = self.next_id();
        let playlist = Playlist {
            id,
            name,
            presets,
            created_at_ms: now,
        };
        self.playlists.push(playlist.clone());
        log::info!(
            "[PresetStore] Created playlist {} '{}' with {} presets",
            playlist.id,
            playlist.name,
            playlist.presets.len()
        );
        self.persist_playlists()?;
        Ok(playlist)
    }

    pub fn delete_playlist(&mut self, id: u64) -> Result<(), PresetError> {
        let before = self.playlists.len();
        self.playlists.retain(|p| p.id != id);
        if self.playlists.len() == before {
            return Err(PresetError::PlaylistNotFound { id });
        }
        self.persist_playlists()
    }

    pub fn clear_playlists(&mut self) -> Result<(), PresetError> {
        self.playlists.clear();
        self.persist_playlists()
    }

    pub fn playlists(&self) -> &[Playlist] {
        &self.playlists
    }

    pub fn playlist(&self, id: u64) -> Option<&Playlist> {
        self.playlists.iter().find(|p| p.id == id)
    }
}
