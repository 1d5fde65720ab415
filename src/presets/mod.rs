// Presets and playlists: named tempo snapshots and ordered sets of them

pub mod model;
pub mod playlist;
pub mod store;

pub use model::{Playlist, Preset, SystemWallClock, WallClock};
pub use playlist::{PlaylistPlayback, PlaylistPosition};
pub use store::PresetStore;
