use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

fn default_classify_window_ms() -> u32 {
    600
}

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serde(String),
    #[error("music with id {0} does not exist")]
    MusicNotFound(i64),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsDto {
    /// Input port to try when `connect` is called without a device name.
    pub preferred_device: Option<String>,
    #[serde(default = "default_classify_window_ms")]
    pub classify_window_ms: u32,
}

impl Default for SettingsDto {
    fn default() -> Self {
        Self {
            preferred_device: None,
            classify_window_ms: default_classify_window_ms(),
        }
    }
}

/// One playable reference sheet in the managed library.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiMusic {
    pub id: i64,
    pub name: String,
    /// File name inside the managed musics directory.
    pub file_name: String,
    pub duration_secs: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MidiMusicList {
    pub files: Vec<MidiMusic>,
}

impl fmt::Display for MidiMusic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id {} | {} | {} ({}s)",
            self.id, self.name, self.file_name, self.duration_secs
        )
    }
}

/// Final tallies of one session, ready to be persisted.
#[derive(Clone, Copy, Debug)]
pub struct NewScore {
    pub music_id: i64,
    pub total_score: i64,
    pub highest_streak: u32,
    pub completed: bool,
    pub hit_notes: u32,
    pub missed_notes: u32,
    pub poor_notes: u32,
}

/// One persisted attempt. `recorded_at_s` (unix seconds) is the ordering key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub id: i64,
    pub music_id: i64,
    pub total_score: i64,
    pub highest_streak: u32,
    pub completed: bool,
    pub recorded_at_s: u64,
    #[serde(default)]
    pub hit_notes: u32,
    #[serde(default)]
    pub missed_notes: u32,
    #[serde(default)]
    pub poor_notes: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreOrdering {
    Date,
    Score,
    Streak,
}

pub trait MusicStorePort: Send + Sync {
    fn load_settings(&self) -> Result<SettingsDto, StorageError>;
    fn save_settings(&self, settings: &SettingsDto) -> Result<(), StorageError>;

    fn list_musics(&self) -> Result<MidiMusicList, StorageError>;
    fn find_music(&self, music_id: i64) -> Result<MidiMusic, StorageError>;
    /// Raw bytes of the managed reference-sheet file for `music_id`.
    fn music_bytes(&self, music_id: i64) -> Result<Vec<u8>, StorageError>;
    /// Copies `source` into managed storage and registers it under a fresh
    /// id. The caller is responsible for having validated the file.
    fn add_music(
        &self,
        name: &str,
        source: &Path,
        duration_secs: u64,
    ) -> Result<MidiMusic, StorageError>;
    /// Removes the music, its managed file, and all of its scores.
    fn remove_music(&self, music_id: i64) -> Result<(), StorageError>;

    fn insert_score(&self, score: NewScore) -> Result<ScoreRecord, StorageError>;
    /// Stored attempts for one music. Unknown ids yield an empty list, not
    /// an error. Storage order is preserved when `ascending` is absent.
    fn list_scores(
        &self,
        music_id: i64,
        order: ScoreOrdering,
        ascending: Option<bool>,
        completed: Option<bool>,
    ) -> Result<Vec<ScoreRecord>, StorageError>;
    /// Deletes every score of `music_id`. Irreversible.
    fn reset_scores(&self, music_id: i64) -> Result<(), StorageError>;
}
