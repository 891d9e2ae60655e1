use ocarina_ports::storage::{
    MidiMusic, MidiMusicList, MusicStorePort, NewScore, ScoreOrdering, ScoreRecord, SettingsDto,
    StorageError,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const SETTINGS_FILE: &str = "settings.json";
const LIBRARY_FILE: &str = "library.json";
const SCORES_FILE: &str = "scores.json";
const MUSICS_DIR: &str = "musics";

fn one() -> i64 {
    1
}

#[derive(Serialize, Deserialize)]
struct LibraryFile {
    #[serde(default = "one")]
    next_id: i64,
    files: Vec<MidiMusic>,
}

impl Default for LibraryFile {
    fn default() -> Self {
        Self {
            next_id: 1,
            files: Vec::new(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ScoresFile {
    #[serde(default = "one")]
    next_id: i64,
    scores: Vec<ScoreRecord>,
}

impl Default for ScoresFile {
    fn default() -> Self {
        Self {
            next_id: 1,
            scores: Vec::new(),
        }
    }
}

/// Music library and score store on the local filesystem: two JSON tables
/// plus a managed directory of reference-sheet copies. Removing a music
/// cascades to its scores and its file. Each call reads from and writes
/// through to disk; the core is the only writer.
pub struct FsMusicStore {
    base_dir: PathBuf,
}

impl FsMusicStore {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn default_base_dir() -> Result<PathBuf, StorageError> {
        let base = dirs_next::config_dir()
            .ok_or_else(|| StorageError::Io("config dir not found".to_string()))?;
        Ok(base.join("Ocarina"))
    }

    fn settings_path(&self) -> PathBuf {
        self.base_dir.join(SETTINGS_FILE)
    }

    fn library_path(&self) -> PathBuf {
        self.base_dir.join(LIBRARY_FILE)
    }

    fn scores_path(&self) -> PathBuf {
        self.base_dir.join(SCORES_FILE)
    }

    fn musics_dir(&self) -> PathBuf {
        self.base_dir.join(MUSICS_DIR)
    }

    fn read_json<T: serde::de::DeserializeOwned + Default>(path: &Path) -> Result<T, StorageError> {
        if !path.exists() {
            return Ok(T::default());
        }
        let data = fs::read(path).map_err(|e| StorageError::Io(e.to_string()))?;
        serde_json::from_slice(&data).map_err(|e| StorageError::Serde(e.to_string()))
    }

    fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
        }
        let data =
            serde_json::to_vec_pretty(value).map_err(|e| StorageError::Serde(e.to_string()))?;
        fs::write(path, data).map_err(|e| StorageError::Io(e.to_string()))
    }

    fn load_library(&self) -> Result<LibraryFile, StorageError> {
        Self::read_json(&self.library_path())
    }

    fn load_scores(&self) -> Result<ScoresFile, StorageError> {
        Self::read_json(&self.scores_path())
    }

    fn require_music(&self, music_id: i64) -> Result<MidiMusic, StorageError> {
        self.load_library()?
            .files
            .into_iter()
            .find(|m| m.id == music_id)
            .ok_or(StorageError::MusicNotFound(music_id))
    }
}

impl Default for FsMusicStore {
    fn default() -> Self {
        let base_dir = Self::default_base_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self { base_dir }
    }
}

impl MusicStorePort for FsMusicStore {
    fn load_settings(&self) -> Result<SettingsDto, StorageError> {
        Self::read_json(&self.settings_path())
    }

    fn save_settings(&self, settings: &SettingsDto) -> Result<(), StorageError> {
        Self::write_json(&self.settings_path(), settings)
    }

    fn list_musics(&self) -> Result<MidiMusicList, StorageError> {
        Ok(MidiMusicList {
            files: self.load_library()?.files,
        })
    }

    fn find_music(&self, music_id: i64) -> Result<MidiMusic, StorageError> {
        self.require_music(music_id)
    }

    fn music_bytes(&self, music_id: i64) -> Result<Vec<u8>, StorageError> {
        let music = self.require_music(music_id)?;
        let path = self.musics_dir().join(&music.file_name);
        fs::read(&path).map_err(|e| StorageError::Io(e.to_string()))
    }

    fn add_music(
        &self,
        name: &str,
        source: &Path,
        duration_secs: u64,
    ) -> Result<MidiMusic, StorageError> {
        let mut library = self.load_library()?;
        let id = library.next_id;
        let file_name = format!("{id}.mid");

        let dir = self.musics_dir();
        fs::create_dir_all(&dir).map_err(|e| StorageError::Io(e.to_string()))?;
        fs::copy(source, dir.join(&file_name)).map_err(|e| StorageError::Io(e.to_string()))?;

        let music = MidiMusic {
            id,
            name: name.to_string(),
            file_name,
            duration_secs,
        };
        library.next_id += 1;
        library.files.push(music.clone());
        Self::write_json(&self.library_path(), &library)?;
        Ok(music)
    }

    fn remove_music(&self, music_id: i64) -> Result<(), StorageError> {
        let mut library = self.load_library()?;
        let Some(idx) = library.files.iter().position(|m| m.id == music_id) else {
            return Err(StorageError::MusicNotFound(music_id));
        };
        let music = library.files.remove(idx);
        Self::write_json(&self.library_path(), &library)?;

        let mut scores = self.load_scores()?;
        scores.scores.retain(|s| s.music_id != music_id);
        Self::write_json(&self.scores_path(), &scores)?;

        // The managed copy may already be gone; the table rows are what count.
        let _ = fs::remove_file(self.musics_dir().join(&music.file_name));
        Ok(())
    }

    fn insert_score(&self, score: NewScore) -> Result<ScoreRecord, StorageError> {
        let mut scores = self.load_scores()?;
        let recorded_at_s = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| StorageError::Io(e.to_string()))?
            .as_secs();
        let record = ScoreRecord {
            id: scores.next_id,
            music_id: score.music_id,
            total_score: score.total_score,
            highest_streak: score.highest_streak,
            completed: score.completed,
            recorded_at_s,
            hit_notes: score.hit_notes,
            missed_notes: score.missed_notes,
            poor_notes: score.poor_notes,
        };
        scores.next_id += 1;
        scores.scores.push(record.clone());
        Self::write_json(&self.scores_path(), &scores)?;
        Ok(record)
    }

    fn list_scores(
        &self,
        music_id: i64,
        order: ScoreOrdering,
        ascending: Option<bool>,
        completed: Option<bool>,
    ) -> Result<Vec<ScoreRecord>, StorageError> {
        let mut records: Vec<ScoreRecord> = self
            .load_scores()?
            .scores
            .into_iter()
            .filter(|s| s.music_id == music_id)
            .filter(|s| completed.map(|c| s.completed == c).unwrap_or(true))
            .collect();

        if let Some(ascending) = ascending {
            match order {
                ScoreOrdering::Date => records.sort_by_key(|s| s.recorded_at_s),
                ScoreOrdering::Score => records.sort_by_key(|s| s.total_score),
                ScoreOrdering::Streak => records.sort_by_key(|s| s.highest_streak),
            }
            if !ascending {
                records.reverse();
            }
        }
        Ok(records)
    }

    fn reset_scores(&self, music_id: i64) -> Result<(), StorageError> {
        self.require_music(music_id)?;
        let mut scores = self.load_scores()?;
        scores.scores.retain(|s| s.music_id != music_id);
        Self::write_json(&self.scores_path(), &scores)
    }
}
