use ocarina_domain_judge::ScoreDelta;
use ocarina_ports::storage::{MidiMusic, MidiMusicList, ScoreOrdering, ScoreRecord};
use ocarina_ports::types::MidiSignal;
use serde::{Deserialize, Serialize};

/// UI -> backend requests. Every command gets a typed reply or a typed
/// failure; none may silently no-op except where the reply says so
/// (`DisconnectDevice` reports whether anything was connected).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Command {
    ConnectDevice { device_name: Option<String> },
    DisconnectDevice,
    ListDevices,
    StartSession { music_id: i64 },
    PauseSession,
    ResumeSession,
    StopSession,
    EndSession,
    ListMusics,
    AddMusic { name: String, file_path: String },
    RemoveMusic { music_id: i64 },
    ResetScores { music_id: i64 },
    ListScores {
        music_id: i64,
        order: ScoreOrdering,
        ascending: Option<bool>,
        completed: Option<bool>,
    },
    RecordInteraction { precision_code: u8 },
    MusicLength { music_id: i64 },
    RemainingTime,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum CommandReply {
    Ack,
    Disconnected { was_connected: bool },
    Devices { names: Vec<String> },
    Musics { list: MidiMusicList },
    Music { music: MidiMusic },
    Scores { scores: Vec<ScoreRecord> },
    Interaction { score: ScoreDelta },
    Seconds { seconds: u64 },
}

/// Session lifecycle as the UI sees it. `Interrupted` means the session
/// was torn down before the sheet ran out; nothing was persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    Playing,
    Paused,
    Finished,
    Interrupted,
}

/// Backend -> UI notifications, multiplexed over one channel. FIFO within
/// a variant; no ordering guarantee across variants.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    /// A note played on the connected instrument.
    LiveNote { signal: MidiSignal },
    /// A reference-sheet note that just came due.
    SheetNote { signal: MidiSignal },
    SessionState { phase: SessionPhase },
    DeviceConnectivity { connected: bool },
    /// Tally change after a judged or recorded interaction.
    ScoreUpdated { score: ScoreDelta },
}
