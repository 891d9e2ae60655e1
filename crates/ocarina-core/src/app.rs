use crate::driver::{DriverState, PlaybackDriver, TransitionError};
use crate::ipc::{Command, CommandReply, Event, SessionPhase};
use log::{info, warn};
use ocarina_domain_judge::{Interaction, Judge, JudgeConfig, NotePrecision, ScoreDelta};
use ocarina_domain_sheet::{import_midi_bytes, import_midi_path, Sheet};
use ocarina_ports::midi::{
    InputEvent, MidiError, MidiInputPort, MidiInputStream, DEFAULT_INPUT_PORT,
};
use ocarina_ports::storage::{MidiMusic, MusicStorePort, NewScore, SettingsDto, StorageError};
use ocarina_ports::types::Micros;
use parking_lot::Mutex;
use rtrb::{Consumer, RingBuffer};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

const INPUT_QUEUE_CAPACITY: usize = 1024;
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(3);

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("a device is already connected")]
    AlreadyConnected,
    #[error("midi error: {0}")]
    Midi(#[from] MidiError),
    #[error("there is no active session")]
    NoActiveSession,
    #[error("invalid state transition: {0}")]
    InvalidStateTransition(#[from] TransitionError),
    #[error("music with id {0} does not exist")]
    MusicNotFound(i64),
    #[error("invalid music file: {0}")]
    InvalidMusicFile(String),
    #[error("persistence failure: {0}")]
    Persistence(StorageError),
    #[error("invalid precision code {0}")]
    InvalidPrecisionCode(u8),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::MusicNotFound(id) => Self::MusicNotFound(id),
            other => Self::Persistence(other),
        }
    }
}

struct DeviceConnection {
    port_name: String,
    stream: Box<dyn MidiInputStream>,
    inputs: Consumer<InputEvent>,
}

struct ActiveSession {
    music_id: i64,
}

/// Single owner of the session state machine. Commands arrive through
/// [`AppCore::handle_command`]; the shell drives [`AppCore::tick`] on a
/// fixed cadence and forwards drained events to the window. The midir
/// callback thread only ever touches the input ring, so everything here
/// runs free of locks except the ring producer handoff.
pub struct AppCore {
    midi_port: Box<dyn MidiInputPort>,
    store: Box<dyn MusicStorePort>,
    settings: SettingsDto,
    connection: Option<DeviceConnection>,
    driver: PlaybackDriver,
    judge: Judge,
    session: Option<ActiveSession>,
    events: VecDeque<Event>,
    health_elapsed: Duration,
    last_tick: Option<Instant>,
}

impl AppCore {
    pub fn new(midi_port: Box<dyn MidiInputPort>, store: Box<dyn MusicStorePort>) -> Self {
        let settings = store.load_settings().unwrap_or_default();
        let judge = Judge::new(judge_config(&settings));
        Self {
            midi_port,
            store,
            settings,
            connection: None,
            driver: PlaybackDriver::new(),
            judge,
            session: None,
            events: VecDeque::new(),
            health_elapsed: Duration::ZERO,
            last_tick: None,
        }
    }

    pub fn handle_command(&mut self, cmd: Command) -> Result<CommandReply, AppError> {
        match cmd {
            Command::ConnectDevice { device_name } => {
                self.connect_device(device_name)?;
                Ok(CommandReply::Ack)
            }
            Command::DisconnectDevice => {
                let was_connected = self.disconnect_device();
                Ok(CommandReply::Disconnected { was_connected })
            }
            Command::ListDevices => {
                let names = self.midi_port.list_inputs()?;
                Ok(CommandReply::Devices { names })
            }
            Command::StartSession { music_id } => {
                self.start_session(music_id)?;
                Ok(CommandReply::Ack)
            }
            Command::PauseSession => {
                self.driver.pause()?;
                self.emit_phase(SessionPhase::Paused);
                Ok(CommandReply::Ack)
            }
            Command::ResumeSession => {
                self.driver.resume()?;
                self.emit_phase(SessionPhase::Playing);
                Ok(CommandReply::Ack)
            }
            Command::StopSession => {
                self.stop_session()?;
                Ok(CommandReply::Ack)
            }
            Command::EndSession => {
                self.end_session()?;
                Ok(CommandReply::Ack)
            }
            Command::ListMusics => {
                let list = self.store.list_musics()?;
                Ok(CommandReply::Musics { list })
            }
            Command::AddMusic { name, file_path } => {
                let music = self.add_music(&name, &file_path)?;
                Ok(CommandReply::Music { music })
            }
            Command::RemoveMusic { music_id } => {
                self.store.remove_music(music_id)?;
                info!("removed music {music_id} and its scores");
                Ok(CommandReply::Ack)
            }
            Command::ResetScores { music_id } => {
                self.store.reset_scores(music_id)?;
                Ok(CommandReply::Ack)
            }
            Command::ListScores {
                music_id,
                order,
                ascending,
                completed,
            } => {
                let scores = self.store.list_scores(music_id, order, ascending, completed)?;
                Ok(CommandReply::Scores { scores })
            }
            Command::RecordInteraction { precision_code } => {
                let score = self.record_interaction(precision_code)?;
                Ok(CommandReply::Interaction { score })
            }
            Command::MusicLength { music_id } => {
                let music = self.store.find_music(music_id)?;
                Ok(CommandReply::Seconds {
                    seconds: music.duration_secs,
                })
            }
            Command::RemainingTime => {
                if !self.driver.is_active() {
                    return Err(AppError::NoActiveSession);
                }
                Ok(CommandReply::Seconds {
                    seconds: self.driver.remaining_time().as_secs(),
                })
            }
        }
    }

    /// Advances the core by wall-clock time. Called by the shell.
    pub fn tick(&mut self) {
        let now = Instant::now();
        let dt = self
            .last_tick
            .map(|last| now.duration_since(last))
            .unwrap_or_default();
        self.last_tick = Some(now);
        self.advance(dt);
    }

    /// Advances the core by an explicit delta: drains live input, moves
    /// the playback clock, and runs the connection health check.
    pub fn advance(&mut self, dt: Duration) {
        self.drain_live_inputs();
        self.advance_driver(dt);
        self.poll_device_health(dt);
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    fn connect_device(&mut self, device_name: Option<String>) -> Result<(), AppError> {
        if self.connection.is_some() {
            return Err(AppError::AlreadyConnected);
        }

        let port_name = device_name
            .or_else(|| self.settings.preferred_device.clone())
            .unwrap_or_else(|| DEFAULT_INPUT_PORT.to_string());

        let (producer, consumer) = RingBuffer::new(INPUT_QUEUE_CAPACITY);
        let producer = Arc::new(Mutex::new(producer));
        let cb = Arc::new(move |event: InputEvent| {
            if let Some(mut guard) = producer.try_lock() {
                let _ = guard.push(event);
            }
        });

        let stream = self.midi_port.open_input(&port_name, cb)?;
        info!("connected to midi device {port_name}");
        self.connection = Some(DeviceConnection {
            port_name: port_name.clone(),
            stream,
            inputs: consumer,
        });
        self.health_elapsed = Duration::ZERO;
        self.events.push_back(Event::DeviceConnectivity { connected: true });

        self.settings.preferred_device = Some(port_name);
        self.save_settings();
        Ok(())
    }

    /// Closes the active connection if any. Idempotent by contract.
    fn disconnect_device(&mut self) -> bool {
        match self.connection.take() {
            Some(conn) => {
                conn.stream.close();
                info!("disconnected from midi device {}", conn.port_name);
                self.events
                    .push_back(Event::DeviceConnectivity { connected: false });
                true
            }
            None => false,
        }
    }

    fn start_session(&mut self, music_id: i64) -> Result<(), AppError> {
        if self.driver.is_active() {
            return Err(AppError::InvalidStateTransition(TransitionError {
                from: self.driver.state(),
                action: "start",
            }));
        }

        let music = self.store.find_music(music_id)?;
        let bytes = self.store.music_bytes(music_id)?;
        let sheet: Sheet =
            import_midi_bytes(&bytes).map_err(|e| AppError::InvalidMusicFile(e.to_string()))?;

        self.judge = Judge::new(judge_config(&self.settings));
        self.judge.load_targets(sheet.targets.clone());
        self.driver.start(&sheet)?;
        self.session = Some(ActiveSession { music_id });
        info!("session started on {music}");
        self.emit_phase(SessionPhase::Playing);
        Ok(())
    }

    /// Discards the session without persisting anything. Teardown runs
    /// unconditionally so no timer or subscription outlives the session.
    fn stop_session(&mut self) -> Result<(), AppError> {
        if self.session.is_none() {
            return Err(AppError::NoActiveSession);
        }
        self.driver.stop()?;
        self.clear_session();
        info!("session stopped, progress discarded");
        self.emit_phase(SessionPhase::Interrupted);
        Ok(())
    }

    /// Persists the session tallies and returns to idle. Allowed from
    /// `Finished` (completed) and from `Playing`/`Paused` (partial save).
    /// The session is consumed either way, so a second call fails with
    /// `NoActiveSession` and the score count grows by exactly one.
    fn end_session(&mut self) -> Result<(), AppError> {
        let Some(session) = self.session.as_ref() else {
            return Err(AppError::NoActiveSession);
        };
        if !self.driver.is_active() {
            return Err(AppError::NoActiveSession);
        }

        let completed = self.driver.state() == DriverState::Finished;
        let tally = self.judge.tally();
        let record = NewScore {
            music_id: session.music_id,
            // Floor applies at persistence time only.
            total_score: tally.total_score.max(0),
            highest_streak: tally.highest_streak,
            completed,
            hit_notes: tally.hit_notes,
            missed_notes: tally.missed_notes,
            poor_notes: tally.poor_notes,
        };

        let result = self.store.insert_score(record);
        self.driver.reset();
        self.clear_session();
        match result {
            Ok(saved) => {
                info!(
                    "session ended, persisted score {} for music {} (completed: {completed})",
                    saved.total_score, saved.music_id
                );
                Ok(())
            }
            Err(err) => {
                warn!("session ended but score could not be persisted: {err}");
                Err(err.into())
            }
        }
    }

    fn clear_session(&mut self) {
        self.judge.reset();
        self.session = None;
    }

    fn record_interaction(&mut self, precision_code: u8) -> Result<ScoreDelta, AppError> {
        let precision = NotePrecision::from_code(precision_code)
            .ok_or(AppError::InvalidPrecisionCode(precision_code))?;
        if self.session.is_none() {
            return Err(AppError::NoActiveSession);
        }
        Ok(self.judge.record(precision))
    }

    fn add_music(&mut self, name: &str, file_path: &str) -> Result<MidiMusic, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidMusicFile("music name is empty".to_string()));
        }
        let path = Path::new(file_path);
        let sheet =
            import_midi_path(path).map_err(|e| AppError::InvalidMusicFile(e.to_string()))?;
        if sheet.is_empty() {
            return Err(AppError::InvalidMusicFile(
                "file contains no playable notes".to_string(),
            ));
        }
        let music = self
            .store
            .add_music(name, path, sheet.length().as_secs())?;
        info!("added music {music}");
        Ok(music)
    }

    /// Live input is drained on every tick, paused or not, so nothing
    /// buffered during a pause is lost; it is only judged while playing.
    fn drain_live_inputs(&mut self) {
        let Some(conn) = self.connection.as_mut() else {
            return;
        };
        let mut pending = Vec::new();
        while let Ok(event) = conn.inputs.pop() {
            pending.push(event);
        }

        for event in pending {
            self.events.push_back(Event::LiveNote {
                signal: event.signal,
            });
            if self.driver.state() == DriverState::Playing && event.signal.on {
                let at_us = self.driver.elapsed_us();
                let interactions = self.judge.on_note_on(event.signal.note, at_us);
                self.push_interactions(interactions);
            }
        }
    }

    fn advance_driver(&mut self, dt: Duration) {
        let was = self.driver.state();
        for note in self.driver.advance(dt) {
            self.events.push_back(Event::SheetNote {
                signal: note.signal,
            });
        }

        if was == DriverState::Playing {
            let now_us: Micros = self.driver.elapsed_us();
            let interactions = self.judge.advance_to(now_us);
            self.push_interactions(interactions);

            if self.driver.state() == DriverState::Finished {
                info!("reference sheet exhausted, session finished");
                self.emit_phase(SessionPhase::Finished);
            }
        }
    }

    fn poll_device_health(&mut self, dt: Duration) {
        let Some(conn) = self.connection.as_ref() else {
            self.health_elapsed = Duration::ZERO;
            return;
        };
        self.health_elapsed += dt;
        if self.health_elapsed < HEALTH_CHECK_INTERVAL {
            return;
        }
        self.health_elapsed = Duration::ZERO;

        let port_name = conn.port_name.clone();
        // A failing enumeration counts as a lost device.
        let alive = match self.midi_port.list_inputs() {
            Ok(devices) => devices.iter().any(|d| d.contains(&port_name)),
            Err(err) => {
                warn!("device enumeration failed during health check: {err}");
                false
            }
        };
        if !alive {
            warn!("midi device {port_name} lost connection");
            if let Some(conn) = self.connection.take() {
                conn.stream.close();
            }
            self.events
                .push_back(Event::DeviceConnectivity { connected: false });
        }
    }

    fn push_interactions(&mut self, interactions: Vec<Interaction>) {
        for interaction in interactions {
            self.events.push_back(Event::ScoreUpdated {
                score: interaction.delta,
            });
        }
    }

    fn emit_phase(&mut self, phase: SessionPhase) {
        self.events.push_back(Event::SessionState { phase });
    }

    fn save_settings(&self) {
        if let Err(err) = self.store.save_settings(&self.settings) {
            warn!("could not save settings: {err}");
        }
    }
}

fn judge_config(settings: &SettingsDto) -> JudgeConfig {
    JudgeConfig {
        window_us: settings.classify_window_ms as Micros * 1_000,
    }
}
