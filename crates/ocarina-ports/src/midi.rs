use crate::types::MidiSignal;
use std::{sync::Arc, time::Instant};

/// Port name the connector falls back to when neither the caller nor the
/// saved settings name a device.
pub const DEFAULT_INPUT_PORT: &str = "USB MidiKliK";

#[derive(thiserror::Error, Debug)]
pub enum MidiError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Raw input from the instrument, stamped on the backend callback thread.
#[derive(Clone, Copy, Debug)]
pub struct InputEvent {
    pub at: Instant,
    pub signal: MidiSignal,
}

/// Live input stream handle. `close` tears the subscription down; dropping
/// the box without calling it leaks the backend callback.
pub trait MidiInputStream: Send {
    fn close(self: Box<Self>);
}

pub type InputCallback = Arc<dyn Fn(InputEvent) + Send + Sync + 'static>;

pub trait MidiInputPort: Send + Sync {
    /// Enumerates currently available input port names. Queried fresh on
    /// every call; callers must not cache the result.
    fn list_inputs(&self) -> Result<Vec<String>, MidiError>;

    /// Opens the first port whose name contains `port_name`. The callback
    /// is invoked from a backend thread for every playable note event.
    fn open_input(
        &self,
        port_name: &str,
        cb: InputCallback,
    ) -> Result<Box<dyn MidiInputStream>, MidiError>;
}
