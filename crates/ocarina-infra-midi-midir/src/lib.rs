use log::debug;
use midir::{Ignore, MidiInput};
use ocarina_ports::midi::{
    InputCallback, InputEvent, MidiError, MidiInputPort, MidiInputStream,
};
use ocarina_ports::types::{MidiSignal, NoteName};
use std::time::Instant;

pub struct MidirMidiInputPort {
    client_name: String,
}

impl MidirMidiInputPort {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }

    fn create_midi_in(&self) -> Result<MidiInput, MidiError> {
        MidiInput::new(&self.client_name).map_err(|e| MidiError::Backend(e.to_string()))
    }

    /// Maps a raw MIDI message to a playable signal. Anything that is not
    /// a note event on a key the ocarina can produce is dropped here, at
    /// the edge, so the core only ever sees valid notes.
    fn parse_message(message: &[u8]) -> Option<MidiSignal> {
        if message.len() < 3 {
            return None;
        }
        let status = message[0] & 0xF0;
        let key = message[1];
        let velocity = message[2];
        let on = match status {
            0x90 => velocity > 0,
            0x80 => false,
            _ => return None,
        };
        let Some(note) = NoteName::from_midi_key(key) else {
            debug!("ignoring key {key} outside the playable range");
            return None;
        };
        Some(MidiSignal::new(note, velocity, on))
    }
}

impl Default for MidirMidiInputPort {
    fn default() -> Self {
        Self::new("Ocarina")
    }
}

pub struct MidirMidiInputStream {
    connection: Option<midir::MidiInputConnection<InputCallback>>,
}

impl MidiInputStream for MidirMidiInputStream {
    fn close(mut self: Box<Self>) {
        if let Some(connection) = self.connection.take() {
            let _ = connection.close();
        }
    }
}

impl MidiInputPort for MidirMidiInputPort {
    fn list_inputs(&self) -> Result<Vec<String>, MidiError> {
        let midi_in = self.create_midi_in()?;
        let names = midi_in
            .ports()
            .iter()
            .map(|port| {
                midi_in
                    .port_name(port)
                    .unwrap_or_else(|_| "Unknown Input".to_string())
            })
            .collect();
        Ok(names)
    }

    fn open_input(
        &self,
        port_name: &str,
        cb: InputCallback,
    ) -> Result<Box<dyn MidiInputStream>, MidiError> {
        let mut midi_in = self.create_midi_in()?;
        midi_in.ignore(Ignore::None);

        let ports = midi_in.ports();
        let mut selected = None;
        for port in &ports {
            let name = midi_in
                .port_name(port)
                .unwrap_or_else(|_| "Unknown Input".to_string());
            if name.contains(port_name) {
                selected = Some(port.clone());
                break;
            }
        }
        let port = selected.ok_or_else(|| MidiError::DeviceNotFound(port_name.to_string()))?;

        let connection = midi_in
            .connect(
                &port,
                "ocarina-midi-input",
                move |_stamp, message, callback| {
                    if let Some(signal) = Self::parse_message(message) {
                        (callback)(InputEvent {
                            at: Instant::now(),
                            signal,
                        });
                    }
                },
                cb,
            )
            .map_err(|e| MidiError::Backend(e.to_string()))?;

        Ok(Box::new(MidirMidiInputStream {
            connection: Some(connection),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_on_and_off_are_parsed() {
        let on = MidirMidiInputPort::parse_message(&[0x90, 60, 100]).unwrap();
        assert_eq!(on.note, NoteName::C4);
        assert!(on.on);

        let off = MidirMidiInputPort::parse_message(&[0x80, 60, 0]).unwrap();
        assert!(!off.on);

        // Running status note-on with zero velocity is a note-off.
        let off = MidirMidiInputPort::parse_message(&[0x90, 60, 0]).unwrap();
        assert!(!off.on);
    }

    #[test]
    fn unplayable_keys_and_foreign_messages_are_dropped() {
        assert!(MidirMidiInputPort::parse_message(&[0x90, 20, 100]).is_none());
        assert!(MidirMidiInputPort::parse_message(&[0xB0, 64, 127]).is_none());
        assert!(MidirMidiInputPort::parse_message(&[0x90, 60]).is_none());
    }
}
