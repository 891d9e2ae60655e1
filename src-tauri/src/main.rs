// Prevents an extra console window on Windows in release builds.
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use env_logger::Env;
use ocarina_core::{AppCore, Command, CommandReply};
use ocarina_infra_midi_midir::MidirMidiInputPort;
use ocarina_infra_storage_fs::FsMusicStore;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tauri::Manager;

const TICK_PERIOD: Duration = Duration::from_millis(16);

#[derive(Clone)]
struct AppState {
    core: Arc<Mutex<AppCore>>,
}

#[tauri::command]
fn send_command(
    state: tauri::State<'_, AppState>,
    command: Command,
) -> Result<CommandReply, String> {
    let mut core = state.core.lock();
    core.handle_command(command).map_err(|err| err.to_string())
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let midi_port = Box::new(MidirMidiInputPort::new("Ocarina"));
    let store = Box::new(FsMusicStore::default());
    let core = AppCore::new(midi_port, store);
    let state = AppState {
        core: Arc::new(Mutex::new(core)),
    };

    tauri::Builder::default()
        .manage(state.clone())
        .invoke_handler(tauri::generate_handler![send_command])
        .setup(move |app| {
            let app_handle = app.handle();
            let core = state.core.clone();
            std::thread::spawn(move || loop {
                let events = {
                    let mut core = core.lock();
                    core.tick();
                    core.drain_events()
                };

                for event in events {
                    let _ = app_handle.emit_all("core_event", event);
                }

                std::thread::sleep(TICK_PERIOD);
            });
            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
