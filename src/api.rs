use crate::catalog::Manager;
use crate::clipboard::store::ClipStore;
use crate::error::CatalogError;
use crate::executor;
use crate::model::AppRecord;
use crate::signal::RefreshSignal;
use log::{error, info};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;

/// Entry points for the presentation layer.
///
/// Listing, searching and history never fail here: problems are logged and an empty JSON
/// array is returned. Launching is the one call that reports errors.
pub struct Backend {
    manager: Arc<Manager>,
    clips: Arc<ClipStore>,
    signal: RefreshSignal,
    visible: AtomicBool,
    last_run: Mutex<LastRun>,
}

#[derive(Default)]
struct LastRun {
    command: String,
    output: String,
}

impl Backend {
    pub fn new(manager: Arc<Manager>, clips: Arc<ClipStore>, signal: RefreshSignal) -> Self {
        Self {
            manager,
            clips,
            signal,
            visible: AtomicBool::new(false),
            last_run: Mutex::new(LastRun::default()),
        }
    }

    pub fn manager(&self) -> &Arc<Manager> {
        &self.manager
    }

    pub fn get_all_apps(&self) -> String {
        records_json("GetAllApps", self.manager.all_apps())
    }

    pub fn search_apps(&self, query: &str) -> String {
        records_json("SearchApps", self.manager.search(query))
    }

    /// Launches `id` and hides the window on success.
    pub fn launch_app(&self, id: &str) -> Result<(), CatalogError> {
        if let Err(e) = self.manager.launch(id) {
            error!("LaunchApp error: {}", e);
            return Err(e);
        }
        self.set_visible(false);
        Ok(())
    }

    pub fn get_clip_history(&self) -> String {
        to_json("GetClipHistory", &self.clips.history())
    }

    /// Registers the refresh hook, replacing any earlier one.
    pub fn subscribe(&self) -> Receiver<()> {
        self.signal.subscribe()
    }

    /// Flips visibility for a hotkey press. Returns the new visibility.
    pub fn toggle_visibility(&self) -> bool {
        let visible = !self.visible.fetch_xor(true, Ordering::SeqCst);
        self.signal.notify();
        visible
    }

    /// Runs a command line and returns its combined output, or `Error: ...` text on failure.
    pub fn execute_command(&self, command: &str) -> String {
        if command.trim().is_empty() {
            return executor::run_captured(command);
        }
        self.last_run().command = command.to_string();
        let output = executor::run_captured(command);
        info!("ExecuteCommand: {:?} ({} bytes of output)", command, output.len());
        self.last_run().output = output.clone();
        output
    }

    pub fn last_command(&self) -> String {
        self.last_run().command.clone()
    }

    pub fn last_output(&self) -> String {
        self.last_run().output.clone()
    }

    fn last_run(&self) -> MutexGuard<'_, LastRun> {
        self.last_run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::SeqCst);
        self.signal.notify();
        info!("Window {}", if visible { "shown" } else { "hidden" });
    }
}

fn records_json(call: &str, records: Result<Vec<AppRecord>, CatalogError>) -> String {
    match records {
        Ok(records) => to_json(call, &records),
        Err(e) => {
            error!("{} error: {}", call, e);
            "[]".to_string()
        }
    }
}

fn to_json<T: Serialize>(call: &str, value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        error!("{} serialization error: {}", call, e);
        "[]".to_string()
    })
}
