use crate::config::ClipboardConfig;
use crate::model::{ClipEntry, content_hash};
use crate::signal::RefreshSignal;
use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel, sync_channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub mod store;

use store::ClipStore;

/// Where captured text comes from.
pub trait ClipboardSource {
    /// Current plain-text contents, `None` when the clipboard holds no text.
    fn read_text(&mut self) -> Result<Option<String>>;
}

/// The system clipboard.
pub struct ArboardSource {
    clipboard: arboard::Clipboard,
}

impl ArboardSource {
    pub fn new() -> Result<Self> {
        let clipboard = arboard::Clipboard::new().context("failed to access system clipboard")?;
        Ok(Self { clipboard })
    }
}

impl ClipboardSource for ArboardSource {
    fn read_text(&mut self) -> Result<Option<String>> {
        match self.clipboard.get_text() {
            Ok(text) => Ok(Some(text)),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Collapses whitespace (newlines included) and keeps the first `max_chars` characters.
pub fn preview(text: &str, max_chars: usize) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(max_chars)
        .collect()
}

/// Captures each change of clipboard text into the store.
///
/// A value equal to the last one seen is not a change. Timestamps handed out by one daemon are
/// strictly increasing even if the wall clock stalls or steps back.
pub struct ClipDaemon<S> {
    source: S,
    store: Arc<ClipStore>,
    signal: RefreshSignal,
    preview_chars: usize,
    last_hash: Option<String>,
    last_timestamp: i64,
}

impl<S: ClipboardSource> ClipDaemon<S> {
    pub fn new(
        source: S,
        store: Arc<ClipStore>,
        signal: RefreshSignal,
        preview_chars: usize,
    ) -> Self {
        Self {
            source,
            store,
            signal,
            preview_chars,
            last_hash: None,
            last_timestamp: 0,
        }
    }

    fn read(&mut self) -> Option<String> {
        match self.source.read_text() {
            Ok(text) => text.filter(|t| !t.is_empty()),
            Err(e) => {
                debug!("Clipboard read failed: {:#}", e);
                None
            }
        }
    }

    /// Remembers what is on the clipboard already so it is not captured as new.
    pub fn seed(&mut self) {
        if let Some(text) = self.read() {
            self.last_hash = Some(content_hash(&text));
        }
    }

    pub fn poll(&mut self) -> Option<ClipEntry> {
        let text = self.read()?;
        self.observe(text)
    }

    pub fn observe(&mut self, text: String) -> Option<ClipEntry> {
        let hash = content_hash(&text);
        if self.last_hash.as_deref() == Some(hash.as_str()) {
            return None;
        }
        self.last_hash = Some(hash);

        let entry = ClipEntry::new(text, self.next_timestamp());
        if let Err(e) = self.store.put(entry.clone()) {
            warn!("Failed to persist clip {}: {:#}", entry.content_hash, e);
        }
        info!("{}... COPIED!", preview(&entry.content, self.preview_chars));
        self.signal.notify();
        Some(entry)
    }

    fn next_timestamp(&mut self) -> i64 {
        let timestamp = Utc::now().timestamp_millis().max(self.last_timestamp + 1);
        self.last_timestamp = timestamp;
        timestamp
    }

    /// Polls every `interval` until `stop` fires or its sender is dropped.
    pub fn run(mut self, stop: Receiver<()>, interval: Duration) {
        info!("Clipboard recording started...");
        self.seed();
        loop {
            self.poll();
            match stop.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        info!("Clipboard recording stopped");
    }
}

/// A running capture thread.
pub struct DaemonHandle {
    stop: Sender<()>,
    thread: JoinHandle<()>,
}

impl DaemonHandle {
    pub fn stop(self) {
        let _ = self.stop.send(());
        if self.thread.join().is_err() {
            warn!("Clipboard thread panicked");
        }
    }
}

/// Starts capturing on a background thread.
///
/// The source is created on that thread. If creating it fails the error is returned here and
/// no thread is left running.
pub fn spawn<S, F>(
    make_source: F,
    store: Arc<ClipStore>,
    signal: RefreshSignal,
    config: &ClipboardConfig,
) -> Result<DaemonHandle>
where
    S: ClipboardSource + 'static,
    F: FnOnce() -> Result<S> + Send + 'static,
{
    let (ready_tx, ready_rx) = sync_channel::<Result<()>>(1);
    let (stop_tx, stop_rx) = channel();
    let interval = config.poll_interval();
    let preview_chars = config.preview_chars;

    let thread = thread::Builder::new()
        .name("clipboard".to_string())
        .spawn(move || {
            let source = match make_source() {
                Ok(source) => source,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));
            ClipDaemon::new(source, store, signal, preview_chars).run(stop_rx, interval);
        })
        .context("failed to start clipboard thread")?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(DaemonHandle { stop: stop_tx, thread }),
        Ok(Err(e)) => {
            let _ = thread.join();
            Err(e)
        }
        Err(e) => {
            let _ = thread.join();
            Err(e).context("clipboard thread exited during startup")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::time::Instant;

    struct ScriptedSource {
        script: VecDeque<Option<String>>,
    }

    impl ScriptedSource {
        fn new(values: &[&str]) -> Self {
            Self { script: values.iter().map(|v| Some(v.to_string())).collect() }
        }
    }

    impl ClipboardSource for ScriptedSource {
        fn read_text(&mut self) -> Result<Option<String>> {
            Ok(self.script.pop_front().flatten())
        }
    }

    type Harness = (ClipDaemon<ScriptedSource>, Arc<ClipStore>, RefreshSignal);

    fn daemon(dir: &std::path::Path) -> Harness {
        let store = Arc::new(ClipStore::in_dir(dir));
        let signal = RefreshSignal::new();
        let daemon = ClipDaemon::new(ScriptedSource::new(&[]), store.clone(), signal.clone(), 10);
        (daemon, store, signal)
    }

    #[test]
    fn preview_collapses_and_truncates() {
        assert_eq!(preview("  hello\n\n  world  again", 10), "hello worl");
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("ünïcödé tëxt", 4), "ünïc");
    }

    #[test]
    fn consecutive_duplicates_are_not_changes() {
        let dir = tempfile::tempdir().unwrap();
        let (mut daemon, store, _) = daemon(dir.path());

        let a = daemon.observe("a".into()).unwrap();
        assert!(daemon.observe("a".into()).is_none());
        let b = daemon.observe("b".into()).unwrap();

        assert!(b.timestamp > a.timestamp);
        let contents: Vec<_> = store.history().into_iter().map(|c| c.content).collect();
        assert_eq!(contents, vec!["b", "a"]);
    }

    #[test]
    fn recopied_text_moves_to_top() {
        let dir = tempfile::tempdir().unwrap();
        let (mut daemon, store, _) = daemon(dir.path());

        let first = daemon.observe("a".into()).unwrap();
        daemon.observe("b".into()).unwrap();
        let again = daemon.observe("a".into()).unwrap();

        assert!(again.timestamp > first.timestamp);
        assert_eq!(again.content_hash, first.content_hash);
        let history = store.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], again);
    }

    #[test]
    fn timestamps_strictly_increase() {
        let dir = tempfile::tempdir().unwrap();
        let (mut daemon, _, _) = daemon(dir.path());
        let stamps: Vec<i64> = (0..50)
            .map(|i| daemon.observe(format!("clip {}", i)).unwrap().timestamp)
            .collect();
        assert!(stamps.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn capture_notifies_subscriber() {
        let dir = tempfile::tempdir().unwrap();
        let (mut daemon, _, signal) = daemon(dir.path());
        let rx = signal.subscribe();
        daemon.observe("x".into());
        daemon.observe("y".into());
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn write_failure_still_completes_capture() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ClipStore::open(dir.path().join("missing").join("clips.json")));
        let signal = RefreshSignal::new();
        let rx = signal.subscribe();
        let mut daemon = ClipDaemon::new(ScriptedSource::new(&[]), store, signal, 10);
        assert!(daemon.observe("lost".into()).is_some());
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn seeded_value_is_not_captured() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ClipStore::in_dir(dir.path()));
        let source = ScriptedSource::new(&["already there", "already there", "new"]);
        let mut daemon = ClipDaemon::new(source, store.clone(), RefreshSignal::new(), 10);
        daemon.seed();
        assert!(daemon.poll().is_none());
        assert_eq!(daemon.poll().unwrap().content, "new");
        assert!(daemon.poll().is_none());
        assert_eq!(store.history().len(), 1);
    }

    #[test]
    fn spawned_daemon_captures_until_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ClipStore::in_dir(dir.path()));
        let config = ClipboardConfig { poll_interval_ms: 1, ..ClipboardConfig::default() };
        let handle = spawn(
            || Ok(ScriptedSource::new(&["seed", "a", "a", "b"])),
            store.clone(),
            RefreshSignal::new(),
            &config,
        )
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while store.history().len() < 2 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        handle.stop();

        let contents: Vec<_> = store.history().into_iter().map(|c| c.content).collect();
        assert_eq!(contents, vec!["b", "a"]);
    }

    #[test]
    fn source_init_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let result = spawn(
            || -> Result<ScriptedSource> { anyhow::bail!("no display") },
            Arc::new(ClipStore::in_dir(dir.path())),
            RefreshSignal::new(),
            &ClipboardConfig::default(),
        );
        let err = result.err().unwrap();
        assert!(err.to_string().contains("no display"));
    }
}
