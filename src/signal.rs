use std::sync::mpsc::{Receiver, SyncSender, TrySendError, sync_channel};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// "Refresh needed" notifications for a single subscriber.
///
/// At most one marker is ever pending: posting while one is queued is a no-op, and posting
/// never blocks. Subscribing again replaces the previous subscriber.
#[derive(Clone, Default)]
pub struct RefreshSignal {
    slot: Arc<Mutex<Option<SyncSender<()>>>>,
}

impl RefreshSignal {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<SyncSender<()>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> Receiver<()> {
        let (tx, rx) = sync_channel(1);
        *self.slot() = Some(tx);
        rx
    }

    /// Returns whether a new marker was queued.
    pub fn notify(&self) -> bool {
        let mut slot = self.slot();
        let Some(tx) = slot.as_ref() else {
            return false;
        };
        match tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => false,
            Err(TrySendError::Disconnected(())) => {
                *slot = None;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn without_subscriber_nothing_is_queued() {
        assert!(!RefreshSignal::new().notify());
    }

    #[test]
    fn pending_marker_coalesces() {
        let signal = RefreshSignal::new();
        let rx = signal.subscribe();
        assert!(signal.notify());
        assert!(!signal.notify());
        assert!(!signal.notify());

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());

        assert!(signal.notify());
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn last_subscriber_wins() {
        let signal = RefreshSignal::new();
        let old = signal.subscribe();
        let new = signal.subscribe();
        assert!(signal.notify());
        assert!(old.try_recv().is_err());
        assert!(new.try_recv().is_ok());
    }

    #[test]
    fn dropped_subscriber_is_forgotten() {
        let signal = RefreshSignal::new();
        drop(signal.subscribe());
        assert!(!signal.notify());
        assert!(signal.slot().is_none());
    }
}
