//! Best-effort "a job was created" wake-up.
//!
//! The channel is bounded; when it is full the signal is dropped, since any
//! pending signal already wakes the decomposition loop. Consumers must keep a
//! periodic poll as the correctness backstop.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

/// Default buffer, matching the number of uploads that can queue wake-ups.
pub const DEFAULT_NOTIFY_CAPACITY: usize = 100;

/// Sending half, cloned into every job writer.
#[derive(Debug, Clone)]
pub struct JobNotifier {
    tx: mpsc::Sender<()>,
}

/// Receiving half, owned by the decomposition loop.
#[derive(Debug)]
pub struct JobSignals {
    rx: mpsc::Receiver<()>,
}

pub fn job_channel(capacity: usize) -> (JobNotifier, JobSignals) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (JobNotifier { tx }, JobSignals { rx })
}

impl JobNotifier {
    /// Signal that new work may be available. Never blocks.
    ///
    /// Returns `false` when the signal was dropped (buffer full or receiver gone).
    pub fn notify(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                debug!("job notification buffer full, dropping signal");
                false
            }
            Err(TrySendError::Closed(())) => {
                debug!("job notification receiver closed");
                false
            }
        }
    }
}

impl JobSignals {
    /// Wait for the next signal. `None` once every notifier is dropped.
    pub async fn recv(&mut self) -> Option<()> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_full_buffer_drops_signal() {
        let (notifier, mut signals) = job_channel(2);
        assert!(notifier.notify());
        assert!(notifier.notify());
        assert!(!notifier.notify());
        drop(notifier);
        assert_eq!(signals.recv().await, Some(()));
        assert_eq!(signals.recv().await, Some(()));
        assert_eq!(signals.recv().await, None);
    }

    #[tokio::test]
    async fn test_recv_ends_when_notifiers_dropped() {
        let (notifier, mut signals) = job_channel(4);
        notifier.notify();
        drop(notifier);
        assert_eq!(signals.recv().await, Some(()));
        assert_eq!(signals.recv().await, None);
    }

    #[tokio::test]
    async fn test_notify_after_receiver_dropped_reports_drop() {
        let (notifier, signals) = job_channel(4);
        drop(signals);
        assert!(!notifier.notify());
    }
}
