//! Background thread running one subscriber's handler.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::envelope::Envelope;
use crate::error::HandlerError;

/// Statistics from one handler subscription.
#[derive(Debug, Default, Clone)]
pub struct HandlerStats {
    /// Number of envelopes handled to completion.
    pub messages_handled: usize,
    /// Number of envelopes whose handler returned an error or panicked.
    pub messages_failed: usize,
}

impl HandlerStats {
    /// Fold another subscription's stats into this one.
    pub fn merge(&mut self, other: &HandlerStats) {
        self.messages_handled += other.messages_handled;
        self.messages_failed += other.messages_failed;
    }
}

/// A background thread that runs a single subscriber's handler.
///
/// Follows the spawn / stop-signal / stats-at-stop shape of the worker
/// threads in this crate: envelopes arrive on a channel, a stop signal
/// triggers a drain of anything already delivered, and the final stats
/// are handed back over a completion channel so shutdown can honor a
/// deadline without an unbounded join.
pub(crate) struct HandlerThread {
    id: u64,
    stop_tx: Sender<()>,
    done_rx: Receiver<HandlerStats>,
}

impl HandlerThread {
    /// Spawn the handler thread; returns the thread handle and the
    /// channel the dispatcher delivers envelopes on.
    pub(crate) fn spawn<F>(
        id: u64,
        handler: F,
        poll_interval: Duration,
    ) -> (Self, Sender<Envelope>)
    where
        F: Fn(&Envelope) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let (envelope_tx, envelope_rx) = channel::<Envelope>();
        let (stop_tx, stop_rx) = channel::<()>();
        let (done_tx, done_rx) = channel::<HandlerStats>();

        thread::spawn(move || {
            let mut stats = HandlerStats::default();

            loop {
                match stop_rx.try_recv() {
                    Ok(()) | Err(TryRecvError::Disconnected) => {
                        // Drain envelopes already delivered before exiting.
                        while let Ok(envelope) = envelope_rx.try_recv() {
                            invoke(&handler, &envelope, id, &mut stats);
                        }
                        break;
                    }
                    Err(TryRecvError::Empty) => {}
                }

                match envelope_rx.recv_timeout(poll_interval) {
                    Ok(envelope) => invoke(&handler, &envelope, id, &mut stats),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            let _ = done_tx.send(stats);
        });

        (
            Self {
                id,
                stop_tx,
                done_rx,
            },
            envelope_tx,
        )
    }

    /// Registration id of the subscription this thread serves.
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Signal the thread to stop without waiting.
    pub(crate) fn signal_stop(&self) {
        let _ = self.stop_tx.send(());
    }

    /// Wait up to `timeout` for the thread to confirm shutdown.
    pub(crate) fn wait(&self, timeout: Duration) -> Option<HandlerStats> {
        self.done_rx.recv_timeout(timeout).ok()
    }
}

impl Drop for HandlerThread {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
    }
}

fn invoke<F>(handler: &F, envelope: &Envelope, id: u64, stats: &mut HandlerStats)
where
    F: Fn(&Envelope) -> Result<(), HandlerError> + Send + Sync,
{
    match catch_unwind(AssertUnwindSafe(|| handler(envelope))) {
        Ok(Ok(())) => stats.messages_handled += 1,
        Ok(Err(e)) => {
            warn!(
                subscription = id,
                topic = %envelope.topic,
                sequence = envelope.sequence,
                error = %e,
                "handler failed"
            );
            stats.messages_failed += 1;
        }
        Err(_) => {
            warn!(
                subscription = id,
                topic = %envelope.topic,
                sequence = envelope.sequence,
                "handler panicked"
            );
            stats.messages_failed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn handles_delivered_envelopes() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);

        let (thread, tx) = HandlerThread::spawn(
            1,
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            Duration::from_millis(5),
        );

        tx.send(Envelope::with_string_payload(1, "t", "a")).unwrap();
        tx.send(Envelope::with_string_payload(2, "t", "b")).unwrap();

        thread.signal_stop();
        let stats = thread.wait(Duration::from_secs(1)).unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(stats.messages_handled, 2);
        assert_eq!(stats.messages_failed, 0);
    }

    #[test]
    fn failure_and_panic_are_contained() {
        let (thread, tx) = HandlerThread::spawn(
            1,
            |envelope: &Envelope| {
                if envelope.sequence == 2 {
                    panic!("boom");
                }
                Err(HandlerError::Rejected("nope".into()))
            },
            Duration::from_millis(5),
        );

        tx.send(Envelope::with_string_payload(1, "t", "a")).unwrap();
        tx.send(Envelope::with_string_payload(2, "t", "b")).unwrap();
        tx.send(Envelope::with_string_payload(3, "t", "c")).unwrap();

        thread.signal_stop();
        let stats = thread.wait(Duration::from_secs(1)).unwrap();

        assert_eq!(stats.messages_handled, 0);
        assert_eq!(stats.messages_failed, 3);
    }
}
