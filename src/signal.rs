//! Cross-context signals
//!
//! [`SpeakingSignal`] is the only state shared between the speech worker and
//! the animation driver. It is created per reply and split into a writer half
//! (moved into the worker) and a reader half (kept by the driver), so each
//! side can only do its own job. [`QuitSignal`] carries the process-wide
//! interrupt.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use tokio::sync::Notify;

const PENDING: u8 = 0;
const SPEAKING: u8 = 1;
const FINISHED: u8 = 2;

/// Where the worker is in its reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechPhase {
    /// Worker has not started synthesis yet
    Pending,
    /// Synthesis in progress
    Speaking,
    /// Synthesis returned (successfully or not)
    Finished,
}

/// Per-reply speaking flag
pub struct SpeakingSignal;

impl SpeakingSignal {
    /// Create a fresh signal in the pending phase
    #[must_use]
    pub fn pair() -> (SignalWriter, SignalReader) {
        let state = Arc::new(AtomicU8::new(PENDING));
        (
            SignalWriter {
                state: Arc::clone(&state),
            },
            SignalReader { state },
        )
    }
}

/// Writer half, owned by the speech worker
///
/// Dropping the writer lowers the flag, so a failed or panicking synthesis
/// still releases the animation loop.
pub struct SignalWriter {
    state: Arc<AtomicU8>,
}

impl SignalWriter {
    /// Raise the flag (pending → speaking)
    ///
    /// The phase only moves forward, so this is a no-op once finished.
    pub fn begin(&self) {
        self.state.fetch_max(SPEAKING, Ordering::AcqRel);
    }

    /// Lower the flag (→ finished); later calls are no-ops
    pub fn finish(&self) {
        self.state.fetch_max(FINISHED, Ordering::AcqRel);
    }
}

impl Drop for SignalWriter {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Reader half, polled by the animation driver
pub struct SignalReader {
    state: Arc<AtomicU8>,
}

impl SignalReader {
    #[must_use]
    pub fn phase(&self) -> SpeechPhase {
        match self.state.load(Ordering::Acquire) {
            PENDING => SpeechPhase::Pending,
            SPEAKING => SpeechPhase::Speaking,
            _ => SpeechPhase::Finished,
        }
    }

    /// The boolean view: true only while synthesis runs
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.phase() == SpeechPhase::Speaking
    }
}

/// Process-wide quit request (terminal interrupt or display close)
#[derive(Clone, Default)]
pub struct QuitSignal {
    inner: Arc<QuitInner>,
}

#[derive(Default)]
struct QuitInner {
    raised: AtomicBool,
    notify: Notify,
}

impl QuitSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal on Ctrl-C
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn install() -> Self {
        let quit = Self::new();
        let handle = quit.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received");
                handle.raise();
            }
        });
        quit
    }

    pub fn raise(&self) {
        self.inner.raised.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.inner.raised.load(Ordering::Acquire)
    }

    /// Resolve once the signal is raised
    pub async fn raised(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_raised() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn phases_advance_in_order() {
        let (writer, reader) = SpeakingSignal::pair();
        assert_eq!(reader.phase(), SpeechPhase::Pending);
        assert!(!reader.is_speaking());

        writer.begin();
        assert!(reader.is_speaking());

        writer.finish();
        assert_eq!(reader.phase(), SpeechPhase::Finished);
        assert!(!reader.is_speaking());
    }

    #[test]
    fn finished_never_goes_back() {
        let (writer, reader) = SpeakingSignal::pair();
        writer.finish();
        writer.begin();
        assert_eq!(reader.phase(), SpeechPhase::Finished);

        writer.finish();
        assert_eq!(reader.phase(), SpeechPhase::Finished);
    }

    #[test]
    fn dropping_writer_finishes() {
        let (writer, reader) = SpeakingSignal::pair();
        writer.begin();
        drop(writer);
        assert_eq!(reader.phase(), SpeechPhase::Finished);
    }

    #[test]
    fn visible_across_threads() {
        let (writer, reader) = SpeakingSignal::pair();
        let worker = std::thread::spawn(move || {
            writer.begin();
            std::thread::sleep(Duration::from_millis(20));
        });

        worker.join().unwrap();
        assert_eq!(reader.phase(), SpeechPhase::Finished);
    }

    #[tokio::test]
    async fn quit_signal_wakes_waiters() {
        let quit = QuitSignal::new();
        let waiter = {
            let quit = quit.clone();
            tokio::spawn(async move { quit.raised().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!quit.is_raised());
        quit.raise();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(quit.is_raised());
    }

    #[tokio::test]
    async fn raised_returns_immediately_when_already_set() {
        let quit = QuitSignal::new();
        quit.raise();
        tokio::time::timeout(Duration::from_millis(100), quit.raised())
            .await
            .unwrap();
    }

    #[test]
    fn raised_pends_until_raise() {
        let quit = QuitSignal::new();
        let mut waiter = tokio_test::task::spawn(quit.raised());

        tokio_test::assert_pending!(waiter.poll());
        quit.raise();
        assert!(waiter.is_woken());
        tokio_test::assert_ready!(waiter.poll());
    }
}
