use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use tokio::sync::Notify;

/// Single-producer-many-consumer latch used to cut short the tree driver's
/// sleep between ticks.
///
/// Any thread may raise the signal; the driver consumes it with
/// [`WakeUpSignal::wait_for`]. A raised flag backs the notification so a
/// signal emitted while nobody is waiting is not lost.
#[derive(Debug, Default)]
pub struct WakeUpSignal {
    ready: AtomicBool,
    notify: Notify,
}

impl WakeUpSignal {
    pub fn new() -> WakeUpSignal {
        Self::default()
    }

    /// Raise the signal. Callable from any thread, including timer and
    /// worker threads.
    pub fn emit_signal(&self) {
        self.ready.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Wait until the signal is raised or `timeout` elapses. Returns `true`
    /// if the signal was consumed. A zero timeout polls.
    pub async fn wait_for(&self, timeout: Duration) -> bool {
        if self.ready.swap(false, Ordering::SeqCst) {
            return true;
        }
        if timeout.is_zero() {
            return false;
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, self.notify.notified()).await {
                Ok(()) => {
                    // The flag is the source of truth; a stale permit from an
                    // already-consumed signal keeps us waiting
                    if self.ready.swap(false, Ordering::SeqCst) {
                        return true;
                    }
                }
                Err(_) => return self.ready.swap(false, Ordering::SeqCst),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn signal_before_wait_is_consumed() {
        let signal = WakeUpSignal::new();
        signal.emit_signal();
        assert!(signal.wait_for(Duration::ZERO).await);
        // consumed: a second wait times out
        assert!(!signal.wait_for(Duration::from_millis(5)).await);
    }

    #[tokio::test]
    async fn signal_from_another_thread_interrupts_wait() {
        let signal = Arc::new(WakeUpSignal::new());
        let emitter = Arc::clone(&signal);

        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            emitter.emit_signal();
        });

        assert!(signal.wait_for(Duration::from_secs(2)).await);
        handle.join().unwrap();
    }
}
