//! Change signal coalescing.
//!
//! Collapses bursts of raw filesystem events into a single pending change
//! signal. The signal carries no payload, so a single armed deadline is all
//! the state needed: every recorded event re-arms it, and the signal becomes
//! ready once the window elapses without further events.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Thread-safe signal coalescer.
///
/// `record` can be called from the notify callback thread while `take_ready`
/// is polled from an async task.
pub(crate) struct ChangeCoalescer {
    deadline: Mutex<Option<Instant>>,
    window: Duration,
}

impl ChangeCoalescer {
    /// Create a new coalescer with the specified window.
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            deadline: Mutex::new(None),
            window,
        }
    }

    /// Record a raw event, arming or extending the pending deadline.
    pub(crate) fn record(&self) {
        let mut deadline = self.deadline.lock().unwrap();
        *deadline = Some(Instant::now() + self.window);
    }

    /// Take the pending signal if its window has elapsed.
    ///
    /// Returns `true` at most once per armed window; the pending state is
    /// cleared on take so rapid successive events yield a single signal.
    pub(crate) fn take_ready(&self) -> bool {
        let mut deadline = self.deadline.lock().unwrap();
        match *deadline {
            Some(at) if at <= Instant::now() => {
                *deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_not_ready_before_window_elapses() {
        let coalescer = ChangeCoalescer::new(Duration::from_millis(50));

        coalescer.record();

        assert!(!coalescer.take_ready());
    }

    #[test]
    fn test_single_signal_after_window() {
        let coalescer = ChangeCoalescer::new(Duration::from_millis(10));

        coalescer.record();
        thread::sleep(Duration::from_millis(15));

        assert!(coalescer.take_ready());
        // Cleared on take
        assert!(!coalescer.take_ready());
    }

    #[test]
    fn test_burst_of_events_coalesces_to_one_signal() {
        let coalescer = ChangeCoalescer::new(Duration::from_millis(10));

        for _ in 0..100 {
            coalescer.record();
        }
        thread::sleep(Duration::from_millis(15));

        assert!(coalescer.take_ready());
        assert!(!coalescer.take_ready());
    }

    #[test]
    fn test_new_event_rearms_window() {
        let coalescer = ChangeCoalescer::new(Duration::from_millis(30));

        coalescer.record();
        thread::sleep(Duration::from_millis(15));
        coalescer.record();

        // First deadline would have been close, but the second record pushed
        // it out by a full window.
        thread::sleep(Duration::from_millis(20));
        assert!(!coalescer.take_ready());

        thread::sleep(Duration::from_millis(15));
        assert!(coalescer.take_ready());
    }

    #[test]
    fn test_idle_coalescer_has_nothing_ready() {
        let coalescer = ChangeCoalescer::new(Duration::from_millis(10));

        assert!(!coalescer.take_ready());
    }
}
