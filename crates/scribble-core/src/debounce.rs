//! Cancellable trailing-edge debouncer.
//!
//! The debouncer owns no timer thread. Callers arm it with the current time
//! and poll it from their frame or tick loop; it fires once after `delay`
//! has passed without another `arm`.

use std::time::{Duration, Instant};

/// Quiescence period before a rich note edit is committed.
pub const RICH_NOTE_DEBOUNCE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, deadline: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)start the countdown. Any earlier deadline is replaced.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Drop the pending deadline without firing.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns true exactly once when the deadline has passed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once_after_delay() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(100));
        d.arm(t0);
        assert!(!d.poll(t0 + Duration::from_millis(99)));
        assert!(d.poll(t0 + Duration::from_millis(100)));
        assert!(!d.poll(t0 + Duration::from_millis(500)));
    }

    #[test]
    fn test_rearm_pushes_deadline() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(RICH_NOTE_DEBOUNCE);
        d.arm(t0);
        d.arm(t0 + Duration::from_millis(800));
        assert!(!d.poll(t0 + Duration::from_millis(1500)));
        assert!(d.poll(t0 + Duration::from_millis(1800)));
    }

    #[test]
    fn test_cancel() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(10));
        d.arm(t0);
        d.cancel();
        assert!(!d.is_pending());
        assert!(!d.poll(t0 + Duration::from_secs(1)));
    }
}
