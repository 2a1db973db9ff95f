use std::time::{Duration, Instant};

/// Trailing-edge debouncer owning a single pending deadline.
///
/// Each `schedule` replaces the pending deadline; nothing is queued. The
/// caller supplies the clock so the debouncer works with any event loop.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true, once, when the pending deadline has been reached.
    pub fn fire(&mut self, now: Instant) -> bool {
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

    const DELAY: Duration = Duration::from_millis(300);

    #[test]
    fn burst_collapses_into_one_trailing_fire() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        for step in 0..5 {
            let now = start + Duration::from_millis(step * 100);
            debouncer.schedule(now);
            assert!(!debouncer.fire(now));
        }

        let last = start + Duration::from_millis(400);
        assert!(!debouncer.fire(last + Duration::from_millis(299)));
        assert!(debouncer.fire(last + DELAY));
        assert!(!debouncer.fire(last + DELAY * 2));
    }

    #[test]
    fn cancel_drops_pending_deadline() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.schedule(start);
        assert!(debouncer.is_pending());
        debouncer.cancel();
        assert!(!debouncer.fire(start + DELAY));
        assert_eq!(debouncer.deadline(), None);
    }
}
