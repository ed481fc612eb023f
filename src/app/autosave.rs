use std::time::{Duration, Instant};

/// Identifies one scheduled run of a [`DeferredTask`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) struct TaskHandle(u64);

struct Pending<T> {
    handle: TaskHandle,
    fire_at: Instant,
    payload: T,
}

/// At most one pending run; scheduling again replaces (cancels) the previous
/// one and restarts the quiet period. The owner polls it from its event loop.
pub(super) struct DeferredTask<T> {
    delay: Duration,
    pending: Option<Pending<T>>,
    generation: u64,
}

impl<T> DeferredTask<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            generation: 0,
        }
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    pub fn schedule(&mut self, now: Instant, payload: T) -> TaskHandle {
        self.generation += 1;
        let handle = TaskHandle(self.generation);
        self.pending = Some(Pending {
            handle,
            fire_at: now + self.delay,
            payload,
        });
        handle
    }

    /// Cancels the run behind `handle` if it is still the pending one.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        if self.pending.as_ref().is_some_and(|p| p.handle == handle) {
            self.pending = None;
            return true;
        }
        false
    }

    pub fn cancel_all(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Returns the payload once its quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        if self.pending.as_ref().is_some_and(|p| p.fire_at <= now) {
            return self.pending.take().map(|p| p.payload);
        }
        None
    }

    /// Fires the pending run immediately, regardless of its deadline.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.payload)
    }

    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.pending
            .as_ref()
            .map(|p| p.fire_at.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(500);

    #[test]
    fn fires_only_after_quiet_period() {
        let t0 = Instant::now();
        let mut task = DeferredTask::new(WINDOW);
        task.schedule(t0, "a");
        assert_eq!(task.poll(t0 + Duration::from_millis(499)), None);
        assert_eq!(task.poll(t0 + WINDOW), Some("a"));
        assert!(!task.is_pending());
        assert_eq!(task.poll(t0 + WINDOW * 4), None);
    }

    #[test]
    fn rescheduling_keeps_only_the_last_payload() {
        let t0 = Instant::now();
        let mut task = DeferredTask::new(WINDOW);
        task.schedule(t0, 1);
        task.schedule(t0 + Duration::from_millis(300), 2);
        assert_eq!(task.poll(t0 + Duration::from_millis(600)), None);
        assert_eq!(task.poll(t0 + Duration::from_millis(800)), Some(2));
    }

    #[test]
    fn stale_handle_does_not_cancel_newer_run() {
        let t0 = Instant::now();
        let mut task = DeferredTask::new(WINDOW);
        let first = task.schedule(t0, 1);
        let second = task.schedule(t0, 2);
        assert!(!task.cancel(first));
        assert!(task.is_pending());
        assert!(task.cancel(second));
        assert_eq!(task.poll(t0 + WINDOW), None);
    }

    #[test]
    fn flush_bypasses_deadline() {
        let t0 = Instant::now();
        let mut task = DeferredTask::new(WINDOW);
        task.schedule(t0, "now");
        assert_eq!(task.time_until_due(t0), Some(WINDOW));
        assert_eq!(task.flush(), Some("now"));
        assert_eq!(task.flush(), None);
        assert_eq!(task.time_until_due(t0), None);
    }
}
