use std::time::Duration;

/// Fixed-interval pacing with back-off on provider throttling.
///
/// The delay never drops below the base interval, so a run of `n` sends
/// always takes at least `(n - 1) * base`.
#[derive(Debug, Clone)]
pub struct Pacer {
    base: Duration,
    current: Duration,
    max: Duration,
}

impl Pacer {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            current: base,
            max: max.max(base),
        }
    }

    /// Delay to wait before the next send.
    pub fn delay(&self) -> Duration {
        self.current
    }

    /// Doubles the delay after a throttled send, resets it otherwise.
    pub fn observe(&mut self, throttled: bool) {
        if throttled {
            self.current = self.current.saturating_mul(2).min(self.max);
            log::warn!(
                "Provider throttled sending, pacing at {}ms",
                self.current.as_millis()
            );
        } else {
            self.current = self.base;
        }
    }
}
