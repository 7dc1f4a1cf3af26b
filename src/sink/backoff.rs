use rand::Rng;

/// Full-jitter exponential backoff bounded by a min/max window.
///
/// Each step samples uniformly between `min` and three times the previous
/// wait, capped at `max`. Concurrent failing batches therefore spread their
/// retries instead of thundering back in lockstep.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    min_millis: u64,
    max_millis: u64,
}

impl Backoff {
    pub fn new(min_millis: u64, max_millis: u64) -> Self {
        Self {
            min_millis,
            max_millis,
        }
    }

    /// Seed value for the first `next` call.
    pub fn initial(&self) -> u64 {
        self.min_millis
    }

    /// `min(min + U(0,1) * (last * 3 - min), max)` in milliseconds.
    pub fn next(&self, last_millis: u64) -> u64 {
        let ceiling = last_millis.saturating_mul(3).saturating_sub(self.min_millis);
        let jitter: f64 = rand::rng().random_range(0.0..1.0);
        let raw = self.min_millis as f64 + jitter * ceiling as f64;
        (raw as u64).min(self.max_millis)
    }
}
