use tokio::time::Instant;

/// Monotonic millisecond clock shared by the buffer and the flush timer.
///
/// Built on `tokio::time::Instant` so tests running under paused time see
/// the virtual clock.
#[derive(Debug, Clone)]
pub struct Clock {
    origin: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Milliseconds elapsed since the clock was created.
    pub fn now_millis(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
