use std::time::Duration;

use tokio::time::Instant;

/// Free-running elapsed time of a session. Reporting only.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    started: Instant,
    stopped: Option<Instant>,
}

impl SessionClock {
    #[must_use]
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            stopped: None,
        }
    }

    /// Freezes the clock. Later calls keep the first stop time.
    pub fn stop(&mut self) -> u64 {
        if self.stopped.is_none() {
            self.stopped = Some(Instant::now());
        }
        self.elapsed_secs()
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        let end = self.stopped.unwrap_or_else(Instant::now);
        end.saturating_duration_since(self.started)
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn counts_whole_seconds_until_stopped() {
        let mut clock = SessionClock::start();
        tokio::time::sleep(Duration::from_millis(42_500)).await;
        assert_eq!(clock.elapsed_secs(), 42);

        assert_eq!(clock.stop(), 42);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(clock.stop(), 42);
        assert_eq!(clock.elapsed_secs(), 42);
    }
}
