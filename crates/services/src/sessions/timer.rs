use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Expiry notice for the question with the given sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerExpired {
    pub question_seq: u64,
}

struct Countdown {
    question_seq: u64,
    deadline: Instant,
    task: JoinHandle<()>,
}

/// Per-question countdown.
///
/// Each `start` spawns one sleeping task that posts a `TimerExpired` on the
/// channel handed out by `new`. Stopping or dropping the timer aborts the task,
/// so a cancelled countdown never posts.
pub struct QuestionTimer {
    limit: Duration,
    events: mpsc::UnboundedSender<TimerExpired>,
    running: Option<Countdown>,
}

impl QuestionTimer {
    #[must_use]
    pub fn new(limit: Duration) -> (Self, mpsc::UnboundedReceiver<TimerExpired>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (
            Self {
                limit,
                events,
                running: None,
            },
            receiver,
        )
    }

    /// Starts the countdown for `question_seq`.
    ///
    /// Returns `false` if that question's countdown is already running. A
    /// countdown left over from another question is replaced.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, question_seq: u64) -> bool {
        if let Some(countdown) = &self.running {
            if countdown.question_seq == question_seq && !countdown.task.is_finished() {
                return false;
            }
        }
        self.stop();

        let deadline = Instant::now() + self.limit;
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            // The receiver is gone once the session is torn down.
            let _ = events.send(TimerExpired { question_seq });
        });
        self.running = Some(Countdown {
            question_seq,
            deadline,
            task,
        });
        true
    }

    /// Cancels the running countdown, if any. Returns whether one was running.
    pub fn stop(&mut self) -> bool {
        match self.running.take() {
            Some(countdown) => {
                let was_running = !countdown.task.is_finished();
                countdown.task.abort();
                was_running
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|countdown| !countdown.task.is_finished())
    }

    /// Time left on the running countdown.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.running
            .as_ref()
            .map(|countdown| countdown.deadline.saturating_duration_since(Instant::now()))
    }
}

impl Drop for QuestionTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
