use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use tokio::sync::mpsc;

use study_core::Clock;
use study_core::model::{
    RoundSummary, SessionConfig, SessionId, SessionSnapshot, SessionSnapshotParts, UserId,
};

use super::clock::SessionClock;
use super::machine::{
    Effect, FinalTally, QuestionInstance, SessionContent, SessionEvent, SessionMachine,
    SessionState, Transition,
};
use super::options::OptionSet;
use super::persistence::{PersistenceGateway, PersistenceStatus, SessionResult};
use super::progress::SessionProgress;
use super::timer::{QuestionTimer, TimerExpired};
use crate::error::SessionError;

struct TimerSlot {
    timer: QuestionTimer,
    events: mpsc::UnboundedReceiver<TimerExpired>,
}

/// Drives one study session: feeds events to the state machine and runs the
/// effects it asks for (question timer, session clock, persistence).
///
/// Persistence runs at most once per controller.
pub struct SessionController {
    session_id: SessionId,
    user_id: UserId,
    wall_clock: Clock,
    started_at: DateTime<Utc>,
    machine: SessionMachine<StdRng>,
    session_clock: SessionClock,
    timer: Option<TimerSlot>,
    gateway: PersistenceGateway,
    committed: bool,
}

impl SessionController {
    pub(crate) fn new(
        user_id: UserId,
        wall_clock: Clock,
        gateway: PersistenceGateway,
        rng: StdRng,
    ) -> Self {
        Self {
            session_id: SessionId::generate(),
            user_id,
            wall_clock,
            started_at: wall_clock.now(),
            machine: SessionMachine::new(rng),
            session_clock: SessionClock::start(),
            timer: None,
            gateway,
            committed: false,
        }
    }

    pub(crate) async fn finish_loading(
        &mut self,
        loaded: Result<SessionContent, SessionError>,
    ) -> Transition {
        match loaded {
            Ok(content) => {
                if content.config.timed() {
                    let limit = Duration::from_secs(u64::from(content.config.question_seconds()));
                    let (timer, events) = QuestionTimer::new(limit);
                    self.timer = Some(TimerSlot { timer, events });
                }
                self.dispatch(SessionEvent::Loaded(content)).await
            }
            Err(err) => {
                tracing::warn!(session_id = %self.session_id, error = %err, "session failed to load");
                self.dispatch(SessionEvent::LoadFailed(err)).await
            }
        }
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn config(&self) -> Option<&SessionConfig> {
        self.machine.config()
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        self.machine.state()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&QuestionInstance> {
        self.machine.current_question()
    }

    /// Options of the current question; stable for the question's lifetime.
    pub fn current_options(&mut self) -> Option<OptionSet> {
        self.machine.current_options()
    }

    #[must_use]
    pub fn round_summaries(&self) -> &[RoundSummary] {
        self.machine.rounds()
    }

    /// The fatal failure, once the session is in its error state.
    #[must_use]
    pub fn failure(&self) -> Option<&SessionError> {
        match self.machine.state() {
            SessionState::Error(err) => Some(err),
            _ => None,
        }
    }

    #[must_use]
    pub fn result(&self) -> Option<&SessionResult> {
        match self.machine.state() {
            SessionState::Complete(result) => Some(result),
            _ => None,
        }
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> u64 {
        self.session_clock.elapsed_secs()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let mut progress = self.machine.progress();
        progress.remaining_secs = self
            .timer
            .as_ref()
            .filter(|slot| slot.timer.is_running())
            .and_then(|slot| slot.timer.remaining())
            .map(|left| left.as_secs());
        progress
    }

    pub async fn select_answer(&mut self, option_index: usize) -> Transition {
        self.dispatch(SessionEvent::AnswerSelected { option_index })
            .await
    }

    pub async fn timer_expired(&mut self, expired: TimerExpired) -> Transition {
        self.dispatch(SessionEvent::TimerExpired {
            question_seq: expired.question_seq,
        })
        .await
    }

    pub async fn advance(&mut self) -> Transition {
        self.dispatch(SessionEvent::Advance).await
    }

    pub async fn acknowledge_round(&mut self) -> Transition {
        self.dispatch(SessionEvent::AcknowledgeRound).await
    }

    pub async fn end_session(&mut self) -> Transition {
        self.dispatch(SessionEvent::EndSession).await
    }

    pub async fn abandon(&mut self) -> Transition {
        self.dispatch(SessionEvent::Abandon).await
    }

    /// Waits for the next question-timer expiry. Never resolves for untimed
    /// sessions.
    pub async fn next_timer_event(&mut self) -> Option<TimerExpired> {
        match self.timer.as_mut() {
            Some(slot) => slot.events.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Apply one event and run the effects of the resulting transition.
    pub async fn dispatch(&mut self, event: SessionEvent) -> Transition {
        let from = self.machine.state().name();
        let name = event.name();
        let transition = self.machine.apply(event);

        let effects = match &transition {
            Transition::Applied(effects) => effects.clone(),
            Transition::Ignored => {
                tracing::debug!(session_id = %self.session_id, event = name, state = from, "event ignored");
                return transition;
            }
        };
        tracing::debug!(
            session_id = %self.session_id,
            event = name,
            from,
            to = self.machine.state().name(),
            "session transition"
        );

        for effect in effects {
            if let Some(follow_up) = self.run_effect(effect).await {
                let _ = self.machine.apply(follow_up);
            }
        }
        transition
    }

    async fn run_effect(&mut self, effect: Effect) -> Option<SessionEvent> {
        match effect {
            Effect::StartTimer { question_seq } => {
                if let Some(slot) = self.timer.as_mut() {
                    slot.timer.start(question_seq);
                }
                None
            }
            Effect::StopTimer => {
                if let Some(slot) = self.timer.as_mut() {
                    slot.timer.stop();
                }
                None
            }
            Effect::StopClock => {
                self.session_clock.stop();
                None
            }
            Effect::RoundCompleted(summary) => {
                tracing::info!(
                    session_id = %self.session_id,
                    round = summary.round_index,
                    correct = summary.correct,
                    incorrect = summary.incorrect,
                    "round complete"
                );
                None
            }
            Effect::Finalize { tally, persist } => self.finalize(tally, persist).await,
        }
    }

    async fn finalize(&mut self, tally: FinalTally, persist: bool) -> Option<SessionEvent> {
        if self.committed {
            tracing::warn!(session_id = %self.session_id, "session already finalized");
            return None;
        }
        let Some(config) = self.machine.config().copied() else {
            tracing::error!(session_id = %self.session_id, "finalizing a session that never loaded");
            return None;
        };
        self.committed = true;

        let snapshot = SessionSnapshot::new(SessionSnapshotParts {
            session_id: self.session_id,
            user_id: self.user_id,
            deck_id: config.deck_id(),
            mode: config.mode(),
            started_at: self.started_at,
            completed_at: self.wall_clock.now(),
            elapsed_secs: self.session_clock.stop(),
            answered: tally.answered,
            rounds: tally.rounds,
            prior_mastery: tally.prior_mastery,
            ended_early: tally.ended_early,
        });

        let persistence = if persist {
            self.gateway.commit(&snapshot).await
        } else {
            PersistenceStatus::Skipped
        };
        tracing::info!(
            session_id = %self.session_id,
            correct = snapshot.correct(),
            incorrect = snapshot.incorrect(),
            delta = snapshot.mastery().delta(),
            ended_early = snapshot.ended_early(),
            saved = persistence.is_saved(),
            "session finished"
        );
        Some(SessionEvent::Persisted(SessionResult {
            snapshot,
            persistence,
        }))
    }
}
