//! Session lifecycle as a single transition function.
//!
//! `SessionMachine::apply` takes one event, moves the tagged `SessionState`
//! and returns the side effects the caller must run (timers, clock,
//! persistence). Events a state does not accept are ignored without touching
//! the state or the tallies.

use rand::Rng;
use rand::rngs::StdRng;

use study_core::mastery::MasteryPercent;
use study_core::model::{
    AdaptiveQuestion, AnsweredRecord, Flashcard, FlashcardId, RoundSummary, SessionConfig,
    SessionTally, validate_questions,
};

use super::options::{OPTION_COUNT, OptionGenerator, OptionSet, distinct_answers};
use super::persistence::SessionResult;
use super::progress::SessionProgress;
use super::rounds::{RoundPlan, RoundSampler};
use crate::error::{ContentError, SessionError};

//
// ─── CONTENT ───────────────────────────────────────────────────────────────────
//

/// Questions a session draws from, fixed once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionSource {
    Flashcards(Vec<Flashcard>),
    Adaptive(Vec<AdaptiveQuestion>),
}

impl QuestionSource {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Flashcards(cards) => cards.len(),
            Self::Adaptive(questions) => questions.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything the loading phase produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContent {
    pub config: SessionConfig,
    pub source: QuestionSource,
    pub prior_mastery: MasteryPercent,
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// The question on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionInstance {
    /// Session-wide sequence number; timer expiries carry it.
    pub seq: u64,
    pub round_index: u32,
    /// 0-based position inside the round.
    pub position: usize,
    pub round_len: usize,
    pub flashcard_id: FlashcardId,
    pub prompt: String,
    pub options: OptionSet,
    pub revealed: bool,
    source_index: usize,
}

/// How the revealed question was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerOutcome {
    /// `None` when the timer ran out.
    pub selected: Option<usize>,
    pub correct: bool,
    pub correct_index: Option<usize>,
}

impl AnswerOutcome {
    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.selected.is_none()
    }
}

/// Counts frozen when a session enters finalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalTally {
    pub rounds: Vec<RoundSummary>,
    pub answered: AnsweredRecord,
    pub prior_mastery: MasteryPercent,
    pub ended_early: bool,
}

impl FinalTally {
    #[must_use]
    pub fn questions_answered(&self) -> u32 {
        self.rounds.iter().map(RoundSummary::answered).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    Active(QuestionInstance),
    AnswerRevealed {
        question: QuestionInstance,
        outcome: AnswerOutcome,
    },
    RoundComplete(RoundSummary),
    Finalizing(FinalTally),
    Complete(SessionResult),
    Error(SessionError),
}

impl SessionState {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Active(_) => "active",
            Self::AnswerRevealed { .. } => "answer_revealed",
            Self::RoundComplete(_) => "round_complete",
            Self::Finalizing(_) => "finalizing",
            Self::Complete(_) => "complete",
            Self::Error(_) => "error",
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Error(_))
    }
}

//
// ─── EVENTS & EFFECTS ──────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Loaded(SessionContent),
    LoadFailed(SessionError),
    AnswerSelected { option_index: usize },
    TimerExpired { question_seq: u64 },
    Advance,
    AcknowledgeRound,
    EndSession,
    Abandon,
    Persisted(SessionResult),
}

impl SessionEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Loaded(_) => "loaded",
            Self::LoadFailed(_) => "load_failed",
            Self::AnswerSelected { .. } => "answer_selected",
            Self::TimerExpired { .. } => "timer_expired",
            Self::Advance => "advance",
            Self::AcknowledgeRound => "acknowledge_round",
            Self::EndSession => "end_session",
            Self::Abandon => "abandon",
            Self::Persisted(_) => "persisted",
        }
    }
}

/// Side effects requested by a transition, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartTimer { question_seq: u64 },
    StopTimer,
    StopClock,
    RoundCompleted(RoundSummary),
    /// Build the snapshot and, when `persist` is set, hand it to persistence.
    Finalize { tally: FinalTally, persist: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Transition {
    Applied(Vec<Effect>),
    Ignored,
}

impl Transition {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    #[must_use]
    pub fn effects(&self) -> &[Effect] {
        match self {
            Self::Applied(effects) => effects,
            Self::Ignored => &[],
        }
    }
}

//
// ─── MACHINE ───────────────────────────────────────────────────────────────────
//

#[derive(Debug)]
struct Loaded {
    config: SessionConfig,
    source: QuestionSource,
    sampler: Option<RoundSampler>,
    prior_mastery: MasteryPercent,
}

/// Pure session state machine; randomness comes from the injected `rng`.
#[derive(Debug)]
pub struct SessionMachine<R = StdRng> {
    rng: R,
    state: SessionState,
    loaded: Option<Loaded>,
    plan: Option<RoundPlan>,
    options: OptionGenerator,
    tally: SessionTally,
    answered: AnsweredRecord,
    rounds: Vec<RoundSummary>,
    next_seq: u64,
}

type Step = (SessionState, Transition);

impl<R: Rng> SessionMachine<R> {
    #[must_use]
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            state: SessionState::Loading,
            loaded: None,
            plan: None,
            options: OptionGenerator::new(),
            tally: SessionTally::new(),
            answered: AnsweredRecord::new(),
            rounds: Vec::new(),
            next_seq: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn config(&self) -> Option<&SessionConfig> {
        self.loaded.as_ref().map(|loaded| &loaded.config)
    }

    #[must_use]
    pub fn tally(&self) -> SessionTally {
        self.tally
    }

    #[must_use]
    pub fn answered(&self) -> &AnsweredRecord {
        &self.answered
    }

    /// Summaries of every round folded so far.
    #[must_use]
    pub fn rounds(&self) -> &[RoundSummary] {
        &self.rounds
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&QuestionInstance> {
        match &self.state {
            SessionState::Active(question) | SessionState::AnswerRevealed { question, .. } => {
                Some(question)
            }
            _ => None,
        }
    }

    /// Option set of the current question. Asking repeatedly returns the
    /// frozen set.
    pub fn current_options(&mut self) -> Option<OptionSet> {
        let (seq, source_index) = match &self.state {
            SessionState::Active(q) | SessionState::AnswerRevealed { question: q, .. } => {
                (q.seq, q.source_index)
            }
            _ => return None,
        };
        let loaded = self.loaded.as_ref()?;
        Some(match &loaded.source {
            QuestionSource::Flashcards(cards) => {
                self.options
                    .flashcard_options(seq, source_index, cards, &mut self.rng)
            }
            QuestionSource::Adaptive(questions) => {
                self.options.adaptive_options(seq, questions.get(source_index)?)
            }
        })
    }

    #[must_use]
    pub fn total_rounds(&self) -> u32 {
        self.loaded
            .as_ref()
            .map_or(0, |loaded| loaded.config.rounds().get())
    }

    #[must_use]
    pub fn questions_per_round(&self) -> usize {
        match &self.loaded {
            Some(Loaded {
                sampler: Some(sampler),
                ..
            }) => sampler.questions_per_round(),
            Some(loaded) => loaded.source.len(),
            None => 0,
        }
    }

    /// Fixed when the session loads.
    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions_per_round() * self.total_rounds() as usize
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let (round_index, question_in_round) = match &self.state {
            SessionState::Active(q) | SessionState::AnswerRevealed { question: q, .. } => {
                (q.round_index, q.position + 1)
            }
            SessionState::RoundComplete(summary) => (summary.round_index, 0),
            _ => (self.plan.as_ref().map_or(0, RoundPlan::round_index), 0),
        };
        SessionProgress {
            state: self.state.name(),
            round_index,
            total_rounds: self.total_rounds(),
            question_in_round,
            questions_per_round: self.questions_per_round(),
            total_questions: self.total_questions(),
            questions_answered: self.tally.answered(),
            correct: self.tally.session_correct(),
            incorrect: self.tally.session_incorrect(),
            remaining_secs: None,
        }
    }

    /// Feed one event through the machine.
    pub fn apply(&mut self, event: SessionEvent) -> Transition {
        let state = std::mem::replace(&mut self.state, SessionState::Loading);
        let (next, transition) = self.step(state, event);
        self.state = next;
        transition
    }

    fn step(&mut self, state: SessionState, event: SessionEvent) -> Step {
        use SessionEvent as E;
        use SessionState as S;

        match (state, event) {
            (S::Loading, E::Loaded(content)) => self.on_loaded(content),
            (S::Loading, E::LoadFailed(err)) => (S::Error(err), Transition::Applied(Vec::new())),
            (S::Active(question), E::AnswerSelected { option_index }) => {
                match question.options.is_correct(option_index) {
                    Some(correct) => self.reveal(question, Some(option_index), correct),
                    None => (S::Active(question), Transition::Ignored),
                }
            }
            (S::Active(question), E::TimerExpired { question_seq })
                if question_seq == question.seq =>
            {
                self.reveal(question, None, false)
            }
            (S::AnswerRevealed { question, .. }, E::Advance) => self.advance(&question),
            (S::RoundComplete(summary), E::AcknowledgeRound) => {
                self.start_round(summary.round_index + 1)
            }
            (S::Active(_) | S::AnswerRevealed { .. } | S::RoundComplete(_), E::EndSession) => {
                self.finalize(Vec::new(), true, true)
            }
            (S::Active(_) | S::AnswerRevealed { .. } | S::RoundComplete(_), E::Abandon) => {
                let persist = self.tally.answered() > 0;
                self.finalize(Vec::new(), true, persist)
            }
            (S::Finalizing(_), E::Persisted(result)) => {
                (S::Complete(result), Transition::Applied(Vec::new()))
            }
            (state, _) => (state, Transition::Ignored),
        }
    }

    fn on_loaded(&mut self, content: SessionContent) -> Step {
        let sampler = match &content.source {
            QuestionSource::Flashcards(cards) => {
                let sampler = match RoundSampler::new(cards.len(), content.config.rounds()) {
                    Ok(sampler) => sampler,
                    Err(err) => return fail(err.into()),
                };
                let found = distinct_answers(cards);
                if found < OPTION_COUNT {
                    return fail(
                        ContentError::TooFewDistinctAnswers {
                            found,
                            required: OPTION_COUNT,
                        }
                        .into(),
                    );
                }
                Some(sampler)
            }
            QuestionSource::Adaptive(questions) => {
                if let Err(err) = validate_questions(questions) {
                    return fail(ContentError::from(err).into());
                }
                None
            }
        };
        self.loaded = Some(Loaded {
            config: content.config,
            source: content.source,
            sampler,
            prior_mastery: content.prior_mastery,
        });
        self.start_round(1)
    }

    fn start_round(&mut self, round_index: u32) -> Step {
        let plan = match &self.loaded {
            Some(Loaded {
                sampler: Some(sampler),
                ..
            }) => sampler.draw(round_index, &mut self.rng),
            Some(loaded) => RoundPlan::sequential(round_index, loaded.source.len()),
            None => {
                return fail(ContentError::SourceUnavailable("no content loaded".into()).into());
            }
        };
        self.plan = Some(plan);
        self.ask(0, Vec::new())
    }

    fn ask(&mut self, position: usize, mut effects: Vec<Effect>) -> Step {
        let Some(question) = self.build_question(position) else {
            tracing::error!(position, "round plan points past the loaded content");
            let persist = self.tally.answered() > 0;
            return self.finalize(effects, true, persist);
        };
        let timed = self.loaded.as_ref().is_some_and(|l| l.config.timed());
        if timed {
            effects.push(Effect::StartTimer {
                question_seq: question.seq,
            });
        }
        (SessionState::Active(question), Transition::Applied(effects))
    }

    fn build_question(&mut self, position: usize) -> Option<QuestionInstance> {
        let plan = self.plan.as_ref()?;
        let loaded = self.loaded.as_ref()?;
        let source_index = plan.get(position)?;
        let seq = self.next_seq + 1;

        let (flashcard_id, prompt, options) = match &loaded.source {
            QuestionSource::Flashcards(cards) => {
                let card = cards.get(source_index)?;
                let options =
                    self.options
                        .flashcard_options(seq, source_index, cards, &mut self.rng);
                (card.id(), card.prompt().to_owned(), options)
            }
            QuestionSource::Adaptive(questions) => {
                let question = questions.get(source_index)?;
                let options = self.options.adaptive_options(seq, question);
                (
                    question.original_flashcard_id,
                    question.question.trim().to_owned(),
                    options,
                )
            }
        };

        self.next_seq = seq;
        Some(QuestionInstance {
            seq,
            round_index: plan.round_index(),
            position,
            round_len: plan.len(),
            flashcard_id,
            prompt,
            options,
            revealed: false,
            source_index,
        })
    }

    fn reveal(
        &mut self,
        mut question: QuestionInstance,
        selected: Option<usize>,
        correct: bool,
    ) -> Step {
        self.tally.record(correct);
        self.answered.record(question.flashcard_id, correct);
        question.revealed = true;
        let outcome = AnswerOutcome {
            selected,
            correct,
            correct_index: question.options.correct_index(),
        };
        (
            SessionState::AnswerRevealed { question, outcome },
            Transition::Applied(vec![Effect::StopTimer]),
        )
    }

    fn advance(&mut self, question: &QuestionInstance) -> Step {
        let next = question.position + 1;
        if next < question.round_len {
            return self.ask(next, Vec::new());
        }

        let summary = self.tally.fold_round(question.round_index);
        self.rounds.push(summary);
        let effects = vec![Effect::RoundCompleted(summary)];
        if question.round_index < self.total_rounds() {
            (
                SessionState::RoundComplete(summary),
                Transition::Applied(effects),
            )
        } else {
            self.finalize(effects, false, true)
        }
    }

    fn finalize(&mut self, mut effects: Vec<Effect>, ended_early: bool, persist: bool) -> Step {
        if self.tally.round_correct() + self.tally.round_incorrect() > 0 {
            let round_index = self.plan.as_ref().map_or(1, RoundPlan::round_index);
            let summary = self.tally.fold_round(round_index);
            self.rounds.push(summary);
        }
        let tally = FinalTally {
            rounds: self.rounds.clone(),
            answered: self.answered.clone(),
            prior_mastery: self
                .loaded
                .as_ref()
                .map(|loaded| loaded.prior_mastery)
                .unwrap_or_default(),
            ended_early,
        };
        effects.extend([
            Effect::StopTimer,
            Effect::StopClock,
            Effect::Finalize {
                tally: tally.clone(),
                persist,
            },
        ]);
        (SessionState::Finalizing(tally), Transition::Applied(effects))
    }
}

fn fail(err: SessionError) -> Step {
    (SessionState::Error(err), Transition::Applied(Vec::new()))
}
