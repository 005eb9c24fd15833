mod clock;
mod controller;
mod launcher;
mod machine;
mod options;
mod persistence;
mod progress;
mod rounds;
mod timer;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use clock::SessionClock;
pub use controller::SessionController;
pub use launcher::SessionLauncher;
pub use machine::{
    AnswerOutcome, Effect, FinalTally, QuestionInstance, QuestionSource, SessionContent,
    SessionEvent, SessionMachine, SessionState, Transition,
};
pub use options::{AnswerOption, OPTION_COUNT, OptionGenerator, OptionSet};
pub use persistence::{PersistenceGateway, PersistenceStatus, SessionResult};
pub use progress::SessionProgress;
pub use rounds::{MIN_DECK_SIZE, RoundPlan, RoundSampler, questions_per_round};
pub use timer::{QuestionTimer, TimerExpired};
