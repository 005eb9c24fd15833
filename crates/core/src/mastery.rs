//! Mastery bookkeeping.
//!
//! A session moves a learner's mastery of a deck by one point per question:
//! `+1` for each correct answer and `-1` for each incorrect one.

use serde::{Deserialize, Serialize};

pub const MASTERY_MIN: i64 = 0;
pub const MASTERY_MAX: i64 = 100;

/// Mastery percentage in `0..=100`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MasteryPercent(u8);

impl MasteryPercent {
    /// Builds a percentage, clamping anything outside `0..=100`.
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        let bounded = value.clamp(MASTERY_MIN, MASTERY_MAX);
        Self(u8::try_from(bounded).unwrap_or(u8::MAX))
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

/// Signed mastery change for a session's totals.
#[must_use]
pub fn mastery_delta(correct: u32, incorrect: u32) -> i64 {
    i64::from(correct) - i64::from(incorrect)
}

/// Prior mastery plus the delta earned this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasteryState {
    prior: MasteryPercent,
    delta: i64,
}

impl MasteryState {
    #[must_use]
    pub fn compute(prior: MasteryPercent, correct: u32, incorrect: u32) -> Self {
        Self {
            prior,
            delta: mastery_delta(correct, incorrect),
        }
    }

    #[must_use]
    pub fn prior(&self) -> MasteryPercent {
        self.prior
    }

    #[must_use]
    pub fn delta(&self) -> i64 {
        self.delta
    }

    /// Unclamped `prior + delta`; may leave `0..=100`.
    #[must_use]
    pub fn raw_new_mastery(&self) -> i64 {
        i64::from(self.prior.value()) + self.delta
    }

    /// The value that gets stored.
    #[must_use]
    pub fn new_mastery(&self) -> MasteryPercent {
        MasteryPercent::clamped(self.raw_new_mastery())
    }
}
