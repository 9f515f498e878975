use crate::QuizId;
use alloc::{string::String, vec::Vec};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

/// How long after its end date a quiz keeps its right answer hidden.
pub const DISCLOSURE_DELAY: TimeDelta = match TimeDelta::try_minutes(5) {
    Some(delay) => delay,
    None => panic!("disclosure delay out of range"),
};

/// A validated quiz that has not been assigned an identifier yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawQuiz {
    /// Question to be displayed to participants.
    pub question: String,
    /// Possible answers to select from. There are always at least two.
    pub options: Vec<String>,
    /// One-based index into `options` of the correct answer.
    pub right_answer: u16,
    /// Inclusive start of the window.
    pub start_date: DateTime<Utc>,
    /// Inclusive end of the window. Strictly after `start_date`.
    pub end_date: DateTime<Utc>,
}

/// Where a quiz stands relative to its window at some instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Pending,
    Open,
    Closed,
}

impl RawQuiz {
    pub fn phase(&self, now: DateTime<Utc>) -> Phase {
        if now < self.start_date {
            Phase::Pending
        } else if now <= self.end_date {
            Phase::Open
        } else {
            Phase::Closed
        }
    }

    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.phase(now) == Phase::Open
    }

    /// Earliest instant at which the right answer may be revealed. `None` when that instant is
    /// past the representable range, in which case the answer is never revealed.
    pub fn disclosed_at(&self) -> Option<DateTime<Utc>> {
        self.end_date.checked_add_signed(DISCLOSURE_DELAY)
    }
}

/// A persisted quiz.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Quiz {
    pub id: QuizId,
    /// Cached window membership as of the last reconciliation.
    pub active: bool,
    pub raw: RawQuiz,
}

impl Quiz {
    pub fn summary(&self) -> QuizSummary {
        QuizSummary { id: self.id, question: self.raw.question.clone(), options: self.raw.options.clone() }
    }
}

/// Public view of a quiz. Never carries the right answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuizSummary {
    pub id: QuizId,
    pub question: String,
    pub options: Vec<String>,
}
