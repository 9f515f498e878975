#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod id;
pub mod input;
pub mod quiz;

pub use chrono::{DateTime, TimeDelta, Utc};
pub use id::{MalformedId, QuizId};
pub use input::{Index, Options, QuizInput};
pub use quiz::{Phase, Quiz, QuizSummary, RawQuiz};
