use core::fmt::{self, Display};

/// Reasons a creation request is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Invalid {
    MissingQuestion,
    MissingOptions,
    EmptyOption,
    TooFewOptions,
    TooManyOptions,
    MissingRightAnswer,
    RightAnswer,
    MissingDate,
    MalformedDate,
    EndBeforeStart,
    /// Passed validation but broke a constraint of the store.
    Unstorable,
}

impl Display for Invalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MissingQuestion => "missing question",
            Self::MissingOptions => "missing options",
            Self::EmptyOption => "options must not be empty",
            Self::TooFewOptions => "at least two options are required",
            Self::TooManyOptions => "too many options",
            Self::MissingRightAnswer => "missing right answer",
            Self::RightAnswer => "invalid right answer index",
            Self::MissingDate => "missing start or end date",
            Self::MalformedDate => "malformed date",
            Self::EndBeforeStart => "end before start",
            Self::Unstorable => "quiz cannot be stored",
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    Validation(Invalid),
    /// The identifier is not a well-formed quiz identifier.
    InvalidId,
    /// The identifier is well-formed, but no quiz has it.
    NotFound,
    /// The quiz exists, but its answer is still under embargo.
    NotYetAvailable,
    /// The store failed or did not answer in time.
    StoreUnavailable,
}

impl From<Invalid> for Error {
    fn from(invalid: Invalid) -> Self {
        Self::Validation(invalid)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(invalid) => Display::fmt(invalid, f),
            Self::InvalidId => f.write_str("invalid quiz id"),
            Self::NotFound => f.write_str("quiz not found"),
            Self::NotYetAvailable => f.write_str("result not available yet, try again after the quiz has ended"),
            Self::StoreUnavailable => f.write_str("quiz store unavailable, try again later"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = core::result::Result<T, Error>;
