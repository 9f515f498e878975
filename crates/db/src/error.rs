use core::fmt::{self, Display};
use tokio_postgres::error::SqlState;

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// The store could not be reached or the query failed midway.
    Unavailable,
    /// A stored row did not decode into a quiz.
    Schema,
    /// The store refused a row that breaks one of its constraints.
    Invariant,
}

impl From<tokio_postgres::Error> for Error {
    fn from(err: tokio_postgres::Error) -> Self {
        match err.code() {
            Some(&SqlState::CHECK_VIOLATION | &SqlState::NOT_NULL_VIOLATION) => Self::Invariant,
            _ => Self::Unavailable,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unavailable => "The quiz store is unavailable.",
            Self::Schema => "A stored quiz does not match the expected schema.",
            Self::Invariant => "The quiz store rejected a row that breaks its constraints.",
        })
    }
}

impl std::error::Error for Error {}

pub type Result<T> = core::result::Result<T, Error>;
