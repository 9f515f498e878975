use core::{
    fmt::{self, Display},
    num::NonZeroI64,
    str::FromStr,
};
use serde::{Serialize, Serializer};

/// Store-assigned identifier of a quiz. Always strictly positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QuizId(NonZeroI64);

/// The text is not a positive decimal integer that fits in 64 bits.
#[derive(Debug, PartialEq, Eq)]
pub struct MalformedId;

impl QuizId {
    pub const fn new(raw: i64) -> Option<Self> {
        if raw <= 0 {
            return None;
        }
        match NonZeroI64::new(raw) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    pub const fn get(self) -> i64 {
        self.0.get()
    }
}

impl Display for QuizId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for QuizId {
    type Err = MalformedId;

    /// Accepts plain decimal digits only: no sign, no whitespace. Leading zeroes are allowed.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.is_empty() || !text.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(MalformedId);
        }
        let raw: i64 = text.parse().map_err(|_| MalformedId)?;
        Self::new(raw).ok_or(MalformedId)
    }
}

impl Serialize for QuizId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}
