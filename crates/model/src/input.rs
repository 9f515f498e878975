use alloc::{borrow::ToOwned, string::String, vec::Vec};
use serde::Deserialize;

/// Creation input exactly as received, before any validation. Both the JSON and the form-encoded
/// request bodies are normalized into this shape.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizInput {
    pub question: Option<String>,
    pub options: Option<Options>,
    pub right_answer: Option<Index>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Choices may arrive as a proper list or as a single comma-delimited string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Options {
    List(Vec<String>),
    Delimited(String),
}

impl Options {
    /// Flattens the choices into an ordered list. Delimited entries are trimmed of surrounding
    /// whitespace; list entries are kept verbatim.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::List(list) => list,
            Self::Delimited(text) => text.split(',').map(str::trim).map(ToOwned::to_owned).collect(),
        }
    }
}

/// The 1-based right answer, either as a JSON number or as decimal text.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Index {
    Number(i64),
    Text(String),
}

impl Index {
    pub fn to_integer(&self) -> Option<i64> {
        match self {
            Self::Number(num) => Some(*num),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}
