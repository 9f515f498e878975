use crate::error::Error;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::{body::Bytes, header::HeaderValue};
use model::{Index, Options, QuizInput};
use url::form_urlencoded;

pub const APPLICATION_JSON: &str = "application/json";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Largest request body we are willing to buffer.
pub const MAX_BODY_SIZE: usize = 64 * 1024;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A creation request body, tagged by the format it was sent in.
#[derive(Debug)]
pub enum Payload {
    Json(Bytes),
    FormEncoded(Vec<(String, String)>),
}

impl Payload {
    /// Checks the declared media type, then buffers the body. The body is never read for an
    /// unsupported media type.
    pub async fn read<B>(content_type: Option<&HeaderValue>, body: B) -> Result<Self, Error>
    where
        B: hyper::body::Body,
        B::Error: Into<BoxError>,
    {
        let mime = content_type
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(str::trim)
            .ok_or(Error::UnsupportedMedia)?;

        let is_json = mime.eq_ignore_ascii_case(APPLICATION_JSON);
        if !is_json && !mime.eq_ignore_ascii_case(FORM_URLENCODED) {
            return Err(Error::UnsupportedMedia);
        }

        let bytes = Limited::new(body, MAX_BODY_SIZE)
            .collect()
            .await
            .map_err(|err| if err.is::<LengthLimitError>() { Error::TooLarge } else { Error::MalformedBody })?
            .to_bytes();

        if is_json {
            return Ok(Self::Json(bytes));
        }

        let fields = form_urlencoded::parse(&bytes).into_owned().collect();
        Ok(Self::FormEncoded(fields))
    }

    /// Normalizes either encoding into the same creation input.
    pub fn into_input(self) -> Result<QuizInput, Error> {
        match self {
            Self::Json(bytes) => serde_json::from_slice(&bytes).map_err(|_| Error::MalformedBody),
            Self::FormEncoded(fields) => Ok(input_from_fields(fields)),
        }
    }
}

/// Blank values count as missing. When a key repeats, its first value wins.
fn input_from_fields(fields: Vec<(String, String)>) -> QuizInput {
    let mut input = QuizInput::default();
    for (key, value) in fields {
        if value.trim().is_empty() {
            continue;
        }
        match key.as_str() {
            "question" if input.question.is_none() => input.question = Some(value),
            "options" if input.options.is_none() => input.options = Some(Options::Delimited(value)),
            "rightAnswer" if input.right_answer.is_none() => input.right_answer = Some(Index::Text(value)),
            "startDate" if input.start_date.is_none() => input.start_date = Some(value),
            "endDate" if input.end_date.is_none() => input.end_date = Some(value),
            _ => (),
        }
    }
    input
}
