use crate::error::Invalid;
use chrono::{Datelike, NaiveDate, NaiveDateTime, SubsecRound};
use core::ops::RangeInclusive;
use model::{DateTime, QuizInput, RawQuiz, Utc};

/// Every one-based index must fit the store's `SMALLINT` column.
pub const MAX_OPTIONS: usize = i16::MAX as usize;

/// Calendar years (in UTC) that every store can hold.
const STORABLE_YEARS: RangeInclusive<i32> = 1..=9999;

/// Stores keep timestamps at microsecond precision.
const SUBSEC_DIGITS: u16 = 6;

/// Offset-less date-time layouts, tried in order after RFC 3339. These are read as UTC.
const LOCAL_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

fn parse_any(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(stamp) = DateTime::parse_from_rfc3339(text) {
        return Some(stamp.with_timezone(&Utc));
    }

    if let Some(naive) = LOCAL_FORMATS.iter().find_map(|format| NaiveDateTime::parse_from_str(text, format).ok()) {
        return Some(naive.and_utc());
    }

    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

/// Parses a date-time in RFC 3339 form, or in ISO 8601 form without an offset (taken as UTC),
/// or a bare calendar date (taken as midnight UTC). The result is truncated to microseconds, and
/// years outside `1..=9999` are rejected.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, Invalid> {
    let stamp = parse_any(text.trim()).ok_or(Invalid::MalformedDate)?;
    if !STORABLE_YEARS.contains(&stamp.year()) {
        return Err(Invalid::MalformedDate);
    }
    Ok(stamp.trunc_subsecs(SUBSEC_DIGITS))
}

/// Turns raw creation input into a quiz that upholds every entity invariant.
pub fn validate(input: QuizInput) -> Result<RawQuiz, Invalid> {
    let QuizInput { question, options, right_answer, start_date, end_date } = input;

    let question = question.filter(|text| !text.trim().is_empty()).ok_or(Invalid::MissingQuestion)?;

    let options = options.ok_or(Invalid::MissingOptions)?.into_vec();
    if options.iter().any(|option| option.trim().is_empty()) {
        return Err(Invalid::EmptyOption);
    }
    if options.len() < 2 {
        return Err(Invalid::TooFewOptions);
    }
    if options.len() > MAX_OPTIONS {
        return Err(Invalid::TooManyOptions);
    }

    let index = right_answer.ok_or(Invalid::MissingRightAnswer)?.to_integer().ok_or(Invalid::RightAnswer)?;
    let right_answer = u16::try_from(index).map_err(|_| Invalid::RightAnswer)?;
    if !(1..=options.len()).contains(&usize::from(right_answer)) {
        return Err(Invalid::RightAnswer);
    }

    let (start_date, end_date) = start_date.zip(end_date).ok_or(Invalid::MissingDate)?;
    let start_date = parse_timestamp(&start_date)?;
    let end_date = parse_timestamp(&end_date)?;
    if start_date >= end_date {
        return Err(Invalid::EndBeforeStart);
    }

    Ok(RawQuiz { question, options, right_answer, start_date, end_date })
}
