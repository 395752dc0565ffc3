//! Parsers for primitive (i.e. terminal) grammar elements.
//!
//! Every parser is a free function generic over the winnow error type, so
//! the same grammar can run with `()` in tests, with [`ContextError`] in the
//! codecs, or inside larger combinators.
//!
//! [`ContextError`]: winnow::error::ContextError

use lexical_parse_float::{FromLexicalWithOptions, NumberFormatBuilder, Options, OptionsBuilder};
use thiserror::Error;
use winnow::ascii::{Caseless, digit1};
use winnow::combinator::{alt, opt, preceded, terminated};
use winnow::error::{FromExternalError, ParserError};
use winnow::stream::Stream as _;
use winnow::token::{one_of, take_while};
use winnow::Parser;

use crate::model::primitive::{
    Date, DateTime, DateTimeOrDate, Duration, DurationKind, DurationTime, Period, RawTime, Sign,
    Time, TimeFormat, Uri, UtcOffset,
};

pub use lexical_parse_float::Error as ParseFloatError;

/// The format for parsing floats with [`lexical_parse_float`]: plain decimal
/// notation only, no exponents, no specials.
const ICALENDAR_FLOAT_FORMAT: u128 = NumberFormatBuilder::new()
    .required_integer_digits(true)
    .required_fraction_digits(false)
    .no_exponent_notation(true)
    .required_mantissa_digits(false)
    .no_special(true)
    .build_strict();

/// The options for parsing floats with [`lexical_parse_float`].
const ICALENDAR_FLOAT_OPTIONS: Options = OptionsBuilder::new()
    .nan_string(None)
    .inf_string(None)
    .infinity_string(None)
    .build_strict();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{year:04}{month:02}{day:02} is not a real calendar date")]
pub struct InvalidDateError {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{hours:02}{minutes:02}{seconds:02} is not a valid clock reading")]
pub struct InvalidRawTimeError {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidUtcOffsetError {
    /// `-0000` is explicitly forbidden by RFC 5545 §3.3.14.
    #[error("the offset -0000 is forbidden")]
    NegativeZero,
    #[error("offset hours must be at most 23, got {0}")]
    BadHours(u8),
    #[error("offset minutes must be at most 59, got {0}")]
    BadMinutes(u8),
    #[error("offset seconds must be at most 59, got {0}")]
    BadSeconds(u8),
}

/// Parses exactly `n` decimal digits into a `u32`.
fn uint_fixed<'i, E>(n: usize) -> impl Parser<&'i str, u32, E>
where
    E: ParserError<&'i str>,
{
    take_while(n..=n, |c: char| c.is_ascii_digit())
        .map(|s: &str| s.bytes().fold(0u32, |acc, b| acc * 10 + u32::from(b - b'0')))
}

/// Parses a [`Date`] of the form `YYYYMMDD`, validating it against the
/// Gregorian calendar.
pub fn date<'i, E>(input: &mut &'i str) -> Result<Date, E>
where
    E: ParserError<&'i str> + FromExternalError<&'i str, InvalidDateError>,
{
    let year = uint_fixed(4).parse_next(input)? as u16;
    let month = uint_fixed(2).parse_next(input)? as u8;
    let day = uint_fixed(2).parse_next(input)? as u8;

    Date::from_ymd_opt(year, month, day)
        .ok_or_else(|| E::from_external_error(input, InvalidDateError { year, month, day }))
}

/// Parses a bare clock reading of the form `HHMMSS`, admitting a leap
/// second.
pub fn raw_time<'i, E>(input: &mut &'i str) -> Result<RawTime, E>
where
    E: ParserError<&'i str> + FromExternalError<&'i str, InvalidRawTimeError>,
{
    let hours = uint_fixed(2).parse_next(input)? as u8;
    let minutes = uint_fixed(2).parse_next(input)? as u8;
    let seconds = uint_fixed(2).parse_next(input)? as u8;

    RawTime::new(hours, minutes, seconds).ok_or_else(|| {
        E::from_external_error(
            input,
            InvalidRawTimeError {
                hours,
                minutes,
                seconds,
            },
        )
    })
}

/// Parses a TIME value: `HHMMSS` with an optional `Z` suffix.
pub fn time<'i, E>(input: &mut &'i str) -> Result<Time, E>
where
    E: ParserError<&'i str> + FromExternalError<&'i str, InvalidRawTimeError>,
{
    let raw = raw_time.parse_next(input)?;
    let format = opt('Z')
        .map(|z| match z {
            Some(_) => TimeFormat::Utc,
            None => TimeFormat::Local,
        })
        .parse_next(input)?;

    Ok(Time { raw, format })
}

/// Parses a DATE-TIME value: `YYYYMMDDTHHMMSS[Z]`.
pub fn date_time<'i, E>(input: &mut &'i str) -> Result<DateTime, E>
where
    E: ParserError<&'i str>
        + FromExternalError<&'i str, InvalidDateError>
        + FromExternalError<&'i str, InvalidRawTimeError>,
{
    let date = date.parse_next(input)?;
    let time = preceded('T', time).parse_next(input)?;
    Ok(DateTime { date, time })
}

/// Parses a DATE-TIME when the `T` part is present, a bare DATE otherwise.
pub fn date_time_or_date<'i, E>(input: &mut &'i str) -> Result<DateTimeOrDate, E>
where
    E: ParserError<&'i str>
        + FromExternalError<&'i str, InvalidDateError>
        + FromExternalError<&'i str, InvalidRawTimeError>,
{
    let date = date.parse_next(input)?;
    match opt(preceded('T', time)).parse_next(input)? {
        Some(time) => Ok(DateTimeOrDate::DateTime(DateTime { date, time })),
        None => Ok(DateTimeOrDate::Date(date)),
    }
}

/// Parses a UTC-OFFSET value: `±HHMM[SS]`.
pub fn utc_offset<'i, E>(input: &mut &'i str) -> Result<UtcOffset, E>
where
    E: ParserError<&'i str> + FromExternalError<&'i str, InvalidUtcOffsetError>,
{
    let sign = sign.parse_next(input)?;
    let hours = uint_fixed(2).parse_next(input)? as u8;
    let minutes = uint_fixed(2).parse_next(input)? as u8;
    let seconds = opt(uint_fixed(2).map(|s| s as u8)).parse_next(input)?;

    let invalid = if hours > 23 {
        Some(InvalidUtcOffsetError::BadHours(hours))
    } else if minutes > 59 {
        Some(InvalidUtcOffsetError::BadMinutes(minutes))
    } else if seconds.is_some_and(|s| s > 59) {
        seconds.map(InvalidUtcOffsetError::BadSeconds)
    } else if sign == Sign::Negative && hours == 0 && minutes == 0 && seconds.unwrap_or(0) == 0 {
        Some(InvalidUtcOffsetError::NegativeZero)
    } else {
        None
    };

    if let Some(err) = invalid {
        return Err(E::from_external_error(input, err));
    }

    Ok(UtcOffset {
        sign,
        hours,
        minutes,
        seconds,
    })
}

fn sign<'i, E>(input: &mut &'i str) -> Result<Sign, E>
where
    E: ParserError<&'i str>,
{
    one_of(('+', '-'))
        .map(|c| match c {
            '-' => Sign::Negative,
            _ => Sign::Positive,
        })
        .parse_next(input)
}

/// Parses an INTEGER value: `[+-]?digits` within the 32-bit signed range.
pub fn integer<'i, E>(input: &mut &'i str) -> Result<i32, E>
where
    E: ParserError<&'i str> + FromExternalError<&'i str, std::num::ParseIntError>,
{
    (opt(one_of(('+', '-'))), digit1)
        .take()
        .try_map(|s: &str| s.parse::<i32>())
        .parse_next(input)
}

/// Parses a positive integer into a `u32`.
pub fn positive_integer<'i, E>(input: &mut &'i str) -> Result<u32, E>
where
    E: ParserError<&'i str> + FromExternalError<&'i str, std::num::ParseIntError>,
{
    digit1.try_map(|s: &str| s.parse::<u32>()).parse_next(input)
}

/// Parses a FLOAT value. NaN and the infinities have no wire form and are
/// rejected here.
pub fn float<'i, E>(input: &mut &'i str) -> Result<f64, E>
where
    E: ParserError<&'i str> + FromExternalError<&'i str, ParseFloatError>,
{
    take_while(1.., |c: char| {
        c.is_ascii_digit() || matches!(c, '+' | '-' | '.')
    })
    .try_map(|s: &str| {
        f64::from_lexical_with_options::<ICALENDAR_FLOAT_FORMAT>(
            s.as_bytes(),
            &ICALENDAR_FLOAT_OPTIONS,
        )
    })
    .parse_next(input)
}

/// Parses a BOOLEAN value, case-insensitively.
pub fn boolean<'i, E>(input: &mut &'i str) -> Result<bool, E>
where
    E: ParserError<&'i str>,
{
    alt((
        Caseless("TRUE").value(true),
        Caseless("FALSE").value(false),
    ))
    .parse_next(input)
}

fn dur_uint<'i, E>(input: &mut &'i str) -> Result<u32, E>
where
    E: ParserError<&'i str> + FromExternalError<&'i str, std::num::ParseIntError>,
{
    digit1.try_map(|s: &str| s.parse::<u32>()).parse_next(input)
}

/// Parses the `T`-part of a duration: `H[M[S]]`, `M[S]`, or `S`, keeping
/// the exact shape for round-tripping.
fn dur_time<'i, E>(input: &mut &'i str) -> Result<DurationTime, E>
where
    E: ParserError<&'i str> + FromExternalError<&'i str, std::num::ParseIntError>,
{
    let hours = opt(terminated(dur_uint, 'H')).parse_next(input)?;
    let minutes = opt(terminated(dur_uint, 'M')).parse_next(input)?;
    let seconds = opt(terminated(dur_uint, 'S')).parse_next(input)?;

    match (hours, minutes, seconds) {
        (Some(hours), Some(minutes), Some(seconds)) => Ok(DurationTime::Hms {
            hours,
            minutes,
            seconds,
        }),
        (Some(hours), Some(minutes), None) => Ok(DurationTime::Hm { hours, minutes }),
        (Some(hours), None, None) => Ok(DurationTime::H { hours }),
        (None, Some(minutes), Some(seconds)) => Ok(DurationTime::Ms { minutes, seconds }),
        (None, Some(minutes), None) => Ok(DurationTime::M { minutes }),
        (None, None, Some(seconds)) => Ok(DurationTime::S { seconds }),
        _ => Err(E::from_input(input)),
    }
}

/// Parses a DURATION value. Weeks and a day/time decomposition are mutually
/// exclusive; a trailing unconsumed part (as in `P1W2D`) is left in the
/// input for the caller to reject.
pub fn duration<'i, E>(input: &mut &'i str) -> Result<Duration, E>
where
    E: ParserError<&'i str> + FromExternalError<&'i str, std::num::ParseIntError>,
{
    let sign = opt(sign).parse_next(input)?;
    'P'.parse_next(input)?;

    let kind = alt((
        terminated(dur_uint, 'W').map(|weeks| DurationKind::Week { weeks }),
        (terminated(dur_uint, 'D'), opt(preceded('T', dur_time)))
            .map(|(days, time)| DurationKind::Date { days, time }),
        preceded('T', dur_time).map(|time| DurationKind::Time { time }),
    ))
    .parse_next(input)?;

    Ok(Duration { sign, kind })
}

/// Parses a PERIOD value: `start/end` or `start/duration`.
pub fn period<'i, E>(input: &mut &'i str) -> Result<Period, E>
where
    E: ParserError<&'i str>
        + FromExternalError<&'i str, InvalidDateError>
        + FromExternalError<&'i str, InvalidRawTimeError>
        + FromExternalError<&'i str, std::num::ParseIntError>,
{
    let start = date_time.parse_next(input)?;
    '/'.parse_next(input)?;

    alt((
        date_time.map(move |end| Period::Explicit { start, end }),
        duration.map(move |duration| Period::Start { start, duration }),
    ))
    .parse_next(input)
}

/// Parses a URI: a scheme followed by `:` and an opaque remainder. The
/// remainder is not inspected; iCalendar treats URIs as opaque and the
/// security policy vets the scheme separately.
pub fn uri<'i, E>(input: &mut &'i str) -> Result<Uri, E>
where
    E: ParserError<&'i str>,
{
    let scheme = (
        one_of(|c: char| c.is_ascii_alphabetic()),
        take_while(0.., |c: char| {
            c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')
        }),
    )
        .take()
        .parse_next(input)?;
    ':'.parse_next(input)?;
    let tail = input.finish();

    Ok(Uri::new(format!("{scheme}:{tail}")))
}

/// Decodes TEXT backslash escapes. Returns `None` on an unknown escape or a
/// trailing backslash unless `lenient`, in which case the backslash is
/// dropped.
pub(crate) fn decode_text(raw: &str, lenient: bool) -> Option<String> {
    if !raw.contains('\\') {
        return Some(raw.to_owned());
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('\\') => out.push('\\'),
            Some(';') => out.push(';'),
            Some(',') => out.push(','),
            Some('n') | Some('N') => out.push('\n'),
            Some(other) if lenient => out.push(other),
            Some(_) => return None,
            None if lenient => (),
            None => return None,
        }
    }

    Some(out)
}

/// The inverse of [`decode_text`]: escapes backslashes, semicolons, commas,
/// and newlines.
pub(crate) fn encode_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => (),
            _ => out.push(c),
        }
    }
    out
}
