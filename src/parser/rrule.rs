//! The RRULE (RECUR value) parser.
//!
//! An RRULE is a semicolon-separated `KEY=VALUE` list. Keys are
//! case-insensitive and unordered; FREQ must occur exactly once, every part
//! at most once, and COUNT and UNTIL are mutually exclusive. Unknown parts
//! raise in strict mode and are skipped with a warning in lenient mode.

use std::num::NonZero;

use winnow::Parser;
use winnow::error::ContextError;

use super::config::ParseContext;
use super::error::ErrorKind;
use super::primitive::date_time_or_date;
use crate::model::primitive::Weekday;
use crate::model::rrule::{Freq, RRule, WeekdayNum};

pub(crate) fn parse_rrule(raw: &str, ctx: &mut ParseContext<'_>) -> Result<RRule, ErrorKind> {
    let mut rule = RRule::default();
    let mut seen: Vec<String> = Vec::new();

    for part in raw.split(';') {
        let Some((key, value)) = part.split_once('=') else {
            if ctx.mode().is_lenient() {
                let kind = ErrorKind::RRuleUnknownPart(part.to_owned());
                ctx.warn(kind.code(), kind.to_string());
                continue;
            }
            return Err(ErrorKind::RRuleUnknownPart(part.to_owned()));
        };

        let key = key.to_ascii_uppercase();
        let known = match key.as_str() {
            "FREQ" => {
                rule.freq = Some(
                    value
                        .parse::<Freq>()
                        .map_err(|_| invalid("FREQ", value))?,
                );
                true
            }
            "UNTIL" => {
                rule.until = Some(
                    date_time_or_date::<ContextError>
                        .parse(value)
                        .map_err(|_| ErrorKind::RRuleInvalidUntil(value.to_owned()))?,
                );
                true
            }
            "COUNT" => {
                rule.count = Some(positive("COUNT", value)?);
                true
            }
            "INTERVAL" => {
                rule.interval = Some(positive("INTERVAL", value)?);
                true
            }
            "BYSECOND" => {
                rule.by_second = unsigned_list("BYSECOND", value, 60)?;
                true
            }
            "BYMINUTE" => {
                rule.by_minute = unsigned_list("BYMINUTE", value, 59)?;
                true
            }
            "BYHOUR" => {
                rule.by_hour = unsigned_list("BYHOUR", value, 23)?;
                true
            }
            "BYDAY" => {
                rule.by_day = weekday_list(value)?;
                true
            }
            "BYMONTHDAY" => {
                rule.by_month_day = signed_list("BYMONTHDAY", value, 31)?;
                true
            }
            "BYYEARDAY" => {
                rule.by_year_day = signed_list("BYYEARDAY", value, 366)?;
                true
            }
            "BYWEEKNO" => {
                rule.by_week_no = signed_list("BYWEEKNO", value, 53)?;
                true
            }
            "BYMONTH" => {
                let months = unsigned_list("BYMONTH", value, 12)?;
                if months.contains(&0) {
                    return Err(invalid("BYMONTH", value));
                }
                rule.by_month = months;
                true
            }
            "BYSETPOS" => {
                rule.by_set_pos = signed_list("BYSETPOS", value, 366)?;
                true
            }
            "WKST" => {
                rule.wkst = Some(
                    value
                        .parse::<Weekday>()
                        .map_err(|_| invalid("WKST", value))?,
                );
                true
            }
            _ => {
                if ctx.mode().is_lenient() {
                    let kind = ErrorKind::RRuleUnknownPart(key.clone());
                    ctx.warn(kind.code(), kind.to_string());
                    false
                } else {
                    return Err(ErrorKind::RRuleUnknownPart(key));
                }
            }
        };

        if known {
            if seen.contains(&key) {
                return Err(ErrorKind::RRuleDuplicatePart(key));
            }
            seen.push(key);
        }
    }

    if rule.freq.is_none() {
        return Err(ErrorKind::RRuleMissingFreq);
    }

    if rule.count.is_some() && rule.until.is_some() {
        return Err(ErrorKind::RRuleCountAndUntil);
    }

    Ok(rule)
}

fn invalid(part: &'static str, value: &str) -> ErrorKind {
    ErrorKind::RRuleInvalidValue {
        part,
        value: value.to_owned(),
    }
}

fn positive(part: &'static str, value: &str) -> Result<NonZero<u32>, ErrorKind> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(part, value));
    }

    value
        .parse::<u32>()
        .ok()
        .and_then(NonZero::new)
        .ok_or_else(|| invalid(part, value))
}

/// Parses a comma-separated list of unsigned integers bounded by `max`.
fn unsigned_list(part: &'static str, value: &str, max: u8) -> Result<Vec<u8>, ErrorKind> {
    value
        .split(',')
        .map(|piece| {
            if piece.is_empty() || piece.len() > 2 || !piece.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid(part, piece));
            }

            piece
                .parse::<u8>()
                .ok()
                .filter(|&v| v <= max)
                .ok_or_else(|| invalid(part, piece))
        })
        .collect()
}

/// Parses a comma-separated list of signed nonzero integers whose magnitude
/// is bounded by `max`.
fn signed_list<T>(part: &'static str, value: &str, max: i64) -> Result<Vec<T>, ErrorKind>
where
    T: TryFrom<i64>,
{
    value
        .split(',')
        .map(|piece| {
            let (sign, digits) = match piece.strip_prefix('-') {
                Some(rest) => (-1i64, rest),
                None => (1, piece.strip_prefix('+').unwrap_or(piece)),
            };

            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid(part, piece));
            }

            digits
                .parse::<i64>()
                .ok()
                .filter(|&v| v != 0 && v <= max)
                .and_then(|v| T::try_from(sign * v).ok())
                .ok_or_else(|| invalid(part, piece))
        })
        .collect()
}

/// Parses a BYDAY list: each entry is an optional nonzero ordinal of
/// magnitude at most 53 followed by a weekday abbreviation.
fn weekday_list(value: &str) -> Result<Vec<WeekdayNum>, ErrorKind> {
    value
        .split(',')
        .map(|piece| {
            let split = piece
                .find(|c: char| c.is_ascii_alphabetic())
                .ok_or_else(|| invalid("BYDAY", piece))?;
            let (ordinal, day) = piece.split_at(split);

            let weekday = day
                .parse::<Weekday>()
                .map_err(|_| invalid("BYDAY", piece))?;

            let ordinal = if ordinal.is_empty() {
                None
            } else {
                let parsed: Vec<i8> = signed_list("BYDAY", ordinal, 53)?;
                match parsed.as_slice() {
                    [one] => Some(*one),
                    _ => return Err(invalid("BYDAY", piece)),
                }
            };

            Ok(WeekdayNum { ordinal, weekday })
        })
        .collect()
}
