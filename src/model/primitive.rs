//! Primitive types for the object model.
//!
//! Every type in this module knows how to print itself in the RFC 5545 wire
//! format via [`std::fmt::Display`]; the corresponding readers live in
//! [`crate::parser::primitive`]. Construction is validated where the grammar
//! alone cannot guarantee a meaningful value (dates, times, offsets).

use std::fmt;
use std::num::NonZero;

use derive_more::{From, TryInto};
use strum::EnumString;

use super::rrule::RRule;

/// The INTEGER type as defined in RFC 5545 §3.3.8.
pub type Integer = i32;

/// The FLOAT type as defined in RFC 5545 §3.3.7.
pub type Float = f64;

/// A strictly positive integer.
pub type PositiveInteger = NonZero<u32>;

/// The sign of a signed value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i8)]
pub enum Sign {
    #[default]
    Positive = 1,
    Negative = -1,
}

impl Sign {
    #[inline(always)]
    pub const fn factor(self) -> i64 {
        self as i8 as i64
    }
}

/// One of the seven weekdays, named by its two-letter RFC 5545 abbreviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Weekday {
    #[strum(serialize = "MO")]
    Monday,
    #[strum(serialize = "TU")]
    Tuesday,
    #[strum(serialize = "WE")]
    Wednesday,
    #[strum(serialize = "TH")]
    Thursday,
    #[strum(serialize = "FR")]
    Friday,
    #[strum(serialize = "SA")]
    Saturday,
    #[strum(serialize = "SU")]
    Sunday,
}

impl Weekday {
    /// Returns the weekday's index counted from Monday, in `0..=6`.
    #[inline(always)]
    pub const fn index_from_monday(self) -> u8 {
        self as u8
    }

    pub const fn from_index_from_monday(index: u8) -> Option<Self> {
        match index {
            0..=6 => {
                // SAFETY: the valid discriminants of Self are exactly the
                // values of the range 0..=6.
                Some(unsafe { std::mem::transmute::<u8, Self>(index) })
            }
            _ => None,
        }
    }

    pub const fn abbreviation(self) -> &'static str {
        match self {
            Weekday::Monday => "MO",
            Weekday::Tuesday => "TU",
            Weekday::Wednesday => "WE",
            Weekday::Thursday => "TH",
            Weekday::Friday => "FR",
            Weekday::Saturday => "SA",
            Weekday::Sunday => "SU",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

/// One of the twelve Gregorian months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Month {
    Jan = 1,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
}

impl Month {
    pub const fn from_number(number: u8) -> Option<Self> {
        match number {
            1..=12 => {
                // SAFETY: Month is repr(u8) and takes the values in the range
                // 1..=12, which are the only possible values in this branch.
                Some(unsafe { std::mem::transmute::<u8, Self>(number) })
            }
            _ => None,
        }
    }

    /// Returns the month number of `self`, which lies in the range `1..=12`.
    pub const fn number(self) -> NonZero<u8> {
        // SAFETY: the value of (self as u8) can never be zero.
        unsafe { NonZero::new_unchecked(self as u8) }
    }

    /// Returns the number of days of `self` in `year`, based on the table
    /// given in RFC 5545 §3.3.4 and the Gregorian leap year rule.
    pub const fn length(self, year: u16) -> u8 {
        match self {
            Month::Feb if leap_year(year) => 29,
            Month::Feb => 28,
            Month::Jan
            | Month::Mar
            | Month::May
            | Month::Jul
            | Month::Aug
            | Month::Oct
            | Month::Dec => 31,
            Month::Apr | Month::Jun | Month::Sep | Month::Nov => 30,
        }
    }
}

/// Returns `true` iff `year` is a Gregorian leap year.
pub const fn leap_year(year: u16) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// A DATE value (RFC 5545 §3.3.4).
///
/// Construction via [`Date::from_ymd_opt`] guarantees that the value denotes
/// a real day of the proleptic Gregorian calendar between years 1 and 9999.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date {
    year: u16,
    month: NonZero<u8>,
    day: NonZero<u8>,
}

impl Date {
    /// Constructs a [`Date`] from a year, month (1-indexed), and day
    /// (1-indexed). Returns `None` unless the triple denotes a real calendar
    /// day; in particular year 0 and 1900-02-29 are rejected.
    pub const fn from_ymd_opt(year: u16, month: u8, day: u8) -> Option<Self> {
        if year == 0 || year > 9999 {
            return None;
        }

        let Some(m) = Month::from_number(month) else {
            return None;
        };

        if day == 0 || day > m.length(year) {
            return None;
        }

        // SAFETY: both values were checked to be nonzero above.
        let month = unsafe { NonZero::new_unchecked(month) };
        let day = unsafe { NonZero::new_unchecked(day) };

        Some(Self { year, month, day })
    }

    #[inline(always)]
    pub const fn year(self) -> u16 {
        self.year
    }

    #[inline(always)]
    pub const fn month(self) -> u8 {
        self.month.get()
    }

    #[inline(always)]
    pub const fn day(self) -> u8 {
        self.day.get()
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}{:02}", self.year, self.month, self.day)
    }
}

/// An unvalidated clock reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawTime {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

impl RawTime {
    /// Constructs a [`RawTime`], admitting second 60 for leap seconds.
    pub const fn new(hours: u8, minutes: u8, seconds: u8) -> Option<Self> {
        if hours <= 23 && minutes <= 59 && seconds <= 60 {
            Some(Self {
                hours,
                minutes,
                seconds,
            })
        } else {
            None
        }
    }
}

impl fmt::Display for RawTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}{:02}{:02}",
            self.hours, self.minutes, self.seconds
        )
    }
}

/// The format of a [`Time`], which may be local (floating) or absolute.
///
/// A zoned time is represented as [`Local`] here; the TZID rides on the
/// owning property's parameters, not on the value itself.
///
/// [`Local`]: TimeFormat::Local
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TimeFormat {
    #[default]
    Local,
    Utc,
}

/// A TIME value (RFC 5545 §3.3.12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Time {
    pub raw: RawTime,
    pub format: TimeFormat,
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)?;
        if self.format == TimeFormat::Utc {
            f.write_str("Z")?;
        }
        Ok(())
    }
}

/// The product of a [`Date`] and a [`Time`] (RFC 5545 §3.3.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateTime {
    pub date: Date,
    pub time: Time,
}

impl DateTime {
    #[inline(always)]
    pub const fn format(&self) -> TimeFormat {
        self.time.format
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}T{}", self.date, self.time)
    }
}

/// A date-time or date value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateTimeOrDate {
    DateTime(DateTime),
    Date(Date),
}

impl DateTimeOrDate {
    /// Returns `true` if the value is a bare [`Date`].
    ///
    /// [`Date`]: DateTimeOrDate::Date
    #[must_use]
    pub fn is_date(&self) -> bool {
        matches!(self, Self::Date(..))
    }

    /// The civil date of the value.
    pub fn date(&self) -> Date {
        match self {
            Self::DateTime(dt) => dt.date,
            Self::Date(date) => *date,
        }
    }

    /// The clock reading of the value, taking midnight for bare dates.
    pub fn raw_time(&self) -> RawTime {
        match self {
            Self::DateTime(dt) => dt.time.raw,
            Self::Date(_) => RawTime {
                hours: 0,
                minutes: 0,
                seconds: 0,
            },
        }
    }
}

impl From<Date> for DateTimeOrDate {
    fn from(value: Date) -> Self {
        Self::Date(value)
    }
}

impl From<DateTime> for DateTimeOrDate {
    fn from(value: DateTime) -> Self {
        Self::DateTime(value)
    }
}

impl fmt::Display for DateTimeOrDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DateTime(dt) => dt.fmt(f),
            Self::Date(date) => date.fmt(f),
        }
    }
}

/// A DURATION value (RFC 5545 §3.3.6).
///
/// The field decomposition of the source text is preserved exactly, so that
/// `P1DT2H` and `P1DT2H0M0S` print back as they were read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Duration {
    pub sign: Option<Sign>,
    pub kind: DurationKind,
}

impl Duration {
    #[must_use]
    pub fn is_negative(&self) -> bool {
        matches!(self.sign, Some(Sign::Negative))
    }

    /// The nominal length of the duration in seconds, negative for negative
    /// durations. Weeks count as seven days and days as 86400 seconds.
    pub fn as_seconds(&self) -> i64 {
        let magnitude = match self.kind {
            DurationKind::Week { weeks } => i64::from(weeks) * 7 * 86_400,
            DurationKind::Date { days, time } => {
                i64::from(days) * 86_400 + time.map_or(0, |t| t.as_seconds())
            }
            DurationKind::Time { time } => time.as_seconds(),
        };

        match self.sign {
            Some(Sign::Negative) => -magnitude,
            _ => magnitude,
        }
    }
}

/// The kind of a [`Duration`]: a week count or a day count with an optional
/// time part, which are mutually exclusive in the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DurationKind {
    Week {
        weeks: u32,
    },
    Date {
        days: u32,
        time: Option<DurationTime>,
    },
    Time {
        time: DurationTime,
    },
}

/// The time portion of a [`Duration`], keeping track of which fields were
/// actually present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DurationTime {
    Hms { hours: u32, minutes: u32, seconds: u32 },
    Hm { hours: u32, minutes: u32 },
    Ms { minutes: u32, seconds: u32 },
    H { hours: u32 },
    M { minutes: u32 },
    S { seconds: u32 },
}

impl DurationTime {
    pub fn as_seconds(&self) -> i64 {
        let (h, m, s) = match *self {
            DurationTime::Hms {
                hours,
                minutes,
                seconds,
            } => (hours, minutes, seconds),
            DurationTime::Hm { hours, minutes } => (hours, minutes, 0),
            DurationTime::Ms { minutes, seconds } => (0, minutes, seconds),
            DurationTime::H { hours } => (hours, 0, 0),
            DurationTime::M { minutes } => (0, minutes, 0),
            DurationTime::S { seconds } => (0, 0, seconds),
        };

        i64::from(h) * 3600 + i64::from(m) * 60 + i64::from(s)
    }
}

impl fmt::Display for DurationTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DurationTime::Hms {
                hours,
                minutes,
                seconds,
            } => write!(f, "{hours}H{minutes}M{seconds}S"),
            DurationTime::Hm { hours, minutes } => write!(f, "{hours}H{minutes}M"),
            DurationTime::Ms { minutes, seconds } => write!(f, "{minutes}M{seconds}S"),
            DurationTime::H { hours } => write!(f, "{hours}H"),
            DurationTime::M { minutes } => write!(f, "{minutes}M"),
            DurationTime::S { seconds } => write!(f, "{seconds}S"),
        }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sign {
            Some(Sign::Positive) => f.write_str("+")?,
            Some(Sign::Negative) => f.write_str("-")?,
            None => (),
        }

        f.write_str("P")?;

        match &self.kind {
            DurationKind::Week { weeks } => write!(f, "{weeks}W"),
            DurationKind::Date { days, time } => {
                write!(f, "{days}D")?;
                match time {
                    Some(time) => write!(f, "T{time}"),
                    None => Ok(()),
                }
            }
            DurationKind::Time { time } => write!(f, "T{time}"),
        }
    }
}

/// A PERIOD value (RFC 5545 §3.3.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Explicit { start: DateTime, end: DateTime },
    Start { start: DateTime, duration: Duration },
}

impl Period {
    pub const fn start(&self) -> DateTime {
        match self {
            Period::Explicit { start, .. } | Period::Start { start, .. } => *start,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Explicit { start, end } => write!(f, "{start}/{end}"),
            Period::Start { start, duration } => write!(f, "{start}/{duration}"),
        }
    }
}

/// A UTC-OFFSET value (RFC 5545 §3.3.14).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtcOffset {
    pub sign: Sign,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: Option<u8>,
}

impl UtcOffset {
    /// The offset from UTC in seconds, east positive.
    pub fn as_seconds(&self) -> i32 {
        let magnitude = i32::from(self.hours) * 3600
            + i32::from(self.minutes) * 60
            + i32::from(self.seconds.unwrap_or(0));

        magnitude * self.sign.factor() as i32
    }
}

impl fmt::Display for UtcOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = match self.sign {
            Sign::Positive => '+',
            Sign::Negative => '-',
        };

        write!(f, "{}{:02}{:02}", sign, self.hours, self.minutes)?;
        match self.seconds {
            Some(seconds) => write!(f, "{seconds:02}"),
            None => Ok(()),
        }
    }
}

/// A URI carried as an opaque string.
///
/// The parser guarantees that values constructed from input carry a scheme;
/// values built by the host are taken at face value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Uri(pub(crate) String);

impl Uri {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[inline(always)]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The URI scheme, when one is present.
    pub fn scheme(&self) -> Option<&str> {
        let (scheme, _) = self.0.split_once(':')?;

        let mut chars = scheme.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() => (),
            _ => return None,
        }

        chars
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
            .then_some(scheme)
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The type of a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    Binary,
    Boolean,
    CalAddress,
    Date,
    DateTime,
    Duration,
    Float,
    Integer,
    Period,
    Recur,
    Text,
    Time,
    Uri,
    UtcOffset,
    Other(String),
}

impl ValueType {
    /// Looks up a type by its (case-insensitive) name from a `VALUE=`
    /// parameter. Unknown names map to [`ValueType::Other`] with the name
    /// normalized to upper case.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "BINARY" => Self::Binary,
            "BOOLEAN" => Self::Boolean,
            "CAL-ADDRESS" => Self::CalAddress,
            "DATE" => Self::Date,
            "DATE-TIME" => Self::DateTime,
            "DURATION" => Self::Duration,
            "FLOAT" => Self::Float,
            "INTEGER" => Self::Integer,
            "PERIOD" => Self::Period,
            "RECUR" => Self::Recur,
            "TEXT" => Self::Text,
            "TIME" => Self::Time,
            "URI" => Self::Uri,
            "UTC-OFFSET" => Self::UtcOffset,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Binary => "BINARY",
            Self::Boolean => "BOOLEAN",
            Self::CalAddress => "CAL-ADDRESS",
            Self::Date => "DATE",
            Self::DateTime => "DATE-TIME",
            Self::Duration => "DURATION",
            Self::Float => "FLOAT",
            Self::Integer => "INTEGER",
            Self::Period => "PERIOD",
            Self::Recur => "RECUR",
            Self::Text => "TEXT",
            Self::Time => "TIME",
            Self::Uri => "URI",
            Self::UtcOffset => "UTC-OFFSET",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value that could not (or must not) be interpreted, retained verbatim.
///
/// Unknown `VALUE=` types are never canonicalized; the lenient parser also
/// uses this arm to retain the source text of a value it failed to decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnknownValue {
    pub type_name: String,
    pub raw: String,
}

/// A runtime-discriminated property value.
#[derive(Debug, Clone, PartialEq, From, TryInto)]
#[try_into(owned, ref, ref_mut)]
pub enum Value {
    Binary(Vec<u8>),
    Boolean(bool),
    #[from(ignore)]
    CalAddress(Uri),
    Date(Date),
    DateTime(DateTime),
    Duration(Duration),
    Float(Float),
    Integer(Integer),
    Period(Period),
    Recur(RRule),
    Text(String),
    Time(Time),
    Uri(Uri),
    UtcOffset(UtcOffset),
    Other(UnknownValue),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Binary(_) => ValueType::Binary,
            Value::Boolean(_) => ValueType::Boolean,
            Value::CalAddress(_) => ValueType::CalAddress,
            Value::Date(_) => ValueType::Date,
            Value::DateTime(_) => ValueType::DateTime,
            Value::Duration(_) => ValueType::Duration,
            Value::Float(_) => ValueType::Float,
            Value::Integer(_) => ValueType::Integer,
            Value::Period(_) => ValueType::Period,
            Value::Recur(_) => ValueType::Recur,
            Value::Text(_) => ValueType::Text,
            Value::Time(_) => ValueType::Time,
            Value::Uri(_) => ValueType::Uri,
            Value::UtcOffset(_) => ValueType::UtcOffset,
            Value::Other(unknown) => ValueType::Other(unknown.type_name.clone()),
        }
    }

    /// Returns the value as a date-time or date when it is one.
    pub fn as_date_time_or_date(&self) -> Option<DateTimeOrDate> {
        match self {
            Value::Date(date) => Some(DateTimeOrDate::Date(*date)),
            Value::DateTime(dt) => Some(DateTimeOrDate::DateTime(*dt)),
            _ => None,
        }
    }
}

/// Constructs a [`Date`] from input of the form `yyyy;MM;dd`. Will panic if
/// the given date is invalid according to [`Date::from_ymd_opt`].
#[macro_export]
macro_rules! date {
    ($year:expr ; $month:expr ; $day:expr) => {
        $crate::model::primitive::Date::from_ymd_opt($year, $month, $day).unwrap()
    };
}

/// Constructs a [`Time`] from input of the form `hh;mm;ss, <format>`. Will
/// panic on an impossible clock reading.
#[macro_export]
macro_rules! time {
    ($hours:expr ; $minutes:expr ; $seconds:expr, $format:ident) => {
        $crate::model::primitive::Time {
            raw: $crate::model::primitive::RawTime::new($hours, $minutes, $seconds).unwrap(),
            format: $crate::model::primitive::TimeFormat::$format,
        }
    };
}

/// Constructs a [`DateTime`] from input of the form
/// `yyyy;MM;dd T hh;mm;ss, <format>`.
#[macro_export]
macro_rules! datetime {
    ($year:expr ; $month:expr ; $day:expr, $hours:expr ; $minutes:expr ; $seconds:expr, $format:ident) => {
        $crate::model::primitive::DateTime {
            date: $crate::date!($year;$month;$day),
            time: $crate::time!($hours;$minutes;$seconds, $format),
        }
    };
}
