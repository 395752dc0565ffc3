//! Recurrence rule types (RFC 5545 §3.3.10).

use std::fmt;

use strum::EnumString;

use super::primitive::{DateTimeOrDate, PositiveInteger, Weekday};

/// A recurrence frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Freq {
    #[strum(serialize = "SECONDLY")]
    Secondly,
    #[strum(serialize = "MINUTELY")]
    Minutely,
    #[strum(serialize = "HOURLY")]
    Hourly,
    #[strum(serialize = "DAILY")]
    Daily,
    #[strum(serialize = "WEEKLY")]
    Weekly,
    #[strum(serialize = "MONTHLY")]
    Monthly,
    #[strum(serialize = "YEARLY")]
    Yearly,
}

impl Freq {
    pub const fn as_str(self) -> &'static str {
        match self {
            Freq::Secondly => "SECONDLY",
            Freq::Minutely => "MINUTELY",
            Freq::Hourly => "HOURLY",
            Freq::Daily => "DAILY",
            Freq::Weekly => "WEEKLY",
            Freq::Monthly => "MONTHLY",
            Freq::Yearly => "YEARLY",
        }
    }
}

impl fmt::Display for Freq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A weekday with an optional ordinal, as in `2TU` or `-1FR`.
///
/// The ordinal is nonzero and its magnitude is at most 53; these bounds are
/// enforced by the parser rather than the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekdayNum {
    pub ordinal: Option<i8>,
    pub weekday: Weekday,
}

impl fmt::Display for WeekdayNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ordinal) = self.ordinal {
            write!(f, "{ordinal}")?;
        }
        write!(f, "{}", self.weekday)
    }
}

/// A parsed RRULE.
///
/// `interval` and `wkst` keep track of whether the part occurred in the
/// source; [`RRule::interval`] and [`RRule::week_start`] apply the RFC 5545
/// defaults. COUNT and UNTIL are mutually exclusive, which the parser
/// enforces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RRule {
    pub freq: Option<Freq>,
    pub interval: Option<PositiveInteger>,
    pub count: Option<PositiveInteger>,
    pub until: Option<DateTimeOrDate>,
    pub by_second: Vec<u8>,
    pub by_minute: Vec<u8>,
    pub by_hour: Vec<u8>,
    pub by_day: Vec<WeekdayNum>,
    pub by_month_day: Vec<i8>,
    pub by_year_day: Vec<i16>,
    pub by_week_no: Vec<i8>,
    pub by_month: Vec<u8>,
    pub by_set_pos: Vec<i16>,
    pub wkst: Option<Weekday>,
}

impl RRule {
    /// A rule with the given frequency and nothing else.
    pub fn new(freq: Freq) -> Self {
        Self {
            freq: Some(freq),
            ..Self::default()
        }
    }

    /// The effective frequency. The parser never produces a rule without
    /// one; a hand-built rule missing FREQ is rejected at expansion time.
    pub fn freq(&self) -> Option<Freq> {
        self.freq
    }

    /// The effective interval, defaulting to 1.
    pub fn interval(&self) -> u32 {
        self.interval.map_or(1, PositiveInteger::get)
    }

    /// The effective week start, defaulting to Monday.
    pub fn week_start(&self) -> Weekday {
        self.wkst.unwrap_or(Weekday::Monday)
    }

    /// Returns `true` when the rule generates infinitely many occurrences.
    pub fn is_unbounded(&self) -> bool {
        self.count.is_none() && self.until.is_none()
    }
}

fn write_list<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    key: &str,
    items: &[T],
) -> fmt::Result {
    if items.is_empty() {
        return Ok(());
    }

    write!(f, ";{key}=")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for RRule {
    /// Prints the canonical semicolon form: FREQ, INTERVAL, COUNT or UNTIL,
    /// the BYxxx parts in RFC order, and WKST, with upper-case keys.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(freq) = self.freq {
            write!(f, "FREQ={freq}")?;
        }

        if let Some(interval) = self.interval {
            write!(f, ";INTERVAL={interval}")?;
        }

        if let Some(count) = self.count {
            write!(f, ";COUNT={count}")?;
        }

        if let Some(until) = self.until {
            write!(f, ";UNTIL={until}")?;
        }

        write_list(f, "BYSECOND", &self.by_second)?;
        write_list(f, "BYMINUTE", &self.by_minute)?;
        write_list(f, "BYHOUR", &self.by_hour)?;
        write_list(f, "BYDAY", &self.by_day)?;
        write_list(f, "BYMONTHDAY", &self.by_month_day)?;
        write_list(f, "BYYEARDAY", &self.by_year_day)?;
        write_list(f, "BYWEEKNO", &self.by_week_no)?;
        write_list(f, "BYMONTH", &self.by_month)?;
        write_list(f, "BYSETPOS", &self.by_set_pos)?;

        if let Some(wkst) = self.wkst {
            write!(f, ";WKST={wkst}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZero;

    use super::*;

    #[test]
    fn canonical_order() {
        let rule = RRule {
            freq: Some(Freq::Monthly),
            interval: NonZero::new(2),
            count: NonZero::new(6),
            by_day: vec![WeekdayNum {
                ordinal: Some(2),
                weekday: Weekday::Tuesday,
            }],
            by_set_pos: vec![-1],
            wkst: Some(Weekday::Sunday),
            ..RRule::default()
        };

        assert_eq!(
            rule.to_string(),
            "FREQ=MONTHLY;INTERVAL=2;COUNT=6;BYDAY=2TU;BYSETPOS=-1;WKST=SU"
        );
    }

    #[test]
    fn defaults() {
        let rule = RRule::new(Freq::Daily);
        assert_eq!(rule.interval(), 1);
        assert_eq!(rule.week_start(), Weekday::Monday);
        assert!(rule.is_unbounded());
        assert_eq!(rule.to_string(), "FREQ=DAILY");
    }
}
