//! Per-rule candidate generation.
//!
//! Each RRULE becomes a [`RuleIter`]: a state machine that walks frequency
//! periods from DTSTART, expands every period into its candidate instants
//! via the BYxxx pipeline (BYMONTH → BYWEEKNO → BYYEARDAY → BYMONTHDAY →
//! BYDAY → BYHOUR → BYMINUTE → BYSECOND, then BYSETPOS), and yields wall
//! stamps in ascending order until COUNT or UNTIL is exhausted.
//!
//! Before generation the rule is normalized with the frequency-dependent
//! implicit defaults: a MONTHLY rule with no day parts takes DTSTART's day,
//! a WEEKLY rule with no BYDAY takes DTSTART's weekday, and the time parts
//! default to DTSTART's clock reading. After normalization every BY part is
//! a plain filter or expansion over the period, which keeps the pipeline
//! uniform.

use std::collections::VecDeque;

use super::calendar::{
    SECONDS_PER_DAY, date_to_days, days_from_civil, days_in_month, days_in_year, days_to_date,
    stamp_days, stamp_time, week_of, weekday_index, weekday_of, weeks_in_year,
};
use crate::model::primitive::{Date, DateTimeOrDate, RawTime, Weekday};
use crate::model::rrule::{Freq, RRule};
use crate::parser::error::ErrorKind;

/// Periods that produce no candidates before the iterator gives up. This
/// bounds rules whose filters can never match (such as FREQ=YEARLY;
/// BYMONTH=2;BYMONTHDAY=30) instead of spinning forever.
const MAX_EMPTY_PERIODS: u32 = 1000;

/// DTSTART, pre-digested for period math.
#[derive(Debug, Clone, Copy)]
pub(super) struct Start {
    pub day: i64,
    pub stamp: i64,
    pub date: Date,
    pub time: RawTime,
}

impl Start {
    pub(super) fn new(value: DateTimeOrDate) -> Self {
        let date = value.date();
        let time = value.raw_time();
        let day = date_to_days(date);
        Self {
            day,
            stamp: super::calendar::stamp(day, time),
            date,
            time,
        }
    }
}

/// A rule with the implicit defaults applied and every list resolved.
#[derive(Debug, Clone)]
pub(super) struct RuleNorm {
    freq: Freq,
    interval: i64,
    pub(super) count: Option<u32>,
    until: Option<i64>,
    wkst: Weekday,
    by_month: Vec<u8>,
    by_week_no: Vec<i8>,
    by_year_day: Vec<i16>,
    by_month_day: Vec<i8>,
    by_day_plain: Vec<Weekday>,
    by_day_ord: Vec<(i8, Weekday)>,
    by_hour: Vec<u8>,
    by_minute: Vec<u8>,
    by_second: Vec<u8>,
    by_set_pos: Vec<i16>,
    /// Seconds-of-day expansion for DAILY and coarser frequencies.
    timeset: Vec<i64>,
}

impl RuleNorm {
    pub(super) fn new(rule: &RRule, start: &Start) -> Result<Self, ErrorKind> {
        let freq = rule.freq().ok_or(ErrorKind::RRuleMissingFreq)?;

        let mut by_day_plain = Vec::new();
        let mut by_day_ord = Vec::new();
        let ordinals_apply = match freq {
            Freq::Monthly => true,
            Freq::Yearly => rule.by_week_no.is_empty(),
            _ => false,
        };
        for entry in &rule.by_day {
            match entry.ordinal {
                Some(ord) if ordinals_apply => by_day_ord.push((ord, entry.weekday)),
                _ => by_day_plain.push(entry.weekday),
            }
        }

        let mut by_month = rule.by_month.clone();
        let mut by_month_day = rule.by_month_day.clone();

        let day_parts_empty = rule.by_week_no.is_empty()
            && rule.by_year_day.is_empty()
            && rule.by_month_day.is_empty()
            && rule.by_day.is_empty();

        if day_parts_empty {
            match freq {
                Freq::Yearly => {
                    if by_month.is_empty() {
                        by_month = vec![start.date.month()];
                    }
                    by_month_day = vec![start.date.day() as i8];
                }
                Freq::Monthly => by_month_day = vec![start.date.day() as i8],
                Freq::Weekly => by_day_plain = vec![weekday_of(start.day)],
                _ => (),
            }
        }

        let timeset = if freq >= Freq::Daily {
            let hours: Vec<u8> = defaulted(&rule.by_hour, start.time.hours);
            let minutes: Vec<u8> = defaulted(&rule.by_minute, start.time.minutes);
            let seconds: Vec<u8> = defaulted(&rule.by_second, start.time.seconds);

            let mut timeset = Vec::with_capacity(hours.len() * minutes.len() * seconds.len());
            for &h in &hours {
                for &m in &minutes {
                    for &s in &seconds {
                        timeset
                            .push(i64::from(h) * 3600 + i64::from(m) * 60 + i64::from(s));
                    }
                }
            }
            timeset.sort_unstable();
            timeset
        } else {
            Vec::new()
        };

        let until = rule.until.map(|u| {
            let day = date_to_days(u.date());
            super::calendar::stamp(day, u.raw_time())
        });

        Ok(Self {
            freq,
            interval: i64::from(rule.interval()),
            count: rule.count.map(|c| c.get()),
            until,
            wkst: rule.week_start(),
            by_month,
            by_week_no: rule.by_week_no.clone(),
            by_year_day: rule.by_year_day.clone(),
            by_month_day,
            by_day_plain,
            by_day_ord,
            by_hour: rule.by_hour.clone(),
            by_minute: rule.by_minute.clone(),
            by_second: rule.by_second.clone(),
            by_set_pos: rule.by_set_pos.clone(),
            timeset,
        })
    }

    /// All candidate stamps of period `k`, sorted, BYSETPOS applied, not
    /// yet bounded by DTSTART/COUNT/UNTIL. `None` means the period walked
    /// off the supported calendar and the rule is exhausted.
    fn period_stamps(&self, k: i64, start: &Start) -> Option<Vec<i64>> {
        let mut stamps = match self.freq {
            Freq::Yearly => {
                let year = i64::from(start.date.year()) + k * self.interval;
                if !(1..=9999).contains(&year) {
                    return None;
                }
                self.expand_times(&self.year_days(year))
            }
            Freq::Monthly => {
                let months =
                    i64::from(start.date.year()) * 12 + i64::from(start.date.month()) - 1
                        + k * self.interval;
                let year = months.div_euclid(12);
                let month = (months.rem_euclid(12) + 1) as u8;
                if !(1..=9999).contains(&year) {
                    return None;
                }

                if !self.by_month.is_empty() && !self.by_month.contains(&month) {
                    Vec::new()
                } else {
                    self.expand_times(&self.month_days(year, month))
                }
            }
            Freq::Weekly => {
                let anchor = start.day
                    - (weekday_index(start.day) - i64::from(self.wkst.index_from_monday()))
                        .rem_euclid(7);
                let week = anchor + k * 7 * self.interval;
                days_to_date(week)?;

                let days: Vec<i64> = (week..week + 7)
                    .filter(|&d| self.passes_date(d, None, &[]))
                    .collect();
                self.expand_times(&days)
            }
            Freq::Daily => {
                let day = start.day + k * self.interval;
                days_to_date(day)?;

                if self.passes_date(day, None, &[]) {
                    self.expand_times(&[day])
                } else {
                    Vec::new()
                }
            }
            Freq::Hourly | Freq::Minutely | Freq::Secondly => {
                let unit = match self.freq {
                    Freq::Hourly => 3600,
                    Freq::Minutely => 60,
                    _ => 1,
                };
                let cursor = start.stamp + k * self.interval * unit;
                let day = stamp_days(cursor);
                days_to_date(day)?;

                self.sub_daily_stamps(cursor, day)
            }
        };

        stamps.sort_unstable();
        stamps.dedup();

        if !self.by_set_pos.is_empty() {
            let len = stamps.len() as i64;
            let mut picked: Vec<i64> = self
                .by_set_pos
                .iter()
                .filter_map(|&n| {
                    let index = if n > 0 { i64::from(n) - 1 } else { len + i64::from(n) };
                    (0..len).contains(&index).then(|| stamps[index as usize])
                })
                .collect();
            picked.sort_unstable();
            picked.dedup();
            stamps = picked;
        }

        Some(stamps)
    }

    fn sub_daily_stamps(&self, cursor: i64, day: i64) -> Vec<i64> {
        if !self.passes_date(day, None, &[]) {
            return Vec::new();
        }

        let time = stamp_time(cursor);
        if !self.by_hour.is_empty() && !self.by_hour.contains(&time.hours) {
            return Vec::new();
        }

        match self.freq {
            Freq::Hourly => {
                let minutes: Vec<u8> = defaulted(&self.by_minute, time.minutes);
                let seconds: Vec<u8> = defaulted(&self.by_second, time.seconds);
                let hour_base = day * SECONDS_PER_DAY + i64::from(time.hours) * 3600;

                let mut out = Vec::with_capacity(minutes.len() * seconds.len());
                for &m in &minutes {
                    for &s in &seconds {
                        out.push(hour_base + i64::from(m) * 60 + i64::from(s));
                    }
                }
                out
            }
            Freq::Minutely => {
                if !self.by_minute.is_empty() && !self.by_minute.contains(&time.minutes) {
                    return Vec::new();
                }

                let seconds: Vec<u8> = defaulted(&self.by_second, time.seconds);
                let minute_base = cursor - i64::from(time.seconds);
                seconds
                    .iter()
                    .map(|&s| minute_base + i64::from(s))
                    .collect()
            }
            _ => {
                if !self.by_minute.is_empty() && !self.by_minute.contains(&time.minutes) {
                    return Vec::new();
                }
                if !self.by_second.is_empty() && !self.by_second.contains(&time.seconds) {
                    return Vec::new();
                }
                vec![cursor]
            }
        }
    }

    /// The filtered days of a YEARLY period.
    fn year_days(&self, year: i64) -> Vec<i64> {
        let jan1 = days_from_civil(year, 1, 1);
        let length = days_in_year(year);
        let ordinal_days = self.ordinal_days_in_year(year);

        (jan1..jan1 + length)
            .filter(|&d| self.passes_date(d, Some(year), &ordinal_days))
            .collect()
    }

    /// The filtered days of a MONTHLY period.
    fn month_days(&self, year: i64, month: u8) -> Vec<i64> {
        let first = days_from_civil(year, i64::from(month), 1);
        let length = days_in_month(year, month);
        let ordinal_days = self.ordinal_days_in_month(year, month);

        (first..first + length)
            .filter(|&d| self.passes_date(d, None, &ordinal_days))
            .collect()
    }

    /// The common date filter pipeline. `week_year` pins BYWEEKNO
    /// membership to the period's own week-numbering year (YEARLY);
    /// `ordinal_days` is the period-scoped `nTH`-style BYDAY selection.
    fn passes_date(&self, day: i64, week_year: Option<i64>, ordinal_days: &[i64]) -> bool {
        let Some(date) = days_to_date(day) else {
            return false;
        };

        if !self.by_month.is_empty() && !self.by_month.contains(&date.month()) {
            return false;
        }

        if !self.by_week_no.is_empty() {
            let (wyear, wno) = week_of(day, self.wkst);
            if week_year.is_some_and(|y| y != wyear) {
                return false;
            }

            let total = weeks_in_year(wyear, self.wkst);
            let selected = self.by_week_no.iter().any(|&n| {
                let resolved = if n > 0 { i64::from(n) } else { total + i64::from(n) + 1 };
                resolved == wno
            });
            if !selected {
                return false;
            }
        }

        if !self.by_year_day.is_empty() {
            let year = i64::from(date.year());
            let yday = day - days_from_civil(year, 1, 1) + 1;
            let total = days_in_year(year);
            let selected = self.by_year_day.iter().any(|&n| {
                let resolved = if n > 0 { i64::from(n) } else { total + i64::from(n) + 1 };
                resolved == yday
            });
            if !selected {
                return false;
            }
        }

        if !self.by_month_day.is_empty() {
            let length = days_in_month(i64::from(date.year()), date.month());
            let selected = self.by_month_day.iter().any(|&n| {
                let resolved = if n > 0 { i64::from(n) } else { length + i64::from(n) + 1 };
                resolved == i64::from(date.day())
            });
            if !selected {
                return false;
            }
        }

        if !self.by_day_plain.is_empty() || !self.by_day_ord.is_empty() {
            let weekday = weekday_of(day);
            if !self.by_day_plain.contains(&weekday) && !ordinal_days.contains(&day) {
                return false;
            }
        }

        true
    }

    /// Resolves `nTH`-style BYDAY entries within a year (or within each
    /// selected month when BYMONTH restricts the scope).
    fn ordinal_days_in_year(&self, year: i64) -> Vec<i64> {
        if self.by_day_ord.is_empty() {
            return Vec::new();
        }

        if self.by_month.is_empty() {
            let first = days_from_civil(year, 1, 1);
            let length = days_in_year(year);
            self.resolve_ordinals(first, length)
        } else {
            let mut days = Vec::new();
            for &month in &self.by_month {
                let first = days_from_civil(year, i64::from(month), 1);
                days.extend(self.resolve_ordinals(first, days_in_month(year, month)));
            }
            days
        }
    }

    fn ordinal_days_in_month(&self, year: i64, month: u8) -> Vec<i64> {
        if self.by_day_ord.is_empty() {
            return Vec::new();
        }

        let first = days_from_civil(year, i64::from(month), 1);
        self.resolve_ordinals(first, days_in_month(year, month))
    }

    /// The days selected by the ordinal BYDAY entries inside the span
    /// `[first, first + length)`. Out-of-span ordinals are dropped.
    fn resolve_ordinals(&self, first: i64, length: i64) -> Vec<i64> {
        let last = first + length - 1;

        self.by_day_ord
            .iter()
            .filter_map(|&(ord, weekday)| {
                let target = i64::from(weekday.index_from_monday());
                let day = if ord > 0 {
                    let first_match = first + (target - weekday_index(first)).rem_euclid(7);
                    first_match + (i64::from(ord) - 1) * 7
                } else {
                    let last_match = last - (weekday_index(last) - target).rem_euclid(7);
                    last_match + (i64::from(ord) + 1) * 7
                };

                (first..=last).contains(&day).then_some(day)
            })
            .collect()
    }

    fn expand_times(&self, days: &[i64]) -> Vec<i64> {
        let mut stamps = Vec::with_capacity(days.len() * self.timeset.len());
        for &day in days {
            for &secs in &self.timeset {
                stamps.push(day * SECONDS_PER_DAY + secs);
            }
        }
        stamps
    }
}

fn defaulted(list: &[u8], fallback: u8) -> Vec<u8> {
    if list.is_empty() {
        vec![fallback]
    } else {
        let mut sorted = list.to_vec();
        sorted.sort_unstable();
        sorted
    }
}

/// The per-rule stream of ascending wall stamps.
#[derive(Debug)]
pub(super) struct RuleIter {
    norm: RuleNorm,
    start: Start,
    k: i64,
    buffer: VecDeque<i64>,
    count_left: Option<u32>,
    empty_streak: u32,
    done: bool,
}

impl RuleIter {
    pub(super) fn new(norm: RuleNorm, start: Start) -> Self {
        let count_left = norm.count;
        Self {
            norm,
            start,
            k: 0,
            buffer: VecDeque::new(),
            count_left,
            empty_streak: 0,
            done: false,
        }
    }

    pub(super) fn next_stamp(&mut self) -> Option<i64> {
        loop {
            if self.done {
                return None;
            }

            if let Some(stamp) = self.buffer.pop_front() {
                if self.norm.until.is_some_and(|until| stamp > until) {
                    self.done = true;
                    return None;
                }

                if let Some(count) = &mut self.count_left {
                    if *count == 0 {
                        self.done = true;
                        return None;
                    }
                    *count -= 1;
                }

                return Some(stamp);
            }

            if self.count_left == Some(0) {
                self.done = true;
                return None;
            }

            match self.norm.period_stamps(self.k, &self.start) {
                None => {
                    self.done = true;
                    return None;
                }
                Some(stamps) => {
                    self.k += 1;
                    self.buffer
                        .extend(stamps.into_iter().filter(|&s| s >= self.start.stamp));

                    if self.buffer.is_empty() {
                        self.empty_streak += 1;
                        if self.empty_streak > MAX_EMPTY_PERIODS {
                            self.done = true;
                            return None;
                        }
                    } else {
                        self.empty_streak = 0;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::rrule::WeekdayNum;
    use crate::{date, datetime};
    use std::num::NonZero;

    fn starts(rule: &RRule, dtstart: DateTimeOrDate, limit: usize) -> Vec<String> {
        let start = Start::new(dtstart);
        let norm = RuleNorm::new(rule, &start).unwrap();
        let mut iter = RuleIter::new(norm, start);

        let mut out = Vec::new();
        while out.len() < limit {
            let Some(stamp) = iter.next_stamp() else { break };
            let date = days_to_date(stamp_days(stamp)).unwrap();
            out.push(format!("{date}T{}", stamp_time(stamp)));
        }
        out
    }

    fn rule(text: &str) -> RRule {
        use crate::parser::config::{Mode, ParseContext};
        use crate::parser::rrule::parse_rrule;
        use crate::tz::{DefaultPolicy, FloatingResolver};

        let mut warnings = Vec::new();
        let mut ctx =
            ParseContext::new(Mode::Strict, &mut warnings, &DefaultPolicy, &FloatingResolver);
        parse_rrule(text, &mut ctx).unwrap()
    }

    #[test]
    fn daily_count() {
        let got = starts(
            &rule("FREQ=DAILY;COUNT=5"),
            datetime!(2026;1;1, 9;0;0, Local).into(),
            10,
        );
        assert_eq!(
            got,
            [
                "20260101T090000",
                "20260102T090000",
                "20260103T090000",
                "20260104T090000",
                "20260105T090000",
            ]
        );
    }

    #[test]
    fn daily_interval_until() {
        let got = starts(
            &rule("FREQ=DAILY;INTERVAL=2;UNTIL=20260107T090000"),
            datetime!(2026;1;1, 9;0;0, Local).into(),
            10,
        );
        assert_eq!(
            got,
            [
                "20260101T090000",
                "20260103T090000",
                "20260105T090000",
                "20260107T090000",
            ]
        );
    }

    #[test]
    fn weekly_byday() {
        // DTSTART on a Monday; MO and WE of each week
        let got = starts(
            &rule("FREQ=WEEKLY;BYDAY=MO,WE;COUNT=4"),
            datetime!(2026;3;2, 10;0;0, Local).into(),
            10,
        );
        assert_eq!(
            got,
            [
                "20260302T100000",
                "20260304T100000",
                "20260309T100000",
                "20260311T100000",
            ]
        );
    }

    #[test]
    fn weekly_defaults_to_start_weekday() {
        let got = starts(
            &rule("FREQ=WEEKLY;INTERVAL=2;COUNT=3"),
            datetime!(2026;1;6, 9;0;0, Local).into(),
            10,
        );
        assert_eq!(
            got,
            ["20260106T090000", "20260120T090000", "20260203T090000"]
        );
    }

    #[test]
    fn monthly_second_tuesday() {
        let got = starts(
            &rule("FREQ=MONTHLY;BYDAY=2TU;COUNT=6"),
            datetime!(2026;1;1, 9;0;0, Local).into(),
            10,
        );
        assert_eq!(
            got,
            [
                "20260113T090000",
                "20260210T090000",
                "20260310T090000",
                "20260414T090000",
                "20260512T090000",
                "20260609T090000",
            ]
        );
    }

    #[test]
    fn monthly_last_weekday_via_setpos() {
        let got = starts(
            &rule("FREQ=MONTHLY;BYDAY=MO,TU,WE,TH,FR;BYSETPOS=-1;COUNT=4"),
            datetime!(2026;1;1, 9;0;0, Local).into(),
            10,
        );
        assert_eq!(
            got,
            [
                "20260130T090000",
                "20260227T090000",
                "20260331T090000",
                "20260430T090000",
            ]
        );
    }

    #[test]
    fn monthly_day_31_skips_short_months() {
        let got = starts(
            &rule("FREQ=MONTHLY;COUNT=4"),
            datetime!(2026;1;31, 12;0;0, Local).into(),
            10,
        );
        // February, April, June, September, November have no 31st
        assert_eq!(
            got,
            [
                "20260131T120000",
                "20260331T120000",
                "20260531T120000",
                "20260731T120000",
            ]
        );
    }

    #[test]
    fn monthly_negative_monthday() {
        let got = starts(
            &rule("FREQ=MONTHLY;BYMONTHDAY=-1;COUNT=3"),
            datetime!(2026;1;1, 8;0;0, Local).into(),
            10,
        );
        assert_eq!(
            got,
            ["20260131T080000", "20260228T080000", "20260331T080000"]
        );
    }

    #[test]
    fn yearly_defaults_to_start_date() {
        let got = starts(
            &rule("FREQ=YEARLY;COUNT=3"),
            datetime!(2026;2;6, 9;30;0, Local).into(),
            10,
        );
        assert_eq!(
            got,
            ["20260206T093000", "20270206T093000", "20280206T093000"]
        );
    }

    #[test]
    fn yearly_leap_day_skips_common_years() {
        let got = starts(
            &rule("FREQ=YEARLY;COUNT=3"),
            datetime!(2024;2;29, 10;0;0, Local).into(),
            10,
        );
        assert_eq!(
            got,
            ["20240229T100000", "20280229T100000", "20320229T100000"]
        );
    }

    #[test]
    fn yearly_bymonth_byday() {
        // every Thursday of January
        let got = starts(
            &rule("FREQ=YEARLY;BYMONTH=1;BYDAY=TH;COUNT=6"),
            datetime!(2026;1;1, 9;0;0, Local).into(),
            10,
        );
        assert_eq!(
            got,
            [
                "20260101T090000",
                "20260108T090000",
                "20260115T090000",
                "20260122T090000",
                "20260129T090000",
                "20270107T090000",
            ]
        );
    }

    #[test]
    fn yearly_byweekno() {
        let got = starts(
            &rule("FREQ=YEARLY;BYWEEKNO=20;BYDAY=MO;COUNT=3"),
            datetime!(1997;5;12, 9;0;0, Local).into(),
            10,
        );
        assert_eq!(
            got,
            ["19970512T090000", "19980511T090000", "19990517T090000"]
        );
    }

    #[test]
    fn yearly_byyearday_negative() {
        let got = starts(
            &rule("FREQ=YEARLY;BYYEARDAY=-1;COUNT=2"),
            datetime!(2026;1;1, 0;0;0, Local).into(),
            10,
        );
        assert_eq!(got, ["20261231T000000", "20271231T000000"]);
    }

    #[test]
    fn first_occurrence_respects_filters() {
        // DTSTART (Jan 1) is not a Tuesday, so it is not an occurrence
        let got = starts(
            &rule("FREQ=MONTHLY;BYDAY=2TU;COUNT=1"),
            datetime!(2026;1;1, 9;0;0, Local).into(),
            10,
        );
        assert_eq!(got, ["20260113T090000"]);
    }

    #[test]
    fn hourly_with_byminute_expansion() {
        let got = starts(
            &rule("FREQ=HOURLY;INTERVAL=6;BYMINUTE=0,30;COUNT=4"),
            datetime!(2026;1;1, 9;0;0, Local).into(),
            10,
        );
        assert_eq!(
            got,
            [
                "20260101T090000",
                "20260101T093000",
                "20260101T150000",
                "20260101T153000",
            ]
        );
    }

    #[test]
    fn minutely_counts() {
        let got = starts(
            &rule("FREQ=MINUTELY;INTERVAL=90;COUNT=3"),
            datetime!(2026;1;1, 9;0;0, Local).into(),
            10,
        );
        assert_eq!(
            got,
            ["20260101T090000", "20260101T103000", "20260101T120000"]
        );
    }

    #[test]
    fn daily_byhour_expands_within_day() {
        let got = starts(
            &rule("FREQ=DAILY;BYHOUR=8,18;COUNT=4"),
            datetime!(2026;1;1, 9;0;0, Local).into(),
            10,
        );
        // 08:00 on day one precedes DTSTART and is dropped
        assert_eq!(
            got,
            [
                "20260101T180000",
                "20260102T080000",
                "20260102T180000",
                "20260103T080000",
            ]
        );
    }

    #[test]
    fn impossible_rule_terminates() {
        let got = starts(
            &rule("FREQ=YEARLY;BYMONTH=2;BYMONTHDAY=30;COUNT=3"),
            datetime!(2026;1;1, 9;0;0, Local).into(),
            10,
        );
        assert!(got.is_empty());
    }

    #[test]
    fn until_is_inclusive() {
        let got = starts(
            &rule("FREQ=DAILY;UNTIL=20260103T090000"),
            datetime!(2026;1;1, 9;0;0, Local).into(),
            10,
        );
        assert_eq!(got.len(), 3);
        assert_eq!(got.last().unwrap(), "20260103T090000");
    }

    #[test]
    fn date_only_start_expands_dates() {
        let got = starts(
            &rule("FREQ=WEEKLY;COUNT=3"),
            date!(2026;4;19).into(),
            10,
        );
        assert_eq!(
            got,
            ["20260419T000000", "20260426T000000", "20260503T000000"]
        );
    }

    #[test]
    fn norm_applies_monthly_default() {
        let start = Start::new(datetime!(2026;1;15, 9;0;0, Local).into());
        let norm = RuleNorm::new(&rule("FREQ=MONTHLY"), &start).unwrap();
        assert_eq!(norm.by_month_day, vec![15]);

        let with_byday = RuleNorm::new(&rule("FREQ=MONTHLY;BYDAY=2TU"), &start).unwrap();
        assert!(with_byday.by_month_day.is_empty());
        assert_eq!(with_byday.by_day_ord, vec![(2, Weekday::Tuesday)]);
    }

    #[test]
    fn missing_freq_is_rejected() {
        let start = Start::new(datetime!(2026;1;1, 0;0;0, Local).into());
        let bare = RRule {
            count: NonZero::new(1),
            by_day: vec![WeekdayNum {
                ordinal: None,
                weekday: Weekday::Monday,
            }],
            ..RRule::default()
        };
        assert_eq!(
            RuleNorm::new(&bare, &start).unwrap_err(),
            ErrorKind::RRuleMissingFreq
        );
    }
}
