//! Civil-calendar arithmetic for the recurrence engine.
//!
//! Dates are converted to days since 1970-01-01 for all arithmetic and back
//! at the edges. The conversions use the classic era-based civil algorithms,
//! which are exact over the whole proleptic Gregorian range this crate
//! accepts (years 1 through 9999).

use crate::model::primitive::{Date, RawTime, Weekday};

pub(crate) const SECONDS_PER_DAY: i64 = 86_400;

/// Days since 1970-01-01 for a civil date.
pub(crate) fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let mp = if month > 2 { month - 3 } else { month + 9 };
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// The civil date for a number of days since 1970-01-01.
pub(crate) fn civil_from_days(days: i64) -> (i64, u8, u8) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = if m <= 2 { y + 1 } else { y };
    (year, m as u8, d as u8)
}

pub(crate) fn date_to_days(date: Date) -> i64 {
    days_from_civil(i64::from(date.year()), i64::from(date.month()), i64::from(date.day()))
}

pub(crate) fn days_to_date(days: i64) -> Option<Date> {
    let (year, month, day) = civil_from_days(days);
    let year = u16::try_from(year).ok()?;
    Date::from_ymd_opt(year, month, day)
}

/// The weekday of an epoch day, as an index from Monday (0..=6).
pub(crate) fn weekday_index(days: i64) -> i64 {
    // 1970-01-01 was a Thursday
    (days + 3).rem_euclid(7)
}

pub(crate) fn weekday_of(days: i64) -> Weekday {
    // the index is always in 0..=6
    Weekday::from_index_from_monday(weekday_index(days) as u8).unwrap_or(Weekday::Monday)
}

pub(crate) fn days_in_year(year: i64) -> i64 {
    days_from_civil(year + 1, 1, 1) - days_from_civil(year, 1, 1)
}

pub(crate) fn days_in_month(year: i64, month: u8) -> i64 {
    let next = if month == 12 {
        days_from_civil(year + 1, 1, 1)
    } else {
        days_from_civil(year, i64::from(month) + 1, 1)
    };
    next - days_from_civil(year, i64::from(month), 1)
}

/// A wall-clock instant measured in seconds from the 1970-01-01T00:00:00
/// wall reading of its own timeline.
pub(crate) fn stamp(days: i64, time: RawTime) -> i64 {
    days * SECONDS_PER_DAY
        + i64::from(time.hours) * 3600
        + i64::from(time.minutes) * 60
        + i64::from(time.seconds)
}

pub(crate) fn stamp_days(stamp: i64) -> i64 {
    stamp.div_euclid(SECONDS_PER_DAY)
}

pub(crate) fn stamp_time(stamp: i64) -> RawTime {
    let secs = stamp.rem_euclid(SECONDS_PER_DAY);
    RawTime {
        hours: (secs / 3600) as u8,
        minutes: (secs / 60 % 60) as u8,
        seconds: (secs % 60) as u8,
    }
}

/// The epoch day on which week 1 of `year` begins, for weeks starting on
/// `wkst`. Week 1 is the first week containing at least four days of the
/// year, per RFC 5545 §3.3.10.
pub(crate) fn week1_start(year: i64, wkst: Weekday) -> i64 {
    let jan1 = days_from_civil(year, 1, 1);
    let offset = (weekday_index(jan1) - i64::from(wkst.index_from_monday())).rem_euclid(7);

    if offset <= 3 {
        jan1 - offset
    } else {
        jan1 + (7 - offset)
    }
}

pub(crate) fn weeks_in_year(year: i64, wkst: Weekday) -> i64 {
    (week1_start(year + 1, wkst) - week1_start(year, wkst)) / 7
}

/// The week-numbering year and week number of an epoch day.
pub(crate) fn week_of(days: i64, wkst: Weekday) -> (i64, i64) {
    let (year, _, _) = civil_from_days(days);

    if days < week1_start(year, wkst) {
        (year - 1, (days - week1_start(year - 1, wkst)) / 7 + 1)
    } else if days >= week1_start(year + 1, wkst) {
        (year + 1, 1)
    } else {
        (year, (days - week1_start(year, wkst)) / 7 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date;

    #[test]
    fn civil_round_trip() {
        for days in [-719_468, -1, 0, 1, 10_957, 20_000, 2_932_896] {
            let (y, m, d) = civil_from_days(days);
            assert_eq!(days_from_civil(y, i64::from(m), i64::from(d)), days);
        }

        assert_eq!(days_from_civil(1970, 1, 1), 0);
        assert_eq!(days_from_civil(2000, 3, 1), 11_017);
        assert_eq!(civil_from_days(19_723), (2024, 1, 1));
    }

    #[test]
    fn weekday_math() {
        // 1970-01-01 was a Thursday, 2026-01-01 a Thursday as well
        assert_eq!(weekday_of(0), crate::model::primitive::Weekday::Thursday);
        assert_eq!(
            weekday_of(date_to_days(date!(2026;1;1))),
            crate::model::primitive::Weekday::Thursday
        );
        assert_eq!(
            weekday_of(date_to_days(date!(2026;1;13))),
            crate::model::primitive::Weekday::Tuesday
        );
    }

    #[test]
    fn year_and_month_lengths() {
        assert_eq!(days_in_year(2024), 366);
        assert_eq!(days_in_year(2026), 365);
        assert_eq!(days_in_month(2026, 2), 28);
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2026, 4), 30);
    }

    #[test]
    fn stamps_round_trip() {
        let days = date_to_days(date!(2026;2;6));
        let time = RawTime::new(10, 30, 15).unwrap();
        let s = stamp(days, time);
        assert_eq!(stamp_days(s), days);
        assert_eq!(stamp_time(s), time);
    }

    #[test]
    fn iso_weeks_with_monday_start() {
        use crate::model::primitive::Weekday::Monday;

        // 2026-01-01 is a Thursday, so week 1 starts on 2025-12-29
        assert_eq!(
            week1_start(2026, Monday),
            date_to_days(date!(2025;12;29))
        );
        assert_eq!(week_of(date_to_days(date!(2026;1;1)), Monday), (2026, 1));
        assert_eq!(week_of(date_to_days(date!(2025;12;29)), Monday), (2026, 1));
        assert_eq!(week_of(date_to_days(date!(2026;12;28)), Monday), (2026, 53));

        // ISO years 2026 has 53 weeks, 2025 has 52
        assert_eq!(weeks_in_year(2026, Monday), 53);
        assert_eq!(weeks_in_year(2025, Monday), 52);
    }

    #[test]
    fn week_start_day_shifts_numbering() {
        use crate::model::primitive::Weekday::{Monday, Sunday};

        // RFC 5545's WKST example: 1997-W01 with MO starts 1996-12-30,
        // with SU it starts 1996-12-29.
        assert_eq!(
            week1_start(1997, Monday),
            date_to_days(date!(1996;12;30))
        );
        assert_eq!(
            week1_start(1997, Sunday),
            date_to_days(date!(1996;12;29))
        );
    }
}
