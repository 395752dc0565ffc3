//! The recurrence expander: the occurrence set RRULE ∪ RDATE − EXDATE,
//! emitted lazily in ascending order (RFC 5545 §3.8.5).
//!
//! All generation happens in the wall-clock domain of DTSTART's timezone;
//! a candidate falling into a DST gap is emitted at the same wall time
//! (the preserve-wall policy). Per-rule COUNT limits are applied before
//! EXDATE removal, so `COUNT=5` with one matching EXDATE yields four
//! occurrences.

pub(crate) mod calendar;
mod expander;

use hashbrown::HashSet;

use calendar::{stamp_days, stamp_time, days_to_date};
use expander::{RuleIter, RuleNorm, Start};

use crate::model::component::Component;
use crate::model::primitive::{
    DateTime, DateTimeOrDate, Time, TimeFormat, Value,
};
use crate::model::rrule::RRule;
use crate::parser::error::{CalendarError, ErrorKind};

/// How an occurrence entered the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    RRule,
    RDate,
}

/// One materialized instance of a recurring component.
///
/// `start` preserves DTSTART's flavor: a date for all-day components, a
/// date-time with DTSTART's UTC-or-floating format otherwise; `tzid` is
/// DTSTART's TZID parameter when one applies.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    pub start: DateTimeOrDate,
    pub end: Option<DateTimeOrDate>,
    pub tzid: Option<String>,
    pub origin: Origin,
}

#[derive(Debug, Clone)]
struct RDateEntry {
    stamp: i64,
    end: Option<i64>,
    date_only: bool,
}

/// A prepared, restartable expansion. Every call to [`Expand::iter`] (or
/// iteration of `&Expand`) yields an independent fresh sequence.
#[derive(Debug, Clone)]
pub struct Expand {
    start: Start,
    format: TimeFormat,
    all_day: bool,
    tzid: Option<String>,
    rules: Vec<RRule>,
    rdates: Vec<RDateEntry>,
    exdate_stamps: HashSet<i64>,
    exdate_days: HashSet<i64>,
    end_delta: Option<i64>,
    range_end: Option<i64>,
}

/// Prepares the occurrence expansion of a component.
///
/// `range_end` bounds the emission (`start > range_end` stops the
/// sequence) and is required when any RRULE is unbounded.
pub fn expand(
    component: &Component,
    range_end: Option<DateTimeOrDate>,
) -> Result<Expand, CalendarError> {
    Expand::new(component, range_end)
}

impl Expand {
    pub fn new(
        component: &Component,
        range_end: Option<DateTimeOrDate>,
    ) -> Result<Self, CalendarError> {
        let dtstart_prop = component.property("DTSTART").ok_or_else(|| {
            ErrorKind::MissingProp {
                prop: "DTSTART",
                component: component.name.to_string(),
            }
            .detached()
        })?;

        let dtstart = dtstart_prop
            .value()
            .and_then(Value::as_date_time_or_date)
            .ok_or_else(|| {
                ErrorKind::Value {
                    value_type: crate::model::primitive::ValueType::DateTime,
                    raw: String::new(),
                }
                .detached()
            })?;

        let format = match dtstart {
            DateTimeOrDate::DateTime(dt) => dt.format(),
            DateTimeOrDate::Date(_) => TimeFormat::Local,
        };

        let tzid = match format {
            TimeFormat::Utc => None,
            TimeFormat::Local => dtstart_prop.params.tz_id().map(str::to_owned),
        };

        let start = Start::new(dtstart);

        let rules: Vec<RRule> = component
            .properties_named("RRULE")
            .filter_map(|p| match p.value() {
                Some(Value::Recur(rule)) => Some(rule.clone()),
                _ => None,
            })
            .collect();

        for rule in &rules {
            if rule.freq().is_none() {
                return Err(ErrorKind::RRuleMissingFreq.detached());
            }
            if rule.is_unbounded() && range_end.is_none() {
                return Err(ErrorKind::UnboundedExpansion.detached());
            }
        }

        let mut rdates = Vec::new();
        for prop in component.properties_named("RDATE") {
            for value in prop.values() {
                match value {
                    Value::DateTime(dt) => rdates.push(RDateEntry {
                        stamp: Start::new(DateTimeOrDate::DateTime(*dt)).stamp,
                        end: None,
                        date_only: false,
                    }),
                    Value::Date(date) => rdates.push(RDateEntry {
                        stamp: Start::new(DateTimeOrDate::Date(*date)).stamp,
                        end: None,
                        date_only: true,
                    }),
                    Value::Period(period) => {
                        let start_stamp =
                            Start::new(DateTimeOrDate::DateTime(period.start())).stamp;
                        let end = match period {
                            crate::model::primitive::Period::Explicit { end, .. } => {
                                Start::new(DateTimeOrDate::DateTime(*end)).stamp
                            }
                            crate::model::primitive::Period::Start { duration, .. } => {
                                start_stamp + duration.as_seconds()
                            }
                        };
                        rdates.push(RDateEntry {
                            stamp: start_stamp,
                            end: Some(end),
                            date_only: false,
                        });
                    }
                    _ => (),
                }
            }
        }
        rdates.sort_by_key(|entry| entry.stamp);

        let mut exdate_stamps = HashSet::new();
        let mut exdate_days = HashSet::new();
        for prop in component.properties_named("EXDATE") {
            for value in prop.values() {
                match value {
                    Value::DateTime(dt) => {
                        exdate_stamps.insert(Start::new(DateTimeOrDate::DateTime(*dt)).stamp);
                    }
                    Value::Date(date) => {
                        exdate_days.insert(calendar::date_to_days(*date));
                    }
                    _ => (),
                }
            }
        }

        let end_delta = end_delta_of(component, &start);

        let range_end = range_end.map(|bound| Start::new(bound).stamp);

        Ok(Self {
            start,
            format,
            all_day: dtstart.is_date(),
            tzid,
            rules,
            rdates,
            exdate_stamps,
            exdate_days,
            end_delta,
            range_end,
        })
    }

    /// A fresh occurrence sequence. Sequences are single-consumer but the
    /// expansion itself can be restarted as often as needed.
    pub fn iter(&self) -> OccurrenceIter<'_> {
        let sources = self
            .rules
            .iter()
            .filter_map(|rule| RuleNorm::new(rule, &self.start).ok())
            .map(|norm| Source {
                iter: RuleIter::new(norm, self.start),
                head: None,
                exhausted: false,
            })
            .collect();

        OccurrenceIter {
            exp: self,
            sources,
            rdate_pos: 0,
            base_pending: self.rules.is_empty(),
            last: None,
        }
    }

    fn is_excluded(&self, stamp: i64) -> bool {
        self.exdate_stamps.contains(&stamp) || self.exdate_days.contains(&stamp_days(stamp))
    }

    fn flavor(&self, stamp: i64, date_only: bool) -> Option<DateTimeOrDate> {
        let date = days_to_date(stamp_days(stamp))?;

        if (date_only || self.all_day) && stamp.rem_euclid(calendar::SECONDS_PER_DAY) == 0 {
            Some(DateTimeOrDate::Date(date))
        } else {
            Some(DateTimeOrDate::DateTime(DateTime {
                date,
                time: Time {
                    raw: stamp_time(stamp),
                    format: self.format,
                },
            }))
        }
    }
}

/// The end offset of each occurrence relative to its start, derived from
/// DTEND (events) or DUE (to-dos), falling back to DURATION. Journals have
/// no end.
fn end_delta_of(component: &Component, start: &Start) -> Option<i64> {
    use crate::model::component::ComponentName;

    let anchor = match component.name {
        ComponentName::Event => "DTEND",
        ComponentName::Todo => "DUE",
        _ => return None,
    };

    if let Some(value) = component.property_value(anchor)
        && let Some(end) = value.as_date_time_or_date()
    {
        return Some(Start::new(end).stamp - start.stamp);
    }

    match component.property_value("DURATION") {
        Some(Value::Duration(duration)) => Some(duration.as_seconds()),
        _ => None,
    }
}

struct Source {
    iter: RuleIter,
    head: Option<i64>,
    exhausted: bool,
}

/// The lazy, ordered occurrence stream: a k-way merge of the per-rule
/// streams and the RDATE list, deduplicated, with EXDATE removal applied
/// after the per-rule COUNT limits.
pub struct OccurrenceIter<'a> {
    exp: &'a Expand,
    sources: Vec<Source>,
    rdate_pos: usize,
    base_pending: bool,
    last: Option<i64>,
}

impl OccurrenceIter<'_> {
    fn rule_head(&mut self) -> Option<i64> {
        for source in &mut self.sources {
            if source.head.is_none() && !source.exhausted {
                source.head = source.iter.next_stamp();
                if source.head.is_none() {
                    source.exhausted = true;
                }
            }
        }

        let min = self.sources.iter().filter_map(|s| s.head).min();
        if self.base_pending {
            Some(min.map_or(self.exp.start.stamp, |m| m.min(self.exp.start.stamp)))
        } else {
            min
        }
    }

    fn consume_rules_at(&mut self, stamp: i64) {
        for source in &mut self.sources {
            if source.head == Some(stamp) {
                source.head = None;
            }
        }
        if self.base_pending && stamp == self.exp.start.stamp {
            self.base_pending = false;
        }
    }
}

impl Iterator for OccurrenceIter<'_> {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Occurrence> {
        loop {
            let rule_head = self.rule_head();
            let rdate_head = self.exp.rdates.get(self.rdate_pos).map(|e| e.stamp);

            let (stamp, origin, end_override, date_only) = match (rule_head, rdate_head) {
                (None, None) => return None,
                (Some(rule), Some(rdate)) if rdate < rule => {
                    let entry = &self.exp.rdates[self.rdate_pos];
                    let picked = (rdate, Origin::RDate, entry.end, entry.date_only);
                    self.rdate_pos += 1;
                    picked
                }
                (Some(rule), rdate) => {
                    // an RDATE equal to a generated instant folds into it
                    if rdate == Some(rule) {
                        self.rdate_pos += 1;
                    }
                    self.consume_rules_at(rule);
                    (rule, Origin::RRule, None, self.exp.all_day)
                }
                (None, Some(rdate)) => {
                    let entry = &self.exp.rdates[self.rdate_pos];
                    let picked = (rdate, Origin::RDate, entry.end, entry.date_only);
                    self.rdate_pos += 1;
                    picked
                }
            };

            if self.exp.range_end.is_some_and(|bound| stamp > bound) {
                return None;
            }

            if self.last == Some(stamp) {
                continue;
            }
            self.last = Some(stamp);

            if self.exp.is_excluded(stamp) {
                continue;
            }

            let start = self.exp.flavor(stamp, date_only)?;
            let end = match end_override.or_else(|| self.exp.end_delta.map(|d| stamp + d)) {
                Some(end_stamp) => Some(self.exp.flavor(end_stamp, date_only)?),
                None => None,
            };

            return Some(Occurrence {
                start,
                end,
                tzid: self.exp.tzid.clone(),
                origin,
            });
        }
    }
}

impl<'a> IntoIterator for &'a Expand {
    type Item = Occurrence;
    type IntoIter = OccurrenceIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
