//! Collaborator interfaces the core consumes: timezone resolution and the
//! security policy.
//!
//! The parser performs no network I/O and ships no timezone database; hosts
//! plug in whatever source of zone data they have by implementing
//! [`TimezoneResolver`]. When a TZID cannot be resolved the parser emits a
//! warning and the value behaves as floating local time.

use hashbrown::HashMap;

use crate::model::primitive::{Date, RawTime};

/// A resolved timezone.
pub trait Zone {
    /// The offset from UTC in seconds, east positive, in effect at the
    /// given local wall-clock reading.
    fn offset_at(&self, date: Date, time: RawTime) -> i32;

    /// The zone's display name at the given local wall-clock reading.
    fn name_at(&self, date: Date, time: RawTime) -> String;
}

/// Maps TZID strings to zones.
pub trait TimezoneResolver {
    fn resolve(&self, tzid: &str) -> Option<Box<dyn Zone>>;
}

/// The default resolver: knows no zones, so every TZID value falls back to
/// floating local time (with a warning during parsing).
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatingResolver;

impl TimezoneResolver for FloatingResolver {
    fn resolve(&self, _tzid: &str) -> Option<Box<dyn Zone>> {
        None
    }
}

/// A zone with a constant offset from UTC.
#[derive(Debug, Clone)]
pub struct FixedZone {
    offset_seconds: i32,
    name: String,
}

impl FixedZone {
    pub fn new(offset_seconds: i32, name: impl Into<String>) -> Self {
        Self {
            offset_seconds,
            name: name.into(),
        }
    }

    /// UTC itself.
    pub fn utc() -> Self {
        Self::new(0, "UTC")
    }
}

impl Zone for FixedZone {
    fn offset_at(&self, _date: Date, _time: RawTime) -> i32 {
        self.offset_seconds
    }

    fn name_at(&self, _date: Date, _time: RawTime) -> String {
        self.name.clone()
    }
}

/// A resolver backed by a fixed TZID table.
#[derive(Debug, Clone, Default)]
pub struct TableResolver {
    zones: HashMap<String, FixedZone>,
}

impl TableResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zone(mut self, tzid: impl Into<String>, zone: FixedZone) -> Self {
        self.zones.insert(tzid.into(), zone);
        self
    }
}

impl TimezoneResolver for TableResolver {
    fn resolve(&self, tzid: &str) -> Option<Box<dyn Zone>> {
        self.zones
            .get(tzid)
            .cloned()
            .map(|zone| Box::new(zone) as Box<dyn Zone>)
    }
}

/// Host hooks consulted while parsing.
pub trait SecurityPolicy {
    /// Whether a URI with the given scheme may enter the model. Rejections
    /// surface as `ICAL-SEC-URI-SCHEME` errors.
    fn allow_uri_scheme(&self, _scheme: &str) -> bool {
        true
    }

    /// The maximum BEGIN/END nesting depth; exceeding it surfaces as
    /// `ICAL-SEC-DEPTH`.
    fn max_component_depth(&self) -> usize {
        16
    }

    /// The maximum decoded size of inline BINARY data in octets.
    fn max_data_size(&self) -> usize {
        16 * 1024 * 1024
    }
}

/// The default policy: every scheme allowed, 16 levels of nesting, 16 MiB
/// of inline data.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

impl SecurityPolicy for DefaultPolicy {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date;

    #[test]
    fn fixed_zone_offsets() {
        let zone = FixedZone::new(3600, "CET");
        let noon = RawTime::new(12, 0, 0).unwrap();
        assert_eq!(zone.offset_at(date!(2026;1;1), noon), 3600);
        assert_eq!(zone.name_at(date!(2026;1;1), noon), "CET");
    }

    #[test]
    fn table_resolver_lookup() {
        let resolver =
            TableResolver::new().with_zone("Europe/Berlin", FixedZone::new(3600, "CET"));

        assert!(resolver.resolve("Europe/Berlin").is_some());
        assert!(resolver.resolve("Mars/Olympus").is_none());
        assert!(FloatingResolver.resolve("Europe/Berlin").is_none());
    }
}
