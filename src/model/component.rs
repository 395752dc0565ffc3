//! Components and the component tree.

use std::fmt;

use super::property::{Property, ValueSlot};
use crate::model::primitive::Value;

/// The name of a component.
///
/// The closed variants cover RFC 5545, RFC 7953 (VAVAILABILITY/AVAILABLE),
/// and RFC 9073 (PARTICIPANT); everything else is retained as an IANA token
/// or an `X-` vendor name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComponentName {
    Calendar,
    Event,
    Todo,
    Journal,
    FreeBusy,
    TimeZone,
    Standard,
    Daylight,
    Alarm,
    Participant,
    Availability,
    Available,
    Iana(String),
    X(String),
}

impl ComponentName {
    /// Looks a name up case-insensitively. Unknown names are normalized to
    /// upper case and kept.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "VCALENDAR" => Self::Calendar,
            "VEVENT" => Self::Event,
            "VTODO" => Self::Todo,
            "VJOURNAL" => Self::Journal,
            "VFREEBUSY" => Self::FreeBusy,
            "VTIMEZONE" => Self::TimeZone,
            "STANDARD" => Self::Standard,
            "DAYLIGHT" => Self::Daylight,
            "VALARM" => Self::Alarm,
            "PARTICIPANT" => Self::Participant,
            "VAVAILABILITY" => Self::Availability,
            "AVAILABLE" => Self::Available,
            other if other.starts_with("X-") => Self::X(other.to_owned()),
            other => Self::Iana(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Calendar => "VCALENDAR",
            Self::Event => "VEVENT",
            Self::Todo => "VTODO",
            Self::Journal => "VJOURNAL",
            Self::FreeBusy => "VFREEBUSY",
            Self::TimeZone => "VTIMEZONE",
            Self::Standard => "STANDARD",
            Self::Daylight => "DAYLIGHT",
            Self::Alarm => "VALARM",
            Self::Participant => "PARTICIPANT",
            Self::Availability => "VAVAILABILITY",
            Self::Available => "AVAILABLE",
            Self::Iana(name) | Self::X(name) => name,
        }
    }

    /// Returns `true` for component kinds whose occurrences can be expanded.
    pub fn is_recurring_kind(&self) -> bool {
        matches!(self, Self::Event | Self::Todo | Self::Journal)
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named container of properties and sub-components.
///
/// The tree is exclusively owned: a component owns its properties and its
/// children, and no parent pointer exists. Traversals that need the parent
/// carry it in their own context.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub name: ComponentName,
    pub properties: Vec<Property>,
    pub components: Vec<Component>,
}

impl Component {
    pub fn new(name: ComponentName) -> Self {
        Self {
            name,
            properties: Vec::new(),
            components: Vec::new(),
        }
    }

    /// The first property with the given (case-insensitive) name.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// All properties with the given name, in document order.
    pub fn properties_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Property> + 'a {
        self.properties
            .iter()
            .filter(move |p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.property(name).is_some()
    }

    pub fn push_property(&mut self, property: Property) {
        self.properties.push(property);
    }

    pub fn push_component(&mut self, component: Component) {
        self.components.push(component);
    }

    /// Child components with the given name.
    pub fn components_named<'a>(
        &'a self,
        name: &'a ComponentName,
    ) -> impl Iterator<Item = &'a Component> + 'a {
        self.components.iter().filter(move |c| &c.name == name)
    }

    /// The first value of the named property.
    pub fn property_value(&self, name: &str) -> Option<&Value> {
        self.property(name)?.value()
    }

    /// Appends a property built from a name and a value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<ValueSlot>) -> &mut Self {
        self.push_property(Property::new(name, value));
        self
    }
}

/// The required-property table for the closed component vocabulary.
///
/// Mutual-exclusion rules (DTEND/DURATION, DUE/DURATION) and the
/// REPEAT/DURATION pairing are handled separately by the parser since they
/// are not expressible as a plain name list.
pub(crate) fn required_properties(name: &ComponentName) -> &'static [&'static str] {
    match name {
        ComponentName::Calendar => &["PRODID", "VERSION"],
        ComponentName::Event
        | ComponentName::Todo
        | ComponentName::Journal
        | ComponentName::FreeBusy => &["DTSTAMP", "UID"],
        ComponentName::TimeZone => &["TZID"],
        ComponentName::Standard | ComponentName::Daylight => {
            &["DTSTART", "TZOFFSETFROM", "TZOFFSETTO"]
        }
        ComponentName::Alarm => &["ACTION", "TRIGGER"],
        ComponentName::Participant
        | ComponentName::Availability
        | ComponentName::Available
        | ComponentName::Iana(_)
        | ComponentName::X(_) => &[],
    }
}
