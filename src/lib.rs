//! A reader, writer, and recurrence expander for iCalendar (RFC 5545),
//! with support for RFC 6868 parameter value encoding, the RFC 7986
//! property extensions, and RFC 9073 styled descriptions and participants.
//!
//! Data flows bottom-up on read and top-down on write: an octet-aware
//! unfolder produces logical content lines, a two-level scanner splits them
//! into names, parameters, and raw values, a registry of typed codecs
//! decodes the values, and BEGIN/END blocks assemble into a [`Component`]
//! tree. Writing walks the tree back through the codecs and the folder.
//! [`expand`] materializes the occurrence set of a recurring component
//! (RRULE ∪ RDATE − EXDATE) as a lazy ordered sequence.
//!
//! ```
//! let input = b"BEGIN:VCALENDAR\r\n\
//! VERSION:2.0\r\n\
//! PRODID:-//X//Y//EN\r\n\
//! BEGIN:VEVENT\r\n\
//! DTSTAMP:20260206T100000Z\r\n\
//! UID:a@b\r\n\
//! SUMMARY:Hi\r\n\
//! END:VEVENT\r\n\
//! END:VCALENDAR\r\n";
//!
//! let calendar = percale::parse(input).unwrap();
//! assert_eq!(calendar.components[0].property("SUMMARY").unwrap().as_text(), Some("Hi"));
//!
//! // round trip is octet-exact
//! assert_eq!(percale::write(&calendar), input);
//! ```
//!
//! The parser runs in strict mode by default; [`Parser::lenient`] downgrades
//! date, date-time, and summary text failures to warnings and keeps going.
//! Hosts plug in timezone data and security limits through the traits in
//! [`tz`].

pub mod codec;
pub mod model;
pub mod parser;
pub mod recur;
pub mod tz;
pub mod writer;

pub use model::component::{Component, ComponentName};
pub use model::primitive::{
    Date, DateTime, DateTimeOrDate, Duration, DurationKind, DurationTime, Period, RawTime, Sign,
    Time, TimeFormat, UnknownValue, Uri, UtcOffset, Value, ValueType, Weekday,
};
pub use model::property::{Param, Params, Property, ValueSlot};
pub use model::rrule::{Freq, RRule, WeekdayNum};
pub use parser::{
    CalendarError, ContentLine, ContentLineReader, ErrorKind, Mode, Parser, StreamError, Warning,
    parse,
};
pub use recur::{Expand, Occurrence, OccurrenceIter, Origin, expand};
pub use tz::{
    DefaultPolicy, FixedZone, FloatingResolver, SecurityPolicy, TableResolver, TimezoneResolver,
    Zone,
};
pub use writer::{Writer, write};

/// Streams [`ContentLine`]s from a buffered reader without materializing a
/// component tree.
pub fn parse_stream<R: std::io::BufRead>(reader: R) -> ContentLineReader<R> {
    ContentLineReader::new(reader)
}
