//! Error types for reading iCalendar.
//!
//! Every [`ErrorKind`] maps to exactly one stable string code via
//! [`ErrorKind::code`]; hosts key their own translations and logs off those
//! codes, and the library never changes a published code's meaning.

use std::fmt;

use thiserror::Error;

use crate::model::primitive::ValueType;

/// The kind of a parse failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    // format errors
    #[error("continuation line before any content line")]
    ContinuationFirst,
    #[error("content line has no ':' between name and value")]
    MissingColon,
    #[error("unclosed quoted string in parameter value")]
    UnclosedQuote,
    #[error("invalid RFC 6868 escape `{0}` in parameter value")]
    CaretEscape(String),
    #[error("invalid property name `{0}`")]
    PropertyName(String),
    #[error("invalid parameter name `{0}`")]
    ParamName(String),
    #[error("character {0:?} is not allowed in a parameter value")]
    ParamChar(char),
    #[error("input is not valid UTF-8")]
    Utf8,

    // type errors
    #[error("cannot read `{raw}` as a {value_type} value")]
    Value { value_type: ValueType, raw: String },

    // structure errors
    #[error("{component} is missing the required property {prop}")]
    MissingProp {
        prop: &'static str,
        component: String,
    },
    #[error("{component} contains both {first} and {second}, which are mutually exclusive")]
    ConflictingProps {
        first: &'static str,
        second: &'static str,
        component: String,
    },
    #[error("VALARM has REPEAT without DURATION")]
    RepeatWithoutDuration,
    #[error("VALARM has DURATION without REPEAT")]
    DurationWithoutRepeat,
    #[error("VTIMEZONE contains no STANDARD or DAYLIGHT sub-component")]
    EmptyTimeZone,
    #[error("END:{found} does not close BEGIN:{expected}")]
    EndMismatch { expected: String, found: String },
    #[error("BEGIN:{0} is never closed")]
    Unterminated(String),
    #[error("content line outside of any component")]
    OutsideComponent,
    #[error("content after the root component ends")]
    TrailingContent,
    #[error("input contains no component")]
    EmptyDocument,

    // recurrence errors
    #[error("RRULE is missing the required FREQ part")]
    RRuleMissingFreq,
    #[error("RRULE contains both COUNT and UNTIL")]
    RRuleCountAndUntil,
    #[error("RRULE part {0} occurs more than once")]
    RRuleDuplicatePart(String),
    #[error("unknown RRULE part {0}")]
    RRuleUnknownPart(String),
    #[error("invalid value `{value}` for RRULE part {part}")]
    RRuleInvalidValue { part: &'static str, value: String },
    #[error("invalid UNTIL value `{0}`")]
    RRuleInvalidUntil(String),
    #[error("recurrence is unbounded and no range end was given")]
    UnboundedExpansion,

    // security errors
    #[error("component nesting deeper than the permitted {0} levels")]
    DepthExceeded(usize),
    #[error("URI scheme `{0}` is not allowed")]
    UriSchemeDenied(String),
    #[error("inline data of {size} octets exceeds the permitted {limit}")]
    OversizeData { size: usize, limit: usize },
}

impl ErrorKind {
    /// The stable string code of this kind.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::ContinuationFirst => "ICAL-FORMAT-CONTINUATION",
            ErrorKind::MissingColon => "ICAL-FORMAT-COLON",
            ErrorKind::UnclosedQuote => "ICAL-FORMAT-QUOTE",
            ErrorKind::CaretEscape(_) => "ICAL-FORMAT-ESCAPE",
            ErrorKind::PropertyName(_) => "ICAL-FORMAT-NAME",
            ErrorKind::ParamName(_) => "ICAL-FORMAT-PARAM-NAME",
            ErrorKind::ParamChar(_) => "ICAL-FORMAT-PARAM-VALUE",
            ErrorKind::Utf8 => "ICAL-FORMAT-UTF8",

            ErrorKind::Value { value_type, .. } => match value_type {
                ValueType::Binary => "ICAL-TYPE-BINARY",
                ValueType::Boolean => "ICAL-TYPE-BOOLEAN",
                ValueType::CalAddress => "ICAL-TYPE-CAL-ADDRESS",
                ValueType::Date => "ICAL-TYPE-DATE",
                ValueType::DateTime => "ICAL-TYPE-DATE-TIME",
                ValueType::Duration => "ICAL-TYPE-DURATION",
                ValueType::Float => "ICAL-TYPE-FLOAT",
                ValueType::Integer => "ICAL-TYPE-INTEGER",
                ValueType::Period => "ICAL-TYPE-PERIOD",
                ValueType::Recur => "ICAL-TYPE-RECUR",
                ValueType::Text => "ICAL-TYPE-TEXT",
                ValueType::Time => "ICAL-TYPE-TIME",
                ValueType::Uri => "ICAL-TYPE-URI",
                ValueType::UtcOffset => "ICAL-TYPE-UTC-OFFSET",
                ValueType::Other(_) => "ICAL-TYPE-UNKNOWN",
            },

            ErrorKind::MissingProp { prop, component } => match (component.as_str(), *prop) {
                ("VALARM", "ACTION") => "ICAL-ALARM-MISSING-ACTION",
                ("VALARM", "TRIGGER") => "ICAL-ALARM-MISSING-TRIGGER",
                _ => "ICAL-STRUCT-MISSING-PROP",
            },
            ErrorKind::ConflictingProps { .. } => "ICAL-STRUCT-CONFLICT",
            ErrorKind::RepeatWithoutDuration | ErrorKind::DurationWithoutRepeat => {
                "ICAL-ALARM-REPEAT-PAIR"
            }
            ErrorKind::EmptyTimeZone => "ICAL-STRUCT-MISSING-PROP",
            ErrorKind::EndMismatch { .. } => "ICAL-STRUCT-END-MISMATCH",
            ErrorKind::Unterminated(_) => "ICAL-STRUCT-UNTERMINATED",
            ErrorKind::OutsideComponent | ErrorKind::TrailingContent | ErrorKind::EmptyDocument => {
                "ICAL-STRUCT-ROOT"
            }

            ErrorKind::RRuleMissingFreq => "ICAL-RRULE-FREQ-REQUIRED",
            ErrorKind::RRuleCountAndUntil => "ICAL-RRULE-COUNT-UNTIL",
            ErrorKind::RRuleDuplicatePart(_) | ErrorKind::RRuleUnknownPart(_) => "ICAL-RRULE-PART",
            ErrorKind::RRuleInvalidValue { .. } => "ICAL-RRULE-VALUE",
            ErrorKind::RRuleInvalidUntil(_) => "ICAL-RRULE-UNTIL",
            ErrorKind::UnboundedExpansion => "ICAL-RECUR-UNBOUNDED",

            ErrorKind::DepthExceeded(_) => "ICAL-SEC-DEPTH",
            ErrorKind::UriSchemeDenied(_) => "ICAL-SEC-URI-SCHEME",
            ErrorKind::OversizeData { .. } => "ICAL-SEC-DATA-SIZE",
        }
    }

    /// Binds the kind to a source location.
    pub fn at(self, line: usize, raw: impl Into<String>) -> CalendarError {
        CalendarError {
            kind: self,
            line,
            raw: raw.into(),
        }
    }

    /// Wraps the kind with no source location, for failures raised outside
    /// of parsing (expansion, hand-built trees).
    pub fn detached(self) -> CalendarError {
        CalendarError {
            kind: self,
            line: 0,
            raw: String::new(),
        }
    }

    /// Returns `true` for *type* kinds, the only group the lenient mode may
    /// downgrade to warnings.
    pub fn is_type_error(&self) -> bool {
        matches!(self, ErrorKind::Value { .. })
    }
}

/// A parse failure bound to its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarError {
    pub kind: ErrorKind,
    /// The physical line number at which the offending logical line began,
    /// 1-based; 0 when the failure is not tied to input.
    pub line: usize,
    /// The raw source line, retained for diagnostics.
    pub raw: String,
}

impl CalendarError {
    /// The stable string code of the underlying kind.
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl fmt::Display for CalendarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.kind, self.code())?;
        if self.line > 0 {
            write!(f, " at line {}", self.line)?;
        }
        if !self.raw.is_empty() {
            write!(f, ": {}", self.raw)?;
        }
        Ok(())
    }
}

impl std::error::Error for CalendarError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// A recoverable deviation found in lenient mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub code: &'static str,
    pub message: String,
    pub line: usize,
}

/// Warning code for a TZID that the configured resolver does not know.
pub const WARN_TZID_UNRESOLVED: &str = "ICAL-TZID-UNRESOLVED";
