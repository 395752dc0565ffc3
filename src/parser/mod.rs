//! Reading iCalendar documents into the component tree.
//!
//! The pipeline is bottom-up: the [`contentline`] unfolder produces logical
//! lines, the [`property`] scanner splits them into names, parameters, and
//! raw values, the codec registry decodes the values, and this module
//! assembles BEGIN/END blocks into [`Component`] trees while enforcing the
//! structural and security rules.

pub mod config;
pub mod contentline;
pub mod error;
pub mod primitive;
pub mod property;
pub mod rrule;

pub use config::{Mode, ParseContext, PropContext};
pub use contentline::{ContentLine, ContentLineReader, StreamError};
pub use error::{CalendarError, ErrorKind, Warning};

use crate::codec::{self, CodecRegistry};
use crate::model::component::{Component, ComponentName, required_properties};
use crate::model::primitive::{UnknownValue, Value, ValueType};
use crate::model::property::{Property, ValueSlot};
use crate::tz::{DefaultPolicy, FloatingResolver, SecurityPolicy, TimezoneResolver};

/// A configurable document parser.
///
/// A parser owns its mode, host hooks, codec cache, and warning list; it is
/// not meant to be shared across concurrent parses. Each call to
/// [`Parser::parse`] resets the warning list.
pub struct Parser {
    mode: Mode,
    security: Box<dyn SecurityPolicy>,
    resolver: Box<dyn TimezoneResolver>,
    registry: CodecRegistry,
    warnings: Vec<Warning>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// A strict parser with the default policy and no timezone data.
    pub fn new() -> Self {
        Self {
            mode: Mode::Strict,
            security: Box::new(DefaultPolicy),
            resolver: Box::new(FloatingResolver),
            registry: CodecRegistry::new(),
            warnings: Vec::new(),
        }
    }

    /// A lenient parser; see [`Mode`] for what that changes.
    pub fn lenient() -> Self {
        Self::new().with_mode(Mode::Lenient)
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_security(mut self, security: impl SecurityPolicy + 'static) -> Self {
        self.security = Box::new(security);
        self
    }

    pub fn with_resolver(mut self, resolver: impl TimezoneResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// The codec registry, for registering custom value codecs.
    pub fn registry_mut(&mut self) -> &mut CodecRegistry {
        &mut self.registry
    }

    /// The warnings collected by the most recent parse.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Parses a complete document into its root component.
    pub fn parse(&mut self, input: &[u8]) -> Result<Component, CalendarError> {
        let mut warnings = Vec::new();
        let result = run_parse(
            input,
            self.mode,
            &mut warnings,
            self.security.as_ref(),
            self.resolver.as_ref(),
            &mut self.registry,
        );
        self.warnings = warnings;
        result
    }
}

/// Parses a complete document with the default strict configuration.
pub fn parse(input: &[u8]) -> Result<Component, CalendarError> {
    Parser::new().parse(input)
}

fn run_parse(
    input: &[u8],
    mode: Mode,
    warnings: &mut Vec<Warning>,
    security: &dyn SecurityPolicy,
    resolver: &dyn TimezoneResolver,
    registry: &mut CodecRegistry,
) -> Result<Component, CalendarError> {
    let mut ctx = ParseContext::new(mode, warnings, security, resolver);
    let mut stack: Vec<Component> = Vec::new();
    let mut root: Option<Component> = None;

    for item in contentline::Unfolder::new(input) {
        let unfolded = item?;
        ctx.set_line(unfolded.number);
        let line = property::content_line(&unfolded, mode)?;
        let located = |kind: ErrorKind| kind.at(line.line_number, line.raw_line.clone());

        match line.name.as_str() {
            "BEGIN" => {
                if root.is_some() {
                    return Err(located(ErrorKind::TrailingContent));
                }

                let limit = security.max_component_depth();
                if stack.len() >= limit {
                    return Err(located(ErrorKind::DepthExceeded(limit)));
                }

                stack.push(Component::new(ComponentName::from_name(&line.value)));
            }
            "END" => {
                let Some(component) = stack.pop() else {
                    return Err(located(ErrorKind::OutsideComponent));
                };

                let ending = ComponentName::from_name(&line.value);
                if ending != component.name {
                    return Err(located(ErrorKind::EndMismatch {
                        expected: component.name.to_string(),
                        found: ending.to_string(),
                    }));
                }

                validate_structure(&component).map_err(located)?;

                match stack.last_mut() {
                    Some(parent) => parent.push_component(component),
                    None => root = Some(component),
                }
            }
            _ => {
                if root.is_some() {
                    return Err(located(ErrorKind::TrailingContent));
                }

                let Some(open) = stack.last_mut() else {
                    return Err(located(ErrorKind::OutsideComponent));
                };

                match build_property(&line, registry, &mut ctx) {
                    Ok(Some(prop)) => open.push_property(prop),
                    // lenient skip; the warning is already recorded
                    Ok(None) => (),
                    Err(kind) => return Err(located(kind)),
                }
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(ErrorKind::Unterminated(open.name.to_string()).detached());
    }

    root.ok_or_else(|| ErrorKind::EmptyDocument.detached())
}

/// Decodes one content line into a property. Returns `Ok(None)` when the
/// lenient mode chose to skip the property.
fn build_property(
    line: &ContentLine,
    registry: &mut CodecRegistry,
    ctx: &mut ParseContext<'_>,
) -> Result<Option<Property>, ErrorKind> {
    let value_type = line
        .params
        .value_type()
        .unwrap_or_else(|| codec::default_value_type(&line.name));

    let prop_ctx = PropContext {
        name: &line.name,
        params: &line.params,
    };
    let decoder = registry.get(&value_type);

    let decoded: Result<ValueSlot, ErrorKind> = if codec::is_multi_valued(&line.name) {
        codec::split_values(&line.value)
            .into_iter()
            .map(|piece| decoder.parse(piece, &prop_ctx, ctx))
            .collect::<Result<Vec<_>, _>>()
            .map(ValueSlot::List)
    } else {
        decoder
            .parse(&line.value, &prop_ctx, ctx)
            .map(ValueSlot::Single)
    };

    match decoded {
        Ok(value) => Ok(Some(Property {
            name: line.name.clone(),
            params: line.params.clone(),
            value,
        })),
        Err(kind) if kind.is_type_error() && ctx.mode().is_lenient() => {
            // Date, date-time, and summary text failures retain the raw
            // value; any other type failure drops the property.
            let retain = matches!(value_type, ValueType::Date | ValueType::DateTime)
                || (value_type == ValueType::Text && line.name == "SUMMARY");

            ctx.warn(kind.code(), kind.to_string());

            if retain {
                Ok(Some(Property {
                    name: line.name.clone(),
                    params: line.params.clone(),
                    value: ValueSlot::Single(Value::Other(UnknownValue {
                        type_name: value_type.as_str().to_owned(),
                        raw: line.value.clone(),
                    })),
                }))
            } else {
                Ok(None)
            }
        }
        Err(kind) => Err(kind),
    }
}

/// Enforces the structural rules of the closed component vocabulary when a
/// component's END line freezes it.
fn validate_structure(component: &Component) -> Result<(), ErrorKind> {
    let name = component.name.to_string();

    for &prop in required_properties(&component.name) {
        if !component.has_property(prop) {
            return Err(ErrorKind::MissingProp {
                prop,
                component: name,
            });
        }
    }

    match &component.name {
        ComponentName::Event => {
            if component.has_property("DTEND") && component.has_property("DURATION") {
                return Err(ErrorKind::ConflictingProps {
                    first: "DTEND",
                    second: "DURATION",
                    component: name,
                });
            }
        }
        ComponentName::Todo => {
            if component.has_property("DUE") && component.has_property("DURATION") {
                return Err(ErrorKind::ConflictingProps {
                    first: "DUE",
                    second: "DURATION",
                    component: name,
                });
            }
        }
        ComponentName::Alarm => {
            let repeat = component.has_property("REPEAT");
            let duration = component.has_property("DURATION");
            if repeat && !duration {
                return Err(ErrorKind::RepeatWithoutDuration);
            }
            if duration && !repeat {
                return Err(ErrorKind::DurationWithoutRepeat);
            }
        }
        ComponentName::TimeZone => {
            let has_rule = component.components.iter().any(|c| {
                matches!(c.name, ComponentName::Standard | ComponentName::Daylight)
            });
            if !has_rule {
                return Err(ErrorKind::EmptyTimeZone);
            }
        }
        _ => (),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::primitive::{TimeFormat, Value};

    fn doc(lines: &[&str]) -> Vec<u8> {
        let mut out = Vec::new();
        for line in lines {
            out.extend_from_slice(line.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out
    }

    fn minimal_event(extra: &[&str]) -> Vec<u8> {
        let mut lines = vec![
            "BEGIN:VCALENDAR",
            "VERSION:2.0",
            "PRODID:-//X//Y//EN",
            "BEGIN:VEVENT",
            "DTSTAMP:20260206T100000Z",
            "UID:a@b",
        ];
        lines.extend_from_slice(extra);
        lines.push("END:VEVENT");
        lines.push("END:VCALENDAR");
        doc(&lines)
    }

    #[test]
    fn parses_minimal_calendar() {
        let root = parse(&minimal_event(&["SUMMARY:Hi"])).unwrap();
        assert_eq!(root.name, ComponentName::Calendar);
        assert_eq!(root.components.len(), 1);

        let event = &root.components[0];
        assert_eq!(event.name, ComponentName::Event);
        assert_eq!(event.property("SUMMARY").unwrap().as_text(), Some("Hi"));

        let Some(Value::DateTime(stamp)) = event.property_value("DTSTAMP") else {
            panic!("DTSTAMP should be a date-time");
        };
        assert_eq!(stamp.format(), TimeFormat::Utc);
    }

    #[test]
    fn nested_components_attach_to_parents() {
        let root = parse(&doc(&[
            "BEGIN:VCALENDAR",
            "VERSION:2.0",
            "PRODID:p",
            "BEGIN:VEVENT",
            "DTSTAMP:20260206T100000Z",
            "UID:a@b",
            "BEGIN:VALARM",
            "ACTION:DISPLAY",
            "TRIGGER:-PT15M",
            "END:VALARM",
            "END:VEVENT",
            "END:VCALENDAR",
        ]))
        .unwrap();

        let event = &root.components[0];
        assert_eq!(event.components[0].name, ComponentName::Alarm);
    }

    #[test]
    fn multi_valued_categories() {
        let root = parse(&minimal_event(&[r"CATEGORIES:WORK,TRAVEL\,FUN"])).unwrap();
        let cats = root.components[0].property("CATEGORIES").unwrap();
        let texts: Vec<_> = cats.values().collect();
        assert_eq!(
            texts,
            vec![
                &Value::Text("WORK".into()),
                &Value::Text("TRAVEL,FUN".into())
            ]
        );
    }

    #[test]
    fn value_parameter_overrides_default_type() {
        let root = parse(&minimal_event(&["DTSTART;VALUE=DATE:20260419"])).unwrap();
        assert!(matches!(
            root.components[0].property_value("DTSTART"),
            Some(Value::Date(_))
        ));
    }

    #[test]
    fn missing_required_property() {
        let err = parse(&doc(&["BEGIN:VCALENDAR", "VERSION:2.0", "END:VCALENDAR"])).unwrap_err();
        assert_eq!(err.code(), "ICAL-STRUCT-MISSING-PROP");
    }

    #[test]
    fn alarm_missing_action_code() {
        let err = parse(&doc(&[
            "BEGIN:VCALENDAR",
            "VERSION:2.0",
            "PRODID:p",
            "BEGIN:VEVENT",
            "DTSTAMP:20260206T100000Z",
            "UID:a@b",
            "BEGIN:VALARM",
            "TRIGGER:-PT15M",
            "END:VALARM",
            "END:VEVENT",
            "END:VCALENDAR",
        ]))
        .unwrap_err();
        assert_eq!(err.code(), "ICAL-ALARM-MISSING-ACTION");
    }

    #[test]
    fn due_duration_conflict() {
        let err = parse(&doc(&[
            "BEGIN:VCALENDAR",
            "VERSION:2.0",
            "PRODID:p",
            "BEGIN:VTODO",
            "DTSTAMP:20260206T100000Z",
            "UID:t@b",
            "DUE:20260301T100000Z",
            "DURATION:PT1H",
            "END:VTODO",
            "END:VCALENDAR",
        ]))
        .unwrap_err();
        assert_eq!(err.code(), "ICAL-STRUCT-CONFLICT");
    }

    #[test]
    fn end_mismatch() {
        let err = parse(&doc(&["BEGIN:VCALENDAR", "VERSION:2.0", "PRODID:p", "END:VEVENT"]))
            .unwrap_err();
        assert_eq!(err.code(), "ICAL-STRUCT-END-MISMATCH");
        assert_eq!(err.line, 4);
    }

    #[test]
    fn unterminated_component() {
        let err = parse(&doc(&["BEGIN:VCALENDAR", "VERSION:2.0", "PRODID:p"])).unwrap_err();
        assert_eq!(err.code(), "ICAL-STRUCT-UNTERMINATED");
    }

    #[test]
    fn property_outside_component() {
        let err = parse(&doc(&["SUMMARY:stray"])).unwrap_err();
        assert_eq!(err.code(), "ICAL-STRUCT-ROOT");
    }

    #[test]
    fn depth_limit_enforced() {
        struct Shallow;
        impl SecurityPolicy for Shallow {
            fn max_component_depth(&self) -> usize {
                2
            }
        }

        let err = Parser::new()
            .with_security(Shallow)
            .parse(&doc(&[
                "BEGIN:VCALENDAR",
                "BEGIN:VEVENT",
                "BEGIN:VALARM",
                "END:VALARM",
                "END:VEVENT",
                "END:VCALENDAR",
            ]))
            .unwrap_err();
        assert_eq!(err.code(), "ICAL-SEC-DEPTH");
        assert_eq!(err.line, 3);
    }

    #[test]
    fn strict_type_error_aborts() {
        let err = parse(&minimal_event(&["DTSTART:not-a-date"])).unwrap_err();
        assert_eq!(err.code(), "ICAL-TYPE-DATE-TIME");
        assert_eq!(err.line, 7);
    }

    #[test]
    fn lenient_retains_bad_dates_with_warning() {
        let mut parser = Parser::lenient();
        let root = parser.parse(&minimal_event(&["DTSTART:not-a-date"])).unwrap();

        let dtstart = root.components[0].property("DTSTART").unwrap();
        assert!(matches!(dtstart.value(), Some(Value::Other(u)) if u.raw == "not-a-date"));

        assert_eq!(parser.warnings().len(), 1);
        assert_eq!(parser.warnings()[0].code, "ICAL-TYPE-DATE-TIME");
        assert_eq!(parser.warnings()[0].line, 7);
    }

    #[test]
    fn lenient_skips_unreadable_properties() {
        let mut parser = Parser::lenient();
        let root = parser
            .parse(&minimal_event(&["PERCENT-COMPLETE:high"]))
            .unwrap();

        assert!(!root.components[0].has_property("PERCENT-COMPLETE"));
        assert_eq!(parser.warnings().len(), 1);
    }

    #[test]
    fn unknown_components_are_containers() {
        let root = parse(&doc(&[
            "BEGIN:VCALENDAR",
            "VERSION:2.0",
            "PRODID:p",
            "BEGIN:X-EXPERIMENT",
            "X-KNOB:11",
            "END:X-EXPERIMENT",
            "END:VCALENDAR",
        ]))
        .unwrap();

        let child = &root.components[0];
        assert_eq!(child.name, ComponentName::X("X-EXPERIMENT".into()));
        assert_eq!(child.property("X-KNOB").unwrap().as_text(), Some("11"));
    }

    #[test]
    fn trailing_content_rejected() {
        let mut input = minimal_event(&[]);
        input.extend_from_slice(b"SUMMARY:late\r\n");
        assert_eq!(parse(&input).unwrap_err().code(), "ICAL-STRUCT-ROOT");
    }

    #[test]
    fn empty_input_rejected() {
        assert_eq!(parse(b"").unwrap_err().code(), "ICAL-STRUCT-ROOT");
    }
}
