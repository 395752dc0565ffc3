//! The typed value codec registry.
//!
//! A codec turns the raw value text of a content line into a typed
//! [`Value`] and back. The registry dispatches on the property's `VALUE=`
//! parameter when present, then on the property-name default table, then
//! falls back to TEXT. Codec instances are built lazily and cached per
//! registry; hosts may register their own codecs under any [`ValueType`]
//! key, including vendor types.

use std::fmt;

use base64::{Engine as _, prelude::BASE64_STANDARD};
use hashbrown::HashMap;
use winnow::Parser;
use winnow::error::ContextError;

use crate::model::primitive::{UnknownValue, Uri, Value, ValueType};
#[cfg_attr(not(test), allow(unused_imports))]
use crate::parser::config::{Mode, ParseContext, PropContext};
use crate::parser::error::{ErrorKind, WARN_TZID_UNRESOLVED};
use crate::parser::primitive as prim;
use crate::parser::rrule::parse_rrule;

/// A reader/writer pair for one value type.
pub trait ValueCodec {
    /// Decodes the raw value text of a property.
    fn parse(
        &self,
        raw: &str,
        prop: &PropContext<'_>,
        ctx: &mut ParseContext<'_>,
    ) -> Result<Value, ErrorKind>;

    /// Encodes a value in its canonical wire form. The default delegates to
    /// the typed value's own canonical printer, which is the strict inverse
    /// of every built-in codec.
    fn write(&self, value: &Value, out: &mut String) {
        // writing to a String cannot fail
        let _ = write_value(value, out);
    }
}

/// The default value type of a property, per RFC 5545 and the extension
/// properties of RFC 7986, RFC 9073, and RFC 9074. Anything unlisted
/// defaults to TEXT.
///
/// GEO and REQUEST-STATUS carry semicolon-structured values that the
/// fourteen-type model does not decompose; they are preserved verbatim so
/// that no canonicalization is invented for them.
pub fn default_value_type(name: &str) -> ValueType {
    match name {
        "COMPLETED" | "DTEND" | "DUE" | "DTSTART" | "RECURRENCE-ID" | "EXDATE" | "RDATE"
        | "CREATED" | "DTSTAMP" | "LAST-MODIFIED" | "ACKNOWLEDGED" => ValueType::DateTime,
        "DURATION" | "REFRESH-INTERVAL" | "TRIGGER" => ValueType::Duration,
        "FREEBUSY" => ValueType::Period,
        "TZOFFSETFROM" | "TZOFFSETTO" => ValueType::UtcOffset,
        "ATTENDEE" | "ORGANIZER" | "CALENDAR-ADDRESS" => ValueType::CalAddress,
        "PERCENT-COMPLETE" | "PRIORITY" | "REPEAT" | "SEQUENCE" => ValueType::Integer,
        "RRULE" | "EXRULE" => ValueType::Recur,
        "ATTACH" | "TZURL" | "URL" | "SOURCE" | "IMAGE" | "CONFERENCE" => ValueType::Uri,
        "GEO" => ValueType::Other("GEO".to_owned()),
        "REQUEST-STATUS" => ValueType::Other("REQUEST-STATUS".to_owned()),
        _ => ValueType::Text,
    }
}

/// Whether a property takes a comma-separated list of values.
pub(crate) fn is_multi_valued(name: &str) -> bool {
    matches!(
        name,
        "CATEGORIES" | "RESOURCES" | "EXDATE" | "RDATE" | "FREEBUSY" | "LOCATION-TYPE"
    )
}

/// Splits a raw value on unescaped commas.
pub(crate) fn split_values(raw: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut escaped = false;

    for (i, c) in raw.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            ',' => {
                out.push(&raw[start..i]);
                start = i + 1;
            }
            _ => (),
        }
    }

    out.push(&raw[start..]);
    out
}

/// The codec cache.
pub struct CodecRegistry {
    codecs: HashMap<ValueType, Box<dyn ValueCodec>>,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    /// Registers a custom codec for a type, replacing any cached instance.
    pub fn register(&mut self, value_type: ValueType, codec: Box<dyn ValueCodec>) {
        self.codecs.insert(value_type, codec);
    }

    /// The codec for a type, instantiating and caching the built-in on
    /// first use.
    pub fn get(&mut self, value_type: &ValueType) -> &dyn ValueCodec {
        if !self.codecs.contains_key(value_type) {
            self.codecs.insert(value_type.clone(), builtin(value_type));
        }
        self.codecs.get(value_type).unwrap().as_ref()
    }
}

fn builtin(value_type: &ValueType) -> Box<dyn ValueCodec> {
    match value_type {
        ValueType::Binary => Box::new(BinaryCodec),
        ValueType::Boolean => Box::new(BooleanCodec),
        ValueType::CalAddress => Box::new(CalAddressCodec),
        ValueType::Date => Box::new(DateCodec),
        ValueType::DateTime => Box::new(DateTimeCodec),
        ValueType::Duration => Box::new(DurationCodec),
        ValueType::Float => Box::new(FloatCodec),
        ValueType::Integer => Box::new(IntegerCodec),
        ValueType::Period => Box::new(PeriodCodec),
        ValueType::Recur => Box::new(RecurCodec),
        ValueType::Text => Box::new(TextCodec),
        ValueType::Time => Box::new(TimeCodec),
        ValueType::Uri => Box::new(UriCodec),
        ValueType::UtcOffset => Box::new(UtcOffsetCodec),
        ValueType::Other(name) => Box::new(VerbatimCodec { type_name: name.clone() }),
    }
}

fn type_error(value_type: ValueType, raw: &str) -> ErrorKind {
    ErrorKind::Value {
        value_type,
        raw: raw.to_owned(),
    }
}

/// Runs a winnow parser over the complete raw text.
fn complete<'i, O>(mut parser: impl Parser<&'i str, O, ContextError>, raw: &'i str) -> Option<O> {
    parser.parse(raw).ok()
}

struct BinaryCodec;

impl ValueCodec for BinaryCodec {
    fn parse(
        &self,
        raw: &str,
        _prop: &PropContext<'_>,
        ctx: &mut ParseContext<'_>,
    ) -> Result<Value, ErrorKind> {
        let bytes = BASE64_STANDARD
            .decode(raw.as_bytes())
            .map_err(|_| type_error(ValueType::Binary, raw))?;

        let limit = ctx.security().max_data_size();
        if bytes.len() > limit {
            return Err(ErrorKind::OversizeData {
                size: bytes.len(),
                limit,
            });
        }

        Ok(Value::Binary(bytes))
    }
}

struct BooleanCodec;

impl ValueCodec for BooleanCodec {
    fn parse(
        &self,
        raw: &str,
        _prop: &PropContext<'_>,
        ctx: &mut ParseContext<'_>,
    ) -> Result<Value, ErrorKind> {
        match complete(prim::boolean::<ContextError>, raw) {
            Some(value) => Ok(Value::Boolean(value)),
            None if ctx.mode().is_lenient() => {
                let kind = type_error(ValueType::Boolean, raw);
                ctx.warn(kind.code(), format!("treating `{raw}` as FALSE"));
                Ok(Value::Boolean(false))
            }
            None => Err(type_error(ValueType::Boolean, raw)),
        }
    }
}

struct CalAddressCodec;

impl ValueCodec for CalAddressCodec {
    fn parse(
        &self,
        raw: &str,
        _prop: &PropContext<'_>,
        ctx: &mut ParseContext<'_>,
    ) -> Result<Value, ErrorKind> {
        let parsed = complete(prim::uri::<ContextError>, raw);

        let fail = |ctx: &mut ParseContext<'_>| {
            let kind = type_error(ValueType::CalAddress, raw);
            if ctx.mode().is_lenient() {
                ctx.warn(kind.code(), format!("keeping `{raw}` unvalidated"));
                Ok(Value::CalAddress(Uri::new(raw)))
            } else {
                Err(kind)
            }
        };

        let Some(uri) = parsed else {
            return fail(ctx);
        };

        if let Some(scheme) = uri.scheme() {
            if !ctx.security().allow_uri_scheme(scheme) {
                return Err(ErrorKind::UriSchemeDenied(scheme.to_owned()));
            }

            // mailto bodies get a minimal addr-spec shape check
            if scheme.eq_ignore_ascii_case("mailto") {
                let body = &uri.as_str()[scheme.len() + 1..];
                let addr_ok = body
                    .split_once('@')
                    .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
                if !addr_ok {
                    return fail(ctx);
                }
            }
        }

        Ok(Value::CalAddress(uri))
    }
}

struct DateCodec;

impl ValueCodec for DateCodec {
    fn parse(
        &self,
        raw: &str,
        _prop: &PropContext<'_>,
        _ctx: &mut ParseContext<'_>,
    ) -> Result<Value, ErrorKind> {
        complete(prim::date::<ContextError>, raw)
            .map(Value::Date)
            .ok_or_else(|| type_error(ValueType::Date, raw))
    }
}

struct DateTimeCodec;

impl ValueCodec for DateTimeCodec {
    fn parse(
        &self,
        raw: &str,
        prop: &PropContext<'_>,
        ctx: &mut ParseContext<'_>,
    ) -> Result<Value, ErrorKind> {
        // EXDATE/RDATE and friends may carry VALUE=DATE-less bare dates in
        // the wild only under VALUE=DATE, which routes to DateCodec; here
        // the grammar is strictly a DATE-TIME.
        let dt = complete(prim::date_time::<ContextError>, raw)
            .ok_or_else(|| type_error(ValueType::DateTime, raw))?;

        // A `Z` suffix and a TZID parameter are mutually exclusive; the
        // instant semantics of `Z` win and the parameter is ignored.
        if dt.format() == crate::model::primitive::TimeFormat::Local
            && let Some(tzid) = prop.params.tz_id()
            && ctx.resolver().resolve(tzid).is_none()
        {
            ctx.warn(
                WARN_TZID_UNRESOLVED,
                format!("TZID `{tzid}` is not resolvable; treating the value as floating"),
            );
        }

        Ok(Value::DateTime(dt))
    }
}

struct DurationCodec;

impl ValueCodec for DurationCodec {
    fn parse(
        &self,
        raw: &str,
        _prop: &PropContext<'_>,
        _ctx: &mut ParseContext<'_>,
    ) -> Result<Value, ErrorKind> {
        complete(prim::duration::<ContextError>, raw)
            .map(Value::Duration)
            .ok_or_else(|| type_error(ValueType::Duration, raw))
    }
}

struct FloatCodec;

impl ValueCodec for FloatCodec {
    fn parse(
        &self,
        raw: &str,
        _prop: &PropContext<'_>,
        _ctx: &mut ParseContext<'_>,
    ) -> Result<Value, ErrorKind> {
        complete(prim::float::<ContextError>, raw)
            .map(Value::Float)
            .ok_or_else(|| type_error(ValueType::Float, raw))
    }
}

struct IntegerCodec;

impl ValueCodec for IntegerCodec {
    fn parse(
        &self,
        raw: &str,
        _prop: &PropContext<'_>,
        ctx: &mut ParseContext<'_>,
    ) -> Result<Value, ErrorKind> {
        if let Some(value) = complete(prim::integer::<ContextError>, raw) {
            return Ok(Value::Integer(value));
        }

        // lenient reading admits a decimal fraction, rounded to nearest
        if ctx.mode().is_lenient()
            && let Some(value) = complete(prim::float::<ContextError>, raw)
        {
            let rounded = value.round();
            if rounded >= f64::from(i32::MIN) && rounded <= f64::from(i32::MAX) {
                let kind = type_error(ValueType::Integer, raw);
                ctx.warn(kind.code(), format!("rounding `{raw}` to {rounded}"));
                return Ok(Value::Integer(rounded as i32));
            }
        }

        Err(type_error(ValueType::Integer, raw))
    }
}

struct PeriodCodec;

impl ValueCodec for PeriodCodec {
    fn parse(
        &self,
        raw: &str,
        _prop: &PropContext<'_>,
        _ctx: &mut ParseContext<'_>,
    ) -> Result<Value, ErrorKind> {
        complete(prim::period::<ContextError>, raw)
            .map(Value::Period)
            .ok_or_else(|| type_error(ValueType::Period, raw))
    }
}

struct RecurCodec;

impl ValueCodec for RecurCodec {
    fn parse(
        &self,
        raw: &str,
        _prop: &PropContext<'_>,
        ctx: &mut ParseContext<'_>,
    ) -> Result<Value, ErrorKind> {
        parse_rrule(raw, ctx).map(Value::Recur)
    }
}

struct TextCodec;

impl ValueCodec for TextCodec {
    fn parse(
        &self,
        raw: &str,
        _prop: &PropContext<'_>,
        ctx: &mut ParseContext<'_>,
    ) -> Result<Value, ErrorKind> {
        prim::decode_text(raw, ctx.mode().is_lenient())
            .map(Value::Text)
            .ok_or_else(|| type_error(ValueType::Text, raw))
    }
}

struct TimeCodec;

impl ValueCodec for TimeCodec {
    fn parse(
        &self,
        raw: &str,
        _prop: &PropContext<'_>,
        _ctx: &mut ParseContext<'_>,
    ) -> Result<Value, ErrorKind> {
        complete(prim::time::<ContextError>, raw)
            .map(Value::Time)
            .ok_or_else(|| type_error(ValueType::Time, raw))
    }
}

struct UriCodec;

impl ValueCodec for UriCodec {
    fn parse(
        &self,
        raw: &str,
        _prop: &PropContext<'_>,
        ctx: &mut ParseContext<'_>,
    ) -> Result<Value, ErrorKind> {
        let uri = complete(prim::uri::<ContextError>, raw)
            .ok_or_else(|| type_error(ValueType::Uri, raw))?;

        if let Some(scheme) = uri.scheme()
            && !ctx.security().allow_uri_scheme(scheme)
        {
            return Err(ErrorKind::UriSchemeDenied(scheme.to_owned()));
        }

        Ok(Value::Uri(uri))
    }
}

struct UtcOffsetCodec;

impl ValueCodec for UtcOffsetCodec {
    fn parse(
        &self,
        raw: &str,
        _prop: &PropContext<'_>,
        _ctx: &mut ParseContext<'_>,
    ) -> Result<Value, ErrorKind> {
        complete(prim::utc_offset::<ContextError>, raw)
            .map(Value::UtcOffset)
            .ok_or_else(|| type_error(ValueType::UtcOffset, raw))
    }
}

/// The passthrough codec for unknown `VALUE=` types and the structured
/// values the model keeps opaque.
struct VerbatimCodec {
    type_name: String,
}

impl ValueCodec for VerbatimCodec {
    fn parse(
        &self,
        raw: &str,
        _prop: &PropContext<'_>,
        _ctx: &mut ParseContext<'_>,
    ) -> Result<Value, ErrorKind> {
        Ok(Value::Other(UnknownValue {
            type_name: self.type_name.clone(),
            raw: raw.to_owned(),
        }))
    }
}

/// Writes a value in its canonical wire form.
pub fn write_value<W: fmt::Write>(value: &Value, out: &mut W) -> fmt::Result {
    match value {
        Value::Binary(bytes) => out.write_str(&BASE64_STANDARD.encode(bytes)),
        Value::Boolean(true) => out.write_str("TRUE"),
        Value::Boolean(false) => out.write_str("FALSE"),
        Value::CalAddress(uri) | Value::Uri(uri) => write!(out, "{uri}"),
        Value::Date(date) => write!(out, "{date}"),
        Value::DateTime(dt) => write!(out, "{dt}"),
        Value::Duration(duration) => write!(out, "{duration}"),
        Value::Float(float) => write_float(*float, out),
        Value::Integer(integer) => write!(out, "{integer}"),
        Value::Period(period) => write!(out, "{period}"),
        Value::Recur(rule) => write!(out, "{rule}"),
        Value::Text(text) => out.write_str(&prim::encode_text(text)),
        Value::Time(time) => write!(out, "{time}"),
        Value::UtcOffset(offset) => write!(out, "{offset}"),
        Value::Other(unknown) => out.write_str(&unknown.raw),
    }
}

fn write_float<W: fmt::Write>(value: f64, out: &mut W) -> fmt::Result {
    // a signed zero has no distinct wire form
    if value == 0.0 {
        return out.write_str("0");
    }
    write!(out, "{value}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::property::Params;
    use crate::parser::error::Warning;
    use crate::tz::{DefaultPolicy, FloatingResolver, SecurityPolicy};

    fn parse_as(
        value_type: ValueType,
        raw: &str,
        mode: Mode,
    ) -> (Result<Value, ErrorKind>, Vec<Warning>) {
        let mut warnings = Vec::new();
        let params = Params::new();
        let result = {
            let mut ctx =
                ParseContext::new(mode, &mut warnings, &DefaultPolicy, &FloatingResolver);
            let prop = PropContext {
                name: "X-TEST",
                params: &params,
            };
            let mut registry = CodecRegistry::new();
            registry.get(&value_type).parse(raw, &prop, &mut ctx)
        };
        (result, warnings)
    }

    fn strict(value_type: ValueType, raw: &str) -> Result<Value, ErrorKind> {
        parse_as(value_type, raw, Mode::Strict).0
    }

    fn written(value: &Value) -> String {
        let mut out = String::new();
        write_value(value, &mut out).unwrap();
        out
    }

    #[test]
    fn defaults_table() {
        assert_eq!(default_value_type("DTSTART"), ValueType::DateTime);
        assert_eq!(default_value_type("UID"), ValueType::Text);
        assert_eq!(default_value_type("DURATION"), ValueType::Duration);
        assert_eq!(default_value_type("ATTENDEE"), ValueType::CalAddress);
        assert_eq!(default_value_type("RRULE"), ValueType::Recur);
        assert_eq!(default_value_type("TZOFFSETTO"), ValueType::UtcOffset);
        assert_eq!(default_value_type("X-ANYTHING"), ValueType::Text);
        assert_eq!(
            default_value_type("GEO"),
            ValueType::Other("GEO".to_owned())
        );
    }

    #[test]
    fn binary_round_trip() {
        let value = strict(ValueType::Binary, "SGVsbG8=").unwrap();
        assert_eq!(value, Value::Binary(b"Hello".to_vec()));
        assert_eq!(written(&value), "SGVsbG8=");
        assert!(strict(ValueType::Binary, "not base64!").is_err());
    }

    #[test]
    fn binary_size_limit() {
        struct TinyPolicy;
        impl SecurityPolicy for TinyPolicy {
            fn max_data_size(&self) -> usize {
                4
            }
        }

        let mut warnings = Vec::new();
        let params = Params::new();
        let mut ctx =
            ParseContext::new(Mode::Strict, &mut warnings, &TinyPolicy, &FloatingResolver);
        let prop = PropContext {
            name: "ATTACH",
            params: &params,
        };
        let err = BinaryCodec
            .parse("SGVsbG8=", &prop, &mut ctx)
            .unwrap_err();
        assert_eq!(err.code(), "ICAL-SEC-DATA-SIZE");
    }

    #[test]
    fn boolean_lenient_fallback() {
        assert_eq!(
            strict(ValueType::Boolean, "True").unwrap(),
            Value::Boolean(true)
        );
        assert!(strict(ValueType::Boolean, "yes").is_err());

        let (value, warnings) = parse_as(ValueType::Boolean, "yes", Mode::Lenient);
        assert_eq!(value.unwrap(), Value::Boolean(false));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, "ICAL-TYPE-BOOLEAN");
    }

    #[test]
    fn integer_lenient_rounding() {
        assert!(strict(ValueType::Integer, "4.6").is_err());

        let (value, warnings) = parse_as(ValueType::Integer, "4.6", Mode::Lenient);
        assert_eq!(value.unwrap(), Value::Integer(5));
        assert_eq!(warnings[0].code, "ICAL-TYPE-INTEGER");
    }

    #[test]
    fn cal_address_contract() {
        assert!(strict(ValueType::CalAddress, "mailto:jane@example.com").is_ok());
        assert!(strict(ValueType::CalAddress, "mailto:not-an-address").is_err());
        assert!(strict(ValueType::CalAddress, "jane@example.com").is_err());

        let (value, warnings) =
            parse_as(ValueType::CalAddress, "mailto:not-an-address", Mode::Lenient);
        assert_eq!(
            value.unwrap(),
            Value::CalAddress(Uri::new("mailto:not-an-address"))
        );
        assert_eq!(warnings[0].code, "ICAL-TYPE-CAL-ADDRESS");
    }

    #[test]
    fn uri_scheme_policy() {
        struct HttpsOnly;
        impl SecurityPolicy for HttpsOnly {
            fn allow_uri_scheme(&self, scheme: &str) -> bool {
                scheme.eq_ignore_ascii_case("https")
            }
        }

        let mut warnings = Vec::new();
        let params = Params::new();
        let mut ctx =
            ParseContext::new(Mode::Strict, &mut warnings, &HttpsOnly, &FloatingResolver);
        let prop = PropContext {
            name: "URL",
            params: &params,
        };

        assert!(UriCodec.parse("https://example.com", &prop, &mut ctx).is_ok());
        let err = UriCodec
            .parse("javascript:alert(1)", &prop, &mut ctx)
            .unwrap_err();
        assert_eq!(err.code(), "ICAL-SEC-URI-SCHEME");
    }

    #[test]
    fn unresolved_tzid_warns() {
        let mut warnings = Vec::new();
        let mut params = Params::new();
        params.set("TZID", "Mars/Olympus");
        let mut ctx = ParseContext::new(
            Mode::Strict,
            &mut warnings,
            &DefaultPolicy,
            &FloatingResolver,
        );
        let prop = PropContext {
            name: "DTSTART",
            params: &params,
        };

        assert!(
            DateTimeCodec
                .parse("20260101T090000", &prop, &mut ctx)
                .is_ok()
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, WARN_TZID_UNRESOLVED);

        // Z wins over TZID: no warning, the value is an instant
        warnings.clear();
        let mut ctx = ParseContext::new(
            Mode::Strict,
            &mut warnings,
            &DefaultPolicy,
            &FloatingResolver,
        );
        assert!(
            DateTimeCodec
                .parse("20260101T090000Z", &prop, &mut ctx)
                .is_ok()
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn verbatim_passthrough() {
        let value = strict(ValueType::Other("GEO".into()), "37.386013;-122.082932").unwrap();
        assert_eq!(written(&value), "37.386013;-122.082932");
    }

    #[test]
    fn float_writing() {
        assert_eq!(written(&Value::Float(3.25)), "3.25");
        assert_eq!(written(&Value::Float(-0.0)), "0");
        assert_eq!(written(&Value::Float(-1.5)), "-1.5");
    }

    #[test]
    fn split_values_honors_escapes() {
        assert_eq!(split_values("a,b,c"), vec!["a", "b", "c"]);
        assert_eq!(split_values(r"a\,b,c"), vec![r"a\,b", "c"]);
        assert_eq!(split_values("solo"), vec!["solo"]);
        assert_eq!(split_values("x,"), vec!["x", ""]);
    }

    #[test]
    fn custom_codec_registration() {
        struct ShoutCodec;
        impl ValueCodec for ShoutCodec {
            fn parse(
                &self,
                raw: &str,
                _prop: &PropContext<'_>,
                _ctx: &mut ParseContext<'_>,
            ) -> Result<Value, ErrorKind> {
                Ok(Value::Text(raw.to_ascii_uppercase()))
            }
        }

        let mut registry = CodecRegistry::new();
        registry.register(ValueType::Other("X-SHOUT".into()), Box::new(ShoutCodec));

        let mut warnings = Vec::new();
        let params = Params::new();
        let mut ctx = ParseContext::new(
            Mode::Strict,
            &mut warnings,
            &DefaultPolicy,
            &FloatingResolver,
        );
        let prop = PropContext {
            name: "X-PROP",
            params: &params,
        };
        let value = registry
            .get(&ValueType::Other("X-SHOUT".into()))
            .parse("hello", &prop, &mut ctx)
            .unwrap();
        assert_eq!(value, Value::Text("HELLO".into()));
    }
}
