//! The property and parameter scanner.
//!
//! Splits one logical line into its name, parameters, and raw value with a
//! single left-to-right scan that tracks quoting. Parameter values are
//! unquoted and RFC 6868-decoded here; the value text is left for the typed
//! codecs.
//!
//! # Grammar
//!
//! ```text
//! contentline   = name *(";" param) ":" value
//! name          = iana-token / x-name
//! param         = param-name "=" param-value *("," param-value)
//! param-value   = paramtext / quoted-string
//! paramtext     = *SAFE-CHAR
//! quoted-string = DQUOTE *QSAFE-CHAR DQUOTE
//! ```

use super::config::Mode;
use super::contentline::{ContentLine, Unfolded};
use super::error::{CalendarError, ErrorKind};
use crate::model::property::{Param, Params};

/// Parses an [`Unfolded`] logical line into a [`ContentLine`].
pub(crate) fn content_line(unfolded: &Unfolded, mode: Mode) -> Result<ContentLine, CalendarError> {
    split(&unfolded.text, mode)
        .map(|(name, params, value)| ContentLine {
            name,
            params,
            value,
            raw_line: unfolded.raw.clone(),
            line_number: unfolded.number,
        })
        .map_err(|kind| kind.at(unfolded.number, unfolded.raw.clone()))
}

#[inline(always)]
fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-'
}

/// Splits `name *(";" param) ":" value`.
fn split(text: &str, mode: Mode) -> Result<(String, Params, String), ErrorKind> {
    let (name, mut rest) = scan_name(text);
    if name.is_empty() {
        return Err(ErrorKind::PropertyName(excerpt(text)));
    }

    let mut params = Params::new();
    let mut in_name = true;

    loop {
        match rest.chars().next() {
            None => return Err(ErrorKind::MissingColon),
            Some(':') => {
                return Ok((name.to_ascii_uppercase(), params, rest[1..].to_owned()));
            }
            Some(';') => {
                let (param, tail) = scan_param(&rest[1..], mode)?;
                params.push(param);
                rest = tail;
                in_name = false;
            }
            Some(c) if in_name => {
                return Err(ErrorKind::PropertyName(format!("{name}{c}")));
            }
            Some(c) => return Err(ErrorKind::ParamChar(c)),
        }
    }
}

fn scan_name(text: &str) -> (&str, &str) {
    let end = text.find(|c| !is_name_char(c)).unwrap_or(text.len());
    text.split_at(end)
}

/// Scans one `param-name "=" param-value *("," param-value)`.
fn scan_param<'a>(text: &'a str, mode: Mode) -> Result<(Param, &'a str), ErrorKind> {
    let (name, rest) = scan_name(text);
    if name.is_empty() {
        return Err(ErrorKind::ParamName(excerpt(text)));
    }

    let Some(mut rest) = rest.strip_prefix('=') else {
        let mut offending = name.to_owned();
        offending.extend(rest.chars().next());
        return Err(ErrorKind::ParamName(offending));
    };

    let mut values = Vec::new();
    loop {
        let (piece, tail) = scan_param_value(rest)?;
        values.push(decode_caret(piece, mode)?);

        match tail.strip_prefix(',') {
            Some(next) => rest = next,
            None => {
                rest = tail;
                break;
            }
        }
    }

    Ok((
        Param {
            name: name.to_owned(),
            values,
        },
        rest,
    ))
}

/// Scans a single quoted or unquoted parameter value, returning the piece
/// without quotes and the unconsumed tail.
fn scan_param_value(rest: &str) -> Result<(&str, &str), ErrorKind> {
    if let Some(inner) = rest.strip_prefix('"') {
        let Some(end) = inner.find('"') else {
            return Err(ErrorKind::UnclosedQuote);
        };

        let piece = &inner[..end];
        check_controls(piece)?;
        Ok((piece, &inner[end + 1..]))
    } else {
        let end = rest.find([',', ';', ':', '"']).unwrap_or(rest.len());
        if rest[end..].starts_with('"') {
            return Err(ErrorKind::ParamChar('"'));
        }

        let piece = &rest[..end];
        check_controls(piece)?;
        Ok((piece, &rest[end..]))
    }
}

fn check_controls(piece: &str) -> Result<(), ErrorKind> {
    match piece.chars().find(|&c| c.is_control() && c != '\t') {
        Some(c) => Err(ErrorKind::ParamChar(c)),
        None => Ok(()),
    }
}

fn excerpt(text: &str) -> String {
    text.chars().take(24).collect()
}

/// Decodes the RFC 6868 caret escapes inside a parameter value: `^n` is LF,
/// `^^` is a caret, and `^'` is a double quote. Any other pair fails in
/// strict mode and passes through literally in lenient mode.
pub(crate) fn decode_caret(piece: &str, mode: Mode) -> Result<String, ErrorKind> {
    if !piece.contains('^') {
        return Ok(piece.to_owned());
    }

    let mut out = String::with_capacity(piece.len());
    let mut chars = piece.chars();

    while let Some(c) = chars.next() {
        if c != '^' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => out.push('\n'),
            Some('^') => out.push('^'),
            Some('\'') => out.push('"'),
            Some(other) if mode.is_lenient() => {
                out.push('^');
                out.push(other);
            }
            Some(other) => return Err(ErrorKind::CaretEscape(format!("^{other}"))),
            None if mode.is_lenient() => out.push('^'),
            None => return Err(ErrorKind::CaretEscape("^".to_owned())),
        }
    }

    Ok(out)
}

/// The inverse of [`decode_caret`]: escapes carets, double quotes, and
/// newlines so the result is a legal parameter value.
pub(crate) fn encode_caret(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '^' => out.push_str("^^"),
            '"' => out.push_str("^'"),
            '\n' => out.push_str("^n"),
            // a bare CR cannot survive the wire format; fold it into ^n
            '\r' => (),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> Unfolded {
        Unfolded {
            text: text.to_owned(),
            raw: text.to_owned(),
            number: 1,
        }
    }

    fn parse(text: &str) -> Result<ContentLine, CalendarError> {
        content_line(&line(text), Mode::Strict)
    }

    #[test]
    fn bare_property() {
        let cl = parse("SUMMARY:Hello, world: again").unwrap();
        assert_eq!(cl.name, "SUMMARY");
        assert!(cl.params.is_empty());
        assert_eq!(cl.value, "Hello, world: again");
    }

    #[test]
    fn name_is_upper_cased() {
        let cl = parse("dtstart:20260101").unwrap();
        assert_eq!(cl.name, "DTSTART");
    }

    #[test]
    fn empty_value() {
        let cl = parse("X-EMPTY:").unwrap();
        assert_eq!(cl.value, "");
    }

    #[test]
    fn single_parameter() {
        let cl = parse("DTSTART;TZID=Europe/Berlin:20260101T090000").unwrap();
        assert_eq!(cl.params.first("TZID"), Some("Europe/Berlin"));
        assert_eq!(cl.value, "20260101T090000");
    }

    #[test]
    fn quoted_parameter_shields_separators() {
        let cl = parse("ATTENDEE;CN=\"Doe; John, Jr: Esq.\":mailto:a@b").unwrap();
        assert_eq!(cl.params.first("CN"), Some("Doe; John, Jr: Esq."));
        assert_eq!(cl.value, "mailto:a@b");
    }

    #[test]
    fn multi_valued_parameter() {
        let cl = parse("ATTENDEE;MEMBER=\"mailto:a@b\",\"mailto:c@d\",plain:mailto:x@y").unwrap();
        let member = cl.params.get("MEMBER").unwrap();
        assert_eq!(member.values, vec!["mailto:a@b", "mailto:c@d", "plain"]);
    }

    #[test]
    fn rfc6868_escapes_decode() {
        let cl = parse("X-INFO;CN=\"Say ^'hi^' ^nthere\":v").unwrap();
        assert_eq!(cl.params.first("CN"), Some("Say \"hi\" \nthere"));
    }

    #[test]
    fn stray_caret_strict_vs_lenient() {
        let err = parse("X;P=a^qb:v").unwrap_err();
        assert_eq!(err.kind, ErrorKind::CaretEscape("^q".into()));

        let cl = content_line(&line("X;P=a^qb:v"), Mode::Lenient).unwrap();
        assert_eq!(cl.params.first("P"), Some("a^qb"));
    }

    #[test]
    fn caret_round_trip() {
        let decoded = "Say \"hi\" \nthere";
        assert_eq!(encode_caret(decoded), "Say ^'hi^' ^nthere");
        assert_eq!(
            decode_caret(&encode_caret(decoded), Mode::Strict).unwrap(),
            decoded
        );
    }

    #[test]
    fn missing_colon() {
        assert_eq!(parse("SUMMARY").unwrap_err().kind, ErrorKind::MissingColon);
        assert_eq!(
            parse("SUMMARY;X=1").unwrap_err().kind,
            ErrorKind::MissingColon
        );
    }

    #[test]
    fn unclosed_quote() {
        assert_eq!(
            parse("A;P=\"never closed:v").unwrap_err().kind,
            ErrorKind::UnclosedQuote
        );
    }

    #[test]
    fn bad_names() {
        assert!(matches!(
            parse(":no name").unwrap_err().kind,
            ErrorKind::PropertyName(_)
        ));
        assert!(matches!(
            parse("BAD NAME:x").unwrap_err().kind,
            ErrorKind::PropertyName(_)
        ));
        assert!(matches!(
            parse("A;=v:x").unwrap_err().kind,
            ErrorKind::ParamName(_)
        ));
        assert!(matches!(
            parse("A;P~=v:x").unwrap_err().kind,
            ErrorKind::ParamName(_)
        ));
    }

    #[test]
    fn quote_in_bare_value_rejected() {
        assert_eq!(
            parse("A;P=ab\"cd\":x").unwrap_err().kind,
            ErrorKind::ParamChar('"')
        );
    }

    #[test]
    fn empty_parameter_value_is_legal() {
        let cl = parse("A;P=:v").unwrap();
        assert_eq!(cl.params.first("P"), Some(""));
    }

    #[test]
    fn errors_carry_line_and_raw() {
        let unfolded = Unfolded {
            text: "SUMMARY".into(),
            raw: "SUMMARY".into(),
            number: 7,
        };
        let err = content_line(&unfolded, Mode::Strict).unwrap_err();
        assert_eq!(err.line, 7);
        assert_eq!(err.raw, "SUMMARY");
    }
}
