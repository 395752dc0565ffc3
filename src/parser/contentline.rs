//! The octet-aware content-line unfolder.
//!
//! The unfolder turns a byte stream using any mix of LF, CR, and CRLF line
//! endings into logical lines: a first physical line plus any number of
//! continuation lines, each introduced by a single SP or HTAB which is
//! stripped. Content is UTF-8; because CR, LF, SP, and HTAB are ASCII, a
//! fold boundary can never split a multi-byte sequence, but assembled lines
//! are still validated before they are handed on. The physical line number
//! at which each logical line began is tracked for error reporting.

use std::io::BufRead;

use thiserror::Error;

use super::error::{CalendarError, ErrorKind};
use super::property;
use crate::model::property::Params;

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// An atomic wire record: one logical line, split into its name, parameters,
/// and raw (undecoded) value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLine {
    /// Upper-cased property name.
    pub name: String,
    /// Decoded parameters in document order.
    pub params: Params,
    /// The raw value text, not yet interpreted by any codec.
    pub value: String,
    /// The pre-unfolded source text, retained for error messages.
    pub raw_line: String,
    /// The physical line at which the logical line began, 1-based.
    pub line_number: usize,
}

/// One assembled logical line, before property-level parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Unfolded {
    pub text: String,
    pub raw: String,
    pub number: usize,
}

/// An unfolder over a complete input buffer.
pub(crate) struct Unfolder<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
    peeked: Option<(&'a [u8], usize)>,
    any_content: bool,
}

impl<'a> Unfolder<'a> {
    pub(crate) fn new(input: &'a [u8]) -> Self {
        let input = input.strip_prefix(BOM).unwrap_or(input);
        Self {
            input,
            pos: 0,
            line: 1,
            peeked: None,
            any_content: false,
        }
    }

    /// The next physical line (without its ending) and its line number.
    fn take_physical(&mut self) -> Option<(&'a [u8], usize)> {
        if let Some(peeked) = self.peeked.take() {
            return Some(peeked);
        }

        if self.pos >= self.input.len() {
            return None;
        }

        let start = self.pos;
        let number = self.line;
        let mut end = self.input.len();

        let mut i = self.pos;
        while i < self.input.len() {
            match self.input[i] {
                b'\n' => {
                    end = i;
                    self.pos = i + 1;
                    break;
                }
                b'\r' => {
                    end = i;
                    self.pos = if self.input.get(i + 1) == Some(&b'\n') {
                        i + 2
                    } else {
                        i + 1
                    };
                    break;
                }
                _ => i += 1,
            }
        }

        if i == self.input.len() {
            self.pos = self.input.len();
        }

        self.line += 1;
        Some((&self.input[start..end], number))
    }
}

impl Iterator for Unfolder<'_> {
    type Item = Result<Unfolded, CalendarError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (first, number) = loop {
            let (line, number) = self.take_physical()?;
            if !line.is_empty() {
                break (line, number);
            }
        };

        let mut raw = first.to_vec();
        let text_head = if matches!(first.first(), Some(b' ' | b'\t')) {
            if !self.any_content {
                let raw = String::from_utf8_lossy(first).into_owned();
                return Some(Err(ErrorKind::ContinuationFirst.at(1, raw)));
            }
            &first[1..]
        } else {
            first
        };
        self.any_content = true;

        let mut text = text_head.to_vec();
        loop {
            match self.take_physical() {
                Some((line, _)) if matches!(line.first(), Some(b' ' | b'\t')) => {
                    raw.extend_from_slice(b"\r\n");
                    raw.extend_from_slice(line);
                    text.extend_from_slice(&line[1..]);
                }
                Some(other) => {
                    self.peeked = Some(other);
                    break;
                }
                None => break,
            }
        }

        let raw = String::from_utf8_lossy(&raw).into_owned();
        match String::from_utf8(text) {
            Ok(text) => Some(Ok(Unfolded { text, raw, number })),
            Err(_) => Some(Err(ErrorKind::Utf8.at(number, raw))),
        }
    }
}

/// An error produced by the streaming reader: either the underlying reader
/// failed or a line did not parse.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] CalendarError),
}

/// A streaming tokenizer yielding [`ContentLine`]s from any buffered reader.
///
/// This is the `parse_stream` surface: it performs unfolding and
/// property-level splitting but no typed value decoding, so arbitrarily
/// large inputs can be scanned without materializing a component tree.
pub struct ContentLineReader<R> {
    reader: R,
    /// Physical lines split out of the last read chunk but not consumed yet.
    pending: std::collections::VecDeque<Vec<u8>>,
    line: usize,
    peeked: Option<(Vec<u8>, usize)>,
    any_content: bool,
    at_start: bool,
    io_failed: bool,
}

impl<R: BufRead> ContentLineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: std::collections::VecDeque::new(),
            line: 1,
            peeked: None,
            any_content: false,
            at_start: true,
            io_failed: false,
        }
    }

    fn take_physical(&mut self) -> Result<Option<(Vec<u8>, usize)>, std::io::Error> {
        if let Some(peeked) = self.peeked.take() {
            return Ok(Some(peeked));
        }

        let mut chunk = match self.pending.pop_front() {
            Some(chunk) => chunk,
            None => {
                let mut buf = Vec::new();
                if self.reader.read_until(b'\n', &mut buf)? == 0 {
                    return Ok(None);
                }
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                }
                buf
            }
        };

        // A chunk delimited by LF may still contain CR-only line breaks.
        if let Some(i) = chunk.iter().position(|&b| b == b'\r') {
            let tail = chunk.split_off(i + 1);
            chunk.pop();
            if !tail.is_empty() {
                self.pending.push_front(tail);
            }
        }

        if self.at_start {
            self.at_start = false;
            if chunk.starts_with(BOM) {
                chunk.drain(..BOM.len());
            }
        }

        let number = self.line;
        self.line += 1;
        Ok(Some((chunk, number)))
    }

    fn next_unfolded(&mut self) -> Result<Option<Unfolded>, StreamError> {
        let (first, number) = loop {
            match self.take_physical()? {
                Some((line, number)) if !line.is_empty() => break (line, number),
                Some(_) => continue,
                None => return Ok(None),
            }
        };

        let mut raw = first.clone();
        let text_head = if matches!(first.first(), Some(b' ' | b'\t')) {
            if !self.any_content {
                let raw = String::from_utf8_lossy(&first).into_owned();
                return Err(ErrorKind::ContinuationFirst.at(1, raw).into());
            }
            first[1..].to_vec()
        } else {
            first
        };
        self.any_content = true;

        let mut text = text_head;
        loop {
            match self.take_physical()? {
                Some((line, _)) if matches!(line.first(), Some(b' ' | b'\t')) => {
                    raw.extend_from_slice(b"\r\n");
                    raw.extend_from_slice(&line);
                    text.extend_from_slice(&line[1..]);
                }
                Some(other) => {
                    self.peeked = Some(other);
                    break;
                }
                None => break,
            }
        }

        let raw = String::from_utf8_lossy(&raw).into_owned();
        match String::from_utf8(text) {
            Ok(text) => Ok(Some(Unfolded { text, raw, number })),
            Err(_) => Err(ErrorKind::Utf8.at(number, raw).into()),
        }
    }
}

impl<R: BufRead> Iterator for ContentLineReader<R> {
    type Item = Result<ContentLine, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.io_failed {
            return None;
        }

        match self.next_unfolded() {
            Ok(Some(unfolded)) => Some(
                property::content_line(&unfolded, super::config::Mode::Strict)
                    .map_err(StreamError::from),
            ),
            Ok(None) => None,
            Err(err) => {
                if matches!(err, StreamError::Io(_)) {
                    self.io_failed = true;
                }
                Some(Err(err))
            }
        }
    }
}
