//! The octet-aware line folder.
//!
//! Logical lines longer than the configured octet limit are split into
//! physical lines joined by CRLF + SP. A break never lands inside a
//! multi-byte UTF-8 sequence; when a `;` or `,` occurs near the end of the
//! window the break is placed right after it, which keeps parameter lists
//! and value lists readable in the raw file. Continuation lines budget one
//! octet for their leading space so every physical line stays within the
//! limit.

use std::io;

pub(crate) const DEFAULT_FOLD_WIDTH: usize = 75;

/// How far back from the window edge to look for a `;` or `,` break.
const SEPARATOR_LOOKBACK: usize = 15;

/// Writes one logical line, folded to `limit` octets per physical line and
/// terminated by CRLF.
pub(crate) fn write_folded<W: io::Write>(out: &mut W, line: &str, limit: usize) -> io::Result<()> {
    let mut bytes = line.as_bytes();
    let mut first = true;

    loop {
        let capacity = if first { limit } else { limit - 1 };
        if bytes.len() <= capacity {
            out.write_all(bytes)?;
            break;
        }

        let cut = boundary(bytes, capacity);
        out.write_all(&bytes[..cut])?;
        out.write_all(b"\r\n ")?;
        bytes = &bytes[cut..];
        first = false;
    }

    out.write_all(b"\r\n")
}

/// The number of octets of `bytes` to place on the current physical line,
/// at most `capacity`.
fn boundary(bytes: &[u8], capacity: usize) -> usize {
    debug_assert!(bytes.len() > capacity);

    // an ASCII separator is a complete code point, so the position right
    // after it is always a valid boundary
    let window_start = capacity.saturating_sub(SEPARATOR_LOOKBACK);
    if let Some(i) = bytes[window_start..capacity]
        .iter()
        .rposition(|&b| b == b';' || b == b',')
    {
        return window_start + i + 1;
    }

    let mut cut = capacity;
    while cut > 0 && bytes[cut] & 0xC0 == 0x80 {
        cut -= 1;
    }

    if cut == 0 { capacity } else { cut }
}
