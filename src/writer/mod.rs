//! Serializing component trees to the wire format.
//!
//! Each component prints as `BEGIN:<NAME>`, its properties, its
//! sub-components, and `END:<NAME>`; every line goes through the folder for
//! octet-width compliance. Parameter values are RFC 6868-encoded and then
//! quoted exactly when they contain `:`, `;`, or `,`.

mod fold;

use std::io;

use fold::{DEFAULT_FOLD_WIDTH, write_folded};

use crate::codec;
use crate::model::component::Component;
use crate::model::property::Property;
use crate::parser::property::encode_caret;

/// A configurable serializer.
#[derive(Debug, Clone)]
pub struct Writer {
    fold_width: usize,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    pub fn new() -> Self {
        Self {
            fold_width: DEFAULT_FOLD_WIDTH,
        }
    }

    /// Adjusts the fold limit. Widths below 8 octets are clamped up so a
    /// physical line can always hold at least one code point.
    pub fn with_fold_width(mut self, width: usize) -> Self {
        self.fold_width = width.max(8);
        self
    }

    pub fn write<W: io::Write>(&self, component: &Component, out: &mut W) -> io::Result<()> {
        write_folded(out, &format!("BEGIN:{}", component.name), self.fold_width)?;

        // RFC 9073 §6.5: a non-derived DESCRIPTION must not accompany
        // STYLED-DESCRIPTION in the output.
        let suppress_description = component.has_property("STYLED-DESCRIPTION");

        for prop in &component.properties {
            if suppress_description && prop.name == "DESCRIPTION" && !prop.params.is_derived() {
                continue;
            }
            write_folded(out, &property_line(prop), self.fold_width)?;
        }

        for child in &component.components {
            self.write(child, out)?;
        }

        write_folded(out, &format!("END:{}", component.name), self.fold_width)
    }

    pub fn write_to_vec(&self, component: &Component) -> Vec<u8> {
        let mut out = Vec::new();
        // writing into a Vec cannot fail
        let _ = self.write(component, &mut out);
        out
    }
}

/// Serializes a component tree with the default 75-octet fold width.
pub fn write(component: &Component) -> Vec<u8> {
    Writer::new().write_to_vec(component)
}

fn property_line(prop: &Property) -> String {
    let mut line = String::with_capacity(64);
    line.push_str(&prop.name);

    for param in &prop.params {
        line.push(';');
        line.push_str(&param.name);
        line.push('=');
        for (i, value) in param.values.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            push_param_value(&mut line, value);
        }
    }

    line.push(':');
    for (i, value) in prop.values().enumerate() {
        if i > 0 {
            line.push(',');
        }
        // writing to a String cannot fail
        let _ = codec::write_value(value, &mut line);
    }

    line
}

fn push_param_value(line: &mut String, value: &str) {
    let encoded = encode_caret(value);
    if encoded.contains([':', ';', ',']) {
        line.push('"');
        line.push_str(&encoded);
        line.push('"');
    } else {
        line.push_str(&encoded);
    }
}
