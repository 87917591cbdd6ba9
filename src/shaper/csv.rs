//! CSV writer
//!
//! RFC 4180 output: CRLF line endings; fields holding a comma, quote, CR or
//! LF are quoted, with embedded quotes doubled.

use std::borrow::Cow;

/// Accumulates CSV records into a string
#[derive(Debug, Default)]
pub struct CsvWriter {
    buf: String,
    records: usize,
}

impl CsvWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record
    pub fn write_record<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for (i, field) in fields.into_iter().enumerate() {
            if i > 0 {
                self.buf.push(',');
            }
            self.buf.push_str(&escape_field(field.as_ref()));
        }
        self.buf.push_str("\r\n");
        self.records += 1;
    }

    /// Records written so far, header included
    pub fn records(&self) -> usize {
        self.records
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

/// Quote a field when it needs quoting
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
