//! Classification of raw modem output into the payload shapes the tracker
//! acts on.
//!
//! The modem interleaves command echoes, status lines and URCs on a single
//! text stream. Alerts arrive as a JSON object embedded in a `+QMTRECV` URC,
//! GNSS fixes as an NMEA sentence whose fields follow the first comma.

/// Payload extracted from one receive cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifiedPayload<'a> {
    Empty,
    /// Text span of the first embedded JSON object.
    JsonObject(&'a str),
    /// Comma separated fields following the first comma.
    CsvFields(CsvFields<'a>),
}

/// Ordered comma separated fields of a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvFields<'a> {
    line: &'a str,
}

impl<'a> CsvFields<'a> {
    pub fn as_str(&self) -> &'a str {
        self.line
    }

    pub fn iter(&self) -> core::str::Split<'a, char> {
        self.line.split(',')
    }

    pub fn get(&self, index: usize) -> Option<&'a str> {
        self.iter().nth(index)
    }
}

/// Classify a raw response.
///
/// The first `{` wins over any comma: it starts a JSON object that runs to
/// its matching `}`, or to the end of the text if the frame was cut short.
/// Otherwise the remainder of the line holding the first comma is returned as
/// fields. Text with neither is [`ClassifiedPayload::Empty`].
pub fn classify(raw: &str) -> ClassifiedPayload<'_> {
    if let Some(start) = raw.find('{') {
        let object = &raw[start..];
        let end = matching_brace(object).map_or(object.trim_end().len(), |i| i + 1);
        return ClassifiedPayload::JsonObject(&object[..end]);
    }

    match raw.split_once(',') {
        Some((_, rest)) => {
            let line = rest.split(['\r', '\n']).next().unwrap_or_default();
            ClassifiedPayload::CsvFields(CsvFields { line })
        }
        None => ClassifiedPayload::Empty,
    }
}

/// Byte index of the `}` closing the object that starts at `text[0]`.
fn matching_brace(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in text.bytes().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
