//! Source Map v3 output for the generated text.
//!
//! The printer hands over `(original BytePos, generated line/column)` pairs in
//! emission order; they are resolved against the `SourceMap` the tree was
//! parsed with and encoded as Base64 VLQ segments.

use std::sync::OnceLock;

use base64::alphabet::{self, Alphabet};
use serde::{Deserialize, Serialize};
use swc_core::common::{sync::Lrc, FileName, SourceMap};

use crate::error::{InstrumentError, Result};
use crate::printer::RecordedPosition;

/// VLQ digits are the standard Base64 alphabet; `base64` is used for that
/// alphabet only, the digit arithmetic is done here.
static VLQ_ALPHABET: Alphabet = alphabet::STANDARD;

const NOT_A_DIGIT: u8 = u8::MAX;

const VLQ_SHIFT: u32 = 5;
const VLQ_CONTINUATION: u32 = 1 << VLQ_SHIFT;
const VLQ_MASK: u32 = VLQ_CONTINUATION - 1;

/// One segment of the map. All coordinates are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub generated_line: u32,
    pub generated_column: u32,
    pub source: u32,
    pub original_line: u32,
    pub original_column: u32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMapJson {
    pub version: u32,
    pub file: String,
    pub sources: Vec<String>,
    pub names: Vec<String>,
    pub mappings: String,
}

#[derive(Debug, Default)]
pub struct SourceMapBuilder {
    file: String,
    sources: Vec<String>,
    mappings: Vec<Mapping>,
}

impl SourceMapBuilder {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            ..Default::default()
        }
    }

    fn source_index(&mut self, name: String) -> u32 {
        match self.sources.iter().position(|s| *s == name) {
            Some(i) => i as u32,
            None => {
                self.sources.push(name);
                (self.sources.len() - 1) as u32
            }
        }
    }

    pub fn add(
        &mut self,
        generated_line: u32,
        generated_column: u32,
        source: &str,
        original_line: u32,
        original_column: u32,
    ) {
        let source = self.source_index(source.to_string());
        let mapping = Mapping {
            generated_line,
            generated_column,
            source,
            original_line,
            original_column,
        };
        if self.mappings.last() != Some(&mapping) {
            self.mappings.push(mapping);
        }
    }

    /// Resolves printer positions through `cm`. Dummy and comment-reserved
    /// positions carry no location and are skipped.
    pub(crate) fn add_recorded(&mut self, cm: &Lrc<SourceMap>, positions: &[RecordedPosition]) {
        for pos in positions {
            if pos.source_pos.is_dummy() || pos.source_pos.is_reserved_for_comments() {
                continue;
            }
            let loc = cm.lookup_char_pos(pos.source_pos);
            self.add(
                pos.generated_line,
                pos.generated_column,
                &source_name(&loc.file.name),
                loc.line.saturating_sub(1) as u32,
                loc.col.0 as u32,
            );
        }
    }

    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn build(&self) -> SourceMapJson {
        SourceMapJson {
            version: 3,
            file: self.file.clone(),
            sources: self.sources.clone(),
            names: vec![],
            mappings: encode_mappings(&self.mappings),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.build())?)
    }
}

/// Name written to `sources` for a parsed file.
fn source_name(name: &FileName) -> String {
    let mut s = match name {
        FileName::Custom(custom) => custom.clone(),
        FileName::Real(path) => path.display().to_string(),
        other => other.to_string(),
    };
    s = s.replace('\\', "/");
    for prefix in ["file:///", "file://"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            return rest.to_string();
        }
    }
    s
}

// -----------------------------------------------------------------------------
// VLQ
// -----------------------------------------------------------------------------

fn vlq_digits() -> &'static [u8] {
    VLQ_ALPHABET.as_str().as_bytes()
}

/// Byte to digit value, `NOT_A_DIGIT` for bytes outside the alphabet.
fn vlq_values() -> &'static [u8; 256] {
    static VALUES: OnceLock<[u8; 256]> = OnceLock::new();
    VALUES.get_or_init(|| {
        let mut values = [NOT_A_DIGIT; 256];
        for (value, &digit) in vlq_digits().iter().enumerate() {
            values[digit as usize] = value as u8;
        }
        values
    })
}

fn encode_vlq(out: &mut String, value: i64) {
    let digits = vlq_digits();
    let mut rest = if value < 0 {
        ((-value as u64) << 1) | 1
    } else {
        (value as u64) << 1
    };
    loop {
        let mut digit = (rest & VLQ_MASK as u64) as u32;
        rest >>= VLQ_SHIFT;
        if rest > 0 {
            digit |= VLQ_CONTINUATION;
        }
        out.push(digits[digit as usize] as char);
        if rest == 0 {
            break;
        }
    }
}

/// Encodes mappings into a `mappings` string. Entries are ordered by
/// generated position first; entries at the same position keep their order.
pub fn encode_mappings(mappings: &[Mapping]) -> String {
    let mut sorted = mappings.to_vec();
    sorted.sort_by_key(|m| (m.generated_line, m.generated_column));

    let mut out = String::new();
    let mut line = 0;
    let mut prev_column = 0i64;
    let mut prev_source = 0i64;
    let mut prev_line = 0i64;
    let mut prev_orig_column = 0i64;
    let mut first_in_line = true;

    for m in &sorted {
        while line < m.generated_line {
            out.push(';');
            line += 1;
            prev_column = 0;
            first_in_line = true;
        }
        if !first_in_line {
            out.push(',');
        }
        first_in_line = false;

        encode_vlq(&mut out, m.generated_column as i64 - prev_column);
        encode_vlq(&mut out, m.source as i64 - prev_source);
        encode_vlq(&mut out, m.original_line as i64 - prev_line);
        encode_vlq(&mut out, m.original_column as i64 - prev_orig_column);

        prev_column = m.generated_column as i64;
        prev_source = m.source as i64;
        prev_line = m.original_line as i64;
        prev_orig_column = m.original_column as i64;
    }
    out
}

fn decode_segment(segment: &str) -> Result<Vec<i64>> {
    let digits = vlq_values();
    let mut values = vec![];
    let mut value = 0u64;
    let mut shift = 0u32;
    for ch in segment.bytes() {
        let digit = match digits[ch as usize] {
            NOT_A_DIGIT => {
                return Err(InstrumentError::SourceMap(format!(
                    "invalid VLQ digit `{}`",
                    ch as char
                )))
            }
            value => value as u64,
        };
        if shift > 60 {
            return Err(InstrumentError::SourceMap("VLQ value overflows".into()));
        }
        value |= (digit & VLQ_MASK as u64) << shift;
        if digit & VLQ_CONTINUATION as u64 != 0 {
            shift += VLQ_SHIFT;
            continue;
        }
        let magnitude = (value >> 1) as i64;
        values.push(if value & 1 == 1 { -magnitude } else { magnitude });
        value = 0;
        shift = 0;
    }
    if shift != 0 {
        return Err(InstrumentError::SourceMap(format!(
            "truncated VLQ segment `{segment}`"
        )));
    }
    Ok(values)
}

/// Decodes a `mappings` string back into absolute positions.
///
/// Segments with only a generated column (no source) are dropped.
pub fn decode_mappings(mappings: &str) -> Result<Vec<Mapping>> {
    let mut out = vec![];
    let mut source = 0i64;
    let mut original_line = 0i64;
    let mut original_column = 0i64;

    for (line, group) in mappings.split(';').enumerate() {
        let mut column = 0i64;
        for segment in group.split(',').filter(|s| !s.is_empty()) {
            let fields = decode_segment(segment)?;
            match fields.len() {
                1 => {
                    column += fields[0];
                    continue;
                }
                4 | 5 => {}
                n => {
                    return Err(InstrumentError::SourceMap(format!(
                        "segment `{segment}` has {n} fields"
                    )))
                }
            }
            column += fields[0];
            source += fields[1];
            original_line += fields[2];
            original_column += fields[3];
            if column < 0 || source < 0 || original_line < 0 || original_column < 0 {
                return Err(InstrumentError::SourceMap(format!(
                    "segment `{segment}` resolves to a negative position"
                )));
            }
            out.push(Mapping {
                generated_line: line as u32,
                generated_column: column as u32,
                source: source as u32,
                original_line: original_line as u32,
                original_column: original_column as u32,
            });
        }
    }
    Ok(out)
}
