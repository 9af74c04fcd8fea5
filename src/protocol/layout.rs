//! Argument layouts
//!
//! Fixed binary layouts for command arguments and response values.
//!
//! A layout is an ordered list of integer fields. Layouts can be built from
//! [`Field`] constructors or parsed from a compact notation:
//!
//! ```text
//! >        following fields are big-endian
//! <        following fields are little-endian (the default)
//! b / B    signed / unsigned 8-bit
//! h / H    signed / unsigned 16-bit
//! i / I    signed / unsigned 32-bit
//! ?        unsigned 8-bit flag
//! 24B      a count repeats the next field
//! ```
//!
//! So `">Ib"` is a big-endian u32 followed by an i8.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, WatchError};

/// Byte order of a multi-byte field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

/// Size of a field on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    One,
    Two,
    Four,
}

impl Width {
    /// Size in bytes
    pub const fn bytes(self) -> usize {
        match self {
            Width::One => 1,
            Width::Two => 2,
            Width::Four => 4,
        }
    }

    const fn bits(self) -> u32 {
        self.bytes() as u32 * 8
    }
}

impl TryFrom<usize> for Width {
    type Error = WatchError;

    fn try_from(bytes: usize) -> Result<Self> {
        match bytes {
            1 => Ok(Width::One),
            2 => Ok(Width::Two),
            4 => Ok(Width::Four),
            other => Err(WatchError::Argument(format!(
                "Field width must be 1, 2 or 4 bytes, got {other}"
            ))),
        }
    }
}

/// One integer field of a layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub width: Width,
    pub signed: bool,
    pub endian: Endian,
}

impl Field {
    /// Field of `bytes` width; only 1, 2 and 4 byte integers exist on the wire
    pub fn new(bytes: usize, signed: bool, endian: Endian) -> Result<Self> {
        Ok(Self {
            width: Width::try_from(bytes)?,
            signed,
            endian,
        })
    }

    pub const fn u8() -> Self {
        Self { width: Width::One, signed: false, endian: Endian::Little }
    }

    pub const fn i8() -> Self {
        Self { width: Width::One, signed: true, endian: Endian::Little }
    }

    pub const fn u16(endian: Endian) -> Self {
        Self { width: Width::Two, signed: false, endian }
    }

    pub const fn i16(endian: Endian) -> Self {
        Self { width: Width::Two, signed: true, endian }
    }

    pub const fn u32(endian: Endian) -> Self {
        Self { width: Width::Four, signed: false, endian }
    }

    pub const fn i32(endian: Endian) -> Self {
        Self { width: Width::Four, signed: true, endian }
    }

    /// Inclusive value range representable by this field
    pub fn range(&self) -> (i64, i64) {
        let bits = self.width.bits();
        if self.signed {
            (-(1i64 << (bits - 1)), (1i64 << (bits - 1)) - 1)
        } else {
            (0, (1i64 << bits) - 1)
        }
    }

    fn encode(&self, value: i64, out: &mut Vec<u8>) -> Result<()> {
        let (min, max) = self.range();
        if value < min || value > max {
            return Err(WatchError::Argument(format!(
                "Value {} out of range for {} ({}..={})",
                value, self, min, max
            )));
        }

        // Two's complement truncation is exact once the range check passed
        let raw = (value as u32).to_le_bytes();
        let bytes = &raw[..self.width.bytes()];
        match self.endian {
            Endian::Little => out.extend_from_slice(bytes),
            Endian::Big => out.extend(bytes.iter().rev()),
        }
        Ok(())
    }

    fn decode(&self, bytes: &[u8]) -> i64 {
        let mut raw = [0u8; 4];
        match self.endian {
            Endian::Little => raw[..bytes.len()].copy_from_slice(bytes),
            Endian::Big => {
                for (dst, src) in raw.iter_mut().zip(bytes.iter().rev()) {
                    *dst = *src;
                }
            }
        }
        let unsigned = u32::from_le_bytes(raw);

        match (self.signed, self.width) {
            (true, Width::One) => i64::from(unsigned as u8 as i8),
            (true, Width::Two) => i64::from(unsigned as u16 as i16),
            (true, Width::Four) => i64::from(unsigned as i32),
            (false, _) => i64::from(unsigned),
        }
    }

    fn code(&self) -> char {
        match (self.width, self.signed) {
            (Width::One, true) => 'b',
            (Width::One, false) => 'B',
            (Width::Two, true) => 'h',
            (Width::Two, false) => 'H',
            (Width::Four, true) => 'i',
            (Width::Four, false) => 'I',
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.signed { 'i' } else { 'u' };
        let bits = self.width.bits();
        match (self.width, self.endian) {
            (Width::One, _) => write!(f, "{kind}{bits}"),
            (_, Endian::Big) => write!(f, "{kind}{bits}be"),
            (_, Endian::Little) => write!(f, "{kind}{bits}le"),
        }
    }
}

/// Ordered list of fields describing a packed argument or response block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    fields: Vec<Field>,
}

impl Layout {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Layout with no fields (commands without arguments)
    pub fn empty() -> Self {
        Self::default()
    }

    /// `count` copies of the same field
    pub fn repeat(field: Field, count: usize) -> Self {
        Self { fields: vec![field; count] }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Total packed size in bytes
    pub fn byte_len(&self) -> usize {
        self.fields.iter().map(|f| f.width.bytes()).sum()
    }

    /// Pack values according to this layout
    pub fn pack(&self, values: &[i64]) -> Result<Vec<u8>> {
        if values.len() != self.fields.len() {
            return Err(WatchError::Argument(format!(
                "Layout {} takes {} values, got {}",
                self,
                self.fields.len(),
                values.len()
            )));
        }

        let mut out = Vec::with_capacity(self.byte_len());
        for (field, value) in self.fields.iter().zip(values) {
            field.encode(*value, &mut out)?;
        }
        Ok(out)
    }

    /// Unpack bytes according to this layout
    ///
    /// The byte count must match the layout size exactly.
    pub fn unpack(&self, bytes: &[u8]) -> Result<Vec<i64>> {
        if bytes.len() != self.byte_len() {
            return Err(WatchError::Argument(format!(
                "Layout {} needs {} bytes, got {}: {}",
                self,
                self.byte_len(),
                bytes.len(),
                super::to_hex_str(bytes)
            )));
        }

        let mut values = Vec::with_capacity(self.fields.len());
        let mut offset = 0;
        for field in &self.fields {
            let width = field.width.bytes();
            values.push(field.decode(&bytes[offset..offset + width]));
            offset += width;
        }
        Ok(values)
    }
}

impl FromStr for Layout {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self> {
        let mut fields = Vec::new();
        let mut endian = Endian::Little;
        let mut count: Option<usize> = None;

        for c in s.chars() {
            if c.is_whitespace() {
                continue;
            }
            if let Some(digit) = c.to_digit(10) {
                count = Some(count.unwrap_or(0) * 10 + digit as usize);
                if count > Some(super::codec::MAX_PAYLOAD_SIZE) {
                    return Err(WatchError::Argument(format!("Repeat count too large in layout {s:?}")));
                }
                continue;
            }

            let field = match c {
                '>' | '!' => {
                    endian = Endian::Big;
                    continue;
                }
                '<' => {
                    endian = Endian::Little;
                    continue;
                }
                'b' => Field::i8(),
                'B' | '?' => Field::u8(),
                'h' => Field::i16(endian),
                'H' => Field::u16(endian),
                'i' | 'l' => Field::i32(endian),
                'I' | 'L' => Field::u32(endian),
                other => {
                    return Err(WatchError::Argument(format!(
                        "Unknown field code {other:?} in layout {s:?}"
                    )))
                }
            };
            let n = count.take().unwrap_or(1);
            fields.extend(std::iter::repeat(field).take(n));
        }

        if count.is_some() {
            return Err(WatchError::Argument(format!("Dangling repeat count in layout {s:?}")));
        }

        Ok(Self { fields })
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fields.is_empty() {
            return f.write_str("\"\"");
        }
        f.write_str("\"")?;
        let mut current = Endian::Little;
        for field in &self.fields {
            if field.width != Width::One && field.endian != current {
                current = field.endian;
                f.write_str(if current == Endian::Big { ">" } else { "<" })?;
            }
            write!(f, "{}", field.code())?;
        }
        f.write_str("\"")
    }
}

// =============================================================================
// Value Coercion
// =============================================================================

/// Coerce textual values (decimal, `0x` hex, `true`/`false`) to integers
pub fn parse_values<S: AsRef<str>>(raw: &[S]) -> Result<Vec<i64>> {
    raw.iter().map(|s| parse_value(s.as_ref())).collect()
}

fn parse_value(s: &str) -> Result<i64> {
    let s = s.trim();
    let parsed = match s {
        "true" | "on" => Ok(1),
        "false" | "off" => Ok(0),
        _ => match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(digits) => i64::from_str_radix(digits, 16),
            None => s.parse::<i64>(),
        },
    };
    parsed.map_err(|_| WatchError::Argument(format!("Arguments must be integers, got {s:?}")))
}

// =============================================================================
// Minute Pairs
// =============================================================================

/// Minutes from midnight for an (hour, minute) pair
pub fn encode_minute_pair(hour: i64, minute: i64) -> i64 {
    hour * 60 + minute
}

/// (hour, minute) for a minutes-from-midnight value, via floored divmod
pub fn decode_minute_pair(value: i64) -> (i64, i64) {
    (value.div_euclid(60), value.rem_euclid(60))
}

/// Layout of a from/to minute-pair response: two big-endian i16
pub fn minute_pair_layout() -> Layout {
    Layout::repeat(Field::i16(Endian::Big), 2)
}
