//! Hex helpers
//!
//! Human readable byte dumps (`fe ea 10 09`) and command key notation
//! (`0x16`) used by debug logging and the CLI.

use crate::error::{Result, WatchError};

/// Format bytes as lowercase hex pairs separated by single spaces
pub fn to_hex_str(bytes: &[u8]) -> String {
    let encoded = ::hex::encode(bytes);
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, pair) in encoded.as_bytes().chunks(2).enumerate() {
        if i > 0 {
            out.push(' ');
        }
        // hex::encode only produces ASCII
        out.push(pair[0] as char);
        out.push(pair[1] as char);
    }
    out
}

/// Parse a hex string into bytes. Whitespace between pairs is ignored.
pub fn from_hex_str(s: &str) -> Result<Vec<u8>> {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    ::hex::decode(&compact).map_err(|e| WatchError::Argument(format!("Invalid hex bytes: {s:?} ({e})")))
}

/// Format a command key as `0x..`
pub fn format_key(key: u8) -> String {
    format!("0x{key:02x}")
}

/// Parse a command key written as `0x16` (hex) or `22` (decimal)
pub fn parse_key(s: &str) -> Result<u8> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(digits) => u8::from_str_radix(digits, 16),
        None => s.parse::<u8>(),
    };
    parsed.map_err(|_| WatchError::Argument(format!("Invalid command key: {s:?}")))
}
