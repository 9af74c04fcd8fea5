//! Packet codec
//!
//! Framing of command payloads into wire packets, and MTU chunking.
//!
//! ## Wire Format
//! ```text
//! ┌──────┬──────┬──────┬─────────┬──────────┬──────────────────────┐
//! │ 0xFE │ 0xEA │ 0x10 │ Len (1) │ Cmd (1)  │   Arguments (0..250) │
//! └──────┴──────┴──────┴─────────┴──────────┴──────────────────────┘
//! ```
//! `Len` counts the 4 header bytes plus the payload (command byte + arguments).

use crate::error::{Result, WatchError};

/// Constant header prefix of every packet
pub const MAGIC: [u8; 3] = [0xFE, 0xEA, 0x10];

/// Header size: 3 magic bytes + 1 length byte
pub const HEADER_SIZE: usize = 4;

/// Largest payload (command byte included) the length byte can describe
pub const MAX_PAYLOAD_SIZE: usize = u8::MAX as usize - HEADER_SIZE;

/// Largest argument block that fits next to the command byte
pub const MAX_ARGS_SIZE: usize = MAX_PAYLOAD_SIZE - 1;

/// ATT writes and notifications carry at most 20 data bytes
pub const CHUNK_SIZE: usize = 20;

/// Parsed packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Raw length byte (header + payload)
    pub length: u8,
}

impl PacketHeader {
    /// Number of payload bytes, command byte included
    pub fn payload_len(&self) -> usize {
        self.length as usize - HEADER_SIZE
    }

    /// Number of argument/response bytes after the command byte
    pub fn data_len(&self) -> usize {
        self.payload_len() - 1
    }
}

// =============================================================================
// Framing
// =============================================================================

/// Build a packet from a command byte and its argument bytes
///
/// Format: MAGIC (3) + len (1) + cmd (1) + args
pub fn frame(command_key: u8, args: &[u8]) -> Result<Vec<u8>> {
    if args.len() > MAX_ARGS_SIZE {
        return Err(WatchError::Argument(format!(
            "Arguments too long for command 0x{:02x}: {} bytes (max {})",
            command_key,
            args.len(),
            MAX_ARGS_SIZE
        )));
    }

    let payload_len = 1 + args.len();
    let mut packet = Vec::with_capacity(HEADER_SIZE + payload_len);
    packet.extend_from_slice(&MAGIC);
    packet.push((payload_len + HEADER_SIZE) as u8);
    packet.push(command_key);
    packet.extend_from_slice(args);

    Ok(packet)
}

/// Parse and validate the header at the start of `bytes`
pub fn parse_header(bytes: &[u8]) -> Result<PacketHeader> {
    if bytes.len() < HEADER_SIZE {
        return Err(WatchError::Protocol(format!(
            "Incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }

    if bytes[..3] != MAGIC {
        return Err(WatchError::Protocol(format!(
            "Expected bytes to start with header (fe ea 10), got: {}",
            super::to_hex_str(bytes)
        )));
    }

    let length = bytes[3];
    // The payload always carries at least the command byte
    if (length as usize) < HEADER_SIZE + 1 {
        return Err(WatchError::Protocol(format!(
            "Invalid length byte {} (min {})",
            length,
            HEADER_SIZE + 1
        )));
    }

    Ok(PacketHeader { length })
}

// =============================================================================
// Chunking
// =============================================================================

/// Split bytes into consecutive slices of at most `CHUNK_SIZE` bytes
///
/// Empty input yields no chunks.
pub fn chunk(bytes: &[u8]) -> std::slice::Chunks<'_, u8> {
    bytes.chunks(CHUNK_SIZE)
}
