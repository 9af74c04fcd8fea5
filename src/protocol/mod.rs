//! Protocol Module
//!
//! Defines the wire protocol spoken with the watch.
//!
//! ## Packet Format
//! ```text
//! ┌────────────────┬─────────┬──────────┬─────────────────────┐
//! │ Magic FE EA 10 │ Len (1) │ Cmd (1)  │      Arguments      │
//! └────────────────┴─────────┴──────────┴─────────────────────┘
//! ```
//! `Len` = payload length + 4. Packets are written in chunks of at most
//! 20 bytes to the command characteristic.
//!
//! ## Responses
//! Query responses arrive as notifications on the async response
//! characteristic. The first notification carries a full header and the
//! command key; if the response does not fit, the remaining bytes follow as
//! headerless notifications.

mod codec;
mod command;
mod hexfmt;
mod layout;
mod reassembler;
mod response;

pub use codec::{
    chunk, frame, parse_header, PacketHeader, CHUNK_SIZE, HEADER_SIZE, MAGIC, MAX_ARGS_SIZE,
    MAX_PAYLOAD_SIZE,
};
pub use command::CommandKey;
pub use hexfmt::{format_key, from_hex_str, parse_key, to_hex_str};
pub use layout::{
    decode_minute_pair, encode_minute_pair, minute_pair_layout, parse_values, Endian, Field,
    Layout, Width,
};
pub use reassembler::{Reassembler, State};
pub use response::Response;
