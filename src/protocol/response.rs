//! Response definitions
//!
//! A fully reassembled command response.

use bytes::Bytes;

/// A complete response received on the async response channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Command key embedded in the first fragment
    pub command_key: u8,

    /// Response bytes following the command key
    pub data: Bytes,
}

impl Response {
    pub fn new(command_key: u8, data: impl Into<Bytes>) -> Self {
        Self {
            command_key,
            data: data.into(),
        }
    }
}
