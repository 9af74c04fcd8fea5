//! Response reassembly
//!
//! Accumulates async response notifications for the single in-flight command.
//!
//! ## State Machine
//! ```text
//!            header fragment (short)                 continuation (short)
//!   ┌──────┐ ─────────────────────────▶ ┌──────────────┐ ◀──────┐
//!   │ Idle │                            │ Accumulating │ ───────┘
//!   └──────┘ ◀───────────────────────── └──────────────┘
//!      ▲  │      continuation (exact)          │ continuation (overrun)
//!      │  │ header fragment (exact)            ▼
//!      └──┘                              ┌───────┐
//!                        reset() ◀────── │ Error │
//!                                        └───────┘
//! ```
//! Only the first fragment of a response carries a header. Continuations are
//! raw bytes, so a new header arriving mid-response cannot be told apart
//! from data: the protocol is strictly half-duplex.

use bytes::BytesMut;

use super::codec::{self, HEADER_SIZE};
use super::{to_hex_str, Response};
use crate::error::{Result, WatchError};

/// Reassembly state
#[derive(Debug, Default)]
pub enum State {
    /// No response in progress
    #[default]
    Idle,

    /// Header received, waiting for `expected` data bytes in total
    Accumulating {
        command_key: u8,
        expected: usize,
        buffer: BytesMut,
    },

    /// An overrun was detected; fragments are refused until `reset()`
    Error,
}

/// Reassembles fragments into complete responses
#[derive(Debug, Default)]
pub struct Reassembler {
    state: State,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle)
    }

    /// Drop any partial response and return to `Idle`
    pub fn reset(&mut self) {
        if !self.is_idle() {
            tracing::debug!("Resetting reassembler from {:?}", self.state_name());
        }
        self.state = State::Idle;
    }

    /// Feed one notification fragment
    ///
    /// Returns the complete response once all expected bytes have arrived.
    pub fn accumulate(&mut self, fragment: &[u8]) -> Result<Option<Response>> {
        match std::mem::take(&mut self.state) {
            State::Idle => self.start(fragment),
            State::Accumulating {
                command_key,
                expected,
                mut buffer,
            } => {
                buffer.extend_from_slice(fragment);
                self.advance(command_key, expected, buffer, fragment.len())
            }
            State::Error => {
                self.state = State::Error;
                Err(WatchError::Protocol(
                    "Reassembler is in error state; reset before reuse".to_string(),
                ))
            }
        }
    }

    fn start(&mut self, fragment: &[u8]) -> Result<Option<Response>> {
        if fragment.len() < 3 || fragment[..3] != codec::MAGIC {
            return Err(WatchError::Protocol(format!(
                "Unexpected fragment with no in-flight response: {}",
                to_hex_str(fragment)
            )));
        }
        let header = codec::parse_header(fragment)?;
        if fragment.len() <= HEADER_SIZE {
            return Err(WatchError::Protocol(format!(
                "First fragment is missing the command key: {}",
                to_hex_str(fragment)
            )));
        }

        let command_key = fragment[HEADER_SIZE];
        let expected = header.data_len();
        let buffer = BytesMut::from(&fragment[HEADER_SIZE + 1..]);
        tracing::debug!(
            "Received valid header for command 0x{:02x}, {} data bytes expected",
            command_key,
            expected
        );

        self.advance(command_key, expected, buffer, fragment.len())
    }

    fn advance(
        &mut self,
        command_key: u8,
        expected: usize,
        buffer: BytesMut,
        received: usize,
    ) -> Result<Option<Response>> {
        tracing::debug!(
            "Received {} bytes. Now have {} bytes. Expecting {} bytes",
            received,
            buffer.len(),
            expected
        );

        if buffer.len() == expected {
            tracing::debug!(
                "Received all {} expected bytes: {}",
                expected,
                to_hex_str(&buffer)
            );
            return Ok(Some(Response::new(command_key, buffer.freeze())));
        }

        if buffer.len() > expected {
            self.state = State::Error;
            return Err(WatchError::Protocol(format!(
                "Received more bytes than expected: {} > {}",
                buffer.len(),
                expected
            )));
        }

        self.state = State::Accumulating {
            command_key,
            expected,
            buffer,
        };
        Ok(None)
    }

    fn state_name(&self) -> &'static str {
        match self.state {
            State::Idle => "Idle",
            State::Accumulating { .. } => "Accumulating",
            State::Error => "Error",
        }
    }
}
