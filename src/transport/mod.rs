//! Transport Module
//!
//! The BLE link the command client talks through.
//!
//! ## Responsibilities
//! - Connect / reconnect to the watch by address
//! - Write raw chunks to a GATT characteristic
//! - Subscribe to notifying characteristics
//! - Deliver notifications and disconnects, from whatever execution context
//!   the BLE stack uses, into the client's event queue
//!
//! The client never shares mutable state with the transport's callbacks:
//! everything asynchronous goes through an [`EventSink`].

mod memory;

#[cfg(feature = "btleplug")]
mod btleplug_backend;

use std::time::Duration;

use bytes::Bytes;
use crossbeam::channel::{self, Receiver, Sender};

use crate::error::{Result, WatchError};

pub use memory::{MemoryLink, MemoryTransport, Reply};

#[cfg(feature = "btleplug")]
pub use btleplug_backend::{BtleplugConfig, BtleplugTransport};

/// Attribute handle a notification arrived on
pub type Handle = u16;

/// GATT characteristics used by the watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Packets to the watch are written here
    Command,

    /// Query responses are notified here
    AsyncResponse,

    /// Bulk data (unused by the command protocol)
    Data,

    /// Self-contained accelerometer samples are notified here
    Accelerometer,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::Command,
        Channel::AsyncResponse,
        Channel::Data,
        Channel::Accelerometer,
    ];

    /// Characteristic UUID
    pub fn uuid(&self) -> &'static str {
        match self {
            Channel::Command => "0000fee2-0000-1000-8000-00805f9b34fb",
            Channel::AsyncResponse => "0000fee3-0000-1000-8000-00805f9b34fb",
            Channel::Data => "0000fee6-0000-1000-8000-00805f9b34fb",
            Channel::Accelerometer => "0000fcc1-0000-1000-8000-00805f9b34fb",
        }
    }
}

/// Something the transport observed asynchronously
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Notification { handle: Handle, bytes: Bytes },
    Disconnected,
}

/// Sending side of the client's event queue, handed to the transport
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Sender<TransportEvent>,
}

impl EventSink {
    /// Queue a notification. Returns false once the client is gone.
    pub fn notify(&self, handle: Handle, bytes: impl Into<Bytes>) -> bool {
        self.tx
            .send(TransportEvent::Notification {
                handle,
                bytes: bytes.into(),
            })
            .is_ok()
    }

    /// Queue a disconnect. Returns false once the client is gone.
    pub fn disconnected(&self) -> bool {
        self.tx.send(TransportEvent::Disconnected).is_ok()
    }
}

/// Create an event queue: the sink goes to the transport, the receiver to the client
pub fn event_queue() -> (EventSink, Receiver<TransportEvent>) {
    let (tx, rx) = channel::unbounded();
    (EventSink { tx }, rx)
}

/// A BLE link to one watch
pub trait Transport: Send {
    /// Connect to the device at `address`
    fn connect(&mut self, address: &str, timeout: Duration, auto_reconnect: bool) -> Result<()>;

    /// Re-establish a dropped link and restore subscriptions
    fn reconnect(&mut self, timeout: Duration) -> Result<()>;

    /// Find the address of a device whose name contains `name`
    fn discover(&mut self, name: &str, _timeout: Duration) -> Result<String> {
        Err(WatchError::Scan(format!(
            "Transport cannot discover devices; provide the address of {name:?} directly"
        )))
    }

    /// Register where notifications and disconnects are delivered
    fn register_sink(&mut self, sink: EventSink);

    /// Enable notifications on a channel and return its handle
    fn subscribe(&mut self, channel: Channel) -> Result<Handle>;

    /// Write one chunk (at most 20 bytes) to a channel
    fn write(&mut self, channel: Channel, bytes: &[u8]) -> Result<()>;

    fn disconnect(&mut self) -> Result<()>;
}
