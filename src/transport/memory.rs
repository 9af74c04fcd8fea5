//! In-memory transport
//!
//! A scripted stand-in for the watch. Chunks written to the command channel
//! are reassembled into packets, each complete packet is handed to a
//! responder closure, and the replies it returns are delivered through the
//! registered event sink exactly as a BLE stack would deliver them.
//!
//! [`MemoryLink`] is a second handle on the same state, kept by the caller to
//! inspect writes and inject events after the transport has been moved into a
//! client.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{Channel, EventSink, Handle, Transport};
use crate::error::{Result, WatchError};
use crate::protocol::{self, HEADER_SIZE};

type Responder = Box<dyn FnMut(&[u8]) -> Vec<Reply> + Send>;

/// Something the simulated watch does in answer to a packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Notify bytes on a channel
    Notify { channel: Channel, bytes: Vec<u8> },

    /// Notify bytes on a raw handle (including ones never subscribed)
    NotifyHandle { handle: Handle, bytes: Vec<u8> },

    /// Drop the link
    Disconnect,
}

impl Reply {
    /// A fragment on the async response channel
    pub fn response(bytes: impl Into<Vec<u8>>) -> Self {
        Reply::Notify {
            channel: Channel::AsyncResponse,
            bytes: bytes.into(),
        }
    }

    /// A sample on the accelerometer channel
    pub fn accelerometer(bytes: impl Into<Vec<u8>>) -> Self {
        Reply::Notify {
            channel: Channel::Accelerometer,
            bytes: bytes.into(),
        }
    }

    /// A framed response split into notification-sized fragments
    ///
    /// Fails with `Argument` when `data` does not fit one packet.
    pub fn framed_response(command_key: u8, data: &[u8]) -> Result<Vec<Self>> {
        let packet = protocol::frame(command_key, data)?;
        Ok(protocol::chunk(&packet).map(Reply::response).collect())
    }
}

#[derive(Default)]
struct Shared {
    sink: Option<EventSink>,
    responder: Option<Responder>,
    devices: Vec<(String, String)>,
    address: Option<String>,
    connected: bool,
    subscribed: Vec<Channel>,
    connect_count: usize,
    reconnect_count: usize,
    fail_writes: bool,
    chunks: Vec<Vec<u8>>,
    packets: Vec<Vec<u8>>,
    pending: Vec<u8>,
}

impl Shared {
    fn deliver(&mut self, reply: Reply) {
        match reply {
            Reply::Notify { channel, bytes } => {
                let handle = MemoryTransport::handle_of(channel);
                if let Some(sink) = &self.sink {
                    sink.notify(handle, bytes);
                }
            }
            Reply::NotifyHandle { handle, bytes } => {
                if let Some(sink) = &self.sink {
                    sink.notify(handle, bytes);
                }
            }
            Reply::Disconnect => {
                self.connected = false;
                if let Some(sink) = &self.sink {
                    sink.disconnected();
                }
            }
        }
    }

    /// Collect written chunks into whole packets
    fn take_packet(&mut self) -> Option<Vec<u8>> {
        let header = protocol::parse_header(&self.pending).ok()?;
        let total = header.length as usize;
        if self.pending.len() < total {
            return None;
        }
        let rest = self.pending.split_off(total);
        Some(std::mem::replace(&mut self.pending, rest))
    }
}

/// Scripted in-memory transport
#[derive(Clone, Default)]
pub struct MemoryTransport {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every complete packet with the replies `responder` returns
    pub fn with_responder<F>(self, responder: F) -> Self
    where
        F: FnMut(&[u8]) -> Vec<Reply> + Send + 'static,
    {
        self.shared.lock().responder = Some(Box::new(responder));
        self
    }

    /// Make a device discoverable by name
    pub fn with_device(self, name: impl Into<String>, address: impl Into<String>) -> Self {
        self.shared.lock().devices.push((name.into(), address.into()));
        self
    }

    /// Observer/controller handle on this transport
    pub fn link(&self) -> MemoryLink {
        MemoryLink {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Fixed attribute handle assigned to each channel
    pub fn handle_of(channel: Channel) -> Handle {
        match channel {
            Channel::Command => 0x000e,
            Channel::AsyncResponse => 0x0011,
            Channel::Data => 0x0014,
            Channel::Accelerometer => 0x0017,
        }
    }
}

impl Transport for MemoryTransport {
    fn connect(&mut self, address: &str, _timeout: Duration, _auto_reconnect: bool) -> Result<()> {
        let mut shared = self.shared.lock();
        shared.address = Some(address.to_string());
        shared.connected = true;
        shared.connect_count += 1;
        Ok(())
    }

    fn reconnect(&mut self, _timeout: Duration) -> Result<()> {
        let mut shared = self.shared.lock();
        if shared.address.is_none() {
            return Err(WatchError::Connect("Never connected".to_string()));
        }
        shared.connected = true;
        shared.reconnect_count += 1;
        Ok(())
    }

    fn discover(&mut self, name: &str, _timeout: Duration) -> Result<String> {
        let shared = self.shared.lock();
        shared
            .devices
            .iter()
            .find(|(device_name, _)| device_name.contains(name))
            .map(|(_, address)| address.clone())
            .ok_or_else(|| WatchError::Scan(format!("No devices found containing name: {name}")))
    }

    fn register_sink(&mut self, sink: EventSink) {
        self.shared.lock().sink = Some(sink);
    }

    fn subscribe(&mut self, channel: Channel) -> Result<Handle> {
        let mut shared = self.shared.lock();
        if !shared.connected {
            return Err(WatchError::Subscribe(format!("Not connected, cannot subscribe {channel:?}")));
        }
        if !shared.subscribed.contains(&channel) {
            shared.subscribed.push(channel);
        }
        Ok(Self::handle_of(channel))
    }

    fn write(&mut self, channel: Channel, bytes: &[u8]) -> Result<()> {
        let mut shared = self.shared.lock();
        if !shared.connected {
            return Err(WatchError::Write("Not connected".to_string()));
        }
        if shared.fail_writes {
            return Err(WatchError::Write("Write rejected".to_string()));
        }
        shared.chunks.push(bytes.to_vec());
        if channel != Channel::Command {
            return Ok(());
        }

        shared.pending.extend_from_slice(bytes);
        if shared.pending.len() >= HEADER_SIZE && protocol::parse_header(&shared.pending).is_err() {
            // Garbage on the command channel; the device would ignore it
            shared.pending.clear();
            return Ok(());
        }
        while let Some(packet) = shared.take_packet() {
            shared.packets.push(packet.clone());
            let replies = match shared.responder.as_mut() {
                Some(responder) => responder(&packet[..]),
                None => Vec::new(),
            };
            for reply in replies {
                shared.deliver(reply);
            }
        }
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        let mut shared = self.shared.lock();
        shared.connected = false;
        shared.subscribed.clear();
        Ok(())
    }
}

/// Handle for inspecting and driving a [`MemoryTransport`]
#[derive(Clone)]
pub struct MemoryLink {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryLink {
    /// Every chunk written, in order
    pub fn written_chunks(&self) -> Vec<Vec<u8>> {
        self.shared.lock().chunks.clone()
    }

    /// Every complete packet written to the command channel, in order
    pub fn written_packets(&self) -> Vec<Vec<u8>> {
        self.shared.lock().packets.clone()
    }

    /// Deliver a notification on a channel
    pub fn notify(&self, channel: Channel, bytes: impl Into<Vec<u8>>) {
        self.shared.lock().deliver(Reply::Notify {
            channel,
            bytes: bytes.into(),
        });
    }

    /// Deliver a notification on a raw handle
    pub fn notify_handle(&self, handle: Handle, bytes: impl Into<Vec<u8>>) {
        self.shared.lock().deliver(Reply::NotifyHandle {
            handle,
            bytes: bytes.into(),
        });
    }

    /// Simulate the watch going out of range
    pub fn drop_link(&self) {
        self.shared.lock().deliver(Reply::Disconnect);
    }

    /// Make subsequent writes fail
    pub fn fail_writes(&self, fail: bool) {
        self.shared.lock().fail_writes = fail;
    }

    pub fn is_connected(&self) -> bool {
        self.shared.lock().connected
    }

    pub fn address(&self) -> Option<String> {
        self.shared.lock().address.clone()
    }

    pub fn subscribed(&self) -> Vec<Channel> {
        self.shared.lock().subscribed.clone()
    }

    pub fn connect_count(&self) -> usize {
        self.shared.lock().connect_count
    }

    pub fn reconnect_count(&self) -> usize {
        self.shared.lock().reconnect_count
    }
}
