//! Command Client
//!
//! Send-then-wait-for-response over a [`Transport`].
//!
//! ## Responsibilities
//! - Pack arguments, frame and chunk packets, write chunks in order
//! - Reconnect before writing when the link is known to be down
//! - Drain the event queue until the response is reassembled
//! - Forward accelerometer samples to a side handler
//!
//! ## Concurrency Model: Single Command In Flight
//!
//! The wire protocol has no correlation id: a response is matched to the
//! command that was sent last. The transport, reassembler and connection
//! flag therefore sit behind one mutex that each command holds for its whole
//! exchange. Concurrent callers queue on the mutex.
//!
//! The transport delivers notifications and disconnects from its own
//! context into a channel; only the command holding the mutex reads it.
//!
//! Accelerometer samples are passed on through a second channel to a
//! dispatcher thread, so the user's handler never runs under the command
//! mutex and may call back into the client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::config::{ClientConfig, DisconnectPolicy};
use crate::error::{Result, WatchError};
use crate::protocol::{self, to_hex_str, CommandKey, Layout, Reassembler, Response};
use crate::transport::{self, Channel, Handle, Transport, TransportEvent};

/// One self-contained notification from the accelerometer characteristic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccelerometerSample {
    pub handle: Handle,
    pub bytes: Bytes,
}

type AccelerometerHandler = Box<dyn FnMut(AccelerometerSample) + Send>;
type HandlerSlot = Arc<Mutex<Option<AccelerometerHandler>>>;

/// Client for one connected watch
pub struct CommandClient<T: Transport> {
    /// Client configuration
    config: ClientConfig,

    /// Everything a command exchange touches (exclusive access needed)
    inner: Mutex<Inner<T>>,

    /// Last known link state, readable without waiting for a command
    connected: Arc<AtomicBool>,

    /// Handler run by the accelerometer dispatcher thread
    accelerometer_handler: HandlerSlot,
}

struct Inner<T> {
    transport: T,

    /// Receiving side of the transport's event queue
    events: Receiver<TransportEvent>,

    /// In-progress response, if any
    reassembler: Reassembler,

    connected: Arc<AtomicBool>,

    /// Set once `close()` ran
    closed: bool,

    async_response_handle: Handle,
    accelerometer_handle: Handle,

    /// Samples for the dispatcher thread; dropping it stops the thread
    samples: Sender<AccelerometerSample>,
}

/// Run the handler for every sample until the client is dropped
fn spawn_accelerometer_dispatcher(
    samples: Receiver<AccelerometerSample>,
    slot: HandlerSlot,
) -> Result<()> {
    thread::Builder::new()
        .name("uwatch2-accelerometer".to_string())
        .spawn(move || {
            for sample in samples.iter() {
                // Taken out of the slot so the handler may replace itself
                let taken = slot.lock().take();
                match taken {
                    Some(mut handler) => {
                        handler(sample);
                        let mut current = slot.lock();
                        if current.is_none() {
                            *current = Some(handler);
                        }
                    }
                    None => tracing::trace!("No accelerometer handler, dropping sample"),
                }
            }
        })
        .map(|_| ())
        .map_err(|e| WatchError::Config(format!("Failed to start accelerometer dispatcher: {e}")))
}

impl<T: Transport> CommandClient<T> {
    /// Connect to the watch and subscribe to its notifying channels
    ///
    /// Steps:
    /// 1. Resolve the address (config, then `UWATCH2_MAC`, then discovery)
    /// 2. Register the event queue with the transport
    /// 3. Connect
    /// 4. Subscribe to the async response and accelerometer channels
    /// 5. Start the accelerometer dispatcher
    pub fn connect(mut transport: T, config: ClientConfig) -> Result<Self> {
        tracing::info!("Starting...");

        // Step 1: Resolve address
        let address = match config.resolve_address() {
            Some(address) => {
                tracing::info!("Using address {}", address);
                address
            }
            None => {
                tracing::info!("Searching for a device named {:?}...", config.scan_for_name);
                let address = transport.discover(&config.scan_for_name, config.connect_timeout)?;
                tracing::info!(
                    "Using address of first device containing {:?}: {}",
                    config.scan_for_name,
                    address
                );
                address
            }
        };

        // Step 2: Event queue
        let (sink, events) = transport::event_queue();
        transport.register_sink(sink);

        // Step 3: Connect
        tracing::info!("Connecting to {}...", address);
        transport.connect(&address, config.connect_timeout, config.auto_reconnect)?;

        // Step 4: Subscribe
        let async_response_handle = transport.subscribe(Channel::AsyncResponse)?;
        let accelerometer_handle = transport.subscribe(Channel::Accelerometer)?;
        tracing::debug!(
            "Subscribed: async response handle 0x{:04x}, accelerometer handle 0x{:04x}",
            async_response_handle,
            accelerometer_handle
        );

        // Step 5: Accelerometer dispatcher
        let (samples, sample_rx) = channel::unbounded();
        let accelerometer_handler = HandlerSlot::default();
        spawn_accelerometer_dispatcher(sample_rx, Arc::clone(&accelerometer_handler))?;

        let connected = Arc::new(AtomicBool::new(true));
        Ok(Self {
            config,
            inner: Mutex::new(Inner {
                transport,
                events,
                reassembler: Reassembler::new(),
                connected: Arc::clone(&connected),
                closed: false,
                async_response_handle,
                accelerometer_handle,
                samples,
            }),
            connected,
            accelerometer_handler,
        })
    }

    /// Forward accelerometer samples to `handler` instead of only logging them
    ///
    /// Samples are only read while a command is waiting on the event queue.
    /// The handler runs on its own thread and may call back into the client.
    pub fn set_accelerometer_handler<F>(&self, handler: F)
    where
        F: FnMut(AccelerometerSample) + Send + 'static,
    {
        *self.accelerometer_handler.lock() = Some(Box::new(handler));
    }

    /// Send a command without waiting for a response
    pub fn send_command(&self, key: CommandKey, layout: &Layout, values: &[i64]) -> Result<()> {
        let args = layout.pack(values)?;
        self.send_raw(key, &args)
    }

    /// Send a command with pre-packed argument bytes
    pub fn send_raw(&self, key: CommandKey, args: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock();
        let result = inner.send_packet(key.byte(), args, &self.config);
        if result.is_err() {
            inner.reassembler.reset();
        }
        result
    }

    /// Send a command and decode its response
    pub fn query(
        &self,
        key: CommandKey,
        layout: &Layout,
        values: &[i64],
        response_layout: &Layout,
    ) -> Result<Vec<i64>> {
        let args = layout.pack(values)?;
        let data = self.query_raw(key, &args)?;
        response_layout.unpack(&data)
    }

    /// Send a command with pre-packed arguments and return the raw response bytes
    pub fn query_raw(&self, key: CommandKey, args: &[u8]) -> Result<Bytes> {
        let mut inner = self.inner.lock();
        let result = match inner.send_packet(key.byte(), args, &self.config) {
            Ok(()) => inner.await_response(key.byte(), &self.config),
            Err(e) => Err(e),
        };

        match result {
            Ok(response) => Ok(response.data),
            Err(e) => {
                // Leave the pipeline usable for the next command
                inner.reassembler.reset();
                Err(e)
            }
        }
    }

    /// Last known link state
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Disconnect from the watch
    pub fn close(self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.closed = true;
        inner.connected.store(false, Ordering::Release);
        tracing::info!("Disconnecting...");
        inner.transport.disconnect()
    }
}

impl<T: Transport> Drop for CommandClient<T> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if !inner.closed {
            if let Err(e) = inner.transport.disconnect() {
                tracing::debug!("Disconnect on drop failed: {}", e);
            }
        }
    }
}

impl<T: Transport> Inner<T> {
    /// Frame, chunk and write one packet
    fn send_packet(&mut self, key: u8, args: &[u8], config: &ClientConfig) -> Result<()> {
        let packet = protocol::frame(key, args)?;

        tracing::debug!("Sending packet: {}", to_hex_str(&packet));
        tracing::debug!("  Header:  {}", to_hex_str(&packet[..protocol::HEADER_SIZE]));
        tracing::debug!("  Payload: {}", to_hex_str(&packet[protocol::HEADER_SIZE..]));

        self.discard_stale();

        if !self.connected.load(Ordering::Acquire) {
            tracing::info!("Reconnecting...");
            self.transport.reconnect(config.connect_timeout)?;
            self.connected.store(true, Ordering::Release);
        }

        for chunk in protocol::chunk(&packet) {
            tracing::debug!("  Writing chunk: {}", to_hex_str(chunk));
            self.transport.write(Channel::Command, chunk)?;
        }

        Ok(())
    }

    /// Drop whatever an abandoned command left behind
    ///
    /// Disconnects are still applied and accelerometer samples still
    /// forwarded; response fragments are discarded.
    fn discard_stale(&mut self) {
        self.reassembler.reset();

        while let Ok(event) = self.events.try_recv() {
            match event {
                TransportEvent::Disconnected => self.on_disconnect(),
                TransportEvent::Notification { handle, bytes } if handle == self.accelerometer_handle => {
                    self.on_accelerometer(handle, bytes)
                }
                TransportEvent::Notification { handle, bytes } => {
                    tracing::warn!(
                        "Discarding stale notification on handle 0x{:04x}: {}",
                        handle,
                        to_hex_str(&bytes)
                    );
                }
            }
        }
    }

    /// Block until the response to `key` is complete
    fn await_response(&mut self, key: u8, config: &ClientConfig) -> Result<Response> {
        let started = Instant::now();
        let deadline = config.response_timeout.map(|timeout| started + timeout);

        loop {
            let event = self.next_event(key, deadline, started)?;

            match event {
                TransportEvent::Notification { handle, bytes } if handle == self.async_response_handle => {
                    if let Some(response) = self.reassembler.accumulate(&bytes)? {
                        if response.command_key != key {
                            return Err(WatchError::Protocol(format!(
                                "Response for command 0x{:02x} while waiting for 0x{:02x}",
                                response.command_key, key
                            )));
                        }
                        return Ok(response);
                    }
                }
                TransportEvent::Notification { handle, bytes } if handle == self.accelerometer_handle => {
                    self.on_accelerometer(handle, bytes);
                }
                TransportEvent::Notification { handle, bytes } => {
                    return Err(WatchError::Protocol(format!(
                        "Received notification on handle 0x{:04x} ({}). \
                         Missing handler for a subscribed characteristic?",
                        handle,
                        to_hex_str(&bytes)
                    )));
                }
                TransportEvent::Disconnected => {
                    self.on_disconnect();
                    if config.disconnect_policy == DisconnectPolicy::Abort {
                        return Err(WatchError::Disconnected(key));
                    }
                }
            }
        }
    }

    fn next_event(&self, key: u8, deadline: Option<Instant>, started: Instant) -> Result<TransportEvent> {
        let closed = || WatchError::Protocol("Transport event queue closed".to_string());

        match deadline {
            Some(deadline) => match self.events.recv_deadline(deadline) {
                Ok(event) => Ok(event),
                Err(RecvTimeoutError::Timeout) => Err(WatchError::Timeout {
                    command_key: key,
                    waited: round_millis(started.elapsed()),
                }),
                Err(RecvTimeoutError::Disconnected) => Err(closed()),
            },
            None => self.events.recv().map_err(|_| closed()),
        }
    }

    fn on_disconnect(&mut self) {
        tracing::info!("Disconnected");
        self.connected.store(false, Ordering::Release);
    }

    fn on_accelerometer(&mut self, handle: Handle, bytes: Bytes) {
        tracing::debug!("<- accelerometer data: {}", to_hex_str(&bytes));
        // Fails only while the client is being torn down
        let _ = self.samples.send(AccelerometerSample { handle, bytes });
    }
}

fn round_millis(d: Duration) -> Duration {
    Duration::from_millis(d.as_millis() as u64)
}
