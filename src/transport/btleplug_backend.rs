//! btleplug transport
//!
//! [`Transport`] over the platform BLE stack via btleplug. btleplug is async;
//! this transport owns a small tokio runtime, blocks on it for connect/write
//! calls, and runs two background tasks that push into the event sink:
//! one forwarding characteristic notifications, one watching the adapter
//! for the peripheral's disconnect.
//!
//! btleplug does not expose attribute handles, so each [`Channel`] gets a
//! fixed synthetic handle. Notifications from characteristics that are not a
//! known channel are forwarded on handle 0.

use std::time::Duration;

use btleplug::api::{
    Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures_util::StreamExt;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{Channel, EventSink, Handle, Transport};
use crate::error::{Result, WatchError};

/// Handle for notifications on characteristics that are not a known channel
const UNKNOWN_HANDLE: Handle = 0;

/// Settings for the btleplug transport
#[derive(Debug, Clone)]
pub struct BtleplugConfig {
    /// How long to scan when discovering by name
    pub scan_duration: Duration,

    /// Poll interval while waiting for a known address to show up in a scan
    pub scan_poll_interval: Duration,
}

impl Default for BtleplugConfig {
    fn default() -> Self {
        Self {
            scan_duration: Duration::from_secs(10),
            scan_poll_interval: Duration::from_millis(500),
        }
    }
}

/// BLE transport backed by btleplug
pub struct BtleplugTransport {
    config: BtleplugConfig,
    runtime: Runtime,
    adapter: Option<Adapter>,
    peripheral: Option<Peripheral>,
    sink: Option<EventSink>,
    subscribed: Vec<Channel>,
    tasks: Vec<JoinHandle<()>>,
}

fn handle_of(channel: Channel) -> Handle {
    Channel::ALL
        .iter()
        .position(|c| *c == channel)
        .map(|i| i as Handle + 1)
        .unwrap_or(UNKNOWN_HANDLE)
}

fn uuid_of(channel: Channel) -> Result<Uuid> {
    Uuid::parse_str(channel.uuid())
        .map_err(|e| WatchError::Config(format!("Invalid UUID for {channel:?}: {e}")))
}

fn connect_err(e: btleplug::Error) -> WatchError {
    WatchError::Connect(e.to_string())
}

impl BtleplugTransport {
    pub fn new(config: BtleplugConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .map_err(|e| WatchError::Connect(format!("Failed to start BLE runtime: {e}")))?;

        Ok(Self {
            config,
            runtime,
            adapter: None,
            peripheral: None,
            sink: None,
            subscribed: Vec::new(),
            tasks: Vec::new(),
        })
    }

    /// Get (and cache) the first Bluetooth adapter
    fn adapter(&mut self) -> Result<Adapter> {
        if let Some(adapter) = &self.adapter {
            return Ok(adapter.clone());
        }

        let adapter = self.runtime.block_on(async {
            let manager = Manager::new().await.map_err(connect_err)?;
            let adapters = manager.adapters().await.map_err(connect_err)?;
            adapters
                .into_iter()
                .next()
                .ok_or_else(|| WatchError::Connect("No Bluetooth adapter found".to_string()))
        })?;

        self.adapter = Some(adapter.clone());
        Ok(adapter)
    }

    fn peripheral(&self) -> Result<&Peripheral> {
        self.peripheral
            .as_ref()
            .ok_or_else(|| WatchError::Connect("Not connected".to_string()))
    }

    fn characteristic(&self, channel: Channel) -> Result<Characteristic> {
        let uuid = uuid_of(channel)?;
        self.peripheral()?
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == uuid)
            .ok_or_else(|| WatchError::Connect(format!("Characteristic {} not found", channel.uuid())))
    }

    /// Start forwarding notifications and disconnects into the sink
    fn spawn_event_tasks(&mut self) -> Result<()> {
        for task in self.tasks.drain(..) {
            task.abort();
        }

        let Some(sink) = self.sink.clone() else {
            return Ok(());
        };
        let adapter = self.adapter()?;
        let peripheral = self.peripheral()?.clone();

        let channels: Vec<(Uuid, Handle)> = Channel::ALL
            .iter()
            .map(|c| uuid_of(*c).map(|u| (u, handle_of(*c))))
            .collect::<Result<_>>()?;

        let (mut notifications, mut central_events) = self.runtime.block_on(async {
            let notifications = peripheral.notifications().await.map_err(connect_err)?;
            let central_events = adapter.events().await.map_err(connect_err)?;
            Ok::<_, WatchError>((notifications, central_events))
        })?;

        let notify_sink = sink.clone();
        self.tasks.push(self.runtime.spawn(async move {
            while let Some(notification) = notifications.next().await {
                let handle = channels
                    .iter()
                    .find(|(uuid, _)| *uuid == notification.uuid)
                    .map(|(_, handle)| *handle)
                    .unwrap_or(UNKNOWN_HANDLE);
                if !notify_sink.notify(handle, notification.value) {
                    break;
                }
            }
        }));

        let peripheral_id = peripheral.id();
        self.tasks.push(self.runtime.spawn(async move {
            while let Some(event) = central_events.next().await {
                if let CentralEvent::DeviceDisconnected(id) = event {
                    if id == peripheral_id && !sink.disconnected() {
                        break;
                    }
                }
            }
        }));

        Ok(())
    }

    /// Connect the cached peripheral and discover its services
    fn establish(&self, timeout: Duration) -> Result<()> {
        let peripheral = self.peripheral()?.clone();
        self.runtime.block_on(async {
            tokio::time::timeout(timeout, peripheral.connect())
                .await
                .map_err(|_| WatchError::Connect(format!("Connect timed out after {timeout:?}")))?
                .map_err(connect_err)?;
            peripheral.discover_services().await.map_err(connect_err)
        })
    }
}

impl Transport for BtleplugTransport {
    fn connect(&mut self, address: &str, timeout: Duration, auto_reconnect: bool) -> Result<()> {
        if auto_reconnect {
            tracing::debug!("btleplug has no link-level auto reconnect; reconnecting on demand");
        }
        let adapter = self.adapter()?;
        let poll = self.config.scan_poll_interval;
        let wanted = address.to_lowercase();

        // The adapter only knows peripherals it has seen in a scan
        let peripheral = self.runtime.block_on(async {
            adapter.start_scan(ScanFilter::default()).await.map_err(connect_err)?;
            let found = tokio::time::timeout(timeout, async {
                loop {
                    for p in adapter.peripherals().await.map_err(connect_err)? {
                        if p.address().to_string().to_lowercase() == wanted {
                            return Ok::<_, WatchError>(p);
                        }
                    }
                    tokio::time::sleep(poll).await;
                }
            })
            .await;
            if let Err(e) = adapter.stop_scan().await {
                tracing::warn!("Failed to stop BLE scan: {}", e);
            }
            found.map_err(|_| WatchError::Connect(format!("Device {wanted} not seen within {timeout:?}")))?
        })?;

        self.peripheral = Some(peripheral);
        self.establish(timeout)?;
        self.spawn_event_tasks()
    }

    fn reconnect(&mut self, timeout: Duration) -> Result<()> {
        let peripheral = self.peripheral()?.clone();
        let connected = self
            .runtime
            .block_on(peripheral.is_connected())
            .map_err(connect_err)?;
        if connected {
            return Ok(());
        }

        self.establish(timeout)?;
        for channel in self.subscribed.clone() {
            let ch = self.characteristic(channel)?;
            self.runtime
                .block_on(peripheral.subscribe(&ch))
                .map_err(|e| WatchError::Subscribe(e.to_string()))?;
        }
        self.spawn_event_tasks()
    }

    fn discover(&mut self, name: &str, _timeout: Duration) -> Result<String> {
        let adapter = self.adapter()?;
        let duration = self.config.scan_duration;

        tracing::info!("Searching for BLE devices...");
        let found = self.runtime.block_on(async {
            adapter
                .start_scan(ScanFilter::default())
                .await
                .map_err(|e| WatchError::Scan(e.to_string()))?;
            tokio::time::sleep(duration).await;
            let peripherals = adapter
                .peripherals()
                .await
                .map_err(|e| WatchError::Scan(e.to_string()))?;
            if let Err(e) = adapter.stop_scan().await {
                tracing::warn!("Failed to stop BLE scan: {}", e);
            }

            let mut found = None;
            for peripheral in peripherals {
                let Ok(Some(props)) = peripheral.properties().await else {
                    continue;
                };
                let device_name = props.local_name.unwrap_or_default();
                let address = peripheral.address().to_string();
                tracing::info!("  {}: {}", device_name, address);
                if found.is_none() && device_name.contains(name) {
                    found = Some(address);
                }
            }
            Ok::<_, WatchError>(found)
        })?;

        found.ok_or_else(|| WatchError::Scan(format!("No devices found containing name: {name}")))
    }

    fn register_sink(&mut self, sink: EventSink) {
        self.sink = Some(sink);
    }

    fn subscribe(&mut self, channel: Channel) -> Result<Handle> {
        let ch = self.characteristic(channel).map_err(|e| WatchError::Subscribe(e.to_string()))?;
        let peripheral = self.peripheral()?.clone();
        self.runtime
            .block_on(peripheral.subscribe(&ch))
            .map_err(|e| WatchError::Subscribe(e.to_string()))?;
        if !self.subscribed.contains(&channel) {
            self.subscribed.push(channel);
        }
        Ok(handle_of(channel))
    }

    fn write(&mut self, channel: Channel, bytes: &[u8]) -> Result<()> {
        let ch = self.characteristic(channel).map_err(|e| WatchError::Write(e.to_string()))?;
        let peripheral = self.peripheral()?.clone();
        self.runtime
            .block_on(peripheral.write(&ch, bytes, WriteType::WithResponse))
            .map_err(|e| WatchError::Write(e.to_string()))
    }

    fn disconnect(&mut self) -> Result<()> {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.subscribed.clear();
        match self.peripheral.take() {
            Some(peripheral) => self
                .runtime
                .block_on(peripheral.disconnect())
                .map_err(connect_err),
            None => Ok(()),
        }
    }
}
