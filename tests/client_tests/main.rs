//! Command Client Tests
//!
//! Exercises the command pipeline end to end against the in-memory transport.

mod connection_tests;

use std::time::Duration;

use uwatch2::transport::{MemoryTransport, Reply};
use uwatch2::{ClientConfig, CommandClient};

pub const ADDRESS: &str = "C3:7A:0F:22:41:9E";

pub fn test_config() -> ClientConfig {
    ClientConfig::builder()
        .address(ADDRESS)
        .response_timeout(Some(Duration::from_millis(200)))
        .build()
}

/// Watch that answers every packet with `data` under the packet's own key
pub fn echo_transport(data: &'static [u8]) -> MemoryTransport {
    MemoryTransport::new().with_responder(move |packet| Reply::framed_response(packet[4], data).unwrap())
}

pub fn connect(transport: MemoryTransport) -> CommandClient<MemoryTransport> {
    CommandClient::connect(transport, test_config()).unwrap()
}
