//! Watch Tests
//!
//! Typed commands against a scripted watch.

mod settings_tests;

use std::collections::HashMap;
use std::time::Duration;

use uwatch2::transport::{MemoryLink, MemoryTransport, Reply};
use uwatch2::{ClientConfig, Watch};

/// Connect to a watch that answers the given command keys with fixed data
pub fn fake_watch(responses: &[(u8, Vec<u8>)]) -> (Watch<MemoryTransport>, MemoryLink) {
    let responses: HashMap<u8, Vec<u8>> = responses.iter().cloned().collect();
    let transport = MemoryTransport::new().with_responder(move |packet| {
        responses
            .get(&packet[4])
            .map(|data| Reply::framed_response(packet[4], data).unwrap())
            .unwrap_or_default()
    });
    let link = transport.link();

    let config = ClientConfig::builder()
        .address("E8:11:6C:0A:3D:7B")
        .response_timeout(Some(Duration::from_millis(200)))
        .build();
    (Watch::connect(transport, config).unwrap(), link)
}

/// The single packet written so far
pub fn last_packet(link: &MemoryLink) -> Vec<u8> {
    link.written_packets().pop().expect("no packet written")
}
