//! Connection Tests
//!
//! Tests for connecting, discovery, disconnects and reconnects.

use uwatch2::protocol::CommandKey;
use uwatch2::transport::{Channel, MemoryTransport, Reply};
use uwatch2::{ClientConfig, CommandClient, DisconnectPolicy, WatchError};

use super::{connect, echo_transport, test_config, ADDRESS};

// =============================================================================
// Connect Tests
// =============================================================================

#[test]
fn test_connect_subscribes_notifying_channels() {
    let transport = MemoryTransport::new();
    let link = transport.link();
    let client = connect(transport);

    assert!(client.is_connected());
    assert!(link.is_connected());
    assert_eq!(link.address().as_deref(), Some(ADDRESS));
    assert_eq!(link.connect_count(), 1);
    assert_eq!(
        link.subscribed(),
        vec![Channel::AsyncResponse, Channel::Accelerometer]
    );
}

#[test]
fn test_connect_discovers_by_name() {
    let transport = MemoryTransport::new()
        .with_device("Other Band", "00:00:00:00:00:01")
        .with_device("Uwatch2 7F3C", "D1:02:33:44:55:66");
    let link = transport.link();

    let config = ClientConfig::builder().scan_for_name("Uwatch2").build();
    let address = config.resolve_address();
    let _client = CommandClient::connect(transport, config).unwrap();

    // An address from UWATCH2_MAC takes precedence over discovery
    let expected = address.unwrap_or_else(|| "D1:02:33:44:55:66".to_string());
    assert_eq!(link.address(), Some(expected));
}

#[test]
fn test_connect_discovery_finds_nothing() {
    let config = ClientConfig::builder().scan_for_name("Nope").build();
    if config.resolve_address().is_some() {
        return;
    }

    let err = CommandClient::connect(MemoryTransport::new(), config).err().unwrap();
    assert!(matches!(err, WatchError::Scan(_)));
}

#[test]
fn test_close_disconnects() {
    let transport = MemoryTransport::new();
    let link = transport.link();
    let client = connect(transport);

    client.close().unwrap();
    assert!(!link.is_connected());
    assert!(link.subscribed().is_empty());
}

#[test]
fn test_drop_disconnects() {
    let transport = MemoryTransport::new();
    let link = transport.link();
    {
        let _client = connect(transport);
        assert!(link.is_connected());
    }
    assert!(!link.is_connected());
}

// =============================================================================
// Disconnect Tests
// =============================================================================

#[test]
fn test_disconnect_during_query_continues_by_default() {
    let transport = MemoryTransport::new().with_responder(|packet| {
        let mut replies = vec![Reply::Disconnect];
        replies.extend(Reply::framed_response(packet[4], &[0x01]).unwrap());
        replies
    });
    let client = connect(transport);
    assert_eq!(client.config().disconnect_policy, DisconnectPolicy::Continue);

    let bytes = client.query_raw(CommandKey::GetQuickView, &[]).unwrap();
    assert_eq!(&bytes[..], &[0x01]);
    assert!(!client.is_connected());
}

#[test]
fn test_disconnect_during_query_aborts_with_policy() {
    let transport = MemoryTransport::new().with_responder(|_| vec![Reply::Disconnect]);
    let config = ClientConfig::builder()
        .address(ADDRESS)
        .disconnect_policy(DisconnectPolicy::Abort)
        .build();
    let client = CommandClient::connect(transport, config).unwrap();

    let err = client.query_raw(CommandKey::GetStepsGoal, &[]).unwrap_err();
    assert!(matches!(err, WatchError::Disconnected(0x26)));
    assert!(!client.is_connected());
}

#[test]
fn test_reconnect_before_write_after_disconnect() {
    let transport = echo_transport(&[0x01]);
    let link = transport.link();
    let client = connect(transport);

    link.drop_link();
    assert!(!link.is_connected());

    // The queued disconnect is seen before writing, so the client reconnects
    let bytes = client.query_raw(CommandKey::GetQuickView, &[]).unwrap();
    assert_eq!(&bytes[..], &[0x01]);
    assert_eq!(link.reconnect_count(), 1);
    assert!(link.is_connected());
    assert!(client.is_connected());
}

#[test]
fn test_no_reconnect_while_connected() {
    let transport = echo_transport(&[0x01]);
    let link = transport.link();
    let client = connect(transport);

    for _ in 0..3 {
        client.query_raw(CommandKey::GetQuickView, &[]).unwrap();
    }
    assert_eq!(link.reconnect_count(), 0);
    assert_eq!(link.written_packets().len(), 3);
}

#[test]
fn test_config_defaults() {
    let config = ClientConfig::default();
    assert_eq!(config.scan_for_name, "Uwatch2");
    assert!(config.auto_reconnect);
    assert_eq!(config.disconnect_policy, DisconnectPolicy::Continue);
    assert!(config.response_timeout.is_some());
    assert_eq!(test_config().address.as_deref(), Some(ADDRESS));
}
