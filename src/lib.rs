//! # uwatch2
//!
//! A client library for the Uwatch2 BLE smart watch:
//! - Packet framing (`FE EA 10 <len>` header) and 20-byte MTU chunking
//! - Fixed binary argument/response layouts
//! - Reassembly of responses split over several notifications
//! - Strictly serialized request/response over a pluggable BLE transport
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Watch                               │
//! │               (typed commands: steps, alarms, ...)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    CommandClient                             │
//! │              (single command in flight)                      │
//! └──────────┬──────────────────────────────────▲───────────────┘
//!            │ Layout::pack → frame → chunk     │ Reassembler → unpack
//!            ▼                                  │
//!   ┌─────────────────┐   notifications  ┌──────┴──────┐
//!   │    Transport    │ ───────────────▶ │ event queue │
//!   │  (write/notify) │   disconnects    │ (crossbeam) │
//!   └─────────────────┘                  └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod transport;
pub mod client;
pub mod watch;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{WatchError, Result};
pub use config::{ClientConfig, DisconnectPolicy};
pub use client::{AccelerometerSample, CommandClient};
pub use protocol::{CommandKey, Layout};
pub use watch::Watch;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of uwatch2
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
