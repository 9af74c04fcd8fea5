//! Protocol Tests
//!
//! Framing, layouts and response reassembly, without a transport.

mod layout_tests;
