#![warn(missing_docs)]

//! framelink-link: the transmit/receive machinery.
//!
//! This crate owns everything between the frame codec and the application
//! dispatcher:
//! - message-id generation and outbound fragmentation
//! - the inbound reassembly table with TTL garbage collection
//! - the CSMA-style transmit coordinator
//! - the link transceiver: socket ownership, receive thread, filtering,
//!   and the bounded decoded-frame queue
//! - statistics counters
//!
//! The transceiver works against the `LinkSocket` trait from
//! `framelink-core`, so the same machinery runs over a raw `AF_PACKET`
//! socket in production and an in-memory pair in tests.

/// CSMA-style transmit coordination.
pub mod csma;
/// Outbound payload fragmentation.
pub mod fragment;
/// In-memory link transport for tests.
pub mod memory_link;
/// Message-id generation.
pub mod message_id;
/// Linux raw packet socket transport.
#[cfg(target_os = "linux")]
pub mod raw_socket;
/// Inbound fragment reassembly.
pub mod reassembly;
/// Link statistics counters.
pub mod statistics;
/// The link transceiver.
pub mod transceiver;
