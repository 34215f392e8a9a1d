#![warn(missing_docs)]

//! framelink-host: the application layer.
//!
//! This crate layers the three sub-protocols and the dispatcher over the
//! link transceiver:
//! - `discovery`: heartbeat broadcasts and the live-peer table
//! - `secure`: session-key handshake and authenticated message protection
//! - `files` / `folders`: bulk file transfer and recursive folder transfer
//! - `node`: the engine owning the transceiver and all services, with the
//!   classify-once dispatcher for inbound frames
//!
//! Front-ends connect through the `EventSink` trait (or the channel-backed
//! `ChannelSink` here) and drive `Node::poll_events` from their own loop.

/// Peer discovery: heartbeats and the live-peer table.
pub mod discovery;
/// Front-end event types and the channel-backed sink.
pub mod events;
/// File transfer over `File`-typed messages.
pub mod files;
/// Recursive folder transfer.
pub mod folders;
/// The engine: socket, services, and dispatch.
pub mod node;
/// Secure channels: handshake and message protection.
pub mod secure;

pub(crate) mod clock;
