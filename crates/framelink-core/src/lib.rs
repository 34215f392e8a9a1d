#![warn(missing_docs)]

//! framelink-core: foundational types and utilities.
//!
//! This crate provides the minimal set of core types shared across all layers:
//! - Configuration
//! - Error handling
//! - Protocol constants
//! - Hardware (MAC) addresses
//! - Shared payload buffers
//! - The transport and event-sink seams
//!
//! Protocol and service logic lives in the specialized crates:
//! - `framelink-protocol`: frame codec, control messages, file envelope
//! - `framelink-link`: fragmentation, reassembly, CSMA, the transceiver
//! - `framelink-host`: dispatcher, discovery, secure channel, transfers

/// Protocol constants shared across layers.
pub mod constants {
    /// EtherType carried by every frame (IEEE local experimental range).
    pub const LINK_ETHERTYPE: u16 = 0x88B5;
    /// Size of the plain Ethernet header: dst(6) + src(6) + ethertype(2).
    pub const ETHERNET_HEADER_SIZE: usize = 14;
    /// Size of the full frame header up to (excluding) the payload.
    ///
    /// dst(6) + src(6) + ethertype(2) + frame-type(1) + message-id(2)
    /// + fragment-index(4) + fragment-total(4) + payload-length(2).
    pub const FRAME_HEADER_SIZE: usize = 27;
    /// Size of the CRC-32 trailer.
    pub const CHECKSUM_SIZE: usize = 4;
    /// Smallest byte count that can hold a valid frame (empty payload).
    pub const MIN_FRAME_SIZE: usize = FRAME_HEADER_SIZE + CHECKSUM_SIZE;
    /// Largest value representable by the payload-length header field.
    pub const MAX_PAYLOAD_LENGTH: usize = u16::MAX as usize;
    /// Default per-fragment payload budget. Chosen so a full frame stays
    /// within a 1500-byte link MTU alongside the protocol headers.
    pub const DEFAULT_FRAGMENT_PAYLOAD: usize = 1475;
    /// CSMA backoff slot duration in microseconds (classic Ethernet slot).
    pub const CSMA_SLOT_MICROS: u64 = 512;
    /// Maximum CSMA transmit attempts before a send is abandoned.
    pub const CSMA_MAX_ATTEMPTS: u8 = 16;
    /// Cap on the CSMA backoff exponent (`k = min(attempt, 10)`).
    pub const CSMA_MAX_EXPONENT: u32 = 10;
}

/// Configuration options to tune protocol and runtime behavior.
pub mod config;
/// Error types and results.
pub mod error;
/// 48-bit Ethernet hardware addresses.
pub mod hwaddr;
/// Event-sink seam between the engine and a front-end.
pub mod sink;
/// Shared, reference-counted payload buffers with zero-copy slicing.
pub mod shared;
/// Transport abstraction for pluggable link I/O.
pub mod transport;
