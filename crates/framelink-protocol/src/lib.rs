#![warn(missing_docs)]

//! framelink-protocol: the on-wire formats.
//!
//! This crate defines everything that crosses the link:
//! - `Frame`: the custom Ethernet frame with fragment header and CRC-32
//! - the frame codec (encode, decode, checksum)
//! - the text control messages (`DISCOVERY:`, `SECURITY:`, `FOLDER_*:`)
//!   with their JSON bodies, classified once into a tagged variant
//! - the `FILE_TRANSFER:<name>:<size>:` envelope carried by `File` frames
//!
//! Fragmentation policy, reassembly, and socket handling live in
//! `framelink-link`; this crate is pure data.

/// Text control-message prefixes and JSON bodies.
pub mod control;
/// The `FILE_TRANSFER` envelope inside `File`-typed payloads.
pub mod envelope;
/// Frame types and structures.
pub mod frame;
/// Frame encoding, decoding, and checksum verification.
pub mod frame_codec;
