use std::{path::PathBuf, time::Duration};

use crate::constants::{
    CSMA_MAX_ATTEMPTS, CSMA_MAX_EXPONENT, CSMA_SLOT_MICROS, DEFAULT_FRAGMENT_PAYLOAD,
};

#[derive(Clone, Debug)]
/// Configuration options to tune protocol and runtime behavior.
pub struct Config {
    /// Payload budget per frame; payloads above this are fragmented.
    pub fragment_payload_size: usize,
    /// Capacity of the bounded decoded-frame queue. Frames arriving while
    /// the queue is full are dropped (newest-dropped) and counted.
    pub receive_queue_capacity: usize,
    /// Read timeout on the link socket, so the receive loop can observe
    /// the stop flag between blocking reads.
    pub receive_timeout: Duration,
    /// Pause between fragments of one outbound message.
    pub inter_fragment_delay: Duration,
    /// Max transmit attempts before the CSMA coordinator gives up.
    pub csma_max_attempts: u8,
    /// Cap on the binary exponential backoff exponent.
    pub csma_max_exponent: u32,
    /// Duration of one CSMA backoff slot.
    pub csma_slot: Duration,
    /// How long a partially assembled text message is kept before discard.
    pub text_reassembly_ttl: Duration,
    /// How long a partially assembled file message is kept before discard.
    pub file_reassembly_ttl: Duration,
    /// Interval between discovery heartbeat broadcasts.
    pub heartbeat_interval: Duration,
    /// A peer with no heartbeat for this long is evicted.
    pub peer_timeout: Duration,
    /// An outstanding key exchange with no response for this long is dropped.
    pub key_exchange_timeout: Duration,
    /// An in-progress folder receive with no activity for this long expires.
    pub folder_receive_ttl: Duration,
    /// Directory that received files and folders are written under.
    pub download_dir: PathBuf,
    /// Hostname announced in discovery heartbeats. `None` asks the OS.
    pub hostname: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fragment_payload_size: DEFAULT_FRAGMENT_PAYLOAD,
            receive_queue_capacity: 1024,
            receive_timeout: Duration::from_secs(1),
            inter_fragment_delay: Duration::from_millis(10),
            csma_max_attempts: CSMA_MAX_ATTEMPTS,
            csma_max_exponent: CSMA_MAX_EXPONENT,
            csma_slot: Duration::from_micros(CSMA_SLOT_MICROS),
            text_reassembly_ttl: Duration::from_secs(30),
            file_reassembly_ttl: Duration::from_secs(30 * 60),
            heartbeat_interval: Duration::from_secs(30),
            peer_timeout: Duration::from_secs(90),
            key_exchange_timeout: Duration::from_secs(5 * 60),
            folder_receive_ttl: Duration::from_secs(60 * 60),
            download_dir: PathBuf::from("downloads"),
            hostname: None,
        }
    }
}
