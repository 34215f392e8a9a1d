//! Transport abstraction for pluggable link I/O.

use std::io::Result;

use crate::hwaddr::HardwareAddress;

/// Low-level raw-frame socket abstraction.
///
/// This trait lets transports (an `AF_PACKET` socket, an in-memory pair for
/// tests) be plugged into the transceiver without coupling to a concrete
/// implementation. Frames carry their own source and destination addresses,
/// so no endpoint parameter appears here. Methods take `&self`: one socket
/// is shared between the receive thread and send paths on other threads.
pub trait LinkSocket: Send + Sync {
    /// Sends a single encoded frame onto the link.
    fn send_frame(&self, frame: &[u8]) -> Result<usize>;

    /// Receives a single raw frame into `buffer`, returning its length.
    ///
    /// Returns `WouldBlock` or `TimedOut` when nothing arrives within the
    /// configured read timeout, so callers can observe a stop flag.
    fn recv_frame(&self, buffer: &mut [u8]) -> Result<usize>;

    /// Returns the hardware address this socket transmits from.
    fn local_address(&self) -> HardwareAddress;
}
