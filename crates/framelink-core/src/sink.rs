//! Event-sink seam between the engine and a front-end.

use crate::hwaddr::HardwareAddress;

/// Capability set a front-end implements to observe the engine.
///
/// Services hold a shared sink handle instead of calling back into any
/// concrete UI, so there are no ownership cycles. Implementations must be
/// cheap and non-blocking; they are invoked from dispatch and service
/// threads.
pub trait EventSink: Send + Sync {
    /// A message to show the user, attributed to `sender`
    /// (a peer address, "System", or similar).
    fn display_message(&self, sender: &str, text: &str);

    /// A surfaced error with a short human-readable reason.
    fn report_error(&self, context: &str, reason: &str);

    /// A previously unknown peer announced itself.
    fn notify_peer_found(&self, address: HardwareAddress, hostname: &str);

    /// Progress of a long-running transfer.
    fn update_progress(&self, label: &str, done: u64, total: u64);
}

/// Sink that discards every event. Useful in tests and headless runs.
pub struct NullSink;

impl EventSink for NullSink {
    fn display_message(&self, _sender: &str, _text: &str) {}
    fn report_error(&self, _context: &str, _reason: &str) {}
    fn notify_peer_found(&self, _address: HardwareAddress, _hostname: &str) {}
    fn update_progress(&self, _label: &str, _done: u64, _total: u64) {}
}
