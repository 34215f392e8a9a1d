//! Front-end event types and the channel-backed sink.

use crossbeam_channel::{unbounded, Receiver, Sender};
use framelink_core::{hwaddr::HardwareAddress, sink::EventSink};

/// Events emitted to the front-end.
///
/// These mirror the `EventSink` capability set one-to-one, so a front-end
/// can consume a channel instead of implementing the trait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    /// A message to show the user, attributed to a sender label.
    Message {
        /// Peer address string, "System", or similar.
        sender: String,
        /// Message text.
        text: String,
    },
    /// A surfaced error.
    Error {
        /// Where the error arose.
        context: String,
        /// Short human-readable reason.
        reason: String,
    },
    /// A previously unknown peer announced itself.
    PeerFound {
        /// The peer's hardware address.
        address: HardwareAddress,
        /// The peer's announced hostname.
        hostname: String,
    },
    /// Progress of a long-running transfer.
    Progress {
        /// Transfer label (file or folder name).
        label: String,
        /// Units done so far.
        done: u64,
        /// Total units.
        total: u64,
    },
}

/// Channel-backed event sink.
///
/// Sends are best-effort: once the front-end drops its receiver (during
/// shutdown), events are discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink(Sender<NodeEvent>);

impl ChannelSink {
    /// Creates a sink and the receiver the front-end drains.
    pub fn new() -> (Self, Receiver<NodeEvent>) {
        let (sender, receiver) = unbounded();
        (Self(sender), receiver)
    }
}

impl EventSink for ChannelSink {
    fn display_message(&self, sender: &str, text: &str) {
        let _ = self.0.send(NodeEvent::Message { sender: sender.to_owned(), text: text.to_owned() });
    }

    fn report_error(&self, context: &str, reason: &str) {
        let _ =
            self.0.send(NodeEvent::Error { context: context.to_owned(), reason: reason.to_owned() });
    }

    fn notify_peer_found(&self, address: HardwareAddress, hostname: &str) {
        let _ = self.0.send(NodeEvent::PeerFound { address, hostname: hostname.to_owned() });
    }

    fn update_progress(&self, label: &str, done: u64, total: u64) {
        let _ = self.0.send(NodeEvent::Progress { label: label.to_owned(), done, total });
    }
}
