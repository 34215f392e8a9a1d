//! Link statistics counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Shared counters updated by the transceiver and the dispatcher.
///
/// All counters are relaxed atomics: they are monotonic tallies, not
/// synchronization points.
#[derive(Debug, Default)]
pub struct LinkStatistics {
    frames_sent: AtomicU64,
    frames_received: AtomicU64,
    frames_dropped: AtomicU64,
    queue_overflow: AtomicU64,
    fragmented_messages_sent: AtomicU64,
    user_messages_sent: AtomicU64,
    user_messages_received: AtomicU64,
}

impl LinkStatistics {
    /// Records one frame put on the wire.
    pub fn note_frame_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one frame accepted by the receive filter chain.
    pub fn note_frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one frame discarded before dispatch.
    pub fn note_frame_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one decoded frame lost to a full queue.
    pub fn note_queue_overflow(&self) {
        self.queue_overflow.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one outbound message that required fragmentation.
    pub fn note_fragmented_message_sent(&self) {
        self.fragmented_messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one user-visible message sent.
    pub fn note_user_message_sent(&self) {
        self.user_messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one user-visible message received.
    pub fn note_user_message_received(&self) {
        self.user_messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time copy of the counters.
    /// `pending_reassemblies` comes from the reassembly table.
    pub fn snapshot(&self, pending_reassemblies: usize) -> StatisticsSnapshot {
        StatisticsSnapshot {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            queue_overflow: self.queue_overflow.load(Ordering::Relaxed),
            fragmented_messages_sent: self.fragmented_messages_sent.load(Ordering::Relaxed),
            user_messages_sent: self.user_messages_sent.load(Ordering::Relaxed),
            user_messages_received: self.user_messages_received.load(Ordering::Relaxed),
            pending_reassemblies,
        }
    }

    /// Resets every counter to zero.
    pub fn reset(&self) {
        self.frames_sent.store(0, Ordering::Relaxed);
        self.frames_received.store(0, Ordering::Relaxed);
        self.frames_dropped.store(0, Ordering::Relaxed);
        self.queue_overflow.store(0, Ordering::Relaxed);
        self.fragmented_messages_sent.store(0, Ordering::Relaxed);
        self.user_messages_sent.store(0, Ordering::Relaxed);
        self.user_messages_received.store(0, Ordering::Relaxed);
    }
}

/// Read-only view of the counters at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatisticsSnapshot {
    /// Frames put on the wire.
    pub frames_sent: u64,
    /// Frames accepted by the receive filter chain.
    pub frames_received: u64,
    /// Frames discarded before dispatch (short, foreign, corrupt, misaddressed).
    pub frames_dropped: u64,
    /// Decoded frames lost to a full queue.
    pub queue_overflow: u64,
    /// Outbound messages that required fragmentation.
    pub fragmented_messages_sent: u64,
    /// User-visible messages sent.
    pub user_messages_sent: u64,
    /// User-visible messages received.
    pub user_messages_received: u64,
    /// Assemblies currently waiting for fragments.
    pub pending_reassemblies: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let stats = LinkStatistics::default();
        let snapshot = stats.snapshot(0);
        assert_eq!(snapshot.frames_sent, 0);
        assert_eq!(snapshot.frames_received, 0);
        assert_eq!(snapshot.user_messages_sent, 0);
        assert_eq!(snapshot.pending_reassemblies, 0);
    }

    #[test]
    fn test_counters_accumulate() {
        let stats = LinkStatistics::default();
        stats.note_frame_sent();
        stats.note_frame_sent();
        stats.note_fragmented_message_sent();
        stats.note_user_message_received();

        let snapshot = stats.snapshot(3);
        assert_eq!(snapshot.frames_sent, 2);
        assert_eq!(snapshot.fragmented_messages_sent, 1);
        assert_eq!(snapshot.user_messages_received, 1);
        assert_eq!(snapshot.pending_reassemblies, 3);
    }

    #[test]
    fn test_reset_clears_counters() {
        let stats = LinkStatistics::default();
        stats.note_frame_sent();
        stats.note_frame_dropped();
        stats.note_queue_overflow();
        stats.reset();

        assert_eq!(stats.snapshot(0), LinkStatistics::default().snapshot(0));
    }
}
