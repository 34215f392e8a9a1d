//! Message-id generation.

use std::{
    sync::atomic::{AtomicU16, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use framelink_protocol::frame::MessageId;

/// Mints per-sender message identifiers.
///
/// A wrapping monotonic counter, seeded from wall-clock milliseconds so two
/// short-lived processes on one host are unlikely to overlap. Collisions
/// across distinct senders are harmless: reassembly keys by
/// `(source, message id)`.
#[derive(Debug)]
pub struct MessageIdGenerator {
    next: AtomicU16,
}

impl MessageIdGenerator {
    /// Creates a generator seeded from the current wall clock.
    pub fn new() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        Self { next: AtomicU16::new(millis as u16) }
    }

    /// Returns the next identifier, wrapping at `u16::MAX`.
    pub fn next_id(&self) -> MessageId {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for MessageIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_sequential() {
        let generator = MessageIdGenerator::new();
        let first = generator.next_id();
        assert_eq!(generator.next_id(), first.wrapping_add(1));
        assert_eq!(generator.next_id(), first.wrapping_add(2));
    }

    #[test]
    fn test_ids_wrap() {
        let generator = MessageIdGenerator { next: AtomicU16::new(u16::MAX) };
        assert_eq!(generator.next_id(), u16::MAX);
        assert_eq!(generator.next_id(), 0);
    }
}
