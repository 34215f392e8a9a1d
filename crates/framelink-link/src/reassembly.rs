//! Inbound fragment reassembly.
//!
//! Fragments are buffered under `(source, message id)` until every index in
//! `[0, total)` is present, then concatenated in index order. Entries that
//! stall past their type-appropriate TTL are discarded on the next insert;
//! the discard is logged, never surfaced upstream.

use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

use framelink_core::{hwaddr::HardwareAddress, shared::SharedBytes};
use framelink_protocol::frame::{Frame, FrameType, MessageId};

/// One in-progress inbound message.
#[derive(Debug)]
struct Assembly {
    frame_type: FrameType,
    expected_total: u32,
    fragments: HashMap<u32, SharedBytes>,
    byte_count: usize,
    last_update: Instant,
}

impl Assembly {
    fn is_complete(&self) -> bool {
        self.fragments.len() == self.expected_total as usize
    }

    fn into_payload(mut self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(self.byte_count);
        for index in 0..self.expected_total {
            if let Some(part) = self.fragments.remove(&index) {
                payload.extend_from_slice(part.as_slice());
            }
        }
        payload
    }

    fn ttl(&self, text_ttl: Duration, file_ttl: Duration) -> Duration {
        match self.frame_type {
            FrameType::Text => text_ttl,
            FrameType::File => file_ttl,
        }
    }
}

/// Buffers inbound fragments keyed by `(source, message id)`.
///
/// The table is mutex-protected; the lock is held only for the duration of
/// one insert or sweep.
#[derive(Debug)]
pub struct ReassemblyTable {
    entries: Mutex<HashMap<(HardwareAddress, MessageId), Assembly>>,
    text_ttl: Duration,
    file_ttl: Duration,
}

impl ReassemblyTable {
    /// Creates a table with the given per-type TTLs.
    pub fn new(text_ttl: Duration, file_ttl: Duration) -> Self {
        Self { entries: Mutex::new(HashMap::new()), text_ttl, file_ttl }
    }

    /// Stores one received fragment.
    ///
    /// Returns the reassembled payload once the final missing fragment
    /// arrives. Duplicates are dropped silently; an index at or above the
    /// current total is logged and dropped; a fragment announcing a larger
    /// total than previously seen revises the expectation upward.
    pub fn insert(&self, frame: &Frame, now: Instant) -> Option<Vec<u8>> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Self::sweep(&mut entries, now, self.text_ttl, self.file_ttl);

        let key = (frame.source(), frame.message_id());
        let assembly = entries.entry(key).or_insert_with(|| Assembly {
            frame_type: frame.frame_type(),
            expected_total: frame.fragment_total(),
            fragments: HashMap::new(),
            byte_count: 0,
            last_update: now,
        });

        // Tolerate the first-seen fragment not being index 0.
        if frame.fragment_total() > assembly.expected_total {
            assembly.expected_total = frame.fragment_total();
        }

        if frame.fragment_index() >= assembly.expected_total {
            tracing::warn!(
                "fragment {} out of range (total {}) from {}, dropping",
                frame.fragment_index(),
                assembly.expected_total,
                frame.source()
            );
            return None;
        }

        if !assembly.fragments.contains_key(&frame.fragment_index()) {
            assembly.byte_count += frame.payload().len();
            assembly.fragments.insert(frame.fragment_index(), frame.payload_shared().clone());
        }
        assembly.last_update = now;

        if assembly.is_complete() {
            let assembly = entries.remove(&key)?;
            Some(assembly.into_payload())
        } else {
            None
        }
    }

    /// Number of in-progress assemblies.
    pub fn pending(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn sweep(
        entries: &mut HashMap<(HardwareAddress, MessageId), Assembly>,
        now: Instant,
        text_ttl: Duration,
        file_ttl: Duration,
    ) {
        entries.retain(|(source, message_id), assembly| {
            let expired =
                now.duration_since(assembly.last_update) > assembly.ttl(text_ttl, file_ttl);
            if expired {
                tracing::warn!(
                    "discarding stalled assembly from {} (message {}, {}/{} fragments)",
                    source,
                    message_id,
                    assembly.fragments.len(),
                    assembly.expected_total
                );
            }
            !expired
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last: u8) -> HardwareAddress {
        HardwareAddress::new([0x02, 0, 0, 0, 0, last])
    }

    fn table() -> ReassemblyTable {
        ReassemblyTable::new(Duration::from_secs(30), Duration::from_secs(1800))
    }

    fn fragment(source: HardwareAddress, id: MessageId, index: u32, total: u32, data: &[u8]) -> Frame {
        Frame::fragment(
            HardwareAddress::BROADCAST,
            source,
            FrameType::File,
            id,
            index,
            total,
            SharedBytes::from_vec(data.to_vec()),
        )
    }

    #[test]
    fn test_in_order_reassembly() {
        let table = table();
        let now = Instant::now();
        let source = addr(1);

        assert!(table.insert(&fragment(source, 7, 0, 3, &[1, 2]), now).is_none());
        assert!(table.insert(&fragment(source, 7, 1, 3, &[3, 4]), now).is_none());
        let payload = table.insert(&fragment(source, 7, 2, 3, &[5]), now).unwrap();
        assert_eq!(payload, vec![1, 2, 3, 4, 5]);
        assert_eq!(table.pending(), 0);
    }

    #[test]
    fn test_out_of_order_reassembly() {
        let table = table();
        let now = Instant::now();
        let source = addr(1);

        assert!(table.insert(&fragment(source, 9, 2, 3, &[5, 6]), now).is_none());
        assert!(table.insert(&fragment(source, 9, 0, 3, &[1, 2]), now).is_none());
        let payload = table.insert(&fragment(source, 9, 1, 3, &[3, 4]), now).unwrap();
        assert_eq!(payload, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_duplicates_are_dropped() {
        let table = table();
        let now = Instant::now();
        let source = addr(1);

        assert!(table.insert(&fragment(source, 3, 0, 2, &[1]), now).is_none());
        assert!(table.insert(&fragment(source, 3, 0, 2, &[9]), now).is_none());
        let payload = table.insert(&fragment(source, 3, 1, 2, &[2]), now).unwrap();
        // The first copy of fragment 0 wins.
        assert_eq!(payload, vec![1, 2]);
    }

    #[test]
    fn test_senders_do_not_collide() {
        let table = table();
        let now = Instant::now();

        assert!(table.insert(&fragment(addr(1), 5, 0, 2, &[1]), now).is_none());
        assert!(table.insert(&fragment(addr(2), 5, 0, 2, &[9]), now).is_none());
        assert_eq!(table.pending(), 2);

        let payload = table.insert(&fragment(addr(1), 5, 1, 2, &[2]), now).unwrap();
        assert_eq!(payload, vec![1, 2]);
        assert_eq!(table.pending(), 1);
    }

    #[test]
    fn test_total_revised_upward() {
        let table = table();
        let now = Instant::now();
        let source = addr(1);

        // First-seen fragment announces a stale total.
        assert!(table.insert(&fragment(source, 4, 1, 2, &[3, 4]), now).is_none());
        assert!(table.insert(&fragment(source, 4, 2, 3, &[5, 6]), now).is_none());
        let payload = table.insert(&fragment(source, 4, 0, 3, &[1, 2]), now).unwrap();
        assert_eq!(payload, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_out_of_range_index_dropped() {
        let table = table();
        let now = Instant::now();
        let source = addr(1);

        assert!(table.insert(&fragment(source, 8, 0, 2, &[1]), now).is_none());
        // Bypass the codec's range check with a hand-built frame claiming a
        // smaller total than the table already expects.
        assert!(table.insert(&fragment(source, 8, 1, 1, &[9]), now).is_none());
        let payload = table.insert(&fragment(source, 8, 1, 2, &[2]), now).unwrap();
        assert_eq!(payload, vec![1, 2]);
    }

    #[test]
    fn test_ttl_expiry_discards_partial_assembly() {
        let table = ReassemblyTable::new(Duration::from_secs(30), Duration::from_secs(1800));
        let start = Instant::now();
        let source = addr(1);

        let text_fragment = Frame::fragment(
            HardwareAddress::BROADCAST,
            source,
            FrameType::Text,
            11,
            0,
            2,
            SharedBytes::from_vec(vec![1]),
        );
        assert!(table.insert(&text_fragment, start).is_none());
        assert_eq!(table.pending(), 1);

        // An unrelated insert after the text TTL sweeps the stalled entry.
        let later = start + Duration::from_secs(31);
        assert!(table.insert(&fragment(addr(2), 12, 0, 2, &[7]), later).is_none());
        assert_eq!(table.pending(), 1);

        // The late final fragment now starts a fresh (incomplete) assembly.
        let final_fragment = Frame::fragment(
            HardwareAddress::BROADCAST,
            source,
            FrameType::Text,
            11,
            1,
            2,
            SharedBytes::from_vec(vec![2]),
        );
        assert!(table.insert(&final_fragment, later).is_none());
    }

    #[test]
    fn test_file_assemblies_outlive_text_ttl() {
        let table = ReassemblyTable::new(Duration::from_secs(30), Duration::from_secs(1800));
        let start = Instant::now();
        let source = addr(1);

        assert!(table.insert(&fragment(source, 2, 0, 2, &[1]), start).is_none());

        // Past the text TTL but within the file TTL.
        let later = start + Duration::from_secs(120);
        let payload = table.insert(&fragment(source, 2, 1, 2, &[2]), later).unwrap();
        assert_eq!(payload, vec![1, 2]);
    }
}
