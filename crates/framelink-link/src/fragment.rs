//! Outbound payload fragmentation.

use framelink_core::{constants::MAX_PAYLOAD_LENGTH, hwaddr::HardwareAddress, shared::SharedBytes};
use framelink_protocol::frame::{Frame, FrameType};

use crate::message_id::MessageIdGenerator;

/// Splits outbound payloads into MTU-sized frames.
///
/// A payload within the budget becomes a single frame with the
/// `fragment_total = 0` sentinel. Larger payloads are split into
/// `ceil(len / budget)` fragments sharing one freshly minted message id,
/// each frame holding a zero-copy view of the original buffer.
#[derive(Debug)]
pub struct Fragmenter {
    payload_budget: usize,
    ids: MessageIdGenerator,
}

impl Fragmenter {
    /// Creates a fragmenter with the given per-frame payload budget.
    /// The budget is capped at what the payload-length field can express.
    pub fn new(payload_budget: usize) -> Self {
        Self {
            payload_budget: payload_budget.clamp(1, MAX_PAYLOAD_LENGTH),
            ids: MessageIdGenerator::new(),
        }
    }

    /// Splits one logical message into an ordered frame sequence.
    pub fn split(
        &self,
        destination: HardwareAddress,
        source: HardwareAddress,
        frame_type: FrameType,
        payload: SharedBytes,
    ) -> Vec<Frame> {
        let message_id = self.ids.next_id();

        if payload.len() <= self.payload_budget {
            return vec![Frame::single(destination, source, frame_type, message_id, payload)];
        }

        let total = payload.len().div_ceil(self.payload_budget) as u32;
        tracing::trace!(
            "fragmenting {} byte payload into {} fragments ({} bytes each)",
            payload.len(),
            total,
            self.payload_budget
        );

        let mut frames = Vec::with_capacity(total as usize);
        for index in 0..total {
            let start = index as usize * self.payload_budget;
            let end = (start + self.payload_budget).min(payload.len());
            frames.push(Frame::fragment(
                destination,
                source,
                frame_type,
                message_id,
                index,
                total,
                payload.slice(start, end - start),
            ));
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last: u8) -> HardwareAddress {
        HardwareAddress::new([0x02, 0, 0, 0, 0, last])
    }

    #[test]
    fn test_small_payload_single_frame() {
        let fragmenter = Fragmenter::new(1475);
        let frames = fragmenter.split(
            HardwareAddress::BROADCAST,
            addr(1),
            FrameType::Text,
            SharedBytes::from_vec(b"hola".to_vec()),
        );
        assert_eq!(frames.len(), 1);
        assert!(!frames[0].is_fragment());
        assert_eq!(frames[0].payload(), b"hola");
    }

    #[test]
    fn test_payload_at_budget_boundary_stays_single() {
        let fragmenter = Fragmenter::new(100);
        let frames = fragmenter.split(
            addr(2),
            addr(1),
            FrameType::File,
            SharedBytes::from_vec(vec![7u8; 100]),
        );
        assert_eq!(frames.len(), 1);
        assert!(!frames[0].is_fragment());
    }

    #[test]
    fn test_large_payload_fragments_in_order() {
        let fragmenter = Fragmenter::new(1475);
        let frames = fragmenter.split(
            addr(2),
            addr(1),
            FrameType::File,
            SharedBytes::from_vec(vec![0xAB; 3000]),
        );

        assert_eq!(frames.len(), 3);
        let message_id = frames[0].message_id();
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.fragment_index(), i as u32);
            assert_eq!(frame.fragment_total(), 3);
            assert_eq!(frame.message_id(), message_id);
        }
        assert_eq!(frames[0].payload().len(), 1475);
        assert_eq!(frames[1].payload().len(), 1475);
        assert_eq!(frames[2].payload().len(), 50);
    }

    #[test]
    fn test_fragments_concatenate_to_original() {
        let payload: Vec<u8> = (0..2500u32).map(|i| i as u8).collect();
        let fragmenter = Fragmenter::new(1000);
        let frames = fragmenter.split(
            addr(2),
            addr(1),
            FrameType::File,
            SharedBytes::from_vec(payload.clone()),
        );

        let mut rebuilt = Vec::new();
        for frame in &frames {
            rebuilt.extend_from_slice(frame.payload());
        }
        assert_eq!(rebuilt, payload);
    }

    #[test]
    fn test_each_message_gets_fresh_id() {
        let fragmenter = Fragmenter::new(1475);
        let a = fragmenter.split(
            addr(2),
            addr(1),
            FrameType::Text,
            SharedBytes::from_vec(b"a".to_vec()),
        );
        let b = fragmenter.split(
            addr(2),
            addr(1),
            FrameType::Text,
            SharedBytes::from_vec(b"b".to_vec()),
        );
        assert_ne!(a[0].message_id(), b[0].message_id());
    }
}
