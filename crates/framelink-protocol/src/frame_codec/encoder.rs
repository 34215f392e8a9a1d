//! Frame serialization.

use byteorder::{BigEndian, WriteBytesExt};
use framelink_core::constants::{CHECKSUM_SIZE, FRAME_HEADER_SIZE, LINK_ETHERTYPE};

use super::checksum::append_checksum;
use crate::frame::{EnumConverter, Frame};

/// Serializes frames into wire bytes.
pub struct FrameEncoder;

impl FrameEncoder {
    /// Encodes a frame, including its CRC-32 trailer.
    pub fn encode(frame: &Frame) -> Vec<u8> {
        let payload = frame.payload();
        let mut buffer = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len() + CHECKSUM_SIZE);

        buffer.extend_from_slice(&frame.destination().octets());
        buffer.extend_from_slice(&frame.source().octets());
        // Writes to a Vec cannot fail.
        let _ = buffer.write_u16::<BigEndian>(LINK_ETHERTYPE);
        let _ = buffer.write_u8(frame.frame_type().to_u8());
        let _ = buffer.write_u16::<BigEndian>(frame.message_id());
        let _ = buffer.write_u32::<BigEndian>(frame.fragment_index());
        let _ = buffer.write_u32::<BigEndian>(frame.fragment_total());
        let _ = buffer.write_u16::<BigEndian>(payload.len() as u16);
        buffer.extend_from_slice(payload);

        append_checksum(buffer)
    }
}
