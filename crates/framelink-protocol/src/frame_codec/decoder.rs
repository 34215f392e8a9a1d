//! Frame deserialization and validation.

use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt};
use framelink_core::{
    constants::{FRAME_HEADER_SIZE, LINK_ETHERTYPE, MIN_FRAME_SIZE},
    error::{DecodingErrorKind, ErrorKind, Result},
    hwaddr::HardwareAddress,
    shared::SharedBytes,
};

use super::checksum::verify_and_strip_checksum;
use crate::frame::{Frame, FrameType};

/// Deserializes frames from wire bytes.
pub struct FrameDecoder;

impl FrameDecoder {
    /// Decodes and validates one frame.
    ///
    /// Validation order: length, CRC-32, EtherType, frame type, payload
    /// length consistency, fragment header consistency. Any failure means
    /// the frame must be dropped by the caller.
    pub fn decode(data: &[u8]) -> Result<Frame> {
        if data.len() < MIN_FRAME_SIZE {
            return Err(ErrorKind::DecodingError(DecodingErrorKind::FrameTooShort));
        }
        let body = verify_and_strip_checksum(data)?;

        let mut cursor = Cursor::new(body);
        let mut destination = [0u8; 6];
        let mut source = [0u8; 6];
        cursor.read_exact(&mut destination).map_err(short_read)?;
        cursor.read_exact(&mut source).map_err(short_read)?;

        let ethertype = cursor.read_u16::<BigEndian>().map_err(short_read)?;
        if ethertype != LINK_ETHERTYPE {
            return Err(ErrorKind::DecodingError(DecodingErrorKind::EtherType));
        }

        let frame_type = FrameType::try_from(cursor.read_u8().map_err(short_read)?)?;
        let message_id = cursor.read_u16::<BigEndian>().map_err(short_read)?;
        let fragment_index = cursor.read_u32::<BigEndian>().map_err(short_read)?;
        let fragment_total = cursor.read_u32::<BigEndian>().map_err(short_read)?;
        let payload_length = cursor.read_u16::<BigEndian>().map_err(short_read)? as usize;

        if body.len() - FRAME_HEADER_SIZE != payload_length {
            return Err(ErrorKind::DecodingError(DecodingErrorKind::PayloadLength));
        }
        if fragment_total > 0 && fragment_index >= fragment_total {
            return Err(ErrorKind::DecodingError(DecodingErrorKind::FragmentHeader));
        }

        let payload = SharedBytes::from_vec(body[FRAME_HEADER_SIZE..].to_vec());
        Ok(Frame::from_parts(
            HardwareAddress::new(destination),
            HardwareAddress::new(source),
            frame_type,
            message_id,
            fragment_index,
            fragment_total,
            payload,
        ))
    }

}

fn short_read(_: std::io::Error) -> ErrorKind {
    ErrorKind::DecodingError(DecodingErrorKind::FrameTooShort)
}
