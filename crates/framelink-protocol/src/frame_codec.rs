//! Frame encoding, decoding, and checksum verification.
//!
//! The wire layout is big-endian with no padding:
//!
//! ```text
//! offset  size  field
//! 0       6     destination MAC
//! 6       6     source MAC
//! 12      2     EtherType = 0x88B5
//! 14      1     frame type (1 = Text, 2 = File)
//! 15      2     message id
//! 17      4     fragment index
//! 21      4     fragment total (0 = unfragmented)
//! 25      2     payload length (N)
//! 27      N     payload bytes
//! 27+N    4     CRC-32 (IEEE) over bytes [0 .. 27+N)
//! ```
//!
//! A frame that is too short, carries the wrong EtherType, an inconsistent
//! payload length, or a bad CRC fails to decode; the receive path drops it
//! silently and counts it.

mod checksum;
mod decoder;
mod encoder;

pub use self::{
    checksum::{append_checksum, verify_and_strip_checksum},
    decoder::FrameDecoder,
    encoder::FrameEncoder,
};

#[cfg(test)]
mod tests {
    use framelink_core::{
        constants::MIN_FRAME_SIZE,
        error::{DecodingErrorKind, ErrorKind},
        hwaddr::HardwareAddress,
        shared::SharedBytes,
    };

    use super::*;
    use crate::frame::{Frame, FrameType};

    fn addr(last: u8) -> HardwareAddress {
        HardwareAddress::new([0x02, 0, 0, 0, 0, last])
    }

    #[test]
    fn test_round_trip_single_frame() {
        let frame = Frame::single(
            HardwareAddress::BROADCAST,
            addr(1),
            FrameType::Text,
            1234,
            SharedBytes::from_vec(b"hola".to_vec()),
        );
        let bytes = FrameEncoder::encode(&frame);
        assert_eq!(bytes.len(), MIN_FRAME_SIZE + 4);

        let decoded = FrameDecoder::decode(&bytes).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_round_trip_fragment_frame() {
        let frame = Frame::fragment(
            addr(2),
            addr(1),
            FrameType::File,
            0xBEEF,
            2,
            7,
            SharedBytes::from_vec(vec![0xAB; 300]),
        );
        let bytes = FrameEncoder::encode(&frame);
        let decoded = FrameDecoder::decode(&bytes).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_empty_payload_round_trip() {
        let frame = Frame::single(
            addr(2),
            addr(1),
            FrameType::Text,
            0,
            SharedBytes::from_vec(Vec::new()),
        );
        let bytes = FrameEncoder::encode(&frame);
        assert_eq!(bytes.len(), MIN_FRAME_SIZE);
        assert_eq!(FrameDecoder::decode(&bytes).unwrap(), frame);
    }

    #[test]
    fn test_every_bit_flip_is_rejected() {
        let frame = Frame::single(
            addr(2),
            addr(1),
            FrameType::Text,
            42,
            SharedBytes::from_vec(b"integrity".to_vec()),
        );
        let bytes = FrameEncoder::encode(&frame);

        for byte_index in 0..bytes.len() {
            for bit in 0..8 {
                let mut corrupted = bytes.clone();
                corrupted[byte_index] ^= 1 << bit;
                assert!(
                    FrameDecoder::decode(&corrupted).is_err(),
                    "flip at byte {} bit {} was accepted",
                    byte_index,
                    bit
                );
            }
        }
    }

    #[test]
    fn test_short_frame_rejected() {
        let err = FrameDecoder::decode(&[0u8; 14]).unwrap_err();
        assert!(matches!(
            err,
            ErrorKind::DecodingError(DecodingErrorKind::FrameTooShort)
        ));
    }

    #[test]
    fn test_wrong_ethertype_rejected() {
        let frame = Frame::single(
            addr(2),
            addr(1),
            FrameType::Text,
            42,
            SharedBytes::from_vec(b"x".to_vec()),
        );
        let mut bytes = FrameEncoder::encode(&frame);
        // Swap in a foreign EtherType and fix up the checksum so only the
        // EtherType check can reject it.
        bytes[12] = 0x08;
        bytes[13] = 0x00;
        let body_len = bytes.len() - 4;
        bytes.truncate(body_len);
        let bytes = append_checksum(bytes);

        let err = FrameDecoder::decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            ErrorKind::DecodingError(DecodingErrorKind::EtherType)
        ));
    }

    #[test]
    fn test_inconsistent_payload_length_rejected() {
        let frame = Frame::single(
            addr(2),
            addr(1),
            FrameType::Text,
            42,
            SharedBytes::from_vec(b"abcdef".to_vec()),
        );
        let mut bytes = FrameEncoder::encode(&frame);
        // Understate the payload length, then re-checksum.
        bytes[25] = 0;
        bytes[26] = 2;
        let body_len = bytes.len() - 4;
        bytes.truncate(body_len);
        let bytes = append_checksum(bytes);

        let err = FrameDecoder::decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            ErrorKind::DecodingError(DecodingErrorKind::PayloadLength)
        ));
    }

    #[test]
    fn test_fragment_index_out_of_range_rejected() {
        let frame = Frame::single(
            addr(2),
            addr(1),
            FrameType::Text,
            42,
            SharedBytes::from_vec(b"x".to_vec()),
        );
        let mut bytes = FrameEncoder::encode(&frame);
        // fragment index 5, fragment total 3
        bytes[17..21].copy_from_slice(&5u32.to_be_bytes());
        bytes[21..25].copy_from_slice(&3u32.to_be_bytes());
        let body_len = bytes.len() - 4;
        bytes.truncate(body_len);
        let bytes = append_checksum(bytes);

        let err = FrameDecoder::decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            ErrorKind::DecodingError(DecodingErrorKind::FragmentHeader)
        ));
    }
}
