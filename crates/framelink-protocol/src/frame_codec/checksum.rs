//! CRC-32 trailer handling.

use byteorder::{BigEndian, ByteOrder};
use crc32fast::Hasher;
use framelink_core::error::{DecodingErrorKind, ErrorKind, Result};

/// Appends a CRC-32 (IEEE) trailer over all bytes currently in `data`.
pub fn append_checksum(mut data: Vec<u8>) -> Vec<u8> {
    let mut hasher = Hasher::new();
    hasher.update(&data);
    let checksum = hasher.finalize();
    data.extend_from_slice(&checksum.to_be_bytes());
    data
}

/// Verifies the CRC-32 trailer and returns the bytes it covers.
pub fn verify_and_strip_checksum(data: &[u8]) -> Result<&[u8]> {
    if data.len() < 4 {
        return Err(ErrorKind::DecodingError(DecodingErrorKind::FrameTooShort));
    }

    let (body, trailer) = data.split_at(data.len() - 4);
    let received = BigEndian::read_u32(trailer);

    let mut hasher = Hasher::new();
    hasher.update(body);
    if hasher.finalize() != received {
        return Err(ErrorKind::DecodingError(DecodingErrorKind::Checksum));
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_verify() {
        let body = b"link-layer bytes".to_vec();
        let framed = append_checksum(body.clone());
        assert_eq!(framed.len(), body.len() + 4);
        assert_eq!(verify_and_strip_checksum(&framed).unwrap(), &body[..]);
    }

    #[test]
    fn test_corruption_detected() {
        let mut framed = append_checksum(b"link-layer bytes".to_vec());
        framed[3] ^= 0x01;
        assert!(verify_and_strip_checksum(&framed).is_err());
    }

    #[test]
    fn test_trailer_corruption_detected() {
        let mut framed = append_checksum(b"link-layer bytes".to_vec());
        let last = framed.len() - 1;
        framed[last] ^= 0xFF;
        assert!(verify_and_strip_checksum(&framed).is_err());
    }

    #[test]
    fn test_short_input_rejected() {
        assert!(verify_and_strip_checksum(b"abc").is_err());
    }
}
