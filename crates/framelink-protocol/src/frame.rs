//! Frame types and structures.
//!
//! A `Frame` is one wire unit: destination, source, frame type, message id,
//! fragment header, payload. The CRC-32 trailer is added and checked by the
//! codec, not stored here. Single-frame messages carry the sentinel
//! `fragment_total == 0`.

use std::convert::TryFrom;

use framelink_core::{
    error::{DecodingErrorKind, ErrorKind},
    hwaddr::HardwareAddress,
    shared::SharedBytes,
};

/// Per-sender logical message identifier. Unique only within a short
/// time window; reassembly is keyed by `(source, message id)`.
pub type MessageId = u16;

/// Helper trait to convert enums to u8 values for the wire format.
pub trait EnumConverter {
    /// The enum type this converter works with.
    type Enum;

    /// Converts the enum to a u8 for serialization.
    fn to_u8(&self) -> u8;
}

/// Kind of payload a frame carries.
#[derive(Copy, Clone, Debug, PartialOrd, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// UTF-8 text: chat or a control message.
    Text = 1,
    /// Raw bytes, normally a `FILE_TRANSFER` envelope.
    File = 2,
}

impl EnumConverter for FrameType {
    type Enum = FrameType;

    fn to_u8(&self) -> u8 {
        *self as u8
    }
}

impl TryFrom<u8> for FrameType {
    type Error = ErrorKind;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(FrameType::Text),
            2 => Ok(FrameType::File),
            _ => Err(ErrorKind::DecodingError(DecodingErrorKind::FrameType)),
        }
    }
}

/// One wire unit of the protocol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    destination: HardwareAddress,
    source: HardwareAddress,
    frame_type: FrameType,
    message_id: MessageId,
    fragment_index: u32,
    fragment_total: u32,
    payload: SharedBytes,
}

impl Frame {
    /// Creates an unfragmented frame (`fragment_total = 0` sentinel).
    pub fn single(
        destination: HardwareAddress,
        source: HardwareAddress,
        frame_type: FrameType,
        message_id: MessageId,
        payload: SharedBytes,
    ) -> Frame {
        Frame {
            destination,
            source,
            frame_type,
            message_id,
            fragment_index: 0,
            fragment_total: 0,
            payload,
        }
    }

    /// Creates one fragment of a larger message.
    pub fn fragment(
        destination: HardwareAddress,
        source: HardwareAddress,
        frame_type: FrameType,
        message_id: MessageId,
        fragment_index: u32,
        fragment_total: u32,
        payload: SharedBytes,
    ) -> Frame {
        debug_assert!(fragment_index < fragment_total);
        Frame {
            destination,
            source,
            frame_type,
            message_id,
            fragment_index,
            fragment_total,
            payload,
        }
    }

    /// Reconstructs a frame from decoded header fields.
    pub(crate) fn from_parts(
        destination: HardwareAddress,
        source: HardwareAddress,
        frame_type: FrameType,
        message_id: MessageId,
        fragment_index: u32,
        fragment_total: u32,
        payload: SharedBytes,
    ) -> Frame {
        Frame {
            destination,
            source,
            frame_type,
            message_id,
            fragment_index,
            fragment_total,
            payload,
        }
    }

    /// Returns the destination hardware address.
    pub fn destination(&self) -> HardwareAddress {
        self.destination
    }

    /// Returns the source hardware address.
    pub fn source(&self) -> HardwareAddress {
        self.source
    }

    /// Returns the payload kind.
    pub fn frame_type(&self) -> FrameType {
        self.frame_type
    }

    /// Returns the message identifier.
    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    /// Returns this fragment's index (0 for unfragmented frames).
    pub fn fragment_index(&self) -> u32 {
        self.fragment_index
    }

    /// Returns the announced fragment count (0 for unfragmented frames).
    pub fn fragment_total(&self) -> u32 {
        self.fragment_total
    }

    /// Returns true when this frame is one piece of a larger message.
    pub fn is_fragment(&self) -> bool {
        self.fragment_total > 0
    }

    /// Returns a view of the payload bytes.
    pub fn payload(&self) -> &[u8] {
        self.payload.as_slice()
    }

    /// Returns the shared payload buffer.
    pub fn payload_shared(&self) -> &SharedBytes {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last: u8) -> HardwareAddress {
        HardwareAddress::new([0x02, 0, 0, 0, 0, last])
    }

    #[test]
    fn test_frame_type_round_trip() {
        for frame_type in [FrameType::Text, FrameType::File] {
            assert_eq!(FrameType::try_from(frame_type.to_u8()).unwrap(), frame_type);
        }
    }

    #[test]
    fn test_frame_type_rejects_unknown() {
        assert!(FrameType::try_from(0).is_err());
        assert!(FrameType::try_from(3).is_err());
    }

    #[test]
    fn test_single_frame_uses_sentinel() {
        let frame = Frame::single(
            HardwareAddress::BROADCAST,
            addr(1),
            FrameType::Text,
            7,
            SharedBytes::from_vec(b"hola".to_vec()),
        );
        assert!(!frame.is_fragment());
        assert_eq!(frame.fragment_index(), 0);
        assert_eq!(frame.fragment_total(), 0);
        assert_eq!(frame.payload(), b"hola");
    }

    #[test]
    fn test_fragment_frame() {
        let frame = Frame::fragment(
            addr(2),
            addr(1),
            FrameType::File,
            9,
            1,
            3,
            SharedBytes::from_vec(vec![0xAB; 16]),
        );
        assert!(frame.is_fragment());
        assert_eq!(frame.fragment_index(), 1);
        assert_eq!(frame.fragment_total(), 3);
    }
}
