//! Error types shared across the stack.

use std::{fmt, io};

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, ErrorKind>;

/// Field-level reason a received frame failed to decode.
///
/// Decoding failures are absorbed by the receive path (counted and logged,
/// never surfaced to peers or the user sink).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodingErrorKind {
    /// Fewer bytes than the minimum frame size.
    FrameTooShort,
    /// EtherType other than the protocol's own.
    EtherType,
    /// Unknown frame-type octet.
    FrameType,
    /// Payload-length field disagrees with the actual byte count.
    PayloadLength,
    /// Fragment index not below the announced total.
    FragmentHeader,
    /// CRC-32 trailer does not match the frame contents.
    Checksum,
}

impl fmt::Display for DecodingErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodingErrorKind::FrameTooShort => write!(f, "frame shorter than minimum size"),
            DecodingErrorKind::EtherType => write!(f, "unexpected EtherType"),
            DecodingErrorKind::FrameType => write!(f, "unknown frame type"),
            DecodingErrorKind::PayloadLength => write!(f, "payload length field mismatch"),
            DecodingErrorKind::FragmentHeader => write!(f, "fragment index out of range"),
            DecodingErrorKind::Checksum => write!(f, "CRC-32 checksum mismatch"),
        }
    }
}

/// Errors produced anywhere in the stack.
#[derive(Debug)]
pub enum ErrorKind {
    /// Wrapper around a `std::io::Error` from the socket or filesystem.
    IoError(io::Error),
    /// A received frame failed validation.
    DecodingError(DecodingErrorKind),
    /// The transmit coordinator exhausted its backoff attempts.
    ChannelContended {
        /// Number of attempts made before giving up.
        attempts: u8,
    },
    /// A control message carried a body that could not be parsed.
    MalformedControl(String),
    /// A received file's declared size disagrees with its content.
    SizeMismatch {
        /// Size announced in the envelope.
        declared: usize,
        /// Bytes actually received.
        actual: usize,
    },
    /// A secure message failed authentication.
    AuthenticationFailed,
    /// A secure operation was requested while the security layer is off.
    SecurityDisabled,
    /// A secure message arrived from a peer with no installed session key.
    MissingSessionKey(String),
    /// A key-exchange response did not match any outstanding exchange.
    UnexpectedExchange(String),
    /// The named network interface does not exist or is unusable.
    InterfaceNotFound(String),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::IoError(e) => write!(f, "I/O error: {}", e),
            ErrorKind::DecodingError(kind) => write!(f, "decoding error: {}", kind),
            ErrorKind::ChannelContended { attempts } => {
                write!(f, "channel busy after {} transmit attempts", attempts)
            }
            ErrorKind::MalformedControl(detail) => {
                write!(f, "malformed control message: {}", detail)
            }
            ErrorKind::SizeMismatch { declared, actual } => {
                write!(f, "size mismatch: declared {} bytes, received {}", declared, actual)
            }
            ErrorKind::AuthenticationFailed => write!(f, "message authentication failed"),
            ErrorKind::SecurityDisabled => write!(f, "security layer is disabled"),
            ErrorKind::MissingSessionKey(peer) => {
                write!(f, "no session key installed for {}", peer)
            }
            ErrorKind::UnexpectedExchange(peer) => {
                write!(f, "key response from {} matches no pending exchange", peer)
            }
            ErrorKind::InterfaceNotFound(name) => {
                write!(f, "network interface '{}' not found", name)
            }
        }
    }
}

impl std::error::Error for ErrorKind {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ErrorKind::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ErrorKind {
    fn from(error: io::Error) -> Self {
        ErrorKind::IoError(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats() {
        let err = ErrorKind::ChannelContended { attempts: 16 };
        assert_eq!(err.to_string(), "channel busy after 16 transmit attempts");

        let err = ErrorKind::SizeMismatch { declared: 10, actual: 7 };
        assert_eq!(err.to_string(), "size mismatch: declared 10 bytes, received 7");

        let err = ErrorKind::DecodingError(DecodingErrorKind::Checksum);
        assert_eq!(err.to_string(), "decoding error: CRC-32 checksum mismatch");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "raw socket");
        let err: ErrorKind = io_err.into();
        assert!(matches!(err, ErrorKind::IoError(_)));
    }
}
