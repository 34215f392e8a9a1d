//! The `FILE_TRANSFER` envelope inside `File`-typed payloads.
//!
//! Wire shape: `FILE_TRANSFER:<name>:<size>:<bytes>` where `<name>` and
//! `<size>` are ASCII and `<bytes>` is raw content. The whole envelope
//! travels as one logical `File` message through the fragmenting codec.

use framelink_core::error::{ErrorKind, Result};

/// ASCII prefix opening a file envelope.
pub const FILE_ENVELOPE_PREFIX: &[u8] = b"FILE_TRANSFER:";

/// A parsed file envelope borrowing from the payload buffer.
#[derive(Debug, PartialEq, Eq)]
pub struct FileEnvelope<'a> {
    /// File name announced by the sender.
    pub name: &'a str,
    /// File content; its length already matches the declared size.
    pub content: &'a [u8],
}

/// Builds an envelope around a file's bytes.
pub fn build(name: &str, content: &[u8]) -> Vec<u8> {
    let header = format!("FILE_TRANSFER:{}:{}:", name, content.len());
    let mut payload = Vec::with_capacity(header.len() + content.len());
    payload.extend_from_slice(header.as_bytes());
    payload.extend_from_slice(content);
    payload
}

/// Parses a `File` payload.
///
/// Returns `Ok(None)` when the payload does not start with the envelope
/// prefix (the caller falls back to raw-payload handling). A present but
/// malformed envelope, or a declared size disagreeing with the content
/// length, is an error to surface to the user.
pub fn parse(payload: &[u8]) -> Result<Option<FileEnvelope<'_>>> {
    let rest = match payload.strip_prefix(FILE_ENVELOPE_PREFIX) {
        Some(rest) => rest,
        None => return Ok(None),
    };

    let name_end = find_colon(rest, "file name")?;
    let name = std::str::from_utf8(&rest[..name_end])
        .map_err(|_| ErrorKind::MalformedControl("file name is not UTF-8".into()))?;

    let size_part = &rest[name_end + 1..];
    let size_end = find_colon(size_part, "file size")?;
    let size: usize = std::str::from_utf8(&size_part[..size_end])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ErrorKind::MalformedControl("file size is not a number".into()))?;

    let content = &size_part[size_end + 1..];
    if content.len() != size {
        return Err(ErrorKind::SizeMismatch { declared: size, actual: content.len() });
    }

    Ok(Some(FileEnvelope { name, content }))
}

fn find_colon(bytes: &[u8], field: &str) -> Result<usize> {
    bytes
        .iter()
        .position(|&b| b == b':')
        .ok_or_else(|| ErrorKind::MalformedControl(format!("envelope missing {} delimiter", field)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_and_parse() {
        let payload = build("a.txt", b"hi");
        assert_eq!(payload, b"FILE_TRANSFER:a.txt:2:hi");

        let envelope = parse(&payload).unwrap().unwrap();
        assert_eq!(envelope.name, "a.txt");
        assert_eq!(envelope.content, b"hi");
    }

    #[test]
    fn test_binary_content_preserved() {
        let content: Vec<u8> = (0u8..=255).collect();
        let payload = build("blob.bin", &content);
        let envelope = parse(&payload).unwrap().unwrap();
        assert_eq!(envelope.content, &content[..]);
    }

    #[test]
    fn test_content_containing_colons() {
        let payload = build("notes.txt", b"a:b:c");
        let envelope = parse(&payload).unwrap().unwrap();
        assert_eq!(envelope.content, b"a:b:c");
    }

    #[test]
    fn test_unprefixed_payload_is_not_an_envelope() {
        assert_eq!(parse(b"arbitrary bytes").unwrap(), None);
    }

    #[test]
    fn test_size_mismatch_is_an_error() {
        let err = parse(b"FILE_TRANSFER:a.txt:5:hi").unwrap_err();
        assert!(matches!(
            err,
            framelink_core::error::ErrorKind::SizeMismatch { declared: 5, actual: 2 }
        ));
    }

    #[test]
    fn test_missing_delimiters_are_errors() {
        assert!(parse(b"FILE_TRANSFER:no-delimiters").is_err());
        assert!(parse(b"FILE_TRANSFER:a.txt:notanumber:x").is_err());
    }

    #[test]
    fn test_empty_file() {
        let payload = build("empty", b"");
        let envelope = parse(&payload).unwrap().unwrap();
        assert_eq!(envelope.name, "empty");
        assert!(envelope.content.is_empty());
    }
}
