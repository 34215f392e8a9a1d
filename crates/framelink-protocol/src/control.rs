//! Text control-message prefixes and JSON bodies.
//!
//! Text payloads are classified once, at the dispatcher boundary, into a
//! tagged variant; services receive typed bodies rather than prefix-matched
//! strings. Anything without a known prefix is user chat.

use framelink_core::error::{ErrorKind, Result};
use serde::{Deserialize, Serialize};

/// Prefix of peer-liveness messages.
pub const DISCOVERY_PREFIX: &str = "DISCOVERY:";
/// Prefix of key-handshake and ciphertext-carrier messages.
pub const SECURITY_PREFIX: &str = "SECURITY:";
/// Prefix opening a folder transfer.
pub const FOLDER_START_PREFIX: &str = "FOLDER_START:";
/// Prefix describing the next file of a folder transfer.
pub const FOLDER_FILE_PREFIX: &str = "FOLDER_FILE:";
/// Prefix closing a folder transfer.
pub const FOLDER_END_PREFIX: &str = "FOLDER_END:";

/// Peer-liveness message body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DiscoveryMessage {
    /// Periodic presence announcement.
    #[serde(rename = "HEARTBEAT")]
    Heartbeat {
        /// Announcing peer's hardware address, rendered as text.
        mac: String,
        /// Announcing peer's hostname.
        hostname: String,
        /// Sender wall-clock, seconds since the Unix epoch.
        timestamp: u64,
        /// Capability labels the peer supports.
        capabilities: Vec<String>,
    },
    /// Request for an immediate heartbeat from all recipients.
    #[serde(rename = "DISCOVERY_REQUEST")]
    Request {
        /// Requesting peer's hardware address, rendered as text.
        mac: String,
        /// Sender wall-clock, seconds since the Unix epoch.
        timestamp: u64,
    },
}

/// Key-handshake and protected-message bodies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SecurityMessage {
    /// Opens a key exchange.
    #[serde(rename = "SIMPLE_KEY_REQUEST")]
    KeyRequest {
        /// Initiator's public token: hex SHA-256 of its local secret.
        public_token: String,
        /// Random token identifying this exchange.
        exchange_token: String,
        /// Initiator's hardware address, rendered as text.
        sender_mac: String,
        /// Sender wall-clock, seconds since the Unix epoch.
        timestamp: u64,
    },
    /// Answers a key exchange, echoing the exchange token.
    #[serde(rename = "SIMPLE_KEY_RESPONSE")]
    KeyResponse {
        /// Responder's public token: hex SHA-256 of its local secret.
        public_token: String,
        /// Echoed exchange token.
        exchange_token: String,
        /// Responder's hardware address, rendered as text.
        sender_mac: String,
        /// Sender wall-clock, seconds since the Unix epoch.
        timestamp: u64,
    },
    /// Carries an authenticated ciphertext.
    #[serde(rename = "SECURE_MESSAGE")]
    Protected {
        /// Base64 of the 16-byte random nonce.
        nonce: String,
        /// Base64 of the XOR ciphertext.
        encrypted: String,
        /// Base64 of the HMAC-SHA256 over nonce || ciphertext.
        mac: String,
        /// Sender's hardware address, rendered as text.
        sender_mac: String,
        /// Sender wall-clock, seconds since the Unix epoch.
        timestamp: u64,
    },
}

/// Body of a `FOLDER_START:` message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FolderStart {
    /// Identifier shared by every message of this transfer.
    pub transfer_id: String,
    /// Folder name to recreate under the download root.
    pub name: String,
    /// Number of files the sender will transfer.
    pub total_files: u32,
    /// Sender wall-clock, seconds since the Unix epoch.
    pub timestamp: u64,
}

/// Body of a `FOLDER_FILE:` message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FolderFile {
    /// Identifier shared by every message of this transfer.
    pub transfer_id: String,
    /// Path of the next file, relative to the folder root.
    pub relative_path: String,
    /// Byte size of the next file.
    pub file_size: u64,
}

/// Body of a `FOLDER_END:` message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FolderEnd {
    /// Identifier shared by every message of this transfer.
    pub transfer_id: String,
    /// Number of files the sender actually dispatched.
    pub files_sent: u32,
}

/// A folder-transfer control message.
#[derive(Clone, Debug, PartialEq)]
pub enum FolderControl {
    /// Transfer opening.
    Start(FolderStart),
    /// Next-file descriptor.
    File(FolderFile),
    /// Transfer close.
    End(FolderEnd),
}

/// A text payload, classified by prefix.
#[derive(Clone, Debug, PartialEq)]
pub enum InboundText {
    /// Free text for the user.
    Chat(String),
    /// A `DISCOVERY:` message.
    Discovery(DiscoveryMessage),
    /// A `SECURITY:` message.
    Security(SecurityMessage),
    /// A `FOLDER_*:` message.
    Folder(FolderControl),
}

/// Classifies a text payload into its tagged variant.
///
/// A known prefix followed by an unparsable body is an error; text with no
/// known prefix is chat.
pub fn classify(text: &str) -> Result<InboundText> {
    if let Some(body) = text.strip_prefix(DISCOVERY_PREFIX) {
        return Ok(InboundText::Discovery(parse_body(body)?));
    }
    if let Some(body) = text.strip_prefix(SECURITY_PREFIX) {
        return Ok(InboundText::Security(parse_body(body)?));
    }
    if let Some(body) = text.strip_prefix(FOLDER_START_PREFIX) {
        return Ok(InboundText::Folder(FolderControl::Start(parse_body(body)?)));
    }
    if let Some(body) = text.strip_prefix(FOLDER_FILE_PREFIX) {
        return Ok(InboundText::Folder(FolderControl::File(parse_body(body)?)));
    }
    if let Some(body) = text.strip_prefix(FOLDER_END_PREFIX) {
        return Ok(InboundText::Folder(FolderControl::End(parse_body(body)?)));
    }
    Ok(InboundText::Chat(text.to_owned()))
}

fn parse_body<'a, T: Deserialize<'a>>(body: &'a str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| ErrorKind::MalformedControl(e.to_string()))
}

fn render<T: Serialize>(prefix: &str, body: &T) -> Result<String> {
    let json =
        serde_json::to_string(body).map_err(|e| ErrorKind::MalformedControl(e.to_string()))?;
    Ok(format!("{}{}", prefix, json))
}

impl DiscoveryMessage {
    /// Renders this message with its wire prefix.
    pub fn to_wire(&self) -> Result<String> {
        render(DISCOVERY_PREFIX, self)
    }
}

impl SecurityMessage {
    /// Renders this message with its wire prefix.
    pub fn to_wire(&self) -> Result<String> {
        render(SECURITY_PREFIX, self)
    }
}

impl FolderControl {
    /// Renders this message with its wire prefix.
    pub fn to_wire(&self) -> Result<String> {
        match self {
            FolderControl::Start(body) => render(FOLDER_START_PREFIX, body),
            FolderControl::File(body) => render(FOLDER_FILE_PREFIX, body),
            FolderControl::End(body) => render(FOLDER_END_PREFIX, body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_chat() {
        let classified = classify("hello there").unwrap();
        assert_eq!(classified, InboundText::Chat("hello there".into()));
    }

    #[test]
    fn test_heartbeat_round_trip() {
        let message = DiscoveryMessage::Heartbeat {
            mac: "02:00:00:00:00:01".into(),
            hostname: "nodeA".into(),
            timestamp: 1_700_000_000,
            capabilities: vec!["text".into(), "file".into(), "broadcast".into()],
        };
        let wire = message.to_wire().unwrap();
        assert!(wire.starts_with(DISCOVERY_PREFIX));
        assert_eq!(classify(&wire).unwrap(), InboundText::Discovery(message));
    }

    #[test]
    fn test_discovery_request_round_trip() {
        let message =
            DiscoveryMessage::Request { mac: "02:00:00:00:00:02".into(), timestamp: 12 };
        let wire = message.to_wire().unwrap();
        assert_eq!(classify(&wire).unwrap(), InboundText::Discovery(message));
    }

    #[test]
    fn test_security_round_trip() {
        let message = SecurityMessage::KeyRequest {
            public_token: "ab".repeat(32),
            exchange_token: "cd".repeat(16),
            sender_mac: "02:00:00:00:00:01".into(),
            timestamp: 5,
        };
        let wire = message.to_wire().unwrap();
        assert!(wire.starts_with(SECURITY_PREFIX));
        assert_eq!(classify(&wire).unwrap(), InboundText::Security(message));
    }

    #[test]
    fn test_folder_messages_round_trip() {
        let start = FolderControl::Start(FolderStart {
            transfer_id: "f00d".into(),
            name: "r".into(),
            total_files: 2,
            timestamp: 9,
        });
        let file = FolderControl::File(FolderFile {
            transfer_id: "f00d".into(),
            relative_path: "sub/y.txt".into(),
            file_size: 3,
        });
        let end = FolderControl::End(FolderEnd { transfer_id: "f00d".into(), files_sent: 2 });

        for message in [start, file, end] {
            let wire = message.to_wire().unwrap();
            assert_eq!(classify(&wire).unwrap(), InboundText::Folder(message));
        }
    }

    #[test]
    fn test_malformed_body_is_an_error() {
        assert!(classify("DISCOVERY:{not json").is_err());
        assert!(classify("FOLDER_START:[]").is_err());
    }

    #[test]
    fn test_unknown_discovery_type_is_an_error() {
        assert!(classify(r#"DISCOVERY:{"type":"GOODBYE","mac":"02:00:00:00:00:01"}"#).is_err());
    }
}
