//! Secure channels: handshake and message protection.
//!
//! The handshake exchanges SHA-256 commitments of each side's local secret
//! plus a random exchange token; both sides then derive the same session
//! key from `SHA256(initiator_token || responder_token || exchange_token)`.
//! Messages are protected with an XOR keystream derived per-nonce and an
//! HMAC-SHA256 verified in constant time.
//!
//! This is deliberately lightweight obfuscation plus authentication, not
//! an IND-CPA-secure AEAD; swap in a real AEAD to harden it while keeping
//! the handshake message shapes.

use std::{
    collections::HashMap,
    fmt::Write as _,
    sync::Arc,
    time::{Duration, Instant},
};

use framelink_core::{
    config::Config,
    error::{ErrorKind, Result},
    hwaddr::HardwareAddress,
    sink::EventSink,
};
use framelink_link::transceiver::LinkTransceiver;
use framelink_protocol::{control::SecurityMessage, frame::FrameType};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::clock::unix_now;

type HmacSha256 = Hmac<Sha256>;

/// An outstanding outbound handshake.
#[derive(Debug)]
struct PendingExchange {
    exchange_token: String,
    started: Instant,
}

/// Manages session keys and protected messages for all peers.
pub struct SecureChannelService {
    transceiver: Arc<LinkTransceiver>,
    sink: Arc<dyn EventSink>,
    enabled: bool,
    public_token: String,
    sessions: HashMap<HardwareAddress, [u8; 32]>,
    pending: HashMap<HardwareAddress, PendingExchange>,
    exchange_timeout: Duration,
}

impl SecureChannelService {
    /// Creates the service with a fresh local secret. Starts disabled.
    pub fn new(
        transceiver: Arc<LinkTransceiver>,
        sink: Arc<dyn EventSink>,
        config: &Config,
    ) -> Self {
        // The secret itself is only ever used through its public token.
        let mut local_secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut local_secret);
        let public_token = to_hex(&Sha256::digest(local_secret));
        Self {
            transceiver,
            sink,
            enabled: false,
            public_token,
            sessions: HashMap::new(),
            pending: HashMap::new(),
            exchange_timeout: config.key_exchange_timeout,
        }
    }

    /// Turns the security layer on.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Turns the security layer off, clearing every session key and
    /// pending exchange.
    pub fn disable(&mut self) {
        self.enabled = false;
        self.sessions.clear();
        self.pending.clear();
    }

    /// Whether the security layer is on.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether an active session key exists for `peer`.
    pub fn has_session(&self, peer: HardwareAddress) -> bool {
        self.enabled && self.sessions.contains_key(&peer)
    }

    /// Number of installed session keys.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of outstanding outbound handshakes.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Starts a key exchange with `peer`. The layer must be enabled.
    pub fn initiate_exchange(&mut self, peer: HardwareAddress) -> Result<()> {
        if !self.enabled {
            return Err(ErrorKind::SecurityDisabled);
        }
        self.sweep_expired();
        let mut token_bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut token_bytes);
        let exchange_token = to_hex(&token_bytes);

        let message = SecurityMessage::KeyRequest {
            public_token: self.public_token.clone(),
            exchange_token: exchange_token.clone(),
            sender_mac: self.transceiver.local_address().to_string(),
            timestamp: unix_now(),
        };
        self.send(peer, &message)?;

        self.pending
            .insert(peer, PendingExchange { exchange_token, started: Instant::now() });
        Ok(())
    }

    /// Handles one inbound security message.
    ///
    /// Messages arriving while the layer is disabled are absorbed with a
    /// log line; handshake and authentication failures are surfaced to the
    /// user sink, never to the peer.
    pub fn handle_message(&mut self, source: HardwareAddress, message: SecurityMessage) {
        if !self.enabled {
            tracing::info!("security message from {} ignored: layer disabled", source);
            return;
        }
        self.sweep_expired();

        match message {
            SecurityMessage::KeyRequest { public_token, exchange_token, .. } => {
                self.handle_key_request(source, public_token, exchange_token);
            }
            SecurityMessage::KeyResponse { public_token, exchange_token, .. } => {
                self.handle_key_response(source, public_token, exchange_token);
            }
            SecurityMessage::Protected { nonce, encrypted, mac, .. } => {
                match self.open_protected(source, &nonce, &encrypted, &mac) {
                    Ok(text) => {
                        self.sink.display_message(&format!("{} (secure)", source), &text)
                    }
                    Err(e) => self.sink.report_error("secure message", &e.to_string()),
                }
            }
        }
    }

    /// Encrypts `text` for `peer`, returning the wire string.
    pub fn encrypt(&self, peer: HardwareAddress, text: &str) -> Result<String> {
        let session_key = self
            .sessions
            .get(&peer)
            .ok_or_else(|| ErrorKind::MissingSessionKey(peer.to_string()))?;

        let mut nonce = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut nonce);

        let mut ciphertext = text.as_bytes().to_vec();
        apply_keystream(session_key, &nonce, &mut ciphertext);

        let mut mac = HmacSha256::new_from_slice(&hmac_key(session_key))
            .map_err(|_| ErrorKind::AuthenticationFailed)?;
        mac.update(&nonce);
        mac.update(&ciphertext);
        let tag = mac.finalize().into_bytes();

        let message = SecurityMessage::Protected {
            nonce: base64::encode(nonce),
            encrypted: base64::encode(&ciphertext),
            mac: base64::encode(tag),
            sender_mac: self.transceiver.local_address().to_string(),
            timestamp: unix_now(),
        };
        message.to_wire()
    }

    fn handle_key_request(
        &mut self,
        source: HardwareAddress,
        remote_token: String,
        exchange_token: String,
    ) {
        // The requester is the initiator, so its token leads.
        let session_key = derive_session_key(&remote_token, &self.public_token, &exchange_token);
        self.sessions.insert(source, session_key);

        let response = SecurityMessage::KeyResponse {
            public_token: self.public_token.clone(),
            exchange_token,
            sender_mac: self.transceiver.local_address().to_string(),
            timestamp: unix_now(),
        };
        if let Err(e) = self.send(source, &response) {
            self.sink.report_error("key exchange", &e.to_string());
            return;
        }
        self.sink
            .display_message("Security", &format!("secure channel established with {}", source));
    }

    fn handle_key_response(
        &mut self,
        source: HardwareAddress,
        remote_token: String,
        exchange_token: String,
    ) {
        let matches = self
            .pending
            .get(&source)
            .map(|p| p.exchange_token == exchange_token)
            .unwrap_or(false);
        if !matches {
            tracing::warn!("unsolicited or stale key response from {}", source);
            self.sink.report_error(
                "key exchange",
                &ErrorKind::UnexpectedExchange(source.to_string()).to_string(),
            );
            return;
        }
        self.pending.remove(&source);

        // We initiated, so our token leads.
        let session_key = derive_session_key(&self.public_token, &remote_token, &exchange_token);
        self.sessions.insert(source, session_key);
        self.sink
            .display_message("Security", &format!("secure channel established with {}", source));
    }

    fn open_protected(
        &self,
        source: HardwareAddress,
        nonce_b64: &str,
        encrypted_b64: &str,
        mac_b64: &str,
    ) -> Result<String> {
        let session_key = self
            .sessions
            .get(&source)
            .ok_or_else(|| ErrorKind::MissingSessionKey(source.to_string()))?;

        let nonce = decode_b64(nonce_b64)?;
        let mut ciphertext = decode_b64(encrypted_b64)?;
        let tag = decode_b64(mac_b64)?;

        let mut mac = HmacSha256::new_from_slice(&hmac_key(session_key))
            .map_err(|_| ErrorKind::AuthenticationFailed)?;
        mac.update(&nonce);
        mac.update(&ciphertext);
        mac.verify_slice(&tag).map_err(|_| ErrorKind::AuthenticationFailed)?;

        apply_keystream(session_key, &nonce, &mut ciphertext);
        String::from_utf8(ciphertext)
            .map_err(|_| ErrorKind::MalformedControl("decrypted text is not UTF-8".into()))
    }

    fn send(&self, peer: HardwareAddress, message: &SecurityMessage) -> Result<()> {
        let wire = message.to_wire()?;
        self.transceiver.send_message(peer, FrameType::Text, wire.into_bytes(), false)
    }

    fn sweep_expired(&mut self) {
        let timeout = self.exchange_timeout;
        self.pending.retain(|peer, exchange| {
            let expired = exchange.started.elapsed() > timeout;
            if expired {
                tracing::info!("key exchange with {} expired", peer);
            }
            !expired
        });
    }
}

/// `SHA256(initiator_token || responder_token || exchange_token)` over the
/// hex token strings; both sides order the tokens the same way.
fn derive_session_key(
    initiator_token: &str,
    responder_token: &str,
    exchange_token: &str,
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(initiator_token.as_bytes());
    hasher.update(responder_token.as_bytes());
    hasher.update(exchange_token.as_bytes());
    hasher.finalize().into()
}

/// XOR with `SHA256(session_key || nonce)` repeated to message length.
fn apply_keystream(session_key: &[u8; 32], nonce: &[u8], data: &mut [u8]) {
    let mut hasher = Sha256::new();
    hasher.update(session_key);
    hasher.update(nonce);
    let key = hasher.finalize();
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= key[i % key.len()];
    }
}

fn hmac_key(session_key: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(session_key);
    hasher.update(b"hmac");
    hasher.finalize().into()
}

fn decode_b64(value: &str) -> Result<Vec<u8>> {
    base64::decode(value).map_err(|e| ErrorKind::MalformedControl(e.to_string()))
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}
