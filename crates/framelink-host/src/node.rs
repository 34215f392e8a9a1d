//! The engine: socket, services, and dispatch.
//!
//! A `Node` owns the transceiver and the four services. The caller's
//! thread drives `poll_events`, which drains the decoded-frame queue and
//! routes each payload: text is classified once into its tagged variant,
//! `File` payloads go to the file service. Service state is only touched
//! from this thread, so the services need no locking of their own.

use std::{path::Path, sync::Arc};

use framelink_core::{
    config::Config,
    error::Result,
    hwaddr::HardwareAddress,
    sink::EventSink,
    transport::LinkSocket,
};
use framelink_link::{
    statistics::StatisticsSnapshot,
    transceiver::{DecodedFrame, LinkTransceiver},
};
use framelink_protocol::{
    control::{self, InboundText},
    frame::FrameType,
};

use crate::{
    discovery::{DiscoveryService, PeerRecord},
    files::FileTransferService,
    folders::FolderTransferService,
    secure::SecureChannelService,
};

/// The link-layer messaging engine.
pub struct Node {
    transceiver: Arc<LinkTransceiver>,
    sink: Arc<dyn EventSink>,
    discovery: DiscoveryService,
    secure: SecureChannelService,
    files: FileTransferService,
    folders: FolderTransferService,
    link_failure_reported: bool,
}

impl Node {
    /// Opens a node on the named interface with a raw packet socket.
    ///
    /// Requires the privilege to open raw sockets; failing that, the error
    /// is the caller's signal to exit non-zero.
    #[cfg(target_os = "linux")]
    pub fn open(interface: &str, sink: Arc<dyn EventSink>, config: Config) -> Result<Self> {
        let resolved = framelink_utilities::interface_by_name(interface)?;
        let socket = framelink_link::raw_socket::RawPacketSocket::open(
            &resolved.name,
            resolved.address,
            config.receive_timeout,
        )?;
        Self::with_socket(Arc::new(socket), sink, config)
    }

    /// Builds a node over any link socket and starts its threads.
    /// This is the constructor tests use with an in-memory link.
    pub fn with_socket(
        socket: Arc<dyn LinkSocket>,
        sink: Arc<dyn EventSink>,
        config: Config,
    ) -> Result<Self> {
        let transceiver = Arc::new(LinkTransceiver::new(socket, &config));
        let mut discovery =
            DiscoveryService::new(Arc::clone(&transceiver), Arc::clone(&sink), &config);
        discovery.start();

        Ok(Self {
            secure: SecureChannelService::new(
                Arc::clone(&transceiver),
                Arc::clone(&sink),
                &config,
            ),
            files: FileTransferService::new(Arc::clone(&transceiver), Arc::clone(&sink), &config),
            folders: FolderTransferService::new(
                Arc::clone(&transceiver),
                Arc::clone(&sink),
                &config,
            ),
            discovery,
            sink,
            transceiver,
            link_failure_reported: false,
        })
    }

    /// This node's hardware address.
    pub fn local_address(&self) -> HardwareAddress {
        self.transceiver.local_address()
    }

    /// Drains the decoded-frame queue, dispatching every pending message.
    /// Call this periodically from the front-end loop.
    pub fn poll_events(&mut self) {
        while let Some(frame) = self.transceiver.try_recv() {
            self.dispatch(frame);
        }
        if self.transceiver.link_failed() && !self.link_failure_reported {
            self.link_failure_reported = true;
            self.sink.report_error("link", "receive loop stopped on a socket error; session ended");
        }
    }

    /// Sends a chat message. Unicast to a peer with an active session key
    /// is encrypted; broadcast always goes in clear.
    pub fn send_text(&mut self, destination: HardwareAddress, text: &str) -> Result<()> {
        let wire = if !destination.is_broadcast() && self.secure.has_session(destination) {
            self.secure.encrypt(destination, text)?
        } else {
            text.to_owned()
        };
        self.transceiver.send_message(destination, FrameType::Text, wire.into_bytes(), true)
    }

    /// Sends a file as one logical `File` message.
    pub fn send_file(&self, path: &Path, destination: HardwareAddress) -> Result<()> {
        self.files.send_file(path, destination)
    }

    /// Sends a directory tree file by file.
    pub fn send_folder(&self, path: &Path, destination: HardwareAddress) -> Result<()> {
        self.folders.send_folder(&self.files, path, destination)
    }

    /// Broadcasts a request for immediate peer heartbeats.
    pub fn request_discovery(&self) {
        self.discovery.send_request();
    }

    /// Starts a key exchange with `peer`.
    pub fn initiate_key_exchange(&mut self, peer: HardwareAddress) -> Result<()> {
        self.secure.initiate_exchange(peer)
    }

    /// Turns the security layer on.
    pub fn enable_security(&mut self) {
        self.secure.enable();
    }

    /// Turns the security layer off, clearing all session keys.
    pub fn disable_security(&mut self) {
        self.secure.disable();
    }

    /// Whether an active session key exists for `peer`.
    pub fn has_secure_channel(&self, peer: HardwareAddress) -> bool {
        self.secure.has_session(peer)
    }

    /// Snapshot of the live-peer table.
    pub fn peers(&self) -> Vec<PeerRecord> {
        self.discovery.peers()
    }

    /// Point-in-time link statistics.
    pub fn statistics(&self) -> StatisticsSnapshot {
        self.transceiver.statistics_snapshot()
    }

    /// Resets the statistics counters.
    pub fn reset_statistics(&self) {
        self.transceiver.statistics().reset();
    }

    /// Stops the discovery and receive threads and closes the socket.
    pub fn shutdown(&mut self) {
        self.discovery.stop();
        self.transceiver.shutdown();
    }

    fn dispatch(&mut self, frame: DecodedFrame) {
        match frame.frame_type {
            FrameType::Text => self.dispatch_text(frame.source, frame.payload),
            FrameType::File => {
                self.transceiver.statistics().note_user_message_received();
                self.files.handle_payload(frame.source, &frame.payload, &mut self.folders);
            }
        }
    }

    fn dispatch_text(&mut self, source: HardwareAddress, payload: Vec<u8>) {
        let text = match String::from_utf8(payload) {
            Ok(text) => text,
            Err(_) => {
                self.sink.report_error("dispatch", "text payload is not UTF-8");
                return;
            }
        };
        match control::classify(&text) {
            Ok(InboundText::Chat(text)) => {
                self.transceiver.statistics().note_user_message_received();
                self.sink.display_message(&source.to_string(), &text);
            }
            Ok(InboundText::Discovery(message)) => self.discovery.handle_message(source, message),
            Ok(InboundText::Security(message)) => self.secure.handle_message(source, message),
            Ok(InboundText::Folder(control)) => self.folders.handle_control(source, control),
            Err(e) => self.sink.report_error("dispatch", &e.to_string()),
        }
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.shutdown();
    }
}
