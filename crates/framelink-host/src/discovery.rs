//! Peer discovery: heartbeats and the live-peer table.
//!
//! A background thread broadcasts a heartbeat every interval and sweeps
//! peers that have gone quiet. Inbound discovery messages are handled on
//! the dispatch thread; the peer table sits behind a mutex with short
//! critical sections because both threads touch it.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use framelink_core::{config::Config, hwaddr::HardwareAddress, sink::EventSink};
use framelink_link::transceiver::LinkTransceiver;
use framelink_protocol::{control::DiscoveryMessage, frame::FrameType};

use crate::clock::unix_now;

/// Capabilities announced in this node's heartbeats.
const LOCAL_CAPABILITIES: [&str; 3] = ["text", "file", "broadcast"];

/// A discovered neighbor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRecord {
    /// The peer's hardware address.
    pub address: HardwareAddress,
    /// Hostname from the peer's last heartbeat.
    pub hostname: String,
    /// When the last heartbeat arrived.
    pub last_seen: Instant,
    /// Capability labels from the peer's last heartbeat.
    pub capabilities: Vec<String>,
}

/// Broadcasts heartbeats and maintains the live-peer table.
pub struct DiscoveryService {
    transceiver: Arc<LinkTransceiver>,
    sink: Arc<dyn EventSink>,
    peers: Arc<Mutex<HashMap<HardwareAddress, PeerRecord>>>,
    peer_timeout: Duration,
    heartbeat_interval: Duration,
    hostname: String,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DiscoveryService {
    /// Creates the service without starting its heartbeat thread.
    pub fn new(
        transceiver: Arc<LinkTransceiver>,
        sink: Arc<dyn EventSink>,
        config: &Config,
    ) -> Self {
        let hostname = config.hostname.clone().unwrap_or_else(|| {
            hostname::get()
                .ok()
                .and_then(|name| name.into_string().ok())
                .unwrap_or_else(|| "framelink-node".to_owned())
        });
        Self {
            transceiver,
            sink,
            peers: Arc::new(Mutex::new(HashMap::new())),
            peer_timeout: config.peer_timeout,
            heartbeat_interval: config.heartbeat_interval,
            hostname,
            stop: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Starts the heartbeat thread. A heartbeat goes out immediately,
    /// then every interval, with expired peers swept on each tick.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }
        let transceiver = Arc::clone(&self.transceiver);
        let peers = Arc::clone(&self.peers);
        let stop = Arc::clone(&self.stop);
        let hostname = self.hostname.clone();
        let interval = self.heartbeat_interval;
        let peer_timeout = self.peer_timeout;

        self.handle = Some(thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                send_heartbeat(&transceiver, &hostname);
                sweep_expired(&peers, peer_timeout);

                // Sleep in one-second ticks so shutdown stays prompt.
                let mut remaining = interval;
                while !remaining.is_zero() && !stop.load(Ordering::Relaxed) {
                    let tick = remaining.min(Duration::from_secs(1));
                    thread::sleep(tick);
                    remaining -= tick;
                }
            }
        }));
    }

    /// Signals the heartbeat thread to stop and joins it.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Handles one inbound discovery message.
    pub fn handle_message(&self, source: HardwareAddress, message: DiscoveryMessage) {
        if source == self.transceiver.local_address() {
            return;
        }
        match message {
            DiscoveryMessage::Heartbeat { hostname, capabilities, .. } => {
                self.upsert_peer(source, hostname, capabilities);
            }
            DiscoveryMessage::Request { .. } => {
                send_heartbeat(&self.transceiver, &self.hostname);
            }
        }
    }

    /// Broadcasts a request for immediate heartbeats from all peers.
    pub fn send_request(&self) {
        let message = DiscoveryMessage::Request {
            mac: self.transceiver.local_address().to_string(),
            timestamp: unix_now(),
        };
        broadcast(&self.transceiver, &message);
    }

    /// Snapshot of the live-peer table.
    pub fn peers(&self) -> Vec<PeerRecord> {
        let peers = self.peers.lock().unwrap_or_else(|e| e.into_inner());
        peers.values().cloned().collect()
    }

    /// Number of live peers.
    pub fn peer_count(&self) -> usize {
        self.peers.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn upsert_peer(&self, source: HardwareAddress, hostname: String, capabilities: Vec<String>) {
        let mut peers = self.peers.lock().unwrap_or_else(|e| e.into_inner());
        sweep_locked(&mut peers, self.peer_timeout);

        let record = PeerRecord {
            address: source,
            hostname: hostname.clone(),
            last_seen: Instant::now(),
            capabilities,
        };
        let is_new = peers.insert(source, record).is_none();
        drop(peers);

        if is_new {
            self.sink.notify_peer_found(source, &hostname);
        }
    }
}

impl Drop for DiscoveryService {
    fn drop(&mut self) {
        self.stop();
    }
}

fn send_heartbeat(transceiver: &LinkTransceiver, hostname: &str) {
    let message = DiscoveryMessage::Heartbeat {
        mac: transceiver.local_address().to_string(),
        hostname: hostname.to_owned(),
        timestamp: unix_now(),
        capabilities: LOCAL_CAPABILITIES.iter().map(|s| s.to_string()).collect(),
    };
    broadcast(transceiver, &message);
}

fn broadcast(transceiver: &LinkTransceiver, message: &DiscoveryMessage) {
    let wire = match message.to_wire() {
        Ok(wire) => wire,
        Err(e) => {
            tracing::warn!("could not render discovery message: {}", e);
            return;
        }
    };
    if let Err(e) = transceiver.send_message(
        HardwareAddress::BROADCAST,
        FrameType::Text,
        wire.into_bytes(),
        false,
    ) {
        tracing::warn!("discovery broadcast failed: {}", e);
    }
}

fn sweep_expired(
    peers: &Arc<Mutex<HashMap<HardwareAddress, PeerRecord>>>,
    timeout: Duration,
) {
    let mut peers = peers.lock().unwrap_or_else(|e| e.into_inner());
    sweep_locked(&mut peers, timeout);
}

fn sweep_locked(peers: &mut HashMap<HardwareAddress, PeerRecord>, timeout: Duration) {
    let now = Instant::now();
    peers.retain(|address, record| {
        let expired = now.duration_since(record.last_seen) > timeout;
        if expired {
            tracing::info!("peer {} ({}) timed out", address, record.hostname);
        }
        !expired
    });
}

#[cfg(test)]
mod tests {
    use framelink_core::sink::NullSink;
    use framelink_link::memory_link::memory_link_pair;

    use super::*;

    fn addr(last: u8) -> HardwareAddress {
        HardwareAddress::new([0x02, 0, 0, 0, 0, last])
    }

    fn service() -> DiscoveryService {
        let mut config = Config::default();
        config.receive_timeout = Duration::from_millis(10);
        config.hostname = Some("local-node".into());
        let (socket, _far_end) = memory_link_pair(addr(1), addr(2), config.receive_timeout);
        let transceiver = Arc::new(LinkTransceiver::new(Arc::new(socket), &config));
        DiscoveryService::new(transceiver, Arc::new(NullSink), &config)
    }

    fn heartbeat(mac: HardwareAddress, hostname: &str) -> DiscoveryMessage {
        DiscoveryMessage::Heartbeat {
            mac: mac.to_string(),
            hostname: hostname.into(),
            timestamp: unix_now(),
            capabilities: vec!["text".into()],
        }
    }

    #[test]
    fn test_heartbeat_registers_peer() {
        let service = service();
        service.handle_message(addr(7), heartbeat(addr(7), "nodeA"));

        let peers = service.peers();
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].address, addr(7));
        assert_eq!(peers[0].hostname, "nodeA");
    }

    #[test]
    fn test_own_heartbeat_ignored() {
        let service = service();
        service.handle_message(addr(1), heartbeat(addr(1), "self"));
        assert_eq!(service.peer_count(), 0);
    }

    #[test]
    fn test_repeat_heartbeat_refreshes_not_duplicates() {
        let service = service();
        service.handle_message(addr(7), heartbeat(addr(7), "nodeA"));
        service.handle_message(addr(7), heartbeat(addr(7), "nodeA-renamed"));

        let peers = service.peers();
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].hostname, "nodeA-renamed");
    }

    #[test]
    fn test_expired_peer_swept() {
        let mut service = service();
        service.peer_timeout = Duration::from_millis(10);
        service.handle_message(addr(7), heartbeat(addr(7), "nodeA"));
        assert_eq!(service.peer_count(), 1);

        thread::sleep(Duration::from_millis(30));
        sweep_expired(&service.peers, service.peer_timeout);
        assert_eq!(service.peer_count(), 0);
    }

    #[test]
    fn test_new_peer_notification_fires_once() {
        use crate::events::{ChannelSink, NodeEvent};

        let mut config = Config::default();
        config.receive_timeout = Duration::from_millis(10);
        config.hostname = Some("local-node".into());
        let (socket, _far_end) = memory_link_pair(addr(1), addr(2), config.receive_timeout);
        let transceiver = Arc::new(LinkTransceiver::new(Arc::new(socket), &config));
        let (sink, events) = ChannelSink::new();
        let service = DiscoveryService::new(transceiver, Arc::new(sink), &config);

        service.handle_message(addr(7), heartbeat(addr(7), "nodeA"));
        service.handle_message(addr(7), heartbeat(addr(7), "nodeA"));

        assert_eq!(
            events.try_recv().unwrap(),
            NodeEvent::PeerFound { address: addr(7), hostname: "nodeA".into() }
        );
        assert!(events.try_recv().is_err());
    }
}
