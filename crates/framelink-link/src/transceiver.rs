//! The link transceiver.
//!
//! Owns the link socket and the receive thread. Outbound messages are
//! fragmented, CSMA-coordinated, and written frame by frame; inbound
//! packets are range-checked, EtherType- and destination-filtered,
//! CRC-verified, reassembled, and enqueued on a bounded queue that the
//! dispatcher drains from its own thread.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Instant,
};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use framelink_core::{
    config::Config,
    constants::ETHERNET_HEADER_SIZE,
    error::Result,
    hwaddr::HardwareAddress,
    shared::SharedBytes,
    transport::LinkSocket,
};
use framelink_protocol::{
    frame::{Frame, FrameType},
    frame_codec::{FrameDecoder, FrameEncoder},
};

use crate::{
    csma::CsmaChannel, fragment::Fragmenter, reassembly::ReassemblyTable,
    statistics::LinkStatistics,
};

/// A fully reassembled inbound message, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Sender's hardware address.
    pub source: HardwareAddress,
    /// Payload kind.
    pub frame_type: FrameType,
    /// Complete payload bytes.
    pub payload: Vec<u8>,
}

/// Owns the link socket, the CSMA channel, and the receive thread.
pub struct LinkTransceiver {
    socket: Arc<dyn LinkSocket>,
    channel: Arc<CsmaChannel>,
    fragmenter: Fragmenter,
    reassembly: Arc<ReassemblyTable>,
    statistics: Arc<LinkStatistics>,
    frames: Receiver<DecodedFrame>,
    stop: Arc<AtomicBool>,
    failed: Arc<AtomicBool>,
    receive_handle: std::sync::Mutex<Option<JoinHandle<()>>>,
    inter_fragment_delay: std::time::Duration,
    local: HardwareAddress,
}

impl std::fmt::Debug for LinkTransceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkTransceiver").field("local", &self.local).finish()
    }
}

impl LinkTransceiver {
    /// Starts a transceiver over the given socket and spawns its receive
    /// loop.
    pub fn new(socket: Arc<dyn LinkSocket>, config: &Config) -> Self {
        let local = socket.local_address();
        let reassembly = Arc::new(ReassemblyTable::new(
            config.text_reassembly_ttl,
            config.file_reassembly_ttl,
        ));
        let statistics = Arc::new(LinkStatistics::default());
        let stop = Arc::new(AtomicBool::new(false));
        let failed = Arc::new(AtomicBool::new(false));
        let (sender, receiver) = bounded(config.receive_queue_capacity);

        let receive_handle = spawn_receive_loop(
            Arc::clone(&socket),
            local,
            Arc::clone(&reassembly),
            Arc::clone(&statistics),
            Arc::clone(&stop),
            Arc::clone(&failed),
            sender,
        );

        Self {
            socket,
            channel: Arc::new(CsmaChannel::new(config)),
            fragmenter: Fragmenter::new(config.fragment_payload_size),
            reassembly,
            statistics,
            frames: receiver,
            stop,
            failed,
            receive_handle: std::sync::Mutex::new(Some(receive_handle)),
            inter_fragment_delay: config.inter_fragment_delay,
            local,
        }
    }

    /// The hardware address this transceiver sends from.
    pub fn local_address(&self) -> HardwareAddress {
        self.local
    }

    /// Sends one logical message, fragmenting as needed.
    ///
    /// Frames go out in index order; the CSMA channel is sensed before each
    /// one, and multi-fragment sends pause briefly between frames.
    /// `user_message` marks chat and file sends for the statistics.
    pub fn send_message(
        &self,
        destination: HardwareAddress,
        frame_type: FrameType,
        payload: Vec<u8>,
        user_message: bool,
    ) -> Result<()> {
        let frames =
            self.fragmenter.split(destination, self.local, frame_type, SharedBytes::from_vec(payload));
        if frames.len() > 1 {
            self.statistics.note_fragmented_message_sent();
        }

        let last = frames.len() - 1;
        for (index, frame) in frames.iter().enumerate() {
            let encoded = FrameEncoder::encode(frame);
            {
                let _guard = self.channel.acquire()?;
                self.socket.send_frame(&encoded)?;
            }
            self.statistics.note_frame_sent();
            if index < last {
                thread::sleep(self.inter_fragment_delay);
            }
        }

        if user_message {
            self.statistics.note_user_message_sent();
        }
        Ok(())
    }

    /// Takes the next decoded frame off the queue, if any.
    pub fn try_recv(&self) -> Option<DecodedFrame> {
        self.frames.try_recv().ok()
    }

    /// True once the receive loop died on a socket error (as opposed to an
    /// orderly shutdown). The session is over; the caller should tell the
    /// user.
    pub fn link_failed(&self) -> bool {
        self.failed.load(Ordering::Relaxed)
    }

    /// Shared statistics counters.
    pub fn statistics(&self) -> &Arc<LinkStatistics> {
        &self.statistics
    }

    /// Point-in-time statistics including pending reassemblies.
    pub fn statistics_snapshot(&self) -> crate::statistics::StatisticsSnapshot {
        self.statistics.snapshot(self.reassembly.pending())
    }

    /// Signals the receive loop to stop and joins it. Idempotent.
    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::Relaxed);
        let handle = self.receive_handle.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

impl Drop for LinkTransceiver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_receive_loop(
    socket: Arc<dyn LinkSocket>,
    local: HardwareAddress,
    reassembly: Arc<ReassemblyTable>,
    statistics: Arc<LinkStatistics>,
    stop: Arc<AtomicBool>,
    failed: Arc<AtomicBool>,
    sender: Sender<DecodedFrame>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut buffer = vec![0u8; 4096];
        while !stop.load(Ordering::Relaxed) {
            let len = match socket.recv_frame(&mut buffer) {
                Ok(len) => len,
                Err(e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    continue;
                }
                Err(e) => {
                    if !stop.load(Ordering::Relaxed) {
                        tracing::error!("receive loop terminated by socket error: {}", e);
                        failed.store(true, Ordering::Relaxed);
                    }
                    break;
                }
            };

            if len < ETHERNET_HEADER_SIZE {
                statistics.note_frame_dropped();
                continue;
            }

            let frame = match FrameDecoder::decode(&buffer[..len]) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::debug!("dropping undecodable frame: {}", e);
                    statistics.note_frame_dropped();
                    continue;
                }
            };

            if !frame.destination().is_broadcast() && frame.destination() != local {
                statistics.note_frame_dropped();
                continue;
            }

            statistics.note_frame_received();

            let decoded = if frame.is_fragment() {
                match reassembly.insert(&frame, Instant::now()) {
                    Some(payload) => DecodedFrame {
                        source: frame.source(),
                        frame_type: frame.frame_type(),
                        payload,
                    },
                    None => continue,
                }
            } else {
                DecodedFrame {
                    source: frame.source(),
                    frame_type: frame.frame_type(),
                    payload: frame.payload().to_vec(),
                }
            };

            match sender.try_send(decoded) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::warn!("decoded-frame queue full, dropping newest");
                    statistics.note_queue_overflow();
                }
                Err(TrySendError::Disconnected(_)) => break,
            }
        }
    })
}
