//! In-memory link transport for tests.
//!
//! A pair of sockets wired back to back: every frame one side sends shows
//! up raw on the other side's queue, like two hosts on one segment. No
//! address filtering happens here; that is the transceiver's job.

use std::{
    collections::VecDeque,
    io,
    sync::{Arc, Condvar, Mutex},
    time::Duration,
};

use framelink_core::{hwaddr::HardwareAddress, transport::LinkSocket};

#[derive(Default)]
struct Wire {
    frames: Mutex<VecDeque<Vec<u8>>>,
    arrival: Condvar,
}

impl Wire {
    fn push(&self, frame: Vec<u8>) {
        self.frames.lock().unwrap_or_else(|e| e.into_inner()).push_back(frame);
        self.arrival.notify_one();
    }

    fn pop(&self, timeout: Duration) -> Option<Vec<u8>> {
        let mut frames = self.frames.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(frame) = frames.pop_front() {
            return Some(frame);
        }
        let (mut frames, _) = self
            .arrival
            .wait_timeout(frames, timeout)
            .unwrap_or_else(|e| e.into_inner());
        frames.pop_front()
    }
}

/// One end of an in-memory link.
pub struct MemoryLinkSocket {
    address: HardwareAddress,
    inbound: Arc<Wire>,
    outbound: Arc<Wire>,
    read_timeout: Duration,
}

/// Creates two sockets wired back to back.
pub fn memory_link_pair(
    a: HardwareAddress,
    b: HardwareAddress,
    read_timeout: Duration,
) -> (MemoryLinkSocket, MemoryLinkSocket) {
    let a_to_b = Arc::new(Wire::default());
    let b_to_a = Arc::new(Wire::default());
    (
        MemoryLinkSocket {
            address: a,
            inbound: Arc::clone(&b_to_a),
            outbound: Arc::clone(&a_to_b),
            read_timeout,
        },
        MemoryLinkSocket { address: b, inbound: a_to_b, outbound: b_to_a, read_timeout },
    )
}

impl LinkSocket for MemoryLinkSocket {
    fn send_frame(&self, frame: &[u8]) -> io::Result<usize> {
        self.outbound.push(frame.to_vec());
        Ok(frame.len())
    }

    fn recv_frame(&self, buffer: &mut [u8]) -> io::Result<usize> {
        match self.inbound.pop(self.read_timeout) {
            Some(frame) => {
                let len = frame.len().min(buffer.len());
                buffer[..len].copy_from_slice(&frame[..len]);
                Ok(len)
            }
            None => Err(io::Error::new(io::ErrorKind::TimedOut, "no frame within timeout")),
        }
    }

    fn local_address(&self) -> HardwareAddress {
        self.address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last: u8) -> HardwareAddress {
        HardwareAddress::new([0x02, 0, 0, 0, 0, last])
    }

    #[test]
    fn test_frames_cross_the_pair() {
        let (a, b) = memory_link_pair(addr(1), addr(2), Duration::from_millis(50));
        a.send_frame(b"frame one").unwrap();

        let mut buffer = [0u8; 64];
        let len = b.recv_frame(&mut buffer).unwrap();
        assert_eq!(&buffer[..len], b"frame one");
    }

    #[test]
    fn test_recv_times_out_when_idle() {
        let (_a, b) = memory_link_pair(addr(1), addr(2), Duration::from_millis(10));
        let mut buffer = [0u8; 64];
        let err = b.recv_frame(&mut buffer).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn test_each_side_reports_its_address() {
        let (a, b) = memory_link_pair(addr(1), addr(2), Duration::from_millis(10));
        assert_eq!(a.local_address(), addr(1));
        assert_eq!(b.local_address(), addr(2));
    }
}
