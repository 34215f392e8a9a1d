//! CSMA-style transmit coordination.
//!
//! Coordinates in-process senders only: a shared busy flag models the
//! carrier, and contended senders back off with binary exponential random
//! delays. On a switched network the hardware resolves real collisions; on
//! a hub it would not.

use std::{
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use framelink_core::{
    config::Config,
    error::{ErrorKind, Result},
};
use rand::Rng;

/// The shared transmit channel: busy flag plus backoff policy.
#[derive(Debug)]
pub struct CsmaChannel {
    busy: Mutex<bool>,
    slot: Duration,
    max_attempts: u8,
    max_exponent: u32,
}

impl CsmaChannel {
    /// Creates a channel from the configured backoff parameters.
    pub fn new(config: &Config) -> Self {
        Self {
            busy: Mutex::new(false),
            slot: config.csma_slot,
            max_attempts: config.csma_max_attempts,
            max_exponent: config.csma_max_exponent,
        }
    }

    /// Senses the channel and claims it, backing off while busy.
    ///
    /// The returned guard keeps the channel busy until dropped. Fails with
    /// `ChannelContended` after `max_attempts` sensing rounds.
    pub fn acquire(self: &Arc<Self>) -> Result<CsmaGuard> {
        let mut attempt: u8 = 0;
        while attempt < self.max_attempts {
            attempt += 1;
            {
                let mut busy = self.busy.lock().unwrap_or_else(|e| e.into_inner());
                if !*busy {
                    *busy = true;
                    return Ok(CsmaGuard { channel: Arc::clone(self) });
                }
            }
            let delay = self.backoff_delay(attempt);
            tracing::trace!("channel busy, attempt {} backing off {:?}", attempt, delay);
            thread::sleep(delay);
        }
        Err(ErrorKind::ChannelContended { attempts: attempt })
    }

    /// Draws a random backoff of `[0, 2^min(attempt, cap) - 1]` slots.
    fn backoff_delay(&self, attempt: u8) -> Duration {
        let k = (attempt as u32).min(self.max_exponent);
        let slots = rand::thread_rng().gen_range(0..(1u64 << k));
        self.slot * slots as u32
    }

    fn release(&self) {
        *self.busy.lock().unwrap_or_else(|e| e.into_inner()) = false;
    }

    #[cfg(test)]
    fn force_busy(&self) {
        *self.busy.lock().unwrap_or_else(|e| e.into_inner()) = true;
    }
}

/// Holds the channel busy for the duration of one frame transmission.
#[derive(Debug)]
pub struct CsmaGuard {
    channel: Arc<CsmaChannel>,
}

impl Drop for CsmaGuard {
    fn drop(&mut self) {
        self.channel.release();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    fn fast_channel(max_attempts: u8) -> Arc<CsmaChannel> {
        let mut config = Config::default();
        config.csma_max_attempts = max_attempts;
        config.csma_slot = Duration::from_micros(1);
        Arc::new(CsmaChannel::new(&config))
    }

    #[test]
    fn test_idle_channel_acquired_immediately() {
        let channel = fast_channel(16);
        let guard = channel.acquire().unwrap();
        drop(guard);
        assert!(channel.acquire().is_ok());
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let channel = fast_channel(1);
        {
            let _guard = channel.acquire().unwrap();
            // A second sender with a single attempt sees the channel busy.
            assert!(channel.acquire().is_err());
        }
        assert!(channel.acquire().is_ok());
    }

    #[test]
    fn test_contended_channel_fails_after_max_attempts() {
        let channel = fast_channel(16);
        channel.force_busy();

        let err = channel.acquire().unwrap_err();
        match err {
            ErrorKind::ChannelContended { attempts } => assert_eq!(attempts, 16),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_backoff_within_slot_bounds() {
        let channel = fast_channel(16);
        for attempt in 1..=16u8 {
            let k = (attempt as u32).min(10);
            let max = channel.slot * ((1u64 << k) - 1) as u32;
            for _ in 0..32 {
                assert!(channel.backoff_delay(attempt) <= max);
            }
        }
    }

    #[test]
    fn test_concurrent_senders_serialize() {
        let channel = fast_channel(16);
        let mut handles = Vec::new();
        for _ in 0..4 {
            let channel = Arc::clone(&channel);
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    let _guard = channel.acquire().unwrap();
                }
            }));
        }
        let deadline = Instant::now() + Duration::from_secs(10);
        for handle in handles {
            assert!(Instant::now() < deadline, "senders deadlocked");
            handle.join().unwrap();
        }
    }
}
