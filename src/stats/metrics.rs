//! Statistics for a receive stream

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Live counters updated by the receive task
#[derive(Debug)]
pub struct ReceiverStats {
    started_at: Mutex<Instant>,
    packets_received: AtomicU64,
    bytes_received: AtomicU64,
    packets_dropped: AtomicU64,
    fragments_lost: AtomicU64,
    frames_delivered: AtomicU64,
}

impl ReceiverStats {
    pub fn new() -> Self {
        Self {
            started_at: Mutex::new(Instant::now()),
            packets_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            packets_dropped: AtomicU64::new(0),
            fragments_lost: AtomicU64::new(0),
            frames_delivered: AtomicU64::new(0),
        }
    }

    /// Restart the clock used for `duration` and `bitrate`
    pub fn mark_started(&self) {
        *self.started_at.lock() = Instant::now();
    }

    pub fn record_packet(&self, bytes: usize) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.packets_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lost_frames(&self, count: u64) {
        if count > 0 {
            self.fragments_lost.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub fn record_delivered(&self) {
        self.frames_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            duration: self.started_at.lock().elapsed(),
            packets_received: self.packets_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            packets_dropped: self.packets_dropped.load(Ordering::Relaxed),
            fragments_lost: self.fragments_lost.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
        }
    }
}

impl Default for ReceiverStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`ReceiverStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Time since the stream started
    pub duration: Duration,
    /// Datagrams read from the socket
    pub packets_received: u64,
    /// Bytes read from the socket
    pub bytes_received: u64,
    /// Datagrams rejected by parsing or depacketizing
    pub packets_dropped: u64,
    /// Fragmented frames that never completed
    pub fragments_lost: u64,
    /// Frames handed to the application
    pub frames_delivered: u64,
}

impl StatsSnapshot {
    /// Receive bitrate in bits per second
    pub fn bitrate(&self) -> u64 {
        let secs = self.duration.as_secs();
        if secs > 0 {
            (self.bytes_received * 8) / secs
        } else {
            0
        }
    }
}
