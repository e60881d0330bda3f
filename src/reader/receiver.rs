//! Receive loop
//!
//! A single task owns the socket, the scratch buffer and all reassembly
//! state. Only the delivery queue/handler, the stats counters and the
//! active flag are shared with the rest of the process.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::watch;

use crate::delivery::{Delivery, FrameQueue};
use crate::error::PacketError;
use crate::media::hevc::HevcDepacketizer;
use crate::media::{Depacketizer, Outcome};
use crate::rtp::{RtpPacket, RTP_HEADER_SIZE};
use crate::stats::ReceiverStats;

use super::config::ReaderConfig;

/// State owned by the receive task
pub(crate) struct Receiver {
    socket: UdpSocket,
    local_addr: SocketAddr,
    buffer: Vec<u8>,
    depacketizer: Depacketizer,
    delivery: Delivery,
    queue: Arc<FrameQueue>,
    stats: Arc<ReceiverStats>,
    active: Arc<AtomicBool>,
    shutdown: watch::Receiver<bool>,
}

impl Receiver {
    pub(crate) fn new(
        socket: UdpSocket,
        local_addr: SocketAddr,
        config: &ReaderConfig,
        queue: Arc<FrameQueue>,
        stats: Arc<ReceiverStats>,
        active: Arc<AtomicBool>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let hevc = HevcDepacketizer::new()
            .with_max_frame_size(config.max_frame_size)
            .with_fragment_timeout(config.fragment_timeout);

        Self {
            socket,
            local_addr,
            buffer: vec![0u8; config.recv_buffer_size],
            depacketizer: Depacketizer::new(config.payload_map.clone(), hevc),
            delivery: Delivery::new(config.delivery.clone(), Arc::clone(&queue)),
            queue,
            stats,
            active,
            shutdown,
        }
    }

    /// Run until stopped or the socket fails
    pub(crate) async fn run(mut self) {
        tracing::info!(addr = %self.local_addr, "RTP receive loop started");

        while self.active.load(Ordering::Acquire) {
            let result = tokio::select! {
                _ = self.shutdown.changed() => break,
                result = self.socket.recv_from(&mut self.buffer) => result,
            };

            match result {
                Ok((len, peer)) => self.handle_datagram(len, peer),
                Err(e) => {
                    tracing::error!(addr = %self.local_addr, error = %e, "Socket receive failed");
                    break;
                }
            }
        }

        self.active.store(false, Ordering::Release);
        self.depacketizer.reset();
        self.queue.close();

        let stats = self.stats.snapshot();
        tracing::info!(
            addr = %self.local_addr,
            packets = stats.packets_received,
            dropped = stats.packets_dropped,
            frames = stats.frames_delivered,
            "RTP receive loop stopped"
        );
    }

    fn handle_datagram(&mut self, len: usize, peer: SocketAddr) {
        self.stats.record_packet(len);

        if len == self.buffer.len() {
            tracing::trace!(peer = %peer, len = len, "Datagram filled receive buffer, may be truncated");
        }

        if len < RTP_HEADER_SIZE {
            self.stats.record_dropped();
            tracing::debug!(peer = %peer, len = len, "Datagram too short for RTP header");
            return;
        }

        let packet = match RtpPacket::from_datagram(&self.buffer[..len]) {
            Ok(packet) => packet,
            Err(e) => {
                self.reject(&e, peer);
                return;
            }
        };

        let sequence = packet.header.sequence;
        let result = self.depacketizer.push(packet);
        // Lost frames are logged and counted where the assembly is dropped
        self.stats
            .record_lost_frames(self.depacketizer.take_discarded());

        match result {
            Ok(Outcome::Ready(frame)) => {
                // Nothing is delivered once the stream has been stopped
                if !self.active.load(Ordering::Acquire) {
                    return;
                }
                if self.delivery.deliver(frame) {
                    self.stats.record_delivered();
                } else {
                    self.stats.record_dropped();
                    tracing::debug!(sequence = sequence, "Frame queue closed, frame dropped");
                }
            }
            Ok(Outcome::NotReady) => {
                tracing::trace!(sequence = sequence, "Fragment buffered");
            }
            Err(e) => self.reject(&e, peer),
        }
    }

    fn reject(&self, error: &PacketError, peer: SocketAddr) {
        self.stats.record_dropped();

        match error {
            PacketError::UnsupportedPayloadType(pt) => {
                tracing::warn!(peer = %peer, payload_type = pt, "Unsupported payload type, packet dropped");
            }
            e => {
                tracing::debug!(peer = %peer, error = %e, "Packet dropped");
            }
        }
    }
}
