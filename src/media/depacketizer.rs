//! Payload type dispatch
//!
//! One [`Depacketizer`] per stream routes each packet to the codec selected
//! by its payload type and reports whether a frame completed.

use std::time::Instant;

use crate::error::PacketError;
use crate::rtp::{Codec, PayloadMap, RtpPacket};

use super::frame::Frame;
use super::hevc::HevcDepacketizer;
use super::{generic, opus};

/// Result of feeding one packet
#[derive(Debug)]
pub enum Outcome {
    /// A frame is complete
    Ready(Frame),
    /// Packet consumed, frame still incomplete
    NotReady,
}

impl Outcome {
    pub fn into_frame(self) -> Option<Frame> {
        match self {
            Outcome::Ready(frame) => Some(frame),
            Outcome::NotReady => None,
        }
    }
}

/// Per-stream depacketizer state
#[derive(Debug)]
pub struct Depacketizer {
    payload_map: PayloadMap,
    hevc: HevcDepacketizer,
}

impl Depacketizer {
    pub fn new(payload_map: PayloadMap, hevc: HevcDepacketizer) -> Self {
        Self { payload_map, hevc }
    }

    /// Feed one packet
    pub fn push(&mut self, packet: RtpPacket) -> Result<Outcome, PacketError> {
        self.push_at(packet, Instant::now())
    }

    /// Feed one packet, using `now` for assembly age checks
    pub fn push_at(&mut self, packet: RtpPacket, now: Instant) -> Result<Outcome, PacketError> {
        // Age out a stalled assembly even when only other codecs are arriving
        self.hevc.expire(now);

        match self.payload_map.resolve(packet.header.payload_type)? {
            Codec::Generic => generic::depacketize(packet),
            Codec::Opus => opus::depacketize(packet),
            Codec::Hevc => self.hevc.push_at(packet, now),
        }
    }

    /// Codec mapped to a payload type
    pub fn codec_for(&self, payload_type: u8) -> Option<Codec> {
        self.payload_map.get(payload_type)
    }

    /// Assemblies dropped without an error (superseded or timed out)
    pub fn take_discarded(&mut self) -> u64 {
        self.hevc.take_discarded()
    }

    /// Drop all in-flight reassembly state
    pub fn reset(&mut self) {
        self.hevc.reset();
    }
}

impl Default for Depacketizer {
    fn default() -> Self {
        Self::new(PayloadMap::default(), HevcDepacketizer::default())
    }
}
