//! H.265/HEVC depacketizing (RFC 7798)
//!
//! Every HEVC RTP payload starts with a 2-byte payload header that has the
//! same layout as a NAL unit header:
//!
//! ```text
//! +---------------+---------------+
//! |0|1|2|3|4|5|6|7|0|1|2|3|4|5|6|7|
//! +-+-------------+-----------+-----+
//! |F|   Type    |  LayerId  | TID |
//! +-------------+-----------------+
//! ```
//!
//! Type 49 marks a fragmentation unit (FU). The FU header follows:
//!
//! ```text
//! +---------------+
//! |0|1|2|3|4|5|6|7|
//! +-+-+-+-+-+-+-+-+
//! |S|E|  FuType   |
//! +---------------+
//! ```
//!
//! Fragments of one NAL unit are accumulated until the end fragment arrives.
//! Only one assembly is open at a time. Loss is detected from sequence
//! numbers alone: any gap discards the assembly.

use std::time::{Duration, Instant};

use bytes::{Buf, Bytes};

use crate::error::PacketError;
use crate::rtp::{RtpPacket, RTP_HEADER_SIZE};

use super::depacketizer::Outcome;
use super::frame::{Frame, FrameKind};

/// Size of the HEVC payload header
pub const PAYLOAD_HEADER_SIZE: usize = 2;

/// Size of the FU header
pub const FU_HEADER_SIZE: usize = 1;

/// Default upper bound for a reassembled NAL unit (8MB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 8 * 1024 * 1024;

/// HEVC NAL unit type (6 bits)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NalType(u8);

impl NalType {
    pub const IDR_W_RADL: NalType = NalType(19);
    pub const IDR_N_LP: NalType = NalType(20);
    pub const CRA: NalType = NalType(21);
    pub const VPS: NalType = NalType(32);
    pub const SPS: NalType = NalType(33);
    pub const PPS: NalType = NalType(34);
    /// Aggregation packet
    pub const AP: NalType = NalType(48);
    /// Fragmentation unit
    pub const FU: NalType = NalType(49);
    /// Payload content information
    pub const PACI: NalType = NalType(50);

    pub fn new(value: u8) -> Self {
        NalType(value & 0x3F)
    }

    /// Extract the type from the first byte of a NAL/payload header
    pub fn from_header_byte(b: u8) -> Self {
        NalType((b >> 1) & 0x3F)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// Intra random access point (BLA, IDR, CRA and reserved IRAP types)
    pub fn is_irap(&self) -> bool {
        (16..=23).contains(&self.0)
    }

    pub fn is_parameter_set(&self) -> bool {
        matches!(*self, NalType::VPS | NalType::SPS | NalType::PPS)
    }

    pub fn is_aggregation(&self) -> bool {
        *self == NalType::AP
    }

    pub fn is_fragmentation_unit(&self) -> bool {
        *self == NalType::FU
    }

    pub fn is_paci(&self) -> bool {
        *self == NalType::PACI
    }
}

/// Parsed HEVC payload header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadHeader {
    /// Forbidden zero bit
    pub forbidden: bool,
    /// Payload type (NAL type, or 48/49/50 for AP/FU/PACI)
    pub nal_type: NalType,
    /// nuh_layer_id
    pub layer_id: u8,
    /// nuh_temporal_id_plus1
    pub tid: u8,
    raw: [u8; 2],
}

impl PayloadHeader {
    pub fn parse(payload: &[u8]) -> Result<Self, PacketError> {
        if payload.len() < PAYLOAD_HEADER_SIZE {
            return Err(PacketError::MalformedPacket {
                len: payload.len(),
                needed: PAYLOAD_HEADER_SIZE,
            });
        }

        let b0 = payload[0];
        let b1 = payload[1];

        Ok(PayloadHeader {
            forbidden: b0 & 0x80 != 0,
            nal_type: NalType::from_header_byte(b0),
            layer_id: ((b0 & 0x01) << 5) | (b1 >> 3),
            tid: b1 & 0x07,
            raw: [b0, b1],
        })
    }

    /// Rebuild the original NAL header for a fragmented unit.
    ///
    /// F, LayerId and TID come from this header; the type comes from the FU.
    pub fn nal_header_for(&self, fu: &FuHeader) -> [u8; 2] {
        [(self.raw[0] & 0x81) | (fu.nal_type.value() << 1), self.raw[1]]
    }
}

/// Parsed FU header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuHeader {
    /// First fragment of the NAL unit
    pub start: bool,
    /// Last fragment of the NAL unit
    pub end: bool,
    /// Type of the fragmented NAL unit
    pub nal_type: NalType,
}

impl FuHeader {
    pub fn from_byte(b: u8) -> Self {
        FuHeader {
            start: b & 0x80 != 0,
            end: b & 0x40 != 0,
            nal_type: NalType::new(b & 0x3F),
        }
    }
}

/// Iterator over the NAL units in an aggregation packet payload.
///
/// Each unit is prefixed by a 16-bit big-endian size. Iteration stops at the
/// first truncated unit.
pub struct AggregatedUnits<'a> {
    data: &'a [u8],
}

impl<'a> AggregatedUnits<'a> {
    /// `payload` starts with the 2-byte payload header
    pub fn new(payload: &'a [u8]) -> Self {
        Self {
            data: payload.get(PAYLOAD_HEADER_SIZE..).unwrap_or(&[]),
        }
    }
}

impl<'a> Iterator for AggregatedUnits<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.len() < 2 {
            return None;
        }

        let mut size_bytes = &self.data[..2];
        let len = size_bytes.get_u16() as usize;
        if 2 + len > self.data.len() {
            self.data = &[];
            return None;
        }

        let unit = &self.data[2..2 + len];
        self.data = &self.data[2 + len..];
        Some(unit)
    }
}

/// In-flight reassembly of one fragmented NAL unit
#[derive(Debug)]
struct FragmentContext {
    ssrc: u32,
    timestamp: u32,
    nal_header: [u8; 2],
    /// NAL header followed by fragment payloads in arrival order
    accumulated: Vec<u8>,
    expected_next_seq: u16,
    fragments: u32,
    opened_at: Instant,
}

impl FragmentContext {
    fn matches(&self, ssrc: u32, timestamp: u32) -> bool {
        self.ssrc == ssrc && self.timestamp == timestamp
    }
}

/// HEVC depacketizer with fragmentation unit reassembly
#[derive(Debug)]
pub struct HevcDepacketizer {
    context: Option<FragmentContext>,
    max_frame_size: usize,
    fragment_timeout: Option<Duration>,
    /// Assemblies dropped before completing, whatever the cause
    discarded: u64,
}

impl HevcDepacketizer {
    pub fn new() -> Self {
        Self {
            context: None,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            fragment_timeout: None,
            discarded: 0,
        }
    }

    /// Limit the size of a reassembled NAL unit
    pub fn with_max_frame_size(mut self, max: usize) -> Self {
        self.max_frame_size = max;
        self
    }

    /// Discard assemblies older than `timeout`
    pub fn with_fragment_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fragment_timeout = timeout;
        self
    }

    /// Whether a fragmented NAL unit is being assembled
    pub fn has_open_context(&self) -> bool {
        self.context.is_some()
    }

    /// Number of assemblies dropped since the last call
    pub fn take_discarded(&mut self) -> u64 {
        std::mem::take(&mut self.discarded)
    }

    /// Drop any open assembly
    pub fn reset(&mut self) {
        if let Some(ctx) = self.context.take() {
            tracing::debug!(
                ssrc = ctx.ssrc,
                timestamp = ctx.timestamp,
                fragments = ctx.fragments,
                "Discarding open HEVC assembly"
            );
        }
    }

    /// Process one packet
    pub fn push(&mut self, packet: RtpPacket) -> Result<Outcome, PacketError> {
        self.push_at(packet, Instant::now())
    }

    /// Process one packet, using `now` for assembly age checks
    pub fn push_at(&mut self, packet: RtpPacket, now: Instant) -> Result<Outcome, PacketError> {
        self.expire(now);

        let payload = packet.payload();
        if payload.is_empty() {
            return Err(PacketError::EmptyPayload);
        }

        let header = PayloadHeader::parse(payload)?;
        if !header.nal_type.is_fragmentation_unit() {
            // Single NAL unit, aggregation packet or PACI: deliver as-is
            let frame = Frame::from_packet(packet, FrameKind::Hevc, RTP_HEADER_SIZE);
            return Ok(Outcome::Ready(frame));
        }

        if payload.len() < PAYLOAD_HEADER_SIZE + FU_HEADER_SIZE {
            return Err(PacketError::MalformedPacket {
                len: payload.len(),
                needed: PAYLOAD_HEADER_SIZE + FU_HEADER_SIZE,
            });
        }

        let fu = FuHeader::from_byte(payload[PAYLOAD_HEADER_SIZE]);
        let fragment = &payload[PAYLOAD_HEADER_SIZE + FU_HEADER_SIZE..];
        let nal_header = header.nal_header_for(&fu);

        match (fu.start, fu.end) {
            (true, true) => {
                let nal = self.build_single(nal_header, fragment)?;
                Ok(Outcome::Ready(Frame::assembled(&packet.header, nal)))
            }
            (true, false) => {
                self.open(&packet, nal_header, fragment, now)?;
                Ok(Outcome::NotReady)
            }
            (false, end) => {
                self.append(&packet, fragment)?;
                if !end {
                    return Ok(Outcome::NotReady);
                }

                match self.context.take() {
                    Some(ctx) => {
                        tracing::trace!(
                            ssrc = ctx.ssrc,
                            timestamp = ctx.timestamp,
                            nal_type = NalType::from_header_byte(ctx.nal_header[0]).value(),
                            fragments = ctx.fragments,
                            size = ctx.accumulated.len(),
                            "HEVC NAL unit reassembled"
                        );
                        let nal = Bytes::from(ctx.accumulated);
                        Ok(Outcome::Ready(Frame::assembled(&packet.header, nal)))
                    }
                    None => Err(PacketError::OrphanFragment),
                }
            }
        }
    }

    /// Drop the open assembly if it is older than the fragment timeout
    pub fn expire(&mut self, now: Instant) {
        let Some(timeout) = self.fragment_timeout else {
            return;
        };

        let expired = self
            .context
            .as_ref()
            .map(|ctx| now.saturating_duration_since(ctx.opened_at) > timeout)
            .unwrap_or(false);

        if expired {
            self.discard("HEVC assembly timed out, frame dropped");
        }
    }

    /// Drop the open assembly and count it as lost
    fn discard(&mut self, reason: &'static str) {
        if let Some(ctx) = self.context.take() {
            self.discarded += 1;
            tracing::warn!(
                ssrc = ctx.ssrc,
                timestamp = ctx.timestamp,
                fragments = ctx.fragments,
                "{}",
                reason
            );
        }
    }

    fn open(
        &mut self,
        packet: &RtpPacket,
        nal_header: [u8; 2],
        fragment: &[u8],
        now: Instant,
    ) -> Result<(), PacketError> {
        self.discard("New start fragment before end fragment, frame dropped");

        let size = PAYLOAD_HEADER_SIZE + fragment.len();
        self.check_size(size)?;

        let mut accumulated = Vec::new();
        accumulated
            .try_reserve(size)
            .map_err(|_| PacketError::AllocationFailure(size))?;
        accumulated.extend_from_slice(&nal_header);
        accumulated.extend_from_slice(fragment);

        self.context = Some(FragmentContext {
            ssrc: packet.header.ssrc,
            timestamp: packet.header.timestamp,
            nal_header,
            accumulated,
            expected_next_seq: packet.header.sequence.wrapping_add(1),
            fragments: 1,
            opened_at: now,
        });
        Ok(())
    }

    fn append(&mut self, packet: &RtpPacket, fragment: &[u8]) -> Result<(), PacketError> {
        let header = &packet.header;

        let Some(ctx) = self.context.as_mut() else {
            return Err(PacketError::OrphanFragment);
        };

        if !ctx.matches(header.ssrc, header.timestamp) {
            self.discard("Fragment for another frame before end fragment, frame dropped");
            return Err(PacketError::OrphanFragment);
        }

        if header.sequence != ctx.expected_next_seq {
            let expected = ctx.expected_next_seq;
            self.discard("Fragment out of sequence, frame dropped");
            return Err(PacketError::FragmentSequence {
                expected,
                received: header.sequence,
            });
        }

        let size = ctx.accumulated.len() + fragment.len();
        if size > self.max_frame_size {
            self.discard("HEVC assembly too large, frame dropped");
            return Err(PacketError::FrameTooLarge {
                size,
                limit: self.max_frame_size,
            });
        }

        if ctx.accumulated.try_reserve(fragment.len()).is_err() {
            self.discard("HEVC assembly allocation failed, frame dropped");
            return Err(PacketError::AllocationFailure(size));
        }

        ctx.accumulated.extend_from_slice(fragment);
        ctx.expected_next_seq = header.sequence.wrapping_add(1);
        ctx.fragments += 1;
        Ok(())
    }

    fn build_single(&self, nal_header: [u8; 2], fragment: &[u8]) -> Result<Bytes, PacketError> {
        let size = PAYLOAD_HEADER_SIZE + fragment.len();
        self.check_size(size)?;

        let mut nal = Vec::new();
        nal.try_reserve_exact(size)
            .map_err(|_| PacketError::AllocationFailure(size))?;
        nal.extend_from_slice(&nal_header);
        nal.extend_from_slice(fragment);
        Ok(Bytes::from(nal))
    }

    fn check_size(&self, size: usize) -> Result<(), PacketError> {
        if size > self.max_frame_size {
            return Err(PacketError::FrameTooLarge {
                size,
                limit: self.max_frame_size,
            });
        }
        Ok(())
    }
}

impl Default for HevcDepacketizer {
    fn default() -> Self {
        Self::new()
    }
}
