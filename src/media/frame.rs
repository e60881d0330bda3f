//! Delivered media frames
//!
//! A [`Frame`] owns its bytes. Single-packet frames keep the whole datagram
//! (RTP header included) and expose header/payload as ranges into it.
//! Reassembled HEVC frames hold the rebuilt NAL unit and have no RTP header
//! bytes.
//!
//! `raw` is an immutable `Bytes`; frames are handed from the receive loop to
//! the consumer by move.

use std::ops::Range;

use bytes::Bytes;

use crate::rtp::{RtpHeader, RtpPacket, RTP_HEADER_SIZE};

use super::hevc::{AggregatedUnits, NalType};
use super::opus::OpusToc;

/// Which depacketizer produced a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Verbatim RTP payload
    Generic,
    /// One Opus packet
    Opus,
    /// One HEVC packet delivered as-is (single NAL unit or aggregation packet)
    Hevc,
    /// NAL unit rebuilt from fragmentation units
    HevcAssembled,
}

/// A complete frame ready for the application
#[derive(Debug)]
pub struct Frame {
    /// RTP timestamp of the packet that produced or completed the frame
    pub timestamp: u32,
    /// Synchronization source
    pub ssrc: u32,
    /// Sequence number of the packet that produced or completed the frame
    pub sequence: u16,
    /// Marker bit of that packet
    pub marker: bool,
    /// Payload type of that packet
    pub payload_type: u8,
    kind: FrameKind,
    raw: Bytes,
    header: Range<usize>,
    payload: Range<usize>,
}

impl Frame {
    /// Frame backed by a single packet.
    ///
    /// `payload_start` is the offset of the codec payload within the datagram
    /// (12 plus any codec-specific header). Clamped to the datagram length.
    pub fn from_packet(packet: RtpPacket, kind: FrameKind, payload_start: usize) -> Self {
        let len = packet.data.len();
        let payload_start = payload_start.clamp(RTP_HEADER_SIZE.min(len), len);

        Self::with_header(
            &packet.header,
            kind,
            packet.data,
            0..RTP_HEADER_SIZE.min(len),
            payload_start..len,
        )
    }

    /// Frame holding a reassembled NAL unit; the whole buffer is payload
    pub fn assembled(header: &RtpHeader, nal_unit: Bytes) -> Self {
        let len = nal_unit.len();
        Self::with_header(header, FrameKind::HevcAssembled, nal_unit, 0..0, 0..len)
    }

    fn with_header(
        header: &RtpHeader,
        kind: FrameKind,
        raw: Bytes,
        header_range: Range<usize>,
        payload: Range<usize>,
    ) -> Self {
        debug_assert!(header_range.end <= raw.len());
        debug_assert!(payload.start <= payload.end && payload.end <= raw.len());

        Self {
            timestamp: header.timestamp,
            ssrc: header.ssrc,
            sequence: header.sequence,
            marker: header.marker,
            payload_type: header.payload_type,
            kind,
            raw,
            header: header_range,
            payload,
        }
    }

    /// Depacketizer that produced this frame
    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    /// All bytes owned by the frame
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// RTP header bytes (empty for reassembled frames)
    pub fn header_bytes(&self) -> &[u8] {
        &self.raw[self.header.clone()]
    }

    /// Media payload
    pub fn payload(&self) -> &[u8] {
        &self.raw[self.payload.clone()]
    }

    /// Media payload as a shared `Bytes` slice
    pub fn payload_bytes(&self) -> Bytes {
        self.raw.slice(self.payload.clone())
    }

    /// Payload length in bytes
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Total bytes owned by the frame
    pub fn total_len(&self) -> usize {
        self.raw.len()
    }

    /// Release the frame, keeping its bytes
    pub fn into_raw(self) -> Bytes {
        self.raw
    }

    /// NAL unit type of an HEVC frame
    pub fn nal_type(&self) -> Option<NalType> {
        match self.kind {
            FrameKind::Hevc | FrameKind::HevcAssembled => {
                self.payload().first().map(|b| NalType::from_header_byte(*b))
            }
            _ => None,
        }
    }

    /// Whether this is an HEVC IRAP picture
    pub fn is_keyframe(&self) -> bool {
        self.nal_type().map(|t| t.is_irap()).unwrap_or(false)
    }

    /// NAL units carried in an HEVC aggregation packet
    pub fn aggregated_units(&self) -> Option<AggregatedUnits<'_>> {
        match self.nal_type() {
            Some(t) if t.is_aggregation() => Some(AggregatedUnits::new(self.payload())),
            _ => None,
        }
    }

    /// TOC byte of an Opus frame
    pub fn opus_toc(&self) -> Option<OpusToc> {
        match self.kind {
            FrameKind::Opus => self.payload().first().map(|b| OpusToc::from_byte(*b)),
            _ => None,
        }
    }
}
