//! RTP fixed header parsing
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |V=2|P|X|  CC   |M|     PT      |       sequence number         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                           timestamp                           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |           synchronization source (SSRC) identifier            |
//! +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
//! ```
//!
//! The CSRC list and header extensions are not parsed. The payload always
//! starts at byte 12, even when `CC` or `X` are set.

use bytes::{Buf, BufMut};

use crate::error::PacketError;

/// Size of the fixed RTP header
pub const RTP_HEADER_SIZE: usize = 12;

/// Parsed RTP fixed header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpHeader {
    /// Protocol version (2 for RFC 3550). Not validated.
    pub version: u8,
    /// Marker bit
    pub marker: bool,
    /// Payload type (7 bits)
    pub payload_type: u8,
    /// Sequence number
    pub sequence: u16,
    /// Media timestamp
    pub timestamp: u32,
    /// Synchronization source
    pub ssrc: u32,
}

impl RtpHeader {
    /// Parse the fixed header from the start of a datagram.
    ///
    /// Fails with `MalformedPacket` if fewer than 12 bytes are given.
    pub fn parse(data: &[u8]) -> Result<Self, PacketError> {
        if data.len() < RTP_HEADER_SIZE {
            return Err(PacketError::MalformedPacket {
                len: data.len(),
                needed: RTP_HEADER_SIZE,
            });
        }

        let mut buf = &data[..RTP_HEADER_SIZE];
        let b0 = buf.get_u8();
        let b1 = buf.get_u8();

        Ok(RtpHeader {
            version: b0 >> 6,
            marker: b1 & 0x80 != 0,
            payload_type: b1 & 0x7F,
            sequence: buf.get_u16(),
            timestamp: buf.get_u32(),
            ssrc: buf.get_u32(),
        })
    }

    /// Offset of the payload within the datagram
    pub fn payload_offset(&self) -> usize {
        RTP_HEADER_SIZE
    }

    /// Serialize the fixed header (no CSRCs, no extension)
    pub fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(self.version << 6);
        buf.put_u8(((self.marker as u8) << 7) | (self.payload_type & 0x7F));
        buf.put_u16(self.sequence);
        buf.put_u32(self.timestamp);
        buf.put_u32(self.ssrc);
    }

    /// Build a version 2 header
    pub fn new(payload_type: u8, sequence: u16, timestamp: u32, ssrc: u32) -> Self {
        Self {
            version: 2,
            marker: false,
            payload_type: payload_type & 0x7F,
            sequence,
            timestamp,
            ssrc,
        }
    }

    /// Set the marker bit
    pub fn with_marker(mut self, marker: bool) -> Self {
        self.marker = marker;
        self
    }
}
