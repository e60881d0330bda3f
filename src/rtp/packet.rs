//! Owned RTP packet
//!
//! The receive loop reuses one scratch buffer for every datagram, so each
//! accepted datagram is copied into its own allocation before it reaches a
//! depacketizer. Nothing downstream ever borrows from the scratch buffer.

use bytes::Bytes;

use crate::error::PacketError;

use super::header::{RtpHeader, RTP_HEADER_SIZE};

/// A received datagram with its parsed fixed header
#[derive(Debug, Clone)]
pub struct RtpPacket {
    /// Parsed header fields
    pub header: RtpHeader,
    /// Full datagram bytes (header included)
    pub data: Bytes,
}

impl RtpPacket {
    /// Parse the header and copy the datagram into an owned buffer
    pub fn from_datagram(datagram: &[u8]) -> Result<Self, PacketError> {
        let header = RtpHeader::parse(datagram)?;

        let mut owned = Vec::new();
        owned
            .try_reserve_exact(datagram.len())
            .map_err(|_| PacketError::AllocationFailure(datagram.len()))?;
        owned.extend_from_slice(datagram);

        Ok(Self {
            header,
            data: Bytes::from(owned),
        })
    }

    /// Build a packet from an already-owned buffer
    pub fn from_bytes(data: Bytes) -> Result<Self, PacketError> {
        let header = RtpHeader::parse(&data)?;
        Ok(Self { header, data })
    }

    /// Bytes after the fixed header
    pub fn payload(&self) -> &[u8] {
        &self.data[RTP_HEADER_SIZE..]
    }

    /// Length of the payload
    pub fn payload_len(&self) -> usize {
        self.data.len() - RTP_HEADER_SIZE
    }

    /// Total datagram length
    pub fn len(&self) -> usize {
        self.data.len()
    }
}
