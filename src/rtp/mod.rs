//! RTP wire format
//!
//! This module provides:
//! - Fixed-header parsing (RFC 3550, 12 bytes, no CSRC/extension support)
//! - Owned packets copied out of the receive buffer
//! - Payload type to depacketizer mapping

pub mod header;
pub mod packet;
pub mod payload;

pub use header::{RtpHeader, RTP_HEADER_SIZE};
pub use packet::RtpPacket;
pub use payload::{Codec, PayloadMap};
