//! Generic pass-through depacketizing
//!
//! The RTP payload is delivered verbatim, one frame per packet.

use crate::error::PacketError;
use crate::rtp::{RtpPacket, RTP_HEADER_SIZE};

use super::depacketizer::Outcome;
use super::frame::{Frame, FrameKind};

/// Turn one RTP packet into a frame
pub fn depacketize(packet: RtpPacket) -> Result<Outcome, PacketError> {
    if packet.payload_len() == 0 {
        return Err(PacketError::EmptyPayload);
    }

    Ok(Outcome::Ready(Frame::from_packet(
        packet,
        FrameKind::Generic,
        RTP_HEADER_SIZE,
    )))
}
