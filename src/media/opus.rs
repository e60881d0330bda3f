//! Opus depacketizing (RFC 7587)
//!
//! Opus has no RTP payload header: each RTP payload is exactly one Opus
//! packet, so every packet is a complete frame.
//!
//! The first byte of an Opus packet is the TOC byte (RFC 6716 section 3.1):
//! ```text
//! +-+-+-+-+-+-+-+-+
//! | config  |s| c |
//! +-+-+-+-+-+-+-+-+
//! ```

use crate::error::PacketError;
use crate::rtp::{RtpPacket, RTP_HEADER_SIZE};

use super::depacketizer::Outcome;
use super::frame::{Frame, FrameKind};

/// Size of the codec-specific header preceding the Opus packet
pub const OPUS_HEADER_SIZE: usize = 0;

/// Coding mode selected by the TOC config
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpusMode {
    Silk,
    Hybrid,
    Celt,
}

/// Audio bandwidth selected by the TOC config
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpusBandwidth {
    /// Narrowband (4kHz)
    Narrowband,
    /// Mediumband (6kHz)
    Mediumband,
    /// Wideband (8kHz)
    Wideband,
    /// Super wideband (12kHz)
    SuperWideband,
    /// Fullband (20kHz)
    Fullband,
}

impl OpusBandwidth {
    /// Sampling rate matching this bandwidth
    pub fn sampling_rate(&self) -> u32 {
        match self {
            Self::Narrowband => 8000,
            Self::Mediumband => 12000,
            Self::Wideband => 16000,
            Self::SuperWideband => 24000,
            Self::Fullband => 48000,
        }
    }
}

/// Parsed TOC byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpusToc {
    /// Configuration number (0-31)
    pub config: u8,
    /// Stereo flag
    pub stereo: bool,
    /// Frame count code (0-3)
    pub frame_count_code: u8,
}

impl OpusToc {
    pub fn from_byte(b: u8) -> Self {
        Self {
            config: b >> 3,
            stereo: b & 0x04 != 0,
            frame_count_code: b & 0x03,
        }
    }

    pub fn mode(&self) -> OpusMode {
        match self.config {
            0..=11 => OpusMode::Silk,
            12..=15 => OpusMode::Hybrid,
            _ => OpusMode::Celt,
        }
    }

    pub fn bandwidth(&self) -> OpusBandwidth {
        match self.config {
            0..=3 | 16..=19 => OpusBandwidth::Narrowband,
            4..=7 => OpusBandwidth::Mediumband,
            8..=11 | 20..=23 => OpusBandwidth::Wideband,
            12..=13 | 24..=27 => OpusBandwidth::SuperWideband,
            _ => OpusBandwidth::Fullband,
        }
    }

    /// Duration of one Opus frame in microseconds
    pub fn frame_duration_us(&self) -> u32 {
        match self.mode() {
            OpusMode::Silk => [10_000, 20_000, 40_000, 60_000][(self.config % 4) as usize],
            OpusMode::Hybrid => [10_000, 20_000][(self.config % 2) as usize],
            OpusMode::Celt => [2_500, 5_000, 10_000, 20_000][(self.config % 4) as usize],
        }
    }

    /// Number of frames in the packet, when fixed by the frame count code.
    ///
    /// Code 3 carries an explicit count in the next byte; `None` is returned.
    pub fn frame_count(&self) -> Option<u8> {
        match self.frame_count_code {
            0 => Some(1),
            1 | 2 => Some(2),
            _ => None,
        }
    }
}

/// Turn one Opus RTP packet into a frame
pub fn depacketize(packet: RtpPacket) -> Result<Outcome, PacketError> {
    let payload_start = RTP_HEADER_SIZE + OPUS_HEADER_SIZE;
    if packet.len() <= payload_start {
        return Err(PacketError::EmptyPayload);
    }

    Ok(Outcome::Ready(Frame::from_packet(
        packet,
        FrameKind::Opus,
        payload_start,
    )))
}
