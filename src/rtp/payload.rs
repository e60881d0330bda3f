//! Payload type mapping
//!
//! Each payload type selects one depacketizer. Types with no entry are
//! rejected with `UnsupportedPayloadType`.

use crate::error::PacketError;

/// Depacketizer selected for a payload type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    /// Payload passed through verbatim
    Generic,
    /// Opus audio (RFC 7587)
    Opus,
    /// H.265/HEVC video (RFC 7798)
    Hevc,
}

impl Codec {
    pub fn name(&self) -> &'static str {
        match self {
            Codec::Generic => "generic",
            Codec::Opus => "opus",
            Codec::Hevc => "hevc",
        }
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Default payload type for generic pass-through
pub const DEFAULT_GENERIC_PT: u8 = 0;
/// Default dynamic payload type for HEVC
pub const DEFAULT_HEVC_PT: u8 = 96;
/// Default dynamic payload type for Opus
pub const DEFAULT_OPUS_PT: u8 = 97;

/// Table from 7-bit payload type to codec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadMap {
    entries: [Option<Codec>; 128],
}

impl PayloadMap {
    /// Create a map with no entries
    pub fn empty() -> Self {
        Self {
            entries: [None; 128],
        }
    }

    /// Map a payload type to a codec, replacing any existing entry
    pub fn insert(&mut self, payload_type: u8, codec: Codec) {
        self.entries[(payload_type & 0x7F) as usize] = Some(codec);
    }

    /// Remove the entry for a payload type
    pub fn remove(&mut self, payload_type: u8) {
        self.entries[(payload_type & 0x7F) as usize] = None;
    }

    /// Look up the codec for a payload type
    pub fn get(&self, payload_type: u8) -> Option<Codec> {
        self.entries[(payload_type & 0x7F) as usize]
    }

    /// Look up the codec, failing with `UnsupportedPayloadType`
    pub fn resolve(&self, payload_type: u8) -> Result<Codec, PacketError> {
        self.get(payload_type)
            .ok_or(PacketError::UnsupportedPayloadType(payload_type))
    }

    /// Iterate over mapped `(payload_type, codec)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (u8, Codec)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(pt, codec)| codec.map(|c| (pt as u8, c)))
    }
}

impl Default for PayloadMap {
    fn default() -> Self {
        let mut map = Self::empty();
        map.insert(DEFAULT_GENERIC_PT, Codec::Generic);
        map.insert(DEFAULT_HEVC_PT, Codec::Hevc);
        map.insert(DEFAULT_OPUS_PT, Codec::Opus);
        map
    }
}
