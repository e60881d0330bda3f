//! Error types
//!
//! Only [`Error::Io`] is fatal to a running stream. Everything wrapped in
//! [`PacketError`] is scoped to a single datagram: the receive loop logs it,
//! drops the packet and moves on.

use std::io;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// Socket bind or receive failure
    Io(io::Error),
    /// Per-packet processing failure
    Packet(PacketError),
    /// Operation is only valid before the stream is started or stopped
    AlreadyStarted,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "Socket error: {}", e),
            Error::Packet(e) => write!(f, "Packet error: {}", e),
            Error::AlreadyStarted => write!(f, "Stream already started or stopped"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Packet(e) => Some(e),
            Error::AlreadyStarted => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<PacketError> for Error {
    fn from(e: PacketError) -> Self {
        Error::Packet(e)
    }
}

/// Errors scoped to a single received datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    /// Not enough bytes for the header being parsed
    MalformedPacket { len: usize, needed: usize },
    /// Payload type has no depacketizer mapped
    UnsupportedPayloadType(u8),
    /// Header-only packet
    EmptyPayload,
    /// Fragment arrived out of sequence; the open assembly was discarded
    FragmentSequence { expected: u16, received: u16 },
    /// Continuation fragment with no matching assembly open
    OrphanFragment,
    /// Assembly grew past the configured frame size limit
    FrameTooLarge { size: usize, limit: usize },
    /// Buffer reservation failed
    AllocationFailure(usize),
}

impl PacketError {
    /// Whether this error always means a frame was lost.
    ///
    /// `OrphanFragment` is excluded: it is also reported for every remaining
    /// fragment of a frame that was already dropped.
    pub fn is_frame_loss(&self) -> bool {
        matches!(
            self,
            PacketError::FragmentSequence { .. } | PacketError::FrameTooLarge { .. }
        )
    }
}

impl std::fmt::Display for PacketError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PacketError::MalformedPacket { len, needed } => {
                write!(f, "Malformed packet: {} bytes, need at least {}", len, needed)
            }
            PacketError::UnsupportedPayloadType(pt) => {
                write!(f, "Unsupported payload type: {}", pt)
            }
            PacketError::EmptyPayload => write!(f, "Empty payload"),
            PacketError::FragmentSequence { expected, received } => write!(
                f,
                "Fragment out of sequence: expected {}, received {}",
                expected, received
            ),
            PacketError::OrphanFragment => write!(f, "Fragment without a start fragment"),
            PacketError::FrameTooLarge { size, limit } => {
                write!(f, "Frame too large: {} bytes (limit {})", size, limit)
            }
            PacketError::AllocationFailure(size) => {
                write!(f, "Failed to allocate {} bytes", size)
            }
        }
    }
}

impl std::error::Error for PacketError {}
